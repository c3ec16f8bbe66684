use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::{Duration, Instant};

use chat_session::{
    BackendProfile, CancelSignal, ChatError, ChatSession, ConversationController,
    GenerationBackend, GenerationOptions, GenerationRequest, PromptAssembler, TurnRuntime,
    CANCELLED_REPLY,
};

const SETTLE_TIMEOUT: Duration = Duration::from_secs(3);

/// Blocks until the cancel signal is set, like a generation call that only
/// observes cancellation between decode steps.
struct BlockingCancelBackend;

impl GenerationBackend for BlockingCancelBackend {
    fn profile(&self) -> BackendProfile {
        BackendProfile {
            backend_id: "test".to_string(),
            model_id: "test-model".to_string(),
        }
    }

    fn generate(&self, _req: GenerationRequest, cancel: CancelSignal) -> Result<String, String> {
        while !cancel.load(Ordering::SeqCst) {
            thread::sleep(Duration::from_millis(5));
        }

        Ok("partial output discarded on cancel".to_string())
    }
}

fn runtime_with(backend: Arc<dyn GenerationBackend>) -> Arc<TurnRuntime> {
    let session = Arc::new(Mutex::new(ChatSession::new(5)));
    let controller =
        ConversationController::new(backend, PromptAssembler::new(), GenerationOptions::default());
    TurnRuntime::new(session, controller)
}

fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

fn wait_until(timeout: Duration, mut predicate: impl FnMut() -> bool) -> bool {
    let start = Instant::now();
    while start.elapsed() < timeout {
        if predicate() {
            return true;
        }

        thread::sleep(Duration::from_millis(10));
    }

    predicate()
}

#[test]
fn cancel_while_answering_settles_with_the_cancellation_marker() {
    let runtime = runtime_with(Arc::new(BlockingCancelBackend));

    runtime.submit("long running question").expect("accepted");
    runtime.start_answer().expect("answer starts");
    assert!(runtime.has_active_turn());

    assert!(runtime.cancel_active(), "an answer was in flight");
    assert!(runtime.settle(SETTLE_TIMEOUT), "cancel did not settle");

    let session = runtime.session();
    let session = lock_unpoisoned(&session);
    let turn = &session.transcript().all()[0];
    assert_eq!(turn.assistant_reply.as_deref(), Some(CANCELLED_REPLY));
    assert!(session.memory().is_empty(), "cancelled turns are not remembered");
}

#[test]
fn repeated_cancel_is_a_noop_after_the_first_signal() {
    let runtime = runtime_with(Arc::new(BlockingCancelBackend));

    runtime.submit("question to cancel repeatedly").expect("accepted");
    runtime.start_answer().expect("answer starts");

    assert!(runtime.cancel_active());
    assert!(runtime.cancel_active(), "still in flight, signal already set");
    assert!(runtime.settle(SETTLE_TIMEOUT), "cancel did not settle");

    assert!(!runtime.cancel_active(), "nothing left to cancel");

    let session = runtime.session();
    let session = lock_unpoisoned(&session);
    assert_eq!(session.transcript().len(), 1);
    assert_eq!(
        session.transcript().all()[0].assistant_reply.as_deref(),
        Some(CANCELLED_REPLY)
    );
}

#[test]
fn second_answer_is_rejected_while_one_is_in_flight() {
    let runtime = runtime_with(Arc::new(BlockingCancelBackend));

    runtime.submit("first question").expect("accepted");
    runtime.start_answer().expect("answer starts");

    assert_eq!(
        runtime.start_answer().expect_err("single flight"),
        ChatError::TurnAlreadyPending
    );

    runtime.cancel_active();
    assert!(runtime.settle(SETTLE_TIMEOUT), "cancel did not settle");
}

#[test]
fn clear_during_an_answer_drops_the_stale_completion() {
    let runtime = runtime_with(Arc::new(BlockingCancelBackend));

    runtime.submit("question to clear away").expect("accepted");
    runtime.start_answer().expect("answer starts");

    runtime.clear();
    assert!(runtime.settle(SETTLE_TIMEOUT), "worker did not drain");

    {
        let session = runtime.session();
        let session = lock_unpoisoned(&session);
        assert!(session.transcript().is_empty());
        assert!(session.memory().is_empty());
    }

    assert!(
        wait_until(SETTLE_TIMEOUT, || !runtime.has_active_turn()),
        "answer slot was not released"
    );

    // A fresh turn runs normally afterwards.
    runtime.submit("fresh question").expect("accepted");
    runtime.start_answer().expect("answer starts");
    runtime.cancel_active();
    assert!(runtime.settle(SETTLE_TIMEOUT), "fresh turn did not settle");
}
