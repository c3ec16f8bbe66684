//! Deterministic mock implementation of the shared `generation_backend`
//! contract.
//!
//! This crate contains no model or tokenizer logic and is intended for local
//! development and contract-level integration testing.

use std::sync::atomic::Ordering;
use std::sync::{Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use generation_backend::{
    BackendProfile, CancelSignal, GenerationBackend, GenerationRequest,
};

/// Stable backend identifier used for explicit startup selection.
pub const MOCK_BACKEND_ID: &str = "mock";

const CANCEL_POLL_MS: u64 = 5;

/// Deterministic scripted backend used by tests and local demo runs.
///
/// Completions are served from a fixed script, cycling once exhausted, and
/// every request is recorded so callers can assert on call counts and the
/// exact prompts the session layer produced.
pub struct ScriptedBackend {
    replies: Vec<String>,
    reply_delay: Duration,
    requests: Mutex<Vec<GenerationRequest>>,
}

impl ScriptedBackend {
    /// Creates a scripted backend serving `replies` in order, cycling.
    #[must_use]
    pub fn new(replies: Vec<String>) -> Self {
        Self {
            replies,
            reply_delay: Duration::ZERO,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Delays each completion, polling the cancel signal while waiting.
    #[must_use]
    pub fn with_reply_delay(mut self, delay: Duration) -> Self {
        self.reply_delay = delay;
        self
    }

    /// Returns every request received so far, in arrival order.
    #[must_use]
    pub fn recorded_requests(&self) -> Vec<GenerationRequest> {
        lock_unpoisoned(&self.requests).clone()
    }

    /// Number of completion calls received so far.
    #[must_use]
    pub fn call_count(&self) -> usize {
        lock_unpoisoned(&self.requests).len()
    }

    fn wait_or_cancel(&self, cancel: &CancelSignal) -> bool {
        let mut remaining = self.reply_delay;
        while !remaining.is_zero() {
            if cancel.load(Ordering::SeqCst) {
                return true;
            }

            let slice = remaining.min(Duration::from_millis(CANCEL_POLL_MS));
            thread::sleep(slice);
            remaining -= slice;
        }

        cancel.load(Ordering::SeqCst)
    }
}

impl Default for ScriptedBackend {
    fn default() -> Self {
        Self::new(vec![
            "Paris is the capital of France.".to_string(),
            "  I do not know the answer to that, sorry.  ".to_string(),
            "Rust reaches memory safety without a garbage collector by \
             tracking ownership at compile time."
                .to_string(),
            "The boiling point of water at sea level is 100 degrees Celsius."
                .to_string(),
        ])
    }
}

impl GenerationBackend for ScriptedBackend {
    fn profile(&self) -> BackendProfile {
        BackendProfile {
            backend_id: MOCK_BACKEND_ID.to_string(),
            model_id: "scripted".to_string(),
        }
    }

    fn generate(&self, req: GenerationRequest, cancel: CancelSignal) -> Result<String, String> {
        let call_index = {
            let mut requests = lock_unpoisoned(&self.requests);
            requests.push(req);
            requests.len() - 1
        };

        if self.wait_or_cancel(&cancel) {
            return Ok(String::new());
        }

        if self.replies.is_empty() {
            return Err("scripted backend has no reply configured".to_string());
        }

        Ok(self.replies[call_index % self.replies.len()].clone())
    }
}

fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use generation_backend::{
        CancelSignal, GenerationBackend, GenerationOptions, GenerationRequest,
    };

    use super::ScriptedBackend;

    fn request(turn_id: u64, prompt: &str) -> GenerationRequest {
        GenerationRequest {
            turn_id,
            prompt: prompt.to_string(),
            options: GenerationOptions::default(),
        }
    }

    #[test]
    fn replies_are_served_in_script_order_and_cycle() {
        let backend = ScriptedBackend::new(vec!["one".to_string(), "two".to_string()]);
        let cancel: CancelSignal = CancelSignal::default();

        let first = backend.generate(request(1, "a"), Arc::clone(&cancel));
        let second = backend.generate(request(2, "b"), Arc::clone(&cancel));
        let third = backend.generate(request(3, "c"), cancel);

        assert_eq!(first.as_deref(), Ok("one"));
        assert_eq!(second.as_deref(), Ok("two"));
        assert_eq!(third.as_deref(), Ok("one"));
    }

    #[test]
    fn every_request_is_recorded_for_inspection() {
        let backend = ScriptedBackend::new(vec!["reply".to_string()]);
        let cancel: CancelSignal = CancelSignal::default();

        backend
            .generate(request(9, "rendered prompt"), cancel)
            .expect("scripted reply");

        assert_eq!(backend.call_count(), 1);
        let recorded = backend.recorded_requests();
        assert_eq!(recorded[0].turn_id, 9);
        assert_eq!(recorded[0].prompt, "rendered prompt");
        assert_eq!(recorded[0].options, GenerationOptions::default());
    }

    #[test]
    fn empty_script_reports_a_backend_error() {
        let backend = ScriptedBackend::new(Vec::new());
        let result = backend.generate(request(1, "a"), CancelSignal::default());

        assert_eq!(
            result,
            Err("scripted backend has no reply configured".to_string())
        );
    }

    #[test]
    fn delayed_reply_returns_early_when_cancelled() {
        let backend =
            ScriptedBackend::new(vec!["slow".to_string()]).with_reply_delay(Duration::from_secs(30));
        let cancel: CancelSignal = Arc::new(AtomicBool::new(true));

        let completion = backend.generate(request(1, "a"), Arc::clone(&cancel));

        assert_eq!(completion.as_deref(), Ok(""));
        assert!(cancel.load(Ordering::SeqCst));
    }
}
