//! Threaded single-flight answer execution.
//!
//! [`TurnRuntime`] buffers turn events before applying them to the session.
//! Hosts without an event loop call [`TurnRuntime::flush_pending_events`]
//! (or [`TurnRuntime::settle`]) after starting an answer to ensure queued
//! turn state is applied; events are only ever applied on the calling
//! thread, never on answer workers.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use generation_backend::{CancelSignal, TurnId};
use tracing::debug;

use crate::controller::{
    is_degenerate, ConversationController, RawOutcome, CANCELLED_REPLY, CLARIFICATION_REPLY,
    GENERATION_FAILED_REPLY,
};
use crate::error::{ChatError, GenerationError};
use crate::session::{ChatSession, Mode};

const SETTLE_POLL_MS: u64 = 5;

/// Terminal lifecycle event for one answered turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnEvent {
    Clarified {
        turn_id: TurnId,
    },
    Answered {
        turn_id: TurnId,
        reply: String,
        unknown_answer: bool,
    },
    Failed {
        turn_id: TurnId,
        error: GenerationError,
    },
    Cancelled {
        turn_id: TurnId,
    },
}

impl TurnEvent {
    /// Returns the turn identifier associated with this event.
    #[must_use]
    pub fn turn_id(&self) -> TurnId {
        match self {
            Self::Clarified { turn_id }
            | Self::Answered { turn_id, .. }
            | Self::Failed { turn_id, .. }
            | Self::Cancelled { turn_id } => *turn_id,
        }
    }
}

struct ActiveTurn {
    turn_id: TurnId,
    cancel: CancelSignal,
    join_handle: Option<JoinHandle<()>>,
}

/// Runs answers on worker threads while keeping all session mutation on the
/// host thread, with exactly one answer in flight per session.
pub struct TurnRuntime {
    session: Arc<Mutex<ChatSession>>,
    controller: ConversationController,
    pending_events: Mutex<VecDeque<TurnEvent>>,
    active_turn: Mutex<Option<ActiveTurn>>,
}

impl TurnRuntime {
    #[must_use]
    pub fn new(session: Arc<Mutex<ChatSession>>, controller: ConversationController) -> Arc<Self> {
        Arc::new(Self {
            session,
            controller,
            pending_events: Mutex::new(VecDeque::new()),
            active_turn: Mutex::new(None),
        })
    }

    /// Shared handle to the session this runtime mutates.
    #[must_use]
    pub fn session(&self) -> Arc<Mutex<ChatSession>> {
        Arc::clone(&self.session)
    }

    /// Appends a pending turn; completes and is visible before any answer
    /// for it begins.
    pub fn submit(&self, user_message: &str) -> Result<TurnId, ChatError> {
        let mut session = lock_unpoisoned(&self.session);
        session.submit(user_message)
    }

    /// Starts answering the pending turn.
    ///
    /// Degenerate input never reaches the backend: its clarification event is
    /// queued immediately without spawning a worker. Worker spawn failures
    /// settle the turn as failed instead of leaving it pending.
    pub fn start_answer(self: &Arc<Self>) -> Result<TurnId, ChatError> {
        let mut active_turn = self.lock_active_turn();
        if active_turn.is_some() {
            return Err(ChatError::TurnAlreadyPending);
        }

        let (turn_id, question) = {
            let mut session = lock_unpoisoned(&self.session);
            session.begin_answer()?
        };

        if is_degenerate(&question) {
            self.enqueue_event(TurnEvent::Clarified { turn_id });
            return Ok(turn_id);
        }

        let cancel: CancelSignal = Arc::new(AtomicBool::new(false));
        match self.spawn_worker(turn_id, question, Arc::clone(&cancel)) {
            Ok(join_handle) => {
                *active_turn = Some(ActiveTurn {
                    turn_id,
                    cancel,
                    join_handle: Some(join_handle),
                });
            }
            Err(message) => {
                self.enqueue_event(TurnEvent::Failed {
                    turn_id,
                    error: GenerationError::Backend { message },
                });
            }
        }

        Ok(turn_id)
    }

    /// Requests cancellation of the in-flight answer.
    ///
    /// Returns false when no answer is in flight; repeated calls after the
    /// first signal are no-ops.
    pub fn cancel_active(&self) -> bool {
        let active_turn = self.lock_active_turn();
        match active_turn.as_ref() {
            Some(active) => {
                active.cancel.store(true, Ordering::SeqCst);
                true
            }
            None => false,
        }
    }

    /// True while an answer worker is registered.
    #[must_use]
    pub fn has_active_turn(&self) -> bool {
        self.lock_active_turn().is_some()
    }

    /// Drains queued turn events and applies them to the session.
    ///
    /// Returns the number of events applied.
    pub fn flush_pending_events(&self) -> usize {
        let mut applied = 0usize;

        loop {
            let event = {
                let mut pending_events = lock_unpoisoned(&self.pending_events);
                pending_events.pop_front()
            };

            match event {
                Some(event) => {
                    self.apply_event(event);
                    applied += 1;
                }
                None => break,
            }
        }

        applied
    }

    /// Flushes events until the session is idle with no registered worker,
    /// or `timeout` elapses.
    pub fn settle(&self, timeout: Duration) -> bool {
        let start = Instant::now();

        loop {
            self.flush_pending_events();

            let idle = {
                let session = lock_unpoisoned(&self.session);
                session.mode() == Mode::Idle
            };
            if idle && !self.has_active_turn() {
                return true;
            }

            if start.elapsed() >= timeout {
                return false;
            }

            thread::sleep(Duration::from_millis(SETTLE_POLL_MS));
        }
    }

    /// Cancels any in-flight answer and resets the session. Idempotent.
    ///
    /// A worker still draining its cancelled turn keeps the answer slot busy
    /// until its terminal event is flushed; the cleared session ignores that
    /// stale completion.
    pub fn clear(&self) {
        self.cancel_active();
        let mut session = lock_unpoisoned(&self.session);
        session.clear();
    }

    fn spawn_worker(
        self: &Arc<Self>,
        turn_id: TurnId,
        question: String,
        cancel: CancelSignal,
    ) -> Result<JoinHandle<()>, String> {
        let runtime = Arc::clone(self);
        thread::Builder::new()
            .name(format!("chat-turn-{turn_id}"))
            .spawn(move || runtime.run_worker(turn_id, &question, &cancel))
            .map_err(|error| format!("failed to spawn turn worker: {error}"))
    }

    fn run_worker(self: Arc<Self>, turn_id: TurnId, question: &str, cancel: &CancelSignal) {
        let event = match self.controller.generate(turn_id, question, cancel) {
            RawOutcome::Completed {
                reply,
                unknown_answer,
            } => TurnEvent::Answered {
                turn_id,
                reply,
                unknown_answer,
            },
            RawOutcome::Cancelled => TurnEvent::Cancelled { turn_id },
            RawOutcome::Failed(error) => TurnEvent::Failed { turn_id, error },
        };

        self.enqueue_event(event);
    }

    fn enqueue_event(&self, event: TurnEvent) {
        let mut pending_events = lock_unpoisoned(&self.pending_events);
        pending_events.push_back(event);
    }

    fn apply_event(&self, event: TurnEvent) {
        let turn_id = event.turn_id();

        {
            let mut session = lock_unpoisoned(&self.session);
            match event {
                TurnEvent::Clarified { turn_id } => {
                    session.complete_answer(turn_id, CLARIFICATION_REPLY, false);
                }
                TurnEvent::Answered { turn_id, reply, .. } => {
                    session.complete_answer(turn_id, reply, true);
                }
                TurnEvent::Failed { turn_id, error } => {
                    debug!(turn_id, %error, "turn failed");
                    session.complete_answer(turn_id, GENERATION_FAILED_REPLY, false);
                }
                TurnEvent::Cancelled { turn_id } => {
                    session.complete_answer(turn_id, CANCELLED_REPLY, false);
                }
            }
        }

        self.clear_active_turn_if_matching(turn_id);
    }

    fn clear_active_turn_if_matching(&self, turn_id: TurnId) {
        let mut active_turn = self.lock_active_turn();
        let matches = active_turn.as_ref().map(|active| active.turn_id) == Some(turn_id);
        if !matches {
            return;
        }

        let mut completed = match active_turn.take() {
            Some(completed) => completed,
            None => return,
        };

        if let Some(join_handle) = completed.join_handle.take() {
            if join_handle.is_finished() {
                let _ = join_handle.join();
            }
        }
    }

    fn lock_active_turn(&self) -> MutexGuard<'_, Option<ActiveTurn>> {
        lock_unpoisoned(&self.active_turn)
    }
}

fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
