use generation_backend::TurnId;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::config::SessionConfig;
use crate::error::ChatError;
use crate::memory::MemoryWindow;
use crate::transcript::{Transcript, Turn};

/// Lifecycle mode for the single in-flight answer slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Idle,
    Answering { turn_id: TurnId },
}

/// Lifetime-scoped state for one conversation: transcript plus memory window.
///
/// Created at UI load, emptied on the explicit user clear action, dropped
/// when the hosting session ends. Nothing is persisted.
#[derive(Debug, Clone)]
pub struct ChatSession {
    session_id: String,
    created_at: OffsetDateTime,
    mode: Mode,
    next_turn_id: TurnId,
    transcript: Transcript,
    memory: MemoryWindow,
}

impl ChatSession {
    #[must_use]
    pub fn new(window_size: usize) -> Self {
        Self {
            session_id: Uuid::new_v4().to_string(),
            created_at: OffsetDateTime::now_utc(),
            mode: Mode::Idle,
            next_turn_id: 1,
            transcript: Transcript::default(),
            memory: MemoryWindow::new(window_size),
        }
    }

    #[must_use]
    pub fn with_config(config: &SessionConfig) -> Self {
        Self::new(config.window_size)
    }

    #[must_use]
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    #[must_use]
    pub fn created_at(&self) -> OffsetDateTime {
        self.created_at
    }

    #[must_use]
    pub fn mode(&self) -> Mode {
        self.mode
    }

    #[must_use]
    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    #[must_use]
    pub fn memory(&self) -> &MemoryWindow {
        &self.memory
    }

    /// Appends a pending turn for `user_message`.
    ///
    /// The message is stored trimmed and must be non-empty after trimming.
    /// Exactly one turn may await an answer, so submission is rejected while
    /// a previous turn is unanswered.
    pub fn submit(&mut self, user_message: &str) -> Result<TurnId, ChatError> {
        let message = user_message.trim();
        if message.is_empty() {
            return Err(ChatError::EmptyInput);
        }

        if self.transcript.pending().is_some() || self.mode != Mode::Idle {
            return Err(ChatError::TurnAlreadyPending);
        }

        let turn_id = self.next_turn_id;
        self.next_turn_id += 1;
        self.transcript.append(Turn::submitted(turn_id, message));
        Ok(turn_id)
    }

    /// Marks the pending turn as being answered; returns its id and question.
    pub fn begin_answer(&mut self) -> Result<(TurnId, String), ChatError> {
        if matches!(self.mode, Mode::Answering { .. }) {
            return Err(ChatError::TurnAlreadyPending);
        }

        let Some(pending) = self.transcript.pending() else {
            return Err(ChatError::NothingPending);
        };

        let turn_id = pending.turn_id;
        let question = pending.user_message.clone();
        self.mode = Mode::Answering { turn_id };
        Ok((turn_id, question))
    }

    /// Writes `reply` into the turn being answered and returns to idle.
    ///
    /// Completions targeting a stale turn id (superseded by a clear) are
    /// ignored and reported as false. When `record_in_memory` is set, the
    /// settled turn is also committed to the memory window.
    pub fn complete_answer(
        &mut self,
        turn_id: TurnId,
        reply: impl Into<String>,
        record_in_memory: bool,
    ) -> bool {
        if !matches!(self.mode, Mode::Answering { turn_id: active } if active == turn_id) {
            return false;
        }

        self.mode = Mode::Idle;
        if !self.transcript.update_last_reply(reply) {
            return false;
        }

        if record_in_memory {
            if let Some(turn) = self.transcript.all().last() {
                self.memory.record(turn.clone());
            }
        }

        true
    }

    /// Empties the transcript and the memory window. Idempotent.
    ///
    /// A completion already in flight for a cleared turn is dropped by the
    /// stale-turn guard in [`ChatSession::complete_answer`].
    pub fn clear(&mut self) {
        self.transcript.clear();
        self.memory.clear();
        self.mode = Mode::Idle;
    }
}
