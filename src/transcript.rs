use generation_backend::TurnId;

/// One user message plus its possibly pending assistant reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    pub turn_id: TurnId,
    pub user_message: String,
    pub assistant_reply: Option<String>,
}

impl Turn {
    /// Creates a turn awaiting its reply.
    #[must_use]
    pub fn submitted(turn_id: TurnId, user_message: impl Into<String>) -> Self {
        Self {
            turn_id,
            user_message: user_message.into(),
            assistant_reply: None,
        }
    }

    /// True while the reply has not arrived yet.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.assistant_reply.is_none()
    }
}

/// Ordered, append-only record of turns; the UI-visible chat state.
///
/// At most one turn is pending a reply at any time, and a pending reply
/// transitions from absent to present exactly once.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Transcript {
    turns: Vec<Turn>,
}

impl Transcript {
    pub fn append(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    /// Writes `reply` into the most recent turn while it is still pending.
    ///
    /// Returns false when there is no turn or the last turn already has its
    /// reply; callers treat that as a stale completion and drop it.
    pub fn update_last_reply(&mut self, reply: impl Into<String>) -> bool {
        match self.turns.last_mut() {
            Some(turn) if turn.is_pending() => {
                turn.assistant_reply = Some(reply.into());
                true
            }
            _ => false,
        }
    }

    /// All turns in chronological order.
    #[must_use]
    pub fn all(&self) -> &[Turn] {
        &self.turns
    }

    /// The turn currently awaiting a reply, if any.
    #[must_use]
    pub fn pending(&self) -> Option<&Turn> {
        self.turns.last().filter(|turn| turn.is_pending())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn clear(&mut self) {
        self.turns.clear();
    }
}
