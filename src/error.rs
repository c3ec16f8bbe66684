use thiserror::Error;

/// Errors surfaced by session state transitions and the turn runtime.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChatError {
    #[error("submitted message is empty")]
    EmptyInput,

    #[error("a turn is already awaiting an answer")]
    TurnAlreadyPending,

    #[error("no turn is awaiting an answer")]
    NothingPending,

    #[error(transparent)]
    Generation(#[from] GenerationError),
}

/// Failures produced while invoking the generation backend for one turn.
///
/// Every backend failure is converted into one of these before it leaves the
/// controller; the affected turn still settles with a visible failure reply.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerationError {
    #[error("generation backend failed: {message}")]
    Backend { message: String },

    #[error("generation backend returned an empty completion")]
    EmptyCompletion,

    #[error("generation backend panicked")]
    BackendPanic,
}
