//! Conversational turn management and context assembly for a single-turn
//! chat over an opaque text-generation backend.
//!
//! Invariant: at most one turn per session is awaiting an answer, and every
//! submitted turn eventually settles with a reply, even on backend failure
//! or cancellation.
//!
//! # Public API Overview
//! - Track chat state with [`ChatSession`], [`Transcript`], and [`MemoryWindow`].
//! - Render backend prompts with [`PromptAssembler`].
//! - Drive turns synchronously with [`ConversationController`], or off the
//!   host thread with [`TurnRuntime`].

pub mod config;
pub mod controller;
pub mod error;
pub mod memory;
pub mod prompt;
pub mod runtime;
pub mod session;
pub mod transcript;

pub use crate::config::SessionConfig;
pub use crate::controller::{
    is_degenerate, ConversationController, TurnOutcome, CANCELLED_REPLY, CLARIFICATION_REPLY,
    GENERATION_FAILED_REPLY, UNKNOWN_ANSWER_MARKER,
};
pub use crate::error::{ChatError, GenerationError};
pub use crate::memory::{MemoryWindow, DEFAULT_WINDOW_SIZE};
pub use crate::prompt::{PromptAssembler, DEFAULT_INSTRUCTIONS};
pub use crate::runtime::{TurnEvent, TurnRuntime};
pub use crate::session::{ChatSession, Mode};
pub use crate::transcript::{Transcript, Turn};

/// Backend contract types re-exported for downstream convenience.
pub use generation_backend::{
    BackendInitError, BackendProfile, CancelSignal, GenerationBackend, GenerationOptions,
    GenerationRequest, TurnId,
};
