//! Minimal backend-agnostic contract for producing one text completion.
//!
//! This crate intentionally defines only the shared completion-request and
//! sampling-configuration types. It excludes model loading, tokenizer
//! concerns, and transcript/session orchestration.

use std::fmt;
use std::sync::{atomic::AtomicBool, Arc};

use serde::{Deserialize, Serialize};

/// Identifier for one conversational turn.
pub type TurnId = u64;

/// Shared cancellation flag for an in-flight completion.
pub type CancelSignal = Arc<AtomicBool>;

/// Error returned while constructing/configuring a backend before any
/// completion runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendInitError {
    message: String,
}

impl BackendInitError {
    /// Creates a new backend initialization error.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Returns the underlying error message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for BackendInitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for BackendInitError {}

impl From<String> for BackendInitError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

impl From<&str> for BackendInitError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

/// Immutable metadata describing a generation backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendProfile {
    pub backend_id: String,
    pub model_id: String,
}

/// Sampling and decoding knobs carried with every completion request.
///
/// A host owns exactly one value of this type per session so the same
/// configuration reaches every backend call instead of being re-specified at
/// individual call sites.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GenerationOptions {
    /// Cap on the number of newly generated tokens.
    pub max_new_tokens: u32,
    /// When false, generation is deterministic/greedy.
    pub sampling_enabled: bool,
    /// Restricts the sampling pool size while sampling is enabled.
    pub top_k: u32,
    /// Number of candidate completions; hosts select exactly one.
    pub num_return_sequences: u32,
    /// Optional marker that ends generation.
    pub stop_token: Option<String>,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            max_new_tokens: 100,
            sampling_enabled: true,
            top_k: 10,
            num_return_sequences: 1,
            stop_token: None,
        }
    }
}

/// Input required to produce one completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub turn_id: TurnId,
    pub prompt: String,
    pub options: GenerationOptions,
}

/// Backend interface for executing one completion request.
pub trait GenerationBackend: Send + Sync + 'static {
    /// Returns backend/model identity metadata.
    fn profile(&self) -> BackendProfile;

    /// Produces a completion for `req`, blocking until finished.
    ///
    /// Backends should poll `cancel` at convenient points and return early
    /// once it is set; the caller treats the turn as cancelled regardless of
    /// the returned text. Errors are backend-neutral strings; callers convert
    /// them into their own taxonomy.
    fn generate(&self, req: GenerationRequest, cancel: CancelSignal) -> Result<String, String>;
}
