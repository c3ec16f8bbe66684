use generation_backend::GenerationOptions;

use crate::memory::DEFAULT_WINDOW_SIZE;

/// Bootstrap configuration fixed when a session is created.
///
/// The options value is handed to the controller, which then owns it and
/// passes the same knobs with every backend call; nothing else re-specifies
/// them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Number of answered turns retained in the memory window.
    pub window_size: usize,
    /// Sampling knobs for every backend call in the session.
    pub options: GenerationOptions,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            window_size: DEFAULT_WINDOW_SIZE,
            options: GenerationOptions::default(),
        }
    }
}
