//! Single-turn chat REPL over the `chat_session` core.
//!
//! ## Backend bootstrap
//!
//! `chat_demo` selects its generation backend at startup:
//!
//! - `CHAT_DEMO_BACKEND=mock` (the default) serves deterministic scripted
//!   replies for local runs and tests.
//!
//! Sampling knobs can be overridden with `CHAT_DEMO_OPTIONS_PATH`, pointing
//! at a readable UTF-8 JSON file with this shape:
//!
//! ```json
//! {
//!   "max_new_tokens": 100,
//!   "sampling_enabled": true,
//!   "top_k": 10
//! }
//! ```
//!
//! Contract notes:
//! - Unknown JSON fields are rejected.
//! - Omitted knobs keep their defaults.
//!
//! ## Session shape
//!
//! `CHAT_DEMO_WINDOW_SIZE` bounds the conversational memory window,
//! `CHAT_DEMO_INSTRUCTIONS` overrides the prompt template's instruction
//! header, and `CHAT_DEMO_TIMEOUT_SECS` caps how long one answer may run
//! before the REPL cancels it. Ctrl+C during an answer cancels that turn
//! instead of exiting.

pub mod backends;
pub mod commands;
pub mod config;
pub mod repl;
