//! Environment configuration for the demo binary.

use std::env;
use std::time::Duration;

use chat_session::DEFAULT_WINDOW_SIZE;

pub const WINDOW_SIZE_ENV_VAR: &str = "CHAT_DEMO_WINDOW_SIZE";
pub const ANSWER_TIMEOUT_ENV_VAR: &str = "CHAT_DEMO_TIMEOUT_SECS";
pub const INSTRUCTIONS_ENV_VAR: &str = "CHAT_DEMO_INSTRUCTIONS";

const DEFAULT_ANSWER_TIMEOUT_SECS: u64 = 120;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DemoConfig {
    pub window_size: usize,
    pub answer_timeout: Duration,
    pub instructions: Option<String>,
}

impl DemoConfig {
    pub fn from_env() -> Self {
        Self {
            window_size: env_usize_opt(WINDOW_SIZE_ENV_VAR).unwrap_or(DEFAULT_WINDOW_SIZE),
            answer_timeout: Duration::from_secs(
                env_u64_opt(ANSWER_TIMEOUT_ENV_VAR).unwrap_or(DEFAULT_ANSWER_TIMEOUT_SECS),
            ),
            instructions: env_string_opt(INSTRUCTIONS_ENV_VAR),
        }
    }
}

fn env_usize_opt(key: &str) -> Option<usize> {
    env::var(key).ok().and_then(|value| value.trim().parse().ok())
}

fn env_u64_opt(key: &str) -> Option<u64> {
    env::var(key).ok().and_then(|value| value.trim().parse().ok())
}

fn env_string_opt(key: &str) -> Option<String> {
    env::var(key).ok().and_then(|value| {
        if value.trim().is_empty() {
            None
        } else {
            Some(value)
        }
    })
}
