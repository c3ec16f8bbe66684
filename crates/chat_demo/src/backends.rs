//! Backend selection and options-file loading for the demo binary.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use chat_session::{BackendInitError, GenerationBackend, GenerationOptions};
use generation_backend_mock::{ScriptedBackend, MOCK_BACKEND_ID};

pub const DEFAULT_BACKEND_ID: &str = MOCK_BACKEND_ID;
pub const BACKEND_ENV_VAR: &str = "CHAT_DEMO_BACKEND";
pub const OPTIONS_PATH_ENV_VAR: &str = "CHAT_DEMO_OPTIONS_PATH";

pub fn backend_from_env() -> Result<Arc<dyn GenerationBackend>, BackendInitError> {
    let backend_id = std::env::var(BACKEND_ENV_VAR)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty());

    backend_for_id(backend_id.as_deref().unwrap_or(DEFAULT_BACKEND_ID))
}

pub fn backend_for_id(backend_id: &str) -> Result<Arc<dyn GenerationBackend>, BackendInitError> {
    match backend_id {
        MOCK_BACKEND_ID => Ok(Arc::new(ScriptedBackend::default())),
        unknown => Err(BackendInitError::new(format!(
            "Unsupported backend '{unknown}'. Available backends: {DEFAULT_BACKEND_ID}"
        ))),
    }
}

/// Loads sampling options from `CHAT_DEMO_OPTIONS_PATH`, defaulting when the
/// variable is unset or blank.
pub fn options_from_env() -> Result<GenerationOptions, BackendInitError> {
    match std::env::var(OPTIONS_PATH_ENV_VAR)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
    {
        Some(path) => options_from_path(Path::new(&path)),
        None => Ok(GenerationOptions::default()),
    }
}

pub fn options_from_path(path: &Path) -> Result<GenerationOptions, BackendInitError> {
    let raw = fs::read_to_string(path).map_err(|error| {
        BackendInitError::new(format!(
            "failed to read options file {}: {error}",
            path.display()
        ))
    })?;

    serde_json::from_str(&raw).map_err(|error| {
        BackendInitError::new(format!(
            "failed to parse options file {}: {error}",
            path.display()
        ))
    })
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use chat_session::GenerationOptions;

    use super::{backend_for_id, options_from_path};

    #[test]
    fn backend_for_id_supports_mock() {
        let backend = backend_for_id("mock").expect("mock backend should resolve");
        assert_eq!(backend.profile().backend_id, "mock");
    }

    #[test]
    fn backend_for_id_rejects_unknown_backend() {
        let error = match backend_for_id("local") {
            Ok(_) => panic!("unknown backends should fail"),
            Err(error) => error,
        };

        assert!(error.message().contains("Unsupported backend 'local'"));
    }

    #[test]
    fn options_file_with_partial_overrides_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(file, r#"{{ "max_new_tokens": 32 }}"#).expect("write options");

        let options = options_from_path(file.path()).expect("options parse");
        assert_eq!(options.max_new_tokens, 32);
        assert_eq!(options.top_k, GenerationOptions::default().top_k);
    }

    #[test]
    fn options_file_with_unknown_fields_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(file, r#"{{ "temperature": 0 }}"#).expect("write options");

        let error = match options_from_path(file.path()) {
            Ok(_) => panic!("unknown fields should fail"),
            Err(error) => error,
        };

        assert!(error.message().contains("failed to parse options file"));
    }

    #[test]
    fn missing_options_file_is_reported() {
        let error = match options_from_path(std::path::Path::new("/nonexistent/options.json")) {
            Ok(_) => panic!("missing files should fail"),
            Err(error) => error,
        };

        assert!(error.message().contains("failed to read options file"));
    }
}
