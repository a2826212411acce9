use thiserror::Error;

/// Errors that can occur in firstpos core operations.
#[derive(Debug, Error)]
pub enum FirstPosError {
    /// Reading or writing a vocabulary, config or weights file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A JSON document could not be parsed or written.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The numeric engine rejected an operation.
    #[error("tensor error: {0}")]
    Candle(#[from] candle_core::Error),

    /// The weights file is not a valid safetensors archive.
    #[error("invalid weights file: {0}")]
    Safetensors(#[from] safetensors::SafeTensorError),

    /// The vocabulary lacks one of the reserved entries.
    #[error("vocabulary is missing reserved entry {0:?}")]
    MissingReservedEntry(&'static str),

    /// Vocabulary indices are not exactly `0..N-1`.
    #[error("vocabulary indices are not dense: {0}")]
    SparseVocabulary(String),

    /// A configuration value is unusable.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Persisted weights were produced by a differently shaped model.
    #[error("configuration mismatch for {tensor}: expected shape {expected:?}, found {found:?}")]
    ConfigMismatch {
        /// Name of the offending parameter.
        tensor: String,
        /// Shape implied by the current configuration.
        expected: Vec<usize>,
        /// Shape stored in the weights file.
        found: Vec<usize>,
    },

    /// The vocabulary does not match the one the model was trained with.
    #[error("vocabulary mismatch: {0}")]
    VocabularyMismatch(String),

    /// A parameter expected by the model is absent from the weights file.
    #[error("weights file has no tensor named {0}")]
    MissingTensor(String),

    /// The weights file holds a parameter the model does not have.
    #[error("weights file has unexpected tensor {0}")]
    UnexpectedTensor(String),
}

/// Result type alias for firstpos operations.
pub type Result<T> = std::result::Result<T, FirstPosError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_messages() {
        let err = FirstPosError::MissingReservedEntry("unk");
        assert_eq!(err.to_string(), "vocabulary is missing reserved entry \"unk\"");

        let err = FirstPosError::ConfigMismatch {
            tensor: "classify.weight".into(),
            expected: vec![7, 20],
            found: vec![9, 20],
        };
        let msg = err.to_string();
        assert!(msg.contains("classify.weight"));
        assert!(msg.contains("[7, 20]"));
        assert!(msg.contains("[9, 20]"));
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<FirstPosError>();
    }
}
