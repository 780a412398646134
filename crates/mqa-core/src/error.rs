use thiserror::Error;

/// Top-level error type for the MQA chat widget.
///
/// Subsystem crates define their own error types and implement
/// `From<SubsystemError> for ChatError` so that `?` works across crate
/// boundaries. Nothing inside a running conversation surfaces one of these
/// to the visitor; they only escape at construction time.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ChatError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Remote endpoint error: {0}")]
    Remote(String),

    #[error("Catalog error: {0}")]
    Catalog(String),
}

impl From<toml::de::Error> for ChatError {
    fn from(err: toml::de::Error) -> Self {
        ChatError::Config(err.to_string())
    }
}

/// A specialized `Result` type for widget operations.
pub type Result<T> = std::result::Result<T, ChatError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_all_variants() {
        let cases: Vec<(ChatError, &str)> = vec![
            (
                ChatError::Config("bad key".to_string()),
                "Configuration error: bad key",
            ),
            (
                ChatError::Storage("quota exceeded".to_string()),
                "Storage error: quota exceeded",
            ),
            (
                ChatError::Remote("connection refused".to_string()),
                "Remote endpoint error: connection refused",
            ),
            (
                ChatError::Catalog("dangling parent".to_string()),
                "Catalog error: dangling parent",
            ),
        ];

        for (error, expected) in cases {
            assert_eq!(error.to_string(), expected);
        }
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: ChatError = io_err.into();
        assert!(matches!(err, ChatError::Io(_)));
        assert!(err.to_string().starts_with("I/O error:"));
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_error_from_toml_de() {
        let err: std::result::Result<toml::Value, _> = toml::from_str("invalid = [[[");
        let chat_err: ChatError = err.unwrap_err().into();
        assert!(matches!(chat_err, ChatError::Config(_)));
    }

    #[test]
    fn test_result_type_with_question_mark() {
        fn inner() -> Result<String> {
            let io_result: std::result::Result<i32, std::io::Error> = Ok(42);
            let value = io_result?;
            Ok(value.to_string())
        }

        assert_eq!(inner().unwrap(), "42");
    }
}
