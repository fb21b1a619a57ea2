use thiserror::Error;

/// Main error type for the logging pipeline
#[derive(Debug, Error)]
pub enum StreamlogError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Invalid configuration file: {0}")]
    InvalidConfig(String),

    #[error("Missing required configuration field: {0}")]
    MissingConfigField(String),

    #[error("Configuration validation failed: {0}")]
    ConfigValidationError(String),

    // File resource errors
    #[error("Failed to create log directory: {0}")]
    LogDirectoryError(String),

    #[error("Failed to open log file: {0}")]
    LogFileError(String),

    #[error("Log rotation failed: {0}")]
    LogRotationError(String),

    #[error("Failed to write log entry: {0}")]
    LogWriteError(String),

    // Capacity errors
    #[error("Log buffer is full (capacity {0})")]
    BufferFull(usize),

    // Lifecycle errors
    #[error("Writer is closed")]
    WriterClosed,

    #[error("Logger manager has been closed")]
    ManagerClosed,

    // IO errors (automatically converted from std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, StreamlogError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(
            StreamlogError::BufferFull(2).to_string(),
            "Log buffer is full (capacity 2)"
        );
        assert_eq!(StreamlogError::WriterClosed.to_string(), "Writer is closed");
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: StreamlogError = io.into();
        assert!(matches!(err, StreamlogError::Io(_)));
    }
}
