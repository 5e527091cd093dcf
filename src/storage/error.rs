//! Error types for durable state operations

use thiserror::Error;

/// Result type alias for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur while reading or writing durable state
#[derive(Debug, Error)]
pub enum StorageError {
    /// I/O error (file access, rename, etc.)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// State file could not be encoded or decoded
    #[error("state serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The backend refuses writes (used by the in-memory backend in tests)
    #[error("storage backend unavailable: {0}")]
    Unavailable(String),
}

impl StorageError {
    /// Whether a load failure means "start fresh" rather than "file absent"
    pub fn is_corrupt(&self) -> bool {
        matches!(self, StorageError::Serialization(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        let err = StorageError::Unavailable("disk detached".to_string());
        assert_eq!(err.to_string(), "storage backend unavailable: disk detached");

        let io = StorageError::from(std::io::Error::other("boom"));
        assert_eq!(io.to_string(), "I/O error: boom");
        assert!(!io.is_corrupt());
    }

    #[test]
    fn test_serde_errors_are_corrupt() {
        let err = serde_json::from_str::<Vec<u8>>("[1, 2").unwrap_err();
        assert!(StorageError::from(err).is_corrupt());
    }
}
