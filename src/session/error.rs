// ABOUTME: Error taxonomy for the session log store.
// ABOUTME: Separates configuration, I/O, size-limit, and decode failures.

use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced by `LogStore` operations.
#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("session log base directory must not be empty")]
    EmptyBaseDir,

    #[error("I/O error while {operation} at {path}: {source}")]
    Io {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("session log {path} is {size} bytes, which exceeds maximum allowed size of {max} bytes")]
    FileTooLarge { path: PathBuf, size: u64, max: u64 },

    #[error("failed to serialize record for {path}: {source}")]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl HistoryError {
    #[must_use]
    pub fn io(operation: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            operation,
            path: path.into(),
            source,
        }
    }

    #[must_use]
    pub fn serialize(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::Serialize {
            path: path.into(),
            source,
        }
    }

    /// True for the bounded-read failure, so callers can treat an oversized
    /// log differently from a broken filesystem.
    pub fn is_size_limit(&self) -> bool {
        matches!(self, Self::FileTooLarge { .. })
    }
}

pub type HistoryResult<T> = Result<T, HistoryError>;

/// Why a single record could not be decoded.
///
/// Never returned from a store read: undecodable records are skipped and
/// counted instead.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("blank record")]
    Blank,

    #[error("malformed record: {0}")]
    Json(#[from] serde_json::Error),

    #[error("transcript records cannot be decoded line by line")]
    LineDecodeUnsupported,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_limit_message_mentions_limit() {
        let err = HistoryError::FileTooLarge {
            path: PathBuf::from("/tmp/s.jsonl"),
            size: 2048,
            max: 1024,
        };
        assert!(err.is_size_limit());
        let text = err.to_string();
        assert!(text.contains("exceeds maximum allowed size"));
        assert!(text.contains("1024"));
    }

    #[test]
    fn io_error_carries_operation_and_path() {
        let err = HistoryError::io(
            "opening session log",
            "/tmp/a.jsonl",
            std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        );
        assert!(!err.is_size_limit());
        let text = err.to_string();
        assert!(text.contains("opening session log"));
        assert!(text.contains("/tmp/a.jsonl"));
    }
}
