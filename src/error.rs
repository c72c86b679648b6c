use serde::Serialize;
use thiserror::Error;

/// Main error type for RAGBench
#[derive(Error, Debug)]
pub enum BenchError {
    /// Configuration errors (e.g. an unusable API base)
    #[error("Configuration error: {0}")]
    Config(String),

    /// File system I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP client construction errors
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON report serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenient Result type using BenchError
pub type Result<T> = std::result::Result<T, BenchError>;

/// Coarse classification of a failed query case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorKind {
    Transport,
    Status,
    Decode,
}

/// Failure of a single query case. Never aborts the suite.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CaseError {
    /// Connection failure or body read failure
    #[error("transport error: {0}")]
    Transport(String),

    /// Per-call deadline expired
    #[error("request timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// Non-2xx response; `body` is already truncated
    #[error("http {status}: {body}")]
    Status { status: u16, body: String },

    /// Response body did not match `{answer, hits[]}`
    #[error("decode error: {0}")]
    Decode(String),

    /// The task running the case was aborted
    #[error("query task failed: {0}")]
    Task(String),
}

impl CaseError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CaseError::Transport(_) | CaseError::Timeout { .. } | CaseError::Task(_) => {
                ErrorKind::Transport
            }
            CaseError::Status { .. } => ErrorKind::Status,
            CaseError::Decode(_) => ErrorKind::Decode,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = BenchError::Config("Test error".to_string());
        assert!(err.to_string().contains("Configuration error"));
        assert!(err.to_string().contains("Test error"));
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let bench_err: BenchError = io_err.into();
        assert!(matches!(bench_err, BenchError::Io(_)));
    }

    #[test]
    fn test_status_error_embeds_code_and_body() {
        let err = CaseError::Status {
            status: 500,
            body: "internal failure".to_string(),
        };
        assert_eq!(err.to_string(), "http 500: internal failure");
        assert_eq!(err.kind(), ErrorKind::Status);
    }

    #[test]
    fn test_timeout_is_transport_kind() {
        let err = CaseError::Timeout { timeout_ms: 8000 };
        assert_eq!(err.kind(), ErrorKind::Transport);
        assert!(err.to_string().contains("8000ms"));
        assert_eq!(CaseError::Decode("x".into()).kind(), ErrorKind::Decode);
    }
}
