//! Error types for the analysis pipeline

use thiserror::Error;

/// Result type alias using our custom Error
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the analysis pipeline
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    // Analyzer errors
    #[error("Transient network error: {0}")]
    TransientNetwork(String),

    #[error("Malformed response from {service}: {detail}")]
    MalformedResponse { service: String, detail: String },

    #[error("Request to {service} timed out after {elapsed_ms}ms")]
    RequestTimeout { service: String, elapsed_ms: u64 },

    #[error("HTTP {status} from {service}")]
    HttpStatus { service: String, status: u16 },

    #[error("Analyzer {0} exhausted all retry attempts")]
    RetriesExhausted(String),

    // Pipeline errors
    #[error("Pipeline timeout after {0}ms")]
    PipelineTimeout(u64),

    #[error("Candidate queue closed")]
    QueueClosed,

    // Collaborator errors
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Notification error: {0}")]
    Notification(String),

    // Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(String),
}

impl Error {
    /// Check if this error is retryable (transient)
    ///
    /// Malformed responses are never retried: the upstream already answered,
    /// it just answered garbage. Timeouts, transport failures, and
    /// server-side errors (5xx, 429) are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::TransientNetwork(_) | Error::RequestTimeout { .. } => true,
            Error::HttpStatus { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }
}

// Conversion from reqwest errors, splitting timeouts from transport failures
impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        let service = e
            .url()
            .and_then(|u| u.host_str().map(|h| h.to_string()))
            .unwrap_or_else(|| "unknown".to_string());

        if e.is_timeout() {
            Error::RequestTimeout {
                service,
                elapsed_ms: 0,
            }
        } else if e.is_decode() {
            Error::MalformedResponse {
                service,
                detail: e.to_string(),
            }
        } else {
            Error::TransientNetwork(e.to_string())
        }
    }
}

// Conversion from serde_json errors
impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

// Conversion from I/O errors
impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(Error::TransientNetwork("connection reset".into()).is_retryable());
        assert!(Error::RequestTimeout {
            service: "rugcheck".into(),
            elapsed_ms: 5000
        }
        .is_retryable());
        assert!(Error::HttpStatus {
            service: "rugcheck".into(),
            status: 503
        }
        .is_retryable());
        assert!(Error::HttpStatus {
            service: "rugcheck".into(),
            status: 429
        }
        .is_retryable());

        assert!(!Error::MalformedResponse {
            service: "rugcheck".into(),
            detail: "bad json".into()
        }
        .is_retryable());
        assert!(!Error::HttpStatus {
            service: "rugcheck".into(),
            status: 404
        }
        .is_retryable());
        assert!(!Error::Config("bad".into()).is_retryable());
    }

    #[test]
    fn test_display_names_the_service() {
        let err = Error::HttpStatus {
            service: "dexscreener".into(),
            status: 503,
        };
        assert_eq!(err.to_string(), "HTTP 503 from dexscreener");

        // The service label is context, not a wrapped cause.
        let err: Box<dyn std::error::Error> = Box::new(Error::MalformedResponse {
            service: "rugcheck".into(),
            detail: "bad json".into(),
        });
        assert!(err.source().is_none());
    }
}
