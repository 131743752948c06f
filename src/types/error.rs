//! Unified Error Type System
//!
//! Centralized error types for the entire application.
//! Provides error classification for retry decisions on generation requests.
//!
//! ## Error Kinds
//!
//! - **InvalidRequest**: Malformed or empty request (fail fast)
//! - **Authentication**: Credential failures (fail fast)
//! - **RateLimit**: API rate limiting (wait and retry)
//! - **Server**: Provider-side 5xx failures (retry)
//! - **Timeout**: Request deadline expired (retry)
//! - **Network**: Connectivity issues (retry)
//! - **StreamError**: Failure after a stream started emitting (terminal)
//! - **Unknown**: Anything unrecognized (conservative retry)
//!
//! ## Design Principles
//!
//! - Single application error type (DraftError) at the crate boundary
//! - ClassifiedError is immutable once constructed
//! - Retry eligibility derives from the kind, never from ad-hoc checks
//! - No panic/unwrap - all errors are recoverable

use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

// =============================================================================
// Error Kinds
// =============================================================================

/// Failure taxonomy for generation requests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed or empty request - don't retry, fix request
    InvalidRequest,
    /// Authentication failed - fail fast, don't retry
    Authentication,
    /// Rate limited - wait then retry
    RateLimit,
    /// Provider-side server failure - retry
    Server,
    /// Request deadline expired - retry
    Timeout,
    /// Network/connectivity issues - retry
    Network,
    /// Stream failed after content started flowing - terminal for that call
    StreamError,
    /// Unknown error - conservative retry
    Unknown,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidRequest => write!(f, "INVALID_REQUEST"),
            Self::Authentication => write!(f, "AUTHENTICATION"),
            Self::RateLimit => write!(f, "RATE_LIMIT"),
            Self::Server => write!(f, "SERVER"),
            Self::Timeout => write!(f, "TIMEOUT"),
            Self::Network => write!(f, "NETWORK"),
            Self::StreamError => write!(f, "STREAM_ERROR"),
            Self::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

impl ErrorKind {
    /// Whether requests failing with this kind are eligible for another attempt
    pub fn default_retryable(&self) -> bool {
        !matches!(self, Self::InvalidRequest | Self::Authentication)
    }
}

// =============================================================================
// Classified Error
// =============================================================================

/// Normalized failure descriptor with a taxonomy kind and retry eligibility.
///
/// Immutable once constructed. `retryable` is derived from the kind at
/// construction; the raw cause is kept for logging only.
#[derive(Debug, Clone)]
pub struct ClassifiedError {
    /// Failure taxonomy kind
    pub kind: ErrorKind,
    /// Detailed error message
    pub message: String,
    /// Whether another attempt may succeed
    pub retryable: bool,
    /// Underlying cause, when one exists
    cause: Option<Arc<dyn std::error::Error + Send + Sync>>,
}

impl std::fmt::Display for ClassifiedError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.kind, self.message)
    }
}

impl std::error::Error for ClassifiedError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause
            .as_deref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

impl ClassifiedError {
    /// Create a classified error; retry eligibility follows the kind
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            retryable: kind.default_retryable(),
            cause: None,
        }
    }

    /// Attach the underlying cause
    pub fn with_cause(
        mut self,
        cause: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        self.cause = Some(Arc::new(cause));
        self
    }

    /// Invalid-request error for a blank prompt
    pub fn empty_prompt() -> Self {
        Self::new(ErrorKind::InvalidRequest, "prompt must not be empty")
    }
}

// =============================================================================
// Error Classifier
// =============================================================================

/// Maps raw failures (status codes, message text, transport errors) to
/// [`ClassifiedError`] values. Pure mapping; never fails.
pub struct ErrorClassifier;

impl ErrorClassifier {
    /// Classify an HTTP status code with its response body text.
    ///
    /// Rules apply in priority order: auth and rate-limit statuses first,
    /// then server errors, then timeouts (status 408 or a timeout-bearing
    /// message), then 400; unrecognized statuses fall back to message
    /// classification.
    pub fn classify_status(status: u16, message: &str) -> ClassifiedError {
        let lower = message.to_lowercase();
        match status {
            401 | 403 => ClassifiedError::new(ErrorKind::Authentication, message),
            429 => ClassifiedError::new(ErrorKind::RateLimit, message),
            s if s >= 500 => ClassifiedError::new(ErrorKind::Server, message),
            408 => ClassifiedError::new(ErrorKind::Timeout, message),
            _ if lower.contains("timeout") || lower.contains("timed out") => {
                ClassifiedError::new(ErrorKind::Timeout, message)
            }
            400 => ClassifiedError::new(ErrorKind::InvalidRequest, message),
            _ => Self::classify_message(message),
        }
    }

    /// Classify from message text alone, in priority order.
    ///
    /// Totally unrecognized input yields Unknown/retryable.
    pub fn classify_message(message: &str) -> ClassifiedError {
        let lower = message.to_lowercase();

        if lower.contains("timeout") || lower.contains("timed out") {
            return ClassifiedError::new(ErrorKind::Timeout, message);
        }

        if lower.contains("network") || lower.contains("connection") {
            return ClassifiedError::new(ErrorKind::Network, message);
        }

        if lower.contains("stream") {
            return ClassifiedError::new(ErrorKind::StreamError, message);
        }

        ClassifiedError::new(ErrorKind::Unknown, message)
    }

    /// Classify a transport-level failure from the HTTP client.
    pub fn classify_transport(err: &reqwest::Error) -> ClassifiedError {
        if err.is_timeout() {
            return ClassifiedError::new(ErrorKind::Timeout, err.to_string());
        }
        if err.is_connect() {
            return ClassifiedError::new(
                ErrorKind::Network,
                format!("connection failed: {err}"),
            );
        }
        if let Some(status) = err.status() {
            return Self::classify_status(status.as_u16(), &err.to_string());
        }
        Self::classify_message(&err.to_string())
    }
}

// =============================================================================
// Application Error
// =============================================================================

#[derive(Debug, Error)]
pub enum DraftError {
    // -------------------------------------------------------------------------
    // System Errors (auto From impl)
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // -------------------------------------------------------------------------
    // Generation Errors
    // -------------------------------------------------------------------------
    /// Classified generation failure surfaced from the client
    #[error("generation failed: {0}")]
    Generation(ClassifiedError),

    /// Operation timeout with context
    #[error("timeout after {duration:?}: {operation}")]
    Timeout {
        operation: String,
        duration: Duration,
    },

    // -------------------------------------------------------------------------
    // Domain Errors
    // -------------------------------------------------------------------------
    #[error("template error: {0}")]
    Template(String),

    #[error("config error: {0}")]
    Config(String),
}

impl From<ClassifiedError> for DraftError {
    fn from(err: ClassifiedError) -> Self {
        DraftError::Generation(err)
    }
}

impl DraftError {
    /// Create a timeout error
    pub fn timeout(operation: impl Into<String>, duration: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            duration,
        }
    }

    /// Check if this error is recoverable (can be retried)
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Generation(e) => e.retryable,
            Self::Timeout { .. } => true,
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, DraftError>;

// =============================================================================
// Tests
// =============================================================================
