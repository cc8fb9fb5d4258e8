//! Error types and retry/auth classification for the FileMaker Data API.

use crate::response::Envelope;

/// Result type alias for fm-data-client operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for fm-data-client operations.
#[derive(Debug, thiserror::Error)]
#[error("{kind}")]
pub struct Error {
    /// The kind of error that occurred.
    pub kind: ErrorKind,
    /// Optional source error.
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl Error {
    /// Create a new error with the given kind.
    pub fn new(kind: ErrorKind) -> Self {
        Self { kind, source: None }
    }

    /// Create a new error with the given kind and source.
    pub fn with_source(
        kind: ErrorKind,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            kind,
            source: Some(Box::new(source)),
        }
    }

    /// Shorthand for a validation error naming the offending field.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation {
            field: field.into(),
            message: message.into(),
        })
    }

    /// Returns true if this error is worth retrying.
    ///
    /// Retryable classification takes precedence over auth classification:
    /// FileMaker code 952 retries even though it also appears in the
    /// auth-related code set.
    pub fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }

    /// Returns true if this error is a validation failure.
    pub fn is_validation_error(&self) -> bool {
        matches!(self.kind, ErrorKind::Validation { .. })
    }

    /// Returns true if this error relates to authentication: an outright
    /// `Authentication` failure, a FileMaker auth error code (212, 214, 952),
    /// or an HTTP 401/403 on the envelope.
    pub fn is_auth_error(&self) -> bool {
        match &self.kind {
            ErrorKind::Authentication(_) => true,
            ErrorKind::FileMaker {
                code, http_status, ..
            } => {
                matches!(code.as_str(), "212" | "214" | "952")
                    || matches!(http_status, 401 | 403)
            }
            _ => false,
        }
    }

    /// Returns true if the operation was cancelled by the caller.
    pub fn is_cancelled(&self) -> bool {
        matches!(self.kind, ErrorKind::Cancelled)
    }

    /// The FileMaker error code, if this is an envelope-level error.
    pub fn filemaker_code(&self) -> Option<&str> {
        match &self.kind {
            ErrorKind::FileMaker { code, .. } => Some(code),
            _ => None,
        }
    }
}

/// The kind of error that occurred.
#[derive(Debug, thiserror::Error)]
pub enum ErrorKind {
    /// Caller input is wrong; never retryable.
    #[error("validation error on field '{field}': {message}")]
    Validation { field: String, message: String },

    /// Credentials or session rejected.
    #[error("authentication error: {0}")]
    Authentication(String),

    /// Transport-level failure (connection refused, DNS, reset).
    #[error("network error: {0}")]
    Network(String),

    /// Deadline exceeded while waiting on I/O.
    #[error("request timeout")]
    Timeout,

    /// The FileMaker response envelope reported a non-zero error code.
    #[error("FileMaker error {code}: {message} (HTTP {http_status})")]
    FileMaker {
        code: String,
        http_status: u16,
        message: String,
    },

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(String),

    /// Invalid client configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// The operation's cancellation token fired.
    #[error("operation cancelled")]
    Cancelled,

    /// Other error.
    #[error("{0}")]
    Other(String),
}

impl ErrorKind {
    /// Returns true if this error kind is retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            ErrorKind::Network(_) => true,
            ErrorKind::Timeout => true,
            ErrorKind::FileMaker {
                code, http_status, ..
            } => {
                // 952 = host temporarily unavailable, 953 = too many files
                // open. Both retry regardless of the HTTP status they arrive
                // with.
                matches!(code.as_str(), "952" | "953")
                    || is_retryable_status(*http_status)
            }
            _ => false,
        }
    }
}

/// Check if an HTTP status code is typically retryable.
pub(crate) fn is_retryable_status(status: u16) -> bool {
    matches!(status, 429 | 500 | 502 | 503 | 504)
}

/// The canonical reason phrase for an HTTP status.
pub(crate) fn status_text(status: u16) -> String {
    reqwest::StatusCode::from_u16(status)
        .ok()
        .and_then(|s| s.canonical_reason())
        .unwrap_or("unknown error")
        .to_string()
}

/// Check a decoded response envelope against the transport status.
///
/// `messages[0].code == "0"` means success regardless of the HTTP status.
/// Any other code is a business error carrying that code and message. A
/// failure status with no envelope message still produces a `FileMaker`
/// error keyed off the status text.
pub fn check_envelope(envelope: &Envelope, http_status: u16) -> Result<()> {
    let Some(msg) = envelope.messages.first() else {
        if http_status >= 400 {
            return Err(Error::new(ErrorKind::FileMaker {
                code: String::new(),
                http_status,
                message: status_text(http_status),
            }));
        }
        return Ok(());
    };

    if msg.code == "0" {
        return Ok(());
    }

    Err(Error::new(ErrorKind::FileMaker {
        code: msg.code.clone(),
        http_status,
        message: msg.message.clone(),
    }))
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        let kind = if err.is_timeout() {
            ErrorKind::Timeout
        } else if err.is_connect() || err.is_request() {
            ErrorKind::Network(err.to_string())
        } else {
            ErrorKind::Other(err.to_string())
        };

        Error::with_source(kind, err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::with_source(ErrorKind::Json(err.to_string()), err)
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Error::with_source(ErrorKind::Config(format!("invalid URL: {}", err)), err)
    }
}
