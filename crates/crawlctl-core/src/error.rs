use serde::{Deserialize, Serialize};
use std::fmt;

/// Main error type for crawlctl, mapped directly onto §7's error kinds.
#[derive(Debug)]
pub enum Error {
    /// Submission failed validation (empty URL list, malformed body)
    InvalidInput(String),

    /// No job exists with the given id
    JobNotFound(String),

    /// Result requested before the job reached SUCCEEDED
    JobNotCompleted(String),

    /// Durable queue publish failed after the DJS row was already committed
    TransportError(String),

    /// Durable store (Postgres) or fast-path store (Redis) failure
    StoreError(String),

    /// Configuration errors
    Config(String),

    /// Anything else unexpected at the API boundary
    InternalError(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // §8 S6/S2 require these two literal, bare wire messages; detail
            // travels in ErrorEnvelope.details instead of being appended here.
            Error::InvalidInput(_) => write!(f, "Validation failed"),
            Error::JobNotCompleted(_) => write!(f, "Job not completed"),
            Error::JobNotFound(msg) => write!(f, "Job not found: {}", msg),
            Error::TransportError(msg) => write!(f, "Transport error: {}", msg),
            Error::StoreError(msg) => write!(f, "Store error: {}", msg),
            Error::Config(msg) => write!(f, "Configuration error: {}", msg),
            Error::InternalError(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        None
    }
}

impl From<sqlx::Error> for Error {
    fn from(error: sqlx::Error) -> Self {
        Error::StoreError(error.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(error: serde_json::Error) -> Self {
        Error::InternalError(error.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        Error::InternalError(error.to_string())
    }
}

impl From<toml::de::Error> for Error {
    fn from(error: toml::de::Error) -> Self {
        Error::Config(error.to_string())
    }
}

impl From<config::ConfigError> for Error {
    fn from(error: config::ConfigError) -> Self {
        Error::Config(error.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(error: reqwest::Error) -> Self {
        Error::InternalError(error.to_string())
    }
}

impl From<uuid::Error> for Error {
    fn from(error: uuid::Error) -> Self {
        Error::InvalidInput(format!("invalid job id: {}", error))
    }
}

impl Error {
    pub fn invalid_input<T: Into<String>>(msg: T) -> Self {
        Error::InvalidInput(msg.into())
    }

    pub fn job_not_found<T: Into<String>>(msg: T) -> Self {
        Error::JobNotFound(msg.into())
    }

    pub fn job_not_completed<T: Into<String>>(msg: T) -> Self {
        Error::JobNotCompleted(msg.into())
    }

    pub fn transport<T: Into<String>>(msg: T) -> Self {
        Error::TransportError(msg.into())
    }

    pub fn store<T: Into<String>>(msg: T) -> Self {
        Error::StoreError(msg.into())
    }

    pub fn config<T: Into<String>>(msg: T) -> Self {
        Error::Config(msg.into())
    }

    pub fn internal<T: Into<String>>(msg: T) -> Self {
        Error::InternalError(msg.into())
    }

    /// HTTP status code for the public API boundary (§7)
    pub fn status_code(&self) -> u16 {
        match self {
            Error::InvalidInput(_) => 400,
            Error::JobNotFound(_) => 404,
            Error::JobNotCompleted(_) => 400,
            Error::TransportError(_) => 500,
            Error::StoreError(_) => 500,
            Error::Config(_) => 500,
            Error::InternalError(_) => 500,
        }
    }

    /// Error category for monitoring/logging
    pub fn category(&self) -> &'static str {
        match self {
            Error::InvalidInput(_) => "invalid_input",
            Error::JobNotFound(_) => "job_not_found",
            Error::JobNotCompleted(_) => "job_not_completed",
            Error::TransportError(_) => "transport",
            Error::StoreError(_) => "store",
            Error::Config(_) => "config",
            Error::InternalError(_) => "internal",
        }
    }

    /// The inner detail string carried by every variant, surfaced on the
    /// wire as `ErrorEnvelope.details` rather than folded into `message`.
    pub fn detail(&self) -> &str {
        match self {
            Error::InvalidInput(msg) => msg,
            Error::JobNotFound(msg) => msg,
            Error::JobNotCompleted(msg) => msg,
            Error::TransportError(msg) => msg,
            Error::StoreError(msg) => msg,
            Error::Config(msg) => msg,
            Error::InternalError(msg) => msg,
        }
    }
}

/// Error envelope returned by the REST surface (§6): `{status, message, details}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub status: u16,
    pub message: String,
    pub details: String,
}

impl From<&Error> for ErrorEnvelope {
    fn from(error: &Error) -> Self {
        Self {
            status: error.status_code(),
            message: error.to_string(),
            details: error.detail().to_string(),
        }
    }
}

/// Per-field validation errors, used to build `InvalidInput` detail strings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationErrors {
    pub errors: Vec<FieldError>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self { errors: Vec::new() }
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(FieldError {
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn into_error(self) -> Error {
        Error::InvalidInput(
            serde_json::to_string(&self).unwrap_or_else(|_| "Validation failed".to_string()),
        )
    }
}

impl Default for ValidationErrors {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(Error::invalid_input("x").status_code(), 400);
        assert_eq!(Error::job_not_found("x").status_code(), 404);
        assert_eq!(Error::job_not_completed("x").status_code(), 400);
        assert_eq!(Error::transport("x").status_code(), 500);
        assert_eq!(Error::store("x").status_code(), 500);
        assert_eq!(Error::internal("x").status_code(), 500);
    }

    #[test]
    fn test_error_envelope() {
        let err = Error::job_not_found("abc-123");
        let envelope = ErrorEnvelope::from(&err);
        assert_eq!(envelope.status, 404);
        assert_eq!(envelope.message, "Job not found: abc-123");
        assert_eq!(envelope.details, "abc-123");
    }

    #[test]
    fn test_invalid_input_message_is_bare_literal() {
        let err = Error::invalid_input("urls must not be empty");
        assert_eq!(err.to_string(), "Validation failed");
        let envelope = ErrorEnvelope::from(&err);
        assert_eq!(envelope.message, "Validation failed");
        assert_eq!(envelope.details, "urls must not be empty");
    }

    #[test]
    fn test_job_not_completed_message_is_bare_literal() {
        let err = Error::job_not_completed("job-42");
        assert_eq!(err.to_string(), "Job not completed");
        let envelope = ErrorEnvelope::from(&err);
        assert_eq!(envelope.message, "Job not completed");
        assert_eq!(envelope.details, "job-42");
    }
}
