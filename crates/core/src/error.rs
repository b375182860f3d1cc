use serde::{Deserialize, Serialize};

/// Result alias that carries the custom [`OverlayError`] type.
pub type Result<T> = std::result::Result<T, OverlayError>;

/// Common error type for the core crate.
#[derive(Debug, thiserror::Error)]
pub enum OverlayError {
    /// Free-form failure surfaced by a collaborator.
    #[error("{0}")]
    Message(String),
    /// Wrapper around standard IO errors.
    #[error("{0}")]
    Io(#[from] std::io::Error),
    /// A stream configuration could not be parsed or serialized.
    #[error("invalid stream configuration: {0}")]
    Json(#[from] serde_json::Error),
    /// The canonical configuration could not be retrieved.
    #[error("failed to fetch `{url}`: {reason}")]
    Fetch { url: String, reason: String },
}

impl OverlayError {
    /// Creates a new error that simply wraps the provided message.
    pub fn msg<T: Into<String>>(msg: T) -> Self {
        Self::Message(msg.into())
    }
}

impl From<&str> for OverlayError {
    fn from(value: &str) -> Self {
        Self::msg(value)
    }
}

impl From<String> for OverlayError {
    fn from(value: String) -> Self {
        Self::Message(value)
    }
}

/// Outcome of a customize, batch customize or reset operation.
pub type CustomizeResult = std::result::Result<(), CustomizeError>;

/// Expected failure modes of the editing engines. None of them are fatal; the
/// caller decides how to surface them.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CustomizeError {
    /// A required input (configuration, baseline or commit target) is missing.
    #[error("{0} is not defined")]
    Precondition(&'static str),
    /// The call itself is malformed.
    #[error("{0}")]
    Validation(String),
    /// The referenced element does not exist in the relevant configuration.
    #[error("element `{instance_id}` could not be found")]
    NotFound { instance_id: String },
}

impl CustomizeError {
    pub fn validation<T: Into<String>>(msg: T) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found<T: Into<String>>(instance_id: T) -> Self {
        Self::NotFound {
            instance_id: instance_id.into(),
        }
    }
}

/// Tagged status record, `{"status":"success"}` or
/// `{"status":"error","message":...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum CustomizeStatus {
    Success,
    Error { message: String },
}

impl From<&CustomizeResult> for CustomizeStatus {
    fn from(result: &CustomizeResult) -> Self {
        match result {
            Ok(()) => Self::Success,
            Err(err) => Self::Error {
                message: err.to_string(),
            },
        }
    }
}
