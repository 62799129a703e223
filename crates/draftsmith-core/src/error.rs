//! Error types for the Draftsmith application.

use thiserror::Error;

/// A shared error type for the entire Draftsmith application.
///
/// Variants follow the failure taxonomy of the drafting workflow:
/// local validation, transport, HTTP-with-detail, protocol, export.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DraftError {
    /// Local validation error; no network call was made.
    #[error("{0}")]
    Validation(String),

    /// Network-level failure (unreachable host, broken connection).
    #[error("request failed: {0}")]
    Transport(String),

    /// Non-2xx response from the drafting agent. `detail` is the server's
    /// `detail` field when present, else a generic message.
    #[error("{detail}")]
    Http { status: u16, detail: String },

    /// Response body that is empty, undecodable, or carries an unrecognized
    /// action tag. Never silently ignored, never partially applied.
    #[error("unexpected response from the drafting agent: {0}")]
    Protocol(String),

    /// Export over content that is entirely blank.
    #[error("nothing to export: every section draft is empty")]
    NothingToExport,

    /// IO error (file system operations)
    #[error("IO error: {0}")]
    Io(String),

    /// Serialization/deserialization error
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Internal error (should not happen in normal operation)
    #[error("internal error: {0}")]
    Internal(String),
}

impl DraftError {
    /// Creates a Validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Creates a Transport error
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }

    /// Creates an Http error carrying the server-provided detail
    pub fn http(status: u16, detail: impl Into<String>) -> Self {
        Self::Http {
            status,
            detail: detail.into(),
        }
    }

    /// Creates a Protocol error
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol(message.into())
    }

    /// Creates an Internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Check if this is a local validation error
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Check if this is a transport-level error
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }

    /// Check if this is a protocol error
    pub fn is_protocol(&self) -> bool {
        matches!(self, Self::Protocol(_))
    }

    /// The text to surface in the chat transcript when this error interrupts
    /// a workflow request. HTTP details are shown verbatim; everything else
    /// falls back to the error's display form.
    pub fn user_message(&self) -> String {
        match self {
            Self::Http { detail, .. } => detail.clone(),
            other => other.to_string(),
        }
    }
}

impl From<std::io::Error> for DraftError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(format!("{} (kind: {:?})", err, err.kind()))
    }
}

impl From<serde_json::Error> for DraftError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// A type alias for `Result<T, DraftError>`.
pub type Result<T> = std::result::Result<T, DraftError>;
