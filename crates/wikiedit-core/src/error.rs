//! Error types for the wikiedit editing core.

use crate::remote::RemoteError;
use crate::session::{Lifecycle, OperationKind};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A shared error type for every editing-session operation.
///
/// Transport failures arrive as [`RemoteError`] and are folded into this type
/// at the controller boundary via the `From` implementation below.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EditError {
    /// Transport-level failure; the user may retry.
    #[error("Network error: {message}")]
    Network { message: String },

    /// Structured API failure routed to a recovery policy by its code.
    #[error("Server error: {code}{}", info.as_deref().map(|i| format!(" ({i})")).unwrap_or_default())]
    Server { code: String, info: Option<String> },

    /// The base revision changed since load.
    #[error("Edit conflict: {message}")]
    Conflict { message: String },

    /// Locally detected problem; no request was sent.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Deliberate cancellation. Never shown to the user.
    #[error("Operation aborted")]
    Aborted,

    /// A request of the same kind is still outstanding.
    #[error("A {0} operation is already in progress")]
    OperationInProgress(OperationKind),

    /// The operation is not valid in the current lifecycle state.
    #[error("Cannot {operation} while {state}")]
    InvalidLifecycle {
        operation: &'static str,
        state: Lifecycle,
    },

    /// The server answered with something we cannot interpret.
    #[error("Invalid response from server: {0}")]
    InvalidResponse(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl EditError {
    // ============================================================================
    // Constructor helpers
    // ============================================================================

    /// Creates a Network error
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    /// Creates a Server error
    pub fn server(code: impl Into<String>, info: Option<String>) -> Self {
        Self::Server {
            code: code.into(),
            info,
        }
    }

    /// Creates a Conflict error
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    /// Creates a Validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Creates an InvalidResponse error
    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::InvalidResponse(message.into())
    }

    /// Creates a Config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Creates an Internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    // ============================================================================
    // Type checking methods
    // ============================================================================

    /// Check if this is a deliberate cancellation
    pub fn is_aborted(&self) -> bool {
        matches!(self, Self::Aborted)
    }

    /// Check if this is an edit conflict
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }

    /// Check if this is a local validation failure
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Check if this is a server error with the given code
    pub fn has_code(&self, expected: &str) -> bool {
        matches!(self, Self::Server { code, .. } if code == expected)
    }

    /// Whether this error should ever reach the user.
    ///
    /// Aborts are the result of our own cancellation and stay silent.
    pub fn is_user_visible(&self) -> bool {
        !self.is_aborted()
    }
}

// ============================================================================
// From implementations for automatic conversion
// ============================================================================

impl From<RemoteError> for EditError {
    fn from(err: RemoteError) -> Self {
        match err {
            RemoteError::Network { message } => Self::Network { message },
            RemoteError::Server { code, info, .. } if code == "editconflict" => Self::Conflict {
                message: info.unwrap_or_else(|| "edit conflict".to_string()),
            },
            RemoteError::Server { code, info, .. } => Self::Server { code, info },
            RemoteError::Aborted => Self::Aborted,
        }
    }
}

impl From<serde_json::Error> for EditError {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidResponse(err.to_string())
    }
}

impl From<toml::de::Error> for EditError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(err.to_string())
    }
}

/// A type alias for `Result<T, EditError>`.
pub type Result<T> = std::result::Result<T, EditError>;
