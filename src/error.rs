//! EPP client error types.
//!
//! # Error Classification
//!
//! Errors fall into four families with distinct recovery rules:
//!
//! - **Usage**: an operation was invoked in the wrong protocol state under
//!   manual session handling. Programmer error, never retried.
//! - **Transport**: the HTTP exchange failed. Only [`TransportError::ConnectionLost`]
//!   is recoverable, by exactly one reconnect and resend per top-level call.
//! - **Protocol**: the registry answered with a result code >= 2000. Two
//!   `(code, reason)` pairs are absorbed by the session state machine, all
//!   others reach the caller unchanged.
//! - **Store**: the persisted session state exists but cannot be parsed.
//!   Fatal; a missing store file is not an error.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Result code returned by a registry for "command use error".
pub const CODE_COMMAND_USE_ERROR: u32 = 2002;

/// Registry sub-reason: the credential already holds an open session.
pub const REASON_ALREADY_LOGGED_IN: u32 = 4014;

/// Registry sub-reason: the session cookie refers to an expired session.
pub const REASON_SESSION_EXPIRED: u32 = 4015;

/// EPP client errors.
#[derive(Error, Debug)]
pub enum EppError {
    /// Operation invoked in an invalid protocol state (manual handling).
    #[error("Usage error: {0}")]
    Usage(String),

    /// HTTP exchange with the registry failed.
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Registry rejected the command.
    #[error("Protocol error: {0}")]
    Protocol(ProtocolError),

    /// Persisted session state is unreadable or cannot be written.
    #[error("Session store {path:?}: {reason}")]
    Store {
        /// Store file location.
        path: PathBuf,
        /// Underlying failure.
        reason: String,
    },

    /// XML could not be encoded or decoded.
    #[error("Codec error: {0}")]
    Codec(String),

    /// Configuration error.
    #[error("Config error: {0}")]
    Config(String),

    /// I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl EppError {
    /// Whether this error may be recovered by reconnecting and resending.
    pub fn is_retryable_transport(&self) -> bool {
        matches!(self, EppError::Transport(t) if t.is_retryable())
    }

    /// Borrow the protocol error, if this is one.
    pub fn as_protocol(&self) -> Option<&ProtocolError> {
        match self {
            EppError::Protocol(p) => Some(p),
            _ => None,
        }
    }
}

/// Connection-level failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// Peer closed or reset the connection, or it could not be opened.
    #[error("connection lost: {0}")]
    ConnectionLost(String),

    /// The per-request deadline expired.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// Gateway answered with a non-success HTTP status.
    #[error("unexpected HTTP status {0}")]
    HttpStatus(u16),

    /// HTTP client could not be built or the request was malformed.
    #[error("client error: {0}")]
    Client(String),
}

impl TransportError {
    /// Only a lost connection is safe to resend after reconnecting. A timed
    /// out command may already have been applied by the registry.
    pub fn is_retryable(&self) -> bool {
        matches!(self, TransportError::ConnectionLost(_))
    }
}

/// Registry error response (result code >= 2000).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{code} {message}{}", .reason_code.map(|r| format!(" (reason {r})")).unwrap_or_default())]
pub struct ProtocolError {
    /// EPP result code.
    pub code: u32,
    /// Human readable result message.
    pub message: String,
    /// Registry-specific sub-reason code.
    pub reason_code: Option<u32>,
}

impl ProtocolError {
    /// Registry reports the credential is already logged in.
    pub fn is_already_logged_in(&self) -> bool {
        self.code == CODE_COMMAND_USE_ERROR && self.reason_code == Some(REASON_ALREADY_LOGGED_IN)
    }

    /// Registry reports the session behind our cookie has expired.
    pub fn is_session_expired(&self) -> bool {
        self.code == CODE_COMMAND_USE_ERROR && self.reason_code == Some(REASON_SESSION_EXPIRED)
    }
}

impl From<ProtocolError> for EppError {
    fn from(err: ProtocolError) -> Self {
        EppError::Protocol(err)
    }
}

/// Result type alias for EPP operations
pub type Result<T> = std::result::Result<T, EppError>;

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_builder() {
            TransportError::Client(err.to_string())
        } else if let Some(status) = err.status() {
            TransportError::HttpStatus(status.as_u16())
        } else {
            // Connect, request and body failures all mean the socket went away.
            TransportError::ConnectionLost(err.to_string())
        }
    }
}

impl From<reqwest::Error> for EppError {
    fn from(err: reqwest::Error) -> Self {
        EppError::Transport(err.into())
    }
}

impl From<toml::de::Error> for EppError {
    fn from(err: toml::de::Error) -> Self {
        EppError::Config(err.to_string())
    }
}

impl From<quick_xml::Error> for EppError {
    fn from(err: quick_xml::Error) -> Self {
        EppError::Codec(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_pairs() {
        let already = ProtocolError {
            code: 2002,
            message: "Command use error".to_string(),
            reason_code: Some(4014),
        };
        assert!(already.is_already_logged_in());
        assert!(!already.is_session_expired());

        let expired = ProtocolError {
            reason_code: Some(4015),
            ..already.clone()
        };
        assert!(expired.is_session_expired());

        let other = ProtocolError {
            code: 2303,
            message: "Object does not exist".to_string(),
            reason_code: Some(4015),
        };
        assert!(!other.is_session_expired());
    }

    #[test]
    fn test_only_connection_loss_is_retryable() {
        assert!(EppError::from(TransportError::ConnectionLost("reset".into())).is_retryable_transport());
        assert!(!EppError::from(TransportError::Timeout(Duration::from_secs(1))).is_retryable_transport());
        assert!(!EppError::from(TransportError::HttpStatus(502)).is_retryable_transport());
        assert!(!EppError::Usage("x".into()).is_retryable_transport());
    }

    #[test]
    fn test_protocol_error_display() {
        let err = ProtocolError {
            code: 2002,
            message: "Command use error".to_string(),
            reason_code: Some(4015),
        };
        assert_eq!(err.to_string(), "2002 Command use error (reason 4015)");
    }
}
