//! Error taxonomy for the login flow.
//!
//! Every step of the sequencer reports failures as an [`AuthError`]; the
//! sequencer turns them into a user-facing status message.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Category of an authentication failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthErrorKind {
    /// No wallet connector detected (or its key source is missing)
    WalletUnavailable,
    /// The wallet refused the connection request
    ConnectionRejected,
    /// The user cancelled the signature request
    SignatureRejected,
    /// Any other wallet failure while signing or connecting
    Wallet,
    /// Non-2xx HTTP status, timeout, or transport failure
    Network,
    /// Successful response missing an expected field
    Protocol,
    /// Server explicitly rejected the credentials
    Auth,
    /// Durable session storage could not be read or written
    Storage,
}

impl fmt::Display for AuthErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthErrorKind::WalletUnavailable => write!(f, "wallet_unavailable"),
            AuthErrorKind::ConnectionRejected => write!(f, "connection_rejected"),
            AuthErrorKind::SignatureRejected => write!(f, "signature_rejected"),
            AuthErrorKind::Wallet => write!(f, "wallet"),
            AuthErrorKind::Network => write!(f, "network"),
            AuthErrorKind::Protocol => write!(f, "protocol"),
            AuthErrorKind::Auth => write!(f, "auth"),
            AuthErrorKind::Storage => write!(f, "storage"),
        }
    }
}

/// Structured authentication error with kind and details.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthError {
    /// Error category
    pub kind: AuthErrorKind,
    /// One-line summary suitable for display
    pub message: String,
    /// Optional additional details (e.g., raw response body)
    pub details: Option<String>,
}

impl AuthError {
    /// Fixed text shown when the user rejects the signature request.
    pub const SIGNATURE_REJECTED_MESSAGE: &str = "Signature request was rejected.";
    /// Fixed text shown for any non-rejection signing failure.
    pub const SIGNING_FAILED_MESSAGE: &str = "Failed to sign the message.";

    pub fn new(kind: AuthErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            details: None,
        }
    }

    #[must_use]
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn wallet_unavailable(message: impl Into<String>) -> Self {
        Self::new(AuthErrorKind::WalletUnavailable, message)
    }

    pub fn connection_rejected(message: impl Into<String>) -> Self {
        Self::new(AuthErrorKind::ConnectionRejected, message)
    }

    pub fn signature_rejected() -> Self {
        Self::new(
            AuthErrorKind::SignatureRejected,
            Self::SIGNATURE_REJECTED_MESSAGE,
        )
    }

    pub fn signing_failed(details: impl Into<String>) -> Self {
        Self::new(AuthErrorKind::Wallet, Self::SIGNING_FAILED_MESSAGE).with_details(details)
    }

    /// Creates an HTTP status error for the named operation.
    pub fn http_status(operation: &str, status: u16, body: &str) -> Self {
        let err = Self::new(
            AuthErrorKind::Network,
            format!("{operation} failed (HTTP {status})"),
        );
        if body.is_empty() {
            err
        } else {
            err.with_details(body)
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(AuthErrorKind::Network, message)
    }

    pub fn protocol(message: impl Into<String>) -> Self {
        Self::new(AuthErrorKind::Protocol, message)
    }

    pub fn auth(message: impl Into<String>) -> Self {
        Self::new(AuthErrorKind::Auth, message)
    }

    pub fn storage(message: impl Into<String>) -> Self {
        Self::new(AuthErrorKind::Storage, message)
    }

    /// Classifies a transport-level `reqwest` failure.
    pub fn from_reqwest(operation: &str, e: &reqwest::Error) -> Self {
        let err = if e.is_timeout() {
            Self::network(format!("{operation} timed out"))
        } else if e.is_connect() {
            Self::network(format!("{operation} failed: connection error"))
        } else if e.is_decode() {
            Self::protocol(format!("{operation} returned an unreadable response"))
        } else {
            Self::network(format!("{operation} failed: network error"))
        };
        err.with_details(e.to_string())
    }
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AuthError {}

/// Result type for login-flow operations.
pub type AuthResult<T> = std::result::Result<T, AuthError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_status_message_names_the_code() {
        let err = AuthError::http_status("Nonce request", 500, "boom");
        assert_eq!(err.kind, AuthErrorKind::Network);
        assert!(err.message.contains("HTTP 500"));
        assert_eq!(err.details.as_deref(), Some("boom"));
    }

    #[test]
    fn signature_rejection_uses_fixed_text() {
        let err = AuthError::signature_rejected();
        assert_eq!(err.kind, AuthErrorKind::SignatureRejected);
        assert_eq!(err.to_string(), "Signature request was rejected.");
    }

    #[test]
    fn kind_display_is_snake_case() {
        assert_eq!(AuthErrorKind::WalletUnavailable.to_string(), "wallet_unavailable");
        assert_eq!(AuthErrorKind::Protocol.to_string(), "protocol");
    }
}
