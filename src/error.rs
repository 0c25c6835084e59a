//! Unified error types for the Keygate core.
//!
//! Every flow operation returns [`AuthResult`]; the embedding HTTP layer maps
//! [`AuthError::kind`] and [`AuthError::status_code`] onto its response
//! envelope. Anything touching credential or token validity deliberately
//! carries a generic message.

use thiserror::Error;

/// Main error type for the authentication core.
#[derive(Error, Debug)]
pub enum AuthError {
    /// Uniqueness violations (e.g. duplicate email).
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Missing or malformed request fields.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Password policy violation.
    #[error("Password must be at least {0} characters long")]
    WeakPassword(usize),

    /// Credential check failed. Covers unknown user, role mismatch and wrong
    /// password without distinguishing them.
    #[error("Invalid email or password")]
    InvalidCredentials,

    /// Submitted activation code does not match the embedded one.
    #[error("Invalid activation code")]
    CodeMismatch,

    /// Cryptographic or temporal token failure. Expired and malformed are
    /// merged here; the precise cause is logged, never surfaced.
    #[error("Invalid or expired token")]
    InvalidToken,

    /// Not found errors.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Outbound email failure.
    #[error("Email delivery failed: {0}")]
    Delivery(String),

    /// The store write succeeded but the session-cache mirror did not.
    #[error("Session cache update failed: {0}")]
    CacheSync(String),

    /// User store errors.
    #[error("Store error: {0}")]
    Store(String),

    /// Session cache errors.
    #[error("Cache error: {0}")]
    Cache(String),

    /// Internal errors.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AuthError {
    /// Stable machine-readable kind for the boundary layer.
    pub fn kind(&self) -> &'static str {
        match self {
            AuthError::Conflict(_) => "Conflict",
            AuthError::InvalidInput(_) => "InvalidInput",
            AuthError::WeakPassword(_) => "WeakPassword",
            AuthError::InvalidCredentials => "InvalidCredentials",
            AuthError::CodeMismatch => "CodeMismatch",
            AuthError::InvalidToken => "InvalidToken",
            AuthError::NotFound(_) => "NotFound",
            AuthError::Delivery(_) => "DeliveryError",
            AuthError::CacheSync(_) => "CacheSyncError",
            AuthError::Store(_) => "StoreError",
            AuthError::Cache(_) => "CacheError",
            AuthError::Internal(_) => "InternalError",
        }
    }

    /// Suggested HTTP status code for the boundary layer.
    pub fn status_code(&self) -> u16 {
        match self {
            AuthError::Conflict(_) => 409,
            AuthError::InvalidInput(_)
            | AuthError::WeakPassword(_)
            | AuthError::InvalidCredentials
            | AuthError::CodeMismatch
            | AuthError::InvalidToken => 400,
            AuthError::NotFound(_) => 404,
            AuthError::Delivery(_) => 502,
            AuthError::CacheSync(_)
            | AuthError::Store(_)
            | AuthError::Cache(_)
            | AuthError::Internal(_) => 500,
        }
    }

    /// Message safe to show to the end user. Server-side failures collapse to
    /// a fixed string so internals never leak.
    pub fn public_message(&self) -> String {
        match self {
            AuthError::Store(_) | AuthError::Cache(_) | AuthError::Internal(_) => {
                "Internal server error".to_string()
            }
            other => other.to_string(),
        }
    }
}

/// Result type alias for core operations.
pub type AuthResult<T> = Result<T, AuthError>;
