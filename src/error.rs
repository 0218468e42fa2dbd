//! Error types for session encoding, decoding and persistence.

use thiserror::Error;

/// Result type for session operations.
pub type SessionResult<T> = Result<T, SessionError>;

/// Session-specific errors.
///
/// `Authentication` and `Expired` are recovered by [`SessionStore::load`], which degrades to
/// an empty session. `Encoding` is always surfaced to the caller of [`SessionStore::save`].
///
/// [`SessionStore::load`]: crate::SessionStore::load
/// [`SessionStore::save`]: crate::SessionStore::save
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// The token was tampered with, signed by an unknown secret, or is structurally invalid.
    #[error("session token failed authentication")]
    Authentication,

    /// The token authenticated but is outside its validity window.
    #[error("session token expired")]
    Expired,

    /// The session could not be turned into a token.
    #[error("session encoding failed: {0}")]
    Encoding(String),

    /// The secret is unusable as keying material.
    #[error("invalid session secret: {0}")]
    InvalidSecret(String),

    /// The cookie configuration cannot produce a valid `Set-Cookie` header.
    #[error("invalid session cookie configuration: {0}")]
    Config(String),
}

impl SessionError {
    /// Whether the error describes an inbound cookie that was rejected, as opposed to a local
    /// failure to produce one.
    #[must_use]
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::Authentication | Self::Expired)
    }
}
