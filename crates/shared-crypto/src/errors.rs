//! Token error types.

use thiserror::Error;

/// Capability-token verification errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TokenError {
    /// Not a token at all (wrong shape, bad base64, bad claims JSON)
    #[error("Token could not be decoded: {0}")]
    Malformed(String),

    /// MAC does not verify under the key of the claimed tier
    #[error("Token signature is invalid")]
    InvalidSignature,

    /// Signature fine, but `exp` has passed
    #[error("Token expired at {exp}")]
    Expired {
        /// Expiry, unix seconds
        exp: i64,
    },

    /// Claims could not be serialized for signing
    #[error("Token could not be encoded: {0}")]
    Encoding(String),
}

impl TokenError {
    /// Whether this is a decoding failure rather than a verification failure.
    pub fn is_undecodable(&self) -> bool {
        matches!(self, TokenError::Malformed(_))
    }
}
