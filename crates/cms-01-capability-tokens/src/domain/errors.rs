//! # Issuance Errors

use shared_crypto::TokenError;
use shared_types::BusError;
use thiserror::Error;

/// Errors from issuing or verifying capability tokens.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum IssueError {
    /// The bootstrap secret did not match
    #[error("Invalid bootstrap secret")]
    InvalidSecret,

    /// `signAsModule` is not a valid module name
    #[error("Invalid module name: {0:?}")]
    InvalidModuleName(String),

    /// A session token needs at least one role
    #[error("User token requested without roles")]
    MissingRoles,

    /// A session token needs a user id
    #[error("User token requested without a user id")]
    MissingUserId,

    /// Public tokens are only minted for known pre-authentication flows
    #[error("Unknown public token purpose: {0}")]
    UnknownPurpose(String),

    /// The caller is not trusted enough for this issuance
    #[error("Caller not authorized: {0}")]
    Unauthorized(String),

    /// Signing or verification failed
    #[error("Token error: {0}")]
    Token(#[from] TokenError),
}

impl From<IssueError> for BusError {
    fn from(error: IssueError) -> Self {
        match error {
            IssueError::InvalidSecret | IssueError::Unauthorized(_) => BusError::Forbidden(error.to_string()),
            IssueError::Token(TokenError::Encoding(_)) => BusError::Handler(error.to_string()),
            IssueError::Token(_) => BusError::Forbidden(error.to_string()),
            IssueError::InvalidModuleName(_)
            | IssueError::MissingRoles
            | IssueError::MissingUserId
            | IssueError::UnknownPurpose(_) => BusError::MalformedBody(error.to_string()),
        }
    }
}
