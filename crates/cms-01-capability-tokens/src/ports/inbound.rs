//! # Inbound Ports (Driving Ports / API)

use crate::domain::errors::IssueError;
use shared_types::{IssueUserTokenRequest, TokenClaims, TrustLevel};

/// Capability token API.
///
/// Implementations must be thread-safe (`Send + Sync`).
pub trait CapabilityTokenApi: Send + Sync {
    /// Mint a service token asserting `sign_as_module` at `trust_level`.
    ///
    /// # Security
    /// - Requires the static inter-module bootstrap secret
    fn issue_module_token(
        &self,
        auth_secret: &str,
        sign_as_module: &str,
        trust_level: TrustLevel,
    ) -> Result<String, IssueError>;

    /// Mint a medium-trust session token.
    fn issue_user_token(&self, request: &IssueUserTokenRequest) -> Result<String, IssueError>;

    /// Mint a short-lived low-trust token for a pre-authentication flow.
    fn issue_public_token(&self, purpose: &str) -> Result<String, IssueError>;

    /// Verify signature and expiry.
    fn verify(&self, token: &str) -> Result<TokenClaims, IssueError>;
}
