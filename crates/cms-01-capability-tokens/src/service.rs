//! # Token Service
//!
//! Application service implementing [`CapabilityTokenApi`]. Builds claims per
//! the issuance policy and signs them through the tier keyring.

use crate::domain::errors::IssueError;
use crate::domain::policy::{is_public_purpose, merge_permissions, TokenPolicy};
use crate::ports::inbound::CapabilityTokenApi;
use crate::ports::outbound::{SystemClock, TimeSource};
use shared_crypto::{SharedSecret, TokenCodec};
use shared_types::{IssueUserTokenRequest, ModuleName, TokenClaims, TrustLevel};
use tracing::{debug, info};

/// Capability token service.
pub struct TokenService<C: TimeSource = SystemClock> {
    codec: TokenCodec,
    bootstrap_secret: SharedSecret,
    policy: TokenPolicy,
    clock: C,
}

impl TokenService<SystemClock> {
    /// Create a service on the wall clock with default lifetimes.
    pub fn new(codec: TokenCodec, bootstrap_secret: SharedSecret) -> Self {
        Self::with_clock(codec, bootstrap_secret, TokenPolicy::default(), SystemClock)
    }
}

impl<C: TimeSource> TokenService<C> {
    /// Create a service with explicit lifetimes and clock.
    pub fn with_clock(codec: TokenCodec, bootstrap_secret: SharedSecret, policy: TokenPolicy, clock: C) -> Self {
        Self {
            codec,
            bootstrap_secret,
            policy,
            clock,
        }
    }

    /// The lifetimes in force.
    pub fn policy(&self) -> &TokenPolicy {
        &self.policy
    }

    /// Mint a service token without the secret check.
    ///
    /// For callers the kernel already authorized (bootstrap path or a
    /// high-trust token).
    pub(crate) fn mint_module_token(&self, sign_as_module: &str, trust_level: TrustLevel) -> Result<String, IssueError> {
        let module = ModuleName::parse(sign_as_module)
            .ok_or_else(|| IssueError::InvalidModuleName(sign_as_module.to_string()))?;

        let mut claims = self.claims(trust_level, self.policy.module_ttl);
        claims.module_name = Some(module.to_string());

        let token = self.codec.sign(&claims)?;
        info!(module = %module, trust = %trust_level, jti = %claims.jti, "Issued module token");
        Ok(token)
    }

    fn claims(&self, trust_level: TrustLevel, ttl: chrono::Duration) -> TokenClaims {
        let now = self.clock.now();
        TokenClaims::new(trust_level, now, now + ttl.num_seconds())
    }
}

impl<C: TimeSource> CapabilityTokenApi for TokenService<C> {
    fn issue_module_token(
        &self,
        auth_secret: &str,
        sign_as_module: &str,
        trust_level: TrustLevel,
    ) -> Result<String, IssueError> {
        if !self.bootstrap_secret.matches(auth_secret) {
            return Err(IssueError::InvalidSecret);
        }
        self.mint_module_token(sign_as_module, trust_level)
    }

    fn issue_user_token(&self, request: &IssueUserTokenRequest) -> Result<String, IssueError> {
        if request.user_id.trim().is_empty() {
            return Err(IssueError::MissingUserId);
        }
        let role = request.roles.first().ok_or(IssueError::MissingRoles)?;

        let mut claims = self.claims(TrustLevel::Medium, self.policy.user_ttl);
        claims.user_id = Some(request.user_id.clone());
        claims.role = Some(role.clone());
        claims.roles = request.roles.clone();
        claims.permissions = merge_permissions(&request.roles, &request.permissions);

        let token = self.codec.sign(&claims)?;
        info!(user = %request.user_id, role = %role, jti = %claims.jti, "Issued user token");
        Ok(token)
    }

    fn issue_public_token(&self, purpose: &str) -> Result<String, IssueError> {
        if !is_public_purpose(purpose) {
            return Err(IssueError::UnknownPurpose(purpose.to_string()));
        }

        let mut claims = self.claims(TrustLevel::Low, self.policy.public_ttl);
        claims.is_public = true;
        claims.purpose = Some(purpose.to_string());

        let token = self.codec.sign(&claims)?;
        debug!(purpose, jti = %claims.jti, "Issued public token");
        Ok(token)
    }

    fn verify(&self, token: &str) -> Result<TokenClaims, IssueError> {
        Ok(self.codec.verify(token, self.clock.now())?)
    }
}
