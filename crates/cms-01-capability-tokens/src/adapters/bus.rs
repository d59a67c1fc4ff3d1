//! # Kernel Adapter
//!
//! Registers the token service's listeners on the kernel.
//!
//! ## Event Flow
//!
//! ```text
//! auth ──issueModuleToken (skipJWT + secret)──→ [Kernel] ──→ [Token Service] ──→ reply(token)
//! any  ──issueModuleToken (high token + secret)→ [Kernel] ──→ [Token Service] ──→ reply(token)
//! auth ──issueUserToken (high token)──────────→ [Kernel] ──→ [Token Service] ──→ reply(token)
//! any  ──issuePublicToken (public)────────────→ [Kernel] ──→ [Token Service] ──→ reply(token)
//! any  ──verifyToken (token)──────────────────→ [Kernel] ──→ [Token Service] ──→ reply(claims)
//! ```
//!
//! The kernel authenticates the caller; these listeners check that the
//! caller's verified claims are trusted enough for the issuance requested.

use crate::domain::errors::IssueError;
use crate::ports::inbound::CapabilityTokenApi;
use crate::ports::outbound::TimeSource;
use crate::service::TokenService;
use serde_json::Value;
use shared_bus::{EventName, KernelHandle, Reply};
use shared_types::{
    BusError, BusResult, IssueModuleTokenRequest, IssuePublicTokenRequest, IssueUserTokenRequest, ModuleType,
    Payload, TrustLevel, VerifyTokenRequest,
};
use std::sync::Arc;
use tracing::warn;

/// Module name the token listeners are registered under.
pub const TOKEN_SERVICE_MODULE: &str = "capabilityTokens";

/// Register the four token listeners. Returns how many were accepted.
pub fn register_token_listeners<C>(kernel: &dyn KernelHandle, service: Arc<TokenService<C>>) -> usize
where
    C: TimeSource + 'static,
{
    let mut registered = 0;

    let svc = service.clone();
    registered += usize::from(
        kernel
            .on(
                EventName::IssueModuleToken,
                TOKEN_SERVICE_MODULE,
                ModuleType::Core,
                Arc::new(move |payload: Payload, reply: Reply| {
                    respond(&reply, EventName::IssueModuleToken, issue_module_token(svc.as_ref(), &payload));
                }),
            )
            .is_some(),
    );

    let svc = service.clone();
    registered += usize::from(
        kernel
            .on(
                EventName::IssueUserToken,
                TOKEN_SERVICE_MODULE,
                ModuleType::Core,
                Arc::new(move |payload: Payload, reply: Reply| {
                    respond(&reply, EventName::IssueUserToken, issue_user_token(svc.as_ref(), &payload));
                }),
            )
            .is_some(),
    );

    let svc = service.clone();
    registered += usize::from(
        kernel
            .on(
                EventName::IssuePublicToken,
                TOKEN_SERVICE_MODULE,
                ModuleType::Core,
                Arc::new(move |payload: Payload, reply: Reply| {
                    respond(&reply, EventName::IssuePublicToken, issue_public_token(svc.as_ref(), &payload));
                }),
            )
            .is_some(),
    );

    let svc = service;
    registered += usize::from(
        kernel
            .on(
                EventName::VerifyToken,
                TOKEN_SERVICE_MODULE,
                ModuleType::Core,
                Arc::new(move |payload: Payload, reply: Reply| {
                    respond(&reply, EventName::VerifyToken, verify_token(svc.as_ref(), &payload));
                }),
            )
            .is_some(),
    );

    registered
}

fn respond(reply: &Reply, event: EventName, result: BusResult) {
    if let Err(e) = &result {
        warn!(event = %event, error = %e, "Token request refused");
    }
    reply.send(result);
}

// =============================================================================
// HANDLERS
// =============================================================================

fn issue_module_token<C: TimeSource>(service: &TokenService<C>, payload: &Payload) -> BusResult {
    let request: IssueModuleTokenRequest = payload.body_as()?;
    // skipJWT only reaches here after the kernel checked the allowlist and secret.
    let token = if payload.skip_jwt {
        service.mint_module_token(&request.sign_as_module, request.trust_level)?
    } else {
        require_high_trust(payload, "issueModuleToken")?;
        let secret = request.auth_secret.as_deref().ok_or(IssueError::InvalidSecret)?;
        service.issue_module_token(secret, &request.sign_as_module, request.trust_level)?
    };
    Ok(Value::String(token))
}

fn issue_user_token<C: TimeSource>(service: &TokenService<C>, payload: &Payload) -> BusResult {
    require_high_trust(payload, "issueUserToken")?;
    let request: IssueUserTokenRequest = payload.body_as()?;
    let token = service.issue_user_token(&request)?;
    Ok(Value::String(token))
}

fn issue_public_token<C: TimeSource>(service: &TokenService<C>, payload: &Payload) -> BusResult {
    let request: IssuePublicTokenRequest = payload.body_as()?;
    let token = service.issue_public_token(&request.purpose)?;
    Ok(Value::String(token))
}

fn verify_token<C: TimeSource>(service: &TokenService<C>, payload: &Payload) -> BusResult {
    let request: VerifyTokenRequest = payload.body_as()?;
    let claims = service.verify(&request.token)?;
    serde_json::to_value(claims).map_err(|e| BusError::Handler(e.to_string()))
}

fn require_high_trust(payload: &Payload, operation: &str) -> Result<(), BusError> {
    match payload.claims() {
        Some(claims) if !claims.is_public && claims.trusted_at_least(TrustLevel::High) => Ok(()),
        _ => Err(IssueError::Unauthorized(format!("{operation} requires a high-trust module token")).into()),
    }
}
