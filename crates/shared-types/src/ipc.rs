//! # IPC Request Bodies
//!
//! Typed bodies of the core events. Callers build them with
//! [`Payload::with_request`](crate::Payload::with_request); listeners decode
//! them with [`Payload::body_as`](crate::Payload::body_as).
//!
//! Identity never appears here: the envelope's `module_name` is authoritative.

use crate::entities::{ModuleRegistryEntry, RegistryChanges, RegistryFilter, TrustLevel};
use serde::{Deserialize, Serialize};

// =============================================================================
// CAPABILITY TOKENS
// =============================================================================

/// `issueModuleToken`: mint a service token for another module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueModuleTokenRequest {
    /// Identity the token will assert.
    pub sign_as_module: String,
    /// Tier chosen by the issuer.
    pub trust_level: TrustLevel,
    /// Inter-module secret. Required when the caller authenticates with a
    /// token; on the bootstrap path the kernel has already checked it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_secret: Option<String>,
}

/// `issueUserToken`: mint a session token after authentication.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueUserTokenRequest {
    pub user_id: String,
    /// First entry is the primary role.
    pub roles: Vec<String>,
    /// Explicit grants merged with the role policy.
    #[serde(default)]
    pub permissions: Vec<String>,
}

/// `issuePublicToken`: mint a short-lived pre-authentication token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuePublicTokenRequest {
    pub purpose: String,
}

/// `verifyToken`: verify a token presented by a third party.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyTokenRequest {
    pub token: String,
}

// =============================================================================
// MODULE REGISTRY
// =============================================================================

/// `registrySelect`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrySelectRequest {
    pub filter: RegistryFilter,
}

/// `registryInsert`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryInsertRequest {
    pub entry: ModuleRegistryEntry,
}

/// `registryUpdate`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryUpdateRequest {
    pub module_name: String,
    pub changes: RegistryChanges,
}

/// `reactivateModule`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReactivateModuleRequest {
    pub module_name: String,
}
