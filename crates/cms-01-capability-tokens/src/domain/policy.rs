//! # Issuance Policy
//!
//! Token lifetimes, the role-to-permission table and the public purposes.

use chrono::Duration;
use shared_types::WILDCARD_PERMISSION;
use std::collections::BTreeSet;

/// Pre-authentication flows a public token may be minted for.
pub const PUBLIC_PURPOSES: &[&str] = &["login", "firstInstall", "publicRegistration"];

/// Token lifetimes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenPolicy {
    pub module_ttl: Duration,
    pub user_ttl: Duration,
    pub public_ttl: Duration,
}

impl Default for TokenPolicy {
    fn default() -> Self {
        Self {
            module_ttl: Duration::hours(24),
            user_ttl: Duration::hours(1),
            public_ttl: Duration::minutes(5),
        }
    }
}

/// Permissions a role grants on its own.
pub fn permissions_for_role(role: &str) -> &'static [&'static str] {
    match role {
        "admin" => &[WILDCARD_PERMISSION],
        "editor" => &["content.read", "content.write"],
        "viewer" => &["content.read"],
        _ => &[],
    }
}

/// Union of every role's grants and the explicit grants, sorted and deduplicated.
pub fn merge_permissions(roles: &[String], explicit: &[String]) -> Vec<String> {
    let mut merged: BTreeSet<String> = roles
        .iter()
        .flat_map(|role| permissions_for_role(role).iter().map(|p| p.to_string()))
        .collect();
    merged.extend(explicit.iter().cloned());
    merged.into_iter().collect()
}

/// Whether `purpose` is a known public flow.
pub fn is_public_purpose(purpose: &str) -> bool {
    PUBLIC_PURPOSES.contains(&purpose)
}
