//! # Security Types
//!
//! Capability-token claims, meltdown reasons and the operator notification
//! record. The signing and verification logic lives in `shared-crypto`; the
//! enforcement lives in the kernel (`shared-bus`).

use crate::entities::TrustLevel;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// =============================================================================
// TOKEN CLAIMS
// =============================================================================

/// Permission that grants everything.
pub const WILDCARD_PERMISSION: &str = "*";

/// Decoded payload of a capability token.
///
/// Which identity fields are present depends on the token kind: service
/// tokens carry `module_name`, session tokens carry `user_id` / `role` /
/// `roles`, public tokens carry `is_public` + `purpose`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenClaims {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub roles: Vec<String>,
    /// Selects the verification key. Unverified until the signature checks out.
    pub trust_level: TrustLevel,
    #[serde(default)]
    pub is_public: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purpose: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub permissions: Vec<String>,
    /// Issued-at, unix seconds.
    pub iat: i64,
    /// Expiry, unix seconds.
    pub exp: i64,
    /// Unique token id.
    pub jti: Uuid,
}

impl TokenClaims {
    /// Bare claims for a tier; the issuer fills in the identity fields.
    pub fn new(trust_level: TrustLevel, iat: i64, exp: i64) -> Self {
        Self {
            module_name: None,
            user_id: None,
            role: None,
            roles: Vec::new(),
            trust_level,
            is_public: false,
            purpose: None,
            permissions: Vec::new(),
            iat,
            exp,
            jti: Uuid::new_v4(),
        }
    }

    /// Expired at `now` (unix seconds).
    pub fn is_expired(&self, now: i64) -> bool {
        now >= self.exp
    }

    /// Permission check honouring `*` and `prefix.*` grants.
    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions.iter().any(|granted| {
            granted == WILDCARD_PERMISSION
                || granted == permission
                || granted
                    .strip_suffix(".*")
                    .and_then(|prefix| permission.strip_prefix(prefix))
                    .is_some_and(|rest| rest.starts_with('.'))
        })
    }

    /// At least as trusted as `required`.
    pub fn trusted_at_least(&self, required: TrustLevel) -> bool {
        // High < Medium < Low in declaration order.
        self.trust_level <= required
    }
}

// =============================================================================
// MELTDOWN
// =============================================================================

/// Why a module's breaker tripped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MeltdownReason {
    /// No capability token on a non-public, non-bootstrap call.
    NoToken,
    /// Token could not be parsed.
    Undecodable,
    /// Signature or expiry check failed.
    InvalidToken,
    /// Allow-listed bootstrap call with the wrong shared secret.
    InvalidSecret,
    /// `skipJWT` on a pair that is not allow-listed.
    UnauthorizedSkipJwt,
    /// Anything else.
    Other(String),
}

impl MeltdownReason {
    /// Short machine-readable reason.
    pub fn as_str(&self) -> &str {
        match self {
            Self::NoToken => "no token",
            Self::Undecodable => "could not decode",
            Self::InvalidToken => "invalid token",
            Self::InvalidSecret => "invalid secret",
            Self::UnauthorizedSkipJwt => "unauthorized skipJWT usage",
            Self::Other(reason) => reason,
        }
    }

    /// Operator-facing notification text.
    pub fn user_message(&self, module_name: &str) -> String {
        match self {
            Self::NoToken => format!(
                "Module '{module_name}' was disabled: it called the event bus without a capability token."
            ),
            Self::InvalidToken => format!(
                "Module '{module_name}' was disabled: it presented an invalid or expired capability token."
            ),
            Self::InvalidSecret => format!(
                "Module '{module_name}' was disabled: its bootstrap secret did not match."
            ),
            Self::UnauthorizedSkipJwt => format!(
                "Module '{module_name}' was disabled: it attempted to bypass token verification without permission."
            ),
            Self::Undecodable => format!(
                "Module '{module_name}' was disabled: its capability token could not be decoded."
            ),
            Self::Other(_) => format!(
                "Module '{module_name}' was disabled after a security violation and will stay offline until restart."
            ),
        }
    }
}

impl fmt::Display for MeltdownReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// NOTIFICATIONS
// =============================================================================

/// Category of an operator notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NotificationType {
    /// Breaker trips.
    Security,
    /// Plugin health-check / init failures.
    ModuleLoad,
    /// Lifecycle messages.
    System,
}

/// Urgency of an operator notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NotificationPriority {
    Low,
    Medium,
    High,
    Critical,
}

/// Record delivered on the notification side-channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub module_name: String,
    pub notification_type: NotificationType,
    pub priority: NotificationPriority,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    /// Stamp a notification with the current time.
    pub fn new(
        module_name: impl Into<String>,
        notification_type: NotificationType,
        priority: NotificationPriority,
        message: impl Into<String>,
    ) -> Self {
        Self {
            module_name: module_name.into(),
            notification_type,
            priority,
            message: message.into(),
            created_at: Utc::now(),
        }
    }
}
