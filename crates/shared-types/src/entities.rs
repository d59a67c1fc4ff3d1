//! # Core Domain Entities
//!
//! Module identities and the persisted module registry state.
//!
//! ## Clusters
//!
//! - **Identity**: `ModuleName`, `ModuleType`, `TrustLevel`
//! - **Registry**: `ModuleInfo`, `ModuleRegistryEntry`, `RegistryFilter`, `RegistryChanges`

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// CLUSTER A: IDENTITY
// =============================================================================

/// Maximum length of a module name.
pub const MAX_MODULE_NAME_LEN: usize = 64;

/// A validated module identity.
///
/// Names start with an ASCII letter and continue with ASCII alphanumerics,
/// `_`, `-` or `.`. Anything else is treated as a structurally invalid
/// payload by the kernel.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ModuleName(String);

impl ModuleName {
    /// Parse and validate a module name.
    pub fn parse(raw: &str) -> Option<Self> {
        if raw.is_empty() || raw.len() > MAX_MODULE_NAME_LEN {
            return None;
        }
        let mut chars = raw.chars();
        let first = chars.next()?;
        if !first.is_ascii_alphabetic() {
            return None;
        }
        if !chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.')) {
            return None;
        }
        Some(Self(raw.to_string()))
    }

    /// The name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ModuleName {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value).ok_or_else(|| format!("invalid module name: {value:?}"))
    }
}

impl From<ModuleName> for String {
    fn from(name: ModuleName) -> Self {
        name.0
    }
}

impl AsRef<str> for ModuleName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl PartialEq<&str> for ModuleName {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

impl fmt::Display for ModuleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Provenance of a module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModuleType {
    /// Shipped with the platform.
    Core,
    /// Third-party plugin admitted by the module loader.
    Community,
}

impl ModuleType {
    /// Wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Core => "core",
            Self::Community => "community",
        }
    }
}

impl fmt::Display for ModuleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Trust tier carried by a capability token.
///
/// Each tier selects its own derived signing key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrustLevel {
    /// Core service-to-service calls.
    High,
    /// Authenticated user sessions.
    Medium,
    /// Public tokens and community plugins.
    Low,
}

impl TrustLevel {
    /// All tiers, highest first.
    pub const ALL: [TrustLevel; 3] = [TrustLevel::High, TrustLevel::Medium, TrustLevel::Low];

    /// Wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

impl fmt::Display for TrustLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// CLUSTER B: MODULE REGISTRY
// =============================================================================

/// Plugin metadata as declared by the plugin author.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleInfo {
    /// Author or vendor.
    pub developer: String,
    /// Plugin version string.
    pub version: String,
    /// Short description.
    pub description: String,
    /// Optional page-builder component identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grapes_component: Option<String>,
}

/// Persisted state of one known plugin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleRegistryEntry {
    /// Unique key.
    pub module_name: String,
    /// Whether the loader should attempt to load this module in pass 1.
    pub is_active: bool,
    /// Last health-check / init / meltdown failure.
    pub last_error: Option<String>,
    /// Declared metadata.
    pub module_info: ModuleInfo,
    /// When the plugin folder was first discovered.
    pub created_at: DateTime<Utc>,
    /// Last state change.
    pub updated_at: DateTime<Utc>,
}

impl ModuleRegistryEntry {
    /// A freshly discovered plugin starts active with no error.
    pub fn discovered(module_name: impl Into<String>, module_info: ModuleInfo, now: DateTime<Utc>) -> Self {
        Self {
            module_name: module_name.into(),
            is_active: true,
            last_error: None,
            module_info,
            created_at: now,
            updated_at: now,
        }
    }

    /// Inactive and carrying a non-empty error: eligible for the auto-retry pass.
    pub fn is_retry_candidate(&self) -> bool {
        !self.is_active && self.last_error.as_deref().is_some_and(|e| !e.is_empty())
    }
}

/// Selection criteria for registry reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "camelCase")]
pub enum RegistryFilter {
    /// Every entry.
    All,
    /// Entries with `is_active == true`.
    Active,
    /// Inactive entries with a non-empty `last_error`.
    RetryCandidates,
    /// A single entry by name.
    ByName(String),
}

impl RegistryFilter {
    /// Whether an entry satisfies this filter.
    pub fn matches(&self, entry: &ModuleRegistryEntry) -> bool {
        match self {
            Self::All => true,
            Self::Active => entry.is_active,
            Self::RetryCandidates => entry.is_retry_candidate(),
            Self::ByName(name) => entry.module_name == *name,
        }
    }
}

/// How an update treats `last_error`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "op", content = "message", rename_all = "camelCase")]
pub enum LastErrorUpdate {
    /// Leave as is.
    #[default]
    Keep,
    /// Reset to null.
    Clear,
    /// Record a failure.
    Set(String),
}

/// A partial update of a registry entry.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryChanges {
    /// New `is_active` value, if changing.
    #[serde(default)]
    pub is_active: Option<bool>,
    /// Treatment of `last_error`.
    #[serde(default)]
    pub last_error: LastErrorUpdate,
    /// Replacement metadata, if changing.
    #[serde(default)]
    pub module_info: Option<ModuleInfo>,
}

impl RegistryChanges {
    /// Mark inactive and record why.
    pub fn deactivate(reason: impl Into<String>) -> Self {
        Self {
            is_active: Some(false),
            last_error: LastErrorUpdate::Set(reason.into()),
            module_info: None,
        }
    }

    /// Clear `last_error` without touching `is_active`.
    pub fn clear_error() -> Self {
        Self {
            last_error: LastErrorUpdate::Clear,
            ..Self::default()
        }
    }

    /// Mark active and clear `last_error`.
    pub fn reactivate() -> Self {
        Self {
            is_active: Some(true),
            last_error: LastErrorUpdate::Clear,
            module_info: None,
        }
    }

    /// Apply to an entry, stamping `updated_at`.
    pub fn apply(&self, entry: &mut ModuleRegistryEntry, now: DateTime<Utc>) {
        if let Some(active) = self.is_active {
            entry.is_active = active;
        }
        match &self.last_error {
            LastErrorUpdate::Keep => {}
            LastErrorUpdate::Clear => entry.last_error = None,
            LastErrorUpdate::Set(message) => entry.last_error = Some(message.clone()),
        }
        if let Some(info) = &self.module_info {
            entry.module_info = info.clone();
        }
        entry.updated_at = now;
    }
}
