//! # Event Names and Allowlists
//!
//! Every kernel call targets an [`EventName`]. Core events are enum variants;
//! plugin events travel as [`EventName::Custom`].
//!
//! Equality and hashing go through the wire name, so `Custom("issueModuleToken")`
//! and `IssueModuleToken` are the same event and cannot be used to slip past
//! an allowlist or reach a different listener set.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};

/// Events exempt from every authorization check.
pub const PUBLIC_EVENTS: &[&str] = &["issuePublicToken"];

/// `(moduleName, eventName)` pairs allowed to use the bootstrap secret
/// instead of a capability token.
pub const BOOTSTRAP_ALLOWLIST: &[(&str, &str)] = &[
    ("auth", "issueModuleToken"),
    ("fontsManager", "issueModuleToken"),
];

/// Name of a kernel event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EventName {
    // Capability tokens
    IssueModuleToken,
    IssueUserToken,
    IssuePublicToken,
    VerifyToken,

    // Module registry
    RegistrySelect,
    RegistryInsert,
    RegistryUpdate,
    ReactivateModule,

    // Lifecycle
    ModuleHeartbeat,

    /// Any event a plugin defines for itself.
    Custom(String),
}

impl EventName {
    /// Wire name.
    pub fn as_str(&self) -> &str {
        match self {
            Self::IssueModuleToken => "issueModuleToken",
            Self::IssueUserToken => "issueUserToken",
            Self::IssuePublicToken => "issuePublicToken",
            Self::VerifyToken => "verifyToken",
            Self::RegistrySelect => "registrySelect",
            Self::RegistryInsert => "registryInsert",
            Self::RegistryUpdate => "registryUpdate",
            Self::ReactivateModule => "reactivateModule",
            Self::ModuleHeartbeat => "moduleHeartbeat",
            Self::Custom(name) => name,
        }
    }

    /// Resolve a wire name, falling back to [`EventName::Custom`].
    pub fn parse(name: &str) -> Self {
        match name {
            "issueModuleToken" => Self::IssueModuleToken,
            "issueUserToken" => Self::IssueUserToken,
            "issuePublicToken" => Self::IssuePublicToken,
            "verifyToken" => Self::VerifyToken,
            "registrySelect" => Self::RegistrySelect,
            "registryInsert" => Self::RegistryInsert,
            "registryUpdate" => Self::RegistryUpdate,
            "reactivateModule" => Self::ReactivateModule,
            "moduleHeartbeat" => Self::ModuleHeartbeat,
            other => Self::Custom(other.to_string()),
        }
    }

    /// Plugin-defined event.
    pub fn custom(name: impl AsRef<str>) -> Self {
        Self::parse(name.as_ref())
    }

    /// In the public allowlist.
    pub fn is_public(&self) -> bool {
        PUBLIC_EVENTS.contains(&self.as_str())
    }
}

/// Whether `module_name` may call `event` with the bootstrap secret.
pub fn is_bootstrap_allowed(module_name: &str, event: &EventName) -> bool {
    BOOTSTRAP_ALLOWLIST
        .iter()
        .any(|(module, name)| *module == module_name && *name == event.as_str())
}

impl PartialEq for EventName {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

impl Eq for EventName {}

impl Hash for EventName {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.as_str().hash(state);
    }
}

impl From<String> for EventName {
    fn from(name: String) -> Self {
        Self::parse(&name)
    }
}

impl From<&str> for EventName {
    fn from(name: &str) -> Self {
        Self::parse(name)
    }
}

impl From<EventName> for String {
    fn from(event: EventName) -> Self {
        event.as_str().to_string()
    }
}

impl fmt::Display for EventName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
