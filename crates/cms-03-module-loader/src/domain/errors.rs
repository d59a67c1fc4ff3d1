//! # Loader Errors
//!
//! The `Display` text of a [`LoaderError`] is what lands in the registry's
//! `last_error` column, so it is written for operators.

use cms_01_capability_tokens::IssueError;
use cms_02_module_registry::RegistryError;
use shared_types::{MeltdownReason, ModuleType};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Prefix of a `last_error` recorded for a breaker trip.
pub const MELTDOWN_ERROR_PREFIX: &str = "meltdown:";

/// Whether a registry `last_error` records a breaker trip. Such modules come
/// back only through explicit reactivation.
pub fn is_meltdown_error(last_error: &str) -> bool {
    last_error.starts_with(MELTDOWN_ERROR_PREFIX)
}

/// Why a plugin failed its rehearsal against the stub kernel.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum HealthCheckError {
    /// `initialize()` returned without calling the kernel
    #[error("health check failed: initialize() never called the kernel")]
    NoCalls,

    /// A kernel call was made without a reply
    #[error("health check failed: kernel called without a reply callback")]
    MissingReply,

    /// A kernel call was made without a valid `moduleName`
    #[error("health check failed: kernel called without a valid moduleName")]
    MissingModuleName,

    /// A kernel call claimed another module's identity
    #[error("health check failed: called as {found:?}, expected {expected:?}")]
    ForeignIdentity { expected: String, found: String },

    /// A kernel call did not declare `moduleType: community`
    #[error("health check failed: moduleType was {found:?}, expected community")]
    WrongModuleType { found: Option<ModuleType> },

    /// `initialize()` returned an error
    #[error("health check failed: initialize() returned an error: {0}")]
    InitFailed(String),

    /// `initialize()` panicked
    #[error("health check failed: initialize() panicked: {0}")]
    Panicked(String),

    /// `initialize()` did not finish in time
    #[error("health check failed: initialize() did not finish within {0:?}")]
    TimedOut(Duration),
}

/// Errors from discovering or loading plugins.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LoaderError {
    /// Invalid loader configuration
    #[error("invalid loader configuration: {0}")]
    Config(String),

    /// `moduleInfo.json` missing fields or not JSON
    #[error("invalid plugin manifest {}: {reason}", path.display())]
    Manifest { path: PathBuf, reason: String },

    /// No plugin code is available for the module
    #[error("no plugin code available for {0}")]
    UnknownPlugin(String),

    /// The plugin directory could not be opened for sandboxing
    #[error("plugin directory unavailable: {0}")]
    Sandbox(String),

    /// Sandboxed rehearsal failed
    #[error(transparent)]
    HealthCheck(#[from] HealthCheckError),

    /// Live `initialize()` failed
    #[error("initialization failed: {0}")]
    InitFailed(String),

    /// The module's breaker tripped
    #[error("meltdown: {0}")]
    Meltdown(MeltdownReason),

    /// Registry access failed
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// Token issuance failed
    #[error("token issuance failed: {0}")]
    Token(#[from] IssueError),

    /// Filesystem failure during discovery
    #[error("plugin directory I/O error: {0}")]
    Io(String),
}

impl From<std::io::Error> for LoaderError {
    fn from(error: std::io::Error) -> Self {
        LoaderError::Io(error.to_string())
    }
}
