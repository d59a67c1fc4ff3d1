//! # Outbound Ports (Driven Ports / SPI)
//!
//! The plugin contract and the loader that produces plugin instances.

use crate::sandbox::Sandbox;
use async_trait::async_trait;
use shared_bus::KernelHandle;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// Error a plugin reports from `initialize()`.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct PluginError(pub String);

impl PluginError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// What a plugin is handed at initialization.
#[derive(Clone)]
pub struct InitContext {
    /// The stub kernel during the health check, the real one afterwards.
    pub kernel: Arc<dyn KernelHandle>,
    /// The module's own name.
    pub module_name: String,
    /// Always `false` for plugins.
    pub is_core: bool,
    /// Capability token; `None` during the health check.
    pub jwt: Option<String>,
    /// Read-only view of the plugin's folder.
    pub sandbox: Arc<Sandbox>,
}

impl fmt::Debug for InitContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InitContext")
            .field("module_name", &self.module_name)
            .field("is_core", &self.is_core)
            .field("jwt", &self.jwt.as_ref().map(|_| "***"))
            .field("sandbox", &self.sandbox.root())
            .finish_non_exhaustive()
    }
}

/// A loadable plugin.
///
/// To pass the health check, `initialize` must call the kernel at least once
/// with a payload carrying its `moduleName`, `moduleType: community` and a
/// reply.
#[async_trait]
pub trait Plugin: Send + Sync {
    async fn initialize(&self, ctx: InitContext) -> Result<(), PluginError>;
}

/// Produces fresh plugin instances.
///
/// Called once per phase, so the rehearsal instance and the live instance
/// share no state.
pub trait PluginLoader: Send + Sync {
    /// Load `module_name` from `plugin_dir`. `None` if no code is available.
    fn load(&self, module_name: &str, plugin_dir: &Path) -> Option<Arc<dyn Plugin>>;
}
