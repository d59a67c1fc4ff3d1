//! # Static Plugin Catalog
//!
//! Plugins compiled into the binary and registered by name. The folder on
//! disk still carries the manifest and assets; the code comes from here.

use crate::ports::outbound::{Plugin, PluginLoader};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

type Factory = Arc<dyn Fn() -> Arc<dyn Plugin> + Send + Sync>;

/// Name-keyed factories producing fresh plugin instances.
#[derive(Default)]
pub struct StaticPluginLoader {
    factories: RwLock<HashMap<String, Factory>>,
}

impl StaticPluginLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the factory for `module_name`.
    pub fn register<F>(&self, module_name: impl Into<String>, factory: F)
    where
        F: Fn() -> Arc<dyn Plugin> + Send + Sync + 'static,
    {
        self.factories.write().insert(module_name.into(), Arc::new(factory));
    }

    /// Drop the factory for `module_name`.
    pub fn unregister(&self, module_name: &str) -> bool {
        self.factories.write().remove(module_name).is_some()
    }

    /// Registered plugin names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.factories.read().keys().cloned().collect();
        names.sort();
        names
    }
}

impl PluginLoader for StaticPluginLoader {
    fn load(&self, module_name: &str, plugin_dir: &Path) -> Option<Arc<dyn Plugin>> {
        let factory = self.factories.read().get(module_name).cloned()?;
        debug!(module = module_name, dir = %plugin_dir.display(), "Instantiating plugin");
        Some(factory())
    }
}
