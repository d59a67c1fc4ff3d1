//! # Plugin Manifest
//!
//! Every plugin folder carries a `moduleInfo.json`:
//!
//! ```json
//! { "moduleName": "gallery", "developer": "ACME", "version": "1.2.0",
//!   "description": "Image galleries", "grapesComponent": "gallery-block" }
//! ```

use crate::domain::errors::LoaderError;
use serde::Deserialize;
use shared_types::{ModuleInfo, ModuleName};
use std::path::Path;

/// Manifest file name inside a plugin folder.
pub const MANIFEST_FILE: &str = "moduleInfo.json";

/// Names no plugin may take: the core service modules and the modules
/// allowed onto the bootstrap path.
pub const RESERVED_MODULE_NAMES: &[&str] = &[
    "capabilityTokens",
    "databaseManager",
    "moduleLoader",
    "auth",
    "fontsManager",
];

/// Whether `module_name` is reserved for a core module.
pub fn is_reserved_module_name(module_name: &str) -> bool {
    RESERVED_MODULE_NAMES.contains(&module_name)
}

/// Parsed `moduleInfo.json`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginManifest {
    pub module_name: String,
    pub developer: String,
    pub version: String,
    pub description: String,
    #[serde(default)]
    pub grapes_component: Option<String>,
}

impl PluginManifest {
    /// Read and validate `<plugin_dir>/moduleInfo.json`.
    pub fn read(plugin_dir: &Path) -> Result<Self, LoaderError> {
        let path = plugin_dir.join(MANIFEST_FILE);
        let bytes = std::fs::read(&path)?;
        let manifest: PluginManifest = serde_json::from_slice(&bytes).map_err(|e| LoaderError::Manifest {
            path: path.clone(),
            reason: e.to_string(),
        })?;
        if ModuleName::parse(&manifest.module_name).is_none() {
            return Err(LoaderError::Manifest {
                path,
                reason: format!("invalid moduleName {:?}", manifest.module_name),
            });
        }
        Ok(manifest)
    }

    /// The registry's view of the manifest.
    pub fn module_info(&self) -> ModuleInfo {
        ModuleInfo {
            developer: self.developer.clone(),
            version: self.version.clone(),
            description: self.description.clone(),
            grapes_component: self.grapes_component.clone(),
        }
    }
}
