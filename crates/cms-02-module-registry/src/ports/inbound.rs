//! # Inbound Ports (Driving Ports / API)

use crate::domain::errors::RegistryError;
use shared_types::{ModuleRegistryEntry, RegistryChanges, RegistryFilter};

/// Module registry API.
pub trait ModuleRegistryApi: Send + Sync {
    /// Entries matching `filter`, sorted by module name.
    fn select(&self, filter: &RegistryFilter) -> Result<Vec<ModuleRegistryEntry>, RegistryError>;

    /// Register a newly discovered module.
    fn insert(&self, entry: ModuleRegistryEntry) -> Result<ModuleRegistryEntry, RegistryError>;

    /// Apply `changes` to an existing entry; stamps `updated_at`.
    fn update(&self, module_name: &str, changes: &RegistryChanges) -> Result<ModuleRegistryEntry, RegistryError>;

    /// Operator reactivation: active again, error cleared.
    fn reactivate(&self, module_name: &str) -> Result<ModuleRegistryEntry, RegistryError>;
}
