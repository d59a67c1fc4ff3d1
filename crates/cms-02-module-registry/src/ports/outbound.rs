//! # Outbound Ports (Driven Ports)
//!
//! The storage backend is an external collaborator.
//!
//! Production: `JsonFileRegistryStore`
//! Testing: `InMemoryRegistryStore`

use crate::domain::errors::RegistryError;
use shared_types::ModuleRegistryEntry;

/// Keyed persistence of registry entries.
pub trait RegistryStore: Send + Sync {
    /// Entry for `module_name`.
    fn get(&self, module_name: &str) -> Result<Option<ModuleRegistryEntry>, RegistryError>;

    /// Every entry, sorted by module name.
    fn list(&self) -> Result<Vec<ModuleRegistryEntry>, RegistryError>;

    /// Add a new entry.
    ///
    /// # Errors
    /// * `RegistryError::AlreadyExists` - an entry with that name exists
    fn insert(&mut self, entry: ModuleRegistryEntry) -> Result<(), RegistryError>;

    /// Overwrite an existing entry.
    ///
    /// # Errors
    /// * `RegistryError::NotFound` - no entry with that name
    fn replace(&mut self, entry: ModuleRegistryEntry) -> Result<(), RegistryError>;
}

/// Backend chosen at runtime from configuration.
impl RegistryStore for Box<dyn RegistryStore> {
    fn get(&self, module_name: &str) -> Result<Option<ModuleRegistryEntry>, RegistryError> {
        (**self).get(module_name)
    }

    fn list(&self) -> Result<Vec<ModuleRegistryEntry>, RegistryError> {
        (**self).list()
    }

    fn insert(&mut self, entry: ModuleRegistryEntry) -> Result<(), RegistryError> {
        (**self).insert(entry)
    }

    fn replace(&mut self, entry: ModuleRegistryEntry) -> Result<(), RegistryError> {
        (**self).replace(entry)
    }
}
