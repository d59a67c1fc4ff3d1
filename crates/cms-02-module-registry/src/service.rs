//! # Registry Service
//!
//! Implements [`ModuleRegistryApi`] over any [`RegistryStore`]. Every
//! read-modify-write runs under one lock, so updates to the same module name
//! are serialized.

use crate::domain::errors::RegistryError;
use crate::ports::inbound::ModuleRegistryApi;
use crate::ports::outbound::RegistryStore;
use chrono::Utc;
use parking_lot::Mutex;
use shared_types::{ModuleName, ModuleRegistryEntry, RegistryChanges, RegistryFilter};
use tracing::{debug, info};

/// Module registry service.
pub struct RegistryService<S: RegistryStore> {
    store: Mutex<S>,
}

impl<S: RegistryStore> RegistryService<S> {
    /// Create a service over `store`.
    pub fn new(store: S) -> Self {
        Self {
            store: Mutex::new(store),
        }
    }
}

impl<S: RegistryStore> ModuleRegistryApi for RegistryService<S> {
    fn select(&self, filter: &RegistryFilter) -> Result<Vec<ModuleRegistryEntry>, RegistryError> {
        let store = self.store.lock();
        let entries = match filter {
            RegistryFilter::ByName(name) => store.get(name)?.into_iter().collect(),
            _ => store.list()?.into_iter().filter(|e| filter.matches(e)).collect(),
        };
        Ok(entries)
    }

    fn insert(&self, entry: ModuleRegistryEntry) -> Result<ModuleRegistryEntry, RegistryError> {
        if ModuleName::parse(&entry.module_name).is_none() {
            return Err(RegistryError::InvalidModuleName(entry.module_name));
        }
        self.store.lock().insert(entry.clone())?;
        info!(module = %entry.module_name, active = entry.is_active, "Module registered");
        Ok(entry)
    }

    fn update(&self, module_name: &str, changes: &RegistryChanges) -> Result<ModuleRegistryEntry, RegistryError> {
        let mut store = self.store.lock();
        let mut entry = store
            .get(module_name)?
            .ok_or_else(|| RegistryError::NotFound(module_name.to_string()))?;
        changes.apply(&mut entry, Utc::now());
        store.replace(entry.clone())?;
        debug!(
            module = module_name,
            active = entry.is_active,
            last_error = ?entry.last_error,
            "Registry entry updated"
        );
        Ok(entry)
    }

    fn reactivate(&self, module_name: &str) -> Result<ModuleRegistryEntry, RegistryError> {
        let entry = self.update(module_name, &RegistryChanges::reactivate())?;
        info!(module = module_name, "Module reactivated");
        Ok(entry)
    }
}
