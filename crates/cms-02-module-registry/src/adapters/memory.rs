use crate::domain::errors::RegistryError;
use crate::ports::outbound::RegistryStore;
use shared_types::ModuleRegistryEntry;
use std::collections::BTreeMap;

/// In-memory registry for tests and ephemeral runs.
#[derive(Debug, Default)]
pub struct InMemoryRegistryStore {
    entries: BTreeMap<String, ModuleRegistryEntry>,
}

impl InMemoryRegistryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RegistryStore for InMemoryRegistryStore {
    fn get(&self, module_name: &str) -> Result<Option<ModuleRegistryEntry>, RegistryError> {
        Ok(self.entries.get(module_name).cloned())
    }

    fn list(&self) -> Result<Vec<ModuleRegistryEntry>, RegistryError> {
        Ok(self.entries.values().cloned().collect())
    }

    fn insert(&mut self, entry: ModuleRegistryEntry) -> Result<(), RegistryError> {
        if self.entries.contains_key(&entry.module_name) {
            return Err(RegistryError::AlreadyExists(entry.module_name));
        }
        self.entries.insert(entry.module_name.clone(), entry);
        Ok(())
    }

    fn replace(&mut self, entry: ModuleRegistryEntry) -> Result<(), RegistryError> {
        match self.entries.get_mut(&entry.module_name) {
            Some(slot) => {
                *slot = entry;
                Ok(())
            }
            None => Err(RegistryError::NotFound(entry.module_name)),
        }
    }
}
