//! # JSON File Registry
//!
//! Persists the registry as a JSON array. Writes go to a temp file and are
//! renamed over the original, so a crash never leaves a half-written registry.
//!
//! The process holds an exclusive `fs2` lock on `<path>.lock` for as long as
//! the store is open; a second process opening the same registry fails with
//! [`RegistryError::Locked`]. Closing the store releases the lock but leaves
//! the lock file in place, so every process locks the same inode.

use crate::domain::errors::RegistryError;
use crate::ports::outbound::RegistryStore;
use fs2::FileExt;
use shared_types::ModuleRegistryEntry;
use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// File-backed registry store.
pub struct JsonFileRegistryStore {
    entries: BTreeMap<String, ModuleRegistryEntry>,
    path: PathBuf,
    lock: File,
    lock_path: PathBuf,
}

impl JsonFileRegistryStore {
    /// Open (or create) the registry at `path` and lock it.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, RegistryError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let lock_path = path.with_extension("lock");
        let lock = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&lock_path)?;
        if lock.try_lock_exclusive().is_err() {
            return Err(RegistryError::Locked { path: lock_path });
        }

        let entries = Self::load(&path)?;
        info!(path = %path.display(), modules = entries.len(), "Registry opened");

        Ok(Self {
            entries,
            path,
            lock,
            lock_path,
        })
    }

    /// Path of the registry file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(path: &Path) -> Result<BTreeMap<String, ModuleRegistryEntry>, RegistryError> {
        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "No registry file yet");
                return Ok(BTreeMap::new());
            }
            Err(e) => return Err(e.into()),
        };
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(BTreeMap::new());
        }

        let list: Vec<ModuleRegistryEntry> =
            serde_json::from_slice(&bytes).map_err(|e| RegistryError::Corrupt(e.to_string()))?;
        let mut entries = BTreeMap::new();
        for entry in list {
            if entries.contains_key(&entry.module_name) {
                return Err(RegistryError::Corrupt(format!("duplicate module {}", entry.module_name)));
            }
            entries.insert(entry.module_name.clone(), entry);
        }
        Ok(entries)
    }

    fn save(&self) -> Result<(), RegistryError> {
        let list: Vec<&ModuleRegistryEntry> = self.entries.values().collect();
        let bytes = serde_json::to_vec_pretty(&list).map_err(|e| RegistryError::Io(e.to_string()))?;

        let temp_path = self.path.with_extension("tmp");
        let mut file = File::create(&temp_path)?;
        file.write_all(&bytes)?;
        file.sync_all()?;
        std::fs::rename(&temp_path, &self.path)?;
        Ok(())
    }
}

impl RegistryStore for JsonFileRegistryStore {
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
        let name = entry.module_name.clone();
        self.entries.insert(name.clone(), entry);
        if let Err(e) = self.save() {
            self.entries.remove(&name);
            return Err(e);
        }
        Ok(())
    }

    fn replace(&mut self, entry: ModuleRegistryEntry) -> Result<(), RegistryError> {
        let Some(slot) = self.entries.get_mut(&entry.module_name) else {
            return Err(RegistryError::NotFound(entry.module_name));
        };
        let previous = std::mem::replace(slot, entry);
        if let Err(e) = self.save() {
            self.entries.insert(previous.module_name.clone(), previous);
            return Err(e);
        }
        Ok(())
    }
}

impl Drop for JsonFileRegistryStore {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.lock) {
            warn!(path = %self.lock_path.display(), error = %e, "Failed to release registry lock");
        }
    }
}
