//! # Registry Errors

use shared_types::BusError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors from registry operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// No entry for the module
    #[error("Module not registered: {0}")]
    NotFound(String),

    /// An entry for the module already exists
    #[error("Module already registered: {0}")]
    AlreadyExists(String),

    /// The module name is not a valid identity
    #[error("Invalid module name: {0:?}")]
    InvalidModuleName(String),

    /// The registry file is held by another process
    #[error("Registry file already in use ({})", path.display())]
    Locked { path: PathBuf },

    /// The registry file could not be parsed
    #[error("Registry file is corrupt: {0}")]
    Corrupt(String),

    /// Filesystem failure
    #[error("Registry I/O error: {0}")]
    Io(String),

    /// A call through the kernel failed
    #[error("Registry call failed: {0}")]
    Bus(BusError),
}

impl From<std::io::Error> for RegistryError {
    fn from(error: std::io::Error) -> Self {
        RegistryError::Io(error.to_string())
    }
}

impl From<BusError> for RegistryError {
    fn from(error: BusError) -> Self {
        match error {
            BusError::NotFound(name) => RegistryError::NotFound(name),
            BusError::Conflict(name) => RegistryError::AlreadyExists(name),
            other => RegistryError::Bus(other),
        }
    }
}

impl From<RegistryError> for BusError {
    fn from(error: RegistryError) -> Self {
        match error {
            RegistryError::NotFound(name) => BusError::NotFound(name),
            RegistryError::AlreadyExists(name) => BusError::Conflict(name),
            RegistryError::InvalidModuleName(_) => BusError::MalformedBody(error.to_string()),
            RegistryError::Bus(inner) => inner,
            RegistryError::Locked { .. } | RegistryError::Corrupt(_) | RegistryError::Io(_) => {
                BusError::Handler(error.to_string())
            }
        }
    }
}
