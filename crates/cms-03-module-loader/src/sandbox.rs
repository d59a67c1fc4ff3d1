//! # Plugin Sandbox
//!
//! The minimal capability set a plugin gets: read-only file access confined
//! to its own folder. No network access is offered.

use std::fs;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

/// Sandbox violations and failures.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SandboxError {
    /// Path is absolute or walks out of the plugin folder
    #[error("path escapes the plugin directory: {0}")]
    Escape(String),

    /// Network access is not offered to plugins
    #[error("network access denied: {0}")]
    NetworkDenied(String),

    /// Underlying filesystem failure
    #[error("sandbox I/O error: {0}")]
    Io(String),
}

/// Read-only view of one plugin folder.
#[derive(Debug, Clone)]
pub struct Sandbox {
    root: PathBuf,
}

impl Sandbox {
    /// Confine to `root`, which must exist.
    pub fn new(root: impl AsRef<Path>) -> Result<Self, SandboxError> {
        let root = root
            .as_ref()
            .canonicalize()
            .map_err(|e| SandboxError::Io(e.to_string()))?;
        Ok(Self { root })
    }

    /// The plugin folder.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Read a file relative to the plugin folder.
    pub fn read_to_string(&self, relative: impl AsRef<Path>) -> Result<String, SandboxError> {
        let path = self.resolve(relative.as_ref())?;
        fs::read_to_string(path).map_err(|e| SandboxError::Io(e.to_string()))
    }

    /// Whether a file exists inside the plugin folder.
    pub fn exists(&self, relative: impl AsRef<Path>) -> bool {
        self.resolve(relative.as_ref()).is_ok()
    }

    /// Always refused.
    pub fn connect(&self, address: &str) -> Result<(), SandboxError> {
        Err(SandboxError::NetworkDenied(address.to_string()))
    }

    fn resolve(&self, relative: &Path) -> Result<PathBuf, SandboxError> {
        let shown = relative.display().to_string();
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
        {
            return Err(SandboxError::Escape(shown));
        }
        // Symlinks may still point outside.
        let resolved = self
            .root
            .join(relative)
            .canonicalize()
            .map_err(|e| SandboxError::Io(e.to_string()))?;
        if !resolved.starts_with(&self.root) {
            return Err(SandboxError::Escape(shown));
        }
        Ok(resolved)
    }
}
