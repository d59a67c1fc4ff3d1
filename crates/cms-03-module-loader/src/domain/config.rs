//! Loader configuration with validation.

use std::path::PathBuf;
use std::time::Duration;

/// Default bound on one `initialize()` call.
pub const DEFAULT_INIT_TIMEOUT: Duration = Duration::from_secs(5);

/// Module loader configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoaderConfig {
    /// Folder holding one subfolder per plugin
    pub plugins_dir: PathBuf,
    /// Bound on the sandboxed rehearsal
    pub health_check_timeout: Duration,
    /// Bound on the live `initialize()`
    pub init_timeout: Duration,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            plugins_dir: PathBuf::from("plugins"),
            health_check_timeout: DEFAULT_INIT_TIMEOUT,
            init_timeout: DEFAULT_INIT_TIMEOUT,
        }
    }
}

impl LoaderConfig {
    /// Config scanning `plugins_dir` with default timeouts.
    pub fn new(plugins_dir: impl Into<PathBuf>) -> Self {
        Self {
            plugins_dir: plugins_dir.into(),
            ..Self::default()
        }
    }

    /// Override both timeouts.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.health_check_timeout = timeout;
        self.init_timeout = timeout;
        self
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.health_check_timeout.is_zero() {
            return Err("health_check_timeout must be non-zero".into());
        }
        if self.init_timeout.is_zero() {
            return Err("init_timeout must be non-zero".into());
        }
        Ok(())
    }
}
