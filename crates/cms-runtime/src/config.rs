//! # Runtime Configuration
//!
//! Unified configuration for the kernel, the core modules and the loader.
//!
//! ## Security Requirements
//!
//! - `token_secret` MUST NOT be the all-zero placeholder in production
//! - `bootstrap_secret` MUST be set and MUST NOT be the development default
//!
//! ## Environment
//!
//! | Variable | Meaning |
//! |----------|---------|
//! | `CMS_TOKEN_SECRET` | 64 hex chars, base secret for the tier keys |
//! | `CMS_BOOTSTRAP_SECRET` | static inter-module secret |
//! | `CMS_PLUGINS_DIR` | folder holding one subfolder per plugin |
//! | `CMS_REGISTRY_PATH` | JSON registry file; empty for in-memory |
//! | `CMS_HEALTH_CHECK_TIMEOUT_MS` | bound on each `initialize()` |

use chrono::Duration as ChronoDuration;
use cms_01_capability_tokens::TokenPolicy;
use cms_03_module_loader::LoaderConfig;
use shared_crypto::SharedSecret;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

pub const ENV_TOKEN_SECRET: &str = "CMS_TOKEN_SECRET";
pub const ENV_BOOTSTRAP_SECRET: &str = "CMS_BOOTSTRAP_SECRET";
pub const ENV_PLUGINS_DIR: &str = "CMS_PLUGINS_DIR";
pub const ENV_REGISTRY_PATH: &str = "CMS_REGISTRY_PATH";
pub const ENV_HEALTH_CHECK_TIMEOUT_MS: &str = "CMS_HEALTH_CHECK_TIMEOUT_MS";

/// Bootstrap secret used when none is configured. Refused in production.
pub const DEV_BOOTSTRAP_SECRET: &str = "development-bootstrap-secret";

/// Complete runtime configuration.
#[derive(Debug, Clone, Default)]
pub struct RuntimeConfig {
    /// Secrets.
    pub security: SecurityConfig,
    /// Token lifetimes.
    pub tokens: TokenTtlConfig,
    /// Plugin loader.
    pub loader: LoaderConfig,
    /// Registry backend.
    pub registry: RegistryConfig,
}

impl RuntimeConfig {
    /// Defaults overridden from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Defaults overridden from `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(secret_hex) = lookup(ENV_TOKEN_SECRET) {
            let bytes = hex::decode(secret_hex.trim()).map_err(|e| ConfigError::InvalidVar {
                name: ENV_TOKEN_SECRET,
                reason: e.to_string(),
            })?;
            config.security.token_secret = bytes.try_into().map_err(|_| ConfigError::InvalidVar {
                name: ENV_TOKEN_SECRET,
                reason: "must be 32 bytes (64 hex chars)".into(),
            })?;
        }

        if let Some(secret) = lookup(ENV_BOOTSTRAP_SECRET) {
            config.security.bootstrap_secret = secret;
        }

        if let Some(dir) = lookup(ENV_PLUGINS_DIR) {
            config.loader.plugins_dir = PathBuf::from(dir);
        }

        if let Some(path) = lookup(ENV_REGISTRY_PATH) {
            config.registry.path = (!path.trim().is_empty()).then(|| PathBuf::from(path));
        }

        if let Some(ms) = lookup(ENV_HEALTH_CHECK_TIMEOUT_MS) {
            let ms: u64 = ms.trim().parse().map_err(|_| ConfigError::InvalidVar {
                name: ENV_HEALTH_CHECK_TIMEOUT_MS,
                reason: format!("not a number of milliseconds: {ms:?}"),
            })?;
            config.loader = config.loader.with_timeout(Duration::from_millis(ms));
        }

        config.loader.validate().map_err(|reason| ConfigError::InvalidVar {
            name: ENV_HEALTH_CHECK_TIMEOUT_MS,
            reason,
        })?;
        Ok(config)
    }

    /// Validate configuration for production readiness.
    ///
    /// # Returns
    ///
    /// Returns `Err` if:
    /// - the token secret is the all-zero placeholder
    /// - the bootstrap secret is empty or the development default
    pub fn validate_for_production(&self) -> Result<(), ConfigError> {
        if self.security.token_secret == [0u8; 32] {
            return Err(ConfigError::InsecureTokenSecret);
        }
        if self.security.bootstrap_secret.is_empty() || self.security.bootstrap_secret == DEV_BOOTSTRAP_SECRET {
            return Err(ConfigError::InsecureBootstrapSecret);
        }
        Ok(())
    }
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// Token secret is not set (zero value).
    #[error(
        "SECURITY VIOLATION: token secret is the default zero value. \
         Set CMS_TOKEN_SECRET to 64 hex chars."
    )]
    InsecureTokenSecret,

    /// Bootstrap secret is missing or the development default.
    #[error("SECURITY VIOLATION: bootstrap secret is unset or the development default. Set CMS_BOOTSTRAP_SECRET.")]
    InsecureBootstrapSecret,

    /// An environment variable could not be parsed.
    #[error("invalid {name}: {reason}")]
    InvalidVar { name: &'static str, reason: String },
}

/// Security configuration.
#[derive(Clone)]
pub struct SecurityConfig {
    /// Base secret for the tier keyring (32 bytes).
    /// MUST NOT be default in production.
    pub token_secret: [u8; 32],
    /// Static inter-module secret for the bootstrap path.
    pub bootstrap_secret: String,
}

impl SecurityConfig {
    /// Whether no token secret was configured.
    pub fn token_secret_is_placeholder(&self) -> bool {
        self.token_secret == [0u8; 32]
    }

    /// The bootstrap secret, wrapped.
    pub fn shared_secret(&self) -> SharedSecret {
        SharedSecret::new(self.bootstrap_secret.clone())
    }
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            token_secret: [0u8; 32], // MUST be overridden in production
            bootstrap_secret: DEV_BOOTSTRAP_SECRET.to_string(),
        }
    }
}

impl fmt::Debug for SecurityConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecurityConfig")
            .field("token_secret", &"***")
            .field("bootstrap_secret", &"***")
            .finish()
    }
}

/// Token lifetimes in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenTtlConfig {
    pub module_ttl_secs: i64,
    pub user_ttl_secs: i64,
    pub public_ttl_secs: i64,
}

impl Default for TokenTtlConfig {
    fn default() -> Self {
        Self {
            module_ttl_secs: 24 * 60 * 60,
            user_ttl_secs: 60 * 60,
            public_ttl_secs: 5 * 60,
        }
    }
}

impl TokenTtlConfig {
    /// As the token service's issuance policy.
    pub fn policy(&self) -> TokenPolicy {
        TokenPolicy {
            module_ttl: ChronoDuration::seconds(self.module_ttl_secs),
            user_ttl: ChronoDuration::seconds(self.user_ttl_secs),
            public_ttl: ChronoDuration::seconds(self.public_ttl_secs),
        }
    }
}

/// Registry backend configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryConfig {
    /// JSON file backing the registry; `None` keeps it in memory.
    pub path: Option<PathBuf>,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            path: Some(PathBuf::from("./data/module_registry.json")),
        }
    }
}
