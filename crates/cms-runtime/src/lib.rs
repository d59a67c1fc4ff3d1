//! # CMS Runtime
//!
//! Wires the trust kernel and the core modules into one process.
//!
//! ## Modules
//!
//! - `config` - environment-driven configuration and production checks
//! - `bootstrap` - core service tokens over the `skipJWT` path
//! - `plugins` - community plugins compiled into the binary
//! - `runtime` - construction order, startup and shutdown
//!
//! ## Core Modules
//!
//! | Module name | Crate | Listens on |
//! |-------------|-------|------------|
//! | `capabilityTokens` | cms-01 | `issueModuleToken`, `issueUserToken`, `issuePublicToken`, `verifyToken` |
//! | `databaseManager` | cms-02 | `registrySelect`, `registryInsert`, `registryUpdate`, `reactivateModule` |
//! | `moduleLoader` | cms-03 | `moduleHeartbeat` |

pub mod bootstrap;
pub mod config;
pub mod plugins;
pub mod runtime;

pub use bootstrap::{bootstrap_module_token, BOOTSTRAP_MODULES};
pub use config::{ConfigError, RegistryConfig, RuntimeConfig, SecurityConfig, TokenTtlConfig};
pub use plugins::{bundled_plugins, GalleryPlugin, GALLERY_MODULE};
pub use runtime::CmsRuntime;
