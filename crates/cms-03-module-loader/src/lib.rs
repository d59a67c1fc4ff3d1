//! # Module Loader (CMS-03)
//!
//! Discovers third-party plugins, rehearses each one against a stub kernel,
//! and only then lets it initialize against the real kernel.
//!
//! ## Architecture
//!
//! - **Domain Layer** (`domain/`): manifests, loader config, errors, run reports
//! - **Ports Layer** (`ports/`): the plugin contract and the plugin source
//! - **Service Layer** (`service.rs`): discovery and the two-pass load run
//! - **Adapters** (`adapters/`): compiled-in plugin catalog, heartbeat listener,
//!   the identity-pinned kernel handle live plugins receive
//! - **Sandbox** (`sandbox.rs`): read-only file access confined to the plugin folder
//! - **Stub Kernel** (`stub_kernel.rs`): the rehearsal target
//!
//! ## Health Check Contract
//!
//! During rehearsal, `initialize()` must call the kernel at least once, and
//! every call must carry:
//!
//! - its own `moduleName`
//! - `moduleType: community`
//! - a reply
//!
//! A plugin that breaks the contract is deactivated with the reason recorded
//! and never touches the real kernel. Registrations are held to the same
//! identity: own `moduleName`, `moduleType: community`.

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod sandbox;
pub mod service;
pub mod stub_kernel;

// Re-export public API
pub use adapters::bus::{register_heartbeat_listener, LOADER_MODULE};
pub use adapters::catalog::StaticPluginLoader;
pub use adapters::plugin_kernel::PluginKernel;
pub use domain::config::{LoaderConfig, DEFAULT_INIT_TIMEOUT};
pub use domain::errors::{is_meltdown_error, HealthCheckError, LoaderError, MELTDOWN_ERROR_PREFIX};
pub use domain::manifest::{is_reserved_module_name, PluginManifest, MANIFEST_FILE, RESERVED_MODULE_NAMES};
pub use domain::report::{DiscoveryReport, LoadOutcome, LoadPass, LoadReport, SkipReason};
pub use ports::outbound::{InitContext, Plugin, PluginError, PluginLoader};
pub use sandbox::{Sandbox, SandboxError};
pub use service::ModuleLoader;
pub use stub_kernel::StubKernel;
