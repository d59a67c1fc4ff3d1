//! # Module Registry (CMS-02)
//!
//! Keyed store of every known plugin: `module_name -> {is_active, last_error,
//! module_info, created_at, updated_at}`.
//!
//! ## Architecture
//!
//! - **Domain Layer** (`domain/`): registry errors
//! - **Ports Layer** (`ports/`): the registry API and the storage backend it drives
//! - **Service Layer** (`service.rs`): serializes every read-modify-write
//! - **Adapters** (`adapters/`): in-memory and JSON-file backends, kernel
//!   listeners, and a client that reaches the registry through the kernel
//!
//! Other modules only ever reach the registry through the kernel
//! (`registrySelect` / `registryInsert` / `registryUpdate` / `reactivateModule`),
//! and every one of those calls needs a high-trust token.

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

// Re-export public API
pub use adapters::bus::{register_registry_listeners, REGISTRY_MODULE};
pub use adapters::client::RegistryClient;
pub use adapters::file::JsonFileRegistryStore;
pub use adapters::memory::InMemoryRegistryStore;
pub use domain::errors::RegistryError;
pub use ports::inbound::ModuleRegistryApi;
pub use ports::outbound::RegistryStore;
pub use service::RegistryService;
