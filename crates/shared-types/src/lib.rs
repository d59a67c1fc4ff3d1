//! # Shared Types Crate
//!
//! This crate contains the module identities, the [`Payload`] envelope that
//! rides on every kernel call, capability-token claims, registry entities and
//! the bus error taxonomy.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: All cross-crate types are defined here.
//! - **Identity on the envelope**: `module_name` / `module_type` / credentials
//!   are typed fields of [`Payload`]; domain fields travel in `body`.
//! - **Secrets never logged**: every log line uses [`Payload::masked`].

#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod entities;
pub mod envelope;
pub mod errors;
pub mod ipc;
pub mod security;

pub use entities::*;
pub use envelope::Payload;
pub use errors::*;
pub use ipc::*;
pub use security::*;
