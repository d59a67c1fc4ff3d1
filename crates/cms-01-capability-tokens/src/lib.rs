//! # Capability Tokens (CMS-01)
//!
//! Issues and verifies the signed tokens every non-public bus call carries.
//!
//! ## Architecture
//!
//! This crate follows hexagonal architecture:
//! - **Domain Layer** (`domain/`): issuance policy (roles, purposes, lifetimes)
//! - **Ports Layer** (`ports/`): the inbound API and the clock it depends on
//! - **Service Layer** (`service.rs`): signs claims through `shared-crypto`
//! - **Adapters** (`adapters/`): kernel listeners for the token events
//!
//! ## Token Kinds
//!
//! | Kind | Event | Trust | Lifetime | Gate |
//! |------|-------|-------|----------|------|
//! | Service | `issueModuleToken` | chosen by issuer | 24h | bootstrap secret or high-trust caller |
//! | Session | `issueUserToken` | medium | 1h | high-trust caller |
//! | Public | `issuePublicToken` | low | 5min | none (public event) |
//!
//! A public token is still fully signature-verified wherever it is presented.
//! Only the public event allowlist skips verification, and the two are
//! independent.

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

// Re-export public API
pub use adapters::bus::{register_token_listeners, TOKEN_SERVICE_MODULE};
pub use domain::errors::IssueError;
pub use domain::policy::{permissions_for_role, TokenPolicy, PUBLIC_PURPOSES};
pub use ports::inbound::CapabilityTokenApi;
pub use ports::outbound::{SystemClock, TimeSource};
pub use service::TokenService;
