//! # Shared Crypto - Capability Token Primitives
//!
//! ## Components
//!
//! | Module | Algorithm | Use Case |
//! |--------|-----------|----------|
//! | `keyring` | HMAC-SHA256 key derivation | One signing key per trust tier |
//! | `token` | HMAC-SHA256 over base64url claims | Capability token sign / verify |
//! | `secret` | SHA-256 + constant-time compare | Bootstrap shared secret |
//!
//! ## Security Properties
//!
//! - **Tier separation**: the verification key is selected by the token's own
//!   trust-tier claim, so rewriting that claim without re-signing fails.
//! - **Keyed derivation**: tier keys are `HMAC(base_secret, tier_label)`,
//!   never `base_secret || salt`.
//! - **Constant time**: MAC and secret comparisons do not short-circuit.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod errors;
pub mod keyring;
pub mod secret;
pub mod token;

// Re-exports
pub use errors::TokenError;
pub use keyring::{BaseSecret, TierKeyring};
pub use secret::SharedSecret;
pub use token::TokenCodec;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
