//! # Tier Keyring
//!
//! Derives one signing key per trust tier from a single base secret.
//!
//! ## Derivation
//!
//! `tier_key = HMAC-SHA256(key = base_secret, msg = "cms-trust-bus/tier/" || tier)`
//!
//! The three tier keys are independent: knowing the low-tier key tells an
//! attacker nothing about the high-tier key.

use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::Sha256;
use shared_types::TrustLevel;
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

type HmacSha256 = Hmac<Sha256>;

/// Domain-separation label prefix for tier keys.
const TIER_LABEL_PREFIX: &[u8] = b"cms-trust-bus/tier/";

/// Base secret (256-bit) from which every tier key is derived.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct BaseSecret([u8; 32]);

impl BaseSecret {
    /// Create from bytes.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Generate a random secret (development runs without configuration).
    pub fn generate() -> Self {
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Whether this is the all-zero placeholder.
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }

    fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Debug for BaseSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BaseSecret(***)")
    }
}

/// One derived key per trust tier.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct TierKeyring {
    high: [u8; 32],
    medium: [u8; 32],
    low: [u8; 32],
}

impl TierKeyring {
    /// Derive all tier keys from the base secret.
    pub fn derive(base: &BaseSecret) -> Self {
        Self {
            high: derive_tier_key(base, TrustLevel::High),
            medium: derive_tier_key(base, TrustLevel::Medium),
            low: derive_tier_key(base, TrustLevel::Low),
        }
    }

    /// Key for a tier.
    pub fn key_for(&self, tier: TrustLevel) -> &[u8; 32] {
        match tier {
            TrustLevel::High => &self.high,
            TrustLevel::Medium => &self.medium,
            TrustLevel::Low => &self.low,
        }
    }
}

impl fmt::Debug for TierKeyring {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("TierKeyring(***)")
    }
}

fn derive_tier_key(base: &BaseSecret, tier: TrustLevel) -> [u8; 32] {
    let mut mac =
        HmacSha256::new_from_slice(base.as_bytes()).expect("HMAC can take key of any size");
    mac.update(TIER_LABEL_PREFIX);
    mac.update(tier.as_str().as_bytes());
    mac.finalize().into_bytes().into()
}
