//! # Capability Token Codec
//!
//! Wire format: `base64url(claims_json) "." base64url(HMAC-SHA256(tier_key, first_segment))`,
//! both segments unpadded.
//!
//! The verification key is chosen by the token's own `trustLevel` claim
//! before the claim is trusted. A token whose tier is rewritten without
//! re-signing is therefore checked against the wrong key and rejected.

use crate::errors::TokenError;
use crate::keyring::TierKeyring;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use shared_types::TokenClaims;

type HmacSha256 = Hmac<Sha256>;

/// Segment separator.
const SEPARATOR: char = '.';

/// Signs and verifies capability tokens.
#[derive(Debug, Clone)]
pub struct TokenCodec {
    keyring: TierKeyring,
}

impl TokenCodec {
    /// Create a codec over a derived keyring.
    pub fn new(keyring: TierKeyring) -> Self {
        Self { keyring }
    }

    /// Sign claims under the key of their trust tier.
    pub fn sign(&self, claims: &TokenClaims) -> Result<String, TokenError> {
        let json = serde_json::to_vec(claims).map_err(|e| TokenError::Encoding(e.to_string()))?;
        let body = URL_SAFE_NO_PAD.encode(json);
        let tag = self.mac(claims, body.as_bytes()).finalize().into_bytes();
        Ok(format!("{body}{SEPARATOR}{}", URL_SAFE_NO_PAD.encode(tag)))
    }

    /// Decode the claims without checking the signature.
    ///
    /// Used to pick the verification key; never trust the result directly.
    pub fn decode_unverified(&self, token: &str) -> Result<TokenClaims, TokenError> {
        let (body, _) = split(token)?;
        decode_claims(body)
    }

    /// Verify signature and expiry at `now` (unix seconds).
    pub fn verify(&self, token: &str, now: i64) -> Result<TokenClaims, TokenError> {
        let (body, signature) = split(token)?;
        let claims = decode_claims(body)?;
        let tag = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|e| TokenError::Malformed(format!("signature segment: {e}")))?;

        self.mac(&claims, body.as_bytes())
            .verify_slice(&tag)
            .map_err(|_| TokenError::InvalidSignature)?;

        if claims.is_expired(now) {
            return Err(TokenError::Expired { exp: claims.exp });
        }
        Ok(claims)
    }

    fn mac(&self, claims: &TokenClaims, body: &[u8]) -> HmacSha256 {
        let mut mac = HmacSha256::new_from_slice(self.keyring.key_for(claims.trust_level))
            .expect("HMAC can take key of any size");
        mac.update(body);
        mac
    }
}

fn split(token: &str) -> Result<(&str, &str), TokenError> {
    let (body, signature) = token
        .split_once(SEPARATOR)
        .ok_or_else(|| TokenError::Malformed("missing separator".to_string()))?;
    if body.is_empty() || signature.is_empty() || signature.contains(SEPARATOR) {
        return Err(TokenError::Malformed("expected two non-empty segments".to_string()));
    }
    Ok((body, signature))
}

fn decode_claims(body: &str) -> Result<TokenClaims, TokenError> {
    let json = URL_SAFE_NO_PAD
        .decode(body)
        .map_err(|e| TokenError::Malformed(format!("claims segment: {e}")))?;
    serde_json::from_slice(&json).map_err(|e| TokenError::Malformed(format!("claims json: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keyring::BaseSecret;
    use proptest::prelude::*;
    use shared_types::TrustLevel;

    fn codec(seed: u8) -> TokenCodec {
        TokenCodec::new(TierKeyring::derive(&BaseSecret::from_bytes([seed; 32])))
    }

    fn module_claims(tier: TrustLevel) -> TokenClaims {
        let mut claims = TokenClaims::new(tier, 1_000, 2_000);
        claims.module_name = Some("databaseManager".to_string());
        claims
    }

    #[test]
    fn test_sign_then_verify() {
        let codec = codec(1);
        let claims = module_claims(TrustLevel::High);
        let token = codec.sign(&claims).unwrap();

        assert_eq!(codec.verify(&token, 1_500).unwrap(), claims);
    }

    #[test]
    fn test_tier_tampering_is_rejected() {
        let codec = codec(1);
        let token = codec.sign(&module_claims(TrustLevel::Low)).unwrap();
        let (_, signature) = token.split_once('.').unwrap();

        let mut forged = codec.decode_unverified(&token).unwrap();
        forged.trust_level = TrustLevel::High;
        let forged_body = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&forged).unwrap());
        let forged_token = format!("{forged_body}.{signature}");

        assert_eq!(codec.verify(&forged_token, 1_500), Err(TokenError::InvalidSignature));
    }

    #[test]
    fn test_other_base_secret_is_rejected() {
        let token = codec(1).sign(&module_claims(TrustLevel::Medium)).unwrap();
        assert_eq!(codec(2).verify(&token, 1_500), Err(TokenError::InvalidSignature));
    }

    #[test]
    fn test_expired() {
        let codec = codec(1);
        let token = codec.sign(&module_claims(TrustLevel::High)).unwrap();
        assert_eq!(codec.verify(&token, 2_000), Err(TokenError::Expired { exp: 2_000 }));
    }

    #[test]
    fn test_malformed_shapes() {
        let codec = codec(1);
        for garbage in ["", "no-dot", ".sig", "body.", "a.b.c", "!!!.abc", "e30.abc"] {
            let err = codec.verify(garbage, 0).unwrap_err();
            assert!(err.is_undecodable(), "{garbage:?} gave {err:?}");
        }
    }

    proptest! {
        #[test]
        fn prop_flipping_a_signature_byte_fails(index in 0usize..32, flip in 1u8..=255) {
            let codec = codec(9);
            let token = codec.sign(&module_claims(TrustLevel::Medium)).unwrap();
            let (body, signature) = token.split_once('.').unwrap();
            let mut tag = URL_SAFE_NO_PAD.decode(signature).unwrap();
            tag[index] ^= flip;
            let tampered = format!("{body}.{}", URL_SAFE_NO_PAD.encode(tag));

            prop_assert_eq!(codec.verify(&tampered, 1_500), Err(TokenError::InvalidSignature));
        }
    }
}
