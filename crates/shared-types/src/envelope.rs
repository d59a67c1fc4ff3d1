//! # `Payload` Envelope
//!
//! The wrapper carried by every kernel call.
//!
//! ## Security Properties
//!
//! - **Identity first**: `module_name` is checked before any authorization.
//!   It is kept as the raw wire value so a malformed identity can be dropped
//!   rather than rejected at deserialization time.
//! - **Credentials are typed**: a capability token (`jwt`) or the bootstrap
//!   pair (`skip_jwt` + `auth_secret`).
//! - **Claims are kernel-owned**: `claims` is never read from the wire and is
//!   reset by the kernel on every call before it attaches verified claims.

use crate::entities::{ModuleName, ModuleType};
use crate::errors::BusError;
use crate::security::TokenClaims;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Replacement text for secrets in logged payload clones.
pub const SECRET_MASK: &str = "***";

/// Body keys whose values are masked in logs.
const SENSITIVE_KEYS: &[&str] = &["jwt", "authSecret", "password", "secret", "token"];

/// The envelope of one kernel call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payload {
    /// Caller identity, as supplied.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module_name: Option<String>,

    /// Caller provenance.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module_type: Option<ModuleType>,

    /// Capability token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jwt: Option<String>,

    /// Request the bootstrap path instead of token verification.
    #[serde(default, rename = "skipJWT")]
    pub skip_jwt: bool,

    /// Static inter-module bootstrap secret.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_secret: Option<String>,

    /// Domain fields of the call.
    #[serde(default)]
    pub body: Value,

    #[serde(skip)]
    claims: Option<TokenClaims>,
}

impl Payload {
    /// A payload identifying its caller.
    pub fn from_module(module_name: impl Into<String>, module_type: ModuleType) -> Self {
        Self {
            module_name: Some(module_name.into()),
            module_type: Some(module_type),
            ..Self::default()
        }
    }

    /// Attach a capability token.
    #[must_use]
    pub fn with_token(mut self, jwt: impl Into<String>) -> Self {
        self.jwt = Some(jwt.into());
        self
    }

    /// Use the bootstrap path with the given shared secret.
    #[must_use]
    pub fn with_bootstrap(mut self, secret: impl Into<String>) -> Self {
        self.skip_jwt = true;
        self.auth_secret = Some(secret.into());
        self
    }

    /// Set the domain body.
    #[must_use]
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = body;
        self
    }

    /// Set the domain body from a serializable request.
    pub fn with_request<T: Serialize>(self, request: &T) -> Result<Self, BusError> {
        let body = serde_json::to_value(request).map_err(|e| BusError::MalformedBody(e.to_string()))?;
        Ok(self.with_body(body))
    }

    /// The validated caller identity, if any.
    pub fn module_identity(&self) -> Option<ModuleName> {
        self.module_name.as_deref().and_then(ModuleName::parse)
    }

    /// Decode the body into a typed request.
    pub fn body_as<T: DeserializeOwned>(&self) -> Result<T, BusError> {
        serde_json::from_value(self.body.clone()).map_err(|e| BusError::MalformedBody(e.to_string()))
    }

    /// Claims verified by the kernel for this call.
    pub fn claims(&self) -> Option<&TokenClaims> {
        self.claims.as_ref()
    }

    /// Replace the attached claims. Only the kernel calls this.
    pub fn attach_claims(&mut self, claims: Option<TokenClaims>) {
        self.claims = claims;
    }

    /// A clone safe for logging: credentials and sensitive body keys masked.
    pub fn masked(&self) -> Payload {
        let mut clone = self.clone();
        if clone.jwt.is_some() {
            clone.jwt = Some(SECRET_MASK.to_string());
        }
        if clone.auth_secret.is_some() {
            clone.auth_secret = Some(SECRET_MASK.to_string());
        }
        mask_value(&mut clone.body);
        clone
    }

    /// Compact JSON of [`Payload::masked`] for log fields.
    pub fn masked_json(&self) -> String {
        serde_json::to_string(&self.masked()).unwrap_or_else(|_| "<unserializable>".to_string())
    }
}

fn mask_value(value: &mut Value) {
    match value {
        Value::Object(map) => {
            for (key, inner) in map.iter_mut() {
                if SENSITIVE_KEYS.contains(&key.as_str()) {
                    *inner = Value::String(SECRET_MASK.to_string());
                } else {
                    mask_value(inner);
                }
            }
        }
        Value::Array(items) => items.iter_mut().for_each(mask_value),
        _ => {}
    }
}
