//! # Core Bootstrap
//!
//! Core modules that start before any token exists obtain their first
//! service token over the allow-listed `skipJWT` path. Any other module or
//! event using that path trips its breaker.

use serde_json::Value;
use shared_bus::{EventName, KernelHandle, Reply};
use shared_types::{BusError, IssueModuleTokenRequest, ModuleType, Payload, TrustLevel};
use tracing::info;

/// Core modules that bootstrap their service token.
pub const BOOTSTRAP_MODULES: &[&str] = &["auth", "fontsManager"];

/// Obtain a high-trust service token for `module_name` via `skipJWT`.
pub async fn bootstrap_module_token(
    kernel: &dyn KernelHandle,
    module_name: &str,
    bootstrap_secret: &str,
) -> Result<String, BusError> {
    let request = IssueModuleTokenRequest {
        sign_as_module: module_name.to_string(),
        trust_level: TrustLevel::High,
        auth_secret: None,
    };
    let payload = Payload::from_module(module_name, ModuleType::Core)
        .with_bootstrap(bootstrap_secret)
        .with_request(&request)?;
    let (reply, receiver) = Reply::channel();

    kernel.emit(EventName::IssueModuleToken, payload, reply);
    match receiver.recv().await? {
        Value::String(token) => {
            info!(module = module_name, "Service token bootstrapped");
            Ok(token)
        }
        other => Err(BusError::Handler(format!(
            "issueModuleToken replied with a non-token value: {other}"
        ))),
    }
}
