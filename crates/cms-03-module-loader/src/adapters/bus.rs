//! # Kernel Adapter
//!
//! The loader answers `moduleHeartbeat`, giving freshly admitted plugins a
//! live target for the call their `initialize()` must make.

use serde_json::json;
use shared_bus::{EventName, KernelHandle, Reply};
use shared_types::{ModuleType, Payload};
use std::sync::Arc;
use tracing::trace;

/// Module name the loader calls and listens as.
pub const LOADER_MODULE: &str = "moduleLoader";

/// Register the heartbeat listener. Returns whether it was accepted.
pub fn register_heartbeat_listener(kernel: &dyn KernelHandle) -> bool {
    kernel
        .on(
            EventName::ModuleHeartbeat,
            LOADER_MODULE,
            ModuleType::Core,
            Arc::new(|payload: Payload, reply: Reply| {
                let caller = payload.module_name.unwrap_or_default();
                trace!(module = %caller, "Heartbeat");
                reply.ok(json!({ "ack": true, "module": caller }));
            }),
        )
        .is_some()
}
