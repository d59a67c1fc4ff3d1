//! # Kernel Adapter
//!
//! Registers the registry listeners under [`REGISTRY_MODULE`]. Every
//! registry event needs a verified high-trust, non-public token.

use crate::ports::inbound::ModuleRegistryApi;
use serde::Serialize;
use shared_bus::{EventName, KernelHandle, Reply};
use shared_types::{
    BusError, BusResult, ModuleType, Payload, ReactivateModuleRequest, RegistryInsertRequest,
    RegistrySelectRequest, RegistryUpdateRequest, TrustLevel,
};
use std::sync::Arc;
use tracing::warn;

/// Module name the registry listeners are registered under.
pub const REGISTRY_MODULE: &str = "databaseManager";

type Operation<R> = fn(&R, &Payload) -> BusResult;

/// Register the four registry listeners. Returns how many were accepted.
pub fn register_registry_listeners<R>(kernel: &dyn KernelHandle, registry: Arc<R>) -> usize
where
    R: ModuleRegistryApi + 'static,
{
    let operations: [(EventName, Operation<R>); 4] = [
        (EventName::RegistrySelect, select::<R>),
        (EventName::RegistryInsert, insert::<R>),
        (EventName::RegistryUpdate, update::<R>),
        (EventName::ReactivateModule, reactivate::<R>),
    ];

    let mut registered = 0;
    for (event, operation) in operations {
        let registry = registry.clone();
        let name = event.clone();
        let handler = Arc::new(move |payload: Payload, reply: Reply| {
            let result = require_high_trust(&payload).and_then(|()| operation(registry.as_ref(), &payload));
            if let Err(e) = &result {
                warn!(event = %name, caller = ?payload.module_name, error = %e, "Registry request failed");
            }
            reply.send(result);
        });
        if kernel.on(event, REGISTRY_MODULE, ModuleType::Core, handler).is_some() {
            registered += 1;
        }
    }
    registered
}

fn require_high_trust(payload: &Payload) -> Result<(), BusError> {
    match payload.claims() {
        Some(claims) if !claims.is_public && claims.trusted_at_least(TrustLevel::High) => Ok(()),
        _ => Err(BusError::Forbidden("registry access requires a high-trust module token".into())),
    }
}

fn to_value<T: Serialize>(value: T) -> BusResult {
    serde_json::to_value(value).map_err(|e| BusError::Handler(e.to_string()))
}

fn select<R: ModuleRegistryApi>(registry: &R, payload: &Payload) -> BusResult {
    let request: RegistrySelectRequest = payload.body_as()?;
    to_value(registry.select(&request.filter)?)
}

fn insert<R: ModuleRegistryApi>(registry: &R, payload: &Payload) -> BusResult {
    let request: RegistryInsertRequest = payload.body_as()?;
    to_value(registry.insert(request.entry)?)
}

fn update<R: ModuleRegistryApi>(registry: &R, payload: &Payload) -> BusResult {
    let request: RegistryUpdateRequest = payload.body_as()?;
    to_value(registry.update(&request.module_name, &request.changes)?)
}

fn reactivate<R: ModuleRegistryApi>(registry: &R, payload: &Payload) -> BusResult {
    let request: ReactivateModuleRequest = payload.body_as()?;
    to_value(registry.reactivate(&request.module_name)?)
}
