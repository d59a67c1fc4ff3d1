//! # Health-Check Stub Kernel
//!
//! A disposable [`KernelHandle`] that a plugin's first `initialize()` runs
//! against. It observes every call and succeeds well-formed ones at once,
//! but owns no listeners and reaches no shared state.
//!
//! A call is well-formed when it carries a reply, the plugin's own
//! `moduleName` and `moduleType: community`. A registration must name the
//! plugin itself as a community module.

use crate::domain::errors::HealthCheckError;
use parking_lot::Mutex;
use serde_json::json;
use shared_bus::{EventName, Handler, KernelHandle, ListenerId, Reply};
use shared_types::{BusError, ModuleType, Payload};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use tracing::debug;

/// Observing stand-in for the real kernel.
#[derive(Debug)]
pub struct StubKernel {
    module_name: String,
    calls: AtomicUsize,
    registrations: AtomicUsize,
    next_id: AtomicU64,
    violation: Mutex<Option<HealthCheckError>>,
}

impl StubKernel {
    /// Stub expecting calls from `module_name`.
    pub fn new(module_name: impl Into<String>) -> Self {
        Self {
            module_name: module_name.into(),
            calls: AtomicUsize::new(0),
            registrations: AtomicUsize::new(0),
            next_id: AtomicU64::new(1),
            violation: Mutex::new(None),
        }
    }

    /// Calls observed.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Listener registrations observed (recorded, never installed).
    pub fn registrations(&self) -> usize {
        self.registrations.load(Ordering::SeqCst)
    }

    /// Health-check result: the first contract violation, else at least one call.
    pub fn verdict(&self) -> Result<usize, HealthCheckError> {
        if let Some(violation) = self.violation.lock().clone() {
            return Err(violation);
        }
        match self.calls() {
            0 => Err(HealthCheckError::NoCalls),
            calls => Ok(calls),
        }
    }

    fn check(&self, payload: &Payload, reply: &Reply) -> Result<(), HealthCheckError> {
        if !reply.is_present() {
            return Err(HealthCheckError::MissingReply);
        }
        let module = payload.module_identity().ok_or(HealthCheckError::MissingModuleName)?;
        if module.as_str() != self.module_name {
            return Err(HealthCheckError::ForeignIdentity {
                expected: self.module_name.clone(),
                found: module.to_string(),
            });
        }
        if payload.module_type != Some(ModuleType::Community) {
            return Err(HealthCheckError::WrongModuleType {
                found: payload.module_type,
            });
        }
        Ok(())
    }
}

impl KernelHandle for StubKernel {
    fn emit(&self, event: EventName, payload: Payload, reply: Reply) -> bool {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.check(&payload, &reply) {
            Ok(()) => {
                debug!(module = %self.module_name, event = %event, "Stub kernel call accepted");
                reply.ok(json!({ "healthCheck": true }));
                true
            }
            Err(violation) => {
                debug!(module = %self.module_name, event = %event, %violation, "Stub kernel call rejected");
                self.violation.lock().get_or_insert(violation);
                if reply.is_present() {
                    reply.err(BusError::Dropped);
                }
                false
            }
        }
    }

    fn on(&self, event: EventName, module_name: &str, module_type: ModuleType, _handler: Handler) -> Option<ListenerId> {
        self.registrations.fetch_add(1, Ordering::SeqCst);
        let violation = if module_name != self.module_name {
            Some(HealthCheckError::ForeignIdentity {
                expected: self.module_name.clone(),
                found: module_name.to_string(),
            })
        } else if module_type != ModuleType::Community {
            Some(HealthCheckError::WrongModuleType {
                found: Some(module_type),
            })
        } else {
            None
        };
        if let Some(violation) = violation {
            debug!(module = %self.module_name, event = %event, %violation, "Stub kernel registration rejected");
            self.violation.lock().get_or_insert(violation);
            return None;
        }
        debug!(module = module_name, event = %event, "Stub kernel recorded a registration");
        Some(ListenerId::new(self.next_id.fetch_add(1, Ordering::SeqCst)))
    }

    fn off(&self, _id: ListenerId) -> bool {
        true
    }
}
