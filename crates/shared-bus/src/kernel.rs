//! # Trust Kernel
//!
//! The single choke point every module call passes through. It authorizes
//! the call, forwards it to the registered listeners and trips a per-module
//! breaker ("meltdown") on any authentication failure.
//!
//! ## Validation Order
//!
//! ```text
//! emit(event, payload, reply)
//!   1. no listeners for event           -> false (inert)
//!   2. moduleName missing / invalid     -> false (dropped, no trip)
//!   3. moduleName already tripped       -> false
//!   4. event is public                  -> forward
//!   5. skipJWT                          -> allow-listed pair + secret ? forward : TRIP
//!   6. capability token                 -> verified ? attach claims, forward : TRIP
//! ```
//!
//! ## Trip Side Effects
//!
//! Latch set and every listener tagged with the module swept from every
//! event, under one write lock so no registration can slip in between. Then
//! the operator is notified and the reply resolved with [`BusError::Meltdown`].
//!
//! Listeners receive verified claims, never the caller's raw token or secret.
//!
//! The kernel never panics across `emit`: listener panics are caught and
//! turned into a reply error.

use crate::events::{is_bootstrap_allowed, EventName};
use crate::latch::{MeltdownLatch, MeltdownRecord};
use crate::publisher::Notifier;
use crate::reply::Reply;
use chrono::Utc;
use parking_lot::RwLock;
use shared_crypto::{SharedSecret, TokenCodec};
use shared_types::{
    BusError, MeltdownReason, ModuleName, ModuleType, Notification, NotificationPriority,
    NotificationType, Payload,
};
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info, trace, warn};

/// A registered event handler.
pub type Handler = Arc<dyn Fn(Payload, Reply) + Send + Sync>;

/// Identifies one registration, for [`KernelHandle::off`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

impl ListenerId {
    /// Wrap a raw id. Kernels allocate these; other `KernelHandle`s may too.
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }
}

/// What a module sees of a kernel: emit calls, register handlers.
///
/// Implemented by [`TrustKernel`] and by the loader's health-check stub.
pub trait KernelHandle: Send + Sync {
    /// Submit a call. `false` means it was not forwarded to any listener.
    fn emit(&self, event: EventName, payload: Payload, reply: Reply) -> bool;

    /// Register `handler` for `event` on behalf of `module_name`.
    ///
    /// Returns `None` if the registration was refused.
    fn on(
        &self,
        event: EventName,
        module_name: &str,
        module_type: ModuleType,
        handler: Handler,
    ) -> Option<ListenerId>;

    /// Remove one registration. Returns whether it existed.
    fn off(&self, id: ListenerId) -> bool;
}

struct Listener {
    id: ListenerId,
    module_name: String,
    handler: Handler,
}

/// Mutable kernel state, guarded as one unit.
#[derive(Default)]
struct KernelState {
    listeners: HashMap<EventName, Vec<Listener>>,
    module_types: HashMap<String, ModuleType>,
}

/// The authorizing event dispatcher.
pub struct TrustKernel {
    state: RwLock<KernelState>,
    latch: MeltdownLatch,
    codec: TokenCodec,
    bootstrap_secret: SharedSecret,
    notifier: Arc<dyn Notifier>,
    next_listener_id: AtomicU64,
}

impl TrustKernel {
    /// Create a kernel.
    pub fn new(codec: TokenCodec, bootstrap_secret: SharedSecret, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            state: RwLock::new(KernelState::default()),
            latch: MeltdownLatch::new(),
            codec,
            bootstrap_secret,
            notifier,
            next_listener_id: AtomicU64::new(1),
        }
    }

    // =========================================================================
    // DISPATCH
    // =========================================================================

    fn dispatch(&self, event: EventName, mut payload: Payload, reply: Reply) -> bool {
        // Step 1: inert event.
        let handlers = self.handlers_for(&event);
        if handlers.is_empty() {
            debug!(event = %event, "No listeners registered, call ignored");
            return false;
        }

        // Step 2: identity.
        let Some(module) = payload.module_identity() else {
            return false;
        };

        // Step 3: latch.
        if self.latch.is_tripped(module.as_str()) {
            debug!(event = %event, module = %module, "Call from module in meltdown dropped");
            return false;
        }

        // Claims are only ever the kernel's.
        payload.attach_claims(None);
        self.stamp_module_type(&module, &mut payload);

        // Step 4: public events.
        if event.is_public() {
            trace!(event = %event, payload = %payload.masked_json(), "Public event");
            return self.forward(&event, &module, handlers, payload, reply);
        }

        // Step 5: bootstrap path.
        if payload.skip_jwt {
            if !is_bootstrap_allowed(module.as_str(), &event) {
                return self.trip(&module, MeltdownReason::UnauthorizedSkipJwt, &reply);
            }
            let supplied = payload.auth_secret.take().unwrap_or_default();
            if !self.bootstrap_secret.matches(&supplied) {
                return self.trip(&module, MeltdownReason::InvalidSecret, &reply);
            }
            debug!(event = %event, module = %module, "Bootstrap call accepted");
            return self.forward(&event, &module, handlers, payload, reply);
        }

        // Step 6: capability token.
        let Some(jwt) = payload.jwt.as_deref() else {
            return self.trip(&module, MeltdownReason::NoToken, &reply);
        };
        match self.codec.verify(jwt, Utc::now().timestamp()) {
            Ok(claims) => payload.attach_claims(Some(claims)),
            Err(e) if e.is_undecodable() => {
                debug!(module = %module, error = %e, "Token rejected");
                return self.trip(&module, MeltdownReason::Undecodable, &reply);
            }
            Err(e) => {
                debug!(module = %module, error = %e, "Token rejected");
                return self.trip(&module, MeltdownReason::InvalidToken, &reply);
            }
        }

        // Step 7.
        self.forward(&event, &module, handlers, payload, reply)
    }

    fn forward(
        &self,
        event: &EventName,
        module: &ModuleName,
        handlers: Vec<Handler>,
        mut payload: Payload,
        reply: Reply,
    ) -> bool {
        payload.jwt = None;
        payload.auth_secret = None;
        trace!(event = %event, module = %module, listeners = handlers.len(), "Forwarding");
        for handler in handlers {
            let call_payload = payload.clone();
            let call_reply = reply.clone();
            let outcome = catch_unwind(AssertUnwindSafe(|| handler(call_payload, call_reply)));
            if outcome.is_err() {
                error!(event = %event, caller = %module, "Listener panicked");
                reply.err(BusError::Handler(format!("listener for {event} panicked")));
            }
        }
        true
    }

    fn handlers_for(&self, event: &EventName) -> Vec<Handler> {
        self.state
            .read()
            .listeners
            .get(event)
            .map(|listeners| listeners.iter().map(|l| l.handler.clone()).collect())
            .unwrap_or_default()
    }

    /// Listeners see the type the module registered with, not what it claims.
    fn stamp_module_type(&self, module: &ModuleName, payload: &mut Payload) {
        let Some(known) = self.module_type(module.as_str()) else {
            return;
        };
        if payload.module_type.is_some_and(|claimed| claimed != known) {
            warn!(module = %module, claimed = ?payload.module_type, registered = %known, "Module type mismatch");
        }
        payload.module_type = Some(known);
    }

    // =========================================================================
    // MELTDOWN
    // =========================================================================

    fn trip(&self, module: &ModuleName, reason: MeltdownReason, reply: &Reply) -> bool {
        self.meltdown(module.as_str(), reason.clone());
        reply.err(BusError::Meltdown {
            module: module.to_string(),
            reason,
        });
        false
    }

    /// Trip the breaker for `module_name`.
    ///
    /// Returns `true` if this call tripped it. Listeners are swept either way.
    pub fn meltdown(&self, module_name: &str, reason: MeltdownReason) -> bool {
        // Lock order: state, then latch.
        let (newly_tripped, removed) = {
            let mut state = self.state.write();
            let newly_tripped = self.latch.trip(module_name, reason.clone());
            (newly_tripped, sweep(&mut state, module_name))
        };
        if newly_tripped {
            warn!(module = module_name, reason = %reason, "Meltdown");
            self.notifier.notify(Notification::new(
                module_name,
                NotificationType::Security,
                NotificationPriority::Critical,
                reason.user_message(module_name),
            ));
        }
        if removed > 0 {
            info!(module = module_name, removed, "Swept listeners");
        }
        newly_tripped
    }

    /// Whether `module_name` is in meltdown.
    pub fn is_melted(&self, module_name: &str) -> bool {
        self.latch.is_tripped(module_name)
    }

    /// Why `module_name` is in meltdown.
    pub fn meltdown_reason(&self, module_name: &str) -> Option<MeltdownReason> {
        self.latch.record(module_name).map(|r| r.reason)
    }

    /// Every module in meltdown.
    pub fn meltdowns(&self) -> Vec<(String, MeltdownRecord)> {
        self.latch.snapshot()
    }

    // =========================================================================
    // LISTENERS
    // =========================================================================

    /// Remove every listener tagged with `module_name`, across all events.
    pub fn remove_module_listeners(&self, module_name: &str) -> usize {
        sweep(&mut self.state.write(), module_name)
    }

    /// Like [`remove_module_listeners`](Self::remove_module_listeners), but
    /// only if `module_name` registered as [`ModuleType::Community`].
    ///
    /// A core module's listeners are left alone and `0` is returned.
    pub fn remove_community_listeners(&self, module_name: &str) -> usize {
        let mut state = self.state.write();
        match state.module_types.get(module_name) {
            Some(ModuleType::Community) => sweep(&mut state, module_name),
            Some(ModuleType::Core) => {
                warn!(module = module_name, "Refusing to sweep listeners of a core module");
                0
            }
            None => 0,
        }
    }

    /// Listeners registered for `event`.
    pub fn listener_count(&self, event: &EventName) -> usize {
        self.state.read().listeners.get(event).map_or(0, Vec::len)
    }

    /// Events `module_name` has listeners on, sorted.
    pub fn listeners_for_module(&self, module_name: &str) -> Vec<EventName> {
        let state = self.state.read();
        let mut events: Vec<_> = state
            .listeners
            .iter()
            .filter(|(_, listeners)| listeners.iter().any(|l| l.module_name == module_name))
            .map(|(event, _)| event.clone())
            .collect();
        events.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        events
    }

    /// Type a module registered with.
    pub fn module_type(&self, module_name: &str) -> Option<ModuleType> {
        self.state.read().module_types.get(module_name).copied()
    }
}

fn sweep(state: &mut KernelState, module_name: &str) -> usize {
    let mut removed = 0;
    state.listeners.retain(|_, listeners| {
        let before = listeners.len();
        listeners.retain(|l| l.module_name != module_name);
        removed += before - listeners.len();
        !listeners.is_empty()
    });
    removed
}

impl KernelHandle for TrustKernel {
    fn emit(&self, event: EventName, payload: Payload, reply: Reply) -> bool {
        self.dispatch(event, payload, reply)
    }

    fn on(
        &self,
        event: EventName,
        module_name: &str,
        module_type: ModuleType,
        handler: Handler,
    ) -> Option<ListenerId> {
        let Some(module) = ModuleName::parse(module_name) else {
            warn!(event = %event, "Listener registration without a valid module name refused");
            return None;
        };

        // The latch is read under the state lock so a concurrent meltdown
        // either sees this listener and sweeps it, or this sees the latch.
        let mut state = self.state.write();
        if self.latch.is_tripped(module.as_str()) {
            warn!(event = %event, module = %module, "Listener registration from module in meltdown refused");
            return None;
        }
        let id = ListenerId(self.next_listener_id.fetch_add(1, Ordering::Relaxed));
        // First registration fixes the module's type.
        let registered_type = *state
            .module_types
            .entry(module.to_string())
            .or_insert(module_type);
        if registered_type != module_type {
            warn!(module = %module, claimed = %module_type, registered = %registered_type, "Listener registration with conflicting module type refused");
            return None;
        }
        state.listeners.entry(event.clone()).or_default().push(Listener {
            id,
            module_name: module.to_string(),
            handler,
        });
        debug!(event = %event, module = %module, "Listener registered");
        Some(id)
    }

    fn off(&self, id: ListenerId) -> bool {
        let mut state = self.state.write();
        let mut found = false;
        state.listeners.retain(|_, listeners| {
            let before = listeners.len();
            listeners.retain(|l| l.id != id);
            found |= listeners.len() != before;
            !listeners.is_empty()
        });
        found
    }
}
