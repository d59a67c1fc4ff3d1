//! # Plugin Kernel Handle
//!
//! What a live plugin holds instead of the real kernel. Every registration
//! and call is pinned to the plugin's own `moduleName` as
//! [`ModuleType::Community`]:
//!
//! | Operation | Foreign `moduleName` | Core `moduleType` |
//! |-----------|----------------------|-------------------|
//! | `on`      | refused              | refused           |
//! | `emit`    | refused, reply `Forbidden` | rewritten to community |
//! | `off`     | only ids this handle registered | - |
//!
//! Calls without a `moduleName` pass through so the kernel drops them the
//! way it drops any anonymous call.

use parking_lot::Mutex;
use shared_bus::{EventName, Handler, KernelHandle, ListenerId, Reply};
use shared_types::{BusError, ModuleType, Payload};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use tracing::warn;

/// A [`KernelHandle`] bound to one plugin's identity.
pub struct PluginKernel {
    inner: Arc<dyn KernelHandle>,
    module_name: String,
    owned: Mutex<HashSet<ListenerId>>,
}

impl PluginKernel {
    pub fn new(inner: Arc<dyn KernelHandle>, module_name: impl Into<String>) -> Self {
        Self {
            inner,
            module_name: module_name.into(),
            owned: Mutex::new(HashSet::new()),
        }
    }

    /// The identity every call is pinned to.
    pub fn module_name(&self) -> &str {
        &self.module_name
    }
}

impl KernelHandle for PluginKernel {
    fn emit(&self, event: EventName, mut payload: Payload, reply: Reply) -> bool {
        if let Some(claimed) = payload.module_name.as_deref() {
            if claimed != self.module_name {
                warn!(module = %self.module_name, claimed, event = %event, "Plugin call under a foreign moduleName refused");
                reply.err(BusError::Forbidden(format!(
                    "{} may not call as {claimed:?}",
                    self.module_name
                )));
                return false;
            }
            payload.module_type = Some(ModuleType::Community);
        }
        self.inner.emit(event, payload, reply)
    }

    fn on(
        &self,
        event: EventName,
        module_name: &str,
        module_type: ModuleType,
        handler: Handler,
    ) -> Option<ListenerId> {
        if module_name != self.module_name || module_type != ModuleType::Community {
            warn!(
                module = %self.module_name,
                claimed = module_name,
                claimed_type = %module_type,
                event = %event,
                "Plugin listener registration outside its own identity refused"
            );
            return None;
        }
        let id = self.inner.on(event, &self.module_name, ModuleType::Community, handler)?;
        self.owned.lock().insert(id);
        Some(id)
    }

    fn off(&self, id: ListenerId) -> bool {
        if !self.owned.lock().remove(&id) {
            return false;
        }
        self.inner.off(id)
    }
}

impl fmt::Debug for PluginKernel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginKernel")
            .field("module_name", &self.module_name)
            .field("listeners", &self.owned.lock().len())
            .finish_non_exhaustive()
    }
}
