//! # Registry Client
//!
//! Reaches the registry through the kernel, the same way any other module
//! would: identity on the envelope, a capability token, a one-shot reply.

use crate::domain::errors::RegistryError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use shared_bus::{EventName, KernelHandle, Reply};
use shared_types::{
    ModuleRegistryEntry, ModuleType, Payload, ReactivateModuleRequest, RegistryChanges, RegistryFilter,
    RegistryInsertRequest, RegistrySelectRequest, RegistryUpdateRequest,
};
use std::fmt;
use std::sync::Arc;

/// Kernel-routed registry access on behalf of one module.
#[derive(Clone)]
pub struct RegistryClient {
    kernel: Arc<dyn KernelHandle>,
    module_name: String,
    module_type: ModuleType,
    token: String,
}

impl RegistryClient {
    /// A client calling as `module_name` with `token`.
    pub fn new(
        kernel: Arc<dyn KernelHandle>,
        module_name: impl Into<String>,
        module_type: ModuleType,
        token: impl Into<String>,
    ) -> Self {
        Self {
            kernel,
            module_name: module_name.into(),
            module_type,
            token: token.into(),
        }
    }

    /// `registrySelect`
    pub async fn select(&self, filter: RegistryFilter) -> Result<Vec<ModuleRegistryEntry>, RegistryError> {
        self.call(EventName::RegistrySelect, &RegistrySelectRequest { filter }).await
    }

    /// Single entry by name.
    pub async fn get(&self, module_name: &str) -> Result<Option<ModuleRegistryEntry>, RegistryError> {
        let mut found = self.select(RegistryFilter::ByName(module_name.to_string())).await?;
        Ok(found.pop())
    }

    /// `registryInsert`
    pub async fn insert(&self, entry: ModuleRegistryEntry) -> Result<ModuleRegistryEntry, RegistryError> {
        self.call(EventName::RegistryInsert, &RegistryInsertRequest { entry }).await
    }

    /// `registryUpdate`
    pub async fn update(
        &self,
        module_name: &str,
        changes: RegistryChanges,
    ) -> Result<ModuleRegistryEntry, RegistryError> {
        let request = RegistryUpdateRequest {
            module_name: module_name.to_string(),
            changes,
        };
        self.call(EventName::RegistryUpdate, &request).await
    }

    /// `reactivateModule`
    pub async fn reactivate(&self, module_name: &str) -> Result<ModuleRegistryEntry, RegistryError> {
        let request = ReactivateModuleRequest {
            module_name: module_name.to_string(),
        };
        self.call(EventName::ReactivateModule, &request).await
    }

    async fn call<Req, Resp>(&self, event: EventName, request: &Req) -> Result<Resp, RegistryError>
    where
        Req: Serialize,
        Resp: DeserializeOwned,
    {
        let payload = Payload::from_module(self.module_name.clone(), self.module_type)
            .with_token(self.token.clone())
            .with_request(request)?;
        let (reply, receiver) = Reply::channel();

        // A `false` return drops or resolves the reply, so the receiver
        // always completes.
        self.kernel.emit(event, payload, reply);
        let value = receiver.recv().await?;
        serde_json::from_value(value).map_err(|e| RegistryError::Corrupt(e.to_string()))
    }
}

impl fmt::Debug for RegistryClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistryClient")
            .field("module_name", &self.module_name)
            .field("module_type", &self.module_type)
            .finish_non_exhaustive()
    }
}
