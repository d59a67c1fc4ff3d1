//! Shared wiring for the integration flows: a kernel with the token and
//! registry listeners installed, plus helpers for plugin folders.

use cms_01_capability_tokens::{register_token_listeners, CapabilityTokenApi, TokenService};
use cms_02_module_registry::{register_registry_listeners, InMemoryRegistryStore, RegistryService};
use cms_03_module_loader::{LoaderConfig, ModuleLoader, StaticPluginLoader, MANIFEST_FILE};
use serde_json::json;
use shared_bus::{EventName, KernelHandle, NotificationFeed, Reply, TrustKernel};
use shared_crypto::{BaseSecret, SharedSecret, TierKeyring, TokenCodec};
use shared_types::{BusResult, ModuleType, Payload, TrustLevel};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub const BOOTSTRAP_SECRET: &str = "integration-bootstrap-secret";

/// A kernel with the core token and registry modules.
pub struct Bus {
    pub kernel: Arc<TrustKernel>,
    pub codec: TokenCodec,
    pub tokens: Arc<TokenService>,
    pub registry: Arc<RegistryService<InMemoryRegistryStore>>,
    pub feed: Arc<NotificationFeed>,
}

impl Bus {
    pub fn new() -> Self {
        let codec = TokenCodec::new(TierKeyring::derive(&BaseSecret::from_bytes([42u8; 32])));
        let feed = Arc::new(NotificationFeed::new());
        let kernel = Arc::new(TrustKernel::new(
            codec.clone(),
            SharedSecret::new(BOOTSTRAP_SECRET),
            feed.clone(),
        ));
        let tokens = Arc::new(TokenService::new(codec.clone(), SharedSecret::new(BOOTSTRAP_SECRET)));
        assert_eq!(register_token_listeners(kernel.as_ref(), tokens.clone()), 4);
        let registry = Arc::new(RegistryService::new(InMemoryRegistryStore::new()));
        assert_eq!(register_registry_listeners(kernel.as_ref(), registry.clone()), 4);

        Self {
            kernel,
            codec,
            tokens,
            registry,
            feed,
        }
    }

    /// A service token for `module_name`.
    pub fn module_token(&self, module_name: &str, trust_level: TrustLevel) -> String {
        self.tokens
            .issue_module_token(BOOTSTRAP_SECRET, module_name, trust_level)
            .unwrap()
    }

    /// Register a counting listener that replies `"handled"`.
    pub fn counting_listener(&self, event: EventName, module_name: &str) -> Arc<AtomicUsize> {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        self.kernel
            .on(
                event,
                module_name,
                ModuleType::Core,
                Arc::new(move |_: Payload, reply: Reply| {
                    counter.fetch_add(1, Ordering::SeqCst);
                    reply.ok(json!("handled"));
                }),
            )
            .unwrap();
        hits
    }

    /// Emit and wait for the reply.
    pub async fn call(&self, event: EventName, payload: Payload) -> (bool, BusResult) {
        let (reply, receiver) = Reply::channel();
        let forwarded = self.kernel.emit(event, payload, reply);
        (forwarded, receiver.recv().await)
    }

    /// A loader over `plugins_dir` driven by `catalog`.
    pub fn loader(&self, plugins_dir: &Path, catalog: Arc<StaticPluginLoader>) -> ModuleLoader {
        let config = LoaderConfig::new(plugins_dir).with_timeout(Duration::from_secs(2));
        ModuleLoader::new(
            config,
            self.kernel.clone(),
            self.tokens.clone(),
            SharedSecret::new(BOOTSTRAP_SECRET),
            catalog,
            self.feed.clone(),
        )
        .unwrap()
    }
}

/// Create `<plugins_dir>/<module_name>/moduleInfo.json`.
pub fn plugin_folder(plugins_dir: &Path, module_name: &str) {
    let dir = plugins_dir.join(module_name);
    std::fs::create_dir_all(&dir).unwrap();
    let manifest = json!({
        "moduleName": module_name,
        "developer": "Integration",
        "version": "0.1.0",
        "description": "integration test plugin",
    });
    std::fs::write(dir.join(MANIFEST_FILE), manifest.to_string()).unwrap();
}
