//! # CMS Runtime
//!
//! Owns the kernel and every core module, and drives startup.
//!
//! ## Initialization Order
//!
//! 1. Tier keyring and token codec from the configured base secret
//! 2. Notification feed and trust kernel
//! 3. Capability token listeners (`capabilityTokens`)
//! 4. Module registry listeners (`databaseManager`) over the configured backend
//! 5. Module loader (`moduleLoader`) with its heartbeat listener
//!
//! ## Startup Sequence
//!
//! 1. Bootstrap core service tokens over `skipJWT`
//! 2. Discover plugin folders
//! 3. Two-pass plugin load

use crate::bootstrap::{bootstrap_module_token, BOOTSTRAP_MODULES};
use crate::config::RuntimeConfig;
use anyhow::{bail, Context, Result};
use cms_01_capability_tokens::{register_token_listeners, SystemClock, TokenService};
use cms_02_module_registry::{
    register_registry_listeners, InMemoryRegistryStore, JsonFileRegistryStore, RegistryService, RegistryStore,
};
use cms_03_module_loader::{LoadReport, ModuleLoader, PluginLoader};
use shared_bus::{NotificationFeed, TrustKernel};
use shared_crypto::{BaseSecret, TierKeyring, TokenCodec};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};
use uuid::Uuid;

/// The running CMS core.
pub struct CmsRuntime {
    config: RuntimeConfig,
    /// Identifies this process in logs.
    instance_id: Uuid,
    kernel: Arc<TrustKernel>,
    notifications: Arc<NotificationFeed>,
    loader: ModuleLoader,
    /// Bootstrapped core service tokens.
    core_tokens: RwLock<BTreeMap<String, String>>,
}

impl CmsRuntime {
    /// Wire the kernel and the core modules.
    pub fn new(config: RuntimeConfig, plugins: Arc<dyn PluginLoader>) -> Result<Self> {
        let instance_id = Uuid::new_v4();
        info!(%instance_id, "Creating CMS runtime");

        let base_secret = if config.security.token_secret_is_placeholder() {
            warn!("No token secret configured, using an ephemeral one");
            BaseSecret::generate()
        } else {
            BaseSecret::from_bytes(config.security.token_secret)
        };
        let codec = TokenCodec::new(TierKeyring::derive(&base_secret));

        let notifications = Arc::new(NotificationFeed::new());
        let kernel = Arc::new(TrustKernel::new(
            codec.clone(),
            config.security.shared_secret(),
            notifications.clone(),
        ));

        let tokens = Arc::new(TokenService::with_clock(
            codec,
            config.security.shared_secret(),
            config.tokens.policy(),
            SystemClock,
        ));
        if register_token_listeners(kernel.as_ref(), tokens.clone()) != 4 {
            bail!("kernel refused the capability token listeners");
        }

        let store: Box<dyn RegistryStore> = match &config.registry.path {
            Some(path) => Box::new(
                JsonFileRegistryStore::open(path)
                    .with_context(|| format!("Failed to open module registry at {}", path.display()))?,
            ),
            None => Box::new(InMemoryRegistryStore::new()),
        };
        let registry = Arc::new(RegistryService::new(store));
        if register_registry_listeners(kernel.as_ref(), registry) != 4 {
            bail!("kernel refused the module registry listeners");
        }

        let loader = ModuleLoader::new(
            config.loader.clone(),
            kernel.clone(),
            tokens,
            config.security.shared_secret(),
            plugins,
            notifications.clone(),
        )
        .context("Failed to create module loader")?;

        Ok(Self {
            config,
            instance_id,
            kernel,
            notifications,
            loader,
            core_tokens: RwLock::new(BTreeMap::new()),
        })
    }

    /// Bootstrap core tokens, then discover and load plugins.
    pub async fn start(&self) -> Result<LoadReport> {
        info!("===========================================");
        info!("  CMS Trust Bus Runtime v{}", env!("CARGO_PKG_VERSION"));
        info!("  Instance: {}", self.instance_id);
        info!("===========================================");

        // Step 1: core service tokens.
        for module in BOOTSTRAP_MODULES {
            let token = bootstrap_module_token(
                self.kernel.as_ref(),
                module,
                &self.config.security.bootstrap_secret,
            )
            .await
            .with_context(|| format!("Failed to bootstrap service token for {module}"))?;
            self.core_tokens.write().await.insert(module.to_string(), token);
        }

        // Steps 2 and 3: plugins.
        let (discovery, report) = self.loader.run().await.context("Plugin load run failed")?;
        for (path, reason) in &discovery.invalid {
            warn!(dir = %path.display(), %reason, "Plugin folder ignored");
        }

        info!(
            discovered = discovery.discovered.len(),
            live = ?report.live(),
            failed = ?report.failed(),
            "Core modules initialized"
        );
        info!("Plugins Dir: {:?}", self.config.loader.plugins_dir);
        info!("Registry: {:?}", self.config.registry.path);
        Ok(report)
    }

    /// Shut down. The registry file lock is released when the runtime drops.
    pub async fn shutdown(&self) {
        info!("Initiating graceful shutdown...");
        let melted = self.kernel.meltdowns();
        if !melted.is_empty() {
            warn!(count = melted.len(), "Modules in meltdown at shutdown");
        }
        self.core_tokens.write().await.clear();
        info!("Shutdown complete");
    }

    pub fn instance_id(&self) -> Uuid {
        self.instance_id
    }

    pub fn kernel(&self) -> Arc<TrustKernel> {
        Arc::clone(&self.kernel)
    }

    pub fn notifications(&self) -> Arc<NotificationFeed> {
        Arc::clone(&self.notifications)
    }

    pub fn loader(&self) -> &ModuleLoader {
        &self.loader
    }

    /// Bootstrapped service token of a core module.
    pub async fn core_token(&self, module_name: &str) -> Option<String> {
        self.core_tokens.read().await.get(module_name).cloned()
    }
}
