//! # Module Loader Service
//!
//! Discovers plugin folders and admits plugins onto the kernel.
//!
//! ## Load Run
//!
//! ```text
//! sync_meltdowns ──→ pass 1: Active entries ──→ pass 2: RetryCandidates
//!                     ├─ ok  → clear last_error   ├─ ok  → reactivate
//!                     └─ err → deactivate         └─ err → deactivate
//! ```
//!
//! Admission runs two phases, each on a fresh plugin instance:
//!
//! 1. **Rehearsal**: `initialize()` against a [`StubKernel`]. It must make at
//!    least one well-formed kernel call.
//! 2. **Live**: `initialize()` against a [`PluginKernel`] pinned to the
//!    plugin's identity, with a low-trust module token.
//!
//! A plugin that fails loses only its own community listeners. Manifests
//! naming a core module are rejected at discovery, and one module's registry
//! error does not end the run for the others.
//!
//! Modules whose breaker tripped are never retried automatically. They come
//! back through [`ModuleLoader::reactivate`], effective after a restart.

use crate::adapters::bus::{register_heartbeat_listener, LOADER_MODULE};
use crate::adapters::plugin_kernel::PluginKernel;
use crate::domain::config::LoaderConfig;
use crate::domain::errors::{is_meltdown_error, HealthCheckError, LoaderError};
use crate::domain::manifest::{is_reserved_module_name, PluginManifest, MANIFEST_FILE};
use crate::domain::report::{DiscoveryReport, LoadOutcome, LoadPass, LoadReport, SkipReason};
use crate::ports::outbound::{InitContext, Plugin, PluginError, PluginLoader};
use crate::sandbox::Sandbox;
use crate::stub_kernel::StubKernel;
use chrono::Utc;
use cms_01_capability_tokens::CapabilityTokenApi;
use cms_02_module_registry::RegistryClient;
use parking_lot::{Mutex, RwLock};
use shared_bus::{Notifier, TrustKernel};
use shared_crypto::SharedSecret;
use shared_types::{
    ModuleRegistryEntry, ModuleType, Notification, NotificationPriority, NotificationType, RegistryChanges,
    RegistryFilter, TrustLevel,
};
use std::any::Any;
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Plugin discovery and admission.
pub struct ModuleLoader {
    config: LoaderConfig,
    kernel: Arc<TrustKernel>,
    tokens: Arc<dyn CapabilityTokenApi>,
    bootstrap_secret: SharedSecret,
    plugins: Arc<dyn PluginLoader>,
    notifier: Arc<dyn Notifier>,
    /// moduleName -> folder, from the last discovery scan
    plugin_dirs: RwLock<BTreeMap<String, PathBuf>>,
    /// Meltdowns already written to the registry
    synced_meltdowns: Mutex<HashSet<String>>,
}

impl ModuleLoader {
    /// Create a loader and register its heartbeat listener on `kernel`.
    pub fn new(
        config: LoaderConfig,
        kernel: Arc<TrustKernel>,
        tokens: Arc<dyn CapabilityTokenApi>,
        bootstrap_secret: SharedSecret,
        plugins: Arc<dyn PluginLoader>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self, LoaderError> {
        config.validate().map_err(LoaderError::Config)?;

        if !register_heartbeat_listener(kernel.as_ref()) {
            return Err(LoaderError::Config(format!(
                "kernel refused the {LOADER_MODULE} listener"
            )));
        }

        Ok(Self {
            config,
            kernel,
            tokens,
            bootstrap_secret,
            plugins,
            notifier,
            plugin_dirs: RwLock::new(BTreeMap::new()),
            synced_meltdowns: Mutex::new(HashSet::new()),
        })
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    /// Discover, then load.
    pub async fn run(&self) -> Result<(DiscoveryReport, LoadReport), LoaderError> {
        let discovery = self.discover().await?;
        let load = self.load_all().await?;
        Ok((discovery, load))
    }

    // =========================================================================
    // DISCOVERY
    // =========================================================================

    /// Scan `plugins_dir` for folders carrying a manifest.
    ///
    /// New plugins are inserted active; changed manifests update
    /// `module_info`. Activation state of known plugins is left alone.
    pub async fn discover(&self) -> Result<DiscoveryReport, LoaderError> {
        let registry = self.registry()?;
        let mut report = DiscoveryReport::default();
        let mut dirs = BTreeMap::new();

        let entries = match std::fs::read_dir(&self.config.plugins_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(dir = %self.config.plugins_dir.display(), "Plugins directory missing");
                *self.plugin_dirs.write() = dirs;
                return Ok(report);
            }
            Err(e) => return Err(e.into()),
        };
        let mut folders: Vec<PathBuf> = entries
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| path.is_dir())
            .collect();
        folders.sort();

        for folder in folders {
            if !folder.join(MANIFEST_FILE).is_file() {
                continue;
            }
            let manifest = match PluginManifest::read(&folder) {
                Ok(manifest) => manifest,
                Err(e) => {
                    warn!(dir = %folder.display(), error = %e, "Unusable plugin manifest");
                    report.invalid.push((folder, e.to_string()));
                    continue;
                }
            };
            let name = manifest.module_name.clone();
            if dirs.contains_key(&name) {
                warn!(module = %name, dir = %folder.display(), "Duplicate moduleName, folder ignored");
                report.invalid.push((folder, format!("duplicate moduleName {name:?}")));
                continue;
            }
            if self.is_core_name(&name) {
                warn!(module = %name, dir = %folder.display(), "Plugin manifest names a core module, folder ignored");
                report.invalid.push((folder, format!("moduleName {name:?} is reserved for a core module")));
                continue;
            }

            let info = manifest.module_info();
            match registry.get(&name).await? {
                None => {
                    registry
                        .insert(ModuleRegistryEntry::discovered(&name, info, Utc::now()))
                        .await?;
                    info!(module = %name, "New plugin registered");
                    report.registered.push(name.clone());
                }
                Some(entry) if entry.module_info != info => {
                    let changes = RegistryChanges {
                        module_info: Some(info),
                        ..RegistryChanges::default()
                    };
                    registry.update(&name, changes).await?;
                    debug!(module = %name, "Plugin metadata updated");
                }
                Some(_) => {}
            }
            dirs.insert(name.clone(), folder);
            report.discovered.push(name);
        }

        report.discovered.sort();
        *self.plugin_dirs.write() = dirs;
        Ok(report)
    }

    // =========================================================================
    // LOADING
    // =========================================================================

    /// Write latched breakers to the registry as `meltdown: <reason>`.
    ///
    /// Each meltdown is written once per process, so a later explicit
    /// reactivation is not overwritten. Returns the modules updated.
    pub async fn sync_meltdowns(&self) -> Result<Vec<String>, LoaderError> {
        let registry = self.registry()?;
        self.sync_meltdowns_with(&registry).await
    }

    /// Two-pass load over the registry.
    pub async fn load_all(&self) -> Result<LoadReport, LoaderError> {
        let registry = self.registry()?;
        self.sync_meltdowns_with(&registry).await?;

        let mut report = LoadReport::default();
        let mut attempted = HashSet::new();

        for entry in registry.select(RegistryFilter::Active).await? {
            let name = entry.module_name.as_str();
            let outcome = if self.kernel.is_melted(name) {
                LoadOutcome::Skipped(SkipReason::Meltdown)
            } else {
                attempted.insert(name.to_string());
                self.load_one(&registry, name, LoadPass::Initial).await
            };
            report.record(name, LoadPass::Initial, outcome);
        }

        for entry in registry.select(RegistryFilter::RetryCandidates).await? {
            let name = entry.module_name.as_str();
            if attempted.contains(name) {
                debug!(module = name, "Failed in pass 1, not retried this run");
                continue;
            }
            let melted = self.kernel.is_melted(name) || entry.last_error.as_deref().is_some_and(is_meltdown_error);
            let outcome = if melted {
                LoadOutcome::Skipped(SkipReason::Meltdown)
            } else {
                self.load_one(&registry, name, LoadPass::Retry).await
            };
            report.record(name, LoadPass::Retry, outcome);
        }

        info!(
            live = report.live().len(),
            reactivated = report.reactivated().len(),
            failed = report.failed().len(),
            skipped = report.skipped().len(),
            "Module load run finished"
        );
        Ok(report)
    }

    /// Explicitly reactivate a module.
    ///
    /// A module still latched in the kernel stays excluded until restart.
    pub async fn reactivate(&self, module_name: &str) -> Result<ModuleRegistryEntry, LoaderError> {
        let entry = self.registry()?.reactivate(module_name).await?;
        if self.kernel.is_melted(module_name) {
            warn!(module = module_name, "Reactivated in the registry; breaker stays latched until restart");
        } else {
            info!(module = module_name, "Module reactivated");
        }
        Ok(entry)
    }

    async fn sync_meltdowns_with(&self, registry: &RegistryClient) -> Result<Vec<String>, LoaderError> {
        let pending: Vec<_> = {
            let synced = self.synced_meltdowns.lock();
            self.kernel
                .meltdowns()
                .into_iter()
                .filter(|(name, _)| !synced.contains(name))
                .collect()
        };

        let mut updated = Vec::new();
        for (name, record) in pending {
            // Core modules tripping have no registry row.
            if registry.get(&name).await?.is_some() {
                let message = LoaderError::Meltdown(record.reason).to_string();
                registry.update(&name, RegistryChanges::deactivate(message)).await?;
                warn!(module = %name, "Meltdown recorded in the registry");
                updated.push(name.clone());
            }
            self.synced_meltdowns.lock().insert(name);
        }
        Ok(updated)
    }

    /// Load one module. Errors stay with the module.
    async fn load_one(&self, registry: &RegistryClient, module_name: &str, pass: LoadPass) -> LoadOutcome {
        match self.try_load_one(registry, module_name, pass).await {
            Ok(outcome) => outcome,
            Err(error) => {
                warn!(module = module_name, ?pass, %error, "Load attempt aborted");
                LoadOutcome::Failed(error.to_string())
            }
        }
    }

    async fn try_load_one(
        &self,
        registry: &RegistryClient,
        module_name: &str,
        pass: LoadPass,
    ) -> Result<LoadOutcome, LoaderError> {
        if self.is_core_name(module_name) {
            warn!(module = module_name, "Registry entry names a core module, skipped");
            return Ok(LoadOutcome::Skipped(SkipReason::ReservedName));
        }
        let dir = self.plugin_dir(module_name);
        if !dir.is_dir() {
            warn!(module = module_name, dir = %dir.display(), "Plugin folder missing, skipped");
            return Ok(LoadOutcome::Skipped(SkipReason::SourceMissing));
        }

        match self.admit(module_name, &dir).await {
            Ok(()) => {
                let (changes, outcome) = match pass {
                    LoadPass::Initial => (RegistryChanges::clear_error(), LoadOutcome::Loaded),
                    LoadPass::Retry => (RegistryChanges::reactivate(), LoadOutcome::Reactivated),
                };
                registry.update(module_name, changes).await?;
                info!(module = module_name, ?pass, "Module loaded");
                Ok(outcome)
            }
            Err(error) => {
                self.record_failure(registry, module_name, &error).await?;
                Ok(LoadOutcome::Failed(error.to_string()))
            }
        }
    }

    async fn admit(&self, module_name: &str, dir: &Path) -> Result<(), LoaderError> {
        let sandbox = Arc::new(Sandbox::new(dir).map_err(|e| LoaderError::Sandbox(e.to_string()))?);

        // Phase 1: rehearsal.
        let plugin = self.instantiate(module_name, dir)?;
        let stub = Arc::new(StubKernel::new(module_name));
        let ctx = InitContext {
            kernel: stub.clone(),
            module_name: module_name.to_string(),
            is_core: false,
            jwt: None,
            sandbox: sandbox.clone(),
        };
        run_initialize(plugin, ctx, self.config.health_check_timeout)
            .await
            .map_err(HealthCheckError::from)?;
        let calls = stub.verdict()?;
        debug!(module = module_name, calls, "Health check passed");

        // Phase 2: live.
        let jwt = self
            .tokens
            .issue_module_token(self.bootstrap_secret.expose(), module_name, TrustLevel::Low)?;
        let plugin = self.instantiate(module_name, dir)?;
        let ctx = InitContext {
            kernel: Arc::new(PluginKernel::new(self.kernel.clone(), module_name)),
            module_name: module_name.to_string(),
            is_core: false,
            jwt: Some(jwt),
            sandbox,
        };
        let live = run_initialize(plugin, ctx, self.config.init_timeout).await;

        if let Some(reason) = self.kernel.meltdown_reason(module_name) {
            return Err(LoaderError::Meltdown(reason));
        }
        live.map_err(|failure| LoaderError::InitFailed(failure.to_string()))
    }

    async fn record_failure(
        &self,
        registry: &RegistryClient,
        module_name: &str,
        error: &LoaderError,
    ) -> Result<(), LoaderError> {
        let removed = self.kernel.remove_community_listeners(module_name);
        if matches!(error, LoaderError::Meltdown(_)) {
            self.synced_meltdowns.lock().insert(module_name.to_string());
        }
        warn!(module = module_name, %error, removed_listeners = removed, "Module deactivated");

        registry
            .update(module_name, RegistryChanges::deactivate(error.to_string()))
            .await?;
        self.notifier.notify(Notification::new(
            module_name,
            NotificationType::ModuleLoad,
            NotificationPriority::High,
            format!("Module '{module_name}' was deactivated: {error}"),
        ));
        Ok(())
    }

    /// Reserved, or already registered on the kernel as core.
    fn is_core_name(&self, module_name: &str) -> bool {
        is_reserved_module_name(module_name) || self.kernel.module_type(module_name) == Some(ModuleType::Core)
    }

    fn instantiate(&self, module_name: &str, dir: &Path) -> Result<Arc<dyn Plugin>, LoaderError> {
        self.plugins
            .load(module_name, dir)
            .ok_or_else(|| LoaderError::UnknownPlugin(module_name.to_string()))
    }

    fn plugin_dir(&self, module_name: &str) -> PathBuf {
        self.plugin_dirs
            .read()
            .get(module_name)
            .cloned()
            .unwrap_or_else(|| self.config.plugins_dir.join(module_name))
    }

    /// A registry client with a freshly issued high-trust token.
    fn registry(&self) -> Result<RegistryClient, LoaderError> {
        let token = self
            .tokens
            .issue_module_token(self.bootstrap_secret.expose(), LOADER_MODULE, TrustLevel::High)?;
        Ok(RegistryClient::new(
            self.kernel.clone(),
            LOADER_MODULE,
            ModuleType::Core,
            token,
        ))
    }
}

impl fmt::Debug for ModuleLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleLoader")
            .field("config", &self.config)
            .field("known_plugins", &self.plugin_dirs.read().len())
            .finish_non_exhaustive()
    }
}

// =============================================================================
// INITIALIZE RUNNER
// =============================================================================

enum InitFailure {
    Returned(PluginError),
    Panicked(String),
    TimedOut(Duration),
}

impl From<InitFailure> for HealthCheckError {
    fn from(failure: InitFailure) -> Self {
        match failure {
            InitFailure::Returned(e) => HealthCheckError::InitFailed(e.0),
            InitFailure::Panicked(message) => HealthCheckError::Panicked(message),
            InitFailure::TimedOut(limit) => HealthCheckError::TimedOut(limit),
        }
    }
}

impl fmt::Display for InitFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InitFailure::Returned(e) => write!(f, "{e}"),
            InitFailure::Panicked(message) => write!(f, "initialize() panicked: {message}"),
            InitFailure::TimedOut(limit) => write!(f, "initialize() did not finish within {limit:?}"),
        }
    }
}

/// Run `initialize()` on its own task, bounded by `limit`.
async fn run_initialize(plugin: Arc<dyn Plugin>, ctx: InitContext, limit: Duration) -> Result<(), InitFailure> {
    let mut task = tokio::spawn(async move { plugin.initialize(ctx).await });
    match tokio::time::timeout(limit, &mut task).await {
        Err(_) => {
            task.abort();
            Err(InitFailure::TimedOut(limit))
        }
        Ok(Err(join_error)) if join_error.is_panic() => {
            Err(InitFailure::Panicked(panic_message(join_error.into_panic())))
        }
        Ok(Err(join_error)) => Err(InitFailure::Panicked(join_error.to_string())),
        Ok(Ok(result)) => result.map_err(InitFailure::Returned),
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
