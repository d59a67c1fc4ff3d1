//! # Module Loading Flows
//!
//! Discovery, the stub-kernel health check and the two-pass load, run
//! against a kernel with the real token and registry modules behind it.

#[cfg(test)]
mod tests {
    use crate::integration::fixtures::{plugin_folder, Bus};
    use async_trait::async_trait;
    use cms_02_module_registry::{ModuleRegistryApi, REGISTRY_MODULE};
    use cms_03_module_loader::{
        is_meltdown_error, InitContext, LoadOutcome, LoadPass, Plugin, PluginError, SkipReason, StaticPluginLoader,
    };
    use cms_runtime::{GalleryPlugin, GALLERY_MODULE};
    use serde_json::json;
    use shared_bus::{EventName, KernelHandle, NotificationFilter, Reply};
    use shared_types::{
        MeltdownReason, ModuleRegistryEntry, ModuleType, NotificationType, Payload, RegistryFilter,
        RegistrySelectRequest, TrustLevel,
    };
    use std::sync::Arc;

    // =========================================================================
    // PLUGINS
    // =========================================================================

    /// Registers `<name>.status` and sends a heartbeat with its token.
    #[derive(Default)]
    struct Healthy;

    #[async_trait]
    impl Plugin for Healthy {
        async fn initialize(&self, ctx: InitContext) -> Result<(), PluginError> {
            ctx.kernel.on(
                EventName::custom(format!("{}.status", ctx.module_name)),
                &ctx.module_name,
                ModuleType::Community,
                Arc::new(|_: Payload, reply: Reply| {
                    reply.ok(json!("up"));
                }),
            );
            let mut payload = Payload::from_module(ctx.module_name.clone(), ModuleType::Community);
            if let Some(jwt) = ctx.jwt.clone() {
                payload = payload.with_token(jwt);
            }
            let (reply, rx) = Reply::channel();
            ctx.kernel.emit(EventName::ModuleHeartbeat, payload, reply);
            rx.recv().await.map(|_| ()).map_err(|e| PluginError::new(e.to_string()))
        }
    }

    /// Registers a listener and never calls the kernel.
    #[derive(Default)]
    struct Silent;

    #[async_trait]
    impl Plugin for Silent {
        async fn initialize(&self, ctx: InitContext) -> Result<(), PluginError> {
            ctx.kernel.on(
                EventName::custom(format!("{}.status", ctx.module_name)),
                &ctx.module_name,
                ModuleType::Community,
                Arc::new(|_: Payload, _: Reply| {}),
            );
            Ok(())
        }
    }

    /// Announces itself as a core module.
    #[derive(Default)]
    struct PosesAsCore;

    #[async_trait]
    impl Plugin for PosesAsCore {
        async fn initialize(&self, ctx: InitContext) -> Result<(), PluginError> {
            let payload = Payload::from_module(ctx.module_name.clone(), ModuleType::Core);
            let (reply, rx) = Reply::channel();
            ctx.kernel.emit(EventName::ModuleHeartbeat, payload, reply);
            let _ = rx.recv().await;
            Ok(())
        }
    }

    /// Looks healthy to the stub, then tries the bootstrap path live.
    #[derive(Default)]
    struct SkipsJwt;

    #[async_trait]
    impl Plugin for SkipsJwt {
        async fn initialize(&self, ctx: InitContext) -> Result<(), PluginError> {
            let payload = Payload::from_module(ctx.module_name.clone(), ModuleType::Community)
                .with_bootstrap("guessed-secret");
            let (reply, rx) = Reply::channel();
            ctx.kernel.emit(EventName::ModuleHeartbeat, payload, reply);
            rx.recv().await.map(|_| ()).map_err(|e| PluginError::new(e.to_string()))
        }
    }

    fn catalog(entries: &[(&str, fn() -> Arc<dyn Plugin>)]) -> Arc<StaticPluginLoader> {
        let catalog = StaticPluginLoader::new();
        for (name, factory) in entries {
            catalog.register(*name, *factory);
        }
        Arc::new(catalog)
    }

    fn healthy() -> Arc<dyn Plugin> {
        Arc::new(Healthy)
    }

    fn silent() -> Arc<dyn Plugin> {
        Arc::new(Silent)
    }

    fn entry(bus: &Bus, module_name: &str) -> ModuleRegistryEntry {
        bus.registry
            .select(&RegistryFilter::ByName(module_name.to_string()))
            .unwrap()
            .pop()
            .unwrap()
    }

    // =========================================================================
    // FLOWS
    // =========================================================================

    #[tokio::test]
    async fn test_gallery_goes_live_and_answers_core_modules() {
        let bus = Bus::new();
        let plugins = tempfile::tempdir().unwrap();
        plugin_folder(plugins.path(), GALLERY_MODULE);

        let catalog = StaticPluginLoader::new();
        catalog.register(GALLERY_MODULE, || Arc::new(GalleryPlugin) as Arc<dyn Plugin>);
        let loader = bus.loader(plugins.path(), Arc::new(catalog));

        let (discovery, report) = loader.run().await.unwrap();
        assert_eq!(discovery.registered, vec![GALLERY_MODULE]);
        assert_eq!(report.live(), vec![GALLERY_MODULE]);

        let token = bus.module_token("auth", TrustLevel::High);
        let payload = Payload::from_module("auth", ModuleType::Core).with_token(token);
        let (forwarded, result) = bus.call(EventName::custom("gallery.listAlbums"), payload).await;
        assert!(forwarded);
        assert_eq!(result, Ok(json!([])));
        assert!(entry(&bus, GALLERY_MODULE).last_error.is_none());
    }

    #[tokio::test]
    async fn test_silent_plugin_never_registers_live() {
        let bus = Bus::new();
        let plugins = tempfile::tempdir().unwrap();
        plugin_folder(plugins.path(), "quiet");
        let mut module_load = bus.feed.subscribe(NotificationFilter::types(vec![NotificationType::ModuleLoad]));

        let loader = bus.loader(plugins.path(), catalog(&[("quiet", silent)]));
        let (_, report) = loader.run().await.unwrap();

        assert!(matches!(report.outcome("quiet"), Some(LoadOutcome::Failed(_))));
        let stored = entry(&bus, "quiet");
        assert!(!stored.is_active);
        assert!(stored.last_error.as_deref().is_some_and(|e| !e.is_empty()));
        assert_eq!(bus.kernel.listener_count(&EventName::custom("quiet.status")), 0);

        let sent = module_load.drain();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].module_name, "quiet");
    }

    #[tokio::test]
    async fn test_core_impostor_fails_health_check() {
        let bus = Bus::new();
        let plugins = tempfile::tempdir().unwrap();
        plugin_folder(plugins.path(), "impostor");

        let loader = bus.loader(plugins.path(), catalog(&[("impostor", || Arc::new(PosesAsCore) as Arc<dyn Plugin>)]));
        let (_, report) = loader.run().await.unwrap();

        let Some(LoadOutcome::Failed(error)) = report.outcome("impostor") else {
            panic!("expected a failure, got {:?}", report.outcome("impostor"));
        };
        assert!(error.contains("moduleType"), "unexpected error: {error}");
        assert!(!bus.kernel.is_melted("impostor"));
    }

    #[tokio::test]
    async fn test_fixed_plugin_returns_on_next_run() {
        let bus = Bus::new();
        let plugins = tempfile::tempdir().unwrap();
        plugin_folder(plugins.path(), "calendar");

        let catalog = catalog(&[("calendar", silent)]);
        let loader = bus.loader(plugins.path(), catalog.clone());
        let (_, first) = loader.run().await.unwrap();
        assert_eq!(first.failed(), vec!["calendar"]);

        // Plugin updated on disk; the retry pass picks it up unaided.
        catalog.register("calendar", healthy);
        let (_, second) = loader.run().await.unwrap();
        assert_eq!(second.reactivated(), vec!["calendar"]);
        assert_eq!(
            second.outcomes,
            vec![("calendar".to_string(), LoadPass::Retry, LoadOutcome::Reactivated)]
        );

        let stored = entry(&bus, "calendar");
        assert!(stored.is_active);
        assert!(stored.last_error.is_none());
        assert_eq!(bus.kernel.listener_count(&EventName::custom("calendar.status")), 1);
    }

    #[tokio::test]
    async fn test_skip_jwt_abuse_needs_explicit_reactivation() {
        let bus = Bus::new();
        let plugins = tempfile::tempdir().unwrap();
        plugin_folder(plugins.path(), "sneaky");

        let catalog = catalog(&[("sneaky", || Arc::new(SkipsJwt) as Arc<dyn Plugin>)]);
        let loader = bus.loader(plugins.path(), catalog.clone());
        let (_, first) = loader.run().await.unwrap();

        assert_eq!(first.failed(), vec!["sneaky"]);
        assert_eq!(
            bus.kernel.meltdown_reason("sneaky"),
            Some(MeltdownReason::UnauthorizedSkipJwt)
        );
        let stored = entry(&bus, "sneaky");
        let last_error = stored.last_error.unwrap();
        assert!(is_meltdown_error(&last_error));
        assert!(last_error.contains("unauthorized skipJWT usage"));

        // Even a fixed build is not retried automatically.
        catalog.register("sneaky", healthy);
        let (_, second) = loader.run().await.unwrap();
        assert_eq!(second.outcome("sneaky"), Some(&LoadOutcome::Skipped(SkipReason::Meltdown)));
        assert!(!entry(&bus, "sneaky").is_active);

        // Reactivation flips the registry; the breaker holds until restart.
        let reactivated = loader.reactivate("sneaky").await.unwrap();
        assert!(reactivated.is_active);
        assert!(reactivated.last_error.is_none());
        let (_, third) = loader.run().await.unwrap();
        assert_eq!(third.outcome("sneaky"), Some(&LoadOutcome::Skipped(SkipReason::Meltdown)));
        assert!(entry(&bus, "sneaky").is_active);
        assert!(bus.kernel.listeners_for_module("sneaky").is_empty());
    }

    #[tokio::test]
    async fn test_healthy_neighbour_unaffected_by_failure() {
        let bus = Bus::new();
        let plugins = tempfile::tempdir().unwrap();
        plugin_folder(plugins.path(), "alpha");
        plugin_folder(plugins.path(), "beta");

        let loader = bus.loader(plugins.path(), catalog(&[("alpha", silent), ("beta", healthy)]));
        let (discovery, report) = loader.run().await.unwrap();

        assert_eq!(discovery.discovered, vec!["alpha", "beta"]);
        assert_eq!(report.failed(), vec!["alpha"]);
        assert_eq!(report.live(), vec!["beta"]);

        let token = bus.module_token("auth", TrustLevel::High);
        let payload = Payload::from_module("auth", ModuleType::Core).with_token(token);
        let (_, result) = bus.call(EventName::custom("beta.status"), payload).await;
        assert_eq!(result, Ok(json!("up")));
    }

    #[tokio::test]
    async fn test_folder_named_after_registry_cannot_take_it_down() {
        let bus = Bus::new();
        let plugins = tempfile::tempdir().unwrap();
        plugin_folder(plugins.path(), REGISTRY_MODULE);
        plugin_folder(plugins.path(), "beta");

        let loader = bus.loader(plugins.path(), catalog(&[("beta", healthy)]));
        for _ in 0..2 {
            let (discovery, report) = loader.run().await.unwrap();
            assert_eq!(discovery.discovered, vec!["beta"]);
            assert_eq!(discovery.invalid.len(), 1);
            assert_eq!(report.live(), vec!["beta"]);
            assert_eq!(bus.kernel.listeners_for_module(REGISTRY_MODULE).len(), 4);
        }

        let token = bus.module_token("auth", TrustLevel::High);
        let payload = Payload::from_module("auth", ModuleType::Core)
            .with_token(token)
            .with_request(&RegistrySelectRequest {
                filter: RegistryFilter::ByName("beta".into()),
            })
            .unwrap();
        let (forwarded, result) = bus.call(EventName::RegistrySelect, payload).await;
        assert!(forwarded);
        assert!(result.is_ok(), "registry unavailable: {result:?}");
    }
}
