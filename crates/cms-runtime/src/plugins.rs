//! # Bundled Plugins
//!
//! Community plugins compiled into this binary. Their folders (manifest and
//! assets) still live under the plugins directory and are discovered like
//! any other.

use async_trait::async_trait;
use cms_03_module_loader::{InitContext, Plugin, PluginError, StaticPluginLoader};
use serde_json::{json, Value};
use shared_bus::{EventName, Reply};
use shared_types::{ModuleType, Payload};
use std::sync::Arc;
use tracing::debug;

pub const GALLERY_MODULE: &str = "gallery";

/// Album list file inside the gallery folder.
pub const GALLERY_ALBUMS_FILE: &str = "albums.json";

/// Serves the album list shipped in its folder on `gallery.listAlbums`.
#[derive(Debug, Default)]
pub struct GalleryPlugin;

#[async_trait]
impl Plugin for GalleryPlugin {
    async fn initialize(&self, ctx: InitContext) -> Result<(), PluginError> {
        let albums: Value = if ctx.sandbox.exists(GALLERY_ALBUMS_FILE) {
            let raw = ctx
                .sandbox
                .read_to_string(GALLERY_ALBUMS_FILE)
                .map_err(|e| PluginError::new(e.to_string()))?;
            serde_json::from_str(&raw).map_err(|e| PluginError::new(format!("bad {GALLERY_ALBUMS_FILE}: {e}")))?
        } else {
            json!([])
        };

        ctx.kernel.on(
            EventName::custom("gallery.listAlbums"),
            &ctx.module_name,
            ModuleType::Community,
            Arc::new(move |_: Payload, reply: Reply| {
                reply.ok(albums.clone());
            }),
        );

        let mut payload = Payload::from_module(ctx.module_name.clone(), ModuleType::Community);
        if let Some(jwt) = &ctx.jwt {
            payload = payload.with_token(jwt.clone());
        }
        let (reply, receiver) = Reply::channel();
        ctx.kernel.emit(EventName::ModuleHeartbeat, payload, reply);
        receiver
            .recv()
            .await
            .map_err(|e| PluginError::new(format!("heartbeat failed: {e}")))?;

        debug!(module = %ctx.module_name, "Gallery initialized");
        Ok(())
    }
}

/// Catalog of every bundled plugin.
pub fn bundled_plugins() -> StaticPluginLoader {
    let catalog = StaticPluginLoader::new();
    catalog.register(GALLERY_MODULE, || Arc::new(GalleryPlugin) as Arc<dyn Plugin>);
    catalog
}
