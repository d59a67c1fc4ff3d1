//! # CMS Trust Bus Runtime
//!
//! Entry point: configuration, tracing, startup, Ctrl+C shutdown.
//!
//! ## Startup Sequence
//!
//! 1. Load configuration from the environment
//! 2. Check it for production readiness (warn only)
//! 3. Wire the kernel and core modules
//! 4. Bootstrap core tokens, discover and load plugins
//! 5. Run until Ctrl+C

use anyhow::{Context, Result};
use cms_runtime::{bundled_plugins, CmsRuntime, RuntimeConfig};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(true)
        .with_thread_ids(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    // Load configuration
    let config = RuntimeConfig::from_env().context("Failed to load configuration")?;
    if let Err(e) = config.validate_for_production() {
        warn!("{e}");
    }

    // Create and start the runtime
    let runtime = CmsRuntime::new(config, Arc::new(bundled_plugins()))?;
    runtime.start().await?;

    info!("CMS runtime is running. Press Ctrl+C to stop.");
    tokio::signal::ctrl_c().await?;

    runtime.shutdown().await;
    Ok(())
}
