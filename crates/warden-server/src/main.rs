//! Warden maintenance process.
//!
//! Connects to SurrealDB, brings the schema up to date and periodically
//! deletes expired sessions until interrupted.

mod settings;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use warden_auth::SessionRegistry;
use warden_core::clock::SystemClock;
use warden_db::DbManager;

use crate::settings::ServerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("warden=info".parse()?))
        .json()
        .init();

    let config = ServerConfig::load().context("loading configuration")?;
    info!(sweep_interval_secs = config.sweep_interval_secs, "Starting Warden");

    let db = DbManager::connect(&config.db)
        .await
        .context("opening session store")?;

    let registry = SessionRegistry::new(
        db.sessions(),
        Arc::new(SystemClock),
        config
            .auth
            .session_lifetime()
            .context("invalid session lifetime")?,
    );

    let mut ticker = tokio::time::interval(Duration::from_secs(config.sweep_interval_secs.max(1)));
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Err(e) = registry.sweep_expired().await {
                    error!(error = %e, "Session sweep failed");
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown requested");
                break;
            }
        }
    }

    info!("Warden stopped");
    Ok(())
}
