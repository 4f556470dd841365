//! Process configuration.
//!
//! Read from an optional `warden.toml` (or any format the `config` crate
//! recognises under that base name) and then from `WARDEN__*` environment
//! variables, e.g. `WARDEN__DB__URL=db:8000` or
//! `WARDEN__AUTH__SESSION_LIFETIME_SECS=3600`.

use serde::Deserialize;
use warden_auth::AuthConfig;
use warden_db::DbConfig;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub db: DbConfig,
    pub auth: AuthConfig,
    /// Seconds between expired-session sweeps.
    pub sweep_interval_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            db: DbConfig::default(),
            auth: AuthConfig::default(),
            sweep_interval_secs: 300,
        }
    }
}

impl ServerConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::File::with_name("warden").required(false))
            .add_source(config::Environment::with_prefix("WARDEN").separator("__"))
            .build()?
            .try_deserialize()
    }
}
