//! Configuration loading for the lumen workspace.
//!
//! Configuration is layered: an optional config file (path taken from the
//! `LUMEN_CONFIG` environment variable, default `config/lumen`), then
//! `LUMEN`-prefixed environment variables (`__` separator, e.g.
//! `LUMEN__SERVER__PORT=9000`). Dependent crates only see the deserialized
//! [`AppConfig`] and never touch the environment themselves.

use config::{Config, ConfigError, Environment, File};
use std::env;
use std::sync::Once;

pub mod models;

pub use models::{
    AppConfig, ChannelConfig, LoggingConfig, ServerConfig, SignerConfig, StoreConfig,
};

/// The default prefix for configuration environment variables
pub const DEFAULT_PREFIX: &str = "LUMEN";

/// The separator for configuration environment variables
pub const CONFIG_SEPARATOR: &str = "__";

static DOTENV: Once = Once::new();

/// Loads `.env` once per process so repeated config loads stay idempotent.
pub fn ensure_dotenv_loaded() {
    DOTENV.call_once(|| {
        let _ = dotenvy::dotenv();
    });
}

/// Loads the application configuration from file and environment sources.
pub fn load_config() -> Result<AppConfig, ConfigError> {
    ensure_dotenv_loaded();

    let file = env::var("LUMEN_CONFIG").unwrap_or_else(|_| "config/lumen".to_string());

    Config::builder()
        .add_source(File::with_name(&file).required(false))
        .add_source(Environment::with_prefix(DEFAULT_PREFIX).separator(CONFIG_SEPARATOR))
        .build()?
        .try_deserialize()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_every_section() {
        let config = AppConfig::default();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.store.url, "redis://127.0.0.1/");
        assert!(config.signer.key_path.is_none());
        assert!(config.logging.directory.is_none());
        assert_eq!(config.channels.capacity, 1);
    }

    #[test]
    fn load_config_accepts_missing_file() {
        ensure_dotenv_loaded();
        let loaded = load_config().expect("config should load from defaults");
        assert!(!loaded.server.host.is_empty());
    }
}
