// --- File: crates/lumen_config/src/models.rs ---

use serde::{Deserialize, Serialize};

// --- General Server Config ---
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

// --- Key-value store config ---
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct StoreConfig {
    pub url: String, // e.g. redis://127.0.0.1/ — loaded via LUMEN__STORE__URL
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1/".to_string(),
        }
    }
}

// --- Server signing key config ---
// When `key_path` is unset, the server generates an ephemeral key at startup.
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct SignerConfig {
    pub key_path: Option<String>, // PKCS#8 PEM file with the RSA private key
}

// --- Logging config ---
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct LoggingConfig {
    /// Directory for the daily-rolling log file. Console-only when unset.
    pub directory: Option<String>,
}

// --- Device stream config ---
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ChannelConfig {
    /// Capacity of the registration/command/feedback streams. Producers block
    /// once the processor falls behind by this many messages.
    pub capacity: usize,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self { capacity: 1 }
    }
}

// --- Unified App Configuration ---
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub signer: SignerConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub channels: ChannelConfig,
}
