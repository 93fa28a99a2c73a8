// --- File: crates/services/lumen_backend/src/app_state.rs ---
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::info;

use lumen_api::ApiState;
use lumen_config::AppConfig;
use lumen_device::{device_channels, DeviceControlProcessor, KeySigner, KillSwitch, Signer};
use lumen_registry::{DeviceRegistry, RandomTokenGenerator};
use lumen_store::RedisStore;

/// The processor variant the backend runs: registry over Redis, WebSocket
/// connections.
pub type BackendProcessor = lumen_api::handlers::ApiProcessor<RedisStore>;

/// Shared state handed to the router, plus the processor half the binary
/// spawns. Splitting the two keeps the router side cloneable while the
/// processor stays uniquely owned by its task.
pub struct AppRuntime {
    pub config: Arc<AppConfig>,
    pub api: Arc<ApiState<RedisStore>>,
    pub processor: BackendProcessor,
    pub kill: KillSwitch,
}

impl AppRuntime {
    /// Wire up the store, signer, registry, streams, and processor from
    /// configuration. Any failure here is fatal for the binary.
    pub async fn new(config: Arc<AppConfig>) -> Result<Self, Box<dyn std::error::Error>> {
        let store = RedisStore::connect(&config.store.url).await?;

        let signer: Arc<dyn Signer> = match config.signer.key_path.as_deref() {
            Some(path) => Arc::new(KeySigner::from_pem_file(path)?),
            None => Arc::new(KeySigner::generate()?),
        };

        let registry = Arc::new(DeviceRegistry::new(store, Box::new(RandomTokenGenerator)));

        let (streams, channels) = device_channels(config.channels.capacity);
        let (kill, kill_signal) = mpsc::channel(1);

        let processor = DeviceControlProcessor::new(registry.clone(), channels, kill_signal);
        let api = Arc::new(ApiState::new(registry, streams, signer));

        info!("application state initialized");

        Ok(Self {
            config,
            api,
            processor,
            kill,
        })
    }
}
