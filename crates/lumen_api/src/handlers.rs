// --- File: crates/lumen_api/src/handlers.rs ---
use std::io::Cursor;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, Query, State, WebSocketUpgrade},
    http::HeaderMap,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use lumen_common::error::LumenError;
use lumen_device::{
    parse_device_key, DeviceControlProcessor, DeviceStreams, Signer, SocketConnection,
};
use lumen_registry::{permission, DeviceRegistry, RegistryError, TokenDetails};
use lumen_store::KeyValueStore;

use crate::logic;
use crate::ws::WsMessageStream;
use crate::{DEVICE_AUTH_HEADER, USER_TOKEN_HEADER};

/// The connection type produced by the handshake route and pooled by the
/// processor.
pub type DeviceConnection = SocketConnection<WsMessageStream>;

/// Shorthand for the processor this surface feeds.
pub type ApiProcessor<S> = DeviceControlProcessor<Arc<DeviceRegistry<S>>, DeviceConnection>;

/// State shared across all routes.
pub struct ApiState<S: KeyValueStore> {
    pub registry: Arc<DeviceRegistry<S>>,
    pub streams: DeviceStreams<DeviceConnection>,
    pub signer: Arc<dyn Signer>,
}

impl<S: KeyValueStore> ApiState<S> {
    pub fn new(
        registry: Arc<DeviceRegistry<S>>,
        streams: DeviceStreams<DeviceConnection>,
        signer: Arc<dyn Signer>,
    ) -> Self {
        Self {
            registry,
            streams,
            signer,
        }
    }
}

fn registry_error(error: RegistryError) -> LumenError {
    match error {
        RegistryError::NotFound => LumenError::NotFoundError("not-found".into()),
        RegistryError::InvalidRegistration => LumenError::ValidationError("bad-request".into()),
        RegistryError::InvalidRequest | RegistryError::InvalidDevice => {
            LumenError::InternalError(error.to_string())
        }
        RegistryError::BadInterchangeAuthentication | RegistryError::BadInterchangeData(_) => {
            LumenError::ParseError(error.to_string())
        }
        RegistryError::BadStoreResponse(message) => LumenError::StoreError(message),
        RegistryError::Store(store) => LumenError::StoreError(store.to_string()),
    }
}

fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> &'a str {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("")
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
}

impl StatusResponse {
    fn ok() -> Json<Self> {
        Json(Self { status: "ok" })
    }
}

// --- Device handshake ---

/// Upgrade a device socket and hand the connection to the processor.
///
/// The shared secret header is validated before the upgrade; the pending
/// registration is filled after it, and the socket is closed again when no
/// allocation matches.
pub async fn register_device_handler<S: KeyValueStore + 'static>(
    State(state): State<Arc<ApiState<S>>>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> Response {
    let encoded_secret = header_value(&headers, DEVICE_AUTH_HEADER).to_string();

    if let Err(error) = parse_device_key(&encoded_secret) {
        warn!("rejecting handshake with invalid shared secret: {}", error);
        return LumenError::AuthError("invalid-key".into()).into_response();
    }

    ws.on_upgrade(move |socket| async move {
        let device_id = Uuid::new_v4();
        let mut stream = WsMessageStream::new(socket);

        if let Err(error) = state
            .registry
            .fill(&encoded_secret, &device_id.to_string())
            .await
        {
            warn!("unable to fill device registration: {}", error);
            let _ = lumen_device::MessageStream::close(&mut stream).await;
            return;
        }

        info!(device_id = %device_id, "device handshake complete");

        let connection = SocketConnection::new(stream, state.signer.clone(), device_id);

        if state.streams.registrations.send(connection).await.is_err() {
            warn!(device_id = %device_id, "registration stream closed, dropping connection");
        }
    })
}

// --- Preregistration ---

#[derive(Debug, Deserialize)]
pub struct PreregisterRequest {
    pub name: String,
    pub shared_secret: String,
}

/// Submit a new registration request for a device.
pub async fn preregister_handler<S: KeyValueStore>(
    State(state): State<Arc<ApiState<S>>>,
    Json(request): Json<PreregisterRequest>,
) -> Result<Json<StatusResponse>, LumenError> {
    if request.name.len() <= 1 || request.shared_secret.len() <= 1 {
        warn!(name = %request.name, "invalid registration request");
        return Err(LumenError::ValidationError("bad-request".into()));
    }

    let taken = state.registry.find_device(&request.name).await.is_ok()
        || state
            .registry
            .allocation_exists(&request.name)
            .await
            .map_err(registry_error)?;

    if taken {
        warn!(name = %request.name, "duplicate device name registration");
        return Err(LumenError::LogicError("duplicate-name".into()));
    }

    if let Err(code) = logic::validate_shared_secret(&request.shared_secret) {
        warn!(name = %request.name, "rejecting shared secret: {}", code);
        return Err(LumenError::LogicError(code.into()));
    }

    state
        .registry
        .allocate(&lumen_registry::RegistrationRequest {
            name: request.name.clone(),
            shared_secret: request.shared_secret,
        })
        .await
        .map_err(registry_error)?;

    info!(name = %request.name, "successfully preregistered device");
    Ok(StatusResponse::ok())
}

// --- Tokens ---

#[derive(Debug, Deserialize)]
pub struct TokenRequest {
    pub device_id: String,
    pub name: String,
    #[serde(default)]
    pub permission: u32,
}

/// Mint a permission-scoped token. The caller must present a credential
/// carrying the admin bit for the target device.
pub async fn create_token_handler<S: KeyValueStore>(
    State(state): State<Arc<ApiState<S>>>,
    headers: HeaderMap,
    Json(request): Json<TokenRequest>,
) -> Result<Json<TokenDetails>, LumenError> {
    let requested = logic::normalize_permission(request.permission);

    if request.name.len() < lumen_registry::MIN_TOKEN_NAME_LEN {
        return Err(LumenError::ValidationError("invalid-name".into()));
    }

    let registration = state
        .registry
        .find_device(&request.device_id)
        .await
        .map_err(registry_error)?;

    let token = header_value(&headers, USER_TOKEN_HEADER);

    if token.is_empty() {
        warn!(device_id = %registration.device_id, "token creation without credentials");
        return Err(LumenError::AuthError("invalid-token".into()));
    }

    if !state
        .registry
        .authorize_token(&registration.device_id, token, permission::ADMIN)
        .await
    {
        warn!(device_id = %registration.device_id, "unauthorized token creation attempt");
        return Err(LumenError::AuthError("invalid-token".into()));
    }

    let details = state
        .registry
        .allocate_token(&registration.device_id, &request.name, requested)
        .await
        .map_err(registry_error)?;

    Ok(Json(details))
}

// --- Device CRUD ---

/// List every registered device.
pub async fn list_devices_handler<S: KeyValueStore>(
    State(state): State<Arc<ApiState<S>>>,
) -> Result<Json<Vec<lumen_registry::RegistrationDetails>>, LumenError> {
    state
        .registry
        .list_registrations()
        .await
        .map(Json)
        .map_err(registry_error)
}

/// Remove a device and everything attached to it.
pub async fn remove_device_handler<S: KeyValueStore>(
    State(state): State<Arc<ApiState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<StatusResponse>, LumenError> {
    let details = state
        .registry
        .find_device(&id)
        .await
        .map_err(registry_error)?;

    state
        .registry
        .remove_device(&details.device_id)
        .await
        .map_err(registry_error)?;

    Ok(StatusResponse::ok())
}

// --- Color shorthand ---

/// Update a device to a shorthand color by pushing a one-frame control
/// message onto the command stream.
pub async fn update_shorthand_handler<S: KeyValueStore>(
    State(state): State<Arc<ApiState<S>>>,
    Path((device, color)): Path<(String, String)>,
) -> Result<Json<StatusResponse>, LumenError> {
    let details = state
        .registry
        .find_device(&device)
        .await
        .map_err(registry_error)?;

    let Some(frame) = logic::parse_color(&color) else {
        warn!(color = %color, "received unparseable color");
        return Err(LumenError::ValidationError("invalid-color".into()));
    };

    info!(device_id = %details.device_id, %frame, "updating device color");

    let command = logic::build_control_command(&details.device_id, frame)
        .map_err(|error| LumenError::InternalError(error.to_string()))?;

    state
        .streams
        .commands
        .send(Box::new(Cursor::new(command)))
        .await
        .map_err(|_| LumenError::InternalError("command stream closed".into()))?;

    Ok(StatusResponse::ok())
}

// --- Feedback ---

#[derive(Debug, Deserialize)]
pub struct FeedbackQuery {
    pub device_id: String,
    #[serde(default = "default_feedback_count")]
    pub count: usize,
}

fn default_feedback_count() -> usize {
    10
}

/// The latest feedback entries for a device.
pub async fn list_feedback_handler<S: KeyValueStore>(
    State(state): State<Arc<ApiState<S>>>,
    Query(query): Query<FeedbackQuery>,
) -> Result<Json<Vec<lumen_interchange::FeedbackMessage>>, LumenError> {
    state
        .registry
        .list_feedback(&query.device_id, query.count)
        .await
        .map(Json)
        .map_err(registry_error)
}

/// Accept a marshaled feedback envelope and queue it for the processor.
pub async fn post_feedback_handler<S: KeyValueStore>(
    State(state): State<Arc<ApiState<S>>>,
    body: Bytes,
) -> Result<Json<StatusResponse>, LumenError> {
    state
        .streams
        .feedback
        .send(Box::new(Cursor::new(body.to_vec())))
        .await
        .map_err(|_| LumenError::InternalError("feedback stream closed".into()))?;

    Ok(StatusResponse::ok())
}

// --- System ---

#[derive(Debug, Serialize)]
pub struct SystemReport {
    pub name: &'static str,
    pub version: &'static str,
}

/// Build name and version, for smoke checks and dashboards.
pub async fn system_handler() -> Json<SystemReport> {
    Json(SystemReport {
        name: "lumen",
        version: env!("CARGO_PKG_VERSION"),
    })
}
