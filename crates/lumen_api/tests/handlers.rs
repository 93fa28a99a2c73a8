//! Handler-level tests over an in-memory store: no sockets, no router, just
//! the extractor types the handlers actually take.

use std::sync::{Arc, OnceLock};

use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::Json;

use lumen_api::handlers::{
    create_token_handler, list_devices_handler, list_feedback_handler, post_feedback_handler,
    preregister_handler, remove_device_handler, update_shorthand_handler, ApiState,
    FeedbackQuery, PreregisterRequest, TokenRequest,
};
use lumen_api::{DEVICE_AUTH_HEADER, USER_TOKEN_HEADER};
use lumen_device::{device_channels, DeviceChannels, KeySigner};
use lumen_interchange::{ControlMessage, DeviceMessage};
use lumen_registry::{permission, DeviceRegistry, RandomTokenGenerator};
use lumen_store::MemoryStore;
use tokio::io::AsyncReadExt;

type TestState = Arc<ApiState<MemoryStore>>;
type TestChannels = DeviceChannels<lumen_api::DeviceConnection>;

fn shared_signer() -> Arc<KeySigner> {
    static SIGNER: OnceLock<Arc<KeySigner>> = OnceLock::new();
    SIGNER
        .get_or_init(|| Arc::new(KeySigner::generate().unwrap()))
        .clone()
}

/// A hex SPKI secret that passes validation.
fn valid_secret() -> String {
    use rsa::pkcs8::EncodePublicKey;
    let der = shared_signer().public_key().to_public_key_der().unwrap();
    hex::encode(der.as_bytes())
}

fn test_state() -> (TestState, TestChannels) {
    let (streams, channels) = device_channels(8);
    let registry = Arc::new(DeviceRegistry::new(
        MemoryStore::new(),
        Box::new(RandomTokenGenerator),
    ));
    let state = Arc::new(ApiState::new(registry, streams, shared_signer()));
    (state, channels)
}

async fn preregister(state: &TestState, name: &str) -> Result<(), u16> {
    let result = preregister_handler(
        State(state.clone()),
        Json(PreregisterRequest {
            name: name.to_string(),
            shared_secret: valid_secret(),
        }),
    )
    .await;

    match result {
        Ok(_) => Ok(()),
        Err(error) => Err(error.status().as_u16()),
    }
}

/// Preregister and fill, as the handshake route would.
async fn register_device(state: &TestState, name: &str, device_id: &str) {
    preregister(state, name).await.expect("preregister should pass");
    state
        .registry
        .fill(&valid_secret(), device_id)
        .await
        .expect("fill should pass");
}

fn user_token(value: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(USER_TOKEN_HEADER, value.parse().unwrap());
    headers
}

#[tokio::test]
async fn preregister_rejects_duplicate_names() {
    let (state, _channels) = test_state();

    preregister(&state, "lamp").await.expect("first preregister should pass");

    // Duplicate against the pending allocation.
    assert_eq!(preregister(&state, "lamp").await.unwrap_err(), 422);

    // Duplicate against a filled device as well.
    state.registry.fill(&valid_secret(), "device-1").await.unwrap();
    assert_eq!(preregister(&state, "lamp").await.unwrap_err(), 422);
}

#[tokio::test]
async fn preregister_rejects_bad_secrets() {
    let (state, _channels) = test_state();

    let result = preregister_handler(
        State(state.clone()),
        Json(PreregisterRequest {
            name: "lamp".into(),
            shared_secret: "deadbeef".into(),
        }),
    )
    .await;
    assert_eq!(result.err().unwrap().status().as_u16(), 422);

    let result = preregister_handler(
        State(state),
        Json(PreregisterRequest {
            name: "".into(),
            shared_secret: valid_secret(),
        }),
    )
    .await;
    assert_eq!(result.err().unwrap().status().as_u16(), 400);
}

#[tokio::test]
async fn token_with_no_known_bits_defaults_to_viewer() {
    let (state, _channels) = test_state();
    register_device(&state, "lamp", "device-1").await;

    let result = create_token_handler(
        State(state),
        user_token(&valid_secret()),
        Json(TokenRequest {
            device_id: "device-1".into(),
            name: "viewer-token".into(),
            permission: 0,
        }),
    )
    .await
    .expect("token creation should pass");

    assert_eq!(result.0.permission, permission::VIEWER);
}

#[tokio::test]
async fn token_creation_requires_admin_credentials() {
    let (state, _channels) = test_state();
    register_device(&state, "lamp", "device-1").await;

    // Mint a viewer-only token, then try to use it to mint another.
    let viewer = state
        .registry
        .allocate_token("device-1", "viewer-token", permission::VIEWER)
        .await
        .unwrap();

    let result = create_token_handler(
        State(state.clone()),
        user_token(&viewer.token),
        Json(TokenRequest {
            device_id: "device-1".into(),
            name: "another-token".into(),
            permission: permission::ALL,
        }),
    )
    .await;
    assert_eq!(result.err().unwrap().status().as_u16(), 401);

    // No credential at all.
    let result = create_token_handler(
        State(state),
        HeaderMap::new(),
        Json(TokenRequest {
            device_id: "device-1".into(),
            name: "another-token".into(),
            permission: permission::ALL,
        }),
    )
    .await;
    assert_eq!(result.err().unwrap().status().as_u16(), 401);
}

#[tokio::test]
async fn token_names_have_a_minimum_length() {
    let (state, _channels) = test_state();
    register_device(&state, "lamp", "device-1").await;

    let result = create_token_handler(
        State(state),
        user_token(&valid_secret()),
        Json(TokenRequest {
            device_id: "device-1".into(),
            name: "abcd".into(),
            permission: permission::ALL,
        }),
    )
    .await;
    assert_eq!(result.err().unwrap().status().as_u16(), 400);
}

#[tokio::test]
async fn shorthand_colors_are_queued_for_the_processor() {
    let (state, mut channels) = test_state();
    register_device(&state, "lamp", "device-1").await;

    update_shorthand_handler(
        State(state),
        Path(("lamp".to_string(), "red".to_string())),
    )
    .await
    .expect("shorthand update should pass");

    let mut reader = channels.commands.recv().await.expect("a queued command");
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes).await.unwrap();

    let message: DeviceMessage = lumen_interchange::decode(&bytes).unwrap();
    assert_eq!(message.authentication.unwrap().device_id, "device-1");

    let control: ControlMessage = lumen_interchange::decode(&message.payload).unwrap();
    assert_eq!(control.frames[0].red, 255);
    assert_eq!(control.frames[0].green, 0);
}

#[tokio::test]
async fn shorthand_rejects_unknown_colors_and_devices() {
    let (state, _channels) = test_state();
    register_device(&state, "lamp", "device-1").await;

    let result = update_shorthand_handler(
        State(state.clone()),
        Path(("lamp".to_string(), "purple".to_string())),
    )
    .await;
    assert_eq!(result.err().unwrap().status().as_u16(), 400);

    let result = update_shorthand_handler(
        State(state),
        Path(("missing-device".to_string(), "red".to_string())),
    )
    .await;
    assert_eq!(result.err().unwrap().status().as_u16(), 404);
}

#[tokio::test]
async fn posted_feedback_is_queued_for_the_processor() {
    let (state, mut channels) = test_state();

    let envelope = lumen_interchange::encode(&lumen_interchange::FeedbackMessage {
        authentication: Some(lumen_interchange::FeedbackAuthentication {
            device_id: "device-1".into(),
        }),
        payload: b"telemetry".to_vec(),
    })
    .unwrap();

    post_feedback_handler(State(state), axum::body::Bytes::from(envelope.clone()))
        .await
        .expect("feedback post should pass");

    let mut reader = channels.feedback.recv().await.expect("queued feedback");
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes).await.unwrap();
    assert_eq!(bytes, envelope);
}

#[tokio::test]
async fn feedback_listing_goes_through_the_registry() {
    let (state, _channels) = test_state();
    register_device(&state, "lamp", "device-1").await;

    state
        .registry
        .log_feedback(&lumen_interchange::FeedbackMessage {
            authentication: Some(lumen_interchange::FeedbackAuthentication {
                device_id: "device-1".into(),
            }),
            payload: b"report".to_vec(),
        })
        .await
        .unwrap();

    let listed = list_feedback_handler(
        State(state),
        Query(FeedbackQuery {
            device_id: "lamp".into(),
            count: 10,
        }),
    )
    .await
    .expect("feedback listing should pass");

    assert_eq!(listed.0.len(), 1);
    assert_eq!(listed.0[0].payload, b"report".to_vec());
}

#[tokio::test]
async fn devices_can_be_listed_and_removed() {
    let (state, _channels) = test_state();
    register_device(&state, "lamp", "device-1").await;

    let listed = list_devices_handler(State(state.clone())).await.unwrap();
    assert_eq!(listed.0.len(), 1);
    assert_eq!(listed.0[0].name, "lamp");

    remove_device_handler(State(state.clone()), Path("lamp".to_string()))
        .await
        .expect("removal should pass");

    let listed = list_devices_handler(State(state.clone())).await.unwrap();
    assert!(listed.0.is_empty());

    let result = remove_device_handler(State(state), Path("lamp".to_string())).await;
    assert_eq!(result.err().unwrap().status().as_u16(), 404);
}
