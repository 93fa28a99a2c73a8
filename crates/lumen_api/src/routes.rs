// --- File: crates/lumen_api/src/routes.rs ---

use crate::handlers::{
    create_token_handler, list_devices_handler, list_feedback_handler, post_feedback_handler,
    preregister_handler, register_device_handler, remove_device_handler, system_handler,
    update_shorthand_handler, ApiState,
};
use axum::{
    routing::{delete, get, post},
    Router,
};
use lumen_store::KeyValueStore;
use std::sync::Arc;

/// Creates a router containing every route of the control plane.
pub fn routes<S: KeyValueStore + 'static>(state: Arc<ApiState<S>>) -> Router {
    Router::new()
        .route("/register", post(register_device_handler::<S>))
        .route("/devices", get(list_devices_handler::<S>))
        .route("/devices/preregister", post(preregister_handler::<S>))
        .route("/devices/:id", delete(remove_device_handler::<S>))
        .route("/devices/:id/:color", get(update_shorthand_handler::<S>))
        .route("/device-tokens", post(create_token_handler::<S>))
        .route(
            "/device-feedback",
            get(list_feedback_handler::<S>).post(post_feedback_handler::<S>),
        )
        .route("/system", get(system_handler))
        .with_state(state)
}
