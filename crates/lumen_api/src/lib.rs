//! The HTTP surface of the lumen control plane.
//!
//! Translates admin HTTP/JSON calls into registry operations and stream
//! pushes, and upgrades device handshakes into pooled socket connections.
//! Everything stateful lives in [`handlers::ApiState`]; the pure pieces
//! (color parsing, permission defaulting, key validation) live in [`logic`]
//! where they can be tested without a router.

pub mod handlers;
pub mod logic;
pub mod routes;
pub mod ws;

pub use handlers::{ApiState, DeviceConnection};
pub use routes::routes;

/// Header carrying a device's hex-encoded shared secret on handshake.
pub const DEVICE_AUTH_HEADER: &str = "x-device-auth";

/// Header carrying a user token on administrative calls.
pub const USER_TOKEN_HEADER: &str = "x-user-token";
