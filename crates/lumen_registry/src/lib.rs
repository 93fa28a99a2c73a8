//! Durable device state for lumen.
//!
//! [`DeviceRegistry`] holds everything the control plane knows about a fleet:
//! pending registrations, active devices, issued tokens and their permission
//! masks, and the bounded per-device feedback archive. It is written against
//! the [`lumen_store::KeyValueStore`] trait so the HTTP surface and the
//! device control processor can share one registry over one store.

pub mod error;
pub mod keys;
pub mod models;
pub mod registry;
pub mod token;

pub use error::RegistryError;
pub use models::{
    permission, RegistrationDetails, RegistrationRequest, TokenDetails, MAX_FEEDBACK_ENTRIES,
    MIN_DEVICE_NAME_LEN, MIN_SHARED_SECRET_LEN, MIN_TOKEN_NAME_LEN, TOKEN_SIZE,
};
pub use registry::{DeviceIndex, DeviceRegistry};
pub use token::{RandomTokenGenerator, TokenGenerator};
