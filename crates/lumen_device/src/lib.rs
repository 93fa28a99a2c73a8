//! Device-facing plumbing: signing, connections, and the control processor.
//!
//! The processor in [`control`] is the heart of the server — a single
//! cooperative task that owns every open device connection and multiplexes
//! registrations, outbound commands, and inbound feedback against the pool.
//! Everything else in this crate exists to give it clean seams:
//! [`connection`] abstracts a framed socket plus per-message signing, and
//! [`signer`] holds the server key material.

pub mod connection;
pub mod control;
pub mod error;
pub mod signer;

pub use connection::{Connection, MessageStream, SocketConnection};
pub use control::{
    device_channels, DeviceChannels, DeviceControlProcessor, DeviceStreams, KillSignal,
    KillSwitch, MessageReader,
};
pub use error::DeviceError;
pub use signer::{parse_device_key, KeySigner, Signer};
