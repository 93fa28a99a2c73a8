//! Wire envelopes exchanged with devices.
//!
//! Two encodings exist side by side: the compact binary form used on sockets
//! and the internal streams ([`encode`]/[`decode`]), and a JSON text form
//! used when feedback is archived in the store so operators can read entries
//! straight out of a redis-cli session ([`to_text`]/[`from_text`]).

pub mod envelope;

pub use envelope::{
    decode, encode, from_text, to_text, ControlFrame, ControlMessage, DeviceMessage,
    DeviceMessageKind, FeedbackAuthentication, FeedbackMessage, InterchangeError,
    MessageAuthentication,
};
