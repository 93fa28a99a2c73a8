use thiserror::Error;

/// Errors raised by device connections and the signing layer.
#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("Signing failed: {0}")]
    SigningFailed(String),

    #[error("Invalid device key: {0}")]
    InvalidKey(String),

    #[error("Socket error: {0}")]
    SocketError(String),

    #[error("Connection is closed")]
    Closed,

    #[error(transparent)]
    Interchange(#[from] lumen_interchange::InterchangeError),
}
