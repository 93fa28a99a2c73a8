use thiserror::Error;

/// Errors raised by a key-value store backend.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The backend rejected or failed the command
    #[error("Store command failed: {0}")]
    CommandError(String),

    /// The connection to the backend could not be established
    #[error("Store connection failed: {0}")]
    ConnectionError(String),

    /// The value at a key did not have the expected shape
    #[error("Unexpected value at key '{key}': {message}")]
    WrongType { key: String, message: String },
}

impl From<redis::RedisError> for StoreError {
    fn from(err: redis::RedisError) -> Self {
        if err.is_connection_refusal() || err.is_io_error() {
            StoreError::ConnectionError(err.to_string())
        } else {
            StoreError::CommandError(err.to_string())
        }
    }
}
