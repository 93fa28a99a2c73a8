use thiserror::Error;

/// The error surface of the HTTP boundary.
///
/// Domain crates keep their own error enums; handlers convert them into this
/// one so every route renders failures the same way. The HTTP rendering
/// itself lives in [`crate::http`].
#[derive(Error, Debug)]
pub enum LumenError {
    /// Request was well-formed but violates a business rule
    #[error("{0}")]
    LogicError(String),

    /// Error occurred while parsing data
    #[error("Failed to parse data: {0}")]
    ParseError(String),

    /// Error occurred due to missing or invalid configuration
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Error occurred during authentication or authorization
    #[error("Authentication error: {0}")]
    AuthError(String),

    /// Error occurred during validation
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Error occurred talking to the key-value store
    #[error("Store error: {0}")]
    StoreError(String),

    /// Error occurred due to a resource not being found
    #[error("Not found: {0}")]
    NotFoundError(String),

    /// Error occurred due to an internal error
    #[error("Internal error: {0}")]
    InternalError(String),
}
