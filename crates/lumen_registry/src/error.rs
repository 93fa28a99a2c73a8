use lumen_store::StoreError;
use thiserror::Error;

/// Errors raised by registry operations.
///
/// `NotFound` is kept distinct from the infrastructure variants so the HTTP
/// boundary can render it as a 404 instead of a 500.
#[derive(Error, Debug)]
pub enum RegistryError {
    /// No device, token, or pending registration matched the query
    #[error("not-found")]
    NotFound,

    /// A registration request failed the minimum name/secret requirements
    #[error("invalid-registration")]
    InvalidRegistration,

    /// A stored registration request row is missing required fields
    #[error("invalid-request")]
    InvalidRequest,

    /// A stored device row is missing required fields
    #[error("invalid-device")]
    InvalidDevice,

    /// The store returned data the registry could not interpret
    #[error("bad store response: {0}")]
    BadStoreResponse(String),

    /// A stored interchange message failed to unmarshal
    #[error("bad interchange data: {0}")]
    BadInterchangeData(String),

    /// A feedback message arrived without its authentication block
    #[error("invalid feedback authentication")]
    BadInterchangeAuthentication,

    /// The store itself failed
    #[error(transparent)]
    Store(#[from] StoreError),
}
