//! Storage layout: key builders and hash field names.
//!
//! Every registry key lives under one of these prefixes so a whole category
//! can be scanned or cleaned with a single pattern.

/// Hash per active device: `device-registry:{id}`.
pub const DEVICE_REGISTRY_KEY: &str = "device-registry";

/// List of all active device ids.
pub const DEVICE_INDEX_KEY: &str = "device-index";

/// Bounded feedback list per device: `device-feedback:{id}`.
pub const DEVICE_FEEDBACK_KEY: &str = "device-feedback";

/// Hash per pending registration: `registration-request:{uuid}`.
pub const REGISTRATION_REQUEST_KEY: &str = "registration-request";

/// Hash per issued token, keyed by the raw token: `device-token:{raw}`.
pub const DEVICE_TOKEN_KEY: &str = "device-token";

/// List of raw tokens per device: `device-token-list:{id}`.
pub const DEVICE_TOKEN_LIST_KEY: &str = "device-token-list";

pub const DEVICE_ID_FIELD: &str = "device:uuid";
pub const DEVICE_NAME_FIELD: &str = "device:name";
pub const DEVICE_SECRET_FIELD: &str = "device:secret";

pub const REGISTRATION_NAME_FIELD: &str = "registration:name";
pub const REGISTRATION_SECRET_FIELD: &str = "registration:secret";

pub const TOKEN_ID_FIELD: &str = "token:id";
pub const TOKEN_NAME_FIELD: &str = "token:name";
pub const TOKEN_DEVICE_FIELD: &str = "token:device";
pub const TOKEN_PERMISSION_FIELD: &str = "token:permission";

pub fn device_key(id: &str) -> String {
    format!("{}:{}", DEVICE_REGISTRY_KEY, id)
}

pub fn device_pattern() -> String {
    format!("{}:*", DEVICE_REGISTRY_KEY)
}

pub fn feedback_key(id: &str) -> String {
    format!("{}:{}", DEVICE_FEEDBACK_KEY, id)
}

pub fn allocation_key(id: &str) -> String {
    format!("{}:{}", REGISTRATION_REQUEST_KEY, id)
}

pub fn allocation_pattern() -> String {
    format!("{}:*", REGISTRATION_REQUEST_KEY)
}

pub fn token_key(raw: &str) -> String {
    format!("{}:{}", DEVICE_TOKEN_KEY, raw)
}

pub fn token_list_key(id: &str) -> String {
    format!("{}:{}", DEVICE_TOKEN_LIST_KEY, id)
}
