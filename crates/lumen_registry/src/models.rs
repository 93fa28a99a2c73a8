use serde::{Deserialize, Serialize};

/// Size in bytes of the random portion of a user device token.
pub const TOKEN_SIZE: usize = 20;

/// Minimum length of a device name in a registration request.
pub const MIN_DEVICE_NAME_LEN: usize = 4;

/// Minimum length of a token name.
pub const MIN_TOKEN_NAME_LEN: usize = 5;

/// Minimum decoded length of a device shared secret.
pub const MIN_SHARED_SECRET_LEN: usize = 20;

/// Upper bound on retained feedback entries per device.
pub const MAX_FEEDBACK_ENTRIES: usize = 50;

/// Token permission bits.
///
/// Masks are persisted as base-2 ASCII (`format!("{:b}")`) so an operator
/// inspecting the store reads the bits directly; parsing round-trips the
/// mask exactly.
pub mod permission {
    /// Read device state.
    pub const VIEWER: u32 = 1 << 0;

    /// Control lights.
    pub const CONTROLLER: u32 = 1 << 1;

    /// Control lights and manage tokens.
    pub const ADMIN: u32 = 1 << 2;

    /// Every permission bit.
    pub const ALL: u32 = VIEWER | CONTROLLER | ADMIN;

    /// Render a mask in its stored base-2 form.
    pub fn to_mask_string(permission: u32) -> String {
        format!("{:b}", permission)
    }

    /// Parse a stored base-2 mask.
    pub fn from_mask_string(mask: &str) -> Option<u32> {
        u32::from_str_radix(mask, 2).ok()
    }

    /// Strict subset check: every requested bit must be present.
    pub fn satisfies(granted: u32, required: u32) -> bool {
        granted & required == required
    }
}

/// A pending registration awaiting the device's socket handshake.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationRequest {
    pub name: String,
    /// Hex-encoded SPKI RSA public key the device will present on handshake.
    pub shared_secret: String,
}

/// The durable record of an active device.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationDetails {
    pub device_id: String,
    pub name: String,
    pub shared_secret: String,
}

/// An issued credential scoped to one device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenDetails {
    pub token_id: String,
    pub device_id: String,
    /// The raw hex token handed to the caller; also the storage key.
    pub token: String,
    pub name: String,
    pub permission: u32,
}

#[cfg(test)]
mod tests {
    use super::permission;

    #[test]
    fn mask_string_roundtrips() {
        for value in [0b001u32, 0b010, 0b100, 0b111, 0b1100] {
            let text = permission::to_mask_string(value);
            assert_eq!(permission::from_mask_string(&text), Some(value));
        }
        assert_eq!(permission::to_mask_string(permission::ALL), "111");
        assert_eq!(permission::from_mask_string("not-binary"), None);
    }

    #[test]
    fn satisfies_requires_every_bit() {
        assert!(permission::satisfies(permission::ALL, permission::ADMIN));
        assert!(permission::satisfies(0b1100, 0b100));
        assert!(!permission::satisfies(0b100, 0b011));
        assert!(!permission::satisfies(
            permission::VIEWER,
            permission::VIEWER | permission::CONTROLLER
        ));
    }
}
