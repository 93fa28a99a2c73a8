// --- File: crates/lumen_api/src/logic.rs ---
//! Pure request logic: color parsing, permission defaulting, and shared
//! secret validation. Kept free of axum types so the tests stay plain.

use rand::Rng;
use rsa::pkcs8::DecodePublicKey;
use rsa::RsaPublicKey;

use lumen_interchange::{
    ControlFrame, ControlMessage, DeviceMessage, DeviceMessageKind, InterchangeError,
    MessageAuthentication,
};
use lumen_registry::{permission, MIN_SHARED_SECRET_LEN};

/// Parse a color shorthand into one control frame.
///
/// Accepted values mirror the route contract: `red`, `green`, `blue`, `off`,
/// `rand`, or six lowercase hex digits. Anything else is rejected.
pub fn parse_color(color: &str) -> Option<ControlFrame> {
    match color {
        "red" => Some(ControlFrame {
            red: 255,
            ..ControlFrame::default()
        }),
        "green" => Some(ControlFrame {
            green: 255,
            ..ControlFrame::default()
        }),
        "blue" => Some(ControlFrame {
            blue: 255,
            ..ControlFrame::default()
        }),
        "off" => Some(ControlFrame::default()),
        "rand" => {
            let mut rng = rand::thread_rng();
            Some(ControlFrame {
                red: rng.gen_range(0..=255),
                green: rng.gen_range(0..=255),
                blue: rng.gen_range(0..=255),
            })
        }
        hex => parse_hex_color(hex),
    }
}

fn parse_hex_color(color: &str) -> Option<ControlFrame> {
    if color.len() != 6 || !color.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
    {
        return None;
    }

    let channel = |range: std::ops::Range<usize>| u32::from_str_radix(&color[range], 16).ok();

    Some(ControlFrame {
        red: channel(0..2)?,
        green: channel(2..4)?,
        blue: channel(4..6)?,
    })
}

/// Default a requested permission mask: a request carrying no known bits
/// becomes a viewer token; anything else passes through untouched.
pub fn normalize_permission(requested: u32) -> u32 {
    if requested & permission::ALL == 0 {
        permission::VIEWER
    } else {
        requested
    }
}

/// Validate a preregistration shared secret: hex, long enough, and an RSA
/// public key in SPKI form. The error strings double as the logic-error
/// codes the handler returns.
pub fn validate_shared_secret(secret: &str) -> Result<(), &'static str> {
    let bytes = hex::decode(secret).map_err(|_| "invalid-key")?;

    if bytes.len() < MIN_SHARED_SECRET_LEN {
        return Err("invalid-key");
    }

    RsaPublicKey::from_public_key_der(&bytes).map_err(|_| "bad-key-format")?;
    Ok(())
}

/// Marshal a one-frame control command addressed to `device_id`, ready for
/// the command stream. The digest is left empty; the connection signs at
/// send time.
pub fn build_control_command(
    device_id: &str,
    frame: ControlFrame,
) -> Result<Vec<u8>, InterchangeError> {
    let payload = lumen_interchange::encode(&ControlMessage {
        frames: vec![frame],
    })?;

    lumen_interchange::encode(&DeviceMessage {
        kind: DeviceMessageKind::Control,
        authentication: Some(MessageAuthentication {
            device_id: device_id.to_string(),
            message_digest: String::new(),
        }),
        payload,
    })
}
