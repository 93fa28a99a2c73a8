use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum InterchangeError {
    #[error("Failed to encode message: {0}")]
    Encode(String),
    #[error("Failed to decode message: {0}")]
    Decode(String),
}

/// Discriminates outbound device messages. Only control traffic exists
/// today; the tag is carried on the wire so firmware can dispatch without
/// sniffing the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceMessageKind {
    Control,
}

/// Identifies the addressed device and, once signed, carries the payload
/// digest the device verifies against the server's public key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageAuthentication {
    pub device_id: String,
    #[serde(default)]
    pub message_digest: String,
}

/// Server-to-device envelope. The payload is opaque at this layer; the
/// digest over it is filled in by the connection at send time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceMessage {
    pub kind: DeviceMessageKind,
    pub authentication: Option<MessageAuthentication>,
    pub payload: Vec<u8>,
}

/// Device-to-server envelope. The authentication block names the sender;
/// the payload is opaque telemetry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackMessage {
    pub authentication: Option<FeedbackAuthentication>,
    pub payload: Vec<u8>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackAuthentication {
    pub device_id: String,
}

/// One RGB state. Channels are 0-255 semantically; the wider type matches
/// the wire representation the firmware expects.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlFrame {
    pub red: u32,
    pub green: u32,
    pub blue: u32,
}

impl std::fmt::Display for ControlFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "rgb({},{},{})", self.red, self.green, self.blue)
    }
}

/// The control payload: a sequence of frames the device plays in order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlMessage {
    pub frames: Vec<ControlFrame>,
}

/// Binary-encode an envelope for the wire or an internal stream.
pub fn encode<T: Serialize>(message: &T) -> Result<Vec<u8>, InterchangeError> {
    bincode::serialize(message).map_err(|e| InterchangeError::Encode(e.to_string()))
}

/// Decode a binary envelope.
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, InterchangeError> {
    bincode::deserialize(bytes).map_err(|e| InterchangeError::Decode(e.to_string()))
}

/// Text-encode an envelope for human-inspectable storage.
pub fn to_text<T: Serialize>(message: &T) -> Result<String, InterchangeError> {
    serde_json::to_string(message).map_err(|e| InterchangeError::Encode(e.to_string()))
}

/// Decode a text-form envelope back out of storage.
pub fn from_text<T: DeserializeOwned>(text: &str) -> Result<T, InterchangeError> {
    serde_json::from_str(text).map_err(|e| InterchangeError::Decode(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn control_message() -> DeviceMessage {
        let payload = encode(&ControlMessage {
            frames: vec![ControlFrame {
                red: 255,
                green: 0,
                blue: 127,
            }],
        })
        .unwrap();
        DeviceMessage {
            kind: DeviceMessageKind::Control,
            authentication: Some(MessageAuthentication {
                device_id: "9a1f".into(),
                message_digest: String::new(),
            }),
            payload,
        }
    }

    #[test]
    fn binary_envelope_roundtrips_nested_payload() {
        let message = control_message();
        let decoded: DeviceMessage = decode(&encode(&message).unwrap()).unwrap();
        assert_eq!(decoded, message);

        let control: ControlMessage = decode(&decoded.payload).unwrap();
        assert_eq!(control.frames[0].red, 255);
        assert_eq!(control.frames[0].blue, 127);
    }

    #[test]
    fn decode_rejects_truncated_input() {
        let mut bytes = encode(&control_message()).unwrap();
        bytes.truncate(bytes.len() / 2);
        assert!(matches!(
            decode::<DeviceMessage>(&bytes),
            Err(InterchangeError::Decode(_))
        ));
    }

    #[test]
    fn text_form_is_readable_json() {
        let feedback = FeedbackMessage {
            authentication: Some(FeedbackAuthentication {
                device_id: "dev-1".into(),
            }),
            payload: b"ok".to_vec(),
        };
        let text = to_text(&feedback).unwrap();
        assert!(text.contains("dev-1"));

        let parsed: FeedbackMessage = from_text(&text).unwrap();
        assert_eq!(parsed, feedback);
    }

    #[test]
    fn frame_displays_as_rgb_triplet() {
        let frame = ControlFrame {
            red: 1,
            green: 2,
            blue: 3,
        };
        assert_eq!(frame.to_string(), "rgb(1,2,3)");
    }
}
