//! Per-device framed connections.
//!
//! [`SocketConnection`] is the production connection: it wraps whatever
//! framed transport the HTTP layer hands it (a [`MessageStream`]), signs each
//! outbound payload, and stamps the digest into the envelope before it hits
//! the wire. The processor only ever sees the [`Connection`] trait, so its
//! tests substitute scripted connections.

use std::future::Future;
use std::sync::Arc;

use sha2::{Digest, Sha256};
use tracing::debug;
use uuid::Uuid;

use lumen_interchange::{DeviceMessage, MessageAuthentication};

use crate::error::DeviceError;
use crate::signer::Signer;

/// A framed bidirectional transport: whole messages in, whole messages out.
pub trait MessageStream: Send {
    fn send_frame(&mut self, frame: Vec<u8>)
        -> impl Future<Output = Result<(), DeviceError>> + Send;

    fn next_frame(&mut self) -> impl Future<Output = Result<Vec<u8>, DeviceError>> + Send;

    fn close(&mut self) -> impl Future<Output = Result<(), DeviceError>> + Send;
}

/// The contract the control processor holds connections through.
///
/// `send` must not be called concurrently on one connection; the processor
/// guarantees this by owning the pool on a single task.
pub trait Connection: Send {
    /// The connection's device id in canonical text form.
    fn id(&self) -> String;

    /// Sign and deliver one message.
    fn send(
        &mut self,
        message: DeviceMessage,
    ) -> impl Future<Output = Result<(), DeviceError>> + Send;

    /// The next frame pushed by the device.
    fn receive(&mut self) -> impl Future<Output = Result<Vec<u8>, DeviceError>> + Send;

    /// Close the underlying socket. Safe to call more than once.
    fn close(&mut self) -> impl Future<Output = Result<(), DeviceError>> + Send;
}

/// A device connection over a framed socket, signing through the server key.
pub struct SocketConnection<S> {
    stream: S,
    signer: Arc<dyn Signer>,
    id: Uuid,
    closed: bool,
}

impl<S> SocketConnection<S> {
    pub fn new(stream: S, signer: Arc<dyn Signer>, id: Uuid) -> Self {
        Self {
            stream,
            signer,
            id,
            closed: false,
        }
    }
}

impl<S: MessageStream> Connection for SocketConnection<S> {
    fn id(&self) -> String {
        self.id.to_string()
    }

    async fn send(&mut self, mut message: DeviceMessage) -> Result<(), DeviceError> {
        let digest = Sha256::digest(&message.payload);
        let signature = self.signer.sign(&digest)?;
        let digest_string = hex::encode(signature);

        debug!(device_id = %self.id, "sending digest string: {}", digest_string);

        match message.authentication.as_mut() {
            Some(authentication) => authentication.message_digest = digest_string,
            None => {
                message.authentication = Some(MessageAuthentication {
                    device_id: self.id.to_string(),
                    message_digest: digest_string,
                })
            }
        }

        let frame = lumen_interchange::encode(&message)?;
        self.stream.send_frame(frame).await
    }

    async fn receive(&mut self) -> Result<Vec<u8>, DeviceError> {
        self.stream.next_frame().await
    }

    async fn close(&mut self) -> Result<(), DeviceError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.stream.close().await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::OnceLock;

    use super::*;
    use crate::signer::{verify_digest, KeySigner};
    use lumen_interchange::DeviceMessageKind;

    // Key generation is expensive, so every test shares one server key.
    fn test_signer() -> Arc<KeySigner> {
        static SIGNER: OnceLock<Arc<KeySigner>> = OnceLock::new();
        SIGNER
            .get_or_init(|| Arc::new(KeySigner::generate().unwrap()))
            .clone()
    }

    /// Scripted stream capturing sent frames.
    #[derive(Default)]
    struct VecStream {
        sent: Vec<Vec<u8>>,
        inbound: Vec<Vec<u8>>,
        closes: usize,
    }

    impl MessageStream for VecStream {
        async fn send_frame(&mut self, frame: Vec<u8>) -> Result<(), DeviceError> {
            self.sent.push(frame);
            Ok(())
        }

        async fn next_frame(&mut self) -> Result<Vec<u8>, DeviceError> {
            match self.inbound.pop() {
                Some(frame) => Ok(frame),
                None => Err(DeviceError::Closed),
            }
        }

        async fn close(&mut self) -> Result<(), DeviceError> {
            self.closes += 1;
            Ok(())
        }
    }

    fn message(payload: &[u8]) -> DeviceMessage {
        DeviceMessage {
            kind: DeviceMessageKind::Control,
            authentication: Some(MessageAuthentication {
                device_id: "addressed-device".into(),
                message_digest: String::new(),
            }),
            payload: payload.to_vec(),
        }
    }

    #[tokio::test]
    async fn send_signs_the_payload_digest() {
        let signer = test_signer();
        let mut connection =
            SocketConnection::new(VecStream::default(), signer.clone(), Uuid::new_v4());

        connection.send(message(b"frame-data")).await.unwrap();

        let frame = &connection.stream.sent[0];
        let sent: DeviceMessage = lumen_interchange::decode(frame).unwrap();
        let authentication = sent.authentication.expect("authentication should be set");

        // The digest is the hex signature over sha256(payload); the addressed
        // device id is left untouched.
        assert_eq!(authentication.device_id, "addressed-device");
        let signature = hex::decode(&authentication.message_digest).unwrap();
        let digest = Sha256::digest(b"frame-data");
        verify_digest(&signer.public_key(), &digest, &signature).unwrap();
    }

    #[tokio::test]
    async fn receive_yields_inbound_frames() {
        let signer: Arc<dyn Signer> = test_signer();
        let mut stream = VecStream::default();
        stream.inbound.push(b"from-device".to_vec());
        let mut connection = SocketConnection::new(stream, signer, Uuid::new_v4());

        assert_eq!(connection.receive().await.unwrap(), b"from-device".to_vec());
        assert!(matches!(
            connection.receive().await,
            Err(DeviceError::Closed)
        ));
    }

    #[tokio::test]
    async fn close_is_idempotent() {
        let signer: Arc<dyn Signer> = test_signer();
        let mut connection =
            SocketConnection::new(VecStream::default(), signer, Uuid::new_v4());

        connection.close().await.unwrap();
        connection.close().await.unwrap();
        assert_eq!(connection.stream.closes, 1);
    }

    #[test]
    fn id_renders_canonical_uuid() {
        let signer: Arc<dyn Signer> = test_signer();
        let id = Uuid::new_v4();
        let connection = SocketConnection::new(VecStream::default(), signer, id);
        assert_eq!(connection.id(), id.to_string());
    }
}
