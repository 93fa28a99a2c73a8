//! Adapts an upgraded axum WebSocket to the framed-stream seam the device
//! layer is written against.

use axum::extract::ws::{Message, WebSocket};

use lumen_device::{DeviceError, MessageStream};

/// A device socket as a [`MessageStream`].
pub struct WsMessageStream {
    socket: WebSocket,
}

impl WsMessageStream {
    pub fn new(socket: WebSocket) -> Self {
        Self { socket }
    }
}

impl MessageStream for WsMessageStream {
    async fn send_frame(&mut self, frame: Vec<u8>) -> Result<(), DeviceError> {
        self.socket
            .send(Message::Binary(frame))
            .await
            .map_err(|e| DeviceError::SocketError(e.to_string()))
    }

    async fn next_frame(&mut self) -> Result<Vec<u8>, DeviceError> {
        loop {
            match self.socket.recv().await {
                None => return Err(DeviceError::Closed),
                Some(Err(error)) => return Err(DeviceError::SocketError(error.to_string())),
                Some(Ok(Message::Binary(data))) => return Ok(data),
                Some(Ok(Message::Text(text))) => return Ok(text.into_bytes()),
                Some(Ok(Message::Close(_))) => return Err(DeviceError::Closed),
                // Ping/pong frames are handled by the transport.
                Some(Ok(_)) => continue,
            }
        }
    }

    async fn close(&mut self) -> Result<(), DeviceError> {
        self.socket
            .send(Message::Close(None))
            .await
            .map_err(|e| DeviceError::SocketError(e.to_string()))
    }
}
