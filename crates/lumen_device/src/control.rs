//! The device control processor.
//!
//! One cooperative task owns the pool of open device connections and
//! multiplexes four inputs against it: newly registered connections,
//! outbound command envelopes, inbound feedback envelopes, and a kill
//! signal. Because every pool mutation and every `send` happens on this one
//! task, no lock protects the pool and no two sends to the same device can
//! ever overlap.
//!
//! The streams are bounded channels; producers block once the processor
//! falls behind, which is the intended backpressure. Closing the command or
//! registration stream tears the processor down the same way the kill signal
//! does: every pooled connection is closed exactly once, then the run future
//! resolves.

use std::collections::HashMap;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::select;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use lumen_interchange::{DeviceMessage, FeedbackMessage};
use lumen_registry::{DeviceIndex, RegistryError};

use crate::connection::Connection;

/// An opaque, fully-buffered message source pushed onto the command or
/// feedback stream.
pub type MessageReader = Box<dyn AsyncRead + Send + Unpin>;

/// Sender used to request processor shutdown. Dropping it has the same
/// effect as firing it.
pub type KillSwitch = mpsc::Sender<()>;

/// Receiving half of the kill switch, owned by the processor.
pub type KillSignal = mpsc::Receiver<()>;

/// Producer handles for the three input streams. Cloned into every HTTP
/// handler that feeds the processor.
pub struct DeviceStreams<C> {
    pub registrations: mpsc::Sender<C>,
    pub commands: mpsc::Sender<MessageReader>,
    pub feedback: mpsc::Sender<MessageReader>,
}

impl<C> Clone for DeviceStreams<C> {
    fn clone(&self) -> Self {
        Self {
            registrations: self.registrations.clone(),
            commands: self.commands.clone(),
            feedback: self.feedback.clone(),
        }
    }
}

/// Consumer halves of the input streams, owned by the processor.
pub struct DeviceChannels<C> {
    pub registrations: mpsc::Receiver<C>,
    pub commands: mpsc::Receiver<MessageReader>,
    pub feedback: mpsc::Receiver<MessageReader>,
}

/// Build the bounded stream pair shared between the HTTP surface and the
/// processor. `capacity` is 1 in the stock configuration.
pub fn device_channels<C>(capacity: usize) -> (DeviceStreams<C>, DeviceChannels<C>) {
    let (registration_tx, registration_rx) = mpsc::channel(capacity);
    let (command_tx, command_rx) = mpsc::channel(capacity);
    let (feedback_tx, feedback_rx) = mpsc::channel(capacity);

    (
        DeviceStreams {
            registrations: registration_tx,
            commands: command_tx,
            feedback: feedback_tx,
        },
        DeviceChannels {
            registrations: registration_rx,
            commands: command_rx,
            feedback: feedback_rx,
        },
    )
}

/// The single-writer event loop at the center of the server.
pub struct DeviceControlProcessor<I, C> {
    index: I,
    channels: DeviceChannels<C>,
    kill: KillSignal,
    pool: HashMap<String, C>,
}

impl<I, C> DeviceControlProcessor<I, C>
where
    I: DeviceIndex,
    C: Connection,
{
    pub fn new(index: I, channels: DeviceChannels<C>, kill: KillSignal) -> Self {
        Self {
            index,
            channels,
            kill,
            pool: HashMap::new(),
        }
    }

    /// Run until killed or until the command or registration stream closes,
    /// then drain the pool. The returned future resolving is the caller's
    /// signal that every pooled connection has been closed.
    pub async fn run(mut self) {
        info!("device control processor started");
        let mut feedback_open = true;

        loop {
            select! {
                registration = self.channels.registrations.recv() => match registration {
                    Some(connection) => self.handle_registration(connection).await,
                    None => {
                        info!("registration stream closed, terminating");
                        break;
                    }
                },
                command = self.channels.commands.recv() => match command {
                    Some(reader) => self.handle_command(reader).await,
                    None => {
                        info!("command stream closed, terminating");
                        break;
                    }
                },
                feedback = self.channels.feedback.recv(), if feedback_open => match feedback {
                    Some(reader) => self.handle_feedback(reader).await,
                    None => {
                        // Feedback drying up is not fatal; commands keep flowing.
                        debug!("feedback stream closed");
                        feedback_open = false;
                    }
                },
                _ = self.kill.recv() => {
                    info!("kill signal received, terminating");
                    break;
                }
            }
        }

        self.drain().await;
    }

    /// Admit a freshly upgraded connection. Connections without a matching
    /// registration are closed and never pooled.
    async fn handle_registration(&mut self, mut connection: C) {
        let id = connection.id();

        match self.index.find_device(&id).await {
            Ok(details) => {
                debug!(device_id = %id, name = %details.name, "pooling device connection");
                self.pool.insert(id, connection);
            }
            Err(error) => {
                warn!(device_id = %id, "rejecting unregistered connection: {}", error);
                if let Err(close_error) = connection.close().await {
                    debug!(device_id = %id, "close after rejection failed: {}", close_error);
                }
            }
        }
    }

    /// Deliver one command envelope to its addressed device. Failures are
    /// logged and isolated: the reader, the envelope, or the send going bad
    /// never disturbs the pool or later commands.
    async fn handle_command(&mut self, mut reader: MessageReader) {
        let mut buffer = Vec::new();

        if let Err(error) = reader.read_to_end(&mut buffer).await {
            warn!("unable to read command payload: {}", error);
            return;
        }

        let message: DeviceMessage = match lumen_interchange::decode(&buffer) {
            Ok(message) => message,
            Err(error) => {
                warn!("unable to decode command payload: {}", error);
                return;
            }
        };

        let device_id = match message.authentication.as_ref() {
            Some(authentication) => authentication.device_id.clone(),
            None => {
                warn!("command payload missing authentication");
                return;
            }
        };

        let Some(connection) = self.pool.get_mut(&device_id) else {
            warn!(device_id = %device_id, "no pooled connection for command");
            return;
        };

        debug!(device_id = %device_id, "dispatching command");

        if let Err(error) = connection.send(message).await {
            // The connection stays pooled until shutdown.
            warn!(device_id = %device_id, "unable to deliver command: {}", error);
        }
    }

    /// Archive one feedback envelope through the registry.
    async fn handle_feedback(&mut self, mut reader: MessageReader) {
        let mut buffer = Vec::new();

        if let Err(error) = reader.read_to_end(&mut buffer).await {
            warn!("unable to read feedback payload: {}", error);
            return;
        }

        let message: FeedbackMessage = match lumen_interchange::decode(&buffer) {
            Ok(message) => message,
            Err(error) => {
                warn!("unable to decode feedback payload: {}", error);
                return;
            }
        };

        if let Err(error) = self.index.log_feedback(&message).await {
            match error {
                RegistryError::NotFound => {
                    warn!("feedback from unknown device dropped");
                }
                other => warn!("unable to log feedback: {}", other),
            }
        }
    }

    /// Close every pooled connection. Runs exactly once, after the loop has
    /// decided to terminate and before the run future resolves.
    async fn drain(&mut self) {
        info!(connections = self.pool.len(), "draining connection pool");

        for (id, mut connection) in self.pool.drain() {
            if let Err(error) = connection.close().await {
                warn!(device_id = %id, "error closing pooled connection: {}", error);
            }
        }
    }
}
