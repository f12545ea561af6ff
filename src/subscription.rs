use crate::config::DeviceId;
use crate::error::{DenonError, Result};
use std::io::ErrorKind;
use tokio::sync::broadcast;

/// Event published by a device connection
#[derive(Debug, Clone)]
pub enum DeviceEvent {
    /// Raw bytes read from the socket, exactly as received
    Data { device_id: DeviceId, bytes: Vec<u8> },

    /// Socket read or write failure
    Error {
        device_id: DeviceId,
        kind: ErrorKind,
        message: String,
    },

    /// Remote end closed the connection
    Closed { device_id: DeviceId },
}

impl DeviceEvent {
    pub fn device_id(&self) -> &str {
        match self {
            DeviceEvent::Data { device_id, .. }
            | DeviceEvent::Error { device_id, .. }
            | DeviceEvent::Closed { device_id } => device_id,
        }
    }
}

/// Receiver for device events
pub struct EventReceiver {
    rx: broadcast::Receiver<DeviceEvent>,
}

impl EventReceiver {
    pub(crate) fn new(rx: broadcast::Receiver<DeviceEvent>) -> Self {
        Self { rx }
    }

    /// Receive the next event
    ///
    /// Fails with `ConnectionClosed` once the driver has been dropped.
    pub async fn recv(&mut self) -> Result<DeviceEvent> {
        self.rx.recv().await.map_err(|e| match e {
            broadcast::error::RecvError::Closed => DenonError::ConnectionClosed,
            broadcast::error::RecvError::Lagged(n) => {
                DenonError::ChannelError(format!("Lagged by {} messages", n))
            }
        })
    }

    /// Receive the next event for one device, skipping everything else
    ///
    /// Lag caused by other devices' traffic skips ahead instead of failing.
    pub async fn recv_for(&mut self, device_id: &str) -> Result<DeviceEvent> {
        loop {
            match self.rx.recv().await {
                Ok(event) if event.device_id() == device_id => return Ok(event),
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!("Event receiver for {} lagged by {} messages", device_id, n);
                }
                Err(broadcast::error::RecvError::Closed) => {
                    return Err(DenonError::ConnectionClosed)
                }
            }
        }
    }

    /// Try to receive an event without blocking
    ///
    /// Returns `None` if no event is available.
    pub fn try_recv(&mut self) -> Result<Option<DeviceEvent>> {
        match self.rx.try_recv() {
            Ok(event) => Ok(Some(event)),
            Err(broadcast::error::TryRecvError::Empty) => Ok(None),
            Err(broadcast::error::TryRecvError::Closed) => Err(DenonError::ConnectionClosed),
            Err(broadcast::error::TryRecvError::Lagged(n)) => {
                Err(DenonError::ChannelError(format!("Lagged by {} messages", n)))
            }
        }
    }
}
