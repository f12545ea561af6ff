use crate::command::{Action, LIST};
use crate::config::{DeviceConfig, DriverConfig};
use crate::connection::ConnectionManager;
use crate::error::Result;
use crate::poll;
use crate::state::{DeviceState, MemoryStateStore, StateStore};
use crate::subscription::EventReceiver;
use std::sync::Arc;

/// Result of a successfully dispatched command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Wire code was written to the receiver
    Sent,
    /// Aggregate poll finished with this snapshot
    Polled(DeviceState),
    /// Command name not in the table; nothing was transmitted
    Unresolved(String),
}

impl Outcome {
    /// Status string reported to the host
    pub fn status(&self) -> &'static str {
        "ok"
    }

    /// Snapshot carried by a poll, if any
    pub fn state(&self) -> Option<&DeviceState> {
        match self {
            Outcome::Polled(state) => Some(state),
            _ => None,
        }
    }
}

/// Driver for Denon receivers
///
/// Translates symbolic commands into the receiver's telnet protocol and
/// assembles status replies into a [`DeviceState`]. One driver can serve any
/// number of receivers; each gets its own persistent connection.
///
/// # Example
///
/// ```no_run
/// use denon_avr::{DenonDriver, DeviceConfig, DriverConfig};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let driver = DenonDriver::with_memory_store(DriverConfig::default());
///     let receiver = DeviceConfig::new("living-room", "192.168.1.20");
///
///     driver.execute("POWERON", &receiver).await?;
///     let state = driver.state(&receiver).await?;
///     println!("Volume: {:?}", state.zone1.volume);
///     Ok(())
/// }
/// ```
pub struct DenonDriver {
    config: DriverConfig,
    connections: ConnectionManager,
    store: Arc<dyn StateStore>,
}

impl DenonDriver {
    pub fn new(config: DriverConfig, store: Arc<dyn StateStore>) -> Self {
        Self {
            config,
            connections: ConnectionManager::new(),
            store,
        }
    }

    /// Driver backed by an in-process state store
    pub fn with_memory_store(config: DriverConfig) -> Self {
        Self::new(config, Arc::new(MemoryStateStore::new()))
    }

    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    /// State store shared with the host
    pub fn store(&self) -> Arc<dyn StateStore> {
        self.store.clone()
    }

    /// Seed device state at startup by running one aggregate poll
    pub async fn init(&self, device: &DeviceConfig) -> Result<Outcome> {
        tracing::info!("Initializing {}", device.device_id);
        self.execute(LIST, device).await
    }

    /// Dispatch a symbolic command
    ///
    /// `list` and `state` run the aggregate poll. Any other known name is
    /// written once with no status polling. Unknown names transmit nothing
    /// and still succeed, as [`Outcome::Unresolved`].
    pub async fn execute(&self, command: &str, device: &DeviceConfig) -> Result<Outcome> {
        match Action::from_name(command) {
            Action::Send(cmd) => {
                self.connections
                    .transmit(device, cmd.wire_code(), None)
                    .await?;
                tracing::debug!("Sent {} to {}", cmd, device.device_id);
                Ok(Outcome::Sent)
            }
            Action::Poll => Ok(Outcome::Polled(self.state(device).await?)),
            Action::Unresolved(name) => {
                tracing::warn!(
                    "Ignoring unknown command {:?} for {}",
                    name,
                    device.device_id
                );
                Ok(Outcome::Unresolved(name))
            }
        }
    }

    /// Poll the receiver and return its refreshed state
    ///
    /// Starts from the stored state (or an empty one), and stores the result
    /// on success.
    pub async fn state(&self, device: &DeviceConfig) -> Result<DeviceState> {
        let initial = self.store.get(&device.device_id).unwrap_or_default();
        let reply_timeout = device.timeout(&self.config);

        let state = poll::run(&self.connections, device, initial, reply_timeout).await?;

        self.store.set(&device.device_id, state.clone());
        tracing::info!("Polled {}: {}", device.device_id, state.to_json());
        Ok(state)
    }

    /// Subscribe to raw data, socket errors and disconnects of all receivers
    pub fn subscribe_events(&self) -> EventReceiver {
        self.connections.subscribe()
    }

    /// Whether a receiver currently has an open connection
    pub fn is_connected(&self, device_id: &str) -> bool {
        self.connections.is_connected(device_id)
    }

    /// Close a receiver's connection; the next command reconnects
    pub async fn disconnect(&self, device_id: &str) {
        self.connections.close(device_id).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unresolved_command_is_a_quiet_success() {
        let driver = DenonDriver::with_memory_store(DriverConfig::default());
        // Nothing listens here; a connect attempt would fail
        let device = DeviceConfig::new("denon", "127.0.0.1").with_port(1);

        let outcome = driver.execute("VOLUME_UP", &device).await.unwrap();

        assert_eq!(outcome, Outcome::Unresolved("VOLUME_UP".to_string()));
        assert_eq!(outcome.status(), "ok");
        assert!(outcome.state().is_none());
        assert!(!driver.is_connected("denon"));
    }
}
