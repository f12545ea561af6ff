use crate::command::{self, LIST, STATE};
use crate::config::{DeviceConfig, DeviceId};
use crate::error::{DenonError, Result};
use crate::subscription::{DeviceEvent, EventReceiver};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::{broadcast, mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use uuid::Uuid;

const READ_BUFFER_SIZE: usize = 1024;
const EVENT_CHANNEL_CAPACITY: usize = 100;

/// Registry entry for one device; `None` while no socket is open
type Slot = Arc<Mutex<Option<Arc<Connection>>>>;

/// One open TCP connection to a receiver
///
/// The socket halves are owned by a writer task (fed through an unbounded
/// channel) and a reader task that publishes every chunk it reads.
pub struct Connection {
    id: Uuid,
    device_id: DeviceId,
    open: Arc<AtomicBool>,
    write_tx: mpsc::UnboundedSender<Vec<u8>>,
    reader: JoinHandle<()>,
    writer: JoinHandle<()>,
}

impl Connection {
    async fn open(
        device: &DeviceConfig,
        slot: Weak<Mutex<Option<Arc<Connection>>>>,
        event_tx: broadcast::Sender<DeviceEvent>,
    ) -> Result<Self> {
        let address = device.address();
        tracing::info!("Connecting to {} ({})", address, device.device_id);

        let stream = TcpStream::connect(&address).await?;
        let (mut read, mut write) = stream.into_split();

        let id = Uuid::new_v4();
        let device_id = device.device_id.clone();
        let open = Arc::new(AtomicBool::new(true));
        let (write_tx, mut write_rx) = mpsc::unbounded_channel::<Vec<u8>>();

        // Forward outgoing frames to the socket
        let writer_open = open.clone();
        let writer_events = event_tx.clone();
        let writer_device = device_id.clone();
        let writer = tokio::spawn(async move {
            while let Some(bytes) = write_rx.recv().await {
                if let Err(e) = write.write_all(&bytes).await {
                    tracing::error!("Failed to write to {}: {}", writer_device, e);
                    writer_open.store(false, Ordering::SeqCst);
                    let _ = writer_events.send(DeviceEvent::Error {
                        device_id: writer_device.clone(),
                        kind: e.kind(),
                        message: e.to_string(),
                    });
                    break;
                }
            }
        });

        // Publish incoming data until the receiver hangs up
        let reader_open = open.clone();
        let reader_device = device_id.clone();
        let reader = tokio::spawn(async move {
            let mut buf = [0u8; READ_BUFFER_SIZE];
            loop {
                match read.read(&mut buf).await {
                    Ok(0) => {
                        tracing::info!("Connection to {} closed", reader_device);
                        reader_open.store(false, Ordering::SeqCst);
                        let _ = event_tx.send(DeviceEvent::Closed {
                            device_id: reader_device.clone(),
                        });
                        break;
                    }
                    Ok(n) => {
                        tracing::debug!(
                            "Received from {}: {:?}",
                            reader_device,
                            String::from_utf8_lossy(&buf[..n])
                        );
                        let _ = event_tx.send(DeviceEvent::Data {
                            device_id: reader_device.clone(),
                            bytes: buf[..n].to_vec(),
                        });
                    }
                    Err(e) => {
                        tracing::error!("Socket error from {}: {}", reader_device, e);
                        reader_open.store(false, Ordering::SeqCst);
                        let _ = event_tx.send(DeviceEvent::Error {
                            device_id: reader_device.clone(),
                            kind: e.kind(),
                            message: e.to_string(),
                        });
                        break;
                    }
                }
            }

            // Forget this connection so the next command reconnects
            if let Some(slot) = slot.upgrade() {
                let mut current = slot.lock().await;
                if current.as_ref().is_some_and(|c| c.id == id) {
                    *current = None;
                }
            }
        });

        Ok(Self {
            id,
            device_id,
            open,
            write_tx,
            reader,
            writer,
        })
    }

    /// Unique identity of this socket
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    /// Whether the socket is still usable for writes
    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst) && !self.write_tx.is_closed()
    }

    /// Queue `wire_code` followed by the line terminator
    pub fn write(&self, wire_code: &str) -> Result<()> {
        if !self.is_open() {
            return Err(DenonError::ConnectionClosed);
        }

        tracing::debug!("Sending to {}: {}", self.device_id, wire_code);
        self.write_tx
            .send(command::frame(wire_code))
            .map_err(|_| DenonError::ConnectionClosed)
    }

    /// Tear the socket down immediately
    pub fn close(&self) {
        self.open.store(false, Ordering::SeqCst);
        self.writer.abort();
        self.reader.abort();
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.close();
    }
}

/// Owns at most one open connection per device
///
/// Commands for a device reuse its open socket; a new socket is opened only
/// when none is open. Connects for the same device are serialized, connects
/// for different devices run independently.
pub struct ConnectionManager {
    slots: std::sync::Mutex<HashMap<DeviceId, Slot>>,
    event_tx: broadcast::Sender<DeviceEvent>,
}

impl ConnectionManager {
    pub fn new() -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            slots: std::sync::Mutex::new(HashMap::new()),
            event_tx,
        }
    }

    /// Subscribe to data, error and close events of every device
    pub fn subscribe(&self) -> EventReceiver {
        EventReceiver::new(self.event_tx.subscribe())
    }

    fn slot(&self, device_id: &str) -> Slot {
        let mut slots = self.slots.lock().unwrap();
        slots
            .entry(device_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(None)))
            .clone()
    }

    /// Return the open connection for a device, connecting first if needed
    ///
    /// `connect_timeout` bounds the connect phase; it fails with
    /// [`DenonError::Timeout`] when exceeded.
    pub async fn connection(
        &self,
        device: &DeviceConfig,
        connect_timeout: Option<Duration>,
    ) -> Result<Arc<Connection>> {
        let slot = self.slot(&device.device_id);
        let mut current = slot.lock().await;

        if let Some(conn) = current.as_ref() {
            if conn.is_open() {
                return Ok(conn.clone());
            }
        }

        let opening = Connection::open(device, Arc::downgrade(&slot), self.event_tx.clone());
        let conn = match connect_timeout {
            Some(limit) => timeout(limit, opening)
                .await
                .map_err(|_| DenonError::Timeout)??,
            None => opening.await?,
        };

        let conn = Arc::new(conn);
        *current = Some(conn.clone());
        Ok(conn)
    }

    /// Write a wire code to a device, connecting first if needed
    ///
    /// The pseudo-commands `list` and `state` are never written.
    pub async fn transmit(
        &self,
        device: &DeviceConfig,
        wire_code: &str,
        connect_timeout: Option<Duration>,
    ) -> Result<Arc<Connection>> {
        let conn = self.connection(device, connect_timeout).await?;

        if !wire_code.is_empty() && wire_code != LIST && wire_code != STATE {
            conn.write(wire_code)?;
        }

        Ok(conn)
    }

    /// Whether a device currently has an open connection
    pub fn is_connected(&self, device_id: &str) -> bool {
        let slot = match self.slots.lock().unwrap().get(device_id) {
            Some(slot) => slot.clone(),
            None => return false,
        };

        // A locked slot is mid-connect, not yet usable
        let current = match slot.try_lock() {
            Ok(current) => current,
            Err(_) => return false,
        };
        current.as_ref().is_some_and(|c| c.is_open())
    }

    /// Forcibly close a device's connection
    pub async fn close(&self, device_id: &str) {
        let slot = match self.slots.lock().unwrap().get(device_id) {
            Some(slot) => slot.clone(),
            None => return,
        };

        let taken = slot.lock().await.take();
        if let Some(conn) = taken {
            tracing::info!("Closing connection to {}", device_id);
            conn.close();
        }
    }

    #[cfg(test)]
    pub(crate) fn publish(&self, event: DeviceEvent) {
        let _ = self.event_tx.send(event);
    }
}

impl Default for ConnectionManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    async fn mock_receiver() -> (TcpListener, DeviceConfig) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        (listener, DeviceConfig::new("denon", "127.0.0.1").with_port(port))
    }

    #[tokio::test]
    async fn pseudo_commands_are_not_written() {
        let (listener, device) = mock_receiver().await;
        let manager = ConnectionManager::new();

        let server = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 16];
            let n = stream.read(&mut buf).await.unwrap();
            buf[..n].to_vec()
        });

        manager.transmit(&device, LIST, None).await.unwrap();
        manager.transmit(&device, STATE, None).await.unwrap();
        manager.transmit(&device, "PW?", None).await.unwrap();

        assert_eq!(server.await.unwrap(), b"PW?\r".to_vec());
    }

    #[tokio::test]
    async fn remote_close_clears_the_slot() {
        let (listener, device) = mock_receiver().await;
        let manager = ConnectionManager::new();
        let mut events = manager.subscribe();

        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            drop(stream);
            listener
        });

        let first = manager.connection(&device, None).await.unwrap();
        let listener = server.await.unwrap();

        match events.recv_for("denon").await.unwrap() {
            DeviceEvent::Closed { device_id } => assert_eq!(device_id, "denon"),
            other => panic!("unexpected event: {:?}", other),
        }
        assert!(!first.is_open());

        let accept = tokio::spawn(async move { listener.accept().await.unwrap() });
        let second = manager.connection(&device, None).await.unwrap();
        let _server_side = accept.await.unwrap();

        assert_ne!(first.id(), second.id());
        assert!(second.is_open());
    }

    #[tokio::test]
    async fn close_marks_connection_closed() {
        let (listener, device) = mock_receiver().await;
        let manager = ConnectionManager::new();

        let accept = tokio::spawn(async move { listener.accept().await.unwrap() });
        let conn = manager.connection(&device, None).await.unwrap();
        let _server_side = accept.await.unwrap();

        assert!(manager.is_connected("denon"));
        manager.close("denon").await;

        assert!(!conn.is_open());
        assert!(!manager.is_connected("denon"));
        assert!(matches!(conn.write("PW?"), Err(DenonError::ConnectionClosed)));
    }

    #[tokio::test]
    async fn close_hangs_up_on_the_receiver() {
        let (listener, device) = mock_receiver().await;
        let manager = ConnectionManager::new();
        let (got_tx, got_rx) = tokio::sync::oneshot::channel();

        let server = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 16];
            let n = stream.read(&mut buf).await.unwrap();
            got_tx.send(buf[..n].to_vec()).unwrap();
            // Next read ends once the client hangs up
            matches!(stream.read(&mut buf).await, Ok(0) | Err(_))
        });

        manager.transmit(&device, "ZM?", None).await.unwrap();
        assert_eq!(got_rx.await.unwrap(), b"ZM?\r".to_vec());

        manager.close("unknown").await;
        assert!(manager.is_connected("denon"));

        manager.close("denon").await;
        assert!(!manager.is_connected("denon"));

        let hung_up = timeout(Duration::from_secs(2), server)
            .await
            .unwrap()
            .unwrap();
        assert!(hung_up);
    }
}
