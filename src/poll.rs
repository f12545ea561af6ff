//! Aggregate status poll
//!
//! Builds one [`DeviceState`] snapshot by sending each query in
//! [`POLL_SEQUENCE`] and folding the reply into the snapshot before the next
//! query goes out. At most one query is outstanding per device.

use crate::command::{self, DeviceCommand};
use crate::config::DeviceConfig;
use crate::connection::ConnectionManager;
use crate::error::{DenonError, Result};
use crate::reply;
use crate::state::DeviceState;
use crate::subscription::{DeviceEvent, EventReceiver};
use std::time::Duration;
use tokio::time::timeout;

/// Queries issued by one aggregate poll, in order
pub const POLL_SEQUENCE: [DeviceCommand; 3] = [
    DeviceCommand::VolStatus,
    DeviceCommand::InputStatus,
    DeviceCommand::Zone3Status,
];

/// Position of a poll within [`POLL_SEQUENCE`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    /// Waiting on the reply to `POLL_SEQUENCE[i]`
    Querying(usize),
    Done,
}

/// Status poll state machine, independent of any socket
#[derive(Debug, Clone)]
pub struct StatusPoll {
    state: PollState,
    snapshot: DeviceState,
}

impl StatusPoll {
    pub fn new(initial: DeviceState) -> Self {
        Self {
            state: PollState::Querying(0),
            snapshot: initial,
        }
    }

    pub fn state(&self) -> PollState {
        self.state
    }

    /// Query to send for the current step, `None` once done
    pub fn next_query(&self) -> Option<DeviceCommand> {
        match self.state {
            PollState::Querying(i) => POLL_SEQUENCE.get(i).copied(),
            PollState::Done => None,
        }
    }

    /// Fold one reply into the snapshot and advance
    pub fn on_reply(&mut self, raw: &[u8]) -> PollState {
        let PollState::Querying(i) = self.state else {
            return PollState::Done;
        };

        if let Some(update) = reply::parse(raw) {
            self.snapshot.apply(update);
        }

        self.state = if i + 1 >= POLL_SEQUENCE.len() {
            PollState::Done
        } else {
            PollState::Querying(i + 1)
        };
        self.state
    }

    /// Whether a reply chunk answers the current query
    ///
    /// A reply answers a status query when one of its lines carries the
    /// query's prefix (`MV?` is answered by `MV...`). Anything else is a late
    /// reply to an earlier command or an unsolicited status line.
    pub fn is_reply(&self, raw: &[u8]) -> bool {
        let Some(query) = self.next_query() else {
            return false;
        };
        let prefix = query.wire_code().trim_end_matches('?').as_bytes();
        raw.split(|&b| b == command::WIRE_TERMINATOR as u8)
            .any(|line| line.starts_with(prefix))
    }

    /// Fold a reply that does not answer the current query, without advancing
    pub fn observe(&mut self, raw: &[u8]) {
        if let Some(update) = reply::parse(raw) {
            self.snapshot.apply(update);
        }
    }

    /// Snapshot accumulated so far
    pub fn snapshot(&self) -> &DeviceState {
        &self.snapshot
    }

    pub fn into_snapshot(self) -> DeviceState {
        self.snapshot
    }
}

/// Run a full poll against a device
///
/// Each query must be answered within `reply_timeout`. On timeout the
/// connection is closed and no further queries are sent. Socket errors and
/// remote close abort the poll; neither returns the partial snapshot.
pub async fn run(
    manager: &ConnectionManager,
    device: &DeviceConfig,
    initial: DeviceState,
    reply_timeout: Duration,
) -> Result<DeviceState> {
    let mut poll = StatusPoll::new(initial);
    let mut events = manager.subscribe();

    while let Some(query) = poll.next_query() {
        tracing::debug!("Polling {} with {}", device.device_id, query);

        let answered = match manager
            .transmit(device, query.wire_code(), Some(reply_timeout))
            .await
        {
            Ok(_) => timeout(
                reply_timeout,
                await_reply(&mut events, &mut poll, &device.device_id),
            )
            .await
            .unwrap_or_else(|_| {
                tracing::warn!(
                    "No reply from {} to {} within {:?}",
                    device.device_id,
                    query,
                    reply_timeout
                );
                Err(DenonError::Timeout)
            }),
            Err(e) => Err(e),
        };

        match answered {
            Ok(bytes) => {
                poll.on_reply(&bytes);
            }
            Err(e) if e.is_timeout() => {
                manager.close(&device.device_id).await;
                return Err(DenonError::Timeout);
            }
            Err(e) => return Err(e),
        }
    }

    Ok(poll.into_snapshot())
}

/// Wait for the chunk that answers the current query
async fn await_reply(
    events: &mut EventReceiver,
    poll: &mut StatusPoll,
    device_id: &str,
) -> Result<Vec<u8>> {
    loop {
        match events.recv_for(device_id).await? {
            DeviceEvent::Data { bytes, .. } => {
                if poll.is_reply(&bytes) {
                    return Ok(bytes);
                }
                tracing::debug!(
                    "Skipping reply from {} while polling: {:?}",
                    device_id,
                    String::from_utf8_lossy(&bytes)
                );
                poll.observe(&bytes);
            }
            DeviceEvent::Error { kind, message, .. } => {
                return Err(DenonError::Io(std::io::Error::new(kind, message)));
            }
            DeviceEvent::Closed { .. } => return Err(DenonError::ConnectionClosed),
        }
    }
}
