//! Rust library for controlling Denon networked audio/video receivers
//!
//! This library speaks the receiver's ASCII telnet control protocol over a
//! persistent TCP connection. It supports:
//!
//! - Symbolic commands (power, volume, mute, input, menu, surround mode, zones)
//! - One persistent connection per receiver, reopened on demand
//! - Aggregate status polling into a structured [`DeviceState`]
//! - A raw event stream of replies, socket errors and disconnects
//!
//! # Quick Start
//!
//! ```no_run
//! use denon_avr::{DenonDriver, DeviceConfig, DriverConfig, Outcome};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let driver = DenonDriver::with_memory_store(DriverConfig::default());
//!     let receiver = DeviceConfig::from_json(
//!         r#"{"deviceId":"denon","deviceIp":"192.168.1.20","localTimeout":2000}"#,
//!     )?;
//!
//!     // Seed the state once at startup
//!     driver.init(&receiver).await?;
//!
//!     // Fire-and-forget commands
//!     driver.execute("VOLUP", &receiver).await?;
//!
//!     // Aggregate status
//!     if let Outcome::Polled(state) = driver.execute("list", &receiver).await? {
//!         println!("{}", state.to_json());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! - **Command**: symbolic names to wire codes
//! - **Reply**: pattern rules that extract zone fields from replies
//! - **Connection**: per-receiver socket registry with reader/writer tasks
//! - **Poll**: sequential status query state machine
//! - **Driver**: command dispatch and host entry points

mod command;
mod config;
mod connection;
mod driver;
mod error;
mod poll;
mod reply;
mod state;
mod subscription;

// Public exports
pub use command::{resolve, Action, DeviceCommand, LIST, STATE, WIRE_TERMINATOR};
pub use config::{DeviceConfig, DeviceId, DriverConfig, DEFAULT_LOCAL_TIMEOUT_MS, DEFAULT_PORT};
pub use connection::{Connection, ConnectionManager};
pub use driver::{DenonDriver, Outcome};
pub use error::{DenonError, Result};
pub use poll::{PollState, StatusPoll, POLL_SEQUENCE};
pub use reply::{parse as parse_reply, Power, ZoneUpdate};
pub use state::{DeviceState, MemoryStateStore, StateStore, Zone1State, Zone2State, Zone3State};
pub use subscription::{DeviceEvent, EventReceiver};
