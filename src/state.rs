use crate::config::DeviceId;
use crate::reply::{Power, ZoneUpdate};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Mutex;

/// Snapshot of everything the status poll has observed on a receiver
///
/// Fields are only set by a matching reply. `None` means "never observed".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceState {
    #[serde(rename = "ZONE1", default)]
    pub zone1: Zone1State,

    #[serde(rename = "ZONE2", default)]
    pub zone2: Zone2State,

    #[serde(rename = "ZONE3", default)]
    pub zone3: Zone3State,
}

/// Main zone
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Zone1State {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<String>,
}

/// Zone 2 (no status is polled for it yet)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Zone2State {}

/// Zone 3
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Zone3State {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub power: Option<Power>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<String>,
}

impl DeviceState {
    /// Merge one parsed reply into the snapshot
    pub fn apply(&mut self, update: ZoneUpdate) {
        match update {
            ZoneUpdate::Zone1Volume(volume) => self.zone1.volume = Some(volume),
            ZoneUpdate::Zone1Input(input) => self.zone1.input = Some(input),
            ZoneUpdate::Zone3Power(power) => self.zone3.power = Some(power),
            ZoneUpdate::Zone3Volume(volume) => self.zone3.volume = Some(volume),
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        // Plain structs of strings cannot fail to serialize
        serde_json::to_value(self).unwrap_or_default()
    }
}

/// Storage for the last known state of each device
///
/// The driver reads the current value before a poll and writes the result
/// back afterwards.
pub trait StateStore: Send + Sync {
    fn get(&self, device_id: &str) -> Option<DeviceState>;
    fn set(&self, device_id: &str, state: DeviceState);
}

/// In-process [`StateStore`]
#[derive(Debug, Default)]
pub struct MemoryStateStore {
    states: Mutex<HashMap<DeviceId, DeviceState>>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of devices with a stored state
    pub fn len(&self) -> usize {
        self.states.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl StateStore for MemoryStateStore {
    fn get(&self, device_id: &str) -> Option<DeviceState> {
        self.states.lock().unwrap().get(device_id).cloned()
    }

    fn set(&self, device_id: &str, state: DeviceState) {
        self.states
            .lock()
            .unwrap()
            .insert(device_id.to_string(), state);
    }
}
