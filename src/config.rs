use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Telnet port used by the receiver's control protocol
pub const DEFAULT_PORT: u16 = 23;

/// Driver-wide reply timeout in milliseconds
pub const DEFAULT_LOCAL_TIMEOUT_MS: u64 = 3000;

/// Device identifier, as handed out by the host
pub type DeviceId = String;

/// Per-device configuration supplied by the host
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DeviceConfig {
    pub device_id: DeviceId,
    pub device_ip: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_port: Option<u16>,

    /// Reply timeout in milliseconds; falls back to [`DriverConfig::local_timeout`]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_timeout: Option<u64>,
}

impl DeviceConfig {
    pub fn new(device_id: impl Into<String>, device_ip: impl Into<String>) -> Self {
        Self {
            device_id: device_id.into(),
            device_ip: device_ip.into(),
            device_port: None,
            local_timeout: None,
        }
    }

    /// Set an explicit port
    pub fn with_port(mut self, port: u16) -> Self {
        self.device_port = Some(port);
        self
    }

    /// Set a device-specific reply timeout in milliseconds
    pub fn with_timeout_ms(mut self, ms: u64) -> Self {
        self.local_timeout = Some(ms);
        self
    }

    /// Parse the host's JSON device object
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Port to connect to
    pub fn port(&self) -> u16 {
        self.device_port.unwrap_or(DEFAULT_PORT)
    }

    /// Reply timeout for this device
    pub fn timeout(&self, driver: &DriverConfig) -> Duration {
        Duration::from_millis(self.local_timeout.unwrap_or(driver.local_timeout))
    }

    pub(crate) fn address(&self) -> String {
        format!("{}:{}", self.device_ip, self.port())
    }
}

/// Driver-wide settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DriverConfig {
    #[serde(default = "default_local_timeout")]
    pub local_timeout: u64,
}

fn default_local_timeout() -> u64 {
    DEFAULT_LOCAL_TIMEOUT_MS
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            local_timeout: DEFAULT_LOCAL_TIMEOUT_MS,
        }
    }
}

impl DriverConfig {
    /// Parse the host's JSON driver object
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
