use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

static ZONE1_VOLUME: Lazy<Regex> = Lazy::new(|| Regex::new(r"MV([0-9]+)\r").unwrap());
static ZONE1_INPUT: Lazy<Regex> = Lazy::new(|| Regex::new(r"SI([A-Z]+)\r").unwrap());
static ZONE3_POWER: Lazy<Regex> = Lazy::new(|| Regex::new(r"Z3(ON|OFF)\r").unwrap());
static ZONE3_VOLUME: Lazy<Regex> = Lazy::new(|| Regex::new(r"Z3([0-9]+)\r").unwrap());

/// Zone power state as reported by the receiver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Power {
    On,
    Off,
}

impl Power {
    pub fn as_str(self) -> &'static str {
        match self {
            Power::On => "ON",
            Power::Off => "OFF",
        }
    }
}

impl fmt::Display for Power {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single field update extracted from a reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ZoneUpdate {
    /// Main zone master volume, e.g. `MV55`
    Zone1Volume(String),
    /// Main zone input source, e.g. `SIBD`
    Zone1Input(String),
    /// Zone 3 power, `Z3ON` / `Z3OFF`
    Zone3Power(Power),
    /// Zone 3 volume, e.g. `Z340`
    Zone3Volume(String),
}

/// Extract a zone update from a raw reply chunk
///
/// Rules are tried in order and the first match wins. Chunks matching no rule
/// return `None`; the receiver emits many reply shapes this driver ignores.
pub fn parse(raw: &[u8]) -> Option<ZoneUpdate> {
    let text = String::from_utf8_lossy(raw);

    if let Some(caps) = ZONE1_VOLUME.captures(&text) {
        return Some(ZoneUpdate::Zone1Volume(caps[1].to_string()));
    }
    if let Some(caps) = ZONE1_INPUT.captures(&text) {
        return Some(ZoneUpdate::Zone1Input(caps[1].to_string()));
    }
    if let Some(caps) = ZONE3_POWER.captures(&text) {
        let power = if &caps[1] == "ON" { Power::On } else { Power::Off };
        return Some(ZoneUpdate::Zone3Power(power));
    }
    if let Some(caps) = ZONE3_VOLUME.captures(&text) {
        return Some(ZoneUpdate::Zone3Volume(caps[1].to_string()));
    }

    None
}
