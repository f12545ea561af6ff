use crate::error::DenonError;
use std::fmt;
use std::str::FromStr;

/// Line terminator for commands and replies
pub const WIRE_TERMINATOR: char = '\r';

/// Symbolic commands accepted by the receiver driver
///
/// Variant order matches [`COMMAND_TABLE`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceCommand {
    PowerStatus,
    PowerOn,
    PowerOff,
    VolStatus,
    VolUp,
    VolDown,
    MuteStatus,
    Mute,
    Unmute,
    InputStatus,
    InputBluray,
    InputMplayer,
    InputCd,
    InputNetwork,
    InputTv,
    InputGame,
    MenuStatus,
    Menu,
    MenuUp,
    MenuDown,
    MenuLeft,
    MenuRight,
    MenuEnter,
    MenuReturn,
    SoundStatus,
    SoundMovie,
    SoundMchStereo,
    SoundPure,
    Zone1Status,
    Zone1On,
    Zone1Off,
    Zone2Status,
    Zone2On,
    Zone2VolUp,
    Zone2VolDown,
    Zone2Off,
    Zone3Status,
    Zone3On,
    Zone3VolUp,
    Zone3VolDown,
    Zone3Off,
}

use DeviceCommand::*;

/// Symbolic name and wire code for every command
const COMMAND_TABLE: [(DeviceCommand, &str, &str); 41] = [
    (PowerStatus, "POWER_STATUS", "PW?"),
    (PowerOn, "POWERON", "PWON"),
    (PowerOff, "POWEROFF", "PWSTANDBY"),
    (VolStatus, "VOL_STATUS", "MV?"),
    (VolUp, "VOLUP", "MVUP"),
    (VolDown, "VOLDOWN", "MVDOWN"),
    (MuteStatus, "MUTE_STATUS", "MU?"),
    (Mute, "MUTE", "MUON"),
    (Unmute, "UNMUTE", "MUOFF"),
    (InputStatus, "INPUT_STATUS", "SI?"),
    (InputBluray, "INPUT_BLURAY", "SIBD"),
    (InputMplayer, "INPUT_MPLAYER", "SIMPLAY"),
    (InputCd, "INPUT_CD", "SICD"),
    (InputNetwork, "INPUT_NETWORK", "SINET"),
    (InputTv, "INPUT_TV", "SISAT/CBL"),
    (InputGame, "INPUT_GAME", "SIGAME"),
    (MenuStatus, "MENU_STATUS", "MNMEN?"),
    (Menu, "MENU", "MNMEN ON"),
    (MenuUp, "MENU_UP", "MNCUP"),
    (MenuDown, "MENU_DOWN", "MNCDN"),
    (MenuLeft, "MENU_LEFT", "MNCLT"),
    (MenuRight, "MENU_RIGHT", "MNCRT"),
    (MenuEnter, "MENU_ENTER", "MNENT"),
    (MenuReturn, "MENU_RETURN", "MNRTN"),
    (SoundStatus, "SOUND_STATUS", "MS?"),
    (SoundMovie, "SOUND_MOVIE", "MSMOVIE"),
    (SoundMchStereo, "SOUND_MCHSTEREO", "MSMCH STEREO"),
    (SoundPure, "SOUND_PURE", "MSPURE DIRECT"),
    (Zone1Status, "ZONE1_STATUS", "ZM?"),
    (Zone1On, "ZONE1_ON", "ZMON"),
    (Zone1Off, "ZONE1_OFF", "ZMOFF"),
    (Zone2Status, "ZONE2_STATUS", "Z2?"),
    (Zone2On, "ZONE2_ON", "Z2ON"),
    (Zone2VolUp, "ZONE2_VOL_UP", "Z2UP"),
    // Duplicates the ZONE3_VOL_DOWN code. Kept as is on purpose.
    (Zone2VolDown, "ZONE2_VOL_DOWN", "Z3DOWN"),
    (Zone2Off, "ZONE2_OFF", "Z2OFF"),
    (Zone3Status, "ZONE3_STATUS", "Z3?"),
    (Zone3On, "ZONE3_ON", "Z3ON"),
    (Zone3VolUp, "ZONE3_VOL_UP", "Z3UP"),
    (Zone3VolDown, "ZONE3_VOL_DOWN", "Z3DOWN"),
    (Zone3Off, "ZONE3_OFF", "Z3OFF"),
];

impl DeviceCommand {
    /// Every command, in keymap order
    pub const ALL: [DeviceCommand; 41] = [
        PowerStatus, PowerOn, PowerOff, VolStatus, VolUp, VolDown, MuteStatus, Mute, Unmute,
        InputStatus, InputBluray, InputMplayer, InputCd, InputNetwork, InputTv, InputGame,
        MenuStatus, Menu, MenuUp, MenuDown, MenuLeft, MenuRight, MenuEnter, MenuReturn,
        SoundStatus, SoundMovie, SoundMchStereo, SoundPure, Zone1Status, Zone1On, Zone1Off,
        Zone2Status, Zone2On, Zone2VolUp, Zone2VolDown, Zone2Off, Zone3Status, Zone3On,
        Zone3VolUp, Zone3VolDown, Zone3Off,
    ];

    /// Symbolic name, e.g. `VOLUP`
    pub fn name(self) -> &'static str {
        COMMAND_TABLE[self as usize].1
    }

    /// String the receiver expects on the wire, e.g. `MVUP`
    pub fn wire_code(self) -> &'static str {
        COMMAND_TABLE[self as usize].2
    }

    /// Bytes to write to the socket, terminator included
    pub fn frame(self) -> Vec<u8> {
        frame(self.wire_code())
    }

    /// Look up a command by its symbolic name
    pub fn from_name(name: &str) -> Option<Self> {
        COMMAND_TABLE
            .iter()
            .find(|(_, n, _)| *n == name)
            .map(|(cmd, _, _)| *cmd)
    }
}

impl fmt::Display for DeviceCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DeviceCommand {
    type Err = DenonError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| DenonError::UnknownCommand(s.to_string()))
    }
}

/// Resolve a symbolic command name to its wire code
///
/// Returns an empty string for names outside the table; callers treat that
/// as "nothing to transmit".
pub fn resolve(name: &str) -> &'static str {
    DeviceCommand::from_name(name).map_or("", DeviceCommand::wire_code)
}

pub(crate) fn frame(wire_code: &str) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(wire_code.len() + 1);
    bytes.extend_from_slice(wire_code.as_bytes());
    bytes.push(WIRE_TERMINATOR as u8);
    bytes
}

/// Pseudo-command that triggers the aggregate status poll
pub const LIST: &str = "list";

/// Internal alias of [`LIST`]
pub const STATE: &str = "state";

/// What the dispatcher should do with an incoming command name
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Write a single wire code
    Send(DeviceCommand),
    /// Run the aggregate status poll
    Poll,
    /// Name not in the table, nothing to transmit
    Unresolved(String),
}

impl Action {
    pub fn from_name(name: &str) -> Self {
        if name == LIST || name == STATE {
            return Action::Poll;
        }

        match DeviceCommand::from_name(name) {
            Some(cmd) => Action::Send(cmd),
            None => Action::Unresolved(name.to_string()),
        }
    }
}
