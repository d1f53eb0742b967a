//! Shutter states and commands.
//!
//! The automation keeps two pieces of state per shutter on the host:
//! the automation mode ([`AutoState`]) and the sunlit flag
//! ([`SunlitState`]). Both are stored as plain item state strings so
//! wall switches and host UIs can read and override them.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Automation mode of a single shutter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AutoState {
    /// Track sun exposure: close when sunlit, reopen when shaded.
    Sun,
    /// Keep the shutter closed.
    Down,
    /// Keep the shutter open.
    Up,
    /// Hands off: a person is in control.
    Manual,
}

impl AutoState {
    /// State string stored on the host.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sun => "SUN",
            Self::Down => "DOWN",
            Self::Up => "UP",
            Self::Manual => "MANUAL",
        }
    }
}

impl std::fmt::Display for AutoState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AutoState {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SUN" => Ok(Self::Sun),
            "DOWN" => Ok(Self::Down),
            "UP" => Ok(Self::Up),
            "MANUAL" => Ok(Self::Manual),
            other => Err(ValidationError::UnknownState {
                kind: "automation",
                value: other.to_string(),
            }),
        }
    }
}

/// Whether a shutter was sunlit the last time the sun was evaluated.
///
/// `Unknown` marks shutters whose exposure has not been observed since
/// they entered sun tracking, for example right after a mode change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SunlitState {
    #[default]
    Unknown,
    True,
    False,
}

impl SunlitState {
    /// State string stored on the host.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unknown => "Unknown",
            Self::True => "True",
            Self::False => "False",
        }
    }
}

impl std::fmt::Display for SunlitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SunlitState {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Unknown" => Ok(Self::Unknown),
            "True" => Ok(Self::True),
            "False" => Ok(Self::False),
            other => Err(ValidationError::UnknownState {
                kind: "sunlit",
                value: other.to_string(),
            }),
        }
    }
}

/// Command sent to a shutter actuator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ShutterCommand {
    Up,
    Down,
    Stop,
}

impl ShutterCommand {
    /// Command string sent to the host.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Up => "UP",
            Self::Down => "DOWN",
            Self::Stop => "STOP",
        }
    }

    /// Rollershutter position equivalent in percent closed.
    ///
    /// Hosts that model shutters as position channels report `0` for a
    /// fully open and `100` for a fully closed shutter. `STOP` is the
    /// lamella tilt and is conventionally reported as half closed.
    #[must_use]
    pub fn position(self) -> u8 {
        match self {
            Self::Up => 0,
            Self::Down => 100,
            Self::Stop => 50,
        }
    }
}

impl std::fmt::Display for ShutterCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
