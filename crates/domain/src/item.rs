//! Item names — the host's addressing scheme for devices and state.
//!
//! Everything the automation reads or writes lives behind a named item
//! on the home-automation host: the sun position, the weather flag, the
//! shutter actuators, and the per-shutter bookkeeping items this system
//! maintains for itself.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Prefix of the per-shutter automation-mode item.
const AUTO_STATE_PREFIX: &str = "state_auto_";

/// Prefix of the per-shutter sunlit-flag item.
const SUNLIT_STATE_PREFIX: &str = "state_sunlit_";

/// Name of an item on the host.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemName(String);

impl ItemName {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Reject empty names. Called by configuration validation, not by
    /// the deserializer, so error reports can carry document context.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::EmptyItemName`] when the name is empty.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.0.is_empty() {
            return Err(ValidationError::EmptyItemName);
        }
        Ok(())
    }
}

impl fmt::Display for ItemName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ItemName {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// Identifier of a shutter, which doubles as the name of its actuator
/// item on the host.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShutterId(String);

impl ShutterId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The actuator item commands are sent to.
    #[must_use]
    pub fn device_item(&self) -> ItemName {
        ItemName::new(self.0.clone())
    }

    /// The item holding this shutter's automation mode.
    #[must_use]
    pub fn auto_state_item(&self) -> ItemName {
        ItemName::new(format!("{AUTO_STATE_PREFIX}{}", self.0))
    }

    /// The item holding this shutter's sunlit flag.
    #[must_use]
    pub fn sunlit_state_item(&self) -> ItemName {
        ItemName::new(format!("{SUNLIT_STATE_PREFIX}{}", self.0))
    }
}

impl fmt::Display for ShutterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ShutterId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// The externally provided items the automation observes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HostItems {
    /// Sun azimuth in degrees, clockwise from north.
    pub azimuth: ItemName,
    /// Sun elevation in degrees above the horizon.
    pub elevation: ItemName,
    /// Switch item, `ON` while the sky is clear enough to cast shade.
    pub weather_sunny: ItemName,
    /// Master switch gating all shutter commands.
    pub shutter_automation: ItemName,
}

impl HostItems {
    /// # Errors
    ///
    /// Returns [`ValidationError::EmptyItemName`] when any name is empty.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.azimuth.validate()?;
        self.elevation.validate()?;
        self.weather_sunny.validate()?;
        self.shutter_automation.validate()?;
        Ok(())
    }
}
