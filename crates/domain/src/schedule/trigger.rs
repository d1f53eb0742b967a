//! Trigger — the event or time pattern that fires a rule.

use serde::{Deserialize, Serialize};

use crate::event::ItemEvent;
use crate::item::ItemName;

/// Describes what should fire a rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Trigger {
    /// Fires daily at a fixed time, given as `"sec min hour"`.
    Cron { expr: String },
    /// Fires when a device channel emits an event, e.g. a wall button.
    ChannelEvent { channel: String, event: String },
    /// Fires whenever an item's state changes.
    ItemChanged { item: ItemName },
}

impl Trigger {
    /// Check whether this trigger matches a given host event.
    ///
    /// `Cron` triggers never match events; the scheduler arms them on
    /// its timer instead.
    #[must_use]
    pub fn matches_event(&self, event: &ItemEvent) -> bool {
        match self {
            Self::Cron { .. } => false,
            Self::ChannelEvent { channel, event: expected } => matches!(
                event,
                ItemEvent::Channel { channel: ch, event: ev }
                    if ch == channel && ev == expected
            ),
            Self::ItemChanged { item } => matches!(
                event,
                ItemEvent::StateChanged { item: changed, .. } if changed == item
            ),
        }
    }

    /// The trigger's cron time-of-day expression, when it has one.
    #[must_use]
    pub fn cron_expr(&self) -> Option<&str> {
        match self {
            Self::Cron { expr } => Some(expr),
            Self::ChannelEvent { .. } | Self::ItemChanged { .. } => None,
        }
    }
}

impl std::fmt::Display for Trigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cron { expr } => write!(f, "cron({expr})"),
            Self::ChannelEvent { channel, event } => {
                write!(f, "channel_event({channel}, {event})")
            }
            Self::ItemChanged { item } => write!(f, "item_changed({item})"),
        }
    }
}
