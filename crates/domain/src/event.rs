//! Item events — immutable records of something happening on the host.
//!
//! The host feeds these to the scheduler, which matches them against
//! rule triggers. State-change events also drive the sun evaluator,
//! since the sun azimuth is itself an item.

use serde::{Deserialize, Serialize};

use crate::item::ItemName;

/// Something observable happened on the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ItemEvent {
    /// An item's state changed.
    StateChanged {
        item: ItemName,
        /// Previous state, `None` when the item was undefined.
        from: Option<String>,
        to: String,
    },
    /// A device channel emitted a non-state event, e.g. a wall button
    /// reporting `PRESSED`.
    Channel { channel: String, event: String },
}

impl ItemEvent {
    /// The changed item's name, when this is a state-change event.
    #[must_use]
    pub fn changed_item(&self) -> Option<&ItemName> {
        match self {
            Self::StateChanged { item, .. } => Some(item),
            Self::Channel { .. } => None,
        }
    }
}

impl std::fmt::Display for ItemEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::StateChanged { item, from, to } => match from {
                Some(from) => write!(f, "{item}: {from} -> {to}"),
                None => write!(f, "{item}: undefined -> {to}"),
            },
            Self::Channel { channel, event } => write!(f, "{channel}: {event}"),
        }
    }
}
