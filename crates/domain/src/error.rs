//! Common error types used across the workspace.
//!
//! Each layer defines its own typed errors and converts via `#[from]`.
//! `LamellaError` is the umbrella the application layer and the host
//! adapters speak at their boundaries.

use chrono::NaiveDate;

/// Top-level error for application and adapter boundaries.
#[derive(Debug, thiserror::Error)]
pub enum LamellaError {
    #[error("validation error")]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    NotFound(#[from] NotFoundError),

    /// The host refused or failed an item operation for a reason other
    /// than the item being unknown.
    #[error("host gateway error: {0}")]
    Gateway(String),
}

/// A named thing was referenced but is not known to the system.
#[derive(Debug, thiserror::Error)]
#[error("{kind} {name:?} not found")]
pub struct NotFoundError {
    /// What kind of thing was looked up, e.g. `"item"`.
    pub kind: &'static str,
    pub name: String,
}

impl NotFoundError {
    #[must_use]
    pub fn item(name: impl Into<String>) -> Self {
        Self {
            kind: "item",
            name: name.into(),
        }
    }
}

/// A domain invariant was violated while building or evaluating a model.
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("item name is empty")]
    EmptyItemName,

    #[error("rule name is empty")]
    EmptyRuleName,

    #[error("unknown {kind} state {value:?}")]
    UnknownState { kind: &'static str, value: String },

    #[error("shade profile needs one or two reference points, got {count}")]
    ProfilePointCount { count: usize },

    #[error("a shade profile slope requires a reference azimuth")]
    SlopeWithoutAzimuth,

    #[error("paired shade profile points both require an azimuth")]
    PairWithoutAzimuth,

    #[error("two shade profile reference points share azimuth {azimuth}")]
    CoincidentReferences { azimuth: f64 },

    #[error("duplicate opening boundary at azimuth {azimuth}")]
    DuplicateBoundary { azimuth: f64 },

    #[error("invalid cron expression {expr:?}: {reason}")]
    InvalidCron { expr: String, reason: String },

    #[error("calendar entry {entry:?} needs exactly one of cron or timerange")]
    AmbiguousDaySelector { entry: String },

    #[error("calendar entry {entry:?} starts {from} after it ends {to}")]
    InvertedDateRange {
        entry: String,
        from: NaiveDate,
        to: NaiveDate,
    },

    #[error("calendar entry {entry:?} references undefined daily schedule {schedule:?}")]
    UnknownDailySchedule { entry: String, schedule: String },

    #[error("daily schedule {schedule:?} references undefined rule {rule:?}")]
    UnknownRule { schedule: String, rule: String },
}
