//! Condition — a guard that must hold for a fired rule to run.

use serde::{Deserialize, Serialize};

use crate::item::ItemName;

/// Comparison operator for item-state conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompareOp {
    #[serde(rename = "=")]
    Eq,
    #[serde(rename = "!=")]
    Ne,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "<=")]
    Le,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = ">=")]
    Ge,
}

impl CompareOp {
    /// Compare an item's actual state against an expected value.
    ///
    /// When both sides parse as numbers the comparison is numeric, so
    /// `"50"` equals `"50.0"`. Otherwise `=` and `!=` compare the raw
    /// strings and the ordering operators never hold.
    #[must_use]
    pub fn eval(self, actual: &str, expected: &str) -> bool {
        if let (Ok(a), Ok(b)) = (actual.parse::<f64>(), expected.parse::<f64>()) {
            return match a.partial_cmp(&b) {
                None => false,
                Some(ordering) => self.allows(ordering),
            };
        }
        match self {
            Self::Eq => actual == expected,
            Self::Ne => actual != expected,
            Self::Lt | Self::Le | Self::Gt | Self::Ge => false,
        }
    }

    fn allows(self, ordering: std::cmp::Ordering) -> bool {
        use std::cmp::Ordering::{Equal, Greater, Less};
        match self {
            Self::Eq => ordering == Equal,
            Self::Ne => ordering != Equal,
            Self::Lt => ordering == Less,
            Self::Le => ordering != Greater,
            Self::Gt => ordering == Greater,
            Self::Ge => ordering != Less,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
        }
    }
}

impl std::fmt::Display for CompareOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A predicate evaluated after a trigger fires. All conditions of a
/// rule must be satisfied (logical AND).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Condition {
    /// Requires an item's state to compare against a value.
    ItemState {
        item: ItemName,
        operator: CompareOp,
        state: String,
    },
}

impl Condition {
    /// The item this condition reads.
    #[must_use]
    pub fn item(&self) -> &ItemName {
        match self {
            Self::ItemState { item, .. } => item,
        }
    }

    /// Evaluate against the item's observed state. An undefined item
    /// (`None`) satisfies nothing.
    #[must_use]
    pub fn holds(&self, actual: Option<&str>) -> bool {
        let Some(actual) = actual else {
            return false;
        };
        match self {
            Self::ItemState {
                operator, state, ..
            } => operator.eval(actual, state),
        }
    }
}

impl std::fmt::Display for Condition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ItemState {
                item,
                operator,
                state,
            } => write!(f, "item_state({item} {operator} {state})"),
        }
    }
}
