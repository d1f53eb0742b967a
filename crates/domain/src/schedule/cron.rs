//! Cron expression handling for triggers and calendar day patterns.
//!
//! Rule triggers name only a time of day, `"sec min hour"`, and run
//! every day at that time. Calendar entries name only days,
//! `"dom month dow"` with an optional trailing year, and match a date
//! when any instant of it matches. Both are completed to full
//! expressions here, with quartz-style `?` placeholders normalised to
//! `*` beforehand.

use std::str::FromStr;

use cron::Schedule;

use crate::error::ValidationError;

/// Parse a `"sec min hour"` trigger time into a daily schedule.
///
/// # Errors
///
/// Returns [`ValidationError::InvalidCron`] when the completed
/// expression does not parse, including when `expr` already carries
/// day fields of its own.
pub fn daily_trigger(expr: &str) -> Result<Schedule, ValidationError> {
    parse(expr, &format!("{} * * *", normalise(expr)))
}

/// Parse a `"dom month dow [year]"` calendar pattern into a schedule
/// that matches every instant of the selected days.
///
/// # Errors
///
/// Returns [`ValidationError::InvalidCron`] when the completed
/// expression does not parse.
pub fn day_pattern(expr: &str) -> Result<Schedule, ValidationError> {
    parse(expr, &format!("* * * {}", normalise(expr)))
}

fn normalise(expr: &str) -> String {
    expr.split_whitespace()
        .map(|field| if field == "?" { "*" } else { field })
        .collect::<Vec<_>>()
        .join(" ")
}

fn parse(original: &str, completed: &str) -> Result<Schedule, ValidationError> {
    Schedule::from_str(completed).map_err(|err| ValidationError::InvalidCron {
        expr: original.to_string(),
        reason: err.to_string(),
    })
}
