//! Calendar — which daily schedule applies on which day.

use chrono::{DateTime, NaiveDate, TimeZone};

use crate::error::ValidationError;
use crate::schedule::DailySchedules;
use crate::schedule::cron::day_pattern;

/// Selects the days a calendar entry covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DaySelector {
    /// Cron day pattern, `"dom month dow [year]"`.
    Pattern { pattern: String },
    /// Closed date range, inclusive on both ends.
    Range { from: NaiveDate, to: NaiveDate },
}

/// One line of the calendar, mapping days to a daily schedule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarEntry {
    /// Human-readable label used in logs and error reports.
    pub description: String,
    pub selector: DaySelector,
    /// Name of the daily schedule in effect on the selected days.
    pub daily_schedule: String,
}

impl CalendarEntry {
    /// Whether this entry covers the day of `now`.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidCron`] when the day pattern
    /// does not parse.
    pub fn matches<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> Result<bool, ValidationError> {
        match &self.selector {
            DaySelector::Pattern { pattern } => Ok(day_pattern(pattern)?.includes(now.clone())),
            DaySelector::Range { from, to } => {
                let today = now.date_naive();
                Ok(*from <= today && today <= *to)
            }
        }
    }

    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidCron`] for an unparsable day
    /// pattern and [`ValidationError::InvertedDateRange`] for a range
    /// that ends before it starts.
    pub fn validate(&self) -> Result<(), ValidationError> {
        match &self.selector {
            DaySelector::Pattern { pattern } => {
                day_pattern(pattern)?;
            }
            DaySelector::Range { from, to } => {
                if from > to {
                    return Err(ValidationError::InvertedDateRange {
                        entry: self.description.clone(),
                        from: *from,
                        to: *to,
                    });
                }
            }
        }
        Ok(())
    }
}

/// The ordered calendar. Earlier entries win, so specific periods
/// (vacations, holidays) are listed before the everyday fallbacks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Calendar {
    entries: Vec<CalendarEntry>,
}

impl Calendar {
    #[must_use]
    pub fn new(entries: Vec<CalendarEntry>) -> Self {
        Self { entries }
    }

    #[must_use]
    pub fn entries(&self) -> &[CalendarEntry] {
        &self.entries
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Pick the daily schedule for the day of `now`: the first entry
    /// whose selector covers it.
    ///
    /// Every entry is checked against `schedules` and evaluated even
    /// after a winner is found, so a broken entry fails the whole
    /// resolution no matter where it sits. `Ok(None)` means no entry
    /// covers the day.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::UnknownDailySchedule`] when any
    /// entry references a schedule that does not exist, and
    /// [`ValidationError::InvalidCron`] when any day pattern fails to
    /// parse.
    pub fn resolve<Tz: TimeZone>(
        &self,
        now: &DateTime<Tz>,
        schedules: &DailySchedules,
    ) -> Result<Option<&str>, ValidationError> {
        let mut selected = None;
        for entry in &self.entries {
            if !schedules.contains(&entry.daily_schedule) {
                return Err(ValidationError::UnknownDailySchedule {
                    entry: entry.description.clone(),
                    schedule: entry.daily_schedule.clone(),
                });
            }
            let matched = entry.matches(now)?;
            if selected.is_none() && matched {
                selected = Some(entry.daily_schedule.as_str());
            }
        }
        Ok(selected)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use chrono::Utc;

    use super::*;

    fn schedules(names: &[&str]) -> DailySchedules {
        DailySchedules::new(
            names
                .iter()
                .map(|name| ((*name).to_string(), Vec::new()))
                .collect::<BTreeMap<_, _>>(),
        )
    }

    fn pattern_entry(description: &str, pattern: &str, schedule: &str) -> CalendarEntry {
        CalendarEntry {
            description: description.to_string(),
            selector: DaySelector::Pattern {
                pattern: pattern.to_string(),
            },
            daily_schedule: schedule.to_string(),
        }
    }

    fn range_entry(description: &str, from: NaiveDate, to: NaiveDate, schedule: &str) -> CalendarEntry {
        CalendarEntry {
            description: description.to_string(),
            selector: DaySelector::Range { from, to },
            daily_schedule: schedule.to_string(),
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn household_calendar() -> Calendar {
        Calendar::new(vec![
            range_entry(
                "summer vacation",
                date(2025, 7, 14),
                date(2025, 7, 27),
                "vacation",
            ),
            pattern_entry("weekends", "* * SAT,SUN", "weekend"),
            pattern_entry("every other day", "* * *", "workday"),
        ])
    }

    #[test]
    fn should_pick_first_matching_entry() {
        // 2025-07-19 was a Saturday inside the vacation range; the
        // vacation entry is listed first and wins.
        let now = Utc.with_ymd_and_hms(2025, 7, 19, 9, 0, 0).unwrap();
        let calendar = household_calendar();
        let resolved = calendar
            .resolve(&now, &schedules(&["vacation", "weekend", "workday"]))
            .unwrap();
        assert_eq!(resolved, Some("vacation"));
    }

    #[test]
    fn should_fall_through_to_weekend_after_the_vacation() {
        // 2025-08-02 was a Saturday.
        let now = Utc.with_ymd_and_hms(2025, 8, 2, 9, 0, 0).unwrap();
        let calendar = household_calendar();
        let resolved = calendar
            .resolve(&now, &schedules(&["vacation", "weekend", "workday"]))
            .unwrap();
        assert_eq!(resolved, Some("weekend"));
    }

    #[test]
    fn should_fall_through_to_the_everyday_entry() {
        // 2025-08-04 was a Monday.
        let now = Utc.with_ymd_and_hms(2025, 8, 4, 9, 0, 0).unwrap();
        let calendar = household_calendar();
        let resolved = calendar
            .resolve(&now, &schedules(&["vacation", "weekend", "workday"]))
            .unwrap();
        assert_eq!(resolved, Some("workday"));
    }

    #[test]
    fn should_include_both_range_ends() {
        let calendar = Calendar::new(vec![range_entry(
            "bridge day",
            date(2025, 5, 2),
            date(2025, 5, 2),
            "holiday",
        )]);
        let available = schedules(&["holiday"]);
        let on = Utc.with_ymd_and_hms(2025, 5, 2, 0, 0, 0).unwrap();
        assert_eq!(calendar.resolve(&on, &available).unwrap(), Some("holiday"));
        let before = Utc.with_ymd_and_hms(2025, 5, 1, 23, 59, 59).unwrap();
        assert_eq!(calendar.resolve(&before, &available).unwrap(), None);
        let after = Utc.with_ymd_and_hms(2025, 5, 3, 0, 0, 0).unwrap();
        assert_eq!(calendar.resolve(&after, &available).unwrap(), None);
    }

    #[test]
    fn should_resolve_none_when_nothing_matches() {
        let calendar = Calendar::new(vec![pattern_entry("weekends", "* * SAT,SUN", "weekend")]);
        // A Monday.
        let now = Utc.with_ymd_and_hms(2025, 8, 4, 9, 0, 0).unwrap();
        assert_eq!(calendar.resolve(&now, &schedules(&["weekend"])).unwrap(), None);
    }

    #[test]
    fn should_resolve_none_on_empty_calendar() {
        let calendar = Calendar::default();
        let now = Utc.with_ymd_and_hms(2025, 8, 4, 9, 0, 0).unwrap();
        assert_eq!(calendar.resolve(&now, &schedules(&[])).unwrap(), None);
    }

    #[test]
    fn should_fail_when_any_entry_references_unknown_schedule() {
        // The first entry matches every day, but the broken entry
        // behind it still fails the resolution.
        let calendar = Calendar::new(vec![
            pattern_entry("every day", "* * *", "workday"),
            pattern_entry("weekends", "* * SAT,SUN", "missing"),
        ]);
        let now = Utc.with_ymd_and_hms(2025, 8, 4, 9, 0, 0).unwrap();
        let result = calendar.resolve(&now, &schedules(&["workday"]));
        assert!(matches!(
            result,
            Err(ValidationError::UnknownDailySchedule { schedule, .. }) if schedule == "missing"
        ));
    }

    #[test]
    fn should_fail_on_unparsable_day_pattern() {
        let calendar = Calendar::new(vec![pattern_entry("broken", "not a pattern", "workday")]);
        let now = Utc.with_ymd_and_hms(2025, 8, 4, 9, 0, 0).unwrap();
        assert!(matches!(
            calendar.resolve(&now, &schedules(&["workday"])),
            Err(ValidationError::InvalidCron { .. })
        ));
    }

    #[test]
    fn should_validate_inverted_range() {
        let entry = range_entry("upside down", date(2025, 7, 27), date(2025, 7, 14), "vacation");
        assert!(matches!(
            entry.validate(),
            Err(ValidationError::InvertedDateRange { .. })
        ));
    }

    #[test]
    fn should_validate_day_pattern() {
        assert!(pattern_entry("ok", "* * MON-FRI", "workday").validate().is_ok());
        assert!(pattern_entry("broken", "nope", "workday").validate().is_err());
    }
}
