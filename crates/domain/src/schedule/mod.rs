//! Schedules — rules, daily rule sets, and the calendar that picks
//! between them.
//!
//! A [`Rule`] names an action for a set of shutters and the triggers
//! that fire it. Rules are grouped into named daily schedules, and the
//! [`Calendar`] decides which daily schedule is in effect on a given
//! day.

pub mod calendar;
pub mod condition;
pub mod cron;
pub mod trigger;

use std::collections::BTreeMap;

pub use calendar::{Calendar, CalendarEntry, DaySelector};
pub use condition::{CompareOp, Condition};
pub use trigger::Trigger;

use crate::error::ValidationError;
use crate::item::ShutterId;
use crate::shutter::AutoState;

/// A scheduled automation rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    /// Name the daily schedules reference this rule by.
    pub name: String,
    pub description: String,
    /// Automation mode the rule puts its shutters into.
    pub action: AutoState,
    pub shutters: Vec<ShutterId>,
    /// Send commands even while the master switch is off.
    pub forced: bool,
    pub triggers: Vec<Trigger>,
    pub conditions: Vec<Condition>,
}

impl Rule {
    #[must_use]
    pub fn builder(name: impl Into<String>, action: AutoState) -> RuleBuilder {
        RuleBuilder {
            name: name.into(),
            description: String::new(),
            action,
            shutters: Vec::new(),
            forced: false,
            triggers: Vec::new(),
            conditions: Vec::new(),
        }
    }
}

impl std::fmt::Display for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({} -> {} shutters)", self.name, self.action, self.shutters.len())
    }
}

/// Builder for [`Rule`], validating on [`build`](Self::build).
#[derive(Debug, Clone)]
pub struct RuleBuilder {
    name: String,
    description: String,
    action: AutoState,
    shutters: Vec<ShutterId>,
    forced: bool,
    triggers: Vec<Trigger>,
    conditions: Vec<Condition>,
}

impl RuleBuilder {
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    #[must_use]
    pub fn shutter(mut self, shutter: ShutterId) -> Self {
        self.shutters.push(shutter);
        self
    }

    #[must_use]
    pub fn shutters(mut self, shutters: impl IntoIterator<Item = ShutterId>) -> Self {
        self.shutters.extend(shutters);
        self
    }

    #[must_use]
    pub fn forced(mut self, forced: bool) -> Self {
        self.forced = forced;
        self
    }

    #[must_use]
    pub fn trigger(mut self, trigger: Trigger) -> Self {
        self.triggers.push(trigger);
        self
    }

    #[must_use]
    pub fn condition(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    /// # Errors
    ///
    /// Returns [`ValidationError::EmptyRuleName`] for a blank name and
    /// [`ValidationError::InvalidCron`] when a cron trigger's time
    /// does not parse.
    pub fn build(self) -> Result<Rule, ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyRuleName);
        }
        for trigger in &self.triggers {
            if let Some(expr) = trigger.cron_expr() {
                cron::daily_trigger(expr)?;
            }
        }
        Ok(Rule {
            name: self.name,
            description: self.description,
            action: self.action,
            shutters: self.shutters,
            forced: self.forced,
            triggers: self.triggers,
            conditions: self.conditions,
        })
    }
}

/// Named groups of rule names, one group per kind of day.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DailySchedules {
    schedules: BTreeMap<String, Vec<String>>,
}

impl DailySchedules {
    #[must_use]
    pub fn new(schedules: BTreeMap<String, Vec<String>>) -> Self {
        Self { schedules }
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.schedules.contains_key(name)
    }

    /// The rule names of a schedule, in configuration order.
    #[must_use]
    pub fn rule_names(&self, name: &str) -> Option<&[String]> {
        self.schedules.get(name).map(Vec::as_slice)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.schedules.keys().map(String::as_str)
    }

    /// Check that every referenced rule exists.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::UnknownRule`] naming the schedule
    /// and the missing rule.
    pub fn validate_against(&self, rules: &BTreeMap<String, Rule>) -> Result<(), ValidationError> {
        for (schedule, rule_names) in &self.schedules {
            for rule_name in rule_names {
                if !rules.contains_key(rule_name) {
                    return Err(ValidationError::UnknownRule {
                        schedule: schedule.clone(),
                        rule: rule_name.clone(),
                    });
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::ItemName;

    #[test]
    fn should_build_rule_with_all_parts() {
        let rule = Rule::builder("kids_down", AutoState::Down)
            .description("close the kids' rooms for the night")
            .shutter(ShutterId::new("shutter_kid1"))
            .shutter(ShutterId::new("shutter_kid2"))
            .trigger(Trigger::Cron {
                expr: "0 30 19".to_string(),
            })
            .condition(Condition::ItemState {
                item: ItemName::new("presence_kids"),
                operator: CompareOp::Eq,
                state: "ON".to_string(),
            })
            .build()
            .unwrap();
        assert_eq!(rule.name, "kids_down");
        assert_eq!(rule.action, AutoState::Down);
        assert_eq!(rule.shutters.len(), 2);
        assert_eq!(rule.triggers.len(), 1);
        assert_eq!(rule.conditions.len(), 1);
        assert!(!rule.forced);
    }

    #[test]
    fn should_reject_blank_rule_name() {
        let result = Rule::builder("  ", AutoState::Up).build();
        assert!(matches!(result, Err(ValidationError::EmptyRuleName)));
    }

    #[test]
    fn should_reject_unparsable_cron_trigger() {
        let result = Rule::builder("morning_up", AutoState::Up)
            .trigger(Trigger::Cron {
                expr: "sometime".to_string(),
            })
            .build();
        assert!(matches!(result, Err(ValidationError::InvalidCron { .. })));
    }

    #[test]
    fn should_allow_rule_without_triggers() {
        // Such a rule never fires on its own but is still addressable.
        let rule = Rule::builder("manual_marker", AutoState::Manual)
            .build()
            .unwrap();
        assert!(rule.triggers.is_empty());
    }

    #[test]
    fn should_look_up_rule_names_in_configuration_order() {
        let schedules = DailySchedules::new(BTreeMap::from([(
            "workday".to_string(),
            vec!["morning_up".to_string(), "evening_down".to_string()],
        )]));
        assert!(schedules.contains("workday"));
        assert_eq!(
            schedules.rule_names("workday"),
            Some(&["morning_up".to_string(), "evening_down".to_string()][..])
        );
        assert_eq!(schedules.rule_names("weekend"), None);
    }

    #[test]
    fn should_validate_rule_references() {
        let schedules = DailySchedules::new(BTreeMap::from([(
            "workday".to_string(),
            vec!["morning_up".to_string()],
        )]));
        let mut rules = BTreeMap::new();
        rules.insert(
            "morning_up".to_string(),
            Rule::builder("morning_up", AutoState::Up).build().unwrap(),
        );
        assert!(schedules.validate_against(&rules).is_ok());

        let broken = DailySchedules::new(BTreeMap::from([(
            "workday".to_string(),
            vec!["does_not_exist".to_string()],
        )]));
        assert!(matches!(
            broken.validate_against(&rules),
            Err(ValidationError::UnknownRule { schedule, rule })
                if schedule == "workday" && rule == "does_not_exist"
        ));
    }
}
