//! The two declarative configuration documents, strongly typed.
//!
//! `shutters.toml` names the host items and describes each shutter's
//! facade geometry; `schedule.toml` carries the calendar, the daily
//! schedules and the rules. Both are validated eagerly while building
//! the domain types, so a broken document is rejected as a whole
//! before anything is swapped in.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use lamella_domain::error::ValidationError;
use lamella_domain::item::{HostItems, ShutterId};
use lamella_domain::schedule::{
    Calendar, CalendarEntry, Condition, DailySchedules, DaySelector, Rule, Trigger,
};
use lamella_domain::shutter::AutoState;
use lamella_domain::sun::{ExposureCatalog, Opening, ShadeProfile, SunExposure};
use serde::Deserialize;

/// Where the two documents live.
#[derive(Debug, Clone)]
pub struct DocumentPaths {
    pub shutters: PathBuf,
    pub schedule: PathBuf,
}

/// The shutter/geometry document.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ShutterDocument {
    /// Host items shared by the whole installation.
    pub items: HostItems,
    /// Facade geometry per shutter id.
    #[serde(default)]
    pub sun_exposure: BTreeMap<String, ExposureSpec>,
}

/// Facade geometry of one shutter.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExposureSpec {
    /// Compass bearing the facade faces, degrees.
    pub orientation: f64,
    #[serde(default)]
    pub openings: Vec<OpeningSpec>,
}

/// One azimuth sector of a facade.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OpeningSpec {
    /// Boundary azimuth where this sector starts.
    pub azimuth: f64,
    pub above: Option<Vec<ProfilePointSpec>>,
    pub below: Option<Vec<ProfilePointSpec>>,
}

/// One reference point of a shade profile.
///
/// A lone point with just an elevation is a constant horizon; adding
/// an azimuth makes it a level edge; adding an angle as well makes it
/// an inclined edge. Two points describe the edge through both (their
/// `angle` fields are ignored, the pair defines the slope).
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProfilePointSpec {
    pub azimuth: Option<f64>,
    pub elevation: f64,
    /// Explicit slope, profile-angle degrees per azimuth degree.
    pub angle: Option<f64>,
}

impl ShutterDocument {
    /// Read and parse the document at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] when the file cannot be read and
    /// [`ConfigError::Parse`] when it is not valid TOML.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        read_document(path)
    }

    /// Build the exposure catalog, validating the geometry of every
    /// shutter and the host item names.
    ///
    /// # Errors
    ///
    /// Returns the first [`ValidationError`] hit; the whole document
    /// is rejected.
    pub fn build_catalog(&self) -> Result<ExposureCatalog, ConfigError> {
        self.items.validate()?;
        let mut exposures = BTreeMap::new();
        for (shutter, spec) in &self.sun_exposure {
            if shutter.trim().is_empty() {
                return Err(ValidationError::EmptyItemName.into());
            }
            let exposure = spec.build().map_err(|err| {
                tracing::error!(shutter = %shutter, error = %err, "invalid sun exposure");
                err
            })?;
            exposures.insert(ShutterId::new(shutter.clone()), exposure);
        }
        Ok(ExposureCatalog::new(exposures))
    }
}

impl ExposureSpec {
    fn build(&self) -> Result<SunExposure, ValidationError> {
        let mut openings = Vec::with_capacity(self.openings.len());
        for opening in &self.openings {
            openings.push(Opening {
                azimuth: opening.azimuth,
                above: opening
                    .above
                    .as_deref()
                    .map(|points| build_profile(self.orientation, points))
                    .transpose()?,
                below: opening
                    .below
                    .as_deref()
                    .map(|points| build_profile(self.orientation, points))
                    .transpose()?,
            });
        }
        SunExposure::new(self.orientation, openings)
    }
}

fn build_profile(
    orientation: f64,
    points: &[ProfilePointSpec],
) -> Result<ShadeProfile, ValidationError> {
    match points {
        [point] => match (point.azimuth, point.angle) {
            (None, None) => Ok(ShadeProfile::horizon(point.elevation)),
            (None, Some(_)) => Err(ValidationError::SlopeWithoutAzimuth),
            (Some(azimuth), None) => Ok(ShadeProfile::level(orientation, azimuth, point.elevation)),
            (Some(azimuth), Some(slope)) => Ok(ShadeProfile::inclined(
                orientation,
                azimuth,
                point.elevation,
                slope,
            )),
        },
        [first, second] => {
            let (Some(first_az), Some(second_az)) = (first.azimuth, second.azimuth) else {
                return Err(ValidationError::PairWithoutAzimuth);
            };
            ShadeProfile::through(
                orientation,
                (first_az, first.elevation),
                (second_az, second.elevation),
            )
        }
        _ => Err(ValidationError::ProfilePointCount {
            count: points.len(),
        }),
    }
}

/// The schedule document.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScheduleDocument {
    #[serde(default)]
    pub calendar: Vec<CalendarEntrySpec>,
    /// Daily schedule name to the rule names it runs.
    #[serde(default)]
    pub daily_schedules: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub rules: BTreeMap<String, RuleSpec>,
}

/// One calendar line, selecting days by cron pattern or date range.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CalendarEntrySpec {
    pub desc: String,
    /// Day pattern `"dom month dow [year]"`.
    pub cron: Option<String>,
    pub timerange: Option<TimeRangeSpec>,
    pub daily_schedule: String,
}

/// Closed date range, inclusive on both ends.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TimeRangeSpec {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

/// One rule definition.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleSpec {
    #[serde(default)]
    pub desc: String,
    pub action: AutoState,
    /// Shutter ids the rule acts on.
    #[serde(default)]
    pub items: Vec<String>,
    #[serde(default)]
    pub forced: bool,
    #[serde(default)]
    pub triggers: Vec<Trigger>,
    #[serde(default)]
    pub conditions: Vec<Condition>,
}

/// The schedule document resolved into domain types.
#[derive(Debug, Clone)]
pub struct ScheduleSet {
    pub calendar: Calendar,
    pub schedules: DailySchedules,
    /// All defined rules by name, armed or not.
    pub rules: BTreeMap<String, Rule>,
}

impl ScheduleDocument {
    /// Read and parse the document at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] when the file cannot be read and
    /// [`ConfigError::Parse`] when it is not valid TOML.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        read_document(path)
    }

    /// Build the calendar, schedules and rules, validating every
    /// cross-reference eagerly.
    ///
    /// # Errors
    ///
    /// Returns the first [`ValidationError`] hit; the whole document
    /// is rejected.
    pub fn build(&self) -> Result<ScheduleSet, ConfigError> {
        let mut entries = Vec::with_capacity(self.calendar.len());
        for spec in &self.calendar {
            let entry = spec.build()?;
            if !self.daily_schedules.contains_key(&entry.daily_schedule) {
                return Err(ValidationError::UnknownDailySchedule {
                    entry: entry.description,
                    schedule: entry.daily_schedule,
                }
                .into());
            }
            entries.push(entry);
        }

        let mut rules = BTreeMap::new();
        for (name, spec) in &self.rules {
            rules.insert(name.clone(), spec.build(name)?);
        }

        let schedules = DailySchedules::new(self.daily_schedules.clone());
        schedules.validate_against(&rules)?;

        Ok(ScheduleSet {
            calendar: Calendar::new(entries),
            schedules,
            rules,
        })
    }
}

impl CalendarEntrySpec {
    fn build(&self) -> Result<CalendarEntry, ValidationError> {
        let selector = match (&self.cron, &self.timerange) {
            (Some(pattern), None) => DaySelector::Pattern {
                pattern: pattern.clone(),
            },
            (None, Some(range)) => DaySelector::Range {
                from: range.from,
                to: range.to,
            },
            _ => {
                return Err(ValidationError::AmbiguousDaySelector {
                    entry: self.desc.clone(),
                });
            }
        };
        let entry = CalendarEntry {
            description: self.desc.clone(),
            selector,
            daily_schedule: self.daily_schedule.clone(),
        };
        entry.validate()?;
        Ok(entry)
    }
}

impl RuleSpec {
    fn build(&self, name: &str) -> Result<Rule, ValidationError> {
        for item in &self.items {
            if item.trim().is_empty() {
                return Err(ValidationError::EmptyItemName);
            }
        }
        let mut builder = Rule::builder(name, self.action)
            .description(self.desc.clone())
            .shutters(self.items.iter().map(ShutterId::new))
            .forced(self.forced);
        for trigger in &self.triggers {
            builder = builder.trigger(trigger.clone());
        }
        for condition in &self.conditions {
            builder = builder.condition(condition.clone());
        }
        builder.build()
    }
}

fn read_document<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File I/O failure.
    #[error("failed to read {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// TOML parse failure.
    #[error("failed to parse {}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    /// Semantic validation failure.
    #[error(transparent)]
    Invalid(#[from] ValidationError),
}
