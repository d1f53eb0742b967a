//! Sun exposure — which sun positions actually reach a window.
//!
//! A facade is described as a sequence of azimuth sections. Each
//! section either admits the sun, optionally bounded by shade profiles
//! above and below, or blocks it entirely. The sections are derived
//! from the configured openings: an opening starts at its boundary
//! azimuth and runs until the next opening's boundary. The last
//! boundary closes the facade, so azimuths past it are always shaded.

use std::collections::BTreeMap;

use crate::error::ValidationError;
use crate::item::ShutterId;
use crate::sun::SunPosition;
use crate::sun::profile::ShadeProfile;

/// One sunlit azimuth section of a facade.
#[derive(Debug, Clone, PartialEq)]
pub struct Opening {
    /// Sun azimuth at which this section begins.
    pub azimuth: f64,
    /// Boundary the sun must stay above to reach the window.
    pub above: Option<ShadeProfile>,
    /// Boundary the sun must stay below to reach the window.
    pub below: Option<ShadeProfile>,
}

impl Opening {
    /// An unobstructed section starting at `azimuth`.
    #[must_use]
    pub fn unobstructed(azimuth: f64) -> Self {
        Self {
            azimuth,
            above: None,
            below: None,
        }
    }

    fn admits(&self, position: SunPosition) -> bool {
        if let Some(above) = &self.above {
            if position.elevation <= above.elevation_at(position.azimuth) {
                return false;
            }
        }
        if let Some(below) = &self.below {
            if position.elevation >= below.elevation_at(position.azimuth) {
                return false;
            }
        }
        true
    }
}

/// Sun exposure model of one shutter's window.
#[derive(Debug, Clone, PartialEq)]
pub struct SunExposure {
    orientation: f64,
    openings: Vec<Opening>,
}

impl SunExposure {
    /// Build an exposure from a facade orientation and its openings.
    /// Openings may be given in any order; they are kept sorted by
    /// boundary azimuth.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::DuplicateBoundary`] when two
    /// openings start at the same azimuth.
    pub fn new(orientation: f64, mut openings: Vec<Opening>) -> Result<Self, ValidationError> {
        openings.sort_by(|a, b| a.azimuth.total_cmp(&b.azimuth));
        for pair in openings.windows(2) {
            if pair[0].azimuth == pair[1].azimuth {
                return Err(ValidationError::DuplicateBoundary {
                    azimuth: pair[0].azimuth,
                });
            }
        }
        Ok(Self {
            orientation,
            openings,
        })
    }

    /// Facade orientation in degrees, clockwise from north.
    #[must_use]
    pub fn orientation(&self) -> f64 {
        self.orientation
    }

    /// Whether the sun at `position` shines through this facade.
    ///
    /// The section in effect is the one with the greatest boundary
    /// azimuth not exceeding the sun azimuth. Before the first
    /// boundary, and from the last boundary on, the facade is shaded.
    #[must_use]
    pub fn is_sunlit(&self, position: SunPosition) -> bool {
        let mut active: Option<(usize, &Opening)> = None;
        for (index, opening) in self.openings.iter().enumerate() {
            if opening.azimuth > position.azimuth {
                break;
            }
            active = Some((index, opening));
        }
        let Some((index, opening)) = active else {
            return false;
        };
        if index == self.openings.len() - 1 {
            return false;
        }
        opening.admits(position)
    }
}

/// All configured shutters and their exposure models, keyed by
/// shutter id. Iteration order is the id order, which keeps log
/// output stable across runs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExposureCatalog {
    exposures: BTreeMap<ShutterId, SunExposure>,
}

impl ExposureCatalog {
    #[must_use]
    pub fn new(exposures: BTreeMap<ShutterId, SunExposure>) -> Self {
        Self { exposures }
    }

    #[must_use]
    pub fn get(&self, shutter: &ShutterId) -> Option<&SunExposure> {
        self.exposures.get(shutter)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ShutterId, &SunExposure)> {
        self.exposures.iter()
    }

    pub fn shutters(&self) -> impl Iterator<Item = &ShutterId> {
        self.exposures.keys()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.exposures.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.exposures.is_empty()
    }
}

impl FromIterator<(ShutterId, SunExposure)> for ExposureCatalog {
    fn from_iter<T: IntoIterator<Item = (ShutterId, SunExposure)>>(iter: T) -> Self {
        Self {
            exposures: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(azimuth: f64, elevation: f64) -> SunPosition {
        SunPosition {
            azimuth,
            elevation,
        }
    }

    /// A south-west facade with a balcony slab above the window, a
    /// neighbouring roof cutting in before the corner, and a wall
    /// closing it at 330 degrees.
    fn balcony_facade() -> SunExposure {
        let balcony = ShadeProfile::level(240.0, 240.0, 60.0);
        SunExposure::new(
            240.0,
            vec![
                Opening {
                    azimuth: 160.0,
                    above: Some(ShadeProfile::horizon(5.0)),
                    below: Some(balcony.clone()),
                },
                Opening {
                    azimuth: 240.0,
                    above: Some(ShadeProfile::horizon(3.0)),
                    below: Some(balcony),
                },
                Opening::unobstructed(330.0),
            ],
        )
        .unwrap()
    }

    #[test]
    fn should_shade_before_the_first_boundary() {
        assert!(!balcony_facade().is_sunlit(at(159.0, 9.0)));
    }

    #[test]
    fn should_light_inside_first_section_between_bounds() {
        let facade = balcony_facade();
        assert!(facade.is_sunlit(at(161.0, 15.0)));
        assert!(facade.is_sunlit(at(161.0, 6.0)));
    }

    #[test]
    fn should_shade_below_the_lower_bound() {
        assert!(!balcony_facade().is_sunlit(at(161.0, 4.0)));
    }

    #[test]
    fn should_light_second_section_up_to_the_balcony_edge() {
        let facade = balcony_facade();
        assert!(facade.is_sunlit(at(241.0, 58.0)));
        assert!(!facade.is_sunlit(at(241.0, 62.0)));
    }

    #[test]
    fn should_use_second_section_bounds_after_its_boundary() {
        let facade = balcony_facade();
        // 4 degrees clears the 3 degree horizon of the second section
        // even though the first section required 5.
        assert!(facade.is_sunlit(at(241.0, 4.0)));
        assert!(facade.is_sunlit(at(325.0, 4.0)));
    }

    #[test]
    fn should_shade_from_the_last_boundary_on() {
        assert!(!balcony_facade().is_sunlit(at(331.0, 4.0)));
    }

    #[test]
    fn should_light_everything_in_an_unbounded_section() {
        let facade = SunExposure::new(
            240.0,
            vec![Opening::unobstructed(160.0), Opening::unobstructed(330.0)],
        )
        .unwrap();
        assert!(facade.is_sunlit(at(200.0, 9.0)));
    }

    #[test]
    fn should_shade_everywhere_without_openings() {
        let facade = SunExposure::new(240.0, Vec::new()).unwrap();
        assert!(!facade.is_sunlit(at(200.0, 30.0)));
    }

    #[test]
    fn should_treat_boundary_azimuth_as_inside_the_section() {
        let facade = SunExposure::new(
            240.0,
            vec![Opening::unobstructed(160.0), Opening::unobstructed(330.0)],
        )
        .unwrap();
        assert!(facade.is_sunlit(at(160.0, 10.0)));
        assert!(!facade.is_sunlit(at(330.0, 10.0)));
    }

    #[test]
    fn should_sort_openings_given_out_of_order() {
        let facade = SunExposure::new(
            240.0,
            vec![
                Opening::unobstructed(330.0),
                Opening::unobstructed(160.0),
                Opening {
                    azimuth: 240.0,
                    above: Some(ShadeProfile::horizon(3.0)),
                    below: None,
                },
            ],
        )
        .unwrap();
        assert!(facade.is_sunlit(at(200.0, 9.0)));
        assert!(!facade.is_sunlit(at(241.0, 2.0)));
    }

    #[test]
    fn should_reject_duplicate_boundaries() {
        let result = SunExposure::new(
            240.0,
            vec![Opening::unobstructed(160.0), Opening::unobstructed(160.0)],
        );
        assert!(matches!(
            result,
            Err(ValidationError::DuplicateBoundary { .. })
        ));
    }

    #[test]
    fn should_look_up_catalog_by_shutter_id() {
        let catalog: ExposureCatalog = [
            (ShutterId::new("shutter_kitchen"), balcony_facade()),
            (
                ShutterId::new("shutter_parents"),
                SunExposure::new(180.0, Vec::new()).unwrap(),
            ),
        ]
        .into_iter()
        .collect();
        assert_eq!(catalog.len(), 2);
        assert!(catalog.get(&ShutterId::new("shutter_kitchen")).is_some());
        assert!(catalog.get(&ShutterId::new("shutter_attic")).is_none());
    }

    #[test]
    fn should_iterate_catalog_in_id_order() {
        let catalog: ExposureCatalog = [
            (
                ShutterId::new("shutter_b"),
                SunExposure::new(0.0, Vec::new()).unwrap(),
            ),
            (
                ShutterId::new("shutter_a"),
                SunExposure::new(0.0, Vec::new()).unwrap(),
            ),
        ]
        .into_iter()
        .collect();
        let ids: Vec<_> = catalog.shutters().map(ShutterId::as_str).collect();
        assert_eq!(ids, vec!["shutter_a", "shutter_b"]);
    }
}
