//! Shade profiles — the sky boundary cast by an occluding edge.
//!
//! A profile answers one question: at a given sun azimuth, above which
//! elevation does the sun clear the edge? Edges attached to a facade
//! (balconies, roof overhangs, the neighbouring house's ridge) are not
//! level in sky coordinates, so they are modelled through the *profile
//! angle*: the elevation of a point projected onto the vertical plane
//! perpendicular to the facade.
//!
//! For a facade with orientation `o`, a sun position at azimuth `a`
//! and elevation `e` has profile angle
//!
//! ```text
//! pa = atan(tan(e) / cos(a - o))
//! ```
//!
//! and, inversely, a sky boundary with profile angle `pa` sits at
//! elevation `atan(cos(a - o) * tan(pa))` when the sun stands at
//! azimuth `a`. A horizontal edge has a constant profile angle; an
//! inclined edge's profile angle changes linearly with azimuth.

use crate::error::ValidationError;

/// Elevation boundary cast by a single occluding edge, as a function
/// of sun azimuth. All angles are degrees.
#[derive(Debug, Clone, PartialEq)]
pub enum ShadeProfile {
    /// Flat boundary at a constant elevation, e.g. a distant tree line.
    Horizon { elevation: f64 },
    /// Horizontal edge in the facade plane, e.g. a balcony slab.
    Level { orientation: f64, angle: f64 },
    /// Inclined edge, e.g. the sloped ridge of a neighbouring roof.
    ///
    /// The profile angle grows by `slope` degrees per degree of
    /// azimuth, anchored at `angle` for sun azimuth `azimuth`.
    Inclined {
        orientation: f64,
        azimuth: f64,
        angle: f64,
        slope: f64,
    },
}

impl ShadeProfile {
    /// A constant-elevation boundary independent of the facade.
    #[must_use]
    pub fn horizon(elevation: f64) -> Self {
        Self::Horizon { elevation }
    }

    /// A horizontal edge, located by one observed sun position at
    /// which the sun grazed the edge.
    #[must_use]
    pub fn level(orientation: f64, azimuth: f64, elevation: f64) -> Self {
        Self::Level {
            orientation,
            angle: profile_angle(orientation, azimuth, elevation),
        }
    }

    /// An inclined edge, located by one observed grazing sun position
    /// and an explicit slope in profile-angle degrees per azimuth
    /// degree.
    #[must_use]
    pub fn inclined(orientation: f64, azimuth: f64, elevation: f64, slope: f64) -> Self {
        Self::Inclined {
            orientation,
            azimuth,
            angle: profile_angle(orientation, azimuth, elevation),
            slope,
        }
    }

    /// An inclined edge through two observed grazing sun positions,
    /// each given as `(azimuth, elevation)`.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::CoincidentReferences`] when both
    /// positions share an azimuth, leaving the slope undefined.
    pub fn through(
        orientation: f64,
        first: (f64, f64),
        second: (f64, f64),
    ) -> Result<Self, ValidationError> {
        let (az1, el1) = first;
        let (az2, el2) = second;
        if az1 == az2 {
            return Err(ValidationError::CoincidentReferences { azimuth: az1 });
        }
        let angle1 = profile_angle(orientation, az1, el1);
        let angle2 = profile_angle(orientation, az2, el2);
        Ok(Self::Inclined {
            orientation,
            azimuth: az1,
            angle: angle1,
            slope: (angle2 - angle1) / (az2 - az1),
        })
    }

    /// Elevation of the boundary when the sun stands at `sun_azimuth`.
    ///
    /// For a `Level` edge seen edge-on or from behind the result goes
    /// to zero and below; callers compare against it directly, so a
    /// negative boundary simply means the whole sky is on one side.
    /// An `Inclined` edge clamps its interpolated profile angle to
    /// `[0, 90]` first, pinning the boundary between ground level and
    /// zenith beyond the edge's ends.
    #[must_use]
    pub fn elevation_at(&self, sun_azimuth: f64) -> f64 {
        match self {
            Self::Horizon { elevation } => *elevation,
            Self::Level { orientation, angle } => {
                elevation_from_angle(*orientation, sun_azimuth, *angle)
            }
            Self::Inclined {
                orientation,
                azimuth,
                angle,
                slope,
            } => {
                let interpolated = angle + (sun_azimuth - azimuth) * slope;
                elevation_from_angle(*orientation, sun_azimuth, interpolated.clamp(0.0, 90.0))
            }
        }
    }
}

/// Profile angle of a sun position relative to a facade.
fn profile_angle(orientation: f64, azimuth: f64, elevation: f64) -> f64 {
    let offset = (azimuth - orientation).to_radians();
    (elevation.to_radians().tan() / offset.cos())
        .atan()
        .to_degrees()
}

/// Sun elevation at which a given profile angle is reached.
fn elevation_from_angle(orientation: f64, azimuth: f64, angle: f64) -> f64 {
    let offset = (azimuth - orientation).to_radians();
    (offset.cos() * angle.to_radians().tan())
        .atan()
        .to_degrees()
}
