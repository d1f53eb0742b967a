//! Sun geometry — positions, shade profiles, and window exposure.

pub mod exposure;
pub mod profile;

pub use exposure::{ExposureCatalog, Opening, SunExposure};
pub use profile::ShadeProfile;

/// Where the sun stands, in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SunPosition {
    /// Azimuth, clockwise from north, `[0, 360)`.
    pub azimuth: f64,
    /// Elevation above the horizon, negative below it.
    pub elevation: f64,
}

impl std::fmt::Display for SunPosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "az {:.1} el {:.1}", self.azimuth, self.elevation)
    }
}
