//! Solar geometry for the tracking demo.
//!
//! This is the simplified single-arc model the demo animates: the sun sweeps
//! linearly across the sky while its elevation follows a half-sine. The
//! astronomically exact closed form lives in [`crate::ephemeris`].

use std::f64::consts::PI;

/// Normalized sun position for a fraction of the simulated day.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SunSample {
    /// Horizontal progress across the sky arc, in [0,1].
    pub x_norm: f64,
    /// Elevation proxy, in [0,1]: 0 at the horizon, 1 at the peak.
    pub y_norm: f64,
}

/// Half-width of the angular sweep the sun's horizontal position maps to.
const SWEEP_HALF_DEG: f64 = 60.0;

/// Compute the sun position for `day_fraction` in [0,1).
///
/// Total over its domain; `y_norm` is 0 at both ends of the day and peaks at
/// `day_fraction = 0.5`.
pub fn sun_position(day_fraction: f64) -> SunSample {
    SunSample {
        x_norm: day_fraction,
        y_norm: (PI * day_fraction).sin(),
    }
}

/// Orientation angle (radians) a perfectly aimed panel would take for `sun`.
///
/// Linear in the horizontal position, spanning −60° at sunrise to +60° at
/// sunset. Both the sensor and algorithmic strategies steer toward this; the
/// yield metric measures misalignment against it.
pub fn target_angle(sun: &SunSample) -> f64 {
    (-SWEEP_HALF_DEG + 2.0 * SWEEP_HALF_DEG * sun.x_norm).to_radians()
}
