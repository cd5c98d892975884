//! Weather model: maps a weather mode and simulation time to the scalars the
//! trackers and the renderer consume.

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Simulated weather condition. Selected externally; read-only during a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeatherMode {
    Sunny,
    Cloudy,
    Dusty,
}

impl WeatherMode {
    /// Caption shown under the demo, matching the condition.
    pub fn caption(self) -> &'static str {
        match self {
            WeatherMode::Sunny => "Sunny conditions",
            WeatherMode::Cloudy => "Cloudy (sensor instability)",
            WeatherMode::Dusty => "Dusty (dirty sensor)",
        }
    }
}

/// Per-frame environment scalars, all in [0,1].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Environment {
    /// Usable irradiance after weather and day-elevation attenuation.
    pub irradiance: f64,
    /// Diffuse-light fraction blocking the sensor's reference.
    pub cloud_cover: f64,
    /// Optical contamination of the sensor aperture.
    pub sensor_contamination: f64,
}

/// Compute the environment for a weather mode at a fraction of the day.
///
/// Deterministic for identical inputs; the stochastic lock model keeps its
/// randomness to itself.
pub fn environment(mode: WeatherMode, day_fraction: f64) -> Environment {
    let (base_irradiance, cloud_cover, sensor_contamination) = match mode {
        WeatherMode::Sunny => (1.0, 0.0, 0.0),
        WeatherMode::Cloudy => (0.55, 0.7, 0.0),
        WeatherMode::Dusty => (0.85, 0.0, 0.9),
    };

    // Dawn and dusk stay dimmer regardless of weather.
    let day_factor = 0.65 + 0.35 * (PI * day_fraction).sin();

    Environment {
        irradiance: (base_irradiance * day_factor).clamp(0.0, 1.0),
        cloud_cover,
        sensor_contamination,
    }
}
