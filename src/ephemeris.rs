//! Closed-form sun-position arithmetic (NOAA-style harmonic approximations).
//!
//! Stateless and exact-input deterministic; the animated demo uses the
//! simplified arc in [`crate::solar`] instead and does not depend on this
//! module.

use chrono::{Datelike, NaiveDate, NaiveTime, Timelike};
use std::f64::consts::TAU;

/// Full sun-position solution for one instant and place.
#[derive(Debug, Clone, PartialEq)]
pub struct SunPosition {
    /// Equation of time, minutes.
    pub equation_of_time: f64,
    /// Solar declination, radians.
    pub declination: f64,
    /// Clock-to-solar time correction, minutes.
    pub time_offset: f64,
    /// True solar time, minutes after local midnight.
    pub true_solar_time: f64,
    /// Hour angle, degrees (0 at solar noon).
    pub hour_angle: f64,
    /// Zenith angle, degrees.
    pub zenith: f64,
    /// Azimuth, degrees clockwise from north in [0,360).
    pub azimuth: f64,
    /// Altitude above the horizon, degrees.
    pub altitude: f64,
    /// Solar noon, minutes after local midnight.
    pub solar_noon: f64,
}

impl SunPosition {
    /// Solar noon formatted as HH:MM local clock time.
    pub fn solar_noon_hhmm(&self) -> String {
        let minutes = self.solar_noon.rem_euclid(24.0 * 60.0);
        format!(
            "{:02}:{:02}",
            (minutes / 60.0).floor() as u32,
            (minutes % 60.0).floor() as u32
        )
    }
}

/// Compute the sun position for a local date and time at the given latitude
/// and longitude (degrees, east positive) and UTC offset (hours).
pub fn sun_position_at(
    date: NaiveDate,
    time: NaiveTime,
    latitude: f64,
    longitude: f64,
    utc_offset: f64,
) -> SunPosition {
    let day = date.ordinal() as f64;
    let hour = time.hour() as f64;
    let minute = time.minute() as f64;
    let second = time.second() as f64;

    // Fractional year: the annual cycle mapped onto one turn.
    let gamma = TAU / 365.0 * (day - 1.0 + (hour - 12.0) / 24.0);

    let equation_of_time = 229.18
        * (0.000075 + 0.001868 * gamma.cos()
            - 0.032077 * gamma.sin()
            - 0.014615 * (2.0 * gamma).cos()
            - 0.040849 * (2.0 * gamma).sin());

    let declination = 0.006918 - 0.399912 * gamma.cos() + 0.070257 * gamma.sin()
        - 0.006758 * (2.0 * gamma).cos()
        + 0.000907 * (2.0 * gamma).sin()
        - 0.002697 * (3.0 * gamma).cos()
        + 0.00148 * (3.0 * gamma).sin();

    let time_offset = equation_of_time + 4.0 * longitude - 60.0 * utc_offset;
    let true_solar_time = hour * 60.0 + minute + second / 60.0 + time_offset;
    let hour_angle = true_solar_time / 4.0 - 180.0;

    let ha_rad = hour_angle.to_radians();
    let lat_rad = latitude.to_radians();

    let cos_zenith = (lat_rad.sin() * declination.sin()
        + lat_rad.cos() * declination.cos() * ha_rad.cos())
    .clamp(-1.0, 1.0);
    let zenith_rad = cos_zenith.acos();
    let zenith = zenith_rad.to_degrees();
    let altitude = 90.0 - zenith;

    let sin_zenith = zenith_rad.sin();
    let mut azimuth = 0.0;
    if sin_zenith > 1e-8 {
        let sin_az = -(lat_rad.sin() * declination.cos()
            - declination.sin() * lat_rad.cos() * ha_rad.cos())
            / sin_zenith;
        let cos_az = (declination.sin() - lat_rad.sin() * cos_zenith) / (lat_rad.cos() * sin_zenith);
        azimuth = sin_az.atan2(cos_az).to_degrees();
        if azimuth < 0.0 {
            azimuth += 360.0;
        }
    }

    let solar_noon = 720.0 - 4.0 * longitude - equation_of_time;

    SunPosition {
        equation_of_time,
        declination,
        time_offset,
        true_solar_time,
        hour_angle,
        zenith,
        azimuth,
        altitude,
        solar_noon,
    }
}
