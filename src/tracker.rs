//! Tracking strategy set: the three panel controllers and their shared yield
//! metric.
//!
//! The strategies form a closed set of variants stepped uniformly by the
//! engine. Only the sensor strategy is stochastic; its lock transitions are
//! sampled from the engine's seeded rng with probabilities expressed per
//! second of animation time, so behavior does not depend on the tick rate.

use crate::solar::{self, SunSample};
use crate::weather::Environment;
use anyhow::Result;
use rand::prelude::*;
use rand_chacha::ChaCha12Rng;
use rand_distr::Bernoulli;
use serde::{Deserialize, Serialize};
use std::f64::consts::TAU;

/// Tilt of the fixed panel.
const FIXED_TILT_DEG: f64 = 20.0;

/// First-order smoothing rates (per second). `α = 1 − exp(−rate·dt)`.
const LOCKED_SMOOTH_RATE: f64 = 5.0;
const HUNT_SMOOTH_RATE: f64 = 3.6;
const ALGO_SMOOTH_RATE: f64 = 12.0;

/// Hunting sweep performed while the sensor has lost lock.
const HUNT_AMPLITUDE_DEG: f64 = 35.0;
const HUNT_PHASE_RATE: f64 = 6.0;

/// Lock-transition rates (per second), scaled by loss pressure.
const LOSS_RATE: f64 = 0.25;
const REGAIN_RATE: f64 = 1.5;

/// The sun counts as "low" below this elevation proxy.
const LOW_SUN_Y: f64 = 0.25;
const LOW_SUN_PRESSURE: f64 = 0.25;
const LOW_SUN_REGAIN_SCALE: f64 = 0.35;

/// Weight of cloud cover and contamination in the loss pressure.
const WEATHER_PRESSURE_WEIGHT: f64 = 0.95;

/// Bounded deterministic residual of the algorithmic controller.
const RESIDUAL_AMPLITUDE_DEG: f64 = 1.2;
const RESIDUAL_CYCLES_PER_DAY: f64 = 9.0;

/// Below this elevation proxy the sun is treated as set and yield is zero.
pub const HORIZON_Y: f64 = 0.02;

/// Extra misalignment penalty on the sensor strategy's yield while hunting.
const LOST_YIELD_PENALTY: f64 = 0.35;

/// Status reported by a strategy alongside its angle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrackerStatus {
    /// Fixed panel: nothing to track, nothing to fail.
    Ok,
    /// Sensor strategy actively following the sun.
    Tracking,
    /// Sensor strategy hunting for its reference.
    Lost,
    /// Algorithmic strategy; driven by a computed ephemeris, never faults.
    Locked,
}

impl TrackerStatus {
    pub fn label(self) -> &'static str {
        match self {
            TrackerStatus::Ok => "OK",
            TrackerStatus::Tracking => "TRACKING",
            TrackerStatus::Lost => "LOST",
            TrackerStatus::Locked => "LOCKED",
        }
    }

    pub fn is_fault(self) -> bool {
        self == TrackerStatus::Lost
    }
}

/// Orientation and status computed by a strategy for one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    /// Panel orientation, radians from vertical-up.
    pub angle: f64,
    pub status: TrackerStatus,
}

/// One panel-orientation strategy with whatever state it carries across
/// frames.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Tracker {
    Fixed,
    Sensor {
        angle: f64,
        locked: bool,
        hunt_phase: f64,
    },
    Algorithmic {
        angle: f64,
    },
}

impl Tracker {
    pub fn fixed() -> Self {
        Tracker::Fixed
    }

    pub fn sensor() -> Self {
        Tracker::Sensor {
            angle: 0.0,
            locked: true,
            hunt_phase: 0.0,
        }
    }

    pub fn algorithmic() -> Self {
        Tracker::Algorithmic { angle: 0.0 }
    }

    /// Display name of the strategy's panel card.
    pub fn name(&self) -> &'static str {
        match self {
            Tracker::Fixed => "Fixed Panel",
            Tracker::Sensor { .. } => "Sensor Tracker",
            Tracker::Algorithmic { .. } => "SUNFLOWER",
        }
    }

    /// Current pose without advancing any state.
    pub fn pose(&self) -> Pose {
        match self {
            Tracker::Fixed => Pose {
                angle: FIXED_TILT_DEG.to_radians(),
                status: TrackerStatus::Ok,
            },
            Tracker::Sensor { angle, locked, .. } => Pose {
                angle: *angle,
                status: if *locked {
                    TrackerStatus::Tracking
                } else {
                    TrackerStatus::Lost
                },
            },
            Tracker::Algorithmic { angle } => Pose {
                angle: *angle,
                status: TrackerStatus::Locked,
            },
        }
    }

    /// Restore the strategy to its initial state.
    pub fn reset(&mut self) {
        *self = match self {
            Tracker::Fixed => Tracker::fixed(),
            Tracker::Sensor { .. } => Tracker::sensor(),
            Tracker::Algorithmic { .. } => Tracker::algorithmic(),
        };
    }

    /// Advance the strategy by `dt` seconds of animation time and return the
    /// resulting pose.
    pub fn step(
        &mut self,
        sun: &SunSample,
        env: &Environment,
        dt: f64,
        rng: &mut ChaCha12Rng,
    ) -> Result<Pose> {
        match self {
            Tracker::Fixed => {}
            Tracker::Sensor {
                angle,
                locked,
                hunt_phase,
            } => {
                let pressure = loss_pressure(sun, env);

                if *locked {
                    let p = transition_probability(LOSS_RATE * pressure, dt);
                    if Bernoulli::new(p)?.sample(rng) {
                        *locked = false;
                    }
                } else {
                    let mut rate = REGAIN_RATE * (1.0 - pressure);
                    if sun.y_norm < LOW_SUN_Y {
                        rate *= LOW_SUN_REGAIN_SCALE;
                    }
                    let p = transition_probability(rate, dt);
                    if Bernoulli::new(p)?.sample(rng) {
                        *locked = true;
                    }
                }

                if *locked {
                    let target = solar::target_angle(sun);
                    *angle = smooth(*angle, target, LOCKED_SMOOTH_RATE, dt);
                } else {
                    *hunt_phase += HUNT_PHASE_RATE * dt;
                    let hunt = hunt_phase.sin() * HUNT_AMPLITUDE_DEG.to_radians();
                    *angle = smooth(*angle, hunt, HUNT_SMOOTH_RATE, dt);
                }
            }
            Tracker::Algorithmic { angle } => {
                let residual = RESIDUAL_AMPLITUDE_DEG.to_radians()
                    * (RESIDUAL_CYCLES_PER_DAY * TAU * sun.x_norm).sin();
                let target = solar::target_angle(sun) + residual;
                *angle = smooth(*angle, target, ALGO_SMOOTH_RATE, dt);
            }
        }

        Ok(self.pose())
    }
}

/// Composite scalar in [0,1] governing how likely the sensor strategy is to
/// lose its reference and how unlikely it is to get it back.
pub fn loss_pressure(sun: &SunSample, env: &Environment) -> f64 {
    let low_sun = if sun.y_norm < LOW_SUN_Y {
        LOW_SUN_PRESSURE
    } else {
        0.0
    };
    let weather = WEATHER_PRESSURE_WEIGHT * (env.cloud_cover + env.sensor_contamination);
    (weather + low_sun).clamp(0.0, 1.0)
}

/// Instantaneous energy-capture fraction for a pose.
///
/// Identical for all three strategies so the comparison stays meaningful:
/// geometric cosine alignment times irradiance, exactly zero with the sun
/// at or below the horizon threshold, with the extra hunting penalty applied
/// to a lost sensor.
pub fn yield_fraction(sun: &SunSample, env: &Environment, pose: &Pose) -> f64 {
    if sun.y_norm <= HORIZON_Y {
        return 0.0;
    }

    let alignment = (solar::target_angle(sun) - pose.angle).cos().clamp(0.0, 1.0);
    let penalty = if pose.status.is_fault() {
        LOST_YIELD_PENALTY
    } else {
        1.0
    };

    (alignment * env.irradiance * penalty).clamp(0.0, 1.0)
}

/// First-order low-pass toward `target`, frame-rate independent.
fn smooth(current: f64, target: f64, rate: f64, dt: f64) -> f64 {
    current + (target - current) * (1.0 - (-rate * dt).exp())
}

/// Probability of a transition firing within `dt` given a rate per second.
///
/// Clamped to [0,1] before use as a probability.
fn transition_probability(rate: f64, dt: f64) -> f64 {
    (1.0 - (-rate.max(0.0) * dt).exp()).clamp(0.0, 1.0)
}
