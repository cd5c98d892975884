use crate::config::Config;
use crate::solar::{self, SunSample};
use crate::tracker::{self, Pose, Tracker};
use crate::weather::{self, Environment, WeatherMode};
use anyhow::{Context, Result};
use rand::prelude::*;
use rand_chacha::ChaCha12Rng;
use rmp_serde::{decode, encode};
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, BufWriter, Write},
    path::Path,
};

/// Card slot of the sensor strategy, the only one other components need to
/// single out (lock indicator, dirt overlay, lock statistics).
pub const SENSOR: usize = 1;

/// Floor applied to the seconds-per-day knob; keeps a misconfigured speed
/// from producing runaway simulated-time advancement.
pub const MIN_SECONDS_PER_DAY: f64 = 4.0;

/// Explicit simulation state, owned by the engine. Only the trackers carry
/// meaningful cross-frame memory; everything else is a control knob.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimState {
    /// Fraction of the simulated day in [0,1); wraps past 1.
    pub day_fraction: f64,
    pub weather: WeatherMode,
    pub seconds_per_day: f64,
    pub running: bool,
    /// Whether the demo viewport is on screen; time stops while it is not.
    pub visible: bool,
    /// Ticks advanced since the start of the run.
    pub step: usize,
    pub trackers: [Tracker; 3],
}

/// Read-only per-strategy slice of a [`Frame`].
#[derive(Debug, Clone, Copy)]
pub struct PanelFrame {
    pub name: &'static str,
    pub pose: Pose,
    pub yield_fraction: f64,
}

/// Read-only snapshot handed to the renderer each frame.
#[derive(Debug, Clone)]
pub struct Frame {
    pub day_fraction: f64,
    pub weather: WeatherMode,
    pub sun: SunSample,
    pub env: Environment,
    pub panels: [PanelFrame; 3],
}

/// One serialized sample of a recorded headless run.
#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub step: usize,
    pub day_fraction: f64,
    pub angles: [f64; 3],
    pub sensor_locked: bool,
    pub yields: [f64; 3],
}

/// Simulation engine.
///
/// Holds the configuration, current state, and random number generator, and
/// provides the tick operation, the external control operations, and
/// recorded headless runs.
#[derive(Serialize, Deserialize)]
pub struct Engine {
    cfg: Config,
    state: SimState,
    rng: ChaCha12Rng,
}

impl Engine {
    /// Create a new `Engine` in its initial state.
    ///
    /// The rng is seeded from the configuration when a seed is given, from
    /// OS entropy otherwise.
    pub fn new(cfg: Config) -> Result<Self> {
        let rng = match cfg.model.seed {
            Some(seed) => ChaCha12Rng::seed_from_u64(seed),
            None => ChaCha12Rng::try_from_os_rng()?,
        };

        let state = SimState {
            day_fraction: 0.0,
            weather: cfg.model.weather,
            seconds_per_day: sanitize_seconds_per_day(cfg.model.seconds_per_day),
            running: true,
            visible: true,
            step: 0,
            trackers: [Tracker::fixed(), Tracker::sensor(), Tracker::algorithmic()],
        };

        Ok(Self { cfg, state, rng })
    }

    pub fn cfg(&self) -> &Config {
        &self.cfg
    }

    pub fn state(&self) -> &SimState {
        &self.state
    }

    /// Advance by one host callback worth of wall-clock time and return the
    /// frame to draw.
    ///
    /// The delta is clamped so a stalled host (tab switch, suspended
    /// terminal) cannot cause a simulated-time jump. While paused or not
    /// visible the state is left untouched and the previous frame is
    /// returned for redrawing; elapsed offscreen time is simply not
    /// simulated.
    pub fn tick(&mut self, dt_seconds: f64) -> Result<Frame> {
        let dt = if dt_seconds.is_finite() {
            dt_seconds.clamp(0.0, self.cfg.demo.max_frame_delta)
        } else {
            0.0
        };

        self.advance(dt)?;

        Ok(self.frame())
    }

    fn advance(&mut self, dt: f64) -> Result<()> {
        if !(self.state.running && self.state.visible) || dt <= 0.0 {
            return Ok(());
        }

        let day_rate = 1.0 / self.state.seconds_per_day;
        self.state.day_fraction = (self.state.day_fraction + dt * day_rate).fract();

        let sun = solar::sun_position(self.state.day_fraction);
        let env = weather::environment(self.state.weather, self.state.day_fraction);

        for tracker in &mut self.state.trackers {
            tracker
                .step(&sun, &env, dt, &mut self.rng)
                .context("failed to step tracker")?;
        }

        self.state.step += 1;

        Ok(())
    }

    /// Snapshot the current state for rendering, without advancing it.
    pub fn frame(&self) -> Frame {
        let sun = solar::sun_position(self.state.day_fraction);
        let env = weather::environment(self.state.weather, self.state.day_fraction);

        let panels = self.state.trackers.each_ref().map(|t| {
            let pose = t.pose();
            PanelFrame {
                name: t.name(),
                pose,
                yield_fraction: tracker::yield_fraction(&sun, &env, &pose),
            }
        });

        Frame {
            day_fraction: self.state.day_fraction,
            weather: self.state.weather,
            sun,
            env,
            panels,
        }
    }

    /// Switch the weather condition.
    ///
    /// The sensor tracker is restored to a clean locked state so every
    /// condition starts from a comparable baseline.
    pub fn set_weather(&mut self, mode: WeatherMode) {
        self.state.weather = mode;
        self.state.trackers[SENSOR].reset();
    }

    /// Set the seconds-per-day rate, sanitized to a safe range.
    pub fn set_speed(&mut self, seconds_per_day: f64) {
        self.state.seconds_per_day = sanitize_seconds_per_day(seconds_per_day);
    }

    /// Toggle between running and paused; returns the new running flag.
    pub fn toggle_running(&mut self) -> bool {
        self.state.running = !self.state.running;
        self.state.running
    }

    /// Tell the engine whether its viewport is currently visible.
    pub fn set_visible(&mut self, visible: bool) {
        self.state.visible = visible;
    }

    /// Zero the simulated time and all tracker state. Weather and speed are
    /// control knobs, not state, and keep their values.
    pub fn reset(&mut self) {
        self.state.day_fraction = 0.0;
        self.state.step = 0;
        for tracker in &mut self.state.trackers {
            tracker.reset();
        }
    }

    /// Current state as a serializable record.
    pub fn record(&self) -> Record {
        let frame = self.frame();
        Record {
            step: self.state.step,
            day_fraction: self.state.day_fraction,
            angles: frame.panels.each_ref().map(|p| p.pose.angle),
            sensor_locked: !frame.panels[SENSOR].pose.status.is_fault(),
            yields: frame.panels.each_ref().map(|p| p.yield_fraction),
        }
    }

    /// Advance at the configured fixed tick rate and stream records to a
    /// binary file.
    pub fn record_run<P: AsRef<Path>>(&mut self, file: P) -> Result<()> {
        let file = file.as_ref();
        let file = File::create(file).with_context(|| format!("failed to create {file:?}"))?;
        let mut writer = BufWriter::new(file);

        let dt = 1.0 / self.cfg.output.tick_rate;

        for i_save in 0..self.cfg.output.saves_per_file {
            for _ in 0..self.cfg.output.ticks_per_save {
                self.advance(dt).context("failed to advance simulation")?;
            }

            encode::write(&mut writer, &self.record()).context("failed to serialize record")?;

            let progress = 100.0 * (i_save + 1) as f64 / self.cfg.output.saves_per_file as f64;
            log::info!("completed {progress:06.2}%");
        }

        writer.flush().context("failed to flush writer stream")?;

        Ok(())
    }

    /// Save a checkpoint of the entire engine state.
    ///
    /// Can be used to resume the run later.
    pub fn save_checkpoint<P: AsRef<Path>>(&self, file: P) -> Result<()> {
        let file = file.as_ref();
        let file = File::create(file).with_context(|| format!("failed to create {file:?}"))?;
        let mut writer = BufWriter::new(file);
        encode::write(&mut writer, &self).context("failed to serialize engine")?;
        Ok(())
    }

    /// Load a previously saved engine checkpoint.
    pub fn load_checkpoint<P: AsRef<Path>>(file: P) -> Result<Self> {
        let file = file.as_ref();
        let file = File::open(file).with_context(|| format!("failed to open {file:?}"))?;
        let mut reader = BufReader::new(file);
        let engine = decode::from_read(&mut reader).context("failed to deserialize engine")?;
        Ok(engine)
    }
}

fn sanitize_seconds_per_day(seconds_per_day: f64) -> f64 {
    if seconds_per_day.is_finite() {
        seconds_per_day.max(MIN_SECONDS_PER_DAY)
    } else {
        MIN_SECONDS_PER_DAY
    }
}

/// Accumulator-based redraw throttle.
///
/// Elapsed time piles up until a full frame interval has passed; the
/// remainder carries forward so the average rate converges on the target,
/// but never more than one interval so a long stall cannot queue a burst of
/// frames.
#[derive(Debug)]
pub struct FramePacer {
    interval: f64,
    accumulated: f64,
}

impl FramePacer {
    pub fn new(target_fps: f64) -> Self {
        Self {
            interval: 1.0 / target_fps.max(1.0),
            accumulated: 0.0,
        }
    }

    pub fn interval(&self) -> f64 {
        self.interval
    }

    /// Add elapsed seconds; report whether a frame is due.
    pub fn ready(&mut self, elapsed: f64) -> bool {
        if elapsed.is_finite() {
            self.accumulated += elapsed.max(0.0);
        }
        if self.accumulated < self.interval {
            return false;
        }
        self.accumulated = (self.accumulated - self.interval).min(self.interval);
        true
    }
}
