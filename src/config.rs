use crate::weather::WeatherMode;
use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::{fmt::Debug, fs, ops::RangeBounds, path::Path};

/// Demo configuration.
///
/// Loaded from a TOML file and validated before use; every table and key has
/// a default, so a missing file or a partial one means default values.
/// See [`Config::from_file`] for loading.
#[derive(Debug, PartialEq, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub model: ModelConfig,
    pub demo: DemoConfig,
    pub output: OutputConfig,
}

/// Simulation parameters.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Weather condition the simulation starts in.
    pub weather: WeatherMode,

    /// Wall-clock seconds one simulated day takes. Sanitized to a safe
    /// minimum by the engine rather than rejected here.
    pub seconds_per_day: f64,

    /// Seed for the lock state machine's rng. Absent means OS entropy.
    pub seed: Option<u64>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            weather: WeatherMode::Sunny,
            seconds_per_day: 12.0,
            seed: None,
        }
    }
}

/// Interactive front-end parameters.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DemoConfig {
    /// Redraw cap for the interactive demo.
    pub target_fps: f64,

    /// Upper bound on one wall-clock frame delta, in seconds.
    pub max_frame_delta: f64,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            target_fps: 30.0,
            max_frame_delta: 0.05,
        }
    }
}

/// Headless-run output parameters.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Fixed ticks per second of animation time for recorded runs.
    pub tick_rate: f64,

    /// Number of ticks between record saves.
    pub ticks_per_save: usize,

    /// Number of records written per file.
    pub saves_per_file: usize,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            tick_rate: 60.0,
            ticks_per_save: 32,
            saves_per_file: 64,
        }
    }
}

impl Config {
    /// Load a [`Config`] from a TOML file.
    ///
    /// Performs validation on all parameters before returning.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, deserialized, or if the
    /// configuration values are invalid.
    pub fn from_file<P: AsRef<Path>>(file: P) -> Result<Self> {
        let file = file.as_ref();
        let contents =
            fs::read_to_string(file).with_context(|| format!("failed to read {file:?}"))?;

        let config: Config = toml::from_str(&contents).context("failed to parse config")?;

        config.validate().context("failed to validate config")?;

        Ok(config)
    }

    /// Load from `file` when given, defaults otherwise.
    pub fn load_or_default(file: Option<&Path>) -> Result<Self> {
        match file {
            Some(file) => Self::from_file(file),
            None => Ok(Self::default()),
        }
    }

    fn validate(&self) -> Result<()> {
        check_num(self.demo.target_fps, 1.0..=240.0).context("invalid target fps")?;
        check_num(self.demo.max_frame_delta, 0.001..=0.5).context("invalid max frame delta")?;

        check_num(self.output.tick_rate, 20.0..=1000.0).context("invalid tick rate")?;
        check_num(self.output.ticks_per_save, 1..10_000)
            .context("invalid number of ticks per save")?;
        check_num(self.output.saves_per_file, 1..10_000)
            .context("invalid number of saves per file")?;

        Ok(())
    }
}

fn check_num<T, R>(num: T, range: R) -> Result<()>
where
    T: PartialOrd + Debug,
    R: RangeBounds<T> + Debug,
{
    if !range.contains(&num) {
        bail!("number must be in the range {range:?}, but is {num:?}");
    }
    Ok(())
}
