mod analysis;
mod config;
mod demo;
mod engine;
mod ephemeris;
mod manager;
mod scene;
mod solar;
mod stats;
mod surface;
#[cfg(test)]
mod tests;
mod tracker;
mod weather;

use crate::config::Config;
use crate::manager::Manager;
use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveTime};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the interactive terminal demo.
    Demo {
        /// Optional TOML configuration; defaults apply without it.
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Record a headless run into a simulation directory.
    Run {
        #[arg(long)]
        sim_dir: PathBuf,

        /// Resume this run instead of creating a new one.
        #[arg(long)]
        run_idx: Option<usize>,
    },

    /// Aggregate yield and lock statistics over all recorded runs.
    Analyze {
        #[arg(long)]
        sim_dir: PathBuf,
    },

    /// Remove run directories, keeping the configuration.
    Clean {
        #[arg(long)]
        sim_dir: PathBuf,
    },

    /// Compute the closed-form sun position for a date, time and place.
    Sun {
        /// Calendar date, YYYY-MM-DD.
        #[arg(long)]
        date: String,

        /// Local clock time, HH:MM.
        #[arg(long)]
        time: String,

        /// Latitude in degrees, north positive.
        #[arg(long)]
        latitude: f64,

        /// Longitude in degrees, east positive.
        #[arg(long)]
        longitude: f64,

        /// Hours east of UTC.
        #[arg(long)]
        utc_offset: f64,
    },
}

fn main() {
    env_logger::Builder::new()
        .format_timestamp_millis()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    if let Err(error) = run_cli() {
        log::error!("{error:#?}");
        std::process::exit(1);
    }
}

fn run_cli() -> Result<()> {
    let args = Cli::parse();
    log::info!("{args:#?}");

    match args.command {
        Command::Demo { config } => {
            let cfg =
                Config::load_or_default(config.as_deref()).context("failed to load config")?;
            demo::run(cfg)
        }
        Command::Run { sim_dir, run_idx } => Manager::new(sim_dir)
            .context("failed to construct mgr")?
            .run_simulation(run_idx),
        Command::Analyze { sim_dir } => Manager::new(sim_dir)
            .context("failed to construct mgr")?
            .analyze_runs(),
        Command::Clean { sim_dir } => Manager::new(sim_dir)
            .context("failed to construct mgr")?
            .clean_sim(),
        Command::Sun {
            date,
            time,
            latitude,
            longitude,
            utc_offset,
        } => print_sun_position(&date, &time, latitude, longitude, utc_offset),
    }
}

fn print_sun_position(
    date: &str,
    time: &str,
    latitude: f64,
    longitude: f64,
    utc_offset: f64,
) -> Result<()> {
    let date = NaiveDate::parse_from_str(date, "%Y-%m-%d").context("failed to parse date")?;
    let time = NaiveTime::parse_from_str(time, "%H:%M").context("failed to parse time")?;

    let pos = ephemeris::sun_position_at(date, time, latitude, longitude, utc_offset);

    println!("Equation of Time: {:.2} min", pos.equation_of_time);
    println!("Declination: {:.2}°", pos.declination.to_degrees());
    println!("Time correction: {:.2} min", pos.time_offset);
    println!("True Solar Time: {:.2} min", pos.true_solar_time);
    println!("Hour angle: {:.2}°", pos.hour_angle);
    println!("Zenith angle: {:.2}°", pos.zenith);
    println!("Solar azimuth: {:.2}°", pos.azimuth);
    println!("Solar altitude: {:.2}°", pos.altitude);
    println!("Solar noon: {}", pos.solar_noon_hhmm());

    Ok(())
}
