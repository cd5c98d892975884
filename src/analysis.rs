use crate::config::Config;
use crate::engine::Record;
use crate::stats::{Accumulator, AccumulatorReport};
use anyhow::{Context, Result};
use rmp_serde::{decode, encode};
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, BufWriter, Write},
    path::Path,
};

/// Strategy labels in record order.
const STRATEGIES: [&str; 3] = ["fixed", "sensor", "algorithmic"];

/// Aggregated results of one run.
#[derive(Debug, Serialize, Deserialize)]
pub struct AnalysisReport {
    /// Per-strategy yield statistics, in record order.
    pub yields: Vec<AccumulatorReport>,

    /// Fraction of samples with the sensor tracker locked.
    pub lock_duty: AccumulatorReport,

    /// Number of observed locked-to-lost transitions.
    pub loss_events: usize,
}

/// Aggregates recorded runs into yield and lock statistics.
pub struct Analyzer {
    cfg: Config,
    yield_accs: [Accumulator; 3],
    lock_acc: Accumulator,
    loss_events: usize,
    prev_locked: Option<bool>,
}

impl Analyzer {
    pub fn new(cfg: Config) -> Self {
        Self {
            cfg,
            yield_accs: std::array::from_fn(|_| Accumulator::new()),
            lock_acc: Accumulator::new(),
            loss_events: 0,
            prev_locked: None,
        }
    }

    /// Consume one records file.
    pub fn add_file<P: AsRef<Path>>(&mut self, file: P) -> Result<()> {
        let file = file.as_ref();
        let file = File::open(file).with_context(|| format!("failed to open {file:?}"))?;
        let mut reader = BufReader::new(file);

        for _ in 0..self.cfg.output.saves_per_file {
            let record: Record =
                decode::from_read(&mut reader).context("failed to read record")?;
            self.update(&record);
        }
        Ok(())
    }

    fn update(&mut self, record: &Record) {
        for (acc, val) in self.yield_accs.iter_mut().zip(record.yields) {
            acc.add(val);
        }

        self.lock_acc.add(if record.sensor_locked { 1.0 } else { 0.0 });
        if let Some(prev) = self.prev_locked {
            if prev && !record.sensor_locked {
                self.loss_events += 1;
            }
        }
        self.prev_locked = Some(record.sensor_locked);
    }

    pub fn report(&self) -> AnalysisReport {
        AnalysisReport {
            yields: self.yield_accs.iter().map(|acc| acc.report()).collect(),
            lock_duty: self.lock_acc.report(),
            loss_events: self.loss_events,
        }
    }

    /// Write the aggregated report to a binary file and log a summary.
    pub fn save_results<P: AsRef<Path>>(&self, file: P) -> Result<()> {
        let report = self.report();

        for (name, acc) in STRATEGIES.iter().zip(&report.yields) {
            log::info!(
                "{name}: mean yield {:.3} (σ {:.3}, range {:.3}..{:.3})",
                acc.mean,
                acc.std_dev,
                acc.min,
                acc.max
            );
        }
        log::info!(
            "sensor lock duty {:.3} over {} samples, {} loss events",
            report.lock_duty.mean,
            self.lock_acc.count(),
            report.loss_events
        );

        let file = file.as_ref();
        let file = File::create(file).with_context(|| format!("failed to create {file:?}"))?;
        let mut writer = BufWriter::new(file);
        encode::write(&mut writer, &report).context("failed to serialize report")?;
        writer.flush().context("failed to flush writer stream")?;

        Ok(())
    }
}
