//! Run driver.
//!
//! Owns the event loop: every raw event goes through the [`ResultCollector`]
//! once and the resulting record is handed to each registered [`Formatter`]
//! in turn. Consumers never see each other; they only share the collector's
//! ordered record sequence.

use crate::collector::{CollectorConfig, ResultCollector};
use crate::input::InputError;
use crate::models::{ExecutionRecord, Profile, RawEvent, RunStatistics};
use anyhow::{Context, Result};
use chrono::Utc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Read access to the finished run.
#[derive(Debug, Clone, Copy)]
pub struct RunContext<'a> {
    /// Every collected record, in arrival order.
    pub records: &'a [ExecutionRecord],
    pub statistics: RunStatistics,
}

/// A consumer of the record stream.
pub trait Formatter {
    /// Called once with the profile snapshot before any record.
    fn on_start(&mut self, _profiles: &[Profile]) -> Result<()> {
        Ok(())
    }

    /// Called for each record in arrival order.
    fn on_record(&mut self, record: &ExecutionRecord) -> Result<()>;

    /// Called once after the last record.
    fn on_stop(&mut self, _run: &RunContext<'_>) -> Result<()> {
        Ok(())
    }

    /// Called last; flush any pending output here.
    fn on_close(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Result of a completed run.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub records: Vec<ExecutionRecord>,
    pub statistics: RunStatistics,
    /// Input lines that could not be decoded.
    pub skipped_events: usize,
}

/// Drives one run over a fixed profile snapshot.
pub struct Driver {
    profiles: Vec<Profile>,
    collector: ResultCollector,
}

impl Driver {
    /// Snapshot `profiles`; later changes to the caller's copy are not observed.
    pub fn new(profiles: &[Profile], config: CollectorConfig) -> Self {
        Self {
            profiles: profiles.to_vec(),
            collector: ResultCollector::new(config, Utc::now()),
        }
    }

    /// Feed every event through the collector and all formatters.
    pub fn run<I>(mut self, events: I, formatters: &mut [&mut dyn Formatter]) -> Result<RunOutcome>
    where
        I: IntoIterator<Item = Result<RawEvent, InputError>>,
    {
        let started = Instant::now();
        info!(
            "Starting run with {} profiles and {} formatters",
            self.profiles.len(),
            formatters.len()
        );

        for formatter in formatters.iter_mut() {
            formatter.on_start(&self.profiles)?;
        }

        let mut skipped_events = 0;
        for event in events {
            let event = match event {
                Ok(event) => event,
                Err(e) => {
                    warn!("Skipping event: {}", e);
                    skipped_events += 1;
                    continue;
                }
            };

            let record = self.collector.ingest(event);
            for formatter in formatters.iter_mut() {
                formatter
                    .on_record(record)
                    .with_context(|| format!("Failed to report record {}", record.id))?;
            }
        }

        let statistics = RunStatistics {
            duration: started.elapsed().as_secs_f64(),
        };
        let run = RunContext {
            records: self.collector.records(),
            statistics,
        };
        debug!(
            "Run finished: {} records in {:.3}s",
            run.records.len(),
            statistics.duration
        );

        for formatter in formatters.iter_mut() {
            formatter.on_stop(&run)?;
        }
        for formatter in formatters.iter_mut() {
            formatter.on_close()?;
        }

        Ok(RunOutcome {
            records: self.collector.into_records(),
            statistics,
            skipped_events,
        })
    }
}
