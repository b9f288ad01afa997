//! Result collector for normalizing raw engine events.
//!
//! Every event becomes one [`ExecutionRecord`] appended to a single ordered
//! sequence that all report consumers read from.

use crate::models::{ExceptionInfo, ExecutionRecord, RawEvent, RecordStatus, Status};
use chrono::{DateTime, Utc};
use tracing::trace;

/// Configuration for event normalization.
#[derive(Debug, Clone)]
pub struct CollectorConfig {
    /// Exception class names treated as plain assertion failures.
    pub assertion_classes: Vec<String>,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            assertion_classes: vec![
                "ExpectationNotMetError",
                "AssertionError",
                "AssertionFailedError",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
        }
    }
}

impl From<&crate::config::CollectorSettings> for CollectorConfig {
    fn from(settings: &crate::config::CollectorSettings) -> Self {
        Self {
            assertion_classes: settings.assertion_classes.clone(),
        }
    }
}

/// Append-only collector of normalized records.
#[derive(Debug, Clone)]
pub struct ResultCollector {
    config: CollectorConfig,
    run_start: DateTime<Utc>,
    records: Vec<ExecutionRecord>,
}

impl ResultCollector {
    /// Create a collector. `run_start` stands in for events without a start time.
    pub fn new(config: CollectorConfig, run_start: DateTime<Utc>) -> Self {
        Self {
            config,
            run_start,
            records: Vec::new(),
        }
    }

    /// Records collected so far, in arrival order.
    pub fn records(&self) -> &[ExecutionRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<ExecutionRecord> {
        self.records
    }

    /// Normalize an event and append it to the sequence.
    pub fn ingest(&mut self, event: RawEvent) -> &ExecutionRecord {
        let record = self.normalize(event);
        trace!("Collected record {} ({})", record.id, record.status);
        self.records.push(record);
        &self.records[self.records.len() - 1]
    }

    fn normalize(&self, event: RawEvent) -> ExecutionRecord {
        let mut record = ExecutionRecord {
            id: event.id,
            profile_id: event.profile_id,
            status: RecordStatus::from(event.status),
            code_desc: event.code_desc,
            message: None,
            exception: None,
            skip_message: event.skip_message,
            resource: event.resource,
            start_time: event.start_time.unwrap_or(self.run_start),
            run_time: event.run_time,
            status_type: None,
        };

        if event.status == Status::Pending {
            record.skip_message = event.description.or(record.skip_message);
            record.resource = event.described_class.or(record.resource);
        }

        if let Some(exception) = event.exception {
            record.message = Some(exception.message);
            if !self.is_assertion(&exception.class) {
                record.exception = Some(ExceptionInfo {
                    class: exception.class,
                    backtrace: exception.backtrace,
                });
            }
        }

        record
    }

    /// Check whether an exception class is an assertion-style failure.
    fn is_assertion(&self, class: &str) -> bool {
        let short = class.rsplit(|c: char| c == ':' || c == '.').next().unwrap_or(class);
        self.config
            .assertion_classes
            .iter()
            .any(|candidate| candidate == class || candidate == short)
    }
}
