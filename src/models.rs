//! Data models for the report engine.
//!
//! This module contains the core data structures shared by the collector,
//! the aggregation engine and both report consumers: raw engine events,
//! normalized execution records, and profile/control definitions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Status reported by the test engine for a finished example.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Passed,
    Failed,
    Pending,
    Skipped,
}

/// Canonical status of an execution record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    Passed,
    Failed,
    Skipped,
}

impl From<Status> for RecordStatus {
    fn from(status: Status) -> Self {
        match status {
            Status::Passed => RecordStatus::Passed,
            Status::Failed => RecordStatus::Failed,
            Status::Pending | Status::Skipped => RecordStatus::Skipped,
        }
    }
}

impl fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordStatus::Passed => write!(f, "passed"),
            RecordStatus::Failed => write!(f, "failed"),
            RecordStatus::Skipped => write!(f, "skipped"),
        }
    }
}

/// Classified label of a record or control after impact bucketing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusType {
    Unknown,
    Passed,
    Skipped,
    /// Failure with impact below 0.4
    Minor,
    /// Failure with impact in [0.4, 0.7)
    Major,
    /// Failure without a declared impact
    Failed,
    /// Failure with impact of 0.7 or more
    Critical,
}

impl StatusType {
    /// Numeric rank used for severity upgrades.
    ///
    /// `Failed` sits between `Major` and `Critical`, so a later critical
    /// result still overrides an impact-less failure but a major one does not.
    pub fn rank(self) -> f64 {
        match self {
            StatusType::Unknown => -3.0,
            StatusType::Passed => -2.0,
            StatusType::Skipped => -1.0,
            StatusType::Minor => 1.0,
            StatusType::Major => 2.0,
            StatusType::Failed => 2.5,
            StatusType::Critical => 3.0,
        }
    }

    /// Lowercase wire label.
    pub fn label(self) -> &'static str {
        match self {
            StatusType::Unknown => "unknown",
            StatusType::Passed => "passed",
            StatusType::Skipped => "skipped",
            StatusType::Minor => "minor",
            StatusType::Major => "major",
            StatusType::Failed => "failed",
            StatusType::Critical => "critical",
        }
    }
}

impl From<RecordStatus> for StatusType {
    fn from(status: RecordStatus) -> Self {
        match status {
            RecordStatus::Passed => StatusType::Passed,
            RecordStatus::Failed => StatusType::Failed,
            RecordStatus::Skipped => StatusType::Skipped,
        }
    }
}

impl fmt::Display for StatusType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Exception attached to a failed event by the test engine.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RawException {
    /// Fully qualified exception class name.
    pub class: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub backtrace: Vec<String>,
}

/// A raw test-completion event as emitted by the execution engine.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RawEvent {
    pub id: String,
    #[serde(default)]
    pub profile_id: Option<String>,
    pub status: Status,
    /// Full human-readable description of the check.
    #[serde(default)]
    pub code_desc: String,
    /// Short example description (used as the skip message for pending events).
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub described_class: Option<String>,
    #[serde(default)]
    pub skip_message: Option<String>,
    #[serde(default)]
    pub resource: Option<String>,
    #[serde(default)]
    pub exception: Option<RawException>,
    #[serde(default)]
    pub start_time: Option<DateTime<Utc>>,
    /// Run duration in seconds.
    #[serde(default)]
    pub run_time: f64,
}

/// Exception details kept for non-assertion failures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExceptionInfo {
    pub class: String,
    pub backtrace: Vec<String>,
}

/// One normalized test outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionRecord {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_id: Option<String>,
    pub status: RecordStatus,
    pub code_desc: String,
    /// Failure message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exception: Option<ExceptionInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource: Option<String>,
    pub start_time: DateTime<Utc>,
    pub run_time: f64,
    /// Set during aggregation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_type: Option<StatusType>,
}

impl ExecutionRecord {
    /// Status type if classified, otherwise the one implied by the raw status.
    pub fn effective_status_type(&self) -> StatusType {
        self.status_type.unwrap_or(StatusType::from(self.status))
    }
}

/// Static declaration of a control inside a profile.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ControlDefinition {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    /// Severity weight, conventionally in [0, 1].
    #[serde(default)]
    pub impact: Option<f64>,
}

/// A named bundle of control definitions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    /// Descriptor of the system under test.
    #[serde(default)]
    pub target: Option<String>,
    #[serde(default)]
    pub controls: Vec<ControlDefinition>,
}

impl Profile {
    /// Find a declared control by id.
    pub fn control(&self, id: &str) -> Option<&ControlDefinition> {
        self.controls.iter().find(|c| c.id == id)
    }
}

/// Run-level statistics reported in the JSON document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RunStatistics {
    /// Wall-clock duration of the run in seconds.
    pub duration: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_type_ranks() {
        assert!(StatusType::Unknown.rank() < StatusType::Passed.rank());
        assert!(StatusType::Passed.rank() < StatusType::Skipped.rank());
        assert!(StatusType::Skipped.rank() < StatusType::Minor.rank());
        assert!(StatusType::Minor.rank() < StatusType::Major.rank());
        assert!(StatusType::Major.rank() < StatusType::Failed.rank());
        assert!(StatusType::Failed.rank() < StatusType::Critical.rank());
        assert_eq!(StatusType::Failed.rank(), 2.5);
    }

    #[test]
    fn test_pending_maps_to_skipped() {
        assert_eq!(RecordStatus::from(Status::Pending), RecordStatus::Skipped);
        assert_eq!(RecordStatus::from(Status::Failed), RecordStatus::Failed);
    }

    #[test]
    fn test_status_type_labels() {
        assert_eq!(StatusType::Critical.to_string(), "critical");
        assert_eq!(StatusType::Unknown.label(), "unknown");
        assert_eq!(
            serde_json::to_string(&StatusType::Major).unwrap(),
            "\"major\""
        );
    }

    #[test]
    fn test_raw_event_defaults() {
        let event: RawEvent =
            serde_json::from_str(r#"{"id": "ssh-1", "status": "pending"}"#).unwrap();
        assert_eq!(event.status, Status::Pending);
        assert!(event.profile_id.is_none());
        assert!(event.exception.is_none());
        assert_eq!(event.run_time, 0.0);
    }

    #[test]
    fn test_record_omits_absent_fields() {
        let record = ExecutionRecord {
            id: "ssh-1".to_string(),
            profile_id: None,
            status: RecordStatus::Passed,
            code_desc: "File /etc/ssh should exist".to_string(),
            message: None,
            exception: None,
            skip_message: None,
            resource: None,
            start_time: Utc::now(),
            run_time: 0.1,
            status_type: None,
        };

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["status"], "passed");
        assert!(json.get("profile_id").is_none());
        assert!(json.get("message").is_none());
        assert!(json.get("status_type").is_none());
    }

    #[test]
    fn test_profile_control_lookup() {
        let profile: Profile = serde_json::from_str(
            r#"{"name": "ssh", "controls": [{"id": "ssh-1", "impact": 0.5}]}"#,
        )
        .unwrap();
        assert_eq!(profile.control("ssh-1").and_then(|c| c.impact), Some(0.5));
        assert!(profile.control("ssh-2").is_none());
        assert!(profile.title.is_none());
    }
}
