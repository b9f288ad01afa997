//! Status classification.
//!
//! Maps a raw record status plus a control's declared impact to a
//! [`StatusType`].

use crate::models::{RecordStatus, StatusType};

/// Impact at or above which a failure is critical.
pub const CRITICAL_IMPACT: f64 = 0.7;

/// Impact at or above which a failure is major.
pub const MAJOR_IMPACT: f64 = 0.4;

/// Classify a record status using the owning control's impact.
///
/// Only failures with a declared impact are bucketed; everything else keeps
/// the label implied by its status.
pub fn classify(status: RecordStatus, impact: Option<f64>) -> StatusType {
    match (status, impact) {
        (RecordStatus::Failed, Some(impact)) => impact_bucket(impact),
        _ => StatusType::from(status),
    }
}

/// Bucket a failure by impact.
pub fn impact_bucket(impact: f64) -> StatusType {
    if impact >= CRITICAL_IMPACT {
        StatusType::Critical
    } else if impact >= MAJOR_IMPACT {
        StatusType::Major
    } else {
        StatusType::Minor
    }
}
