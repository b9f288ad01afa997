//! Statistic rollups over finished controls.
//!
//! Two independent views are computed: a per-control rollup that ignores
//! anonymous controls, and a per-result rollup that counts everything.

use crate::analysis::aggregator::Control;
use crate::analysis::classifier::impact_bucket;
use crate::models::{RecordStatus, StatusType};
use serde::{Deserialize, Serialize};

/// Failed controls bucketed by impact.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedSummary {
    pub total: usize,
    pub critical: usize,
    pub major: usize,
    pub minor: usize,
}

/// Per-control rollup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileSummary {
    pub total: usize,
    pub failed: FailedSummary,
    pub skipped: usize,
    pub passed: usize,
}

/// Per-result rollup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestsSummary {
    pub total: usize,
    pub failed: usize,
    pub skipped: usize,
    pub passed: usize,
}

/// Summarize declared controls that have at least one result.
///
/// Anonymous controls and records that matched no control definition are
/// ungrouped and do not count here.
/// A control counts as failed if any result failed, else skipped if any was
/// skipped, else passed. Failed controls without an impact count as minor.
pub fn profile_summary<'a, I>(controls: I) -> ProfileSummary
where
    I: IntoIterator<Item = &'a Control>,
{
    let mut summary = ProfileSummary::default();

    for control in controls {
        if control.is_anonymous() || !control.is_declared() || control.results.is_empty() {
            continue;
        }

        let any = |status: RecordStatus| control.results.iter().any(|r| r.status == status);

        if any(RecordStatus::Failed) {
            summary.failed.total += 1;
            match control.impact().map(impact_bucket) {
                Some(StatusType::Critical) => summary.failed.critical += 1,
                Some(StatusType::Major) => summary.failed.major += 1,
                _ => summary.failed.minor += 1,
            }
        } else if any(RecordStatus::Skipped) {
            summary.skipped += 1;
        } else {
            summary.passed += 1;
        }
    }

    summary.total = summary.failed.total + summary.skipped + summary.passed;
    summary
}

/// Summarize every result of every control, anonymous ones included.
pub fn tests_summary<'a, I>(controls: I) -> TestsSummary
where
    I: IntoIterator<Item = &'a Control>,
{
    let mut summary = TestsSummary::default();

    for result in controls.into_iter().flat_map(|c| &c.results) {
        match result.status {
            RecordStatus::Failed => summary.failed += 1,
            RecordStatus::Skipped => summary.skipped += 1,
            RecordStatus::Passed => summary.passed += 1,
        }
    }

    summary.total = summary.failed + summary.skipped + summary.passed;
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::aggregator::ControlAggregator;
    use crate::models::{ControlDefinition, ExecutionRecord, Profile};
    use chrono::Utc;

    fn create_test_record(id: &str, status: RecordStatus) -> ExecutionRecord {
        ExecutionRecord {
            id: id.to_string(),
            profile_id: Some("baseline".to_string()),
            status,
            code_desc: format!("{} check", id),
            message: None,
            exception: None,
            skip_message: None,
            resource: None,
            start_time: Utc::now(),
            run_time: 0.0,
            status_type: None,
        }
    }

    fn baseline(controls: &[(&str, Option<f64>)]) -> Profile {
        Profile {
            name: Some("baseline".to_string()),
            controls: controls
                .iter()
                .map(|(id, impact)| ControlDefinition {
                    id: id.to_string(),
                    title: None,
                    impact: *impact,
                })
                .collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_critical_control_with_two_failures() {
        let mut aggregator = ControlAggregator::from_profiles(&[baseline(&[("c-1", Some(0.8))])]);
        aggregator.add(&create_test_record("c-1", RecordStatus::Failed));
        aggregator.add(&create_test_record("c-1", RecordStatus::Failed));

        assert_eq!(
            aggregator.get("c-1").unwrap().status_type(),
            StatusType::Critical
        );

        let summary = profile_summary(aggregator.controls());
        assert_eq!(summary.failed.critical, 1);
        assert_eq!(summary.failed.major, 0);
        assert_eq!(summary.failed.minor, 0);
        assert_eq!(summary.total, 1);
    }

    #[test]
    fn test_missing_impact_counts_as_minor() {
        let mut aggregator = ControlAggregator::from_profiles(&[baseline(&[("c-1", None)])]);
        aggregator.add(&create_test_record("c-1", RecordStatus::Failed));

        let summary = profile_summary(aggregator.controls());
        assert_eq!(summary.failed.total, 1);
        assert_eq!(summary.failed.minor, 1);
    }

    #[test]
    fn test_control_classification_precedence() {
        let mut aggregator = ControlAggregator::from_profiles(&[baseline(&[
            ("failed", Some(0.5)),
            ("skipped", Some(0.5)),
            ("passed", Some(0.5)),
        ])]);
        aggregator.add(&create_test_record("failed", RecordStatus::Skipped));
        aggregator.add(&create_test_record("failed", RecordStatus::Failed));
        aggregator.add(&create_test_record("skipped", RecordStatus::Passed));
        aggregator.add(&create_test_record("skipped", RecordStatus::Skipped));
        aggregator.add(&create_test_record("passed", RecordStatus::Passed));

        let summary = profile_summary(aggregator.controls());
        assert_eq!(summary.failed.total, 1);
        assert_eq!(summary.failed.major, 1);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.passed, 1);
        assert_eq!(summary.total, 3);
        assert_eq!(
            summary.failed.total,
            summary.failed.critical + summary.failed.major + summary.failed.minor
        );
    }

    #[test]
    fn test_anonymous_controls_only_count_in_tests_summary() {
        let mut aggregator = ControlAggregator::from_profiles(&[baseline(&[("c-1", None)])]);
        aggregator.add(&create_test_record("c-1", RecordStatus::Passed));
        aggregator.add(&create_test_record("(generated from a.rb:1 x)", RecordStatus::Failed));
        aggregator.add(&create_test_record("(generated from a.rb:1 x)", RecordStatus::Skipped));

        let profile = profile_summary(aggregator.controls());
        assert_eq!(profile.total, 1);
        assert_eq!(profile.passed, 1);
        assert_eq!(profile.failed.total, 0);

        let tests = tests_summary(aggregator.controls());
        assert_eq!(tests.failed, 1);
        assert_eq!(tests.skipped, 1);
        assert_eq!(tests.passed, 1);
        assert_eq!(tests.total, 3);
    }

    #[test]
    fn test_uncorrelated_record_is_absent_from_profile_summary() {
        let mut aggregator = ControlAggregator::from_profiles(&[baseline(&[("c-1", None)])]);
        let mut stray = create_test_record("stray", RecordStatus::Failed);
        stray.profile_id = Some("nope".to_string());
        aggregator.add(&stray);

        let profile = profile_summary(aggregator.controls());
        assert_eq!(profile, ProfileSummary::default());

        let tests = tests_summary(aggregator.controls());
        assert_eq!(tests.failed, 1);
        assert_eq!(tests.total, 1);
    }

    #[test]
    fn test_undeclared_id_in_known_profile_is_ungrouped() {
        let mut aggregator = ControlAggregator::from_profiles(&[baseline(&[("c-1", None)])]);
        aggregator.add(&create_test_record("c-1", RecordStatus::Passed));
        aggregator.add(&create_test_record("extra", RecordStatus::Failed));

        let profile = profile_summary(aggregator.controls());
        assert_eq!(profile.total, 1);
        assert_eq!(profile.passed, 1);
        assert_eq!(profile.failed.total, 0);
    }

    #[test]
    fn test_empty_controls_are_ignored() {
        let controls = vec![Control::new("c-1")];
        assert_eq!(profile_summary(&controls), ProfileSummary::default());
        assert_eq!(tests_summary(&controls), TestsSummary::default());
    }
}
