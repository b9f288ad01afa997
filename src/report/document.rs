//! JSON document generation.
//!
//! The document is built from the collector's record sequence once the run
//! has stopped, and written to disk when the run closes.

use crate::analysis::classifier::classify;
use crate::analysis::ProfileIndex;
use crate::config::DocumentStyle;
use crate::driver::{Formatter, RunContext};
use crate::models::{
    ExceptionInfo, ExecutionRecord, Profile, RecordStatus, RunStatistics, StatusType,
};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;
use tracing::info;

/// Flat document: every record in arrival order.
#[derive(Serialize)]
struct MinimalDocument<'a> {
    version: &'static str,
    statistics: RunStatistics,
    profiles: &'a [Profile],
    controls: &'a [ExecutionRecord],
}

/// Document with results nested under their control definitions.
#[derive(Serialize)]
struct GroupedDocument<'a> {
    version: &'static str,
    statistics: RunStatistics,
    profiles: Vec<GroupedProfile<'a>>,
    other_checks: Vec<&'a ExecutionRecord>,
}

#[derive(Serialize)]
struct GroupedProfile<'a> {
    name: Option<&'a str>,
    title: Option<&'a str>,
    version: Option<&'a str>,
    target: Option<&'a str>,
    controls: Vec<GroupedControl<'a>>,
}

#[derive(Serialize)]
struct GroupedControl<'a> {
    id: &'a str,
    title: Option<&'a str>,
    impact: Option<f64>,
    results: Vec<GroupedResult<'a>>,
}

/// A record nested under its control; id and profile id are implied.
///
/// `status_type` is classified against the owning definition's impact.
#[derive(Serialize)]
struct GroupedResult<'a> {
    status: RecordStatus,
    code_desc: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    exception: Option<&'a ExceptionInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    skip_message: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    resource: Option<&'a str>,
    start_time: DateTime<Utc>,
    run_time: f64,
    status_type: StatusType,
}

impl<'a> GroupedResult<'a> {
    fn new(record: &'a ExecutionRecord, impact: Option<f64>) -> Self {
        Self {
            status: record.status,
            code_desc: &record.code_desc,
            message: record.message.as_deref(),
            exception: record.exception.as_ref(),
            skip_message: record.skip_message.as_deref(),
            resource: record.resource.as_deref(),
            start_time: record.start_time,
            run_time: record.run_time,
            status_type: classify(record.status, impact),
        }
    }
}

/// Generate the JSON document for a finished run.
pub fn generate_json_document(
    style: DocumentStyle,
    index: &mut ProfileIndex,
    records: &[ExecutionRecord],
    statistics: RunStatistics,
) -> Result<String> {
    let version = env!("CARGO_PKG_VERSION");

    match style {
        DocumentStyle::Minimal => {
            let document = MinimalDocument {
                version,
                statistics,
                profiles: index.profiles(),
                controls: records,
            };
            serde_json::to_string_pretty(&document).map_err(Into::into)
        }
        DocumentStyle::Grouped => {
            // results[profile][control] follows the snapshot's declaration order
            let mut results: Vec<Vec<Vec<&ExecutionRecord>>> = index
                .profiles()
                .iter()
                .map(|p| vec![Vec::new(); p.controls.len()])
                .collect();
            let mut other_checks = Vec::new();

            for record in records {
                let slot = index.resolve(record).and_then(|profile| {
                    index.profiles()[profile.index()]
                        .controls
                        .iter()
                        .position(|c| c.id == record.id)
                        .map(|control| (profile.index(), control))
                });
                match slot {
                    Some((profile, control)) => results[profile][control].push(record),
                    None => other_checks.push(record),
                }
            }

            let profiles = index
                .profiles()
                .iter()
                .zip(results)
                .map(|(profile, results)| GroupedProfile {
                    name: profile.name.as_deref(),
                    title: profile.title.as_deref(),
                    version: profile.version.as_deref(),
                    target: profile.target.as_deref(),
                    controls: profile
                        .controls
                        .iter()
                        .zip(results)
                        .map(|(definition, results)| GroupedControl {
                            id: &definition.id,
                            title: definition.title.as_deref(),
                            impact: definition.impact,
                            results: results
                                .into_iter()
                                .map(|r| GroupedResult::new(r, definition.impact))
                                .collect(),
                        })
                        .collect(),
                })
                .collect();

            let document = GroupedDocument {
                version,
                statistics,
                profiles,
                other_checks,
            };
            serde_json::to_string_pretty(&document).map_err(Into::into)
        }
    }
}

/// Formatter that writes the JSON document to a file.
pub struct DocumentFormatter {
    style: DocumentStyle,
    output: PathBuf,
    index: ProfileIndex,
    document: Option<String>,
}

impl DocumentFormatter {
    pub fn new(style: DocumentStyle, output: PathBuf) -> Self {
        Self {
            style,
            output,
            index: ProfileIndex::default(),
            document: None,
        }
    }
}

impl Formatter for DocumentFormatter {
    fn on_start(&mut self, profiles: &[Profile]) -> Result<()> {
        self.index = ProfileIndex::new(profiles);
        Ok(())
    }

    fn on_record(&mut self, _record: &ExecutionRecord) -> Result<()> {
        Ok(())
    }

    fn on_stop(&mut self, run: &RunContext<'_>) -> Result<()> {
        let document =
            generate_json_document(self.style, &mut self.index, run.records, run.statistics)?;
        self.document = Some(document);
        Ok(())
    }

    fn on_close(&mut self) -> Result<()> {
        if let Some(document) = self.document.take() {
            std::fs::write(&self.output, document).with_context(|| {
                format!("Failed to write document to {}", self.output.display())
            })?;
            info!("JSON document written to {}", self.output.display());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ControlDefinition;
    use serde_json::Value;
    use tempfile::TempDir;

    fn create_test_record(
        id: &str,
        profile_id: Option<&str>,
        status: RecordStatus,
    ) -> ExecutionRecord {
        ExecutionRecord {
            id: id.to_string(),
            profile_id: profile_id.map(String::from),
            status,
            code_desc: format!("{} should pass", id),
            message: None,
            exception: None,
            skip_message: None,
            resource: None,
            start_time: Utc::now(),
            run_time: 0.5,
            status_type: None,
        }
    }

    fn create_test_profiles() -> Vec<Profile> {
        vec![Profile {
            name: Some("ssh-baseline".to_string()),
            title: Some("SSH Baseline".to_string()),
            version: Some("1.0.0".to_string()),
            target: None,
            controls: vec![
                ControlDefinition {
                    id: "ssh-01".to_string(),
                    title: Some("Ciphers".to_string()),
                    impact: Some(1.0),
                },
                ControlDefinition {
                    id: "ssh-02".to_string(),
                    title: None,
                    impact: None,
                },
            ],
        }]
    }

    fn create_test_records() -> Vec<ExecutionRecord> {
        vec![
            create_test_record("ssh-01", Some("ssh-baseline"), RecordStatus::Passed),
            create_test_record("ssh-01", Some("ssh-baseline"), RecordStatus::Failed),
            create_test_record(
                "(generated from a.rb:1 x)",
                Some("ssh-baseline"),
                RecordStatus::Passed,
            ),
            create_test_record("stray", Some("unknown-profile"), RecordStatus::Skipped),
        ]
    }

    fn render(style: DocumentStyle) -> Value {
        let mut index = ProfileIndex::new(&create_test_profiles());
        let json = generate_json_document(
            style,
            &mut index,
            &create_test_records(),
            RunStatistics { duration: 1.5 },
        )
        .unwrap();
        serde_json::from_str(&json).unwrap()
    }

    #[test]
    fn test_grouped_document_nests_results() {
        let doc = render(DocumentStyle::Grouped);

        assert_eq!(doc["version"], env!("CARGO_PKG_VERSION"));
        assert_eq!(doc["statistics"]["duration"], 1.5);
        assert!(doc.get("controls").is_none());

        let controls = doc["profiles"][0]["controls"].as_array().unwrap();
        let results = controls[0]["results"].as_array().unwrap();
        assert_eq!(results.len(), 2);
        assert!(results[0].get("id").is_none());
        assert!(results[0].get("profile_id").is_none());
        assert_eq!(results[1]["status"], "failed");
        assert_eq!(results[0]["status_type"], "passed");
        assert_eq!(results[1]["status_type"], "critical");
        assert_eq!(controls[1]["results"].as_array().unwrap().len(), 0);
    }

    #[test]
    fn test_grouped_document_collects_other_checks() {
        let doc = render(DocumentStyle::Grouped);

        let other = doc["other_checks"].as_array().unwrap();
        let ids: Vec<_> = other.iter().map(|r| r["id"].as_str().unwrap()).collect();
        assert_eq!(ids, vec!["(generated from a.rb:1 x)", "stray"]);
    }

    #[test]
    fn test_every_record_appears_once() {
        let doc = render(DocumentStyle::Grouped);

        let grouped: usize = doc["profiles"]
            .as_array()
            .unwrap()
            .iter()
            .flat_map(|p| p["controls"].as_array().unwrap())
            .map(|c| c["results"].as_array().unwrap().len())
            .sum();
        let other = doc["other_checks"].as_array().unwrap().len();
        assert_eq!(grouped + other, create_test_records().len());
    }

    #[test]
    fn test_minimal_document_is_flat() {
        let doc = render(DocumentStyle::Minimal);

        assert!(doc.get("other_checks").is_none());
        let controls = doc["controls"].as_array().unwrap();
        assert_eq!(controls.len(), 4);
        assert_eq!(controls[0]["id"], "ssh-01");
        assert_eq!(doc["profiles"][0]["controls"][0]["impact"], 1.0);
        assert!(doc["profiles"][0]["controls"][0].get("results").is_none());
    }

    #[test]
    fn test_formatter_writes_file() {
        let temp_dir = TempDir::new().unwrap();
        let output = temp_dir.path().join("report.json");
        let records = create_test_records();

        let mut formatter = DocumentFormatter::new(DocumentStyle::Grouped, output.clone());
        formatter.on_start(&create_test_profiles()).unwrap();
        for record in &records {
            formatter.on_record(record).unwrap();
        }
        formatter
            .on_stop(&RunContext {
                records: &records,
                statistics: RunStatistics::default(),
            })
            .unwrap();
        formatter.on_close().unwrap();

        let written: Value =
            serde_json::from_str(&std::fs::read_to_string(&output).unwrap()).unwrap();
        assert_eq!(written["profiles"][0]["name"], "ssh-baseline");
    }
}
