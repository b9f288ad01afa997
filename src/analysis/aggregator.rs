//! Control aggregation.
//!
//! This module groups execution records into [`Control`] aggregates keyed by
//! record id, tracks each control's severity indicator, and synthesizes
//! titles and summaries for controls that do not declare one.

use crate::analysis::classifier::classify;
use crate::analysis::index::{ProfileIndex, ProfileRef};
use crate::models::{ControlDefinition, ExecutionRecord, Profile, StatusType};
use std::collections::HashMap;
use tracing::{debug, trace};

/// Id prefix the execution engine gives to checks outside any declared control.
pub const ANONYMOUS_ID_MARKER: &str = "(generated from ";

/// Title used for a control that has no declared title and no results.
pub const EMPTY_TITLE: &str = "Empty anonymous control";

/// Longest synthesized multi-result title before truncation.
pub const TITLE_MAX_CHARS: usize = 60;

/// Returns true if `id` is a synthetic id for an undeclared control.
pub fn is_anonymous_id(id: &str) -> bool {
    id.starts_with(ANONYMOUS_ID_MARKER)
}

/// Runtime grouping of all records correlated to one control id.
#[derive(Debug, Clone, PartialEq)]
pub struct Control {
    pub id: String,
    pub profile_id: Option<String>,
    /// Owning profile in the aggregator's snapshot.
    pub profile: Option<ProfileRef>,
    /// Declared shape, or an empty one when nothing matched.
    pub definition: ControlDefinition,
    /// Classified records in arrival order.
    pub results: Vec<ExecutionRecord>,
    fails: Vec<usize>,
    passes: Vec<usize>,
    skips: Vec<usize>,
    declared: bool,
    status_type: StatusType,
}

impl Control {
    /// Creates an empty control.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            profile_id: None,
            profile: None,
            definition: ControlDefinition::default(),
            results: Vec::new(),
            fails: Vec::new(),
            passes: Vec::new(),
            skips: Vec::new(),
            declared: false,
            status_type: StatusType::Unknown,
        }
    }

    pub fn is_anonymous(&self) -> bool {
        is_anonymous_id(&self.id)
    }

    /// Whether the latest record matched a declared control definition.
    ///
    /// Undeclared controls are ungrouped: they stay out of per-control rollups.
    pub fn is_declared(&self) -> bool {
        self.declared
    }

    /// Severity indicator: the highest-ranked status type seen so far.
    pub fn status_type(&self) -> StatusType {
        self.status_type
    }

    pub fn impact(&self) -> Option<f64> {
        self.definition.impact
    }

    /// Results ranked above `passed`.
    #[allow(dead_code)] // Partition accessor, rollups read `results` directly
    pub fn failures(&self) -> impl Iterator<Item = &ExecutionRecord> {
        self.fails.iter().map(|&i| &self.results[i])
    }

    #[allow(dead_code)] // Partition accessor
    pub fn passes(&self) -> impl Iterator<Item = &ExecutionRecord> {
        self.passes.iter().map(|&i| &self.results[i])
    }

    #[allow(dead_code)] // Partition accessor
    pub fn skips(&self) -> impl Iterator<Item = &ExecutionRecord> {
        self.skips.iter().map(|&i| &self.results[i])
    }

    /// Append a classified record and update derived state.
    pub fn push(&mut self, record: ExecutionRecord) {
        let status_type = record.effective_status_type();
        let position = self.results.len();
        self.results.push(record);

        if status_type.rank() > StatusType::Passed.rank() {
            self.fails.push(position);
        }
        if status_type == StatusType::Passed {
            self.passes.push(position);
        }
        if status_type == StatusType::Skipped {
            self.skips.push(position);
        }

        // ties keep the label reached first
        if status_type.rank() > self.status_type.rank() {
            self.status_type = status_type;
        }
    }

    /// Declared title, or one synthesized from the results.
    pub fn title(&self) -> String {
        match self.definition.title.as_deref() {
            Some(title) if !title.is_empty() => title.to_string(),
            _ => self.synthesized_title(),
        }
    }

    fn synthesized_title(&self) -> String {
        match self.results.as_slice() {
            [] => EMPTY_TITLE.to_string(),
            [only] => only.code_desc.clone(),
            results => {
                let joined = results
                    .iter()
                    .map(|r| r.code_desc.as_str())
                    .collect::<Vec<_>>()
                    .join("; ");
                if joined.chars().count() > TITLE_MAX_CHARS {
                    let truncated: String = joined.chars().take(TITLE_MAX_CHARS).collect();
                    format!("{}...", truncated)
                } else {
                    joined
                }
            }
        }
    }

    /// Title plus a parenthesized failure/skip suffix.
    pub fn summary(&self) -> String {
        let base = self.title();
        let suffix = match self.results.as_slice() {
            [only] => only.message.clone().unwrap_or_default(),
            _ => {
                let mut parts = Vec::new();
                if !self.fails.is_empty() {
                    parts.push(format!("{} failed", self.fails.len()));
                }
                if !self.skips.is_empty() {
                    parts.push(format!("{} skipped", self.skips.len()));
                }
                parts.join(" ")
            }
        };

        if suffix.is_empty() {
            base
        } else {
            format!("{} ({})", base, suffix)
        }
    }
}

/// Builds and updates controls from execution records.
#[derive(Debug, Clone, Default)]
pub struct ControlAggregator {
    index: ProfileIndex,
    controls: Vec<Control>,
    by_id: HashMap<String, usize>,
}

impl ControlAggregator {
    pub fn new(index: ProfileIndex) -> Self {
        Self {
            index,
            controls: Vec::new(),
            by_id: HashMap::new(),
        }
    }

    /// Aggregator over a fresh snapshot of `profiles`.
    pub fn from_profiles(profiles: &[Profile]) -> Self {
        Self::new(ProfileIndex::new(profiles))
    }

    pub fn index(&self) -> &ProfileIndex {
        &self.index
    }

    /// All controls in first-seen order.
    pub fn controls(&self) -> &[Control] {
        &self.controls
    }

    pub fn get(&self, id: &str) -> Option<&Control> {
        self.by_id.get(id).map(|&i| &self.controls[i])
    }

    /// Correlate `record` and fold it into its control.
    pub fn add(&mut self, record: &ExecutionRecord) -> &Control {
        let profile = self.index.resolve(record);
        let declared = profile.and_then(|p| self.index.definition(p, &record.id)).cloned();

        let slot = match self.by_id.get(&record.id).copied() {
            Some(slot) => slot,
            None => {
                debug!("Creating control {}", record.id);
                self.controls.push(Control::new(record.id.clone()));
                self.by_id.insert(record.id.clone(), self.controls.len() - 1);
                self.controls.len() - 1
            }
        };

        let control = &mut self.controls[slot];
        control.id = record.id.clone();
        control.profile_id = record.profile_id.clone();
        control.profile = profile;
        control.declared = declared.is_some();
        control.definition = declared.unwrap_or_default();

        let status_type = classify(record.status, control.definition.impact);
        trace!("Record {} classified as {}", record.id, status_type);

        let mut result = record.clone();
        result.status_type = Some(status_type);
        control.push(result);

        control
    }
}
