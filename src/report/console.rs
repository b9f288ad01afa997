//! Incremental console report.
//!
//! The renderer consumes records one at a time and prints each control once
//! the stream moves on to a different control. Anonymous controls are held
//! back and printed at the end of their profile (or of the run).

use crate::analysis::aggregator::is_anonymous_id;
use crate::analysis::{profile_summary, tests_summary, Control, ControlAggregator, ProfileRef};
use crate::driver::Formatter;
use crate::models::{ExecutionRecord, Profile, StatusType};
use crate::report::style::{indent_lines, Style, INDENT, NESTED};
use anyhow::Result;
use std::collections::{HashMap, HashSet};
use std::io::Write;
use tracing::debug;

/// Source of the target URI shown under profile headers.
pub trait TargetBackend {
    fn target_uri(&self) -> &str;
}

/// A fixed target URI.
#[derive(Debug, Clone)]
pub struct StaticTarget(pub String);

impl TargetBackend for StaticTarget {
    fn target_uri(&self) -> &str {
        &self.0
    }
}

/// Single-pass console renderer.
pub struct StreamingRenderer<W: Write> {
    out: W,
    style: Style,
    target: Option<Box<dyn TargetBackend>>,
    aggregator: ControlAggregator,
    current_control: Option<String>,
    current_profile: Option<ProfileRef>,
    anonymous_bucket: Vec<String>,
    /// Control ids in arrival order, one entry per record.
    all_controls: Vec<String>,
    headered: HashSet<ProfileRef>,
    printed: HashMap<String, usize>,
}

impl<W: Write> StreamingRenderer<W> {
    pub fn new(out: W, style: Style, target: Option<Box<dyn TargetBackend>>) -> Self {
        Self {
            out,
            style,
            target,
            aggregator: ControlAggregator::default(),
            current_control: None,
            current_profile: None,
            anonymous_bucket: Vec::new(),
            all_controls: Vec::new(),
            headered: HashSet::new(),
            printed: HashMap::new(),
        }
    }

    #[allow(dead_code)] // Accessor for buffered writers
    pub fn get_ref(&self) -> &W {
        &self.out
    }

    /// Distinct controls seen so far, in first-seen order.
    pub fn unique_controls(&self) -> Vec<&Control> {
        let mut seen = HashSet::new();
        let mut controls = Vec::new();
        for id in &self.all_controls {
            if !seen.insert(id.as_str()) {
                continue;
            }
            if let Some(control) = self.aggregator.get(id) {
                controls.push(control);
            }
        }
        controls
    }

    fn render(&mut self, record: &ExecutionRecord) -> Result<()> {
        let (id, profile, anonymous) = {
            let control = self.aggregator.add(record);
            (control.id.clone(), control.profile, control.is_anonymous())
        };

        if let Some(current) = self.current_control.take() {
            if current != id {
                if is_anonymous_id(&current) {
                    self.enqueue_anonymous(current);
                } else {
                    self.flush_control(&current)?;
                }
            }
        }
        self.current_control = Some(id.clone());

        if profile != self.current_profile {
            writeln!(self.out)?;
            self.flush_anonymous_bucket()?;
            if let Some(profile) = profile {
                self.print_profile_header(profile)?;
            }
            self.current_profile = profile;
        }

        if anonymous {
            self.enqueue_anonymous(id.clone());
        }
        self.all_controls.push(id);
        Ok(())
    }

    fn enqueue_anonymous(&mut self, id: String) {
        if !self.anonymous_bucket.contains(&id) {
            self.anonymous_bucket.push(id);
        }
    }

    fn flush_anonymous_bucket(&mut self) -> Result<()> {
        for id in std::mem::take(&mut self.anonymous_bucket) {
            self.flush_control(&id)?;
        }
        Ok(())
    }

    /// Print a control and the results not printed before.
    fn flush_control(&mut self, id: &str) -> Result<()> {
        let control = match self.aggregator.get(id) {
            Some(control) => control,
            None => return Ok(()),
        };

        let already = self.printed.get(id).copied();
        let from = already.unwrap_or(0);
        if already.is_some() && from >= control.results.len() {
            return Ok(());
        }

        if control.is_anonymous() {
            write_anonymous_control(&mut self.out, &self.style, control, from)?;
        } else {
            write_control(&mut self.out, &self.style, control, from)?;
        }
        self.printed.insert(id.to_string(), control.results.len());
        Ok(())
    }

    fn print_profile_header(&mut self, profile: ProfileRef) -> Result<()> {
        if !self.headered.insert(profile) {
            return Ok(());
        }
        let profile = match self.aggregator.index().profile(profile) {
            Some(profile) => profile,
            None => return Ok(()),
        };
        debug!("Rendering header for profile {:?}", profile.name);

        if let Some(ref name) = profile.name {
            match profile.title {
                Some(ref title) => writeln!(self.out, "Profile: {} ({})", title, name)?,
                None => writeln!(self.out, "Profile: {}", name)?,
            }
            writeln!(
                self.out,
                "Version: {}",
                profile.version.as_deref().unwrap_or("unknown")
            )?;
        }
        if let Some(ref target) = self.target {
            writeln!(self.out, "Target:  {}", target.target_uri())?;
        }
        writeln!(self.out)?;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        if let Some(current) = self.current_control.take() {
            self.flush_control(&current)?;
        }
        self.flush_anonymous_bucket()?;

        let controls = self.unique_controls();
        let profile = profile_summary(controls.iter().copied());
        let tests = tests_summary(controls.iter().copied());

        let style = self.style;
        let profile_line = format!(
            "Profile Summary: {}, {}, {}",
            style.paint(StatusType::Passed, &format!("{} successful", profile.passed)),
            style.paint(StatusType::Failed, &format!("{} failures", profile.failed.total)),
            style.paint(StatusType::Skipped, &format!("{} skipped", profile.skipped)),
        );
        let tests_line = format!(
            "Test Summary: {}, {}, {}",
            style.paint(StatusType::Passed, &format!("{} successful", tests.passed)),
            style.paint(StatusType::Failed, &format!("{} failures", tests.failed)),
            style.paint(StatusType::Skipped, &format!("{} skipped", tests.skipped)),
        );

        writeln!(self.out)?;
        writeln!(self.out, "{}", profile_line)?;
        writeln!(self.out, "{}", tests_line)?;
        self.out.flush()?;
        Ok(())
    }
}

/// Render a declared (or unmatched but named) control and its results.
fn write_control<W: Write>(
    out: &mut W,
    style: &Style,
    control: &Control,
    from: usize,
) -> Result<()> {
    let status_type = control.status_type();
    let label = match control.profile_id {
        Some(ref profile_id) => format!("[{}] {}", profile_id, control.id),
        None => control.id.clone(),
    };
    writeln!(
        out,
        "{}{}{}: {}{}",
        style.color(status_type),
        style.indicator(status_type),
        label,
        indent_lines(&control.summary(), INDENT),
        style.reset()
    )?;

    for result in &control.results[from..] {
        write_result(out, style, result, &result_message(result))?;
    }
    Ok(())
}

/// Render an anonymous control under a title taken from its first result.
fn write_anonymous_control<W: Write>(
    out: &mut W,
    style: &Style,
    control: &Control,
    from: usize,
) -> Result<()> {
    let status_type = control.status_type();
    let title = match control.results.first() {
        Some(first) => leading_words(&first.code_desc),
        None => control.title(),
    };
    writeln!(
        out,
        "{}{}{}{}",
        style.color(status_type),
        style.indicator(status_type),
        indent_lines(&title, INDENT),
        style.reset()
    )?;

    for result in &control.results[from..] {
        let mut label = trailing_words(&result.code_desc);
        if label.is_empty() {
            label = result.code_desc.clone();
        }
        if let Some(ref message) = result.message {
            label = format!("{}\n{}", label, message);
        }
        write_result(out, style, result, &label)?;
    }
    Ok(())
}

fn write_result<W: Write>(
    out: &mut W,
    style: &Style,
    result: &ExecutionRecord,
    message: &str,
) -> Result<()> {
    let status_type = result.effective_status_type();
    writeln!(
        out,
        "{}{}{}{}{}",
        style.color(status_type),
        NESTED,
        style.indicator(status_type),
        indent_lines(message, &format!("{}{}", NESTED, INDENT)),
        style.reset()
    )?;
    Ok(())
}

/// Line text for a result nested under a named control.
fn result_message(result: &ExecutionRecord) -> String {
    match (&result.message, &result.skip_message) {
        (Some(message), _) => format!("{}\n{}", result.code_desc, message),
        (None, Some(skip)) => skip.clone(),
        (None, None) => result.code_desc.clone(),
    }
}

/// First two words of a code description.
fn leading_words(code_desc: &str) -> String {
    code_desc.split_whitespace().take(2).collect::<Vec<_>>().join(" ")
}

/// A code description without its first two words.
fn trailing_words(code_desc: &str) -> String {
    code_desc.split_whitespace().skip(2).collect::<Vec<_>>().join(" ")
}

impl<W: Write> Formatter for StreamingRenderer<W> {
    fn on_start(&mut self, profiles: &[Profile]) -> Result<()> {
        self.aggregator = ControlAggregator::from_profiles(profiles);
        Ok(())
    }

    fn on_record(&mut self, record: &ExecutionRecord) -> Result<()> {
        self.render(record)
    }

    fn on_close(&mut self) -> Result<()> {
        self.finish()
    }
}
