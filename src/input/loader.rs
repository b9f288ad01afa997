//! Loading of profile definitions and event streams.
//!
//! Profiles are read in full up front; events are read lazily, one JSON
//! object per line, so the report can be rendered while the engine runs.

use crate::models::{Profile, RawEvent};
use serde::Deserialize;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;
use walkdir::{DirEntry, WalkDir};

/// Errors raised while reading run inputs.
#[derive(Debug, Error)]
pub enum InputError {
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to walk profile directory: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("malformed profile file {}: {source}", .path.display())]
    MalformedProfile {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to read event line {line}: {source}")]
    Read {
        line: usize,
        #[source]
        source: io::Error,
    },

    #[error("malformed event on line {line}: {source}")]
    MalformedEvent {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
}

/// A profile file holds either one profile or a list of them.
#[derive(Deserialize)]
#[serde(untagged)]
enum ProfileFile {
    Many(Vec<Profile>),
    One(Box<Profile>),
}

/// Load profiles from a JSON file or a directory of JSON files.
///
/// Directory entries are visited in file-name order; hidden entries are skipped.
pub fn load_profiles(path: &Path) -> Result<Vec<Profile>, InputError> {
    if !path.is_dir() {
        return load_profile_file(path);
    }

    let mut profiles = Vec::new();
    let walker = WalkDir::new(path)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_hidden(e));

    for entry in walker {
        let entry = entry?;
        let is_json = entry.path().extension().and_then(|e| e.to_str()) == Some("json");
        if entry.file_type().is_file() && is_json {
            profiles.extend(load_profile_file(entry.path())?);
        }
    }

    debug!("Loaded {} profiles from {}", profiles.len(), path.display());
    Ok(profiles)
}

fn load_profile_file(path: &Path) -> Result<Vec<Profile>, InputError> {
    let content = std::fs::read_to_string(path).map_err(|source| InputError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let parsed: ProfileFile =
        serde_json::from_str(&content).map_err(|source| InputError::MalformedProfile {
            path: path.to_path_buf(),
            source,
        })?;

    Ok(match parsed {
        ProfileFile::Many(profiles) => profiles,
        ProfileFile::One(profile) => vec![*profile],
    })
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .map(|name| name.starts_with('.'))
        .unwrap_or(false)
}

/// Lazy reader of newline-delimited JSON events.
pub struct EventReader<R> {
    lines: io::Lines<R>,
    line: usize,
}

impl<R: BufRead> EventReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            line: 0,
        }
    }
}

impl EventReader<Box<dyn BufRead>> {
    /// Open an event file, or stdin when `path` is "-".
    pub fn open(path: &Path) -> Result<Self, InputError> {
        let reader: Box<dyn BufRead> = if path.as_os_str() == "-" {
            Box::new(BufReader::new(io::stdin()))
        } else {
            let file = File::open(path).map_err(|source| InputError::Io {
                path: path.to_path_buf(),
                source,
            })?;
            Box::new(BufReader::new(file))
        };
        Ok(Self::new(reader))
    }
}

impl<R: BufRead> Iterator for EventReader<R> {
    type Item = Result<RawEvent, InputError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let text = self.lines.next()?;
            self.line += 1;
            let line = self.line;

            let text = match text {
                Ok(text) => text,
                Err(source) => return Some(Err(InputError::Read { line, source })),
            };
            if text.trim().is_empty() {
                continue;
            }

            return Some(
                serde_json::from_str(&text)
                    .map_err(|source| InputError::MalformedEvent { line, source }),
            );
        }
    }
}
