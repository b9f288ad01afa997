//! Profile lookup over an immutable snapshot.
//!
//! Records are correlated to their owning profile first by declared profile
//! name, then by searching every profile for a control with the record's id.
//! The second rule is best-effort: when two profiles declare the same control
//! id the first one in snapshot order wins.

use crate::models::{ControlDefinition, ExecutionRecord, Profile};
use std::collections::HashMap;
use tracing::debug;

/// Handle to a profile inside a [`ProfileIndex`] snapshot.
///
/// Two handles are equal only when they point at the same snapshot entry, so
/// comparing them is an identity check rather than a name check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProfileRef(usize);

impl ProfileRef {
    /// Position of the profile in the snapshot.
    pub fn index(self) -> usize {
        self.0
    }
}

/// Read-only lookup structure over a snapshot of profiles.
#[derive(Debug, Clone, Default)]
pub struct ProfileIndex {
    profiles: Vec<Profile>,
    memo: HashMap<(Option<String>, String), Option<ProfileRef>>,
}

impl ProfileIndex {
    /// Build an index from a deep copy of `profiles`.
    pub fn new(profiles: &[Profile]) -> Self {
        Self {
            profiles: profiles.to_vec(),
            memo: HashMap::new(),
        }
    }

    /// All profiles in snapshot order.
    pub fn profiles(&self) -> &[Profile] {
        &self.profiles
    }

    /// Profile behind a handle.
    pub fn profile(&self, profile: ProfileRef) -> Option<&Profile> {
        self.profiles.get(profile.0)
    }

    /// Declared control `id` inside `profile`.
    pub fn definition(&self, profile: ProfileRef, id: &str) -> Option<&ControlDefinition> {
        self.profile(profile).and_then(|p| p.control(id))
    }

    /// Resolve the owning profile of a record, memoizing per (profile id, id).
    pub fn resolve(&mut self, record: &ExecutionRecord) -> Option<ProfileRef> {
        let key = (record.profile_id.clone(), record.id.clone());
        if let Some(found) = self.memo.get(&key) {
            return *found;
        }

        let found = self.lookup(record.profile_id.as_deref(), &record.id);
        if found.is_none() {
            debug!(
                "No profile owns record {} (profile id: {:?})",
                record.id, record.profile_id
            );
        }
        self.memo.insert(key, found);
        found
    }

    /// Uncached lookup: profile name first, then control id.
    pub fn lookup(&self, profile_id: Option<&str>, id: &str) -> Option<ProfileRef> {
        if let Some(pid) = profile_id {
            let by_name = self
                .profiles
                .iter()
                .position(|p| p.name.as_deref() == Some(pid));
            if let Some(pos) = by_name {
                return Some(ProfileRef(pos));
            }
        }

        self.profiles
            .iter()
            .position(|p| p.control(id).is_some())
            .map(ProfileRef)
    }
}
