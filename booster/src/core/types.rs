//! Shared deterministic types for booster core logic.
//!
//! These types define stable contracts between the orchestrator, the
//! suppression engine and the boosts. They must not depend on external state.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

/// Terminal status of a single boost execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoostStatus {
    Applied,
    Skipped,
    Failed,
}

impl BoostStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            BoostStatus::Applied => "applied",
            BoostStatus::Skipped => "skipped",
            BoostStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for BoostStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of running one boost. Created once, never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoostOutcome {
    pub name: String,
    pub status: BoostStatus,
    pub message: String,
}

impl BoostOutcome {
    pub fn applied(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: BoostStatus::Applied,
            message: "Success".to_string(),
        }
    }

    pub fn skipped(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: BoostStatus::Skipped,
            message: reason.into(),
        }
    }

    pub fn failed(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: BoostStatus::Failed,
            message: message.into(),
        }
    }
}

/// Reason a boost declined to run. Must be produced before any mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkipSignal {
    pub reason: String,
}

impl SkipSignal {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// What `Boost::apply` returns when it did not error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyResult {
    /// All side effects were performed; the orchestrator decides applied vs no-op.
    Completed,
    /// Preconditions were not met; nothing was touched.
    Skipped(SkipSignal),
}

impl ApplyResult {
    pub fn skip(reason: impl Into<String>) -> Self {
        ApplyResult::Skipped(SkipSignal::new(reason))
    }
}

/// Opaque commit identifier used as a rollback target.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Revision(String);

impl Revision {
    pub fn new(sha: impl Into<String>) -> Self {
        Self(sha.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A file/line pair reported by a checker. Lines are 1-based, paths are
/// relative to the repository root.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ViolationLocation {
    pub file_path: String,
    pub line_number: usize,
}

impl ViolationLocation {
    pub fn new(file_path: impl Into<String>, line_number: usize) -> Self {
        Self {
            file_path: file_path.into(),
            line_number,
        }
    }
}

/// Violation codes keyed by location. A location with no codes is never stored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViolationSet {
    entries: BTreeMap<ViolationLocation, BTreeSet<String>>,
}

impl ViolationSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `code` at `location`. Blank codes are ignored.
    pub fn insert(&mut self, location: ViolationLocation, code: &str) {
        let code = code.trim();
        if code.is_empty() {
            return;
        }
        self.entries
            .entry(location)
            .or_default()
            .insert(code.to_string());
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of distinct locations.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn codes_at(&self, location: &ViolationLocation) -> Option<&BTreeSet<String>> {
        self.entries.get(location)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ViolationLocation, &BTreeSet<String>)> {
        self.entries.iter()
    }

    /// Group by file, then by line. Both levels iterate in ascending order.
    pub fn by_file(&self) -> BTreeMap<&str, BTreeMap<usize, &BTreeSet<String>>> {
        let mut grouped: BTreeMap<&str, BTreeMap<usize, &BTreeSet<String>>> = BTreeMap::new();
        for (location, codes) in self.iter() {
            grouped
                .entry(location.file_path.as_str())
                .or_default()
                .insert(location.line_number, codes);
        }
        grouped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_codes_are_never_stored() {
        let mut set = ViolationSet::new();
        set.insert(ViolationLocation::new("a.py", 1), "  ");
        assert!(set.is_empty());
    }

    #[test]
    fn codes_accumulate_per_location_without_duplicates() {
        let mut set = ViolationSet::new();
        let loc = ViolationLocation::new("a.py", 3);
        set.insert(loc.clone(), "E501");
        set.insert(loc.clone(), "D100");
        set.insert(loc.clone(), "E501");
        let codes: Vec<&str> = set
            .codes_at(&loc)
            .expect("codes")
            .iter()
            .map(String::as_str)
            .collect();
        assert_eq!(codes, vec!["D100", "E501"]);
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn by_file_groups_lines_in_order() {
        let mut set = ViolationSet::new();
        set.insert(ViolationLocation::new("b.py", 9), "X");
        set.insert(ViolationLocation::new("a.py", 7), "Y");
        set.insert(ViolationLocation::new("a.py", 2), "Z");
        let grouped = set.by_file();
        let files: Vec<&str> = grouped.keys().copied().collect();
        assert_eq!(files, vec!["a.py", "b.py"]);
        let lines: Vec<usize> = grouped["a.py"].keys().copied().collect();
        assert_eq!(lines, vec![2, 7]);
    }

    #[test]
    fn status_serializes_lowercase() {
        let outcome = BoostOutcome::skipped("ruff", "No pyproject.toml found");
        let json = serde_json::to_string(&outcome).expect("serialize");
        assert!(json.contains("\"status\":\"skipped\""));
    }
}
