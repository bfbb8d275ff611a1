//! Per-repository record of the last run, kept under `<git-dir>/booster/`.
//!
//! Living inside the git directory keeps it out of the working tree, so
//! writing it never makes the repository dirty.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::types::{BoostOutcome, BoostStatus};

/// Last recorded result for one boost.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BoostRecord {
    pub status: BoostStatus,
    pub message: String,
    /// HEAD at the end of the run that recorded this outcome, when known.
    pub revision: Option<String>,
}

/// Persisted bookkeeping for a repository (`<git-dir>/booster/run_state.json`).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RunState {
    pub repo_path: Option<String>,
    pub branch: Option<String>,
    pub updated_at_unix: Option<u64>,
    pub boosts: BTreeMap<String, BoostRecord>,
}

impl RunState {
    /// Merge one run's outcomes; boosts not in `outcomes` keep their old record.
    pub fn record_run(
        &mut self,
        repo_path: &Path,
        branch: &str,
        outcomes: &[BoostOutcome],
        head: Option<&str>,
    ) {
        self.repo_path = Some(repo_path.display().to_string());
        self.branch = Some(branch.to_string());
        self.updated_at_unix = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .ok()
            .map(|d| d.as_secs());
        for outcome in outcomes {
            self.boosts.insert(
                outcome.name.clone(),
                BoostRecord {
                    status: outcome.status,
                    message: outcome.message.clone(),
                    revision: head.map(str::to_string),
                },
            );
        }
    }
}

/// Location of the run-state file for a git directory.
pub fn run_state_path(git_dir: &Path) -> PathBuf {
    git_dir.join("booster").join("run_state.json")
}

/// Load run state, or the default when no file exists yet.
pub fn load_run_state(path: &Path) -> Result<RunState> {
    if !path.exists() {
        return Ok(RunState::default());
    }
    debug!(path = %path.display(), "loading run state");
    let contents =
        fs::read_to_string(path).with_context(|| format!("read run state {}", path.display()))?;
    let state: RunState = serde_json::from_str(&contents)
        .with_context(|| format!("parse run state {}", path.display()))?;
    Ok(state)
}

/// Atomically write run state to disk (temp file + rename).
pub fn write_run_state(path: &Path, state: &RunState) -> Result<()> {
    debug!(path = %path.display(), boosts = state.boosts.len(), "writing run state");
    let mut buf = serde_json::to_string_pretty(state)?;
    buf.push('\n');
    write_atomic(path, &buf)
}

fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let parent = path
        .parent()
        .with_context(|| format!("run state path missing parent {}", path.display()))?;
    fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;
    let tmp_path = path.with_extension("json.tmp");
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp run state {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace run state {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_loads_default() {
        let temp = tempfile::tempdir().expect("tempdir");
        let state = load_run_state(&run_state_path(temp.path())).expect("load");
        assert_eq!(state, RunState::default());
    }

    #[test]
    fn record_run_round_trips_and_keeps_older_boosts() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = run_state_path(temp.path());

        let mut state = RunState::default();
        state.record_run(
            temp.path(),
            "feat/booster",
            &[BoostOutcome::applied("uv"), BoostOutcome::skipped("ruff", "No pyproject.toml found")],
            Some("abc123"),
        );
        write_run_state(&path, &state).expect("write");

        let mut loaded = load_run_state(&path).expect("load");
        assert_eq!(loaded, state);

        loaded.record_run(
            temp.path(),
            "feat/booster",
            &[BoostOutcome::failed("ruff", "boom")],
            None,
        );
        assert_eq!(loaded.boosts["uv"].status, BoostStatus::Applied);
        assert_eq!(loaded.boosts["ruff"].status, BoostStatus::Failed);
        assert_eq!(loaded.boosts["ruff"].revision, None);
    }
}
