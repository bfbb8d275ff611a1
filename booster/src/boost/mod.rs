//! Boost contract and the default ordered boost list.
//!
//! A boost is one self-contained modernization step. It reports
//! [`ApplyResult::Skipped`] when its preconditions are not met (before touching
//! anything), returns an error to request rollback, and otherwise leaves its
//! changes in the working tree for the orchestrator to commit.

pub mod gitignore;
pub mod justfile;
pub mod mypy;
pub mod pre_commit;
pub mod ruff;
pub mod uv;

use std::path::{Path, PathBuf};

use anyhow::{Result, bail};

use crate::core::types::ApplyResult;
use crate::io::config::BoosterConfig;
use crate::io::fetch::TemplateFetcher;
use crate::io::git::Git;
use crate::io::pyproject::PyProject;
use crate::io::uv::Uv;
use crate::suppress::SuppressionEngine;

pub use gitignore::GitignoreBoost;
pub use justfile::JustfileBoost;
pub use mypy::MypyBoost;
pub use pre_commit::PreCommitBoost;
pub use ruff::RuffBoost;
pub use uv::UvBoost;

/// Skip reason used when `uv --version` does not succeed.
pub const UV_MISSING: &str = "uv is not installed";
/// Skip reason used when the repository has no `pyproject.toml`.
pub const PYPROJECT_MISSING: &str = "No pyproject.toml found";
/// Skip reason for placeholder boosts.
pub const NOT_IMPLEMENTED: &str = "Not implemented";

/// Collaborators available to a boost while it runs.
pub struct BoostContext<'a> {
    pub root: PathBuf,
    pub git: Git,
    pub uv: Uv,
    pub pyproject: PyProject,
    pub fetcher: &'a dyn TemplateFetcher,
    pub config: BoosterConfig,
}

impl<'a> BoostContext<'a> {
    pub fn new(root: &Path, config: BoosterConfig, fetcher: &'a dyn TemplateFetcher) -> Self {
        Self {
            root: root.to_path_buf(),
            git: Git::new(root).with_author(config.commit_author.clone()),
            uv: Uv::new(root, config.tool_limits()),
            pyproject: PyProject::new(root),
            fetcher,
            config,
        }
    }

    /// Suppression loop bound to this repository and its configured iteration limit.
    pub fn suppression_engine(&self) -> SuppressionEngine<'_> {
        SuppressionEngine::new(&self.root).max_iterations(self.config.suppression.max_iterations)
    }

    /// Skip unless uv runs and `pyproject.toml` exists.
    pub(crate) fn require_uv_project(&self) -> Option<ApplyResult> {
        if !self.uv.is_available() {
            return Some(ApplyResult::skip(UV_MISSING));
        }
        if !self.pyproject.exists() {
            return Some(ApplyResult::skip(PYPROJECT_MISSING));
        }
        None
    }
}

/// One modernization step.
pub trait Boost {
    /// Stable identifier, derived from the type name by default
    /// (`UvBoost` → `uv`, `PreCommitBoost` → `precommit`).
    fn name(&self) -> String {
        name_from_type(std::any::type_name::<Self>())
    }

    fn apply(&self, ctx: &BoostContext<'_>) -> Result<ApplyResult>;

    /// Message for the final commit the orchestrator makes after `apply`.
    fn commit_message(&self) -> &str;
}

fn name_from_type(type_name: &str) -> String {
    let path = type_name.split('<').next().unwrap_or(type_name);
    let short = path.rsplit("::").next().unwrap_or(path);
    let short = short.strip_suffix("Boost").unwrap_or(short);
    short.to_ascii_lowercase()
}

/// All boosts in the order they run.
pub fn default_boosts() -> Vec<Box<dyn Boost>> {
    vec![
        Box::new(GitignoreBoost),
        Box::new(UvBoost),
        Box::new(RuffBoost),
        Box::new(MypyBoost),
        Box::new(PreCommitBoost),
        Box::new(JustfileBoost),
    ]
}

/// Default boosts restricted to `names`, keeping default order.
///
/// An empty selection means all boosts. Unknown names are an error.
pub fn select_boosts(names: &[String]) -> Result<Vec<Box<dyn Boost>>> {
    let all = default_boosts();
    if names.is_empty() {
        return Ok(all);
    }
    let known: Vec<String> = all.iter().map(|b| b.name()).collect();
    for name in names {
        if !known.contains(name) {
            bail!("unknown boost '{name}' (available: {})", known.join(", "));
        }
    }
    Ok(all.into_iter().filter(|b| names.contains(&b.name())).collect())
}
