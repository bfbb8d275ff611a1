//! Bounded check → annotate → re-check loop shared by lint and type-check boosts.
//!
//! The engine knows nothing about the tool it drives: the caller supplies a
//! [`Checker`], a parser turning output into a [`ViolationSet`] and an
//! [`AnnotationStyle`]. Each round rewrites only the offending lines and,
//! when configured, checkpoints the round with a commit.

use std::fs;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, info, instrument, warn};

use crate::core::annotation::AnnotationStyle;
use crate::core::types::ViolationSet;
use crate::io::git::Git;
use crate::io::process::CommandOutput;

/// Default upper bound on checker invocations per loop.
pub const MAX_ITERATIONS: u32 = 3;

/// Exit status and combined text output of one checker run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckOutput {
    pub success: bool,
    pub output: String,
}

impl From<&CommandOutput> for CheckOutput {
    fn from(out: &CommandOutput) -> Self {
        Self {
            success: out.success(),
            output: out.combined(),
        }
    }
}

/// Runs the external checker once.
pub trait Checker {
    fn run(&self) -> Result<CheckOutput>;
}

impl<F> Checker for F
where
    F: Fn() -> Result<CheckOutput>,
{
    fn run(&self) -> Result<CheckOutput> {
        self()
    }
}

/// How a suppression loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuppressionOutcome {
    /// The checker passed.
    Converged,
    /// The checker failed but nothing in its output was parseable.
    Unresolved,
    /// Every allowed iteration annotated something and the checker still failed.
    Exhausted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuppressionReport {
    /// Number of checker invocations.
    pub iterations: u32,
    pub outcome: SuppressionOutcome,
    /// Lines whose content changed across all rounds.
    pub lines_annotated: usize,
}

/// Configured convergence loop for one repository.
#[derive(Debug, Clone)]
pub struct SuppressionEngine<'a> {
    root: &'a Path,
    max_iterations: u32,
    round_commit: Option<(&'a Git, &'a str)>,
}

impl<'a> SuppressionEngine<'a> {
    pub fn new(root: &'a Path) -> Self {
        Self {
            root,
            max_iterations: MAX_ITERATIONS,
            round_commit: None,
        }
    }

    pub fn max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = max_iterations.max(1);
        self
    }

    /// Commit each annotation round with `message`.
    pub fn commit_rounds(mut self, git: &'a Git, message: &'a str) -> Self {
        self.round_commit = Some((git, message));
        self
    }

    /// Drive `checker` until it passes, stops producing parseable output, or
    /// the iteration bound is reached.
    #[instrument(skip_all, fields(max_iterations = self.max_iterations))]
    pub fn run<C, P, S>(&self, checker: &C, parse: P, style: &S) -> Result<SuppressionReport>
    where
        C: Checker + ?Sized,
        P: Fn(&str) -> ViolationSet,
        S: AnnotationStyle + ?Sized,
    {
        let mut lines_annotated = 0usize;
        for iteration in 1..=self.max_iterations {
            info!(iteration, max = self.max_iterations, "running check");
            let check = checker.run().context("run checker")?;
            if check.success {
                info!(iteration, "check passed");
                return Ok(SuppressionReport {
                    iterations: iteration,
                    outcome: SuppressionOutcome::Converged,
                    lines_annotated,
                });
            }

            let violations = parse(&check.output);
            if violations.is_empty() {
                warn!(iteration, "check failed without parseable violations; stopping");
                debug!(output = %check.output, "unparsed checker output");
                return Ok(SuppressionReport {
                    iterations: iteration,
                    outcome: SuppressionOutcome::Unresolved,
                    lines_annotated,
                });
            }

            info!(iteration, locations = violations.len(), "annotating violations");
            lines_annotated += apply_violations(self.root, &violations, style)?;

            if let Some((git, message)) = self.round_commit {
                git.commit(message)
                    .with_context(|| format!("commit suppression round {iteration}"))?;
            }
        }

        warn!(max = self.max_iterations, "suppression loop exhausted");
        Ok(SuppressionReport {
            iterations: self.max_iterations,
            outcome: SuppressionOutcome::Exhausted,
            lines_annotated,
        })
    }
}

/// Merge annotations for every violation into the files under `root`.
///
/// Files that no longer exist, paths resolving outside `root` and line
/// numbers past end-of-file are skipped.
/// Returns the number of lines whose content changed.
pub fn apply_violations<S>(root: &Path, violations: &ViolationSet, style: &S) -> Result<usize>
where
    S: AnnotationStyle + ?Sized,
{
    let mut changed = 0usize;
    for (file, lines) in violations.by_file() {
        let Some(path) = path_under_root(root, file) else {
            warn!(file, "path outside the repository, skipping");
            continue;
        };
        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                warn!(path = %path.display(), "file not found, skipping");
                continue;
            }
            Err(err) => {
                return Err(err).with_context(|| format!("read {}", path.display()));
            }
        };

        let mut raw_lines: Vec<String> = contents.split_inclusive('\n').map(str::to_string).collect();
        let mut file_changed = 0usize;
        for (line_number, codes) in lines {
            let Some(raw) = line_number.checked_sub(1).and_then(|i| raw_lines.get_mut(i)) else {
                debug!(path = %path.display(), line_number, "line past end of file, skipping");
                continue;
            };
            let merged = style.merge(raw, codes);
            if merged != *raw {
                *raw = merged;
                file_changed += 1;
            }
        }

        if file_changed > 0 {
            fs::write(&path, raw_lines.concat())
                .with_context(|| format!("write {}", path.display()))?;
            changed += file_changed;
        }
    }
    Ok(changed)
}

/// `root` joined with `file` when `file` stays inside `root`.
///
/// Absolute paths are accepted only below `root`; `..` is never accepted.
fn path_under_root(root: &Path, file: &str) -> Option<PathBuf> {
    let file = Path::new(file);
    let relative = if file.is_absolute() {
        file.strip_prefix(root).ok()?
    } else {
        file
    };
    relative
        .components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
        .then(|| root.join(relative))
}
