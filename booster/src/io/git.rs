//! Git adapter used as the transactional substrate for boosts.
//!
//! Every boost touches version control only through this wrapper, so it is
//! kept small and explicit: each method maps to one or two `git` subprocess
//! calls and every failure is surfaced as a [`RepositoryError`].

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use tracing::{debug, instrument, warn};

use crate::core::types::Revision;
use crate::error::RepositoryError;

pub type GitResult<T> = std::result::Result<T, RepositoryError>;

/// Author recorded on every commit made by booster.
pub const DEFAULT_COMMIT_AUTHOR: &str = "booster <booster@localhost>";

/// Parsed `git status --porcelain` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusEntry {
    /// 2-letter XY code, or "??" for untracked.
    pub code: String,
    /// Path for the changed file.
    pub path: String,
}

/// Wrapper for executing git commands in a working directory.
#[derive(Debug, Clone)]
pub struct Git {
    workdir: PathBuf,
    author: String,
}

impl Git {
    pub fn new(workdir: impl Into<PathBuf>) -> Self {
        Self {
            workdir: workdir.into(),
            author: DEFAULT_COMMIT_AUTHOR.to_string(),
        }
    }

    /// Override the `--author` used for commits.
    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = author.into();
        self
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    /// True iff neither the index nor the working tree (untracked included) has changes.
    pub fn is_clean(&self) -> GitResult<bool> {
        Ok(self.status_porcelain()?.is_empty())
    }

    /// Get status entries (including untracked) in porcelain format.
    pub fn status_porcelain(&self) -> GitResult<Vec<StatusEntry>> {
        let args = ["status", "--porcelain=v1", "-uall"];
        let out = self.run_capture(&args)?;
        let mut entries = Vec::new();
        for line in out.lines() {
            if line.trim().is_empty() {
                continue;
            }
            entries.push(parse_status_line(line).ok_or_else(|| {
                RepositoryError::UnexpectedOutput {
                    command: args.join(" "),
                    output: line.to_string(),
                }
            })?);
        }
        Ok(entries)
    }

    /// Return the current branch name (errors on detached HEAD).
    pub fn current_branch(&self) -> GitResult<String> {
        let args = ["rev-parse", "--abbrev-ref", "HEAD"];
        let name = self.run_capture(&args)?.trim().to_string();
        if name == "HEAD" {
            warn!("detached HEAD detected");
            return Err(RepositoryError::UnexpectedOutput {
                command: args.join(" "),
                output: "detached HEAD".to_string(),
            });
        }
        Ok(name)
    }

    /// Check whether a local branch exists.
    pub fn branch_exists(&self, branch: &str) -> GitResult<bool> {
        let status = self
            .run(&[
                "show-ref",
                "--verify",
                "--quiet",
                &format!("refs/heads/{branch}"),
            ])?
            .status;
        Ok(status.success())
    }

    /// Check out `branch`, creating it at the current position if it does not exist.
    #[instrument(skip_all, fields(branch))]
    pub fn switch_or_create_branch(&self, branch: &str) -> GitResult<()> {
        if self.branch_exists(branch)? {
            debug!(branch, "checking out existing branch");
            self.run_checked(&["checkout", branch])?;
        } else {
            debug!(branch, "creating and checking out new branch");
            self.run_checked(&["checkout", "-b", branch])?;
        }
        Ok(())
    }

    /// Stage all changes (respects .gitignore).
    pub fn add_all(&self) -> GitResult<()> {
        self.run_checked(&["add", "-A"])?;
        Ok(())
    }

    /// True if the index differs from HEAD.
    pub fn has_staged_changes(&self) -> GitResult<bool> {
        let args = ["diff", "--cached", "--quiet"];
        let out = self.run(&args)?;
        match out.status.code() {
            Some(0) => Ok(false),
            Some(1) => Ok(true),
            _ => Err(command_failed(&args, &out)),
        }
    }

    /// Stage everything and commit if the index differs from HEAD.
    ///
    /// Returns `Ok(false)` when there was nothing to commit.
    #[instrument(skip_all)]
    pub fn commit(&self, message: &str) -> GitResult<bool> {
        self.add_all()?;
        if !self.has_staged_changes()? {
            debug!(message, "no staged changes, skipping commit");
            return Ok(false);
        }
        debug!(message, "committing staged changes");
        self.run_checked(&[
            "commit",
            "--no-verify",
            "--author",
            &self.author,
            "-m",
            message,
        ])?;
        Ok(true)
    }

    /// Full SHA of HEAD. Fails with [`RepositoryError::NoCommits`] on an unborn branch.
    pub fn current_revision(&self) -> GitResult<Revision> {
        let out = self.run(&["rev-parse", "--verify", "--quiet", "HEAD^{commit}"])?;
        if !out.status.success() {
            // Distinguish "not a repository" from "no commits yet".
            self.run_checked(&["rev-parse", "--git-dir"])?;
            return Err(RepositoryError::NoCommits);
        }
        let sha = String::from_utf8_lossy(&out.stdout).trim().to_string();
        if sha.is_empty() {
            return Err(RepositoryError::UnexpectedOutput {
                command: "rev-parse HEAD".to_string(),
                output: sha,
            });
        }
        Ok(Revision::new(sha))
    }

    /// Move HEAD, index and working tree to `revision`, dropping untracked files too.
    #[instrument(skip_all, fields(revision = %revision))]
    pub fn reset_hard(&self, revision: &Revision) -> GitResult<()> {
        debug!("resetting working tree");
        self.run_checked(&["reset", "--hard", "--quiet", revision.as_str()])?;
        self.run_checked(&["clean", "-fdq"])?;
        Ok(())
    }

    /// Number of commits reachable from HEAD.
    pub fn commit_count(&self) -> GitResult<u64> {
        let args = ["rev-list", "--count", "HEAD"];
        let out = self.run_capture(&args)?;
        out.trim()
            .parse()
            .map_err(|_| RepositoryError::UnexpectedOutput {
                command: args.join(" "),
                output: out.trim().to_string(),
            })
    }

    /// Untrack everything and re-add, so files matched by `.gitignore` leave the index.
    pub fn reset_tracking(&self) -> GitResult<()> {
        self.run_checked(&["rm", "-r", "-q", "--cached", "--ignore-unmatch", "."])?;
        self.add_all()
    }

    /// Absolute path of the `.git` directory.
    pub fn git_dir(&self) -> GitResult<PathBuf> {
        let out = self.run_capture(&["rev-parse", "--absolute-git-dir"])?;
        Ok(PathBuf::from(out.trim()))
    }

    fn run_capture(&self, args: &[&str]) -> GitResult<String> {
        let output = self.run_checked(args)?;
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    fn run_checked(&self, args: &[&str]) -> GitResult<Output> {
        let output = self.run(args)?;
        if !output.status.success() {
            return Err(command_failed(args, &output));
        }
        Ok(output)
    }

    fn run(&self, args: &[&str]) -> GitResult<Output> {
        Command::new("git")
            .args(args)
            .current_dir(&self.workdir)
            .output()
            .map_err(|source| RepositoryError::Spawn {
                command: args.join(" "),
                source,
            })
    }
}

fn command_failed(args: &[&str], output: &Output) -> RepositoryError {
    RepositoryError::CommandFailed {
        command: args.join(" "),
        stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
    }
}

fn parse_status_line(line: &str) -> Option<StatusEntry> {
    if let Some(path) = line.strip_prefix("?? ") {
        return Some(StatusEntry {
            code: "??".to_string(),
            path: path.trim().to_string(),
        });
    }
    if line.len() < 4 {
        return None;
    }
    let code = line.get(..2)?.to_string();
    let mut path = line.get(3..)?.trim().to_string();
    if let Some((_, new)) = path.split_once("->") {
        path = new.trim().to_string();
    }
    Some(StatusEntry { code, path })
}
