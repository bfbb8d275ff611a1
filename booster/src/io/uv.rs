//! Thin wrapper over the `uv`/`uvx` binaries.

use std::path::{Path, PathBuf};

use anyhow::Result;
use tracing::{debug, info};

use crate::io::process::{CommandOutput, ToolLimits, run_tool, run_tool_checked};
use crate::io::pyproject::PyProject;

#[derive(Debug, Clone)]
pub struct Uv {
    workdir: PathBuf,
    limits: ToolLimits,
    uv: String,
    uvx: String,
}

impl Uv {
    pub fn new(workdir: impl Into<PathBuf>, limits: ToolLimits) -> Self {
        Self {
            workdir: workdir.into(),
            limits,
            uv: "uv".to_string(),
            uvx: "uvx".to_string(),
        }
    }

    /// Use different executables for `uv` and `uvx`.
    pub fn with_programs(mut self, uv: impl Into<String>, uvx: impl Into<String>) -> Self {
        self.uv = uv.into();
        self.uvx = uvx.into();
        self
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    /// True if `uv --version` runs and succeeds.
    pub fn is_available(&self) -> bool {
        match run_tool(&self.uv, &["--version"], &self.workdir, self.limits) {
            Ok(out) => out.success(),
            Err(err) => {
                debug!(err = %err, "uv not available");
                false
            }
        }
    }

    /// Run `uv <args>`; a non-zero exit is returned, not raised.
    pub fn run(&self, args: &[&str]) -> Result<CommandOutput> {
        run_tool(&self.uv, args, &self.workdir, self.limits)
    }

    /// Run `uv <args>` without the output cap; a non-zero exit is returned.
    ///
    /// Checkers go through this so no diagnostic line is dropped.
    pub fn run_full_output(&self, args: &[&str]) -> Result<CommandOutput> {
        run_tool(&self.uv, args, &self.workdir, self.limits.unbounded_output())
    }

    /// Run `uv <args>` and fail on non-zero exit.
    pub fn run_checked(&self, args: &[&str]) -> Result<CommandOutput> {
        run_tool_checked(&self.uv, args, &self.workdir, self.limits)
    }

    /// Run `uvx <args>` and fail on non-zero exit.
    pub fn run_uvx_checked(&self, args: &[&str]) -> Result<CommandOutput> {
        run_tool_checked(&self.uvx, args, &self.workdir, self.limits)
    }

    /// `uv add` a package into a dependency group unless it is already declared.
    ///
    /// Returns whether `uv add` was invoked.
    pub fn add_package(&self, pyproject: &PyProject, package: &str, group: &str) -> Result<bool> {
        if pyproject.has_dependency(package) {
            info!(package, "already in dependencies, skipping uv add");
            return Ok(false);
        }
        info!(package, group, "adding dependency");
        self.run_checked(&["add", "--no-install-project", "--group", group, package])?;
        Ok(true)
    }

    /// `uv add -r <file>` into `group`.
    pub fn add_requirements_file(&self, file: &Path, group: &str) -> Result<()> {
        let file = file.to_string_lossy();
        info!(file = %file, group, "adding requirements file");
        self.run_checked(&["add", "--no-install-project", "--group", group, "-r", &file])?;
        Ok(())
    }

    /// Generate or refresh `uv.lock`.
    pub fn lock(&self) -> Result<()> {
        info!("generating uv.lock");
        self.run_checked(&["lock"])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_binary_is_reported_unavailable() {
        let temp = tempfile::tempdir().expect("tempdir");
        let uv = Uv::new(temp.path(), ToolLimits::default())
            .with_programs("booster-no-such-uv", "booster-no-such-uvx");
        assert!(!uv.is_available());
        let err = uv.run_uvx_checked(&["migrate-to-uv"]).expect_err("missing uvx");
        assert!(format!("{err:#}").contains("booster-no-such-uvx"));
    }

    #[cfg(unix)]
    #[test]
    fn full_output_ignores_configured_cap() {
        let temp = tempfile::tempdir().expect("tempdir");
        let tool = crate::test_support::FakeTool::new(
            "uv",
            "#!/bin/sh\nfor i in 1 2 3 4 5 6 7 8; do echo \"a.py:$i:1: F401 unused\"; done\nexit 1\n",
        )
        .expect("fake uv");
        let limits = ToolLimits {
            timeout: None,
            output_limit_bytes: 16,
        };
        let uv = Uv::new(temp.path(), limits).with_programs(tool.program(), "uvx");

        let capped = uv.run(&["run", "ruff", "check", "."]).expect("run");
        assert_eq!(capped.stdout.len(), 16);
        assert!(capped.stdout_truncated > 0);

        let full = uv.run_full_output(&["run", "ruff", "check", "."]).expect("run");
        assert!(!full.success());
        assert_eq!(full.stdout_truncated, 0);
        assert_eq!(String::from_utf8_lossy(&full.stdout).lines().count(), 8);
    }
}
