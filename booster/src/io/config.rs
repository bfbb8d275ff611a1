//! Booster configuration stored in `booster.toml` at the repository root.

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::io::git::DEFAULT_COMMIT_AUTHOR;
use crate::io::process::ToolLimits;

/// File name looked up at the repository root when no `--config` is given.
pub const CONFIG_FILE_NAME: &str = "booster.toml";

/// Booster configuration (TOML).
///
/// Missing fields default to the values used when no file exists.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct BoosterConfig {
    /// Branch all boost commits land on.
    pub branch: String,

    /// `--author` recorded on booster commits.
    pub commit_author: String,

    /// Boost names to run, in default order. Empty means all.
    pub boosts: Vec<String>,

    pub suppression: SuppressionConfig,

    pub tools: ToolsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SuppressionConfig {
    /// Upper bound on checker invocations per suppression loop.
    pub max_iterations: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ToolsConfig {
    /// Per-invocation timeout for uv/ruff/mypy. `0` disables it.
    pub timeout_secs: u64,

    /// Truncate captured tool stdout/stderr beyond this many bytes.
    /// Lint and type-check runs feeding the suppression loop are never capped.
    pub output_limit_bytes: usize,
}

impl Default for SuppressionConfig {
    fn default() -> Self {
        Self { max_iterations: 3 }
    }
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 0,
            output_limit_bytes: 1_000_000,
        }
    }
}

impl Default for BoosterConfig {
    fn default() -> Self {
        Self {
            branch: "feat/booster".to_string(),
            commit_author: DEFAULT_COMMIT_AUTHOR.to_string(),
            boosts: Vec::new(),
            suppression: SuppressionConfig::default(),
            tools: ToolsConfig::default(),
        }
    }
}

impl BoosterConfig {
    pub fn validate(&self) -> Result<()> {
        if self.branch.trim().is_empty() || self.branch.starts_with('-') {
            return Err(anyhow!("branch must be a non-empty name not starting with '-'"));
        }
        if !self.commit_author.contains('<') || !self.commit_author.ends_with('>') {
            return Err(anyhow!("commit_author must look like 'Name <email>'"));
        }
        if self.suppression.max_iterations == 0 {
            return Err(anyhow!("suppression.max_iterations must be > 0"));
        }
        if self.tools.output_limit_bytes == 0 {
            return Err(anyhow!("tools.output_limit_bytes must be > 0"));
        }
        Ok(())
    }

    pub fn tool_limits(&self) -> ToolLimits {
        ToolLimits {
            timeout: (self.tools.timeout_secs > 0)
                .then(|| Duration::from_secs(self.tools.timeout_secs)),
            output_limit_bytes: self.tools.output_limit_bytes,
        }
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `BoosterConfig::default()`.
pub fn load_config(path: &Path) -> Result<BoosterConfig> {
    if !path.exists() {
        let cfg = BoosterConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: BoosterConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()
        .with_context(|| format!("invalid {}", path.display()))?;
    Ok(cfg)
}
