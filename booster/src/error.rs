//! Typed failures surfaced by the git and tool adapters.
//!
//! Both convert into `anyhow::Error` at boost boundaries; the orchestrator
//! turns any of them into a `failed` outcome plus rollback.

use thiserror::Error;

/// A git operation failed (bad state, missing binary, unexpected output).
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("failed to spawn git {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("git {command} failed: {stderr}")]
    CommandFailed { command: String, stderr: String },

    #[error("repository has no commits yet")]
    NoCommits,

    #[error("unexpected output from git {command}: '{output}'")]
    UnexpectedOutput { command: String, output: String },
}

/// An external tool (uv, uvx, a checker) could not be run or exited non-zero
/// where success was required.
#[derive(Debug, Error)]
pub enum ToolInvocationError {
    #[error("{program} is not installed or not on PATH")]
    NotFound { program: String },

    #[error("failed to run {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{command} exited with {code}: {output}")]
    Failed {
        command: String,
        code: String,
        output: String,
    },

    #[error("{command} timed out after {secs}s")]
    TimedOut { command: String, secs: u64 },
}
