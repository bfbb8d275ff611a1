//! Helpers for running external tools with bounded output and an optional timeout.

use std::io::{ErrorKind, Read};
use std::path::Path;
use std::process::{Command, ExitStatus, Stdio};
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use tracing::{debug, instrument, warn};
use wait_timeout::ChildExt;

use crate::error::ToolInvocationError;

/// Limits applied to every external tool invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToolLimits {
    /// `None` waits forever.
    pub timeout: Option<Duration>,
    /// Bytes kept per stream; the rest is drained and counted.
    pub output_limit_bytes: usize,
}

impl Default for ToolLimits {
    fn default() -> Self {
        Self {
            timeout: None,
            output_limit_bytes: 1_000_000,
        }
    }
}

impl ToolLimits {
    /// Same timeout, but every byte of output is kept.
    pub fn unbounded_output(self) -> Self {
        Self {
            output_limit_bytes: usize::MAX,
            ..self
        }
    }
}

/// Captured child process output.
#[derive(Debug)]
pub struct CommandOutput {
    pub status: ExitStatus,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub stdout_truncated: usize,
    pub stderr_truncated: usize,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.status.success()
    }

    /// stdout followed by stderr, lossily decoded.
    pub fn combined(&self) -> String {
        let mut buf = String::from_utf8_lossy(&self.stdout).into_owned();
        if !buf.is_empty() && !buf.ends_with('\n') && !self.stderr.is_empty() {
            buf.push('\n');
        }
        buf.push_str(&String::from_utf8_lossy(&self.stderr));
        buf
    }

    fn exit_code(&self) -> String {
        self.status
            .code()
            .map_or_else(|| "signal".to_string(), |code| code.to_string())
    }
}

/// Run `program args...` in `workdir`, capturing stdout/stderr without risking pipe deadlocks.
///
/// A missing binary is reported as [`ToolInvocationError::NotFound`] and a
/// timeout as [`ToolInvocationError::TimedOut`]; a non-zero exit is not an
/// error here (see [`run_tool_checked`]).
#[instrument(skip_all, fields(program, output_limit_bytes = limits.output_limit_bytes))]
pub fn run_tool(
    program: &str,
    args: &[&str],
    workdir: &Path,
    limits: ToolLimits,
) -> Result<CommandOutput> {
    let command_line = render_command(program, args);
    let mut cmd = Command::new(program);
    cmd.args(args)
        .current_dir(workdir)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    debug!(command = %command_line, "spawning tool");
    let mut child = match cmd.spawn() {
        Ok(c) => c,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(ToolInvocationError::NotFound {
                program: program.to_string(),
            }
            .into());
        }
        Err(source) => {
            return Err(ToolInvocationError::Spawn {
                command: command_line,
                source,
            }
            .into());
        }
    };

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| anyhow!("stdout was not piped"))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| anyhow!("stderr was not piped"))?;

    let limit = limits.output_limit_bytes;
    let stdout_handle = thread::spawn(move || read_stream_limited(stdout, limit));
    let stderr_handle = thread::spawn(move || read_stream_limited(stderr, limit));

    let status = match limits.timeout {
        None => child.wait().context("wait for tool")?,
        Some(timeout) => match child.wait_timeout(timeout).context("wait for tool")? {
            Some(status) => status,
            None => {
                warn!(timeout_secs = timeout.as_secs(), "tool timed out, killing");
                child.kill().context("kill tool")?;
                child.wait().context("wait tool after kill")?;
                return Err(ToolInvocationError::TimedOut {
                    command: command_line,
                    secs: timeout.as_secs(),
                }
                .into());
            }
        },
    };

    let (stdout, stdout_truncated) = join_output(stdout_handle).context("join stdout")?;
    let (stderr, stderr_truncated) = join_output(stderr_handle).context("join stderr")?;

    if stdout_truncated > 0 || stderr_truncated > 0 {
        warn!(stdout_truncated, stderr_truncated, "output truncated");
    }

    debug!(exit_code = ?status.code(), "tool finished");
    Ok(CommandOutput {
        status,
        stdout,
        stderr,
        stdout_truncated,
        stderr_truncated,
    })
}

/// Like [`run_tool`], but a non-zero exit becomes [`ToolInvocationError::Failed`].
pub fn run_tool_checked(
    program: &str,
    args: &[&str],
    workdir: &Path,
    limits: ToolLimits,
) -> Result<CommandOutput> {
    let output = run_tool(program, args, workdir, limits)?;
    if !output.success() {
        return Err(ToolInvocationError::Failed {
            command: render_command(program, args),
            code: output.exit_code(),
            output: output.combined().trim().to_string(),
        }
        .into());
    }
    Ok(output)
}

fn render_command(program: &str, args: &[&str]) -> String {
    if args.is_empty() {
        return program.to_string();
    }
    format!("{program} {}", args.join(" "))
}

fn join_output(handle: thread::JoinHandle<Result<(Vec<u8>, usize)>>) -> Result<(Vec<u8>, usize)> {
    match handle.join() {
        Ok(result) => result,
        Err(_) => Err(anyhow!("output reader thread panicked")),
    }
}

fn read_stream_limited<R: Read>(mut reader: R, limit: usize) -> Result<(Vec<u8>, usize)> {
    let mut buf = Vec::new();
    let mut truncated = 0usize;
    let mut chunk = [0u8; 8192];

    loop {
        let n = reader.read(&mut chunk).context("read output")?;
        if n == 0 {
            break;
        }
        let remaining = limit.saturating_sub(buf.len());
        if remaining > 0 {
            let keep = n.min(remaining);
            buf.extend_from_slice(&chunk[..keep]);
            truncated += n.saturating_sub(keep);
        } else {
            truncated += n;
        }
    }

    Ok((buf, truncated))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_binary_is_not_found() {
        let temp = tempfile::tempdir().expect("tempdir");
        let err = run_tool(
            "booster-definitely-missing-binary",
            &[],
            temp.path(),
            ToolLimits::default(),
        )
        .expect_err("missing");
        assert!(matches!(
            err.downcast_ref::<ToolInvocationError>(),
            Some(ToolInvocationError::NotFound { .. })
        ));
    }

    #[test]
    fn checked_run_reports_non_zero_exit() {
        let temp = tempfile::tempdir().expect("tempdir");
        let err = run_tool_checked(
            "git",
            &["definitely-not-a-subcommand"],
            temp.path(),
            ToolLimits::default(),
        )
        .expect_err("fails");
        assert!(matches!(
            err.downcast_ref::<ToolInvocationError>(),
            Some(ToolInvocationError::Failed { .. })
        ));
    }

    #[test]
    fn output_is_bounded() {
        let temp = tempfile::tempdir().expect("tempdir");
        let out = run_tool(
            "git",
            &["--version"],
            temp.path(),
            ToolLimits {
                timeout: Some(Duration::from_secs(30)),
                output_limit_bytes: 3,
            },
        )
        .expect("git --version");
        assert!(out.success());
        assert_eq!(out.stdout.len(), 3);
        assert!(out.stdout_truncated > 0);
    }

    #[test]
    fn combined_joins_streams() {
        let temp = tempfile::tempdir().expect("tempdir");
        let out = run_tool("git", &["--version"], temp.path(), ToolLimits::default())
            .expect("git --version");
        assert!(out.combined().starts_with("git version"));
    }
}
