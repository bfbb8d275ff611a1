//! Test-only helpers: throwaway git repositories, scripted boosts and checkers.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{Context, Result, anyhow, bail};
use tempfile::TempDir;

use crate::boost::{Boost, BoostContext};
use crate::core::types::ApplyResult;
use crate::io::config::BoosterConfig;
use crate::io::fetch::TemplateFetcher;
use crate::io::git::Git;
use crate::suppress::{CheckOutput, Checker};

/// A git repository in a temporary directory with a local identity configured.
pub struct TestRepo {
    dir: TempDir,
}

impl TestRepo {
    /// Repository with one initial commit containing `README.md`.
    pub fn new() -> Result<Self> {
        let repo = Self::empty()?;
        repo.write_file("README.md", "# test\n")?;
        repo.run_git("add", &["-A"])?;
        repo.run_git("commit", &["-q", "-m", "initial"])?;
        Ok(repo)
    }

    /// Initialized repository on branch `main` with no commits.
    pub fn empty() -> Result<Self> {
        let dir = tempfile::tempdir().context("create temp repo dir")?;
        let repo = Self { dir };
        repo.run_git("init", &["-q", "-b", "main"])?;
        repo.run_git("config", &["user.name", "Test User"])?;
        repo.run_git("config", &["user.email", "test@example.com"])?;
        repo.run_git("config", &["commit.gpgsign", "false"])?;
        Ok(repo)
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Adapter bound to this repository.
    pub fn git(&self) -> Git {
        Git::new(self.path())
    }

    /// Context with default config and the given fetcher.
    pub fn context<'a>(&self, fetcher: &'a dyn TemplateFetcher) -> BoostContext<'a> {
        BoostContext::new(self.path(), BoosterConfig::default(), fetcher)
    }

    /// Write `contents` to `rel`, creating parent directories.
    pub fn write_file(&self, rel: &str, contents: &str) -> Result<()> {
        let path = self.path().join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
        }
        fs::write(&path, contents).with_context(|| format!("write {}", path.display()))
    }

    pub fn read_file(&self, rel: &str) -> Result<String> {
        let path = self.path().join(rel);
        fs::read_to_string(&path).with_context(|| format!("read {}", path.display()))
    }

    /// Stage everything and commit with the local identity.
    pub fn commit_all(&self, message: &str) -> Result<()> {
        self.run_git("add", &["-A"])?;
        self.run_git("commit", &["-q", "--allow-empty", "-m", message])
    }

    /// Subject lines from HEAD backwards.
    pub fn log_subjects(&self) -> Result<Vec<String>> {
        let out = Command::new("git")
            .args(["log", "--format=%s"])
            .current_dir(self.path())
            .output()
            .context("spawn git log")?;
        if !out.status.success() {
            bail!("git log failed: {}", String::from_utf8_lossy(&out.stderr));
        }
        Ok(String::from_utf8_lossy(&out.stdout)
            .lines()
            .map(str::to_string)
            .collect())
    }

    fn run_git(&self, subcommand: &str, args: &[&str]) -> Result<()> {
        let status = Command::new("git")
            .arg(subcommand)
            .args(args)
            .current_dir(self.path())
            .status()
            .with_context(|| format!("spawn git {subcommand}"))?;
        if !status.success() {
            bail!("git {subcommand} {} failed with {status}", args.join(" "));
        }
        Ok(())
    }
}

type Action = Box<dyn Fn(&BoostContext<'_>) -> Result<ApplyResult>>;

/// Boost whose behavior is a closure, for driving the orchestrator in tests.
pub struct ScriptedBoost {
    name: String,
    message: String,
    action: Action,
}

impl ScriptedBoost {
    pub fn new(
        name: &str,
        message: &str,
        action: impl Fn(&BoostContext<'_>) -> Result<ApplyResult> + 'static,
    ) -> Self {
        Self {
            name: name.to_string(),
            message: message.to_string(),
            action: Box::new(action),
        }
    }

    /// Writes `rel` with `contents` and completes; commit message `add <rel>`.
    pub fn writing(name: &str, rel: &str, contents: &str) -> Self {
        let rel = rel.to_string();
        let contents = contents.to_string();
        let message = format!("add {rel}");
        Self::new(name, &message, move |ctx| {
            let path = ctx.root.join(&rel);
            fs::write(&path, &contents).with_context(|| format!("write {}", path.display()))?;
            Ok(ApplyResult::Completed)
        })
    }

    /// Dirties the tree, commits once internally, then fails with `error`.
    pub fn failing(name: &str, error: &str) -> Self {
        let error = error.to_string();
        let scratch = format!("{name}.partial");
        Self::new(name, "never committed", move |ctx| {
            fs::write(ctx.root.join(&scratch), "partial\n").context("write scratch")?;
            ctx.git.commit("intermediate")?;
            fs::write(ctx.root.join("untracked.tmp"), "junk\n").context("write junk")?;
            Err(anyhow!("{error}"))
        })
    }

    pub fn skipping(name: &str, reason: &str) -> Self {
        let reason = reason.to_string();
        Self::new(name, "never committed", move |_| Ok(ApplyResult::skip(reason.clone())))
    }

    /// Completes without touching anything.
    pub fn noop(name: &str) -> Self {
        Self::new(name, "noop", |_| Ok(ApplyResult::Completed))
    }
}

impl Boost for ScriptedBoost {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn apply(&self, ctx: &BoostContext<'_>) -> Result<ApplyResult> {
        (self.action)(ctx)
    }

    fn commit_message(&self) -> &str {
        &self.message
    }
}

/// Checker that replays queued outputs, optionally repeating one forever.
pub struct ScriptedChecker {
    queue: RefCell<VecDeque<CheckOutput>>,
    repeat: Option<CheckOutput>,
    calls: Cell<usize>,
}

impl ScriptedChecker {
    pub fn new(outputs: Vec<CheckOutput>) -> Self {
        Self {
            queue: RefCell::new(outputs.into()),
            repeat: None,
            calls: Cell::new(0),
        }
    }

    pub fn repeating(output: CheckOutput) -> Self {
        Self {
            queue: RefCell::new(VecDeque::new()),
            repeat: Some(output),
            calls: Cell::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.get()
    }
}

impl Checker for ScriptedChecker {
    fn run(&self) -> Result<CheckOutput> {
        self.calls.set(self.calls.get() + 1);
        if let Some(next) = self.queue.borrow_mut().pop_front() {
            return Ok(next);
        }
        self.repeat
            .clone()
            .ok_or_else(|| anyhow!("scripted checker exhausted"))
    }
}

/// Fetcher returning a fixed body, or failing when built with [`StaticFetcher::failing`].
pub struct StaticFetcher {
    body: Option<String>,
    requested: RefCell<Vec<Vec<String>>>,
}

impl StaticFetcher {
    pub fn new(body: &str) -> Self {
        Self {
            body: Some(body.to_string()),
            requested: RefCell::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            body: None,
            requested: RefCell::new(Vec::new()),
        }
    }

    /// Template lists passed to each `fetch` call.
    pub fn requested(&self) -> Vec<Vec<String>> {
        self.requested.borrow().clone()
    }
}

impl TemplateFetcher for StaticFetcher {
    fn fetch(&self, templates: &[String]) -> Result<String> {
        self.requested.borrow_mut().push(templates.to_vec());
        self.body
            .clone()
            .ok_or_else(|| anyhow!("network error: connection refused"))
    }
}

/// Executable shell script standing in for an external tool such as `uv`.
#[cfg(unix)]
pub struct FakeTool {
    _dir: TempDir,
    path: PathBuf,
}

#[cfg(unix)]
impl FakeTool {
    pub fn new(name: &str, script: &str) -> Result<Self> {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().context("create fake tool dir")?;
        let path = dir.path().join(name);
        fs::write(&path, script).with_context(|| format!("write {}", path.display()))?;
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755))
            .with_context(|| format!("chmod {}", path.display()))?;
        Ok(Self { _dir: dir, path })
    }

    pub fn program(&self) -> String {
        self.path.to_string_lossy().into_owned()
    }
}
