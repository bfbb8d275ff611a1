//! Apply modernization boosts to a Python repository, one commit at a time.
//!
//! `booster run` checks out a working branch, runs each selected boost as a
//! commit-or-rollback transaction, prints a summary and records the outcomes
//! under the repository's git directory.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::warn;

use booster::boost::{BoostContext, default_boosts, select_boosts};
use booster::core::types::{BoostOutcome, BoostStatus};
use booster::exit_codes;
use booster::io::config::{CONFIG_FILE_NAME, load_config};
use booster::io::fetch::HttpTemplateFetcher;
use booster::io::git::Git;
use booster::io::run_state::{load_run_state, run_state_path, write_run_state};
use booster::logging;
use booster::orchestrator::{prepare_branch, run_boosts};

#[derive(Parser)]
#[command(
    name = "booster",
    version,
    about = "Incrementally modernize a Python repository with revertible commits"
)]
struct Cli {
    /// Log progress to stderr (same as RUST_LOG=booster=info).
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run boosts on a repository.
    Run {
        /// Repository root.
        #[arg(long, default_value = ".")]
        path: PathBuf,
        /// Working branch (overrides the config file).
        #[arg(long)]
        branch: Option<String>,
        /// Run only the named boost; repeatable.
        #[arg(long = "only", value_name = "NAME")]
        only: Vec<String>,
        /// Config file (defaults to booster.toml in the repository root).
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Print the available boosts in run order.
    List,
}

fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose);
    match run(cli.command) {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("{:#}", err);
            std::process::exit(exit_codes::FAILED);
        }
    }
}

fn run(command: Command) -> Result<i32> {
    match command {
        Command::Run {
            path,
            branch,
            only,
            config,
        } => cmd_run(&path, branch, &only, config),
        Command::List => {
            for boost in default_boosts() {
                println!("{}", boost.name());
            }
            Ok(exit_codes::OK)
        }
    }
}

fn cmd_run(
    path: &Path,
    branch: Option<String>,
    only: &[String],
    config: Option<PathBuf>,
) -> Result<i32> {
    let root = path
        .canonicalize()
        .with_context(|| format!("resolve repository path {}", path.display()))?;
    let config_path = config.unwrap_or_else(|| root.join(CONFIG_FILE_NAME));
    let cfg = load_config(&config_path)?;
    let branch = branch.unwrap_or_else(|| cfg.branch.clone());
    let selected = if only.is_empty() { &cfg.boosts[..] } else { only };
    let boosts = select_boosts(selected)?;

    let git = Git::new(&root).with_author(cfg.commit_author.clone());
    prepare_branch(&git, &branch)?;

    let fetcher = HttpTemplateFetcher::default();
    let ctx = BoostContext::new(&root, cfg, &fetcher);
    let outcomes = run_boosts(&ctx, &boosts, |outcome| {
        println!("{}", outcome_line(outcome));
    });

    println!();
    print!("{}", render_summary(&outcomes));

    if let Err(err) = record_outcomes(&git, &root, &branch, &outcomes) {
        warn!(error = %format!("{err:#}"), "could not record run state");
    }

    let failed = outcomes.iter().any(|o| o.status == BoostStatus::Failed);
    Ok(if failed {
        exit_codes::FAILED
    } else {
        exit_codes::OK
    })
}

fn record_outcomes(git: &Git, root: &Path, branch: &str, outcomes: &[BoostOutcome]) -> Result<()> {
    let path = run_state_path(&git.git_dir()?);
    let mut state = load_run_state(&path)?;
    let head = git.current_revision().ok();
    state.record_run(root, branch, outcomes, head.as_ref().map(|r| r.as_str()));
    write_run_state(&path, &state)
}

fn status_marker(status: BoostStatus) -> &'static str {
    match status {
        BoostStatus::Applied => "✓",
        BoostStatus::Skipped => "-",
        BoostStatus::Failed => "✗",
    }
}

fn outcome_line(outcome: &BoostOutcome) -> String {
    format!(
        "{} {}: {}",
        status_marker(outcome.status),
        outcome.name,
        outcome.message
    )
}

/// Fixed-width table of outcomes followed by a totals line.
fn render_summary(outcomes: &[BoostOutcome]) -> String {
    let width = outcomes
        .iter()
        .map(|o| o.name.chars().count())
        .chain(std::iter::once("boost".len()))
        .max()
        .unwrap_or(0);
    let mut out = format!("{:<width$}  {:<8}  message\n", "boost", "status");
    for o in outcomes {
        out.push_str(&format!(
            "{:<width$}  {:<8}  {}\n",
            o.name,
            o.status.as_str(),
            o.message
        ));
    }
    let count = |status: BoostStatus| outcomes.iter().filter(|o| o.status == status).count();
    out.push_str(&format!(
        "{} applied, {} skipped, {} failed\n",
        count(BoostStatus::Applied),
        count(BoostStatus::Skipped),
        count(BoostStatus::Failed)
    ));
    out
}
