//! Runs boosts in order, each inside a commit-or-rollback transaction.
//!
//! Per boost: checkpoint HEAD, call `apply`, then commit whatever is left in
//! the working tree. Any error resets the repository to the checkpoint
//! (discarding the boost's own intermediate commits) and is recorded as a
//! `failed` outcome; the run always continues with the next boost.

use anyhow::{Result, anyhow};
use tracing::{info, instrument, warn};

use crate::boost::{Boost, BoostContext};
use crate::core::types::{ApplyResult, BoostOutcome, Revision};
use crate::io::git::Git;

/// Message recorded when a boost completed but produced no net change.
pub const NO_CHANGES: &str = "No changes to commit";

enum Settled {
    Skipped(String),
    Applied,
    Unchanged,
}

/// Switch to `branch` (creating it if needed) after checking the tree is clean.
#[instrument(skip_all, fields(branch))]
pub fn prepare_branch(git: &Git, branch: &str) -> Result<()> {
    if !git.is_clean()? {
        return Err(anyhow!(
            "working tree has uncommitted changes; commit or stash them before running booster"
        ));
    }
    git.switch_or_create_branch(branch)?;
    info!(branch, "on working branch");
    Ok(())
}

/// Run `boosts` in order and return one outcome per boost.
///
/// `on_outcome` sees each outcome as soon as its boost settles.
pub fn run_boosts(
    ctx: &BoostContext<'_>,
    boosts: &[Box<dyn Boost>],
    mut on_outcome: impl FnMut(&BoostOutcome),
) -> Vec<BoostOutcome> {
    let mut outcomes = Vec::with_capacity(boosts.len());
    for boost in boosts {
        let outcome = run_one(ctx, boost.as_ref());
        on_outcome(&outcome);
        outcomes.push(outcome);
    }
    outcomes
}

#[instrument(skip_all, fields(boost = %boost.name()))]
fn run_one(ctx: &BoostContext<'_>, boost: &dyn Boost) -> BoostOutcome {
    let name = boost.name();
    info!("starting boost");

    let before = match ctx.git.current_revision() {
        Ok(rev) => rev,
        Err(err) => {
            warn!(err = %err, "cannot checkpoint, not running boost");
            return BoostOutcome::failed(name, format!("cannot read current revision: {err}"));
        }
    };

    let outcome = match settle(ctx, boost, &before) {
        Ok(Settled::Skipped(reason)) => BoostOutcome::skipped(&name, reason),
        Ok(Settled::Applied) => BoostOutcome::applied(&name),
        Ok(Settled::Unchanged) => BoostOutcome::skipped(&name, NO_CHANGES),
        Err(err) => {
            let message = format!("{err:#}");
            warn!(error = %message, revision = %before, "boost failed, rolling back");
            match ctx.git.reset_hard(&before) {
                Ok(()) => BoostOutcome::failed(&name, message),
                Err(rollback) => {
                    warn!(error = %rollback, "rollback failed");
                    BoostOutcome::failed(
                        &name,
                        format!("{message}; rollback to {before} also failed: {rollback}"),
                    )
                }
            }
        }
    };
    info!(status = %outcome.status, message = %outcome.message, "boost finished");
    outcome
}

fn settle(ctx: &BoostContext<'_>, boost: &dyn Boost, before: &Revision) -> Result<Settled> {
    match boost.apply(ctx)? {
        ApplyResult::Skipped(signal) => Ok(Settled::Skipped(signal.reason)),
        ApplyResult::Completed => {
            let committed = ctx.git.commit(boost.commit_message())?;
            if committed || ctx.git.current_revision()? != *before {
                Ok(Settled::Applied)
            } else {
                Ok(Settled::Unchanged)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::BoostStatus;
    use crate::test_support::{ScriptedBoost, StaticFetcher, TestRepo};

    fn statuses(outcomes: &[BoostOutcome]) -> Vec<(String, BoostStatus)> {
        outcomes
            .iter()
            .map(|o| (o.name.clone(), o.status))
            .collect()
    }

    #[test]
    fn applied_then_failed_rolls_back_only_the_failure() {
        let repo = TestRepo::new().expect("repo");
        let fetcher = StaticFetcher::new("");
        let ctx = repo.context(&fetcher);
        let boosts: Vec<Box<dyn Boost>> = vec![
            Box::new(ScriptedBoost::writing("a", "a.txt", "a\n")),
            Box::new(ScriptedBoost::failing("b", "boom")),
        ];

        let outcomes = run_boosts(&ctx, &boosts, |_| {});
        assert_eq!(
            statuses(&outcomes),
            vec![
                ("a".to_string(), BoostStatus::Applied),
                ("b".to_string(), BoostStatus::Failed),
            ]
        );
        assert_eq!(outcomes[0].message, "Success");
        assert!(outcomes[1].message.contains("boom"));

        let subjects = repo.log_subjects().expect("log");
        assert_eq!(subjects[0], "add a.txt");
        assert!(repo.git().is_clean().expect("clean"));
        assert!(!repo.path().join("b.partial").exists());
        assert!(!repo.path().join("untracked.tmp").exists());
    }

    #[test]
    fn failure_restores_exact_checkpoint() {
        let repo = TestRepo::new().expect("repo");
        let fetcher = StaticFetcher::new("");
        let ctx = repo.context(&fetcher);
        let before = repo.git().current_revision().expect("rev");

        let boosts: Vec<Box<dyn Boost>> = vec![Box::new(ScriptedBoost::failing("x", "nope"))];
        run_boosts(&ctx, &boosts, |_| {});

        assert_eq!(repo.git().current_revision().expect("rev"), before);
        assert!(repo.git().is_clean().expect("clean"));
    }

    #[test]
    fn skip_and_no_change_do_not_commit() {
        let repo = TestRepo::new().expect("repo");
        let fetcher = StaticFetcher::new("");
        let ctx = repo.context(&fetcher);
        let count = repo.git().commit_count().expect("count");

        let boosts: Vec<Box<dyn Boost>> = vec![
            Box::new(ScriptedBoost::skipping("s", "uv is not installed")),
            Box::new(ScriptedBoost::noop("n")),
        ];
        let outcomes = run_boosts(&ctx, &boosts, |_| {});

        assert_eq!(outcomes[0], BoostOutcome::skipped("s", "uv is not installed"));
        assert_eq!(outcomes[1], BoostOutcome::skipped("n", NO_CHANGES));
        assert_eq!(repo.git().commit_count().expect("count"), count);
    }

    #[test]
    fn second_run_is_idempotent() {
        let repo = TestRepo::new().expect("repo");
        let fetcher = StaticFetcher::new("");
        let ctx = repo.context(&fetcher);
        let boosts: Vec<Box<dyn Boost>> = vec![
            Box::new(ScriptedBoost::writing("a", "a.txt", "a\n")),
            Box::new(ScriptedBoost::writing("b", "b.txt", "b\n")),
        ];

        run_boosts(&ctx, &boosts, |_| {});
        let count = repo.git().commit_count().expect("count");
        let second = run_boosts(&ctx, &boosts, |_| {});

        assert_eq!(repo.git().commit_count().expect("count"), count);
        assert!(second.iter().all(|o| *o == BoostOutcome::skipped(&o.name, NO_CHANGES)));
    }

    #[test]
    fn internal_commits_alone_count_as_applied() {
        let repo = TestRepo::new().expect("repo");
        let fetcher = StaticFetcher::new("");
        let ctx = repo.context(&fetcher);
        let boosts: Vec<Box<dyn Boost>> = vec![Box::new(ScriptedBoost::new("c", "final", |ctx| {
            std::fs::write(ctx.root.join("c.txt"), "c\n")?;
            ctx.git.commit("internal")?;
            Ok(ApplyResult::Completed)
        }))];

        let outcomes = run_boosts(&ctx, &boosts, |_| {});
        assert_eq!(outcomes[0].status, BoostStatus::Applied);
        assert_eq!(repo.log_subjects().expect("log")[0], "internal");
    }

    #[test]
    fn missing_checkpoint_is_a_failure() {
        let repo = TestRepo::empty().expect("repo");
        let fetcher = StaticFetcher::new("");
        let ctx = repo.context(&fetcher);
        let boosts: Vec<Box<dyn Boost>> = vec![Box::new(ScriptedBoost::noop("n"))];

        let mut seen = Vec::new();
        let outcomes = run_boosts(&ctx, &boosts, |o| seen.push(o.name.clone()));
        assert_eq!(outcomes[0].status, BoostStatus::Failed);
        assert!(outcomes[0].message.contains("no commits"));
        assert_eq!(seen, vec!["n".to_string()]);
    }

    #[test]
    fn failed_rollback_is_reported_in_the_outcome() {
        let repo = TestRepo::new().expect("repo");
        let fetcher = StaticFetcher::new("");
        let ctx = repo.context(&fetcher);
        let before = repo.git().current_revision().expect("rev");
        let boosts: Vec<Box<dyn Boost>> = vec![
            Box::new(ScriptedBoost::new("breaks-repo", "never committed", |ctx| {
                std::fs::rename(ctx.root.join(".git"), ctx.root.join("git.moved"))?;
                Err(anyhow!("boom"))
            })),
            Box::new(ScriptedBoost::noop("after")),
        ];

        let outcomes = run_boosts(&ctx, &boosts, |_| {});

        assert_eq!(outcomes.len(), 2);
        assert_eq!(outcomes[0].status, BoostStatus::Failed);
        assert!(outcomes[0].message.starts_with("boom; rollback to "));
        assert!(outcomes[0].message.contains(&format!("{before} also failed")));
        assert_eq!(outcomes[1].status, BoostStatus::Failed);
    }

    #[test]
    fn prepare_branch_refuses_dirty_tree() {
        let repo = TestRepo::new().expect("repo");
        repo.write_file("dirty.txt", "x\n").expect("write");
        let err = prepare_branch(&repo.git(), "feat/booster").expect_err("dirty");
        assert!(err.to_string().contains("uncommitted changes"));
        assert_eq!(repo.git().current_branch().expect("branch"), "main");
    }

    #[test]
    fn prepare_branch_switches_to_working_branch() {
        let repo = TestRepo::new().expect("repo");
        prepare_branch(&repo.git(), "feat/booster").expect("prepare");
        assert_eq!(repo.git().current_branch().expect("branch"), "feat/booster");
    }
}
