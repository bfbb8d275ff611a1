//! Incremental, transactional modernization of Python repositories.
//!
//! Each boost (gitignore, uv, ruff, mypy, ...) is applied on a working
//! branch as its own git transaction: it either lands as one or more commits
//! or is rolled back to the checkpoint taken before it started.
//!
//! - **[`core`]**: Pure logic (outcome types, annotation merging, diagnostic parsing).
//! - **[`io`]**: Side-effecting adapters (git, uv, pyproject, config, run state).
//!
//! [`suppress`] drives the check/annotate loop shared by lint boosts,
//! [`boost`] defines the boost contract and implementations, and
//! [`orchestrator`] sequences them with commit-or-rollback semantics.

pub mod boost;
pub mod core;
pub mod error;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod orchestrator;
pub mod suppress;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
