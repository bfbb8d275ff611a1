//! Stable exit codes for booster CLI commands.

/// Every selected boost was applied or skipped.
pub const OK: i32 = 0;
/// At least one boost failed, or setup (config, repository, branch) failed.
pub const FAILED: i32 = 1;
