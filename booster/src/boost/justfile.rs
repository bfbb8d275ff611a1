//! Placeholder for generating a justfile with common commands.

use anyhow::Result;

use crate::boost::{Boost, BoostContext, NOT_IMPLEMENTED};
use crate::core::types::ApplyResult;

pub struct JustfileBoost;

impl Boost for JustfileBoost {
    fn apply(&self, _ctx: &BoostContext<'_>) -> Result<ApplyResult> {
        Ok(ApplyResult::skip(NOT_IMPLEMENTED))
    }

    fn commit_message(&self) -> &str {
        "✨ Add justfile with common commands"
    }
}
