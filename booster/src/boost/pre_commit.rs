//! Placeholder for pre-commit hook setup.

use anyhow::Result;

use crate::boost::{Boost, BoostContext, NOT_IMPLEMENTED};
use crate::core::types::ApplyResult;

pub struct PreCommitBoost;

impl Boost for PreCommitBoost {
    fn apply(&self, _ctx: &BoostContext<'_>) -> Result<ApplyResult> {
        Ok(ApplyResult::skip(NOT_IMPLEMENTED))
    }

    fn commit_message(&self) -> &str {
        "✨ Add pre-commit hooks"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{StaticFetcher, TestRepo};

    #[test]
    fn always_skips() {
        let repo = TestRepo::new().expect("repo");
        let fetcher = StaticFetcher::new("");
        let result = PreCommitBoost.apply(&repo.context(&fetcher)).expect("apply");
        assert_eq!(result, ApplyResult::skip(NOT_IMPLEMENTED));
        assert_eq!(PreCommitBoost.name(), "precommit");
    }
}
