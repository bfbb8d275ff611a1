//! Turn on mypy strict mode and record every current error as a targeted ignore.

use anyhow::Result;
use tracing::{info, instrument, warn};

use crate::boost::{Boost, BoostContext};
use crate::core::annotation::TypeIgnoreStyle;
use crate::core::diagnostics::parse_mypy_output;
use crate::core::types::ApplyResult;
use crate::io::pyproject::set_value;
use crate::suppress::{CheckOutput, SuppressionOutcome};

const CONFIGURE_MESSAGE: &str = "🔧 Configure mypy with strict mode";
const SILENCE_MESSAGE: &str = "✅ Silence mypy violations";

pub struct MypyBoost;

impl Boost for MypyBoost {
    #[instrument(skip_all, name = "mypy")]
    fn apply(&self, ctx: &BoostContext<'_>) -> Result<ApplyResult> {
        if let Some(skip) = ctx.require_uv_project() {
            return Ok(skip);
        }

        ctx.uv.add_package(&ctx.pyproject, "mypy", "lint")?;
        info!("configuring [tool.mypy] strict = true");
        ctx.pyproject
            .update(|doc| set_value(doc, &["tool", "mypy"], "strict", true))?;
        ctx.git.commit(CONFIGURE_MESSAGE)?;

        let checker = || -> Result<CheckOutput> {
            let out = ctx.uv.run_full_output(&["run", "mypy", "."])?;
            Ok(CheckOutput::from(&out))
        };
        let report = ctx
            .suppression_engine()
            .commit_rounds(&ctx.git, SILENCE_MESSAGE)
            .run(&checker, parse_mypy_output, &TypeIgnoreStyle)?;
        if report.outcome != SuppressionOutcome::Converged {
            warn!(outcome = ?report.outcome, iterations = report.iterations, "mypy still failing");
        }
        Ok(ApplyResult::Completed)
    }

    fn commit_message(&self) -> &str {
        SILENCE_MESSAGE
    }
}
