//! Adopt ruff with every rule enabled, auto-format, and silence the remainder.

use anyhow::Result;
use toml_edit::Array;
use tracing::{info, instrument, warn};

use crate::boost::{Boost, BoostContext};
use crate::core::annotation::NoqaStyle;
use crate::core::diagnostics::parse_ruff_output;
use crate::core::types::ApplyResult;
use crate::io::pyproject::set_value;
use crate::suppress::{CheckOutput, SuppressionOutcome};

const CONFIGURE_MESSAGE: &str = "🔧 Configure ruff";
const FORMAT_MESSAGE: &str = "🎨 Auto-format with ruff";
const SILENCE_MESSAGE: &str = "✅ Silence ruff violations";

pub const LINE_LENGTH: i64 = 120;

pub struct RuffBoost;

impl Boost for RuffBoost {
    #[instrument(skip_all, name = "ruff")]
    fn apply(&self, ctx: &BoostContext<'_>) -> Result<ApplyResult> {
        if let Some(skip) = ctx.require_uv_project() {
            return Ok(skip);
        }

        ctx.uv.add_package(&ctx.pyproject, "ruff", "lint")?;
        info!("configuring [tool.ruff]");
        ctx.pyproject.update(|doc| {
            set_value(doc, &["tool", "ruff"], "line-length", LINE_LENGTH)?;
            set_value(doc, &["tool", "ruff", "lint"], "select", Array::from_iter(["ALL"]))
        })?;
        ctx.git.commit(CONFIGURE_MESSAGE)?;

        info!("running ruff format");
        let formatted = ctx.uv.run(&["run", "ruff", "format", "."])?;
        if !formatted.success() {
            warn!(output = %formatted.combined(), "ruff format reported errors");
        }
        ctx.git.commit(FORMAT_MESSAGE)?;

        let checker = || -> Result<CheckOutput> {
            let out = ctx
                .uv
                .run_full_output(&["run", "ruff", "check", ".", "--output-format=concise"])?;
            Ok(CheckOutput::from(&out))
        };
        let report = ctx
            .suppression_engine()
            .commit_rounds(&ctx.git, SILENCE_MESSAGE)
            .run(&checker, parse_ruff_output, &NoqaStyle)?;
        if report.outcome != SuppressionOutcome::Converged {
            warn!(outcome = ?report.outcome, iterations = report.iterations, "ruff check still failing");
        }
        Ok(ApplyResult::Completed)
    }

    fn commit_message(&self) -> &str {
        SILENCE_MESSAGE
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::boost::{PYPROJECT_MISSING, UV_MISSING};
    use crate::io::process::ToolLimits;
    use crate::io::uv::Uv;
    use crate::test_support::{FakeTool, StaticFetcher, TestRepo};

    const FAKE_UV: &str = r#"#!/bin/sh
case "$1" in
  --version) echo "uv 0.0.0"; exit 0 ;;
  add|lock) exit 0 ;;
  run)
    case "$2 $3" in
      "ruff format") exit 0 ;;
      "ruff check")
        if grep -q "noqa" app.py; then exit 0; fi
        echo "app.py:1:8: F401 [*] \`os\` imported but unused"
        echo "Found 1 error."
        exit 1 ;;
    esac ;;
esac
exit 2
"#;

    #[test]
    fn configures_formats_and_silences() {
        let repo = TestRepo::new().expect("repo");
        repo.write_file("pyproject.toml", "[project]\nname = \"demo\"\n").expect("write");
        repo.write_file("app.py", "import os\n").expect("write");
        repo.commit_all("project").expect("commit");

        let uv = FakeTool::new("uv", FAKE_UV).expect("fake uv");
        let fetcher = StaticFetcher::new("");
        let mut ctx = repo.context(&fetcher);
        ctx.uv = Uv::new(repo.path(), ToolLimits::default()).with_programs(uv.program(), "uvx");

        let result = RuffBoost.apply(&ctx).expect("apply");
        assert_eq!(result, ApplyResult::Completed);

        assert_eq!(repo.read_file("app.py").expect("read"), "import os  # noqa: F401\n");
        let doc: toml::Table =
            toml::from_str(&repo.read_file("pyproject.toml").expect("read")).expect("parse");
        let ruff = &doc["tool"]["ruff"];
        assert_eq!(ruff["line-length"].as_integer(), Some(LINE_LENGTH));
        assert_eq!(
            ruff["lint"]["select"],
            toml::Value::Array(vec![toml::Value::String("ALL".to_string())])
        );
        let subjects = repo.log_subjects().expect("log");
        assert_eq!(
            &subjects[..2],
            &[SILENCE_MESSAGE.to_string(), CONFIGURE_MESSAGE.to_string()]
        );
        assert!(repo.git().is_clean().expect("clean"));
    }

    #[test]
    fn skips_without_pyproject() {
        let repo = TestRepo::new().expect("repo");
        let uv = FakeTool::new("uv", FAKE_UV).expect("fake uv");
        let fetcher = StaticFetcher::new("");
        let mut ctx = repo.context(&fetcher);
        ctx.uv = Uv::new(repo.path(), ToolLimits::default()).with_programs(uv.program(), "uvx");

        assert_eq!(
            RuffBoost.apply(&ctx).expect("apply"),
            ApplyResult::skip(PYPROJECT_MISSING)
        );
    }

    #[test]
    fn skips_without_uv() {
        let repo = TestRepo::new().expect("repo");
        repo.write_file("pyproject.toml", "[project]\nname = \"demo\"\n").expect("write");
        let fetcher = StaticFetcher::new("");
        let mut ctx = repo.context(&fetcher);
        ctx.uv = Uv::new(repo.path(), ToolLimits::default())
            .with_programs("booster-no-such-uv", "booster-no-such-uvx");

        assert_eq!(RuffBoost.apply(&ctx).expect("apply"), ApplyResult::skip(UV_MISSING));
    }
}
