//! Parsers turning checker output into a [`ViolationSet`].
//!
//! Lines that do not look like `file:line...` diagnostics (summaries, notes,
//! progress output) are ignored.

use std::sync::LazyLock;

use regex::Regex;

use crate::core::types::{ViolationLocation, ViolationSet};

static RUFF_LINE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.+?):(\d+):\d+:\s+([A-Z][A-Z0-9]+)\s").unwrap());

static MYPY_LINE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.+?):(\d+):\s+error:.*?\[([^\]]+)\]\s*$").unwrap());

/// Parse `ruff check --output-format=concise` output.
///
/// Example line: `src/app.py:12:5: F841 Local variable `x` is assigned to but never used`.
pub fn parse_ruff_output(output: &str) -> ViolationSet {
    parse_with(&RUFF_LINE_RE, output)
}

/// Parse `mypy` output. Only `error:` lines carrying a bracketed code count.
///
/// Example line: `src/foo.py:10: error: Incompatible types in assignment  [assignment]`.
pub fn parse_mypy_output(output: &str) -> ViolationSet {
    parse_with(&MYPY_LINE_RE, output)
}

fn parse_with(pattern: &Regex, output: &str) -> ViolationSet {
    let mut violations = ViolationSet::new();
    for line in output.lines() {
        let Some(caps) = pattern.captures(line.trim_end_matches('\r')) else {
            continue;
        };
        let Ok(line_number) = caps[2].parse::<usize>() else {
            continue;
        };
        if line_number == 0 {
            continue;
        }
        violations.insert(ViolationLocation::new(&caps[1], line_number), &caps[3]);
    }
    violations
}
