//! Inline suppression annotations (`# noqa: ...`, `# type: ignore[...]`).
//!
//! Merging is monotonic: codes already present on a line are kept, new codes
//! are unioned in, and the emitted list is always sorted. Only the marker is
//! rewritten; the rest of the line and its terminator are left untouched.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::{Captures, Regex};

/// Strategy for rendering and merging one tool's suppression marker.
pub trait AnnotationStyle {
    /// Merge `codes` into `raw_line` (which may end with `\n` or `\r\n`).
    fn merge(&self, raw_line: &str, codes: &BTreeSet<String>) -> String;
}

/// Ruff/flake8 style: `# noqa: E501, F401`.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoqaStyle;

/// Mypy style: `# type: ignore[assignment, arg-type]`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TypeIgnoreStyle;

static NOQA_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"#\s*noqa(?::\s*(?P<codes>[A-Za-z][A-Za-z0-9]*(?:\s*,\s*[A-Za-z][A-Za-z0-9]*)*))?").unwrap()
});

static TYPE_IGNORE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"#\s*type:\s*ignore(?:\[(?P<codes>[^\]]*)\])?").unwrap());

impl AnnotationStyle for NoqaStyle {
    fn merge(&self, raw_line: &str, codes: &BTreeSet<String>) -> String {
        merge_marker(raw_line, codes, &NOQA_RE, |codes| {
            format!("# noqa: {}", codes.join(", "))
        })
    }
}

impl AnnotationStyle for TypeIgnoreStyle {
    fn merge(&self, raw_line: &str, codes: &BTreeSet<String>) -> String {
        merge_marker(raw_line, codes, &TYPE_IGNORE_RE, |codes| {
            format!("# type: ignore[{}]", codes.join(", "))
        })
    }
}

/// Split a raw line into its content and its original terminator.
pub fn split_line_ending(raw_line: &str) -> (&str, &str) {
    let content = raw_line.trim_end_matches(['\n', '\r']);
    (content, &raw_line[content.len()..])
}

fn merge_marker(
    raw_line: &str,
    codes: &BTreeSet<String>,
    pattern: &Regex,
    render: impl Fn(&[&str]) -> String,
) -> String {
    let (line, eol) = split_line_ending(raw_line);

    let Some(caps) = pattern.captures(line) else {
        let sorted: Vec<&str> = codes.iter().map(String::as_str).collect();
        return format!("{line}  {}{eol}", render(&sorted));
    };

    let mut merged = existing_codes(&caps);
    merged.extend(codes.iter().map(|code| code.trim()).filter(|c| !c.is_empty()));
    let sorted: Vec<&str> = merged.into_iter().collect();
    let marker = caps.get_match();

    let mut out = String::with_capacity(raw_line.len() + 16);
    out.push_str(&line[..marker.start()]);
    out.push_str(&render(&sorted));
    out.push_str(&line[marker.end()..]);
    out.push_str(eol);
    out
}

fn existing_codes<'a>(caps: &Captures<'a>) -> BTreeSet<&'a str> {
    caps.name("codes")
        .map(|m| {
            m.as_str()
                .split(',')
                .map(str::trim)
                .filter(|code| !code.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codes(list: &[&str]) -> BTreeSet<String> {
        list.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn appends_type_ignore_with_two_spaces() {
        let out = TypeIgnoreStyle.merge("x: int = 'hello'\n", &codes(&["assignment"]));
        assert_eq!(out, "x: int = 'hello'  # type: ignore[assignment]\n");
    }

    #[test]
    fn appends_sorted_noqa_codes() {
        let out = NoqaStyle.merge("import os\n", &codes(&["F401", "E401"]));
        assert_eq!(out, "import os  # noqa: E401, F401\n");
    }

    #[test]
    fn merges_into_existing_noqa_preserving_trailing_text() {
        let out = NoqaStyle.merge("x = 1  # noqa: E501 keep me\n", &codes(&["D100", "E501"]));
        assert_eq!(out, "x = 1  # noqa: D100, E501 keep me\n");
    }

    #[test]
    fn merges_into_existing_type_ignore_as_sorted_union() {
        let out = TypeIgnoreStyle.merge(
            "y = f()  # type: ignore[no-untyped-call]\n",
            &codes(&["assignment", "no-untyped-call"]),
        );
        assert_eq!(out, "y = f()  # type: ignore[assignment, no-untyped-call]\n");
    }

    #[test]
    fn keeps_existing_codes_in_their_own_case() {
        let out = NoqaStyle.merge("x = 1  # noqa: e501\n", &codes(&["E501"]));
        assert_eq!(out, "x = 1  # noqa: E501, e501\n");
    }

    #[test]
    fn upgrades_bare_markers() {
        let out = NoqaStyle.merge("x = 1  # noqa\n", &codes(&["E501"]));
        assert_eq!(out, "x = 1  # noqa: E501\n");
        let out = TypeIgnoreStyle.merge("x = 1  # type: ignore\n", &codes(&["misc"]));
        assert_eq!(out, "x = 1  # type: ignore[misc]\n");
    }

    #[test]
    fn preserves_crlf_terminator() {
        let out = NoqaStyle.merge("x = 1\r\n", &codes(&["E501"]));
        assert_eq!(out, "x = 1  # noqa: E501\r\n");
    }

    #[test]
    fn handles_last_line_without_terminator() {
        let out = TypeIgnoreStyle.merge("z = g()", &codes(&["misc"]));
        assert_eq!(out, "z = g()  # type: ignore[misc]");
    }

    #[test]
    fn merging_is_idempotent() {
        let once = NoqaStyle.merge("a = b\n", &codes(&["F821"]));
        let twice = NoqaStyle.merge(&once, &codes(&["F821"]));
        assert_eq!(once, twice);
    }
}
