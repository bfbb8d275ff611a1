//! Best-effort `setup.py` metadata extraction for `migrate-to-uv`.
//!
//! `migrate-to-uv` reads declarative `setup.cfg`, not `setup.py`. When a
//! project only has a `setup()` call, the string-literal keywords of that call
//! are copied into a `[metadata]` section so the migration keeps the project
//! name, version and author.

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use std::sync::LazyLock;

use anyhow::{Context, Result};
use regex::Regex;
use tracing::{debug, info};

/// `setup()` keyword → `setup.cfg` `[metadata]` key, in emitted order.
const METADATA_KEYS: [(&str, &str); 8] = [
    ("name", "name"),
    ("version", "version"),
    ("description", "description"),
    ("author", "author"),
    ("author_email", "author-email"),
    ("url", "url"),
    ("license", "license"),
    ("keywords", "keywords"),
];

static SETUP_CALL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bsetup\s*\(").unwrap());

static STRING_KWARG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"^\s*(?P<key>[A-Za-z_][A-Za-z0-9_]*)\s*=\s*(?:"(?P<dq>[^"\\\n]*)"|'(?P<sq>[^'\\\n]*)')\s*$"#,
    )
    .unwrap()
});

/// Keyword arguments of the first `setup(...)` call whose value is a plain
/// string literal. Computed values, escapes and unbalanced calls are ignored.
pub fn setup_string_kwargs(source: &str) -> BTreeMap<String, String> {
    for call in SETUP_CALL_RE.find_iter(source) {
        let line_start = source[..call.start()].rfind('\n').map_or(0, |i| i + 1);
        if source[line_start..call.start()].trim_start().starts_with("def ") {
            continue;
        }
        let Some(args) = top_level_args(&source[call.end()..]) else {
            continue;
        };
        return args
            .iter()
            .filter_map(|arg| STRING_KWARG_RE.captures(arg))
            .filter_map(|caps| {
                let value = caps.name("dq").or_else(|| caps.name("sq"))?;
                Some((caps["key"].to_string(), value.as_str().to_string()))
            })
            .collect();
    }
    BTreeMap::new()
}

/// Split the text after an opening `(` into top-level arguments, dropping
/// comments. `None` if the closing `)` is never reached.
fn top_level_args(rest: &str) -> Option<Vec<String>> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut in_comment = false;

    for c in rest.chars() {
        if in_comment {
            if c == '\n' {
                in_comment = false;
                current.push(c);
            }
            continue;
        }
        if let Some(q) = quote {
            current.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '#' => in_comment = true,
            '"' | '\'' => {
                quote = Some(c);
                current.push(c);
            }
            '(' | '[' | '{' => {
                depth += 1;
                current.push(c);
            }
            ')' if depth == 0 => {
                args.push(current);
                return Some(args);
            }
            ')' | ']' | '}' => {
                depth = depth.saturating_sub(1);
                current.push(c);
            }
            ',' if depth == 0 => args.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    None
}

/// Append a `[metadata]` section to `setup.cfg` built from `setup.py`.
///
/// Callers only invoke this when `setup.cfg` is missing or bare. Returns
/// whether anything was written.
pub fn augment_setup_cfg(root: &Path) -> Result<bool> {
    let Ok(source) = fs::read_to_string(root.join("setup.py")) else {
        return Ok(false);
    };
    let kwargs = setup_string_kwargs(&source);
    let entries: Vec<(&str, &str)> = METADATA_KEYS
        .iter()
        .filter_map(|(py_key, cfg_key)| kwargs.get(*py_key).map(|v| (*cfg_key, v.as_str())))
        .collect();
    if entries.is_empty() {
        debug!("no string metadata in setup.py, leaving setup.cfg alone");
        return Ok(false);
    }

    let path = root.join("setup.cfg");
    let mut contents = match fs::read_to_string(&path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == ErrorKind::NotFound => String::new(),
        Err(err) => return Err(err).with_context(|| format!("read {}", path.display())),
    };
    if !contents.is_empty() {
        if !contents.ends_with('\n') {
            contents.push('\n');
        }
        contents.push('\n');
    }
    contents.push_str("[metadata]\n");
    for (key, value) in &entries {
        contents.push_str(&format!("{key} = {value}\n"));
    }
    fs::write(&path, contents).with_context(|| format!("write {}", path.display()))?;
    info!(keys = entries.len(), "copied setup.py metadata into setup.cfg");
    Ok(true)
}
