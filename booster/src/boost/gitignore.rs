//! Generate `.gitignore` from gitignore.io templates and untrack ignored files.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::{info, instrument};

use crate::boost::{Boost, BoostContext};
use crate::core::types::ApplyResult;

/// Marks the block this boost appended; its presence makes re-runs a no-op.
pub const GITIGNORE_HEADER: &str = "# Generated by booster";

/// Templates requested for every repository.
pub const ALWAYS_TEMPLATES: [&str; 3] = ["linux", "macos", "windows"];

const INTERMEDIATE_MESSAGE: &str = "✨ Add .gitignore";

/// Marker file → templates it implies.
const MARKERS: &[(&str, &[&str])] = &[
    ("pyproject.toml", &["python"]),
    ("setup.py", &["python"]),
    ("requirements.txt", &["python"]),
    ("package.json", &["node"]),
    ("Cargo.toml", &["rust"]),
    ("go.mod", &["go"]),
    ("pom.xml", &["java", "maven"]),
    ("build.gradle", &["java", "gradle"]),
];

pub struct GitignoreBoost;

/// Template names for the languages detected at `root`, followed by the OS templates.
pub fn detect_templates(root: &Path) -> Vec<String> {
    let mut templates: Vec<String> = Vec::new();
    let detected = MARKERS
        .iter()
        .filter(|(marker, _)| root.join(marker).is_file())
        .flat_map(|(_, names)| names.iter());
    for name in detected.chain(ALWAYS_TEMPLATES.iter()) {
        if !templates.iter().any(|t| t.as_str() == *name) {
            templates.push((*name).to_string());
        }
    }
    templates
}

/// Existing content with the generated block appended under [`GITIGNORE_HEADER`].
fn append_generated(existing: &str, generated: &str) -> String {
    let mut out = String::with_capacity(existing.len() + generated.len() + 32);
    out.push_str(existing);
    if !existing.is_empty() {
        if !existing.ends_with('\n') {
            out.push('\n');
        }
        out.push('\n');
    }
    out.push_str(GITIGNORE_HEADER);
    out.push('\n');
    out.push_str(generated);
    if !generated.ends_with('\n') {
        out.push('\n');
    }
    out
}

impl Boost for GitignoreBoost {
    #[instrument(skip_all, name = "gitignore")]
    fn apply(&self, ctx: &BoostContext<'_>) -> Result<ApplyResult> {
        let path = ctx.root.join(".gitignore");
        let existing = if path.exists() {
            fs::read_to_string(&path).with_context(|| format!("read {}", path.display()))?
        } else {
            String::new()
        };

        if existing.contains(GITIGNORE_HEADER) {
            info!("generated block already present, leaving .gitignore as is");
        } else {
            let templates = detect_templates(&ctx.root);
            info!(templates = %templates.join(","), "fetching gitignore templates");
            let generated = ctx
                .fetcher
                .fetch(&templates)
                .context("fetch gitignore templates")?;
            fs::write(&path, append_generated(&existing, &generated))
                .with_context(|| format!("write {}", path.display()))?;
            ctx.git.commit(INTERMEDIATE_MESSAGE)?;
        }

        info!("removing ignored files from the index");
        ctx.git.reset_tracking()?;
        Ok(ApplyResult::Completed)
    }

    fn commit_message(&self) -> &str {
        "🧹 Remove gitignored files from tracking"
    }
}
