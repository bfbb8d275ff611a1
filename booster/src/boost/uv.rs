//! Move a Python project onto uv-managed dependencies with a lockfile.

use std::path::Path;

use anyhow::{Context, Result};
use toml_edit::{DocumentMut, table, value};
use tracing::{info, instrument};

use crate::boost::{Boost, BoostContext, UV_MISSING};
use crate::core::types::ApplyResult;
use crate::io::detect::{detect_dependency_files, detect_requirements_files, is_setup_cfg_bare};
use crate::io::pyproject::{PyProject, set_value};
use crate::io::setup_py::augment_setup_cfg;

pub struct UvBoost;

/// True when something `migrate-to-uv` can convert is present and the
/// project is not already configured for uv.
pub fn has_migration_source(root: &Path, pyproject: &PyProject) -> bool {
    if pyproject.has_tool_section("uv") {
        return false;
    }
    let files = detect_dependency_files(root);
    if files.poetry_lock || files.pipfile || files.pipfile_lock {
        return true;
    }
    if pyproject.has_tool_section("poetry") {
        return true;
    }
    if files.setup_cfg && !is_setup_cfg_bare(root) {
        return true;
    }
    if files.setup_py && !files.pyproject_toml {
        return true;
    }
    !detect_requirements_files(root).is_empty()
}

/// `[project]` name derived from the repository directory.
fn project_name(root: &Path) -> String {
    let raw = root
        .file_name()
        .map(|n| n.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    let name = raw.replace([' ', '_'], "-");
    let name = name.trim_matches('-');
    if name.is_empty() {
        "project".to_string()
    } else {
        name.to_string()
    }
}

fn minimal_pyproject(root: &Path) -> DocumentMut {
    let mut project = table();
    project["name"] = value(project_name(root));
    project["version"] = value("0.1.0");
    project["requires-python"] = value(">=3.8");
    let mut doc = DocumentMut::new();
    doc["project"] = project;
    doc
}

/// Copy `setup()` metadata into a bare `setup.cfg` so `migrate-to-uv` sees it.
fn prepare_setup_cfg(root: &Path) -> Result<()> {
    if detect_dependency_files(root).setup_py && is_setup_cfg_bare(root) {
        info!("setup.py with bare setup.cfg, copying setup() metadata");
        augment_setup_cfg(root).context("augment setup.cfg from setup.py")?;
    }
    Ok(())
}

impl Boost for UvBoost {
    #[instrument(skip_all, name = "uv")]
    fn apply(&self, ctx: &BoostContext<'_>) -> Result<ApplyResult> {
        if !ctx.uv.is_available() {
            return Ok(ApplyResult::skip(UV_MISSING));
        }

        if has_migration_source(&ctx.root, &ctx.pyproject) {
            let requirements = detect_requirements_files(&ctx.root);
            prepare_setup_cfg(&ctx.root)?;
            info!("migration source detected, running migrate-to-uv");
            ctx.uv
                .run_uvx_checked(&["migrate-to-uv"])
                .context("migrate to uv")?;
            for (group, files) in &requirements.groups {
                for file in files {
                    ctx.uv.add_requirements_file(file, group)?;
                }
            }
        }

        if !ctx.pyproject.exists() {
            info!("no pyproject.toml, creating a minimal one");
            ctx.pyproject.write(&minimal_pyproject(&ctx.root))?;
        }
        ctx.pyproject
            .update(|doc| set_value(doc, &["tool", "uv"], "package", true))?;
        ctx.uv.lock().context("generate uv.lock")?;
        Ok(ApplyResult::Completed)
    }

    fn commit_message(&self) -> &str {
        "✨ Add UV dependency management"
    }
}
