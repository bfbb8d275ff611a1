//! `pyproject.toml` read/modify/write helpers.
//!
//! One merge rule applies to every edit: make sure the nested tables exist,
//! set the requested keys, and write the file back only if the document
//! actually changed. Re-running an edit is therefore a no-op on disk.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use toml_edit::{DocumentMut, Item, Table, Value};
use tracing::debug;

pub const PYPROJECT_FILE_NAME: &str = "pyproject.toml";

/// Handle on a repository's `pyproject.toml`.
///
/// Edits go through [`toml_edit`], so comments, key order and array layout
/// outside the keys being set survive a rewrite.
#[derive(Debug, Clone)]
pub struct PyProject {
    path: PathBuf,
}

impl PyProject {
    pub fn new(repo_root: &Path) -> Self {
        Self {
            path: repo_root.join(PYPROJECT_FILE_NAME),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    pub fn read(&self) -> Result<DocumentMut> {
        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("read {}", self.path.display()))?;
        contents
            .parse::<DocumentMut>()
            .with_context(|| format!("parse {}", self.path.display()))
    }

    pub fn write(&self, doc: &DocumentMut) -> Result<()> {
        fs::write(&self.path, doc.to_string())
            .with_context(|| format!("write {}", self.path.display()))
    }

    /// Apply `edit` to the document and persist it if anything changed.
    ///
    /// Returns whether the file was rewritten.
    pub fn update(&self, edit: impl FnOnce(&mut DocumentMut) -> Result<()>) -> Result<bool> {
        let mut doc = self.read()?;
        let original = doc.to_string();
        edit(&mut doc)?;
        let updated = doc.to_string();
        if updated == original {
            debug!(path = %self.path.display(), "pyproject unchanged");
            return Ok(false);
        }
        fs::write(&self.path, updated)
            .with_context(|| format!("write {}", self.path.display()))?;
        debug!(path = %self.path.display(), "pyproject updated");
        Ok(true)
    }

    /// True if `package` appears in `[project].dependencies`,
    /// `[project.optional-dependencies]` or `[dependency-groups]`.
    ///
    /// An unreadable or missing file counts as "not present".
    pub fn has_dependency(&self, package: &str) -> bool {
        let Ok(doc) = self.read() else {
            return false;
        };
        let wanted = normalize_package(package);
        let project = doc.get("project").and_then(Item::as_table_like);

        let mut lists: Vec<&Item> = Vec::new();
        if let Some(deps) = project.and_then(|p| p.get("dependencies")) {
            lists.push(deps);
        }
        if let Some(optional) = project
            .and_then(|p| p.get("optional-dependencies"))
            .and_then(Item::as_table_like)
        {
            lists.extend(optional.iter().map(|(_, item)| item));
        }
        if let Some(groups) = doc.get("dependency-groups").and_then(Item::as_table_like) {
            lists.extend(groups.iter().map(|(_, item)| item));
        }

        lists
            .into_iter()
            .filter_map(Item::as_array)
            .flat_map(|array| array.iter())
            .filter_map(Value::as_str)
            .any(|spec| normalize_package(requirement_name(spec)) == wanted)
    }

    /// True if `[tool.<name>]` exists and is a non-empty table.
    pub fn has_tool_section(&self, name: &str) -> bool {
        let Ok(doc) = self.read() else {
            return false;
        };
        doc.get("tool")
            .and_then(Item::as_table_like)
            .and_then(|tool| tool.get(name))
            .and_then(Item::as_table_like)
            .is_some_and(|section| !section.is_empty())
    }
}

/// Walk (creating as needed) the nested tables at `keys`.
///
/// Created tables are implicit, so `[tool]` is not emitted on its own when
/// only `[tool.ruff]` has keys.
pub fn ensure_table<'a>(table: &'a mut Table, keys: &[&str]) -> Result<&'a mut Table> {
    let mut current = table;
    for key in keys {
        let item = current.entry(key).or_insert_with(|| {
            let mut created = Table::new();
            created.set_implicit(true);
            Item::Table(created)
        });
        current = match item {
            Item::Table(table) => table,
            other => bail!("expected [{key}] to be a table, found {}", other.type_name()),
        };
    }
    Ok(current)
}

/// Set `key = value` inside the nested tables at `path`.
///
/// An existing equal value is left alone; an existing different value is
/// replaced in place and keeps its surrounding whitespace and comment.
pub fn set_value(
    table: &mut Table,
    path: &[&str],
    key: &str,
    value: impl Into<Value>,
) -> Result<()> {
    let table =
        ensure_table(table, path).with_context(|| format!("ensure [{}]", path.join(".")))?;
    let value = value.into();
    match table.get_mut(key).and_then(Item::as_value_mut) {
        Some(existing) if same_value(existing, &value) => {}
        Some(existing) => {
            let decor = existing.decor().clone();
            *existing = value;
            *existing.decor_mut() = decor;
        }
        None => {
            table.insert(key, Item::Value(value));
        }
    }
    Ok(())
}

fn same_value(a: &Value, b: &Value) -> bool {
    a.clone().decorated("", "").to_string() == b.clone().decorated("", "").to_string()
}

fn requirement_name(spec: &str) -> &str {
    let end = spec
        .find(|c: char| matches!(c, '>' | '=' | '<' | '!' | '@' | '[' | ';' | '~') || c.is_whitespace())
        .unwrap_or(spec.len());
    &spec[..end]
}

fn normalize_package(name: &str) -> String {
    name.trim().to_ascii_lowercase().replace(['_', '.'], "-")
}

#[cfg(test)]
mod tests {
    use toml_edit::Array;

    use super::*;

    fn pyproject_with(contents: &str) -> (tempfile::TempDir, PyProject) {
        let temp = tempfile::tempdir().expect("tempdir");
        fs::write(temp.path().join(PYPROJECT_FILE_NAME), contents).expect("write");
        let pyproject = PyProject::new(temp.path());
        (temp, pyproject)
    }

    #[test]
    fn update_creates_nested_tables_once() {
        let (_temp, pyproject) = pyproject_with("[project]\nname = \"demo\"\n");
        let edit = |doc: &mut DocumentMut| {
            set_value(doc, &["tool", "ruff", "lint"], "select", Array::from_iter(["ALL"]))
        };
        assert!(pyproject.update(edit).expect("first update"));
        assert!(!pyproject.update(edit).expect("second update"));

        let doc = pyproject.read().expect("read");
        let select = doc["tool"]["ruff"]["lint"]["select"]
            .as_array()
            .expect("array");
        assert_eq!(select.get(0).and_then(Value::as_str), Some("ALL"));
        assert_eq!(doc["project"]["name"].as_str(), Some("demo"));
        assert!(!fs::read_to_string(pyproject.path()).expect("read").contains("[tool]\n"));
    }

    #[test]
    fn update_keeps_comments_and_array_layout() {
        let original = "# Project metadata, keep me\n[project]\nname = \"demo\"  # the name\ndependencies = [\n    \"requests>=2\",  # http\n]\n";
        let (_temp, pyproject) = pyproject_with(original);

        assert!(
            pyproject
                .update(|doc| set_value(doc, &["tool", "mypy"], "strict", true))
                .expect("update")
        );

        let written = fs::read_to_string(pyproject.path()).expect("read");
        assert!(written.starts_with(original), "{written}");
        assert!(written.ends_with("[tool.mypy]\nstrict = true\n"), "{written}");
    }

    #[test]
    fn replacing_a_value_keeps_its_trailing_comment() {
        let (_temp, pyproject) =
            pyproject_with("[tool.ruff]\nline-length = 88  # team default\n");
        pyproject
            .update(|doc| set_value(doc, &["tool", "ruff"], "line-length", 120i64))
            .expect("update");
        assert_eq!(
            fs::read_to_string(pyproject.path()).expect("read"),
            "[tool.ruff]\nline-length = 120  # team default\n"
        );
    }

    #[test]
    fn ensure_table_rejects_scalar_in_path() {
        let mut doc: DocumentMut = "tool = 3\n".parse().expect("parse");
        let err = ensure_table(&mut doc, &["tool", "mypy"]).expect_err("scalar");
        assert!(err.to_string().contains("[tool]"));
    }

    #[test]
    fn finds_dependency_in_groups_and_optional_deps() {
        let (_temp, pyproject) = pyproject_with(
            r#"
[project]
name = "demo"
dependencies = ["requests>=2"]

[project.optional-dependencies]
test = ["PyTest[cov] ; python_version > '3.8'"]

[dependency-groups]
lint = ["ruff==0.6.0"]
"#,
        );
        assert!(pyproject.has_dependency("ruff"));
        assert!(pyproject.has_dependency("pytest"));
        assert!(pyproject.has_dependency("requests"));
        assert!(!pyproject.has_dependency("mypy"));
    }

    #[test]
    fn missing_file_has_no_dependencies() {
        let temp = tempfile::tempdir().expect("tempdir");
        let pyproject = PyProject::new(temp.path());
        assert!(!pyproject.exists());
        assert!(!pyproject.has_dependency("ruff"));
    }

    #[test]
    fn detects_tool_sections() {
        let (_temp, pyproject) = pyproject_with("[tool.poetry]\nname = \"demo\"\n");
        assert!(pyproject.has_tool_section("poetry"));
        assert!(!pyproject.has_tool_section("uv"));
    }
}
