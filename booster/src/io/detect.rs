//! Existence checks for dependency manifests in a repository.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use walkdir::{DirEntry, WalkDir};

/// Which well-known dependency files exist at the repository root.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DependencyFiles {
    pub requirements_txt: bool,
    pub setup_py: bool,
    pub setup_cfg: bool,
    pub pyproject_toml: bool,
    pub pipfile: bool,
    pub pipfile_lock: bool,
    pub poetry_lock: bool,
}

pub fn detect_dependency_files(root: &Path) -> DependencyFiles {
    let exists = |name: &str| root.join(name).is_file();
    DependencyFiles {
        requirements_txt: exists("requirements.txt"),
        setup_py: exists("setup.py"),
        setup_cfg: exists("setup.cfg"),
        pyproject_toml: exists("pyproject.toml"),
        pipfile: exists("Pipfile"),
        pipfile_lock: exists("Pipfile.lock"),
        poetry_lock: exists("poetry.lock"),
    }
}

/// Requirements files split into the main file and named groups.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectRequirements {
    /// `requirements.txt` at the repository root.
    pub main: Option<PathBuf>,
    /// Group name → files, e.g. `requirements-dev.txt` → `dev`.
    pub groups: BTreeMap<String, Vec<PathBuf>>,
}

impl ProjectRequirements {
    pub fn is_empty(&self) -> bool {
        self.main.is_none() && self.groups.is_empty()
    }
}

/// Find `requirements*.txt` and `*-requirements.txt` anywhere under `root`,
/// skipping hidden directories and virtualenvs.
pub fn detect_requirements_files(root: &Path) -> ProjectRequirements {
    let mut found = ProjectRequirements::default();
    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| entry.depth() == 0 || !is_ignored_dir(entry));
    for entry in walker.filter_map(Result::ok) {
        if !entry.file_type().is_file() {
            continue;
        }
        let Some(name) = entry.file_name().to_str() else {
            continue;
        };
        let relative = entry
            .path()
            .strip_prefix(root)
            .unwrap_or(entry.path())
            .to_path_buf();
        match requirements_group(name) {
            Some(group) => found.groups.entry(group).or_default().push(relative),
            None if name == "requirements.txt" && entry.depth() == 1 => {
                found.main = Some(relative);
            }
            None => {}
        }
    }
    found
}

/// Group name encoded in a requirements file name, `None` for the main file or non-matches.
///
/// Accepts `requirements-X.txt`, `requirements.X.txt` and `X-requirements.txt`.
pub fn requirements_group(file_name: &str) -> Option<String> {
    let stem = file_name.strip_suffix(".txt")?;
    if stem == "requirements" {
        return None;
    }
    let group = stem
        .strip_prefix("requirements-")
        .or_else(|| stem.strip_prefix("requirements."))
        .or_else(|| stem.strip_suffix("-requirements"))?;
    if group.is_empty() || group.contains(['.', '/']) {
        return None;
    }
    Some(group.to_string())
}

/// True when `setup.cfg` is missing or declares neither `[metadata]` nor `[options]`.
pub fn is_setup_cfg_bare(root: &Path) -> bool {
    let Ok(contents) = fs::read_to_string(root.join("setup.cfg")) else {
        return true;
    };
    !contents.lines().map(str::trim).any(|line| {
        line.eq_ignore_ascii_case("[metadata]") || line.eq_ignore_ascii_case("[options]")
    })
}

fn is_ignored_dir(entry: &DirEntry) -> bool {
    if !entry.file_type().is_dir() {
        return false;
    }
    let name = entry.file_name().to_string_lossy();
    name.starts_with('.') || matches!(name.as_ref(), "node_modules" | "venv" | "__pycache__")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn group_names_follow_file_conventions() {
        assert_eq!(requirements_group("requirements.txt"), None);
        assert_eq!(requirements_group("requirements-dev.txt"), Some("dev".to_string()));
        assert_eq!(requirements_group("requirements.test.txt"), Some("test".to_string()));
        assert_eq!(requirements_group("docs-requirements.txt"), Some("docs".to_string()));
        assert_eq!(requirements_group("notes.txt"), None);
    }

    #[test]
    fn detects_main_and_grouped_requirements() {
        let temp = tempfile::tempdir().expect("tempdir");
        let root = temp.path();
        fs::write(root.join("requirements.txt"), "requests\n").expect("write");
        fs::write(root.join("requirements-dev.txt"), "pytest\n").expect("write");
        fs::create_dir_all(root.join(".venv")).expect("mkdir");
        fs::write(root.join(".venv/requirements-x.txt"), "ignored\n").expect("write");

        let found = detect_requirements_files(root);
        assert_eq!(found.main, Some(PathBuf::from("requirements.txt")));
        assert_eq!(
            found.groups.get("dev"),
            Some(&vec![PathBuf::from("requirements-dev.txt")])
        );
        assert!(!found.groups.contains_key("x"));
    }

    #[test]
    fn setup_cfg_bareness() {
        let temp = tempfile::tempdir().expect("tempdir");
        assert!(is_setup_cfg_bare(temp.path()));
        fs::write(temp.path().join("setup.cfg"), "[flake8]\nmax-line-length = 100\n").expect("write");
        assert!(is_setup_cfg_bare(temp.path()));
        fs::write(temp.path().join("setup.cfg"), "[metadata]\nname = demo\n").expect("write");
        assert!(!is_setup_cfg_bare(temp.path()));
    }

    #[test]
    fn detects_root_manifests() {
        let temp = tempfile::tempdir().expect("tempdir");
        fs::write(temp.path().join("poetry.lock"), "").expect("write");
        let files = detect_dependency_files(temp.path());
        assert!(files.poetry_lock);
        assert!(!files.pyproject_toml);
    }
}
