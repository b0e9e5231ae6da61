//! Project data model and project-root discovery
//!
//! A project is identified by the trailing component of its working
//! directory. Directories are recognized as projects by the presence of a
//! well-known indicator entry (config file, VCS dir, manifest).

use crate::config::{ProjectConfig, PROJECT_CONFIG_FILENAME};
use crate::error::{Error, Result};
use std::path::{Path, PathBuf};

/// Directory entries that mark a directory as a project root
pub const DEFAULT_PROJECT_INDICATORS: &[&str] = &[
    PROJECT_CONFIG_FILENAME,
    ".git",
    "Cargo.toml",
    "package.json",
    "pyproject.toml",
    "setup.py",
];

/// Outcome of one completed build
///
/// Produced once per build and stored as the project's `last_status`.
/// The captured streams are those of the last command executed, trimmed of
/// surrounding whitespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildStatus {
    /// Whether every command in the script succeeded
    pub succeeded: bool,
    /// Trimmed stdout of the last command executed
    pub stdout: String,
    /// Trimmed stderr of the last command executed
    pub stderr: String,
}

impl BuildStatus {
    /// Creates a status record, trimming both captured streams
    pub fn new(succeeded: bool, stdout: impl AsRef<str>, stderr: impl AsRef<str>) -> Self {
        Self {
            succeeded,
            stdout: stdout.as_ref().trim().to_string(),
            stderr: stderr.as_ref().trim().to_string(),
        }
    }
}

/// One registered project
#[derive(Debug, Clone)]
pub struct Project {
    /// Unique key, the trailing component of `working_dir`
    pub name: String,
    /// Directory watched recursively and used as the build cwd
    pub working_dir: PathBuf,
    /// Script and debounce settings, replaced in place on re-registration
    pub config: ProjectConfig,
    /// Status of the most recent completed build
    pub last_status: Option<BuildStatus>,
}

impl Project {
    /// Creates a project with no build history
    pub fn new(name: impl Into<String>, working_dir: impl Into<PathBuf>, config: ProjectConfig) -> Self {
        Self {
            name: name.into(),
            working_dir: working_dir.into(),
            config,
            last_status: None,
        }
    }
}

/// Derives a project name from its working directory
pub fn project_name(working_dir: &Path) -> Result<String> {
    working_dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| {
            Error::invalid_input(format!(
                "Cannot derive a project name from {}",
                working_dir.display()
            ))
        })
}

/// Checks whether a directory contains any project indicator entry
pub fn is_project_dir(dir: &Path) -> bool {
    DEFAULT_PROJECT_INDICATORS
        .iter()
        .any(|indicator| dir.join(indicator).exists())
}

/// Finds the closest enclosing directory that looks like a project root
///
/// The search walks up from `start` and stops at the first directory
/// containing one of [`DEFAULT_PROJECT_INDICATORS`].
pub fn find_project_root(start: &Path) -> Result<PathBuf> {
    let start_abs = start
        .canonicalize()
        .map_err(|_| Error::not_a_project(start))?;

    let mut dir = start_abs.as_path();
    loop {
        if is_project_dir(dir) {
            return Ok(dir.to_path_buf());
        }
        dir = match dir.parent() {
            Some(parent) => parent,
            None => return Err(Error::not_a_project(start)),
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn project_config() -> ProjectConfig {
        ProjectConfig {
            script: vec!["true".to_string()],
            build_timeout: 0.1,
        }
    }

    #[test]
    fn test_project_name_from_dir() {
        assert_eq!(
            project_name(Path::new("/home/user/myproject")).expect("name"),
            "myproject"
        );
    }

    #[test]
    fn test_project_name_rejects_root() {
        assert!(project_name(Path::new("/")).is_err());
    }

    #[test]
    fn test_build_status_trims_output() {
        let status = BuildStatus::new(true, "  out \n", "\nerr  ");
        assert_eq!(status.stdout, "out");
        assert_eq!(status.stderr, "err");
    }

    #[test]
    fn test_new_project_has_no_status() {
        let project = Project::new("demo", "/tmp/demo", project_config());
        assert!(project.last_status.is_none());
    }

    #[test]
    fn test_find_project_root_walks_up() {
        let temp = TempDir::new().expect("tempdir");
        std::fs::write(temp.path().join("Cargo.toml"), "[package]").expect("write");
        let nested = temp.path().join("src").join("deep");
        std::fs::create_dir_all(&nested).expect("mkdir");

        let root = find_project_root(&nested).expect("root should be found");
        assert_eq!(root, temp.path().canonicalize().expect("canonicalize"));
    }

    #[test]
    fn test_find_project_root_prefers_closest() {
        let temp = TempDir::new().expect("tempdir");
        std::fs::write(temp.path().join("Cargo.toml"), "[package]").expect("write");
        let inner = temp.path().join("vendored");
        std::fs::create_dir_all(&inner).expect("mkdir");
        std::fs::write(inner.join("package.json"), "{}").expect("write");

        let root = find_project_root(&inner).expect("root should be found");
        assert_eq!(root, inner.canonicalize().expect("canonicalize"));
    }

    #[test]
    fn test_find_project_root_reports_missing() {
        let temp = TempDir::new().expect("tempdir");

        // A bare directory tree with no indicators anywhere up to / is
        // unlikely on a dev machine, so check the nonexistent-path case,
        // which must also be reported as "not a project".
        let missing = temp.path().join("does-not-exist");
        match find_project_root(&missing) {
            Err(Error::NotAProject(path)) => assert_eq!(path, missing),
            other => panic!("expected NotAProject, got {other:?}"),
        }
    }

    #[test]
    fn test_is_project_dir() {
        let temp = TempDir::new().expect("tempdir");
        assert!(!is_project_dir(temp.path()));
        std::fs::write(temp.path().join(PROJECT_CONFIG_FILENAME), "script = []").expect("write");
        assert!(is_project_dir(temp.path()));
    }
}
