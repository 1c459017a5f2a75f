//! Common test helper functions shared across test modules.
//!
//! Fixtures are written to real temporary directories so that manifest
//! loading, package inclusion and path rebasing run against the filesystem.
use std::{fs, path::Path};

use crate::{config::PROJECT_CONFIG_FILE, manifest::MANIFEST_FILE};

/// Writes `content` to `path`, creating parent directories as needed.
pub fn write_file(path: &Path, content: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

/// Writes a project root holding `pyproject` as its manifest.
pub fn write_project(root: &Path, pyproject: &str) {
    write_file(&root.join(MANIFEST_FILE), pyproject);
}

/// Writes a `project.json` whose build target carries `options`.
///
/// # Example
/// ```ignore
/// write_project_config(&root, r#"{ "publish": false }"#);
/// ```
pub fn write_project_config(root: &Path, options: &str) {
    write_file(
        &root.join(PROJECT_CONFIG_FILE),
        &format!(r#"{{ "targets": {{ "build": {{ "options": {options} }} }} }}"#),
    );
}
