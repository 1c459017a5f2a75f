//! Copies a project's declared source packages into the staging tree and
//! records them on the build manifest.
use log::*;
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::{
    error::{BundleError, Result},
    manifest::{BuildManifest, PackageInclude, PackageManifest},
    path_helpers::{clean_path, normalize_path},
};

const IGNORED_DIRS: &[&str] = &["__pycache__"];
const IGNORED_EXTENSIONS: &[&str] = &["pyc"];

/// Copies source packages into a single staging directory.
#[derive(Debug, Clone)]
pub struct PackageIncluder {
    staging_dir: PathBuf,
}

impl PackageIncluder {
    pub fn new(staging_dir: impl Into<PathBuf>) -> Self {
        Self {
            staging_dir: staging_dir.into(),
        }
    }

    pub fn staging_dir(&self) -> &Path {
        &self.staging_dir
    }

    /// Includes every `packages` entry of `source` (rooted at `source_root`)
    /// into the staging tree and merges its plugins into `build`. Entries
    /// already bundled from the same path are skipped; the same include
    /// bundled from a different path is a conflict.
    pub fn include(
        &self,
        source: &PackageManifest,
        source_root: &Path,
        build: &mut BuildManifest,
    ) -> Result<()> {
        for package in source.packages.iter() {
            let include = normalize_path(&package.include).into_owned();

            let mut from = source_root.to_path_buf();
            if let Some(folder) = &package.from {
                from = from.join(normalize_path(folder).as_ref());
            }

            let source_path = clean_path(&from.join(&include));

            if build.has_package(&include) {
                match build.package_origin(&include) {
                    Some(existing) if existing != source_path => {
                        return Err(BundleError::PackageConflict {
                            include,
                            existing: existing.to_path_buf(),
                            conflicting: source_path,
                        });
                    }
                    _ => {
                        debug!(
                            "package {include} from {} already included: \
                             skipping",
                            source_root.display()
                        );
                        continue;
                    }
                }
            }

            if !source_path.exists() {
                return Err(BundleError::SourceFolderMissing(source_path));
            }

            let target_path = self.staging_dir.join(&include);

            info!(
                "including package {include} from {}",
                source_root.display()
            );

            copy_tree(&source_path, &target_path)?;

            build.add_package(
                PackageInclude {
                    include,
                    from: None,
                    other: package.other.clone(),
                },
                source_path,
            );
        }

        merge_plugins(source, build);

        Ok(())
    }
}

fn merge_plugins(source: &PackageManifest, build: &mut BuildManifest) {
    for (group, entries) in source.plugins.iter() {
        let target = build
            .poetry_mut()
            .plugins
            .entry(group.clone())
            .or_default();

        for (name, entry) in entries.iter() {
            debug!("merging plugin {group}.{name}");
            target.insert(name.clone(), entry.clone());
        }
    }
}

fn is_ignored(path: &Path) -> bool {
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();

    if path.is_dir() {
        return IGNORED_DIRS.contains(&file_name);
    }

    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| IGNORED_EXTENSIONS.contains(&e))
        .unwrap_or(false)
}

/// Recursively copies a file or directory, creating parents as needed.
fn copy_tree(source: &Path, target: &Path) -> Result<()> {
    if source.is_file() {
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::copy(source, target)?;
        return Ok(());
    }

    fs::create_dir_all(target)?;

    for entry in fs::read_dir(source)? {
        let entry = entry?;
        let path = entry.path();

        if is_ignored(&path) {
            continue;
        }

        copy_tree(&path, &target.join(entry.file_name()))?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::PyProject;
    use crate::test_helpers::write_file;
    use tempfile::TempDir;

    fn lib_manifest() -> PyProject {
        PyProject::parse(
            r#"[tool.poetry]
name = "shared"
version = "0.3.0"
packages = [
    { include = "shared", from = "src" },
    { include = "shared_cli.py" },
]

[tool.poetry.plugins."console_scripts"]
shared = "shared_cli:main"
"#,
        )
        .unwrap()
    }

    #[test]
    fn copies_packages_and_flattens_from() {
        let workspace = TempDir::new().unwrap();
        let lib_root = workspace.path().join("libs/shared");
        write_file(&lib_root.join("src/shared/__init__.py"), "");
        write_file(&lib_root.join("src/shared/core/util.py"), "X = 1\n");
        write_file(&lib_root.join("src/shared/__pycache__/x.pyc"), "");
        write_file(&lib_root.join("shared_cli.py"), "def main(): ...\n");

        let staging = workspace.path().join("dist/staging");
        let includer = PackageIncluder::new(&staging);
        let lib = lib_manifest();
        let mut build = BuildManifest::new(&PyProject::default());

        includer.include(lib.poetry(), &lib_root, &mut build).unwrap();

        assert!(staging.join("shared/__init__.py").is_file());
        assert_eq!(
            fs::read_to_string(staging.join("shared/core/util.py")).unwrap(),
            "X = 1\n"
        );
        assert!(!staging.join("shared/__pycache__").exists());
        assert!(staging.join("shared_cli.py").is_file());

        let packages = &build.poetry().packages;
        assert_eq!(packages.len(), 2);
        assert_eq!(packages[0].include, "shared");
        assert_eq!(packages[0].from, None);

        let scripts = &build.poetry().plugins["console_scripts"];
        assert_eq!(scripts["shared"].as_str(), Some("shared_cli:main"));
    }

    #[test]
    fn reinclusion_is_a_noop() {
        let workspace = TempDir::new().unwrap();
        let lib_root = workspace.path().join("libs/shared");
        write_file(&lib_root.join("src/shared/__init__.py"), "");
        write_file(&lib_root.join("shared_cli.py"), "");

        let includer = PackageIncluder::new(workspace.path().join("staging"));
        let lib = lib_manifest();
        let mut build = BuildManifest::new(&PyProject::default());

        includer.include(lib.poetry(), &lib_root, &mut build).unwrap();
        includer.include(lib.poetry(), &lib_root, &mut build).unwrap();

        assert_eq!(build.poetry().packages.len(), 2);
    }

    #[test]
    fn same_include_from_another_project_conflicts() {
        let workspace = TempDir::new().unwrap();
        let lib_root = workspace.path().join("libs/shared");
        write_file(&lib_root.join("src/shared/__init__.py"), "");
        write_file(&lib_root.join("shared_cli.py"), "");
        let fork_root = workspace.path().join("libs/shared-fork");
        write_file(&fork_root.join("shared/__init__.py"), "");

        let includer = PackageIncluder::new(workspace.path().join("staging"));
        let lib = lib_manifest();
        let fork = PyProject::parse(
            r#"[tool.poetry]
name = "shared-fork"
version = "0.1.0"
packages = [{ include = "shared" }]
"#,
        )
        .unwrap();
        let mut build = BuildManifest::new(&PyProject::default());

        includer.include(lib.poetry(), &lib_root, &mut build).unwrap();
        let result = includer.include(fork.poetry(), &fork_root, &mut build);

        assert!(matches!(
            result,
            Err(BundleError::PackageConflict { include, .. }) if include == "shared"
        ));
        assert_eq!(build.poetry().packages.len(), 2);
    }

    #[test]
    fn missing_source_folder_fails() {
        let workspace = TempDir::new().unwrap();
        let lib_root = workspace.path().join("libs/shared");
        fs::create_dir_all(&lib_root).unwrap();

        let includer = PackageIncluder::new(workspace.path().join("staging"));
        let lib = lib_manifest();
        let mut build = BuildManifest::new(&PyProject::default());

        let result = includer.include(lib.poetry(), &lib_root, &mut build);

        assert!(matches!(result, Err(BundleError::SourceFolderMissing(_))));
    }
}
