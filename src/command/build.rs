//! Build command: stages a project's sources and a flattened manifest.
use derive_builder::Builder;
use log::*;
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::{
    config::ProjectConfigLookup,
    error::{BundleError, Result},
    includer::PackageIncluder,
    lock::RequirementsExporter,
    manifest::{BuildManifest, PyProject},
    path_helpers::{normalize_path, project_key},
    resolver::{
        LockedDependencyResolver, LockedResolveOptions,
        ProjectDependencyResolver, ProjectResolveOptions,
    },
};

/// Manifest key naming the readme file(s) shipped with the distribution.
const README_KEY: &str = "readme";

#[derive(Debug, Clone, Builder)]
#[builder(setter(into), build_fn(private, name = "_build"))]
pub struct BuildOptions {
    /// Root of the project being built
    pub project_root: PathBuf,
    /// Staging directory, wiped before every build
    pub output_dir: PathBuf,
    /// Workspace root used as fallback location of the lock file
    #[builder(default = "PathBuf::from(\".\")")]
    pub workspace_root: PathBuf,
    /// Resolve from the lock file instead of declared constraints
    #[builder(default = "true")]
    pub locked_versions: bool,
    /// Inline every local dependency, publishable or not
    #[builder(default = "true")]
    pub bundle_local_dependencies: bool,
    /// Include the dev group in locked exports
    #[builder(default)]
    pub dev_dependencies: bool,
}

impl BuildOptionsBuilder {
    pub fn build(&self) -> Result<BuildOptions> {
        self._build().map_err(|e| {
            BundleError::invalid_config(format!(
                "Failed to build options: {e}"
            ))
        })
    }
}

impl BuildOptions {
    pub fn builder() -> BuildOptionsBuilder {
        BuildOptionsBuilder::default()
    }
}

/// Execute the build command and return the written build manifest.
pub fn execute(
    options: &BuildOptions,
    exporter: &dyn RequirementsExporter,
    config_lookup: &dyn ProjectConfigLookup,
) -> Result<BuildManifest> {
    let project_root = &options.project_root;
    let output_dir = &options.output_dir;

    info!("building {}", project_root.display());

    let manifest = PyProject::load(project_root)?;

    reset_output_dir(project_root, output_dir)?;

    let mut build = BuildManifest::new(&manifest);
    let includer = PackageIncluder::new(output_dir);

    includer.include(manifest.poetry(), project_root, &mut build)?;
    copy_readme(&manifest, project_root, output_dir)?;

    if options.locked_versions {
        let resolver = LockedDependencyResolver::new(
            exporter,
            &includer,
            LockedResolveOptions {
                dev_dependencies: options.dev_dependencies,
            },
        );
        resolver.resolve(
            project_root,
            &options.workspace_root,
            &manifest,
            &mut build,
        )?;
    } else {
        let resolver = ProjectDependencyResolver::new(
            config_lookup,
            &includer,
            ProjectResolveOptions {
                bundle_local_dependencies: options.bundle_local_dependencies,
            },
        );
        resolver.resolve(project_root, &mut build)?;
    }

    build.write(output_dir)?;

    info!(
        "staged {} in {}",
        manifest.poetry().name,
        output_dir.display()
    );

    Ok(build)
}

/// Recreates an empty staging directory. Refuses to wipe the project itself.
fn reset_output_dir(project_root: &Path, output_dir: &Path) -> Result<()> {
    let output_key = project_key(output_dir)?;

    if project_key(project_root)?.starts_with(&output_key) {
        return Err(BundleError::invalid_config(format!(
            "output directory {} contains the project being built",
            output_dir.display()
        )));
    }

    if output_dir.exists() {
        debug!("removing previous output {}", output_dir.display());
        fs::remove_dir_all(output_dir)?;
    }

    fs::create_dir_all(output_dir)?;

    Ok(())
}

/// Copies the `readme` file or files declared by the manifest.
fn copy_readme(
    manifest: &PyProject,
    project_root: &Path,
    output_dir: &Path,
) -> Result<()> {
    let files = match manifest.poetry().other.get(README_KEY) {
        Some(toml::Value::String(file)) => vec![file.clone()],
        Some(toml::Value::Array(files)) => files
            .iter()
            .filter_map(|f| f.as_str().map(|s| s.to_string()))
            .collect(),
        Some(other) => {
            warn!("ignoring unsupported readme value {other}");
            vec![]
        }
        None => vec![],
    };

    for file in files {
        let rel = normalize_path(&file).into_owned();
        let source = project_root.join(&rel);

        if !source.is_file() {
            warn!("readme {} not found: skipping", source.display());
            continue;
        }

        let target = output_dir.join(&rel);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }

        debug!("copying readme {rel}");
        fs::copy(&source, &target)?;
    }

    Ok(())
}
