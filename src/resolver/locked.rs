//! Lock-driven resolution: the flattened dependency set is whatever the
//! lock file pins, as reported by a requirements export.
use log::*;
use std::{
    collections::HashSet,
    path::{Path, PathBuf},
};

use crate::{
    error::{BundleError, Result},
    includer::PackageIncluder,
    lock::{
        ExportOptions, LOCK_FILE, LockEntry, LockFile, RequirementLine,
        RequirementsExporter, SourceType, parse_requirements,
    },
    manifest::{BuildManifest, PYTHON_DEPENDENCY, PackageManifest, PyProject},
    name_helpers::{ExtrasMap, canonicalize_name, push_unique},
    path_helpers::{clean_path, project_key},
    resolver::types::ResolvedDependency,
};

#[derive(Debug, Clone, Default)]
pub struct LockedResolveOptions {
    /// Export the dev group as well
    pub dev_dependencies: bool,
}

/// Result of a locked resolution.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LockedResolution {
    pub dependencies: Vec<ResolvedDependency>,
    pub extras: ExtrasMap,
}

impl LockedResolution {
    /// Replaces the build manifest's main dependencies with the resolved
    /// set. The interpreter constraint is kept and groups are reduced to an
    /// empty dev group.
    pub fn apply(&self, build: &mut BuildManifest) {
        let python = build.poetry().python_dependency().cloned();

        build.reset_dependencies();

        if let Some(python) = python {
            build
                .dependencies_mut()
                .insert(PYTHON_DEPENDENCY.to_string(), python);
        }

        for dep in self.dependencies.iter() {
            if !build.insert_first(&dep.name, dep.to_spec()) {
                debug!("{} already in build manifest: skipping", dep.name);
            }
        }

        *build.extras_mut() = self
            .extras
            .iter()
            .filter(|(_, deps)| !deps.is_empty())
            .map(|(extra, deps)| (extra.clone(), deps.clone()))
            .collect();
    }
}

/// A local project referenced by an exported line.
struct LocalProject<'p> {
    root: &'p Path,
    manifest: &'p PyProject,
}

pub struct LockedDependencyResolver<'a> {
    exporter: &'a dyn RequirementsExporter,
    includer: &'a PackageIncluder,
    options: LockedResolveOptions,
}

impl<'a> LockedDependencyResolver<'a> {
    pub fn new(
        exporter: &'a dyn RequirementsExporter,
        includer: &'a PackageIncluder,
        options: LockedResolveOptions,
    ) -> Self {
        Self {
            exporter,
            includer,
            options,
        }
    }

    /// Resolves the locked dependency set of the project at `project_root`
    /// and applies it to `build`.
    pub fn resolve(
        &self,
        project_root: &Path,
        workspace_root: &Path,
        manifest: &PyProject,
        build: &mut BuildManifest,
    ) -> Result<LockedResolution> {
        let lock = LockFile::discover(project_root, workspace_root)?;

        let export_options = ExportOptions {
            dev_dependencies: self.options.dev_dependencies,
            extras: manifest.poetry().extras.keys().cloned().collect(),
        };

        let exported = self.exporter.export(project_root, &export_options)?;
        let lines = parse_requirements(&exported, project_root)?;

        let root_key = project_key(project_root)?;
        let mut seen = HashSet::new();
        let mut dependencies = vec![];

        for line in lines {
            let resolved = match line {
                RequirementLine::Pinned {
                    name,
                    version,
                    extras,
                    markers,
                } => {
                    let entry = lock.require(&name)?;
                    Some(ResolvedDependency {
                        name,
                        version: Some(version),
                        markers,
                        optional: entry.optional,
                        extras,
                        source: entry.registry().map(str::to_string),
                        ..Default::default()
                    })
                }
                RequirementLine::Local {
                    name,
                    path,
                    extras,
                    markers,
                } => {
                    if project_key(&path)? == root_key {
                        debug!("skipping self reference {}", path.display());
                        continue;
                    }

                    let local_manifest = PyProject::load(&path)?;
                    let name = name.unwrap_or_else(|| {
                        local_manifest.poetry().name.clone()
                    });
                    let entry = lock.require(&name)?;

                    self.resolve_source(
                        &lock,
                        entry,
                        &name,
                        Some(LocalProject {
                            root: &path,
                            manifest: &local_manifest,
                        }),
                        extras,
                        markers,
                        build,
                    )?
                }
                RequirementLine::Vcs {
                    name,
                    extras,
                    markers,
                    ..
                } => {
                    let entry = lock.require(&name)?;
                    self.resolve_source(
                        &lock, entry, &name, None, extras, markers, build,
                    )?
                }
            };

            if let Some(dep) = resolved {
                if seen.insert(canonicalize_name(&dep.name)) {
                    debug!("resolved {} {:?}", dep.name, dep.version);
                    dependencies.push(dep);
                } else {
                    debug!("duplicate export of {}: keeping first", dep.name);
                }
            }
        }

        info!("resolved {} locked dependencies", dependencies.len());

        let extras = self.resolve_extras(&lock, manifest.poetry())?;

        let resolution = LockedResolution {
            dependencies,
            extras,
        };

        resolution.apply(build);

        Ok(resolution)
    }

    /// Handles a package sourced from a local directory or a VCS reference.
    /// Directory packages are bundled and yield no record.
    #[allow(clippy::too_many_arguments)]
    fn resolve_source(
        &self,
        lock: &LockFile,
        entry: &LockEntry,
        name: &str,
        local: Option<LocalProject>,
        extras: Vec<String>,
        markers: Option<String>,
        build: &mut BuildManifest,
    ) -> Result<Option<ResolvedDependency>> {
        let Some(source) = &entry.source else {
            return Err(BundleError::unsupported_source(name, "registry"));
        };

        match &source.source_type {
            SourceType::Directory => {
                info!("• adding {name} local dependency");

                match local {
                    Some(project) => self.includer.include(
                        project.manifest.poetry(),
                        project.root,
                        build,
                    )?,
                    None => {
                        let root = directory_root(lock, entry)?;
                        let manifest = PyProject::load(&root)?;
                        self.includer.include(manifest.poetry(), &root, build)?
                    }
                }

                Ok(None)
            }
            SourceType::Git => Ok(Some(ResolvedDependency {
                name: name.to_string(),
                version: Some(entry.version.clone()),
                markers,
                optional: entry.optional,
                extras,
                git: source.url.clone(),
                rev: source.git_rev(),
                source: None,
            })),
            other => {
                Err(BundleError::unsupported_source(name, other.to_string()))
            }
        }
    }

    /// Rewrites every declared extra to the optional lock packages reachable
    /// from its listed names.
    fn resolve_extras(
        &self,
        lock: &LockFile,
        manifest: &PackageManifest,
    ) -> Result<ExtrasMap> {
        let mut resolved = ExtrasMap::new();

        for (extra, names) in manifest.extras.iter() {
            let mut visited = HashSet::new();
            let mut collected = vec![];

            for name in names.iter() {
                let entry = lock.require(name)?;
                collect_optional(lock, entry, &mut visited, &mut collected);
            }

            debug!("extra {extra} resolved to {collected:?}");
            resolved.insert(extra.clone(), collected);
        }

        Ok(resolved)
    }
}

/// Depth-first walk collecting optional packages. Directory packages are
/// walked through but never collected since they are bundled in place.
fn collect_optional(
    lock: &LockFile,
    entry: &LockEntry,
    visited: &mut HashSet<String>,
    collected: &mut Vec<String>,
) {
    if !visited.insert(canonicalize_name(&entry.name)) {
        return;
    }

    if entry.is_directory() {
        debug!("{} is bundled from a directory: not an extra", entry.name);
    } else if entry.optional {
        push_unique(collected, &entry.name);
    }

    for dep in entry.dependencies.keys() {
        match lock.find(dep) {
            Some(child) => collect_optional(lock, child, visited, collected),
            None => debug!("{dep} required by {} is not locked", entry.name),
        }
    }
}

fn directory_root(lock: &LockFile, entry: &LockEntry) -> Result<PathBuf> {
    let url = entry
        .source
        .as_ref()
        .and_then(|s| s.url.as_deref())
        .ok_or_else(|| {
            BundleError::lock_parse(
                lock.dir().join(LOCK_FILE),
                format!("directory package {} has no url", entry.name),
            )
        })?;

    Ok(clean_path(&lock.dir().join(url)))
}
