//! Declarative resolution: walks the declared dependency graph and inlines
//! bundleable local projects without consulting a lock file.
use log::*;
use std::path::Path;

use crate::{
    config::{BuildTargetConfig, ProjectConfigLookup},
    error::Result,
    includer::PackageIncluder,
    manifest::{
        BuildManifest, DependencySpec, DetailedDependency, PYTHON_DEPENDENCY,
        PackageSource, PyProject,
    },
    name_helpers::{ExtrasMap, merge_extras, push_unique, same_package},
    path_helpers::{clean_path, normalize_path, project_key, rebase_path},
    resolver::context::ResolutionContext,
};

/// Registry priority given to custom sources added for pinned projects.
const EXPLICIT_PRIORITY: &str = "explicit";

/// Length of the url hash suffix used to rename colliding sources.
const SOURCE_HASH_LEN: usize = 8;

#[derive(Debug, Clone)]
pub struct ProjectResolveOptions {
    /// Inline every local dependency, publishable or not
    pub bundle_local_dependencies: bool,
}

impl Default for ProjectResolveOptions {
    fn default() -> Self {
        Self {
            bundle_local_dependencies: true,
        }
    }
}

pub struct ProjectDependencyResolver<'a> {
    config_lookup: &'a dyn ProjectConfigLookup,
    includer: &'a PackageIncluder,
    options: ProjectResolveOptions,
}

impl<'a> ProjectDependencyResolver<'a> {
    pub fn new(
        config_lookup: &'a dyn ProjectConfigLookup,
        includer: &'a PackageIncluder,
        options: ProjectResolveOptions,
    ) -> Self {
        Self {
            config_lookup,
            includer,
            options,
        }
    }

    /// Flattens the main dependencies of `build`, declared by the project at
    /// `project_root`. Passes repeat until no pass copies up a new local
    /// dependency, then extras are pruned. Non-main groups are reduced to an
    /// empty `dev` group since their paths are relative to the project root.
    pub fn resolve(
        &self,
        project_root: &Path,
        build: &mut BuildManifest,
    ) -> Result<()> {
        let mut ctx = ResolutionContext::new(project_key(project_root)?);
        let mut pass = 1;

        build.reset_groups();

        while self.resolve_pass(&mut ctx, build)? {
            pass += 1;
            debug!("local dependencies copied up: starting pass {pass}");
        }

        build.prune_extras();

        Ok(())
    }

    fn resolve_pass(
        &self,
        ctx: &mut ResolutionContext,
        build: &mut BuildManifest,
    ) -> Result<bool> {
        let mut more = false;
        let names = build.dependencies().keys().cloned().collect::<Vec<_>>();

        for name in names {
            if name == PYTHON_DEPENDENCY {
                continue;
            }

            // entries can be removed or replaced earlier in the same pass
            let Some(spec) = build.dependencies().get(&name).cloned() else {
                continue;
            };

            let Some(path) = spec.path() else {
                ctx.log_once(&name, &spec);
                continue;
            };

            let target =
                clean_path(&ctx.root().join(normalize_path(path).as_ref()));

            ctx.check_cycle(&name, &target)?;

            if ctx.is_inlined(&target) {
                debug!(
                    "{name} at {} already bundled: dropping entry",
                    target.display()
                );
                build.dependencies_mut().shift_remove(&name);
                continue;
            }

            let manifest = PyProject::load(&target)?;
            let config = self.config_lookup.build_config(&target)?;

            if self.options.bundle_local_dependencies || !config.publish {
                more |=
                    self.inline(ctx, build, &name, &spec, &target, &manifest)?;
            } else {
                self.pin(build, &name, &spec, &manifest, &config)?;
            }
        }

        Ok(more)
    }

    /// Bundles the project at `target` in place of the `name` entry. Returns
    /// true when local dependencies were copied up into the mapping.
    fn inline(
        &self,
        ctx: &mut ResolutionContext,
        build: &mut BuildManifest,
        name: &str,
        spec: &DependencySpec,
        target: &Path,
        manifest: &PyProject,
    ) -> Result<bool> {
        info!("• adding {name} local dependency");

        let sub = manifest.poetry();
        let parent_optional = spec.is_optional();

        // extras of the parent that activated the inlined project
        let activating = if parent_optional {
            build
                .extras()
                .iter()
                .filter(|(_, deps)| deps.iter().any(|d| same_package(d, name)))
                .map(|(extra, _)| extra.clone())
                .collect::<Vec<String>>()
        } else {
            vec![]
        };

        self.includer.include(sub, target, build)?;
        ctx.mark_inlined(target.to_path_buf());

        merge_extras(build.extras_mut(), &sub.extras);
        build.dependencies_mut().shift_remove(name);

        let mut chain = ctx.chain(name);
        chain.push(target.to_path_buf());

        let mut more = false;

        for (dep_name, dep_spec) in sub.main_dependencies().iter() {
            if dep_name == PYTHON_DEPENDENCY {
                continue;
            }

            let mut dep_spec = dep_spec.clone();

            if let DependencySpec::Detailed(detailed) = &mut dep_spec
                && let Some(path) = &detailed.path
            {
                let rebased = rebase_path(path, target, ctx.root());
                detailed.path = Some(rebased);
                ctx.set_chain(dep_name, chain.clone());
                more = true;
            }

            if parent_optional && !dep_spec.is_optional() {
                dep_spec.set_optional(true);
                for extra in activating.iter() {
                    let deps =
                        build.extras_mut().entry(extra.clone()).or_default();
                    push_unique(deps, dep_name);
                }
            }

            insert_dependency(build, dep_name, dep_spec);
        }

        if !parent_optional {
            promote_requested_extras(build, name, spec.extras(), &sub.extras);
        }

        Ok(more)
    }

    /// Replaces the `name` entry with a version pin on the published project.
    fn pin(
        &self,
        build: &mut BuildManifest,
        name: &str,
        spec: &DependencySpec,
        manifest: &PyProject,
        config: &BuildTargetConfig,
    ) -> Result<()> {
        let version = manifest.poetry().version.clone();

        let markers = match spec {
            DependencySpec::Detailed(detailed) => detailed.markers.clone(),
            _ => None,
        };

        let mut pinned = DetailedDependency {
            version: Some(version.clone()),
            optional: spec.is_optional(),
            extras: spec.extras().to_vec(),
            markers,
            ..Default::default()
        };

        if let Some((source_name, url)) = config.custom_source()? {
            pinned.source = Some(register_source(build, source_name, url));
        }

        info!("• adding {name}@{version} published dependency");

        build
            .dependencies_mut()
            .insert(name.to_string(), DependencySpec::Detailed(pinned));

        Ok(())
    }
}

/// Inserts or overwrites `name`, except that a required entry is never
/// downgraded to optional.
fn insert_dependency(
    build: &mut BuildManifest,
    name: &str,
    spec: DependencySpec,
) {
    let deps = build.dependencies_mut();

    let existing = deps
        .iter()
        .find(|(key, _)| same_package(key, name))
        .map(|(key, current)| (key.clone(), current.is_optional()));

    match existing {
        Some((_, false)) if spec.is_optional() => {
            debug!("{name} already required: keeping required entry");
        }
        Some((key, _)) => {
            deps.insert(key, spec);
        }
        None => {
            deps.insert(name.to_string(), spec);
        }
    }
}

/// Clears `optional` on every dependency activated by the extras the parent
/// requested from the inlined project.
fn promote_requested_extras(
    build: &mut BuildManifest,
    inlined: &str,
    requested: &[String],
    sub_extras: &ExtrasMap,
) {
    for extra in requested.iter() {
        let Some(activated) = sub_extras.get(extra) else {
            warn!("{inlined} does not declare extra {extra}");
            continue;
        };

        for dep in activated.iter() {
            let entry = build
                .dependencies_mut()
                .iter_mut()
                .find(|(key, _)| same_package(key, dep));

            if let Some((key, spec)) = entry
                && spec.is_optional()
            {
                debug!("promoting {key} to required via extra {extra}");
                spec.set_optional(false);
            }
        }
    }
}

/// Adds a custom registry to the build manifest and returns the name the
/// pinned dependency should reference. A name already taken by a different
/// url is suffixed with a hash of the url.
fn register_source(
    build: &mut BuildManifest,
    name: &str,
    url: &str,
) -> String {
    let sources = &mut build.poetry_mut().source;

    let source_name = match sources.iter().find(|s| s.name == name) {
        None => name.to_string(),
        Some(existing) if existing.url.as_deref() == Some(url) => {
            return name.to_string();
        }
        Some(_) => {
            let digest = format!("{:x}", md5::compute(url.as_bytes()));
            let renamed = format!("{name}-{}", &digest[..SOURCE_HASH_LEN]);
            debug!("source {name} already points elsewhere: using {renamed}");
            renamed
        }
    };

    if !sources.iter().any(|s| s.name == source_name) {
        sources.push(PackageSource {
            name: source_name.clone(),
            url: Some(url.to_string()),
            priority: Some(EXPLICIT_PRIORITY.to_string()),
            other: toml::Table::new(),
        });
    }

    source_name
}
