use log::*;
use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};

use crate::{
    error::Result,
    manifest::{
        dependency::DependencySpec,
        pyproject::{
            DEV_GROUP, DependencyGroup, MAIN_GROUP, DependencyMap, PackageInclude,
            PackageManifest, PyProject,
        },
    },
    name_helpers::{ExtrasMap, same_package},
    path_helpers::normalize_path,
};

/// The manifest accumulated while bundling one project. Starts as a copy of
/// the project's own pyproject with an empty `packages` list; the includer
/// and resolvers then fill it in before it is written to the staging dir.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildManifest {
    document: PyProject,
    /// Source path each bundled package was copied from, keyed by include
    origins: HashMap<String, PathBuf>,
}

impl BuildManifest {
    pub fn new(source: &PyProject) -> Self {
        let mut document = source.clone();
        document.poetry_mut().packages.clear();
        Self {
            document,
            origins: HashMap::new(),
        }
    }

    pub fn document(&self) -> &PyProject {
        &self.document
    }

    pub fn into_document(self) -> PyProject {
        self.document
    }

    pub fn poetry(&self) -> &PackageManifest {
        self.document.poetry()
    }

    pub fn poetry_mut(&mut self) -> &mut PackageManifest {
        self.document.poetry_mut()
    }

    pub fn dependencies(&self) -> &DependencyMap {
        self.poetry().main_dependencies()
    }

    pub fn dependencies_mut(&mut self) -> &mut DependencyMap {
        self.poetry_mut().main_dependencies_mut()
    }

    pub fn extras(&self) -> &ExtrasMap {
        &self.poetry().extras
    }

    pub fn extras_mut(&mut self) -> &mut ExtrasMap {
        &mut self.poetry_mut().extras
    }

    /// True when a package with this `include` is already bundled.
    pub fn has_package(&self, include: &str) -> bool {
        let include = normalize_path(include);
        self.poetry()
            .packages
            .iter()
            .any(|p| normalize_path(&p.include) == include)
    }

    /// Records a bundled package along with the path it was copied from.
    pub fn add_package(&mut self, package: PackageInclude, origin: PathBuf) {
        self.origins
            .insert(normalize_path(&package.include).into_owned(), origin);
        self.poetry_mut().packages.push(package);
    }

    /// Path the package with this `include` was copied from.
    pub fn package_origin(&self, include: &str) -> Option<&Path> {
        self.origins
            .get(normalize_path(include).as_ref())
            .map(|p| p.as_path())
    }

    /// Inserts a dependency unless one with the same canonical name exists.
    /// Returns false when the entry was already present.
    pub fn insert_first(&mut self, name: &str, spec: DependencySpec) -> bool {
        let deps = self.dependencies_mut();
        if deps.keys().any(|existing| same_package(existing, name)) {
            return false;
        }
        deps.insert(name.to_string(), spec);
        true
    }

    /// Clears the main dependency mapping (both manifest shapes) and leaves
    /// only an empty dev group behind, which is what a release manifest
    /// needs.
    /// Drops every group except `main` and leaves an empty `dev` group.
    pub fn reset_groups(&mut self) {
        let poetry = self.poetry_mut();
        poetry.group.retain(|name, _| name == MAIN_GROUP);
        poetry
            .group
            .insert(DEV_GROUP.to_string(), DependencyGroup::default());
        debug!("reset build manifest groups");
    }

    pub fn reset_dependencies(&mut self) {
        let poetry = self.poetry_mut();
        poetry.dependencies.clear();
        poetry.group.clear();
        poetry
            .group
            .insert(DEV_GROUP.to_string(), DependencyGroup::default());
        debug!("reset build manifest dependencies and groups");
    }

    /// Drops every extra entry that is no longer present in the mapping as an
    /// optional dependency, then every extra left empty.
    pub fn prune_extras(&mut self) {
        let deps = self.dependencies().clone();

        let extras = self.extras_mut();

        for (extra, names) in extras.iter_mut() {
            names.retain(|name| {
                let keep = deps.iter().any(|(dep, spec)| {
                    same_package(dep, name) && spec.is_optional()
                });
                if !keep {
                    debug!("removing {name} from extra {extra}");
                }
                keep
            });
        }

        extras.retain(|extra, names| {
            if names.is_empty() {
                debug!("dropping empty extra {extra}");
            }
            !names.is_empty()
        });
    }

    /// Writes the manifest to `<dir>/pyproject.toml`.
    pub fn write(&self, dir: &Path) -> Result<()> {
        let file_path = dir.join(crate::manifest::MANIFEST_FILE);
        info!("writing build manifest to {}", file_path.display());
        fs::write(file_path, self.document.to_toml_string()?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::dependency::DetailedDependency;

    fn source() -> PyProject {
        PyProject::parse(
            r#"[tool.poetry]
name = "app"
version = "1.0.0"
packages = [{ include = "app", from = "src" }]

[tool.poetry.dependencies]
python = "^3.10"
colored = { version = "^2.1", optional = true }
requests = "^2.31"

[tool.poetry.group.test.dependencies]
pytest = "^7.4"

[tool.poetry.extras]
color = ["colored", "termcolor"]
fast = ["orjson"]
"#,
        )
        .unwrap()
    }

    #[test]
    fn new_clears_packages() {
        let build = BuildManifest::new(&source());

        assert!(build.poetry().packages.is_empty());
        assert_eq!(build.poetry().name, "app");
    }

    #[test]
    fn prune_extras_keeps_only_present_optional_entries() {
        let mut build = BuildManifest::new(&source());

        build.prune_extras();

        assert_eq!(build.extras().len(), 1);
        assert_eq!(build.extras()["color"], vec!["colored"]);
    }

    #[test]
    fn prune_extras_drops_promoted_entries() {
        let mut build = BuildManifest::new(&source());
        build.dependencies_mut()["colored"].set_optional(false);

        build.prune_extras();

        assert!(build.extras().is_empty());
    }

    #[test]
    fn reset_dependencies_leaves_empty_dev_group() {
        let mut build = BuildManifest::new(&source());

        build.reset_dependencies();

        assert!(build.dependencies().is_empty());
        assert_eq!(build.poetry().group.keys().collect::<Vec<_>>(), vec!["dev"]);
        assert!(build.poetry().group["dev"].dependencies.is_empty());
    }

    #[test]
    fn insert_first_keeps_existing_entry() {
        let mut build = BuildManifest::new(&source());

        let inserted = build.insert_first(
            "Requests",
            DetailedDependency {
                version: Some("2.0.0".into()),
                ..Default::default()
            }
            .into(),
        );

        assert!(!inserted);
        assert_eq!(
            build.dependencies()["requests"],
            DependencySpec::Simple("^2.31".into())
        );
    }

    #[test]
    fn has_package_normalizes_include() {
        let mut build = BuildManifest::new(&source());
        build.add_package(
            PackageInclude {
                include: "app".into(),
                ..Default::default()
            },
            PathBuf::from("/ws/apps/app/app"),
        );

        assert!(build.has_package("./app"));
        assert!(!build.has_package("other"));
        assert_eq!(
            build.package_origin("./app"),
            Some(Path::new("/ws/apps/app/app"))
        );
    }

    #[test]
    fn reset_groups_keeps_main_and_empties_dev() {
        let mut build = BuildManifest::new(
            &PyProject::parse(
                r#"[tool.poetry]
name = "app"
version = "1.0.0"

[tool.poetry.group.main.dependencies]
python = "^3.10"

[tool.poetry.group.dev.dependencies]
testing = { path = "../../libs/testing" }

[tool.poetry.group.docs.dependencies]
mkdocs = "^1.5"
"#,
            )
            .unwrap(),
        );

        build.reset_groups();

        let group = &build.poetry().group;
        assert_eq!(group.keys().collect::<Vec<_>>(), vec!["main", "dev"]);
        assert!(group["dev"].dependencies.is_empty());
        assert!(group["main"].dependencies.contains_key("python"));
    }
}
