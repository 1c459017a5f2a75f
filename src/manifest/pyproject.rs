use indexmap::IndexMap;
use log::*;
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

use crate::{
    error::{BundleError, Result},
    manifest::dependency::DependencySpec,
    name_helpers::ExtrasMap,
};

/// Manifest filename expected at every project root.
pub const MANIFEST_FILE: &str = "pyproject.toml";

/// Name of the implicit interpreter-version pseudo-dependency.
pub const PYTHON_DEPENDENCY: &str = "python";

/// Group holding the main dependencies in the `group.main` manifest shape.
pub const MAIN_GROUP: &str = "main";

/// Non-distributable development group.
pub const DEV_GROUP: &str = "dev";

pub type DependencyMap = IndexMap<String, DependencySpec>;

/// A whole `pyproject.toml` document. Tables other than `[tool.poetry]` are
/// carried through untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PyProject {
    #[serde(default)]
    pub tool: Tool,
    #[serde(flatten)]
    pub other: toml::Table,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Tool {
    #[serde(default)]
    pub poetry: PackageManifest,
    #[serde(flatten)]
    pub other: toml::Table,
}

/// One project's declared metadata (`[tool.poetry]`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PackageManifest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub version: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub packages: Vec<PackageInclude>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub dependencies: DependencyMap,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub group: IndexMap<String, DependencyGroup>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub extras: ExtrasMap,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub source: Vec<PackageSource>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub plugins: IndexMap<String, toml::Table>,
    #[serde(flatten)]
    pub other: toml::Table,
}

/// Source folder inclusion rule
/// (`packages = [{ include = "..", from = ".." }]`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PackageInclude {
    pub include: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    #[serde(flatten)]
    pub other: toml::Table,
}

/// Named package registry (`[[tool.poetry.source]]`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PackageSource {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
    #[serde(flatten)]
    pub other: toml::Table,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DependencyGroup {
    #[serde(default)]
    pub dependencies: DependencyMap,
    #[serde(flatten)]
    pub other: toml::Table,
}

impl PyProject {
    /// Loads `<project_root>/pyproject.toml`.
    pub fn load(project_root: &Path) -> Result<Self> {
        let file_path = project_root.join(MANIFEST_FILE);

        if !file_path.is_file() {
            return Err(BundleError::ManifestNotFound(
                project_root.to_path_buf(),
            ));
        }

        let content = fs::read_to_string(&file_path)?;

        Self::parse(&content).map_err(|source| BundleError::ManifestParse {
            path: file_path,
            source,
        })
    }

    /// Parses manifest content. Empty content yields an empty shell so that
    /// workspace scans can skip projects without a poetry section.
    pub fn parse(content: &str) -> std::result::Result<Self, toml::de::Error> {
        if content.trim().is_empty() {
            debug!("empty manifest content: using empty shell");
            return Ok(Self::default());
        }

        toml::from_str(content)
    }

    pub fn poetry(&self) -> &PackageManifest {
        &self.tool.poetry
    }

    pub fn poetry_mut(&mut self) -> &mut PackageManifest {
        &mut self.tool.poetry
    }

    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

impl PackageManifest {
    /// True when the main dependencies live under `group.main.dependencies`.
    pub fn uses_main_group(&self) -> bool {
        self.group.contains_key(MAIN_GROUP)
    }

    /// The main dependency mapping, wherever the manifest keeps it.
    pub fn main_dependencies(&self) -> &DependencyMap {
        match self.group.get(MAIN_GROUP) {
            Some(main) => &main.dependencies,
            None => &self.dependencies,
        }
    }

    pub fn main_dependencies_mut(&mut self) -> &mut DependencyMap {
        match self.group.get_mut(MAIN_GROUP) {
            Some(main) => &mut main.dependencies,
            None => &mut self.dependencies,
        }
    }

    /// The interpreter constraint entry, if declared.
    pub fn python_dependency(&self) -> Option<&DependencySpec> {
        self.main_dependencies().get(PYTHON_DEPENDENCY)
    }
}
