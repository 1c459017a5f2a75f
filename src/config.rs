//! Per-project build configuration lookup.
//!
//! Each workspace project carries a `project.json` whose `build` target
//! options tell the bundler whether that project is published on its own and,
//! optionally, which registry it is published to:
//!
//! ```json
//! {
//!   "targets": {
//!     "build": {
//!       "options": {
//!         "publish": false,
//!         "customSourceName": "internal",
//!         "customSourceUrl": "https://pypi.internal.example.com/simple"
//!       }
//!     }
//!   }
//! }
//! ```
use log::*;
use serde::Deserialize;
use std::{collections::HashMap, fs, path::Path};

#[cfg(test)]
use mockall::automock;

use crate::error::{BundleError, Result};

/// Default project configuration filename.
pub const PROJECT_CONFIG_FILE: &str = "project.json";

/// Name of the target holding build options.
pub const BUILD_TARGET: &str = "build";

/// Build target options relevant to dependency resolution.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BuildTargetConfig {
    /// Whether the project is published independently (default: true)
    pub publish: bool,
    /// Registry name used when pinning this project as a dependency
    pub custom_source_name: Option<String>,
    /// Registry URL paired with `custom_source_name`
    pub custom_source_url: Option<String>,
}

impl Default for BuildTargetConfig {
    fn default() -> Self {
        Self {
            publish: true,
            custom_source_name: None,
            custom_source_url: None,
        }
    }
}

impl BuildTargetConfig {
    /// The custom registry as a `(name, url)` pair when one is configured.
    /// A name without a URL is a configuration error.
    pub fn custom_source(&self) -> Result<Option<(&str, &str)>> {
        match (&self.custom_source_name, &self.custom_source_url) {
            (Some(name), Some(url)) => Ok(Some((name.as_str(), url.as_str()))),
            (None, _) => Ok(None),
            (Some(name), None) => Err(BundleError::invalid_config(format!(
                "customSourceName {name} is set without customSourceUrl"
            ))),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ProjectJson {
    targets: HashMap<String, TargetJson>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct TargetJson {
    options: Option<BuildTargetConfig>,
}

/// Resolves the build configuration of a local dependency's project.
#[cfg_attr(test, automock)]
pub trait ProjectConfigLookup {
    fn build_config(&self, project_root: &Path) -> Result<BuildTargetConfig>;
}

/// Reads `project.json` from the project root.
#[derive(Debug, Default, Clone)]
pub struct ProjectJsonLookup {}

impl ProjectJsonLookup {
    pub fn new() -> Self {
        Self {}
    }
}

impl ProjectConfigLookup for ProjectJsonLookup {
    fn build_config(&self, project_root: &Path) -> Result<BuildTargetConfig> {
        let file_path = project_root.join(PROJECT_CONFIG_FILE);

        if !file_path.is_file() {
            return Err(BundleError::ProjectConfigNotFound(
                project_root.to_path_buf(),
            ));
        }

        let content = fs::read_to_string(&file_path)?;
        let project: ProjectJson = serde_json::from_str(&content)?;

        let config = project
            .targets
            .get(BUILD_TARGET)
            .and_then(|t| t.options.clone())
            .unwrap_or_default();

        debug!(
            "build config for {}: publish={}",
            project_root.display(),
            config.publish
        );

        Ok(config)
    }
}
