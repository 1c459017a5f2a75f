use serde::{Deserialize, Serialize};

/// A single entry of a `[tool.poetry.dependencies]` mapping.
///
/// ```toml
/// requests = "^2.31"                                  # Simple
/// shared = { path = "../../libs/shared", develop = true }  # Detailed
/// foo = [                                             # Constraints
///     { version = "<2", python = "<3.10" },
///     { version = "^2", python = ">=3.10" },
/// ]
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DependencySpec {
    /// Bare version constraint string
    Simple(String),
    /// Table form carrying any subset of the supported keys
    Detailed(DetailedDependency),
    /// Multiple-constraint form, one table per environment
    Constraints(Vec<DetailedDependency>),
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// Table form of a dependency declaration. Unknown keys are preserved in
/// `other` so that a round-trip through the build manifest is lossless.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetailedDependency {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub develop: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub git: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rev: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extras: Vec<String>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub optional: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub markers: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub python: Option<String>,
    #[serde(flatten)]
    pub other: toml::Table,
}

impl DependencySpec {
    /// Local path pointer, when this is a Detailed spec with `path` set.
    pub fn path(&self) -> Option<&str> {
        match self {
            DependencySpec::Detailed(detailed) => detailed.path.as_deref(),
            _ => None,
        }
    }

    /// True for dependencies that point at another project's source tree.
    pub fn is_local(&self) -> bool {
        self.path().is_some()
    }

    pub fn is_optional(&self) -> bool {
        match self {
            DependencySpec::Simple(_) => false,
            DependencySpec::Detailed(detailed) => detailed.optional,
            DependencySpec::Constraints(items) => {
                !items.is_empty() && items.iter().all(|i| i.optional)
            }
        }
    }

    /// Sets the `optional` flag. A Simple spec is upgraded to its table form
    /// when it has to become optional.
    pub fn set_optional(&mut self, optional: bool) {
        match self {
            DependencySpec::Simple(version) => {
                if optional {
                    *self = DependencySpec::Detailed(DetailedDependency {
                        version: Some(version.clone()),
                        optional: true,
                        ..Default::default()
                    });
                }
            }
            DependencySpec::Detailed(detailed) => detailed.optional = optional,
            DependencySpec::Constraints(items) => {
                for item in items.iter_mut() {
                    item.optional = optional;
                }
            }
        }
    }

    /// Extras requested from the dependency target.
    pub fn extras(&self) -> &[String] {
        match self {
            DependencySpec::Detailed(detailed) => &detailed.extras,
            _ => &[],
        }
    }

    /// Short human readable description used in log lines.
    pub fn describe(&self) -> String {
        match self {
            DependencySpec::Simple(version) => version.clone(),
            DependencySpec::Detailed(detailed) => {
                if let Some(git) = &detailed.git {
                    match &detailed.rev {
                        Some(rev) => format!("{git}@{rev}"),
                        None => git.clone(),
                    }
                } else if let Some(path) = &detailed.path {
                    path.clone()
                } else {
                    detailed.version.clone().unwrap_or_else(|| "*".into())
                }
            }
            DependencySpec::Constraints(items) => items
                .iter()
                .filter_map(|i| i.version.clone())
                .collect::<Vec<String>>()
                .join(" || "),
        }
    }
}

impl From<&str> for DependencySpec {
    fn from(version: &str) -> Self {
        DependencySpec::Simple(version.to_string())
    }
}

impl From<DetailedDependency> for DependencySpec {
    fn from(detailed: DetailedDependency) -> Self {
        DependencySpec::Detailed(detailed)
    }
}
