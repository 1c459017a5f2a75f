//! Error types for pybundle resolution and bundling.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for pybundle operations. Every variant is fatal for the
/// resolution pass that produced it.
#[derive(Error, Debug)]
pub enum BundleError {
    // Manifest errors
    #[error("pyproject.toml not found in {}", .0.display())]
    ManifestNotFound(PathBuf),

    #[error("failed to parse {}: {source}", .path.display())]
    ManifestParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    // Lock errors
    #[error(
        "poetry.lock not found in {} or the workspace root",
        .0.display()
    )]
    LockFileNotFound(PathBuf),

    #[error("failed to parse lock file {}: {message}", .path.display())]
    LockParse { path: PathBuf, message: String },

    #[error("package {0} not found in lock file")]
    LockedPackageNotFound(String),

    #[error("unsupported source type '{source_type}' for package {name}")]
    UnsupportedSourceType { name: String, source_type: String },

    #[error("invalid exported requirement: {0}")]
    InvalidRequirement(String),

    #[error("requirements export failed ({status}): {stderr}")]
    ExportFailed { status: String, stderr: String },

    // Project configuration errors
    #[error("project configuration not found for {}", .0.display())]
    ProjectConfigNotFound(PathBuf),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // Bundling errors
    #[error("source folder {} does not exist", .0.display())]
    SourceFolderMissing(PathBuf),

    #[error(
        "package {include} from {} conflicts with the one bundled from {}",
        .conflicting.display(),
        .existing.display()
    )]
    PackageConflict {
        include: String,
        existing: PathBuf,
        conflicting: PathBuf,
    },

    #[error(
        "cyclic local dependency detected: {} depends on itself through {}",
        .root.display(),
        .chain.join(" -> ")
    )]
    CyclicDependency { root: PathBuf, chain: Vec<String> },

    // Conversions
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    JsonParseError(#[from] serde_json::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerializeError(#[from] toml::ser::Error),

    #[error("TOML edit error: {0}")]
    TomlEditError(#[from] toml_edit::TomlError),

    #[error("UTF-8 conversion error: {0}")]
    Utf8Error(#[from] std::string::FromUtf8Error),

    #[error("URL parse error: {0}")]
    UrlError(#[from] url::ParseError),

    #[error("Logger initialization error: {0}")]
    LoggerError(#[from] log::SetLoggerError),

    #[error(transparent)]
    Other(#[from] color_eyre::Report),
}

/// Result type alias using BundleError
pub type Result<T> = std::result::Result<T, BundleError>;

impl BundleError {
    /// Create an invalid config error
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Create an unsupported source type error
    pub fn unsupported_source(
        name: impl Into<String>,
        source_type: impl Into<String>,
    ) -> Self {
        Self::UnsupportedSourceType {
            name: name.into(),
            source_type: source_type.into(),
        }
    }

    /// Create a lock parse error
    pub fn lock_parse(
        path: impl Into<PathBuf>,
        msg: impl Into<String>,
    ) -> Self {
        Self::LockParse {
            path: path.into(),
            message: msg.into(),
        }
    }
}
