use indexmap::IndexMap;
use log::*;
use std::{
    collections::HashMap,
    fmt, fs,
    path::{Path, PathBuf},
};
use toml_edit::{DocumentMut, TableLike};

use crate::{
    error::{BundleError, Result},
    name_helpers::canonicalize_name,
};

/// Lock filename looked up in the project root, then the workspace root.
pub const LOCK_FILE: &str = "poetry.lock";

/// Literal git reference meaning "whatever the default branch points at".
pub const HEAD_REFERENCE: &str = "HEAD";

/// Origin kind of a locked package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceType {
    Git,
    Directory,
    File,
    Url,
    /// Any other registry kind (e.g. `legacy` for custom indexes)
    Other(String),
}

impl From<&str> for SourceType {
    fn from(value: &str) -> Self {
        match value {
            "git" => SourceType::Git,
            "directory" => SourceType::Directory,
            "file" => SourceType::File,
            "url" => SourceType::Url,
            other => SourceType::Other(other.to_string()),
        }
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceType::Git => write!(f, "git"),
            SourceType::Directory => write!(f, "directory"),
            SourceType::File => write!(f, "file"),
            SourceType::Url => write!(f, "url"),
            SourceType::Other(other) => write!(f, "{other}"),
        }
    }
}

/// `[package.source]` of a locked package.
#[derive(Debug, Clone, PartialEq)]
pub struct LockSource {
    pub source_type: SourceType,
    pub url: Option<String>,
    pub reference: Option<String>,
    pub resolved_reference: Option<String>,
}

impl LockSource {
    /// Git revision to pin, omitting the literal `HEAD` reference.
    pub fn git_rev(&self) -> Option<String> {
        self.reference
            .as_ref()
            .filter(|r| r.as_str() != HEAD_REFERENCE)
            .cloned()
    }
}

/// One resolved package record from the lock file.
#[derive(Debug, Clone, PartialEq)]
pub struct LockEntry {
    pub name: String,
    pub version: String,
    pub optional: bool,
    /// Transitive dependency name → raw constraint text
    pub dependencies: IndexMap<String, String>,
    pub source: Option<LockSource>,
}

impl LockEntry {
    pub fn source_type(&self) -> Option<&SourceType> {
        self.source.as_ref().map(|s| &s.source_type)
    }

    pub fn is_directory(&self) -> bool {
        matches!(self.source_type(), Some(SourceType::Directory))
    }

    /// Name of the custom registry (`legacy` and friends) the package was
    /// locked from.
    pub fn registry(&self) -> Option<&str> {
        self.source
            .as_ref()
            .filter(|s| matches!(s.source_type, SourceType::Other(_)))
            .and_then(|s| s.reference.as_deref())
    }
}

/// Parsed lock file with canonical-name lookup.
#[derive(Debug, Clone, Default)]
pub struct LockFile {
    path: PathBuf,
    packages: Vec<LockEntry>,
    index: HashMap<String, usize>,
}

impl LockFile {
    /// Finds the lock file for a project: `<project_root>/poetry.lock`, then
    /// `<workspace_root>/poetry.lock` for shared workspace environments.
    pub fn discover(
        project_root: &Path,
        workspace_root: &Path,
    ) -> Result<Self> {
        for dir in [project_root, workspace_root] {
            let file_path = dir.join(LOCK_FILE);
            if file_path.is_file() {
                debug!("using lock file {}", file_path.display());
                return Self::load(&file_path);
            }
        }

        Err(BundleError::LockFileNotFound(project_root.to_path_buf()))
    }

    pub fn load(file_path: &Path) -> Result<Self> {
        let content = fs::read_to_string(file_path)?;
        Self::parse(&content, file_path)
    }

    pub fn parse(content: &str, file_path: &Path) -> Result<Self> {
        let doc = content.parse::<DocumentMut>()?;

        let mut lock = LockFile {
            path: file_path.to_path_buf(),
            ..Default::default()
        };

        let Some(doc_packages) =
            doc.get("package").and_then(|p| p.as_array_of_tables())
        else {
            warn!("lock file {} has no packages", file_path.display());
            return Ok(lock);
        };

        for table in doc_packages.iter() {
            let entry = parse_entry(table, file_path)?;
            lock.index
                .entry(canonicalize_name(&entry.name))
                .or_insert(lock.packages.len());
            lock.packages.push(entry);
        }

        Ok(lock)
    }

    /// Directory containing the lock file; `directory` source urls are
    /// relative to it.
    pub fn dir(&self) -> &Path {
        self.path.parent().unwrap_or(Path::new("."))
    }

    pub fn packages(&self) -> &[LockEntry] {
        &self.packages
    }

    /// Case- and separator-insensitive lookup.
    pub fn find(&self, name: &str) -> Option<&LockEntry> {
        self.index
            .get(&canonicalize_name(name))
            .map(|i| &self.packages[*i])
    }

    /// Like [`LockFile::find`] but a missing package is fatal.
    pub fn require(&self, name: &str) -> Result<&LockEntry> {
        self.find(name)
            .ok_or_else(|| BundleError::LockedPackageNotFound(name.to_string()))
    }
}

fn get_str(table: &dyn TableLike, key: &str) -> Option<String> {
    table
        .get(key)
        .and_then(|item| item.as_str())
        .map(|s| s.to_string())
}

fn parse_entry(
    table: &toml_edit::Table,
    file_path: &Path,
) -> Result<LockEntry> {
    let name = get_str(table, "name").ok_or_else(|| {
        BundleError::lock_parse(file_path, "package entry without a name")
    })?;

    let version = get_str(table, "version").unwrap_or_default();

    let optional = table
        .get("optional")
        .and_then(|item| item.as_bool())
        .unwrap_or(false);

    let dependencies = table
        .get("dependencies")
        .and_then(|item| item.as_table_like())
        .map(|deps| {
            deps.iter()
                .map(|(dep, item)| {
                    (dep.to_string(), item.to_string().trim().to_string())
                })
                .collect::<IndexMap<String, String>>()
        })
        .unwrap_or_default();

    let source = table
        .get("source")
        .and_then(|item| item.as_table_like())
        .map(|source| LockSource {
            source_type: get_str(source, "type")
                .as_deref()
                .map(SourceType::from)
                .unwrap_or_else(|| SourceType::Other(String::new())),
            url: get_str(source, "url"),
            reference: get_str(source, "reference"),
            resolved_reference: get_str(source, "resolved_reference"),
        });

    Ok(LockEntry {
        name,
        version,
        optional,
        dependencies,
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const LOCK: &str = r#"# This file is automatically @generated by Poetry and should not be changed by hand.

[[package]]
name = "requests"
version = "2.31.0"
description = "Python HTTP for Humans."
optional = false
python-versions = ">=3.7"
files = []

[package.dependencies]
certifi = ">=2017.4.17"
charset-normalizer = ">=2,<4"
urllib3 = ">=1.21.1,<3"

[[package]]
name = "Typing_Extensions"
version = "4.9.0"
optional = true
python-versions = ">=3.8"

[[package]]
name = "mylib"
version = "0.1.0"
optional = false
python-versions = "^3.10"

[package.source]
type = "git"
url = "https://example.com/mylib.git"
reference = "HEAD"
resolved_reference = "0123456789abcdef"

[[package]]
name = "shared"
version = "0.3.0"
optional = false
python-versions = "^3.10"
develop = true

[package.dependencies]
colored = {version = "^2.1", optional = true}

[package.source]
type = "directory"
url = "../../libs/shared"

[metadata]
lock-version = "2.0"
python-versions = "^3.10"
content-hash = "abc"
"#;

    fn lock() -> LockFile {
        LockFile::parse(LOCK, Path::new("/ws/apps/app/poetry.lock")).unwrap()
    }

    #[test]
    fn parses_package_entries() {
        let lock = lock();

        assert_eq!(lock.packages().len(), 4);

        let requests = lock.find("requests").unwrap();
        assert_eq!(requests.version, "2.31.0");
        assert!(!requests.optional);
        assert_eq!(
            requests.dependencies.keys().collect::<Vec<_>>(),
            vec!["certifi", "charset-normalizer", "urllib3"]
        );
        assert_eq!(requests.dependencies["urllib3"], "\">=1.21.1,<3\"");
        assert!(requests.source.is_none());
    }

    #[test]
    fn find_is_case_and_separator_insensitive() {
        let lock = lock();

        let entry = lock.find("typing-extensions").unwrap();
        assert_eq!(entry.name, "Typing_Extensions");
        assert!(entry.optional);
        assert!(lock.find("TYPING.EXTENSIONS").is_some());
    }

    #[test]
    fn parses_sources() {
        let lock = lock();

        let mylib = lock.find("mylib").unwrap();
        let source = mylib.source.as_ref().unwrap();
        assert_eq!(source.source_type, SourceType::Git);
        assert_eq!(source.url.as_deref(), Some("https://example.com/mylib.git"));
        assert_eq!(source.git_rev(), None);
        assert_eq!(source.resolved_reference.as_deref(), Some("0123456789abcdef"));

        let shared = lock.find("shared").unwrap();
        assert!(shared.is_directory());
        assert!(shared.dependencies.contains_key("colored"));
        assert_eq!(lock.dir(), Path::new("/ws/apps/app"));
    }

    #[test]
    fn registry_is_reported_for_custom_sources_only() {
        let custom = LockFile::parse(
            r#"[[package]]
name = "private-pkg"
version = "1.0.0"
optional = false

[package.source]
type = "legacy"
url = "https://pypi.internal.example.com/simple"
reference = "internal"
"#,
            Path::new("/ws/poetry.lock"),
        )
        .unwrap();

        let private = custom.find("private_pkg").unwrap();
        assert_eq!(
            private.source_type(),
            Some(&SourceType::Other("legacy".into()))
        );
        assert_eq!(private.registry(), Some("internal"));

        let lock = lock();
        assert_eq!(lock.find("mylib").unwrap().registry(), None);
        assert_eq!(lock.find("requests").unwrap().registry(), None);
    }

    #[test]
    fn require_missing_package_fails() {
        let result = lock().require("flask").map(|_| ());

        assert!(matches!(
            result,
            Err(BundleError::LockedPackageNotFound(name)) if name == "flask"
        ));
    }

    #[test]
    fn discover_falls_back_to_workspace_root() {
        let workspace = TempDir::new().unwrap();
        let project = workspace.path().join("apps/app");
        fs::create_dir_all(&project).unwrap();
        fs::write(workspace.path().join(LOCK_FILE), LOCK).unwrap();

        let lock = LockFile::discover(&project, workspace.path()).unwrap();
        assert!(lock.find("requests").is_some());

        let missing = LockFile::discover(&project, &project);
        assert!(matches!(missing, Err(BundleError::LockFileNotFound(_))));
    }
}
