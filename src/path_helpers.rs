use std::{
    borrow::Cow,
    path::{Component, Path, PathBuf},
};

use url::Url;

use crate::error::{BundleError, Result};

/// Normalizes a path string by replacing backslashes with forward slashes and
/// removing all "./" sequences. Uses Cow to avoid allocation when the path is
/// already normalized.
pub fn normalize_path(path: &str) -> Cow<'_, str> {
    if path.contains('\\') || path.contains("./") {
        let replaced = path.replace('\\', "/");
        let segments = replaced
            .split('/')
            .filter(|s| *s != ".")
            .collect::<Vec<&str>>();
        Cow::Owned(segments.join("/"))
    } else {
        Cow::Borrowed(path)
    }
}

/// Lexically resolves "." and ".." components without touching the
/// filesystem. Leading ".." components of relative paths are kept.
pub fn clean_path(path: &Path) -> PathBuf {
    let mut out: Vec<Component> = vec![];

    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.last() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(component),
            },
            other => out.push(other),
        }
    }

    out.iter().collect()
}

/// Absolute, lexically cleaned form of `path`. Used as the identity of a
/// project root throughout a resolution pass.
pub fn project_key(path: &Path) -> Result<PathBuf> {
    Ok(clean_path(&std::path::absolute(path)?))
}

/// Computes `target` relative to `base`. Both are expected to be cleaned and
/// of the same kind (both absolute, or both relative to the same origin).
pub fn relative_to(target: &Path, base: &Path) -> PathBuf {
    let target_parts = target.components().collect::<Vec<_>>();
    let base_parts = base.components().collect::<Vec<_>>();

    let common = target_parts
        .iter()
        .zip(base_parts.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut rel = PathBuf::new();

    for _ in common..base_parts.len() {
        rel.push("..");
    }

    for part in &target_parts[common..] {
        rel.push(part.as_os_str());
    }

    if rel.as_os_str().is_empty() {
        rel.push(".");
    }

    rel
}

/// Rewrites a dependency `path` declared by the project at `declared_in` so
/// that it is relative to `root` instead.
pub fn rebase_path(path: &str, declared_in: &Path, root: &Path) -> String {
    let target = clean_path(&declared_in.join(path));
    let rel = relative_to(&target, &clean_path(root));
    rel.display().to_string().replace('\\', "/")
}

/// Decodes a `file:` reference as emitted by requirement exports into a
/// filesystem path. Absolute `file://` URLs are decoded with percent-escapes
/// resolved, bare `file:<relative>` references are joined onto `base`.
pub fn file_url_to_path(reference: &str, base: &Path) -> Result<PathBuf> {
    let reference = reference.trim();

    if reference.starts_with("file://") {
        let url = Url::parse(reference)?;
        return url.to_file_path().map_err(|_| {
            BundleError::InvalidRequirement(format!(
                "{reference} is not a valid local file reference"
            ))
        });
    }

    match reference.strip_prefix("file:") {
        Some(rest) => Ok(clean_path(&base.join(rest))),
        None => Err(BundleError::InvalidRequirement(format!(
            "{reference} is not a file reference"
        ))),
    }
}
