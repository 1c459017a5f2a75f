//! Parsing of `requirements.txt` lines produced by a requirements export.
use std::path::{Path, PathBuf};

use crate::{
    error::{BundleError, Result},
    name_helpers::split_extras,
    path_helpers::file_url_to_path,
};

const EDITABLE_PREFIX: &str = "-e ";

/// One exported requirement.
#[derive(Debug, Clone, PartialEq)]
pub enum RequirementLine {
    /// `name[extras]==version ; markers`
    Pinned {
        name: String,
        version: String,
        extras: Vec<String>,
        markers: Option<String>,
    },
    /// `-e file:///path ; markers` or `name @ file:///path ; markers`
    Local {
        name: Option<String>,
        path: PathBuf,
        extras: Vec<String>,
        markers: Option<String>,
    },
    /// `name[extras] @ git+https://host/repo.git@rev ; markers`
    Vcs {
        name: String,
        url: String,
        extras: Vec<String>,
        markers: Option<String>,
    },
}

impl RequirementLine {
    pub fn markers(&self) -> Option<&str> {
        match self {
            RequirementLine::Pinned { markers, .. }
            | RequirementLine::Local { markers, .. }
            | RequirementLine::Vcs { markers, .. } => markers.as_deref(),
        }
    }
}

/// Splits off the environment marker clause.
fn split_markers(line: &str) -> (&str, Option<String>) {
    match line.split_once(';') {
        Some((requirement, markers)) => {
            let markers = markers.trim();
            let markers = (!markers.is_empty()).then(|| markers.to_string());
            (requirement.trim(), markers)
        }
        None => (line.trim(), None),
    }
}

/// Parses one exported line. Blank lines, comments and pip option lines
/// (`--index-url`, `--hash`, ...) yield `None`. Relative `file:` references
/// are resolved against `base`.
pub fn parse_line(line: &str, base: &Path) -> Result<Option<RequirementLine>> {
    let line = line.trim().trim_end_matches('\\').trim();

    if line.is_empty() || line.starts_with('#') || line.starts_with("--") {
        return Ok(None);
    }

    let (requirement, markers) = split_markers(line);

    if let Some(reference) = requirement.strip_prefix(EDITABLE_PREFIX) {
        return Ok(Some(RequirementLine::Local {
            name: None,
            path: file_url_to_path(reference, base)?,
            extras: vec![],
            markers,
        }));
    }

    if let Some((name, url)) = requirement.split_once('@') {
        let (name, extras) = split_extras(name);
        let url = url.trim();

        if name.is_empty() || url.is_empty() {
            return Err(BundleError::InvalidRequirement(line.to_string()));
        }

        if url.starts_with("file:") {
            return Ok(Some(RequirementLine::Local {
                name: Some(name),
                path: file_url_to_path(url, base)?,
                extras,
                markers,
            }));
        }

        return Ok(Some(RequirementLine::Vcs {
            name,
            url: url.to_string(),
            extras,
            markers,
        }));
    }

    let Some((name, version)) = requirement.split_once("==") else {
        return Err(BundleError::InvalidRequirement(line.to_string()));
    };

    let (name, extras) = split_extras(name);
    let version = version.trim().to_string();

    if name.is_empty() || version.is_empty() {
        return Err(BundleError::InvalidRequirement(line.to_string()));
    }

    Ok(Some(RequirementLine::Pinned {
        name,
        version,
        extras,
        markers,
    }))
}

/// Parses a whole export, skipping lines that carry no requirement.
pub fn parse_requirements(
    content: &str,
    base: &Path,
) -> Result<Vec<RequirementLine>> {
    let mut lines = vec![];

    for line in content.lines() {
        if let Some(parsed) = parse_line(line, base)? {
            lines.push(parsed);
        }
    }

    Ok(lines)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(line: &str) -> RequirementLine {
        parse_line(line, Path::new("/ws/apps/app")).unwrap().unwrap()
    }

    #[test]
    fn parses_pinned_line() {
        assert_eq!(
            parse("requests==2.31.0"),
            RequirementLine::Pinned {
                name: "requests".into(),
                version: "2.31.0".into(),
                extras: vec![],
                markers: None,
            }
        );
    }

    #[test]
    fn parses_markers_and_extras() {
        let line = parse(
            r#"uvicorn[standard]==0.27.0 ; python_version >= "3.10" and python_version < "4.0""#,
        );

        assert_eq!(
            line,
            RequirementLine::Pinned {
                name: "uvicorn".into(),
                version: "0.27.0".into(),
                extras: vec!["standard".into()],
                markers: Some(
                    r#"python_version >= "3.10" and python_version < "4.0""#
                        .into()
                ),
            }
        );
    }

    #[test]
    fn parses_editable_local_path() {
        let line = parse(r#"-e file:///ws/libs/shared ; python_version >= "3.10""#);

        assert_eq!(
            line,
            RequirementLine::Local {
                name: None,
                path: PathBuf::from("/ws/libs/shared"),
                extras: vec![],
                markers: Some(r#"python_version >= "3.10""#.into()),
            }
        );
    }

    #[test]
    fn parses_named_file_reference() {
        let line = parse("shared @ file:../../libs/shared");

        assert_eq!(
            line,
            RequirementLine::Local {
                name: Some("shared".into()),
                path: PathBuf::from("/ws/libs/shared"),
                extras: vec![],
                markers: None,
            }
        );
    }

    #[test]
    fn parses_vcs_reference() {
        let line = parse("mylib @ git+https://example.com/mylib.git@abcdef");

        assert_eq!(
            line,
            RequirementLine::Vcs {
                name: "mylib".into(),
                url: "git+https://example.com/mylib.git@abcdef".into(),
                extras: vec![],
                markers: None,
            }
        );
    }

    #[test]
    fn skips_comments_blank_and_option_lines() {
        let content = r#"
# exported
--extra-index-url https://pypi.internal.example.com/simple
requests==2.31.0

certifi==2024.2.2 ; python_version >= "3.10"
"#;

        let lines =
            parse_requirements(content, Path::new("/ws/apps/app")).unwrap();

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1].markers(), Some(r#"python_version >= "3.10""#));
    }

    #[test]
    fn rejects_unpinned_requirement() {
        let result = parse_line("requests>=2.0", Path::new("/ws"));

        assert!(matches!(result, Err(BundleError::InvalidRequirement(_))));
    }
}
