//! Package name and extras helpers shared by both resolvers.
use indexmap::IndexMap;
use regex::Regex;
use std::sync::LazyLock;

/// Extra name → ordered dependency names it activates.
pub type ExtrasMap = IndexMap<String, Vec<String>>;

static SEPARATOR_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[-_.]+").unwrap());

/// Canonical form of a package name used for every lookup: lowercase with
/// runs of `-`, `_` and `.` collapsed to a single `-`.
pub fn canonicalize_name(name: &str) -> String {
    SEPARATOR_RUN
        .replace_all(name.trim(), "-")
        .to_lowercase()
}

/// Returns true when two package names refer to the same package.
pub fn same_package(a: &str, b: &str) -> bool {
    canonicalize_name(a) == canonicalize_name(b)
}

/// Splits a `name[extra1,extra2]` requirement name into the bare name and
/// its extras. Names without a bracketed suffix yield no extras.
pub fn split_extras(raw: &str) -> (String, Vec<String>) {
    let raw = raw.trim();

    let Some(open) = raw.find('[') else {
        return (raw.to_string(), vec![]);
    };

    let name = raw[..open].trim().to_string();
    let rest = &raw[open + 1..];
    let inner = rest.split(']').next().unwrap_or_default();

    let extras = inner
        .split(',')
        .map(|e| e.trim())
        .filter(|e| !e.is_empty())
        .map(|e| e.to_string())
        .collect::<Vec<String>>();

    (name, extras)
}

/// Merges `source` extras into `target`. Lists are unioned per extra name,
/// keeping first-seen order and dropping duplicates.
pub fn merge_extras(target: &mut ExtrasMap, source: &ExtrasMap) {
    for (extra, deps) in source {
        let entry = target.entry(extra.clone()).or_default();
        for dep in deps {
            push_unique(entry, dep);
        }
    }
}

/// Pushes `name` onto `list` unless an entry with the same canonical name is
/// already present.
pub fn push_unique(list: &mut Vec<String>, name: &str) {
    if !list.iter().any(|existing| same_package(existing, name)) {
        list.push(name.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonicalize_name_normalizes_case_and_separators() {
        assert_eq!(canonicalize_name("Typing_Extensions"), "typing-extensions");
        assert_eq!(canonicalize_name("zope.interface"), "zope-interface");
        assert_eq!(canonicalize_name("my__weird-.name"), "my-weird-name");
        assert_eq!(canonicalize_name("  requests "), "requests");
    }

    #[test]
    fn same_package_ignores_separator_style() {
        assert!(same_package("my_lib", "My-Lib"));
        assert!(!same_package("mylib", "my-lib"));
    }

    #[test]
    fn split_extras_extracts_bracketed_suffix() {
        let (name, extras) = split_extras("uvicorn[standard, watch]");
        assert_eq!(name, "uvicorn");
        assert_eq!(extras, vec!["standard", "watch"]);
    }

    #[test]
    fn split_extras_without_suffix() {
        let (name, extras) = split_extras(" requests ");
        assert_eq!(name, "requests");
        assert!(extras.is_empty());
    }

    #[test]
    fn merge_extras_unions_in_first_seen_order() {
        let mut parent = ExtrasMap::new();
        parent.insert("x".into(), vec!["b".into(), "c".into()]);

        let mut child = ExtrasMap::new();
        child.insert("x".into(), vec!["a".into(), "b".into()]);
        child.insert("y".into(), vec!["d".into()]);

        merge_extras(&mut parent, &child);

        assert_eq!(parent["x"], vec!["b", "c", "a"]);
        assert_eq!(parent["y"], vec!["d"]);
        assert_eq!(parent.keys().collect::<Vec<_>>(), vec!["x", "y"]);
    }
}
