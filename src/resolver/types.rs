use crate::manifest::{DependencySpec, DetailedDependency};

/// One entry of a flattened dependency set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedDependency {
    pub name: String,
    pub version: Option<String>,
    pub markers: Option<String>,
    pub optional: bool,
    pub extras: Vec<String>,
    pub git: Option<String>,
    pub rev: Option<String>,
    pub source: Option<String>,
}

impl ResolvedDependency {
    /// Manifest form of this record. Plain pinned versions stay a bare
    /// string; anything carrying more metadata becomes a table.
    pub fn to_spec(&self) -> DependencySpec {
        let plain = self.git.is_none()
            && !self.optional
            && self.extras.is_empty()
            && self.markers.is_none()
            && self.source.is_none();

        if plain && let Some(version) = &self.version {
            return DependencySpec::Simple(version.clone());
        }

        DependencySpec::Detailed(DetailedDependency {
            version: if self.git.is_some() {
                None
            } else {
                self.version.clone()
            },
            git: self.git.clone(),
            rev: self.rev.clone(),
            source: self.source.clone(),
            extras: self.extras.clone(),
            optional: self.optional,
            markers: self.markers.clone(),
            ..Default::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_pin_becomes_simple_spec() {
        let dep = ResolvedDependency {
            name: "requests".into(),
            version: Some("2.31.0".into()),
            ..Default::default()
        };

        assert_eq!(dep.to_spec(), DependencySpec::Simple("2.31.0".into()));
    }

    #[test]
    fn git_dependency_drops_version() {
        let dep = ResolvedDependency {
            name: "mylib".into(),
            version: Some("0.1.0".into()),
            git: Some("https://example.com/mylib.git".into()),
            rev: Some("abcdef".into()),
            markers: Some("sys_platform == \"linux\"".into()),
            ..Default::default()
        };

        let DependencySpec::Detailed(spec) = dep.to_spec() else {
            panic!("expected detailed spec");
        };

        assert_eq!(spec.version, None);
        assert_eq!(spec.git.as_deref(), Some("https://example.com/mylib.git"));
        assert_eq!(spec.rev.as_deref(), Some("abcdef"));
        assert_eq!(spec.markers.as_deref(), Some("sys_platform == \"linux\""));
    }

    #[test]
    fn optional_pin_keeps_flag() {
        let dep = ResolvedDependency {
            name: "colored".into(),
            version: Some("2.2.4".into()),
            optional: true,
            ..Default::default()
        };

        assert!(dep.to_spec().is_optional());
    }
}
