use log::*;
use std::{
    collections::{HashMap, HashSet},
    path::{Path, PathBuf},
};

use crate::{
    error::{BundleError, Result},
    manifest::DependencySpec,
    name_helpers::canonicalize_name,
};

/// Mutable state of one declarative resolution, passed explicitly through
/// every pass so that resolutions are independent of each other.
#[derive(Debug)]
pub struct ResolutionContext {
    root: PathBuf,
    logged: HashSet<String>,
    inlined: HashSet<PathBuf>,
    /// Chain of project roots a local entry of the mapping was reached
    /// through, keyed by canonical dependency name.
    chains: HashMap<String, Vec<PathBuf>>,
}

impl ResolutionContext {
    /// `root` must be the absolute, cleaned root of the project being built.
    pub fn new(root: PathBuf) -> Self {
        Self {
            root,
            logged: HashSet::new(),
            inlined: HashSet::new(),
            chains: HashMap::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Logs an external dependency the first time its name is seen.
    pub fn log_once(&mut self, name: &str, spec: &DependencySpec) {
        if self.logged.insert(canonicalize_name(name)) {
            info!("• adding {name}@{} dependency", spec.describe());
        }
    }

    /// Chain through which `name` entered the mapping. Entries declared by
    /// the root project itself have the root as their only ancestor.
    pub fn chain(&self, name: &str) -> Vec<PathBuf> {
        self.chains
            .get(&canonicalize_name(name))
            .cloned()
            .unwrap_or_else(|| vec![self.root.clone()])
    }

    pub fn set_chain(&mut self, name: &str, chain: Vec<PathBuf>) {
        self.chains.insert(canonicalize_name(name), chain);
    }

    /// Fails when `target` already appears among its own ancestors.
    pub fn check_cycle(&self, name: &str, target: &Path) -> Result<()> {
        let chain = self.chain(name);

        if chain.iter().any(|ancestor| ancestor == target) {
            let mut names = chain
                .iter()
                .map(|p| p.display().to_string())
                .collect::<Vec<String>>();
            names.push(target.display().to_string());

            return Err(BundleError::CyclicDependency {
                root: target.to_path_buf(),
                chain: names,
            });
        }

        Ok(())
    }

    pub fn is_inlined(&self, target: &Path) -> bool {
        self.inlined.contains(target)
    }

    pub fn mark_inlined(&mut self, target: PathBuf) {
        self.inlined.insert(target);
    }
}
