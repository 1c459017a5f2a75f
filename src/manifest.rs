//! Poetry `pyproject.toml` model: loading, the dependency spec union and the
//! build manifest accumulated while bundling.
pub mod build;
pub mod dependency;
pub mod pyproject;

pub use build::BuildManifest;
pub use dependency::{DependencySpec, DetailedDependency};
pub use pyproject::{
    DEV_GROUP, DependencyGroup, DependencyMap, MAIN_GROUP, MANIFEST_FILE,
    PYTHON_DEPENDENCY, PackageInclude, PackageManifest, PackageSource,
    PyProject,
};
