//! Dependency resolution strategies for a build manifest.
//!
//! [`LockedDependencyResolver`] reproduces the lock file exactly through a
//! requirements export. [`ProjectDependencyResolver`] walks the declared
//! graph instead and needs no lock file.
pub mod context;
pub mod locked;
pub mod project;
pub mod types;

pub use context::ResolutionContext;
pub use locked::{
    LockedDependencyResolver, LockedResolution, LockedResolveOptions,
};
pub use project::{ProjectDependencyResolver, ProjectResolveOptions};
pub use types::ResolvedDependency;
