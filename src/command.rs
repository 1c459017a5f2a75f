//! Command execution for pybundle.
//!
//! # Build Workflow
//!
//! 1. **Load**: Read the project's `pyproject.toml`
//! 2. **Stage**: Reset the output directory and copy the project's own
//!    packages and readme into it
//! 3. **Resolve**: Flatten dependencies either from the lock file or from
//!    the declared dependency graph, bundling local projects on the way
//! 4. **Write**: Emit the flattened `pyproject.toml` next to the sources

/// Project staging and dependency flattening.
pub mod build;
