//! CLI argument parsing.
use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

use crate::{command::build::BuildOptions, error::Result};

/// Global CLI arguments.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    #[arg(long, default_value_t = false, global = true)]
    /// Enable debug logging.
    pub debug: bool,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,
}

/// Bundling subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Stage a project with its local dependencies bundled in.
    Build(BuildArgs),
}

#[derive(clap::Args, Debug, Clone)]
pub struct BuildArgs {
    /// Root of the project to build.
    pub project_root: PathBuf,

    #[arg(long, short)]
    /// Staging directory for sources and the flattened pyproject.toml.
    pub output: PathBuf,

    #[arg(long, default_value = ".")]
    /// Workspace root, searched for poetry.lock after the project root.
    pub workspace_root: PathBuf,

    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    /// Pin dependencies to the lock file.
    pub locked_versions: bool,

    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    /// Bundle publishable local dependencies too (declarative mode only).
    pub bundle_local_dependencies: bool,

    #[arg(long, default_value_t = false)]
    /// Include the dev group when exporting locked requirements.
    pub dev_dependencies: bool,

    #[arg(long, default_value = "poetry")]
    /// Poetry executable used for requirement exports.
    pub poetry: String,
}

impl BuildArgs {
    pub fn to_options(&self) -> Result<BuildOptions> {
        BuildOptions::builder()
            .project_root(self.project_root.clone())
            .output_dir(self.output.clone())
            .workspace_root(self.workspace_root.clone())
            .locked_versions(self.locked_versions)
            .bundle_local_dependencies(self.bundle_local_dependencies)
            .dev_dependencies(self.dev_dependencies)
            .build()
    }
}
