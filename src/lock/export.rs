//! Requirements export seam. The locked resolver only sees
//! [`RequirementsExporter`]; the Poetry implementation shells out.
use log::*;
use std::{path::Path, process::Command};

#[cfg(test)]
use mockall::automock;

use crate::error::{BundleError, Result};

/// Options forwarded to the export command.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExportOptions {
    /// Include the dev group
    pub dev_dependencies: bool,
    /// Extras to activate, one `--extras` flag each
    pub extras: Vec<String>,
}

/// Produces a frozen `name==version[; markers]` listing for a project.
#[cfg_attr(test, automock)]
pub trait RequirementsExporter {
    fn export(
        &self,
        project_root: &Path,
        options: &ExportOptions,
    ) -> Result<String>;
}

/// Runs `poetry export` in the project root and captures stdout.
#[derive(Debug, Clone)]
pub struct PoetryExporter {
    program: String,
}

impl Default for PoetryExporter {
    fn default() -> Self {
        Self::new("poetry")
    }
}

impl PoetryExporter {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Arguments passed to `poetry`.
    pub fn export_args(options: &ExportOptions) -> Vec<String> {
        let mut args = vec![
            "export".to_string(),
            "--format".to_string(),
            "requirements.txt".to_string(),
            "--without-hashes".to_string(),
            "--without-urls".to_string(),
        ];

        if options.dev_dependencies {
            args.push("--with".to_string());
            args.push("dev".to_string());
        }

        for extra in options.extras.iter() {
            args.push("--extras".to_string());
            args.push(extra.clone());
        }

        args
    }
}

impl RequirementsExporter for PoetryExporter {
    fn export(
        &self,
        project_root: &Path,
        options: &ExportOptions,
    ) -> Result<String> {
        let args = Self::export_args(options);

        info!(
            "running {} {} in {}",
            self.program,
            args.join(" "),
            project_root.display()
        );

        let output = Command::new(&self.program)
            .args(&args)
            .current_dir(project_root)
            .output()?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).to_string();
            return Err(BundleError::ExportFailed {
                status: output.status.to_string(),
                stderr: stderr.trim().to_string(),
            });
        }

        Ok(String::from_utf8(output.stdout)?)
    }
}
