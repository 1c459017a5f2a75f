//! Lock data, exported requirement listings and the exporter seam used by
//! the locked resolver.
pub mod export;
pub mod lockfile;
pub mod requirements;

pub use export::{ExportOptions, PoetryExporter, RequirementsExporter};
pub use lockfile::{LOCK_FILE, LockEntry, LockFile, LockSource, SourceType};
pub use requirements::{RequirementLine, parse_requirements};
