pub mod cli;
pub mod command;
pub mod config;
pub mod error;
pub mod includer;
pub mod lock;
pub mod manifest;
pub mod name_helpers;
pub mod path_helpers;
pub mod resolver;

pub use error::{BundleError, Result};

#[cfg(test)]
pub mod test_helpers;
