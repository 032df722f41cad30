//! CLI command implementations.

pub mod checkpoint;
pub mod history;
pub mod references;
pub mod revert;
pub mod rows;
pub mod snapshot;
pub mod tables;
pub mod verify;

use serde::Serialize;
use std::path::Path;
use tabula_core::{Config, Workspace};
use tracing::debug;

/// Opens an existing workspace directory.
pub(crate) fn open_workspace(path: &Path) -> Result<Workspace, Box<dyn std::error::Error>> {
    debug!(path = %path.display(), "opening workspace");
    let config = Config::new().create_if_missing(false);
    Ok(Workspace::open_with_config(path, config)?)
}

/// Prints `value` as pretty JSON on stdout.
pub(crate) fn print_json<T: Serialize>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
