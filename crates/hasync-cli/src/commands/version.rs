//! Version command implementation

use crate::error::Result;

/// Run the version command
pub fn run_version() -> Result<bool> {
    println!("ha-sync version {}", env!("CARGO_PKG_VERSION"));
    Ok(true)
}
