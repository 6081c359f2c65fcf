//! Shared test utilities for the ha-sync workspace.
//!
//! Dev-dependency only, never published.
//!
//! # Modules
//!
//! - [`remote`]: [`MemoryRemote`], an in-memory remote entity store
//! - [`workspace`]: [`TestWorkspace`], a scratch directory tree

pub mod remote;
pub mod workspace;

pub use remote::{Call, KeyPolicy, MemoryRemote};
pub use workspace::TestWorkspace;

use hasync_meta::Record;

/// Build a record from a `json!` object literal.
///
/// # Panics
/// Panics if `value` is not an object.
pub fn record(value: serde_json::Value) -> Record {
    match value {
        serde_json::Value::Object(map) => map,
        other => panic!("record() needs an object, got {other}"),
    }
}
