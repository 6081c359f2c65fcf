//! Reconciliation between the local tree and the remote
//!
//! This module provides:
//! - **result**: the [`SyncResult`] and [`DiffItem`] outcome model
//! - **rename**: detection of entities whose file and content keys disagree
//! - **engine**: [`SyncEngine`] with `diff`, `pull` and `push`

mod engine;
mod rename;
mod result;

pub use engine::{PullOptions, PushOptions, Scope, SyncEngine};
pub use rename::{RenameConflict, RenameMap, RenamePlan, detect_renames};
pub use result::{DiffItem, DiffStatus, SyncResult};
