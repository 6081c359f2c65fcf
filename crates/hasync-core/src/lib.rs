//! Reconciliation engine for ha-sync
//!
//! This crate keeps a directory of YAML files and the configuration stored
//! inside a Home Assistant instance in step:
//!
//! - **kind**: the entity-kind adapters (file-per-entity, nested, opaque
//!   identifier and split dashboards) and the catalog that maps paths to them
//! - **remote**: the [`RemoteStore`] capability every kind talks to
//! - **sync**: [`SyncEngine`] with `diff`, `pull` and `push`, plus the
//!   [`SyncResult`] / [`DiffItem`] outcome model
//! - **validate**: offline checks of the local tree
//!
//! # Architecture
//!
//! ```text
//!                 hasync-cli
//!                     |
//!        hasync-core -+- hasync-client
//!          |      |
//!  hasync-fs  hasync-meta
//! ```

pub mod config;
pub mod error;
pub mod kind;
pub mod remote;
pub mod sync;
pub mod validate;

pub use config::{Paths, SyncConfig};
pub use error::{Error, Result};
pub use kind::{
    DashboardKind, EntityKind, FileKind, KindId, KindSpec, LocalCheck, LocalEntity, Selection,
    WarnedTypes, build_kind, known_helper_domains, resolve_path,
};
pub use remote::{Container, ContainerRemote, ContainerSource, RemoteStore};
pub use sync::{
    DiffItem, DiffStatus, PullOptions, PushOptions, RenameConflict, RenameMap, RenamePlan, Scope,
    SyncEngine, SyncResult, detect_renames,
};
pub use validate::{Finding, TemplateRef, ValidationReport, validate_kind};
