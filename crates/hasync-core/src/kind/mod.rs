//! Entity-kind adapters
//!
//! A kind supplies everything the engine needs to reconcile one category of
//! entities: how to enumerate both sides, how keys and storage locations are
//! derived, how records are normalized, and which remote store to talk to.
//!
//! Two implementations cover every kind the application has:
//! - [`FileKind`]: one YAML file per entity, flat or nested one level, with
//!   user-chosen or remote-assigned keys
//! - [`DashboardKind`]: one directory per dashboard, split into view files

mod catalog;
mod dashboard;
mod file;

use std::collections::HashSet;

use hasync_fs::NormalizedPath;
use hasync_meta::Record;
use tracing::warn;

use crate::Result;
use crate::remote::RemoteStore;

pub use catalog::{
    CONFIG_ENTRY_DOMAINS, KindId, STORAGE_HELPER_TYPES, Selection, build_kind,
    known_helper_domains, resolve_path,
};
pub use dashboard::{
    DEFAULT_DASHBOARD, DashboardKind, META_FILE, dir_name_from_url_path, url_path_from_dir_name,
};
pub use file::{FileKind, Keying, KindSpec, Layout, NEW_KEY_PREFIX, Schemas};

/// One entity as found in the local store.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalEntity {
    /// Canonical key, derived from the record content.
    pub key: String,
    /// Key derived from the storage location, for kinds that encode the
    /// key in the filename. Differs from `key` when the user edited the id.
    pub filename_key: Option<String>,
    /// File or directory the entity is stored in.
    pub location: NormalizedPath,
    /// Record with bookkeeping fields removed.
    pub record: Record,
}

/// Problems found in a single local file by [`EntityKind::check_local`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LocalCheck {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

pub trait EntityKind {
    /// Display name, e.g. `automations` or `helpers/template`.
    fn name(&self) -> &str;

    /// Directory all of this kind's files live under.
    fn root(&self) -> &NormalizedPath;

    fn list_local(&self) -> Result<Vec<LocalEntity>>;

    /// Remote entities keyed canonically, shaped like local records.
    fn list_remote(&mut self) -> Result<Vec<(String, Record)>>;

    /// Canonical form used for comparison and for what gets written.
    fn normalize(&self, key: &str, record: &Record) -> Result<Record>;

    /// Where the entity with `key` belongs locally.
    ///
    /// `used` holds locations already taken in this run; kinds that derive
    /// filenames from names use it for collision handling.
    fn location_for(
        &self,
        key: &str,
        record: &Record,
        used: &HashSet<NormalizedPath>,
    ) -> Result<NormalizedPath>;

    fn write_local(&self, location: &NormalizedPath, record: &Record) -> Result<()>;

    fn delete_local(&self, location: &NormalizedPath) -> Result<()>;

    fn move_local(&self, from: &NormalizedPath, to: &NormalizedPath) -> Result<()>;

    /// `record` with `key` embedded in it.
    fn rekey(&self, key: &str, record: &Record) -> Record;

    /// What to send to the remote for `record`.
    fn payload(&self, key: &str, record: &Record) -> Record {
        let _ = key;
        record.clone()
    }

    /// Desired external name that must be applied after a write.
    fn external_name(&self, key: &str, record: &Record) -> Result<Option<String>> {
        let _ = (key, record);
        Ok(None)
    }

    fn remote(&mut self) -> &mut dyn RemoteStore;

    /// Tidy local files after a push that changed something.
    fn after_push(&self) -> Result<()> {
        Ok(())
    }

    /// Remote types seen this run that have no declared schema.
    fn unknown_types(&self) -> Vec<String> {
        Vec::new()
    }

    /// Every file under this kind's root that holds entity data.
    fn local_files(&self) -> Result<Vec<NormalizedPath>>;

    /// Offline checks of one parsed local file.
    fn check_local(&self, location: &NormalizedPath, record: &Record) -> LocalCheck {
        let _ = (location, record);
        LocalCheck::default()
    }
}

/// Unknown record types already reported during this run.
///
/// Owned by the adapter, so each invocation warns at most once per type.
#[derive(Debug, Default, Clone)]
pub struct WarnedTypes {
    seen: HashSet<String>,
    order: Vec<String>,
}

impl WarnedTypes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Log a warning for `ty` unless it was already reported.
    ///
    /// Returns whether a warning was emitted.
    pub fn warn_once(&mut self, kind: &str, ty: &str) -> bool {
        if !self.seen.insert(ty.to_string()) {
            return false;
        }
        warn!(kind, record_type = ty, "no schema for remote type; comparing without one");
        self.order.push(ty.to_string());
        true
    }

    pub fn seen(&self) -> &[String] {
        &self.order
    }
}

/// Split a nested key into `(group, inner)`.
pub fn split_key(key: &str) -> (Option<&str>, &str) {
    match key.split_once('/') {
        Some((group, inner)) => (Some(group), inner),
        None => (None, key),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_warn_once_per_type() {
        let mut warned = WarnedTypes::new();
        assert!(warned.warn_once("helpers/template", "weather"));
        assert!(!warned.warn_once("helpers/template", "weather"));
        assert!(warned.warn_once("helpers/template", "cover"));
        assert_eq!(warned.seen(), ["weather", "cover"]);
    }

    #[test]
    fn test_split_key() {
        assert_eq!(split_key("input_boolean/guest"), (Some("input_boolean"), "guest"));
        assert_eq!(split_key("morning"), (None, "morning"));
        assert_eq!(split_key("sensor/new:power"), (Some("sensor"), "new:power"));
    }
}
