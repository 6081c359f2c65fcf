//! Outcome types returned by the engine

use hasync_meta::Record;
use serde::Serialize;

/// Mutations and failures of one `pull` or `push`.
///
/// Created fresh per run; the four mutation lists are disjoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SyncResult {
    /// Keys of entities created in the target store
    pub created: Vec<String>,
    /// Keys of entities whose content was rewritten
    pub updated: Vec<String>,
    /// Keys of entities removed from the target store
    pub deleted: Vec<String>,
    /// `(old, new)` key pairs
    pub renamed: Vec<(String, String)>,
    /// `(key, message)` pairs, one per failed entity
    pub errors: Vec<(String, String)>,
    /// Entities present only in the target store and left alone because
    /// deletions were not requested
    pub orphaned: Vec<String>,
}

impl SyncResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_changes(&self) -> bool {
        !(self.created.is_empty()
            && self.updated.is_empty()
            && self.deleted.is_empty()
            && self.renamed.is_empty())
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn record_error(&mut self, key: impl Into<String>, error: impl std::fmt::Display) {
        self.errors.push((key.into(), error.to_string()));
    }

    /// Whether `key` took part in any mutation or failure.
    pub fn touched(&self, key: &str) -> bool {
        self.created.iter().any(|k| k == key)
            || self.updated.iter().any(|k| k == key)
            || self.deleted.iter().any(|k| k == key)
            || self.renamed.iter().any(|(old, new)| old == key || new == key)
            || self.errors.iter().any(|(k, _)| k == key)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DiffStatus {
    /// Exists locally only
    Added,
    /// Exists on both sides with different normalized content
    Modified,
    /// Exists remotely only
    Deleted,
    /// Local file key and content key disagree and the file key exists remotely
    Renamed,
}

impl std::fmt::Display for DiffStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Added => "added",
            Self::Modified => "modified",
            Self::Deleted => "deleted",
            Self::Renamed => "renamed",
        })
    }
}

/// One difference between the stores, with normalized snapshots.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiffItem {
    /// Key of the entity; the old key for renames
    pub key: String,
    pub status: DiffStatus,
    /// New key, for renames only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local: Option<Record>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote: Option<Record>,
    /// Local file or directory, when there is one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl DiffItem {
    pub fn added(key: impl Into<String>, local: Record, path: Option<String>) -> Self {
        Self {
            key: key.into(),
            status: DiffStatus::Added,
            new_key: None,
            local: Some(local),
            remote: None,
            path,
        }
    }

    pub fn modified(key: impl Into<String>, local: Record, remote: Record, path: Option<String>) -> Self {
        Self {
            key: key.into(),
            status: DiffStatus::Modified,
            new_key: None,
            local: Some(local),
            remote: Some(remote),
            path,
        }
    }

    pub fn deleted(key: impl Into<String>, remote: Record) -> Self {
        Self {
            key: key.into(),
            status: DiffStatus::Deleted,
            new_key: None,
            local: None,
            remote: Some(remote),
            path: None,
        }
    }

    pub fn renamed(
        old: impl Into<String>,
        new: impl Into<String>,
        local: Record,
        remote: Record,
        path: Option<String>,
    ) -> Self {
        Self {
            key: old.into(),
            status: DiffStatus::Renamed,
            new_key: Some(new.into()),
            local: Some(local),
            remote: Some(remote),
            path,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_errors_alone_are_not_changes() {
        let mut result = SyncResult::new();
        result.record_error("a", "boom");
        assert!(result.has_errors());
        assert!(!result.has_changes());
        assert!(result.touched("a"));
    }

    #[test]
    fn test_orphans_are_not_changes() {
        let result = SyncResult {
            orphaned: vec!["x".into()],
            ..Default::default()
        };
        assert!(!result.has_changes());
        assert!(!result.touched("x"));
    }

    #[test]
    fn test_status_serializes_lowercase() {
        let item = DiffItem::deleted("gone", Record::new());
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["status"], "deleted");
        assert!(json.get("new_key").is_none());
    }
}
