//! Rename detection
//!
//! A file named after one key whose content declares another is a rename
//! when the remote still knows the old key. A copied file with an edited id
//! looks the same and is treated the same way.

use std::collections::HashSet;

use crate::kind::LocalEntity;

/// Pending renames, `old -> new`, in local listing order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenameMap {
    pairs: Vec<(String, String)>,
}

impl RenameMap {
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(old, new)| (old.as_str(), new.as_str()))
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Whether `key` is the source of a pending rename.
    pub fn is_old(&self, key: &str) -> bool {
        self.pairs.iter().any(|(old, _)| old == key)
    }

    /// Whether `key` is the target of a pending rename.
    pub fn is_new(&self, key: &str) -> bool {
        self.pairs.iter().any(|(_, new)| new == key)
    }

    pub fn new_for(&self, old: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find_map(|(o, new)| (o == old).then_some(new.as_str()))
    }

    /// Order the renames so that no target is still held on the remote.
    ///
    /// A rename whose target is a remote key waits until the rename moving
    /// that key away has been ordered. Renames that can never run (the
    /// target is held by an entity nothing renames, or the renames form a
    /// cycle) are returned as conflicts.
    pub fn plan(&self, remote_keys: &HashSet<String>) -> RenamePlan {
        let mut pending: Vec<(&str, &str)> = self.iter().collect();
        let mut plan = RenamePlan::default();
        let mut vacated: HashSet<&str> = HashSet::new();

        while let Some(i) = pending
            .iter()
            .position(|(_, new)| !remote_keys.contains(*new) || vacated.contains(new))
        {
            let (old, new) = pending.remove(i);
            vacated.insert(old);
            plan.order.push((old.to_string(), new.to_string()));
        }

        for &(old, new) in &pending {
            let reason = if pending.iter().any(|(o, _)| *o == new) {
                format!("rename cycle: '{new}' is itself being renamed")
            } else {
                format!("'{new}' already exists on the remote")
            };
            plan.conflicts.push(RenameConflict {
                old: old.to_string(),
                new: new.to_string(),
                reason,
            });
        }
        plan
    }
}

/// A rename that cannot be applied without clobbering another entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenameConflict {
    pub old: String,
    pub new: String,
    pub reason: String,
}

/// Renames in executable order, plus those that must not run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenamePlan {
    pub order: Vec<(String, String)>,
    pub conflicts: Vec<RenameConflict>,
}

/// Map the filename key of every relocated entity to its content key.
///
/// A new key is claimed by the first file that declares it; later copies are
/// left to the normal added/modified checks.
pub fn detect_renames(locals: &[LocalEntity], remote_keys: &HashSet<String>) -> RenameMap {
    let mut map = RenameMap::default();
    for entity in locals {
        let Some(filename_key) = entity.filename_key.as_deref() else {
            continue;
        };
        if filename_key == entity.key || !remote_keys.contains(filename_key) {
            continue;
        }
        if map.is_new(&entity.key) {
            continue;
        }
        map.pairs.push((filename_key.to_string(), entity.key.clone()));
    }
    map
}
