//! SyncEngine implementation
//!
//! The engine reconciles one entity kind at a time. Every operation starts
//! from a fresh snapshot of both stores; nothing is cached across calls.

use std::collections::{HashMap, HashSet};

use hasync_fs::NormalizedPath;
use hasync_meta::Record;
use tracing::{debug, info, warn};

use super::rename::{RenameMap, detect_renames};
use super::result::{DiffItem, DiffStatus, SyncResult};
use crate::kind::{EntityKind, LocalEntity};
use crate::{Error, Result};

/// Part of a kind's tree an operation is limited to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Scope {
    filter: Option<NormalizedPath>,
}

impl Scope {
    /// Every entity of the kind.
    pub fn all() -> Self {
        Self::default()
    }

    /// Entities stored at or below `path`, or whose storage contains it.
    pub fn under(path: impl Into<NormalizedPath>) -> Self {
        Self {
            filter: Some(path.into()),
        }
    }

    pub fn from_filter(filter: Option<NormalizedPath>) -> Self {
        Self { filter }
    }

    pub fn is_all(&self) -> bool {
        self.filter.is_none()
    }

    pub fn contains(&self, location: &NormalizedPath) -> bool {
        match &self.filter {
            None => true,
            Some(filter) => location.starts_with(filter) || filter.starts_with(location),
        }
    }
}

/// Options for [`SyncEngine::pull`]
#[derive(Debug, Clone, Default)]
pub struct PullOptions {
    /// Delete local entities the remote no longer has
    pub sync_deletions: bool,
    /// Classify every action without touching the local tree
    pub dry_run: bool,
    pub scope: Scope,
}

/// Options for [`SyncEngine::push`]
#[derive(Debug, Clone, Default)]
pub struct PushOptions {
    /// Write every local entity, not only those the diff reports
    pub force: bool,
    /// Delete remote entities with no local counterpart
    pub sync_deletions: bool,
    /// Classify every action without touching either store
    pub dry_run: bool,
    pub scope: Scope,
}

/// Both sides of one kind, read once per operation.
struct Snapshot {
    locals: Vec<LocalEntity>,
    local_index: HashMap<String, usize>,
    remote: Vec<(String, Record)>,
    remote_index: HashMap<String, usize>,
}

impl Snapshot {
    fn local(&self, key: &str) -> Option<&LocalEntity> {
        self.local_index.get(key).map(|&i| &self.locals[i])
    }

    fn remote(&self, key: &str) -> Option<&Record> {
        self.remote_index.get(key).map(|&i| &self.remote[i].1)
    }

    fn remote_keys(&self) -> HashSet<String> {
        self.remote_index.keys().cloned().collect()
    }
}

type Planned = std::result::Result<DiffItem, (String, Error)>;

struct Analysis {
    renames: RenameMap,
    items: Vec<Planned>,
}

/// Locations taken during one run.
///
/// `used` covers every existing local location plus everything written so
/// far; `claimed` only what this run wrote, which must never be deleted.
struct Claims {
    used: HashSet<NormalizedPath>,
    claimed: HashSet<NormalizedPath>,
    /// Locations a rename moved away from, also in dry runs
    released: HashSet<NormalizedPath>,
}

impl Claims {
    fn new(snapshot: &Snapshot) -> Self {
        Self {
            used: snapshot.locals.iter().map(|e| e.location.clone()).collect(),
            claimed: HashSet::new(),
            released: HashSet::new(),
        }
    }

    fn claim(&mut self, location: NormalizedPath) {
        self.used.insert(location.clone());
        self.claimed.insert(location);
    }
}

/// Engine reconciling one entity kind
///
/// Provides three operations:
/// - **diff**: read-only comparison of both stores
/// - **pull**: make the local tree match the remote
/// - **push**: make the remote match the local tree
pub struct SyncEngine<'a> {
    kind: &'a mut dyn EntityKind,
}

impl<'a> SyncEngine<'a> {
    pub fn new(kind: &'a mut dyn EntityKind) -> Self {
        Self { kind }
    }

    fn load(&mut self) -> Result<Snapshot> {
        let mut locals: Vec<LocalEntity> = Vec::new();
        let mut local_index = HashMap::new();
        for entity in self.kind.list_local()? {
            match local_index.get(&entity.key) {
                Some(&i) => {
                    let previous: &LocalEntity = &locals[i];
                    warn!(
                        kind = self.kind.name(),
                        key = %entity.key,
                        ignored = %previous.location,
                        used = %entity.location,
                        "duplicate local key"
                    );
                    locals[i] = entity;
                }
                None => {
                    local_index.insert(entity.key.clone(), locals.len());
                    locals.push(entity);
                }
            }
        }

        let remote = self.kind.list_remote()?;
        let remote_index = remote
            .iter()
            .enumerate()
            .map(|(i, (key, _))| (key.clone(), i))
            .collect();

        Ok(Snapshot {
            locals,
            local_index,
            remote,
            remote_index,
        })
    }

    fn normalize_pair(
        &self,
        local_key: &str,
        local: &Record,
        remote_key: &str,
        remote: &Record,
    ) -> Result<(Record, Record)> {
        Ok((
            self.kind.normalize(local_key, local)?,
            self.kind.normalize(remote_key, remote)?,
        ))
    }

    fn remote_in_scope(&self, scope: &Scope, key: &str, record: &Record) -> bool {
        scope.is_all()
            || self
                .kind
                .location_for(key, record, &HashSet::new())
                .is_ok_and(|location| scope.contains(&location))
    }

    /// Location for `key`, ignoring the entity's current location `own`
    /// unless this run already wrote to it.
    fn location_excluding(
        &self,
        key: &str,
        record: &Record,
        own: Option<&NormalizedPath>,
        claims: &mut Claims,
    ) -> Result<NormalizedPath> {
        let released = own
            .filter(|path| !claims.claimed.contains(*path))
            .is_some_and(|path| claims.used.remove(path));
        let location = self.kind.location_for(key, record, &claims.used);
        if released && let Some(path) = own {
            claims.used.insert(path.clone());
        }
        location
    }

    fn analyze(&self, snapshot: &Snapshot, scope: &Scope) -> Analysis {
        let renames = detect_renames(&snapshot.locals, &snapshot.remote_keys());
        let mut items = Vec::new();

        for (old, new) in renames.iter() {
            let (Some(local), Some(remote)) = (snapshot.local(new), snapshot.remote(old)) else {
                continue;
            };
            if !scope.contains(&local.location) {
                continue;
            }
            let path = Some(local.location.to_string());
            items.push(
                self.normalize_pair(new, &local.record, old, remote)
                    .map(|(l, r)| DiffItem::renamed(old, new, l, r, path))
                    .map_err(|e| (new.to_string(), e)),
            );
        }

        for local in &snapshot.locals {
            if renames.is_new(&local.key) || !scope.contains(&local.location) {
                continue;
            }
            let path = Some(local.location.to_string());
            let item = match snapshot.remote(&local.key) {
                None => self
                    .kind
                    .normalize(&local.key, &local.record)
                    .map(|l| DiffItem::added(&local.key, l, path)),
                Some(remote) => {
                    match self.normalize_pair(&local.key, &local.record, &local.key, remote) {
                        Ok((l, r)) if l == r => continue,
                        Ok((l, r)) => Ok(DiffItem::modified(&local.key, l, r, path)),
                        Err(e) => Err(e),
                    }
                }
            };
            items.push(item.map_err(|e| (local.key.clone(), e)));
        }

        for (key, remote) in &snapshot.remote {
            if snapshot.local(key).is_some()
                || renames.is_old(key)
                || !self.remote_in_scope(scope, key, remote)
            {
                continue;
            }
            items.push(
                self.kind
                    .normalize(key, remote)
                    .map(|r| DiffItem::deleted(key, r))
                    .map_err(|e| (key.clone(), e)),
            );
        }

        Analysis { renames, items }
    }

    /// Differences between the stores, renames first, then additions and
    /// modifications in local order, then deletions in remote order.
    ///
    /// # Errors
    ///
    /// Fails if either store cannot be enumerated or any record in scope
    /// fails normalization.
    pub fn diff(&mut self, scope: &Scope) -> Result<Vec<DiffItem>> {
        let snapshot = self.load()?;
        self.analyze(&snapshot, scope)
            .items
            .into_iter()
            .map(|item| item.map_err(|(_, e)| e))
            .collect()
    }

    /// Bring the local tree in line with the remote.
    ///
    /// Pending local renames are left for `push`. Per-entity failures are
    /// recorded in the result.
    ///
    /// # Errors
    ///
    /// Fails only if either store cannot be enumerated.
    pub fn pull(&mut self, options: &PullOptions) -> Result<SyncResult> {
        let snapshot = self.load()?;
        let renames = detect_renames(&snapshot.locals, &snapshot.remote_keys());
        let scope = &options.scope;
        let mut claims = Claims::new(&snapshot);
        let mut result = SyncResult::new();

        for (key, remote) in &snapshot.remote {
            if renames.is_old(key) || renames.is_new(key) {
                debug!(kind = self.kind.name(), key = %key, "local rename pending, skipping");
                continue;
            }
            let existing = snapshot.local(key);
            let in_scope = existing.is_some_and(|e| scope.contains(&e.location))
                || self.remote_in_scope(scope, key, remote);
            if !in_scope {
                continue;
            }
            if let Err(e) =
                self.pull_entity(key, remote, existing, options.dry_run, &mut claims, &mut result)
            {
                warn!(kind = self.kind.name(), key = %key, error = %e, "pull failed");
                result.record_error(key, e);
            }
        }

        for local in &snapshot.locals {
            if snapshot.remote(&local.key).is_some()
                || renames.is_new(&local.key)
                || !scope.contains(&local.location)
            {
                continue;
            }
            if !options.sync_deletions {
                result.orphaned.push(local.key.clone());
                continue;
            }
            if claims.claimed.contains(&local.location) {
                debug!(key = %local.key, path = %local.location, "location rewritten this run, not deleting");
                continue;
            }
            if !options.dry_run
                && let Err(e) = self.kind.delete_local(&local.location)
            {
                result.record_error(&local.key, e);
                continue;
            }
            info!(kind = self.kind.name(), key = %local.key, "deleted local entity");
            result.deleted.push(local.key.clone());
        }

        Ok(result)
    }

    fn pull_entity(
        &self,
        key: &str,
        remote: &Record,
        existing: Option<&LocalEntity>,
        dry_run: bool,
        claims: &mut Claims,
        result: &mut SyncResult,
    ) -> Result<()> {
        let normalized = self.kind.normalize(key, remote)?;
        let target =
            self.location_excluding(key, &normalized, existing.map(|e| &e.location), claims)?;

        match existing {
            None => {
                if !dry_run {
                    self.kind.write_local(&target, &normalized)?;
                }
                info!(kind = self.kind.name(), key, path = %target, "created local entity");
                result.created.push(key.to_string());
            }
            Some(local) if local.location != target => {
                if !dry_run {
                    self.kind.write_local(&target, &normalized)?;
                    if !claims.claimed.contains(&local.location) {
                        self.kind.delete_local(&local.location)?;
                    }
                }
                info!(kind = self.kind.name(), key, from = %local.location, to = %target, "moved local entity");
                result.renamed.push((key.to_string(), key.to_string()));
            }
            Some(local) => {
                let current = self.kind.normalize(key, &local.record).ok();
                if current.as_ref() == Some(&normalized) {
                    debug!(kind = self.kind.name(), key, "unchanged");
                } else {
                    if !dry_run {
                        self.kind.write_local(&target, &normalized)?;
                    }
                    info!(kind = self.kind.name(), key, "updated local entity");
                    result.updated.push(key.to_string());
                }
            }
        }
        claims.claim(target);
        Ok(())
    }

    /// Bring the remote in line with the local tree.
    ///
    /// Runs renames, then creates and updates, then deletions, then a single
    /// reload. Per-entity failures are recorded in the result.
    ///
    /// # Errors
    ///
    /// Fails only if either store cannot be enumerated.
    pub fn push(&mut self, options: &PushOptions) -> Result<SyncResult> {
        let snapshot = self.load()?;
        let scope = &options.scope;
        let analysis = if options.force {
            Analysis {
                renames: detect_renames(&snapshot.locals, &snapshot.remote_keys()),
                items: Vec::new(),
            }
        } else {
            self.analyze(&snapshot, scope)
        };
        let renames = &analysis.renames;
        let mut claims = Claims::new(&snapshot);
        let mut result = SyncResult::new();

        let remote_keys = snapshot.remote_keys();
        let plan = renames.plan(&remote_keys);
        for conflict in &plan.conflicts {
            warn!(kind = self.kind.name(), old = %conflict.old, new = %conflict.new, "rename blocked");
            result.record_error(&conflict.new, Error::consistency(&conflict.new, &conflict.reason));
        }
        let mut vacated: HashSet<&str> = HashSet::new();
        for (old, new) in &plan.order {
            let Some(local) = snapshot.local(new) else {
                continue;
            };
            if !scope.contains(&local.location) {
                continue;
            }
            if remote_keys.contains(new) && !vacated.contains(new.as_str()) {
                let e = Error::consistency(new, format!("'{new}' is still in use on the remote"));
                result.record_error(new, e);
                continue;
            }
            match self.push_rename(old, local, options.dry_run, &mut claims, &mut result) {
                Ok(()) => {
                    vacated.insert(old);
                }
                Err((key, e)) => {
                    warn!(kind = self.kind.name(), key = %key, error = %e, "rename failed");
                    result.record_error(key, e);
                }
            }
        }

        let mut writes: Vec<(&LocalEntity, bool)> = Vec::new();
        let mut deletions: Vec<&str> = Vec::new();
        if options.force {
            for local in &snapshot.locals {
                if renames.is_new(&local.key) || !scope.contains(&local.location) {
                    continue;
                }
                writes.push((local, snapshot.remote(&local.key).is_none()));
            }
            for (key, remote) in &snapshot.remote {
                if snapshot.local(key).is_none()
                    && !renames.is_old(key)
                    && self.remote_in_scope(scope, key, remote)
                {
                    deletions.push(key);
                }
            }
        } else {
            for planned in &analysis.items {
                match planned {
                    Ok(item) => match item.status {
                        DiffStatus::Added | DiffStatus::Modified => {
                            if let Some(local) = snapshot.local(&item.key) {
                                writes.push((local, item.status == DiffStatus::Added));
                            }
                        }
                        DiffStatus::Deleted => deletions.push(&item.key),
                        DiffStatus::Renamed => {}
                    },
                    Err((key, _)) if renames.is_new(key) || renames.is_old(key) => {}
                    Err((key, e)) => result.record_error(key, e),
                }
            }
        }

        for (local, is_new) in writes {
            let remote = snapshot.remote(&local.key);
            if let Err(e) = self.push_entity(local, is_new, remote, options.dry_run, &mut claims, &mut result) {
                warn!(kind = self.kind.name(), key = %local.key, error = %e, "push failed");
                result.record_error(&local.key, e);
            }
        }

        for key in deletions {
            if !options.sync_deletions {
                result.orphaned.push(key.to_string());
                continue;
            }
            if !options.dry_run
                && let Err(e) = self.kind.remote().delete(key)
            {
                result.record_error(key, e);
                continue;
            }
            info!(kind = self.kind.name(), key, "deleted remote entity");
            result.deleted.push(key.to_string());
        }

        if !options.dry_run && result.has_changes() {
            if let Err(e) = self.kind.remote().reload() {
                let key = format!("reload:{}", self.kind.name());
                warn!(key = %key, error = %e, "reload failed");
                result.record_error(key, e);
            }
            if let Err(e) = self.kind.after_push() {
                result.record_error(self.kind.name().to_string(), e);
            }
        }

        Ok(result)
    }

    /// Delete `old` remotely, create the entity under its new key and move
    /// the local file to match.
    fn push_rename(
        &mut self,
        old: &str,
        local: &LocalEntity,
        dry_run: bool,
        claims: &mut Claims,
        result: &mut SyncResult,
    ) -> std::result::Result<(), (String, Error)> {
        let new = local.key.as_str();
        let on_new = |e: Error| (new.to_string(), e);
        let normalized = self.kind.normalize(new, &local.record).map_err(on_new)?;
        let target = self
            .location_excluding(new, &normalized, Some(&local.location), claims)
            .map_err(on_new)?;

        if target != local.location && target.exists() && !claims.released.contains(&target) {
            return Err(on_new(Error::consistency(
                new,
                format!("{target} already holds another entity"),
            )));
        }

        if dry_run {
            claims.released.insert(local.location.clone());
            result.renamed.push((old.to_string(), new.to_string()));
            return Ok(());
        }

        let payload = self.kind.payload(new, &normalized);
        self.kind
            .remote()
            .delete(old)
            .map_err(|e| (old.to_string(), e))?;
        let assigned = self.kind.remote().create(new, &payload).map_err(on_new)?;
        if assigned.is_empty() {
            return Err(on_new(Error::consistency(new, "remote returned no key for the new entity")));
        }

        if assigned == new {
            self.kind.move_local(&local.location, &target).map_err(on_new)?;
            claims.claim(target);
        } else {
            self.relocate(local, &assigned, &normalized, claims).map_err(on_new)?;
        }
        claims.released.insert(local.location.clone());
        info!(kind = self.kind.name(), old, new = %assigned, "renamed remote entity");
        result.renamed.push((old.to_string(), assigned));
        Ok(())
    }

    fn push_entity(
        &mut self,
        local: &LocalEntity,
        is_new: bool,
        remote: Option<&Record>,
        dry_run: bool,
        claims: &mut Claims,
        result: &mut SyncResult,
    ) -> Result<()> {
        let key = local.key.as_str();
        let normalized = self.kind.normalize(key, &local.record)?;
        self.location_excluding(key, &normalized, Some(&local.location), claims)?;
        let desired = self.kind.external_name(key, &normalized)?;
        let payload = self.kind.payload(key, &normalized);

        if dry_run {
            if is_new {
                result.created.push(key.to_string());
            } else {
                result.updated.push(key.to_string());
            }
            return Ok(());
        }

        let written = if is_new {
            let assigned = self.kind.remote().create(key, &payload)?;
            if assigned.is_empty() {
                return Err(Error::consistency(key, "remote returned no key for the new entity"));
            }
            if assigned != key {
                self.relocate(local, &assigned, &normalized, claims)?;
            }
            info!(kind = self.kind.name(), key = %assigned, "created remote entity");
            result.created.push(assigned.clone());
            assigned
        } else {
            self.kind.remote().update(key, &payload)?;
            info!(kind = self.kind.name(), key, "updated remote entity");
            result.updated.push(key.to_string());
            key.to_string()
        };

        let Some(desired) = desired else {
            return Ok(());
        };
        if let Some(remote) = remote
            && self.kind.external_name(key, remote).ok().flatten().as_deref() == Some(desired.as_str())
        {
            return Ok(());
        }
        match self.kind.remote().assign_external_name(&written, &desired) {
            Ok(Some(previous)) => {
                info!(kind = self.kind.name(), key = %written, from = %previous, to = %desired, "renamed entity id");
                result.renamed.push((previous, desired));
            }
            Ok(None) => {}
            Err(e) => result.record_error(written, e),
        }
        Ok(())
    }

    /// Rewrite `local` under the key the remote assigned.
    fn relocate(
        &self,
        local: &LocalEntity,
        assigned: &str,
        normalized: &Record,
        claims: &mut Claims,
    ) -> Result<()> {
        let rekeyed = self.kind.rekey(assigned, normalized);
        let target = self.location_excluding(assigned, &rekeyed, Some(&local.location), claims)?;
        self.kind.write_local(&target, &rekeyed)?;
        if target != local.location && !claims.claimed.contains(&local.location) {
            self.kind.delete_local(&local.location)?;
        }
        debug!(kind = self.kind.name(), from = %local.key, to = assigned, path = %target, "rekeyed local entity");
        claims.claim(target);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_contains_nested_and_enclosing_paths() {
        let scope = Scope::under("/ws/dashboards/energy/01_home.yaml");
        assert!(scope.contains(&NormalizedPath::new("/ws/dashboards/energy")));
        assert!(!scope.contains(&NormalizedPath::new("/ws/dashboards/lovelace")));

        let scope = Scope::under("/ws/helpers/input_boolean");
        assert!(scope.contains(&NormalizedPath::new("/ws/helpers/input_boolean/guest.yaml")));
        assert!(!scope.contains(&NormalizedPath::new("/ws/helpers/input_number/level.yaml")));
    }

    #[test]
    fn test_all_scope_contains_everything() {
        assert!(Scope::all().contains(&NormalizedPath::new("/anywhere")));
        assert!(Scope::all().is_all());
    }
}
