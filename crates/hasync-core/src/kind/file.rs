//! File-per-entity kinds

use std::collections::HashSet;

use hasync_fs::{LocalStore, NormalizedPath, filename_from_id, filename_from_name};
use hasync_meta::{Record, Schema, ensure_leading, normalize_schemaless, strip_bookkeeping};
use serde_json::Value;
use tracing::{debug, warn};

use super::{EntityKind, LocalCheck, LocalEntity, WarnedTypes, split_key};
use crate::remote::RemoteStore;
use crate::{Error, Result};

/// Prefix of keys given to local files the remote has not assigned an id yet.
pub const NEW_KEY_PREFIX: &str = "new:";

/// Directory shape of a kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    /// `<root>/<file>.yaml`
    Flat,
    /// `<root>/<group>/<file>.yaml`, keys are `"<group>/<inner>"`.
    /// `groups` restricts which subdirectories belong to the kind.
    Nested {
        groups: Option<&'static [&'static str]>,
    },
}

/// Where an entity's key comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keying {
    /// The user picks the key and stores it in `field`; filename is `<key>.yaml`.
    Declared { field: &'static str },
    /// The remote assigns the key, stored in `field`. Filenames are derived from
    /// `name_field`. `external_name` holds a desired entity id that is applied
    /// after every write.
    Opaque {
        field: &'static str,
        name_field: &'static str,
        external_name: Option<&'static str>,
    },
}

impl Keying {
    pub fn field(&self) -> &'static str {
        match self {
            Self::Declared { field } | Self::Opaque { field, .. } => field,
        }
    }
}

/// Schema selection for a kind.
#[derive(Clone, Copy)]
pub enum Schemas {
    Single(&'static Schema),
    /// Looked up by group (helper type or subtype).
    PerGroup(fn(&str) -> Option<&'static Schema>),
    None,
}

impl std::fmt::Debug for Schemas {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Single(schema) => write!(f, "Single({})", schema.name()),
            Self::PerGroup(_) => write!(f, "PerGroup"),
            Self::None => write!(f, "None"),
        }
    }
}

/// Static description of a file-per-entity kind.
#[derive(Debug, Clone)]
pub struct KindSpec {
    pub name: String,
    pub root: NormalizedPath,
    pub layout: Layout,
    pub keying: Keying,
    pub schemas: Schemas,
    /// Fields `validate` insists on, beyond what the schema requires.
    /// `a|b` accepts either field.
    pub required: &'static [&'static str],
    /// Fields whose absence `validate` reports as a warning.
    pub recommended: &'static [&'static str],
}

/// A kind storing one YAML file per entity.
pub struct FileKind {
    spec: KindSpec,
    store: LocalStore,
    remote: Box<dyn RemoteStore>,
    warned: WarnedTypes,
}

impl FileKind {
    pub fn new(spec: KindSpec, remote: Box<dyn RemoteStore>) -> Self {
        let store = LocalStore::new(spec.root.clone());
        Self {
            spec,
            store,
            remote,
            warned: WarnedTypes::new(),
        }
    }

    pub fn spec(&self) -> &KindSpec {
        &self.spec
    }

    fn schema_for(&self, group: Option<&str>) -> Option<&'static Schema> {
        match self.spec.schemas {
            Schemas::Single(schema) => Some(schema),
            Schemas::PerGroup(lookup) => group.and_then(lookup),
            Schemas::None => None,
        }
    }

    fn group_dirs(&self) -> Result<Vec<(Option<String>, NormalizedPath)>> {
        match self.spec.layout {
            Layout::Flat => Ok(vec![(None, self.spec.root.clone())]),
            Layout::Nested { groups } => {
                let subdirs = self.store.subdirs(&self.spec.root)?;
                Ok(subdirs
                    .into_iter()
                    .filter(|name| groups.is_none_or(|allowed| allowed.contains(&name.as_str())))
                    .map(|name| {
                        let dir = self.spec.root.join(&name);
                        (Some(name), dir)
                    })
                    .collect())
            }
        }
    }

    fn join_key(group: Option<&str>, inner: &str) -> String {
        match group {
            Some(group) => format!("{group}/{inner}"),
            None => inner.to_string(),
        }
    }

    fn dir_for(&self, group: Option<&str>) -> NormalizedPath {
        match group {
            Some(group) => self.spec.root.join(group),
            None => self.spec.root.clone(),
        }
    }

    /// Expand a bare external name to `<platform>.<name>`.
    fn qualify(&self, group: Option<&str>, name: &str) -> Result<String> {
        match (name.split_once('.'), group) {
            (Some((domain, _)), Some(platform)) if domain != platform => {
                Err(Error::EntityIdMismatch {
                    entity_id: name.to_string(),
                    platform: platform.to_string(),
                })
            }
            (Some(_), _) | (None, None) => Ok(name.to_string()),
            (None, Some(platform)) => Ok(format!("{platform}.{name}")),
        }
    }

    fn external_field(&self) -> Option<&'static str> {
        match self.spec.keying {
            Keying::Opaque { external_name, .. } => external_name,
            Keying::Declared { .. } => None,
        }
    }
}

impl EntityKind for FileKind {
    fn name(&self) -> &str {
        &self.spec.name
    }

    fn root(&self) -> &NormalizedPath {
        &self.spec.root
    }

    fn list_local(&self) -> Result<Vec<LocalEntity>> {
        let mut entities = Vec::new();
        for (group, dir) in self.group_dirs()? {
            for (location, mut record) in self.store.list(&dir)? {
                strip_bookkeeping(&mut record);
                let stem = location.stem().unwrap_or_default().to_string();
                let field = self.spec.keying.field();
                let content = record.get(field).and_then(|v| match v {
                    Value::String(s) if !s.is_empty() => Some(s.clone()),
                    Value::Number(n) => Some(n.to_string()),
                    _ => None,
                });

                let entity = match self.spec.keying {
                    Keying::Declared { field } => {
                        let inner = content.unwrap_or_else(|| stem.clone());
                        if !record.contains_key(field) {
                            record = ensure_leading(&record, field, Value::String(inner.clone()));
                        }
                        LocalEntity {
                            key: Self::join_key(group.as_deref(), &inner),
                            filename_key: Some(Self::join_key(group.as_deref(), &stem)),
                            location,
                            record,
                        }
                    }
                    Keying::Opaque { .. } => {
                        let inner = content.unwrap_or_else(|| format!("{NEW_KEY_PREFIX}{stem}"));
                        LocalEntity {
                            key: Self::join_key(group.as_deref(), &inner),
                            filename_key: None,
                            location,
                            record,
                        }
                    }
                };
                entities.push(entity);
            }
        }
        debug!(kind = %self.spec.name, count = entities.len(), "listed local entities");
        Ok(entities)
    }

    fn list_remote(&mut self) -> Result<Vec<(String, Record)>> {
        let listed = self.remote.list()?;
        let mut out = Vec::with_capacity(listed.len());
        for (key, record) in listed {
            let (group, _) = split_key(&key);
            if let Layout::Nested { groups: None } = self.spec.layout
                && let Some(group) = group
                && self.schema_for(Some(group)).is_none()
            {
                self.warned.warn_once(&self.spec.name, group);
            }
            let record = self.rekey(&key, &record);
            out.push((key, record));
        }
        debug!(kind = %self.spec.name, count = out.len(), "listed remote entities");
        Ok(out)
    }

    fn normalize(&self, key: &str, record: &Record) -> Result<Record> {
        let (group, _) = split_key(key);
        let mut record = record.clone();
        if let Some(field) = self.external_field()
            && let Some(Value::String(name)) = record.get(field)
            && let Ok(qualified) = self.qualify(group, name)
        {
            record.insert(field.to_string(), Value::String(qualified));
        }
        match self.schema_for(group) {
            Some(schema) => Ok(schema.normalize_record(&record)?),
            None => Ok(normalize_schemaless(&record)),
        }
    }

    fn location_for(
        &self,
        key: &str,
        record: &Record,
        used: &HashSet<NormalizedPath>,
    ) -> Result<NormalizedPath> {
        let (group, inner) = split_key(key);
        let dir = self.dir_for(group);
        let filename = match self.spec.keying {
            Keying::Declared { .. } => filename_from_id(inner)?,
            Keying::Opaque { name_field, .. } => {
                let name = record.get(name_field).and_then(Value::as_str).unwrap_or_default();
                let id = inner.strip_prefix(NEW_KEY_PREFIX).unwrap_or(inner);
                let taken: HashSet<String> = used
                    .iter()
                    .filter(|path| path.parent().as_ref() == Some(&dir))
                    .filter_map(|path| path.file_name().map(str::to_string))
                    .collect();
                filename_from_name(name, id, &taken)?
            }
        };
        Ok(dir.join(&filename))
    }

    fn write_local(&self, location: &NormalizedPath, record: &Record) -> Result<()> {
        Ok(self.store.write(location, record)?)
    }

    fn delete_local(&self, location: &NormalizedPath) -> Result<()> {
        Ok(self.store.delete(location)?)
    }

    fn move_local(&self, from: &NormalizedPath, to: &NormalizedPath) -> Result<()> {
        Ok(self.store.rename(from, to)?)
    }

    fn rekey(&self, key: &str, record: &Record) -> Record {
        let (_, inner) = split_key(key);
        if inner.starts_with(NEW_KEY_PREFIX) {
            return record.clone();
        }
        ensure_leading(record, self.spec.keying.field(), Value::String(inner.to_string()))
    }

    fn payload(&self, _key: &str, record: &Record) -> Record {
        let mut payload = record.clone();
        if let Some(field) = self.external_field() {
            payload.remove(field);
        }
        payload
    }

    fn external_name(&self, key: &str, record: &Record) -> Result<Option<String>> {
        let Some(field) = self.external_field() else {
            return Ok(None);
        };
        let (group, _) = split_key(key);
        match record.get(field) {
            Some(Value::String(name)) if !name.is_empty() => self.qualify(group, name).map(Some),
            Some(Value::Null) | None => Ok(None),
            Some(_) => Err(Error::consistency(key, format!("{field} must be a string"))),
        }
    }

    fn remote(&mut self) -> &mut dyn RemoteStore {
        self.remote.as_mut()
    }

    fn unknown_types(&self) -> Vec<String> {
        self.warned.seen().to_vec()
    }

    fn local_files(&self) -> Result<Vec<NormalizedPath>> {
        let mut files = Vec::new();
        for (_, dir) in self.group_dirs()? {
            files.extend(self.store.entity_files(&dir)?);
        }
        Ok(files)
    }

    fn check_local(&self, location: &NormalizedPath, record: &Record) -> LocalCheck {
        let mut check = LocalCheck::default();
        let group = match self.spec.layout {
            Layout::Flat => None,
            Layout::Nested { .. } => location.parent().and_then(|p| p.file_name().map(str::to_string)),
        };

        let present = |spec: &str| spec.split('|').any(|field| record.contains_key(field));
        for spec in self.spec.required {
            if !present(spec) {
                check.errors.push(format!("missing required field '{}'", spec.replace('|', "' or '")));
            }
        }
        for spec in self.spec.recommended {
            if !present(spec) {
                check.warnings.push(format!("missing field '{}'", spec.replace('|', "' or '")));
            }
        }

        let mut record = record.clone();
        strip_bookkeeping(&mut record);
        if let Keying::Declared { field } = self.spec.keying
            && !record.contains_key(field)
        {
            let stem = location.stem().unwrap_or_default();
            record = ensure_leading(&record, field, Value::String(stem.to_string()));
        }
        if let Some(schema) = self.schema_for(group.as_deref()) {
            for field in schema.required_fields() {
                let listed = self.spec.required.iter().any(|spec| spec.split('|').any(|f| f == field));
                if !record.contains_key(field) && !listed {
                    check.errors.push(format!("missing required field '{field}'"));
                }
            }
            if let Err(e) = schema.normalize(&record) {
                if !matches!(e, hasync_meta::SchemaError::MissingField { .. }) {
                    check.errors.push(e.to_string());
                }
            }
        } else if matches!(self.spec.schemas, Schemas::PerGroup(_)) {
            warn!(path = %location, "no schema for this type; skipping field checks");
            check
                .warnings
                .push("no schema for this type; field types not checked".to_string());
        }

        if let Some(field) = self.external_field()
            && let Some(Value::String(name)) = record.get(field)
            && let Err(e) = self.qualify(group.as_deref(), name)
        {
            check.errors.push(e.to_string());
        }
        check
    }
}
