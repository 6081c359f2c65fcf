//! Remote entity store capability
//!
//! Each entity kind owns one [`RemoteStore`]. Keys are the kind's canonical
//! keys, so a nested kind sees `"input_boolean/guest"` and an opaque kind
//! sees `"sensor/01HX..."`.

use hasync_meta::{Record, ensure_leading};
use serde_json::Value;
use tracing::debug;

use crate::{Error, Result};

pub trait RemoteStore {
    /// Every entity of the kind, in the remote's order.
    fn list(&mut self) -> Result<Vec<(String, Record)>>;

    /// One entity, or `None` if it does not exist.
    fn get(&mut self, key: &str) -> Result<Option<Record>> {
        Ok(self
            .list()?
            .into_iter()
            .find_map(|(k, record)| (k == key).then_some(record)))
    }

    /// Create an entity and return the key it is stored under.
    ///
    /// `local_key` is the key the local side uses; kinds whose remote assigns
    /// identifiers may return something different.
    fn create(&mut self, local_key: &str, payload: &Record) -> Result<String>;

    fn update(&mut self, key: &str, payload: &Record) -> Result<()>;

    fn delete(&mut self, key: &str) -> Result<()>;

    /// Ask the application to pick up changes. Called once after mutations.
    fn reload(&mut self) -> Result<()> {
        Ok(())
    }

    /// Give the entity behind `key` a new externally visible name.
    ///
    /// Returns the previous name when something changed, `None` when the entity
    /// already had the desired name.
    fn assign_external_name(&mut self, key: &str, desired: &str) -> Result<Option<String>> {
        let _ = desired;
        Err(Error::remote(
            "assign external name",
            format!("{key}: not supported by this kind"),
        ))
    }
}

impl<T: RemoteStore + ?Sized> RemoteStore for Box<T> {
    fn list(&mut self) -> Result<Vec<(String, Record)>> {
        (**self).list()
    }

    fn get(&mut self, key: &str) -> Result<Option<Record>> {
        (**self).get(key)
    }

    fn create(&mut self, local_key: &str, payload: &Record) -> Result<String> {
        (**self).create(local_key, payload)
    }

    fn update(&mut self, key: &str, payload: &Record) -> Result<()> {
        (**self).update(key, payload)
    }

    fn delete(&mut self, key: &str) -> Result<()> {
        (**self).delete(key)
    }

    fn reload(&mut self) -> Result<()> {
        (**self).reload()
    }

    fn assign_external_name(&mut self, key: &str, desired: &str) -> Result<Option<String>> {
        (**self).assign_external_name(key, desired)
    }
}

/// A remote container (config entry) holding one entity's options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Container {
    pub id: String,
    pub title: String,
    /// Subtype for platforms with several entity shapes (template, group).
    pub group: Option<String>,
}

/// Two-step remote: containers first, then the options of each one.
pub trait ContainerSource {
    fn list_containers(&mut self) -> Result<Vec<Container>>;

    fn container_options(&mut self, container: &Container) -> Result<Record>;

    /// Current externally visible name, for kinds that have one.
    fn external_name(&mut self, container: &Container) -> Result<Option<String>> {
        let _ = container;
        Ok(None)
    }

    /// Create a container and return its id.
    fn create(&mut self, group: Option<&str>, payload: &Record) -> Result<String>;

    fn update(&mut self, id: &str, payload: &Record) -> Result<()>;

    fn delete(&mut self, id: &str) -> Result<()>;

    fn assign_external_name(&mut self, id: &str, desired: &str) -> Result<Option<String>> {
        let _ = desired;
        Err(Error::remote(
            "assign external name",
            format!("{id}: not supported by this platform"),
        ))
    }
}

/// [`RemoteStore`] over a [`ContainerSource`].
///
/// Records carry the container id under `key_field`, the container title
/// under `name_field` and, when configured, the external name under
/// `external_field`.
pub struct ContainerRemote<S> {
    source: S,
    key_field: &'static str,
    name_field: &'static str,
    external_field: Option<&'static str>,
}

impl<S: ContainerSource> ContainerRemote<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            key_field: "entry_id",
            name_field: "name",
            external_field: None,
        }
    }

    pub fn with_external_field(mut self, field: &'static str) -> Self {
        self.external_field = Some(field);
        self
    }

    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    fn split<'k>(&self, key: &'k str) -> &'k str {
        key.rsplit_once('/').map_or(key, |(_, id)| id)
    }
}

impl<S: ContainerSource> RemoteStore for ContainerRemote<S> {
    fn list(&mut self) -> Result<Vec<(String, Record)>> {
        let containers = self.source.list_containers()?;
        let mut out = Vec::with_capacity(containers.len());
        for container in containers {
            let options = self.source.container_options(&container)?;
            let mut record = ensure_leading(&options, self.name_field, Value::String(container.title.clone()));
            record = ensure_leading(&record, self.key_field, Value::String(container.id.clone()));
            if let Some(field) = self.external_field
                && let Some(name) = self.source.external_name(&container)?
            {
                record.insert(field.to_string(), Value::String(name));
            }
            let key = match &container.group {
                Some(group) => format!("{group}/{}", container.id),
                None => container.id.clone(),
            };
            debug!(key = %key, "fetched container options");
            out.push((key, record));
        }
        Ok(out)
    }

    fn create(&mut self, local_key: &str, payload: &Record) -> Result<String> {
        let group = local_key.split_once('/').map(|(group, _)| group);
        let mut body = payload.clone();
        body.remove(self.key_field);
        let id = self.source.create(group, &body)?;
        Ok(match group {
            Some(group) => format!("{group}/{id}"),
            None => id,
        })
    }

    fn update(&mut self, key: &str, payload: &Record) -> Result<()> {
        let mut body = payload.clone();
        body.remove(self.key_field);
        let id = self.split(key).to_string();
        self.source.update(&id, &body)
    }

    fn delete(&mut self, key: &str) -> Result<()> {
        let id = self.split(key).to_string();
        self.source.delete(&id)
    }

    fn assign_external_name(&mut self, key: &str, desired: &str) -> Result<Option<String>> {
        let id = self.split(key).to_string();
        self.source.assign_external_name(&id, desired)
    }
}
