//! Storage-collection helpers (`input_*`, timer, schedule, counter) over the
//! WebSocket `{type}/list|create|update|delete` commands

use std::collections::BTreeSet;

use hasync_core::kind::split_key;
use hasync_core::{Error, RemoteStore};
use hasync_meta::Record;
use serde_json::Value;
use tracing::{debug, info};

use crate::client::{HaClient, as_array};

pub struct StorageHelperStore {
    client: HaClient,
    types: &'static [&'static str],
    /// Types mutated since the last reload.
    dirty: BTreeSet<String>,
}

impl StorageHelperStore {
    pub fn new(client: HaClient, types: &'static [&'static str]) -> Self {
        Self {
            client,
            types,
            dirty: BTreeSet::new(),
        }
    }

    fn split<'k>(&self, key: &'k str) -> hasync_core::Result<(&'k str, &'k str)> {
        match split_key(key) {
            (Some(ty), id) if self.types.contains(&ty) => Ok((ty, id)),
            _ => Err(Error::consistency(key, "not a storage helper key")),
        }
    }
}

/// Payload without the id, which travels as `<type>_id`.
fn body(payload: &Record) -> Record {
    let mut body = payload.clone();
    body.remove("id");
    body
}

impl RemoteStore for StorageHelperStore {
    fn list(&mut self) -> hasync_core::Result<Vec<(String, Record)>> {
        let mut out = Vec::new();
        for ty in self.types {
            let command = format!("{ty}/list");
            let items = match self.client.ws(&command, Value::Null) {
                Ok(items) => items,
                Err(e) if e.is_unknown_command() => {
                    debug!(helper_type = ty, "integration not loaded");
                    continue;
                }
                Err(e) => return Err(e.during(command)),
            };
            for item in as_array(&items, &command)? {
                let Value::Object(record) = item else { continue };
                let Some(id) = record.get("id").and_then(Value::as_str) else {
                    continue;
                };
                out.push((format!("{ty}/{id}"), record.clone()));
            }
        }
        Ok(out)
    }

    fn create(&mut self, local_key: &str, payload: &Record) -> hasync_core::Result<String> {
        let (ty, _) = self.split(local_key)?;
        let command = format!("{ty}/create");
        let created = self
            .client
            .ws(&command, Value::Object(body(payload)))
            .map_err(|e| e.during(&command))?;
        let id = created
            .get("id")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::remote(&command, "response has no id"))?;
        self.dirty.insert(ty.to_string());
        info!(key = local_key, assigned = id, "created helper");
        Ok(format!("{ty}/{id}"))
    }

    fn update(&mut self, key: &str, payload: &Record) -> hasync_core::Result<()> {
        let (ty, id) = self.split(key)?;
        let command = format!("{ty}/update");
        let mut fields = body(payload);
        fields.insert(format!("{ty}_id"), Value::String(id.to_string()));
        self.client
            .ws(&command, Value::Object(fields))
            .map_err(|e| e.during(&command))?;
        self.dirty.insert(ty.to_string());
        info!(key, "updated helper");
        Ok(())
    }

    fn delete(&mut self, key: &str) -> hasync_core::Result<()> {
        let (ty, id) = self.split(key)?;
        let command = format!("{ty}/delete");
        let mut fields = Record::new();
        fields.insert(format!("{ty}_id"), Value::String(id.to_string()));
        self.client
            .ws(&command, Value::Object(fields))
            .map_err(|e| e.during(&command))?;
        self.dirty.insert(ty.to_string());
        info!(key, "deleted helper");
        Ok(())
    }

    fn reload(&mut self) -> hasync_core::Result<()> {
        for ty in std::mem::take(&mut self.dirty) {
            self.client
                .call_service(&ty, "reload")
                .map_err(|e| e.during(format!("reload {ty}")))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_body_drops_id() {
        let payload = json!({"id": "guest", "name": "Guest"}).as_object().cloned().unwrap();
        assert_eq!(Value::Object(body(&payload)), json!({"name": "Guest"}));
    }
}
