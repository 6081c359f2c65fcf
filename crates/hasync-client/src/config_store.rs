//! Automations, scripts and scenes through the `/api/config` REST endpoints

use hasync_core::RemoteStore;
use hasync_meta::{Record, ensure_leading};
use serde_json::Value;
use tracing::{debug, info};

use crate::client::{HaClient, as_array, into_record};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigDomain {
    Automation,
    Script,
    Scene,
}

impl ConfigDomain {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Automation => "automation",
            Self::Script => "script",
            Self::Scene => "scene",
        }
    }

    /// Config ids behind the entities in a `GET /api/states` listing.
    ///
    /// Automations and scenes expose their id as the `id` attribute; scripts
    /// are keyed by their object id.
    pub fn config_ids(&self, states: &[Value]) -> Vec<String> {
        let prefix = format!("{}.", self.as_str());
        let mut ids: Vec<String> = Vec::new();
        for state in states {
            let Some(entity_id) = state.get("entity_id").and_then(Value::as_str) else {
                continue;
            };
            let Some(object_id) = entity_id.strip_prefix(&prefix) else {
                continue;
            };
            let id = match self {
                Self::Script => Some(object_id.to_string()),
                Self::Automation | Self::Scene => state
                    .pointer("/attributes/id")
                    .and_then(|id| match id {
                        Value::String(s) => Some(s.clone()),
                        Value::Number(n) => Some(n.to_string()),
                        _ => None,
                    }),
            };
            if let Some(id) = id
                && !ids.contains(&id)
            {
                ids.push(id);
            }
        }
        ids
    }

    /// Request body for saving `payload` under `key`.
    pub fn body(&self, key: &str, payload: &Record) -> Record {
        match self {
            Self::Script => {
                let mut body = payload.clone();
                body.remove("id");
                body
            }
            Self::Automation | Self::Scene => ensure_leading(payload, "id", Value::String(key.to_string())),
        }
    }
}

pub struct ConfigStore {
    client: HaClient,
    domain: ConfigDomain,
}

impl ConfigStore {
    pub fn new(client: HaClient, domain: ConfigDomain) -> Self {
        Self { client, domain }
    }

    fn path(&self, key: &str) -> String {
        format!("api/config/{}/config/{key}", self.domain.as_str())
    }

    fn operation(&self, verb: &str) -> String {
        format!("{verb} {}", self.domain.as_str())
    }

    fn save(&mut self, key: &str, payload: &Record) -> hasync_core::Result<()> {
        let body = Value::Object(self.domain.body(key, payload));
        self.client
            .post(&self.path(key), &body)
            .map_err(|e| e.during(self.operation("save")))?;
        Ok(())
    }
}

impl RemoteStore for ConfigStore {
    fn list(&mut self) -> hasync_core::Result<Vec<(String, Record)>> {
        let during = |e: crate::ClientError| e.during(self.operation("list"));
        let states = self.client.get("api/states").map_err(during)?;
        let ids = self.domain.config_ids(as_array(&states, "api/states").map_err(during)?);

        let mut out = Vec::with_capacity(ids.len());
        for id in ids {
            // Entities defined in YAML have no stored config.
            let Some(config) = self.client.get_optional(&self.path(&id)).map_err(during)? else {
                debug!(domain = self.domain.as_str(), id = %id, "no stored config");
                continue;
            };
            out.push((id.clone(), into_record(config, &self.path(&id)).map_err(during)?));
        }
        Ok(out)
    }

    fn get(&mut self, key: &str) -> hasync_core::Result<Option<Record>> {
        let path = self.path(key);
        match self.client.get_optional(&path) {
            Ok(Some(config)) => Ok(Some(into_record(config, &path)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(e.during(self.operation("get"))),
        }
    }

    fn create(&mut self, local_key: &str, payload: &Record) -> hasync_core::Result<String> {
        self.save(local_key, payload)?;
        info!(domain = self.domain.as_str(), key = local_key, "created");
        Ok(local_key.to_string())
    }

    fn update(&mut self, key: &str, payload: &Record) -> hasync_core::Result<()> {
        self.save(key, payload)?;
        info!(domain = self.domain.as_str(), key, "updated");
        Ok(())
    }

    fn delete(&mut self, key: &str) -> hasync_core::Result<()> {
        self.client
            .delete(&self.path(key))
            .map_err(|e| e.during(self.operation("delete")))?;
        info!(domain = self.domain.as_str(), key, "deleted");
        Ok(())
    }

    fn reload(&mut self) -> hasync_core::Result<()> {
        self.client
            .call_service(self.domain.as_str(), "reload")
            .map_err(|e| e.during(self.operation("reload")))
    }
}
