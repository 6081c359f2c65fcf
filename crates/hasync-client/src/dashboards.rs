//! Dashboards through the `lovelace/*` WebSocket commands

use std::collections::HashMap;

use hasync_core::RemoteStore;
use hasync_core::kind::{DEFAULT_DASHBOARD, dir_name_from_url_path, url_path_from_dir_name};
use hasync_meta::Record;
use serde_json::{Value, json};
use tracing::{debug, info};

use crate::client::{HaClient, as_array, into_record};
use crate::{ClientError, Result};

const META_FIELDS: &[&str] = &["title", "icon", "url_path", "show_in_sidebar", "require_admin"];

/// Registry fields for `lovelace/dashboards/create|update`, with defaults the
/// normalized record leaves out filled back in.
pub fn registry_fields(key: &str, payload: &Record) -> Record {
    let mut fields = Record::new();
    let title = payload
        .get("title")
        .and_then(Value::as_str)
        .filter(|t| !t.is_empty())
        .map_or_else(|| key.to_string(), str::to_string);
    fields.insert("title".into(), Value::String(title));
    if let Some(icon) = payload.get("icon").filter(|v| !v.is_null()) {
        fields.insert("icon".into(), icon.clone());
    }
    let flag = |name: &str, default: bool| payload.get(name).and_then(Value::as_bool).unwrap_or(default);
    fields.insert("show_in_sidebar".into(), Value::Bool(flag("show_in_sidebar", true)));
    fields.insert("require_admin".into(), Value::Bool(flag("require_admin", false)));
    fields
}

pub struct DashboardStore {
    client: HaClient,
    /// Registry ids by url path.
    ids: HashMap<String, String>,
}

impl DashboardStore {
    pub fn new(client: HaClient) -> Self {
        Self {
            client,
            ids: HashMap::new(),
        }
    }

    fn url_path(key: &str, payload: &Record) -> Option<String> {
        match payload.get("url_path").and_then(Value::as_str) {
            Some(path) if !path.is_empty() => Some(path.to_string()),
            _ => url_path_from_dir_name(key),
        }
    }

    /// Stored document of a dashboard; `None` for auto-generated ones.
    fn load_config(&self, url_path: Option<&str>) -> Result<Option<Record>> {
        match self.client.ws("lovelace/config", json!({"url_path": url_path, "force": true})) {
            Ok(config) => Ok(Some(into_record(config, "lovelace/config")?)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn save_config(&self, url_path: Option<&str>, payload: &Record) -> Result<()> {
        let config = payload.get("config").cloned().unwrap_or_else(|| json!({}));
        self.client
            .ws("lovelace/config/save", json!({"url_path": url_path, "config": config}))?;
        Ok(())
    }

    fn list_dashboards(&mut self) -> Result<Vec<Record>> {
        let listed = self.client.ws("lovelace/dashboards/list", Value::Null)?;
        let mut out = Vec::new();
        self.ids.clear();
        for item in as_array(&listed, "lovelace/dashboards/list")? {
            let Value::Object(item) = item else { continue };
            // YAML dashboards cannot be saved.
            if item.get("mode").and_then(Value::as_str).is_some_and(|m| m != "storage") {
                continue;
            }
            if let (Some(id), Some(url_path)) = (
                item.get("id").and_then(Value::as_str),
                item.get("url_path").and_then(Value::as_str),
            ) {
                self.ids.insert(url_path.to_string(), id.to_string());
                out.push(item.clone());
            }
        }
        Ok(out)
    }

    fn dashboard_id(&mut self, url_path: &str) -> Result<String> {
        if !self.ids.contains_key(url_path) {
            self.list_dashboards()?;
        }
        self.ids
            .get(url_path)
            .cloned()
            .ok_or_else(|| ClientError::protocol(format!("no dashboard with url path {url_path}")))
    }
}

impl RemoteStore for DashboardStore {
    fn list(&mut self) -> hasync_core::Result<Vec<(String, Record)>> {
        let during = |e: ClientError| e.during("list dashboards");
        let mut out = Vec::new();
        if let Some(config) = self.load_config(None).map_err(during)? {
            let mut record = Record::new();
            record.insert("config".into(), Value::Object(config));
            out.push((DEFAULT_DASHBOARD.to_string(), record));
        }
        for item in self.list_dashboards().map_err(during)? {
            let url_path = item.get("url_path").and_then(Value::as_str).unwrap_or_default().to_string();
            let mut record: Record = META_FIELDS
                .iter()
                .filter_map(|field| item.get(*field).map(|v| (field.to_string(), v.clone())))
                .collect();
            if let Some(config) = self.load_config(Some(&url_path)).map_err(during)? {
                record.insert("config".into(), Value::Object(config));
            }
            out.push((dir_name_from_url_path(Some(&url_path)), record));
        }
        debug!(count = out.len(), "listed dashboards");
        Ok(out)
    }

    fn create(&mut self, local_key: &str, payload: &Record) -> hasync_core::Result<String> {
        let during = |e: ClientError| e.during("create dashboard");
        let Some(url_path) = Self::url_path(local_key, payload) else {
            self.save_config(None, payload).map_err(during)?;
            return Ok(DEFAULT_DASHBOARD.to_string());
        };
        let mut fields = registry_fields(local_key, payload);
        fields.insert("url_path".into(), Value::String(url_path.clone()));
        fields.insert("mode".into(), Value::String("storage".into()));
        let created = self
            .client
            .ws("lovelace/dashboards/create", Value::Object(fields))
            .map_err(during)?;
        if let Some(id) = created.get("id").and_then(Value::as_str) {
            self.ids.insert(url_path.clone(), id.to_string());
        }
        self.save_config(Some(&url_path), payload).map_err(during)?;
        info!(url_path = %url_path, "created dashboard");
        Ok(dir_name_from_url_path(Some(&url_path)))
    }

    fn update(&mut self, key: &str, payload: &Record) -> hasync_core::Result<()> {
        let during = |e: ClientError| e.during("update dashboard");
        let Some(url_path) = Self::url_path(key, payload) else {
            return self.save_config(None, payload).map_err(during);
        };
        let id = self.dashboard_id(&url_path).map_err(during)?;
        let mut fields = registry_fields(key, payload);
        fields.insert("dashboard_id".into(), Value::String(id));
        self.client
            .ws("lovelace/dashboards/update", Value::Object(fields))
            .map_err(during)?;
        self.save_config(Some(&url_path), payload).map_err(during)?;
        info!(url_path = %url_path, "updated dashboard");
        Ok(())
    }

    fn delete(&mut self, key: &str) -> hasync_core::Result<()> {
        let during = |e: ClientError| e.during("delete dashboard");
        match url_path_from_dir_name(key) {
            None => {
                self.client
                    .ws("lovelace/config/delete", json!({"url_path": null}))
                    .map_err(during)?;
            }
            Some(url_path) => {
                let id = self.dashboard_id(&url_path).map_err(during)?;
                self.client
                    .ws("lovelace/dashboards/delete", json!({"dashboard_id": id}))
                    .map_err(during)?;
                self.ids.remove(&url_path);
            }
        }
        info!(key, "deleted dashboard");
        Ok(())
    }
}
