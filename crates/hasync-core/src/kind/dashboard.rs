//! Dashboards split into a metadata file and one file per view

use std::collections::HashSet;

use hasync_fs::{LocalStore, NormalizedPath, filename_from_id, slugify};
use hasync_meta::{Record, catalog, ensure_leading, normalize_schemaless, strip_bookkeeping};
use serde_json::Value;
use tracing::debug;

use super::{EntityKind, LocalCheck, LocalEntity};
use crate::remote::RemoteStore;
use crate::{Error, Result};

/// File holding the dashboard registry fields and non-view config keys.
pub const META_FILE: &str = "_meta.yaml";

/// Directory of the default dashboard, which has no url path.
pub const DEFAULT_DASHBOARD: &str = "lovelace";

const URL_PREFIX: &str = "dashboard-";
const POSITION: &str = "position";
const UNPOSITIONED: i64 = 999;

/// Local directory name for a dashboard url path.
pub fn dir_name_from_url_path(url_path: Option<&str>) -> String {
    match url_path {
        None | Some("") => DEFAULT_DASHBOARD.to_string(),
        Some(path) => path.strip_prefix(URL_PREFIX).unwrap_or(path).to_string(),
    }
}

/// Default url path for a dashboard directory.
pub fn url_path_from_dir_name(dir: &str) -> Option<String> {
    (dir != DEFAULT_DASHBOARD).then(|| format!("{URL_PREFIX}{dir}"))
}

/// Filename for the view at zero-based `index`.
fn view_filename(index: usize, view: &Record) -> String {
    let label = ["path", "title"]
        .iter()
        .filter_map(|field| view.get(*field).and_then(Value::as_str))
        .map(slugify)
        .find(|slug| !slug.is_empty())
        .unwrap_or_else(|| "view".to_string());
    format!("{:02}_{label}.yaml", index + 1)
}

pub struct DashboardKind {
    root: NormalizedPath,
    store: LocalStore,
    remote: Box<dyn RemoteStore>,
}

impl DashboardKind {
    pub fn new(root: NormalizedPath, remote: Box<dyn RemoteStore>) -> Self {
        Self {
            store: LocalStore::new(root.clone()),
            root,
            remote,
        }
    }

    /// View files of the dashboard in `dir` as stored, ordered for display.
    fn stored_views(&self, dir: &NormalizedPath) -> Result<Vec<(NormalizedPath, Record)>> {
        let mut views = self.store.list(dir)?;
        views.sort_by(|(a_path, a), (b_path, b)| {
            let pos = |r: &Record| r.get(POSITION).and_then(Value::as_i64).unwrap_or(UNPOSITIONED);
            pos(a).cmp(&pos(b)).then_with(|| a_path.cmp(b_path))
        });
        Ok(views)
    }

    /// Views of the dashboard in `dir` with bookkeeping removed.
    fn read_views(&self, dir: &NormalizedPath) -> Result<Vec<(NormalizedPath, Record)>> {
        Ok(self
            .stored_views(dir)?
            .into_iter()
            .map(|(path, mut view)| {
                strip_bookkeeping(&mut view);
                view.remove(POSITION);
                (path, view)
            })
            .collect())
    }

    fn read_dashboard(&self, dir: &NormalizedPath) -> Result<Record> {
        let meta_path = dir.join(META_FILE);
        let mut record = if meta_path.is_file() {
            self.store.read(&meta_path)?
        } else {
            Record::new()
        };
        strip_bookkeeping(&mut record);

        let mut config = match record.remove("config") {
            Some(Value::Object(config)) => config,
            None | Some(Value::Null) => Record::new(),
            Some(_) => {
                return Err(Error::consistency(
                    meta_path.as_str(),
                    "config must be a mapping",
                ));
            }
        };
        let views: Vec<Value> = self
            .read_views(dir)?
            .into_iter()
            .map(|(_, view)| Value::Object(view))
            .collect();
        if !views.is_empty() {
            config.insert("views".into(), Value::Array(views));
        }
        if !config.is_empty() {
            record.insert("config".into(), Value::Object(config));
        }
        Ok(record)
    }

    fn normalize_config(&self, key: &str, config: Option<&Value>) -> Result<Record> {
        let mut config = match config {
            Some(Value::Object(config)) => config.clone(),
            None | Some(Value::Null) => return Ok(Record::new()),
            Some(_) => return Err(Error::consistency(key, "config must be a mapping")),
        };
        let views = config.remove("views");
        let mut out = normalize_schemaless(&config);
        match views {
            Some(Value::Array(list)) if !list.is_empty() => {
                let mut normalized = Vec::with_capacity(list.len());
                for view in list {
                    let Value::Object(mut view) = view else {
                        return Err(Error::consistency(key, "every view must be a mapping"));
                    };
                    view.remove(POSITION);
                    normalized.push(Value::Object(catalog::view().normalize_record(&view)?));
                }
                out.insert("views".into(), Value::Array(normalized));
            }
            Some(Value::Array(_)) | Some(Value::Null) | None => {}
            Some(_) => return Err(Error::consistency(key, "views must be a list")),
        }
        Ok(out)
    }

    fn key_for(&self, dir_name: &str, record: &Record) -> String {
        match record.get("url_path").and_then(Value::as_str) {
            Some(url_path) => dir_name_from_url_path(Some(url_path)),
            None => dir_name.to_string(),
        }
    }

    /// Write views as numbered files and remove any view file not rewritten.
    fn write_views(&self, dir: &NormalizedPath, views: &[Value]) -> Result<()> {
        let mut written = HashSet::new();
        for (index, view) in views.iter().enumerate() {
            let Value::Object(view) = view else {
                return Err(Error::consistency(dir.as_str(), "every view must be a mapping"));
            };
            let path = dir.join(&view_filename(index, view));
            let position = Value::from(index as i64 + 1);
            self.store.write(&path, &ensure_leading(view, POSITION, position))?;
            written.insert(path);
        }
        for stale in self.store.entity_files(dir)? {
            if !written.contains(&stale) {
                self.store.delete(&stale)?;
            }
        }
        Ok(())
    }

    /// Whether the view files in `dir` are named after their order.
    fn views_in_order(&self, dir: &NormalizedPath) -> Result<bool> {
        Ok(self
            .stored_views(dir)?
            .iter()
            .enumerate()
            .all(|(index, (path, view))| {
                view.get(POSITION).and_then(Value::as_i64) == Some(index as i64 + 1)
                    && path.file_name() == Some(view_filename(index, view).as_str())
            }))
    }
}

impl EntityKind for DashboardKind {
    fn name(&self) -> &str {
        "dashboards"
    }

    fn root(&self) -> &NormalizedPath {
        &self.root
    }

    fn list_local(&self) -> Result<Vec<LocalEntity>> {
        let mut entities = Vec::new();
        for dir_name in self.store.subdirs(&self.root)? {
            let location = self.root.join(&dir_name);
            let record = self.read_dashboard(&location)?;
            entities.push(LocalEntity {
                key: self.key_for(&dir_name, &record),
                filename_key: Some(dir_name),
                location,
                record,
            });
        }
        debug!(count = entities.len(), "listed local dashboards");
        Ok(entities)
    }

    fn list_remote(&mut self) -> Result<Vec<(String, Record)>> {
        self.remote.list()
    }

    fn normalize(&self, key: &str, record: &Record) -> Result<Record> {
        let mut meta = record.clone();
        let config = meta.remove("config");
        if !meta.contains_key("url_path")
            && let Some(url_path) = url_path_from_dir_name(key)
        {
            meta.insert("url_path".into(), Value::String(url_path));
        }
        let mut out = catalog::dashboard_meta().normalize_record(&meta)?;
        let config = self.normalize_config(key, config.as_ref())?;
        if !config.is_empty() {
            out.insert("config".into(), Value::Object(config));
        }
        Ok(out)
    }

    fn location_for(
        &self,
        key: &str,
        _record: &Record,
        _used: &HashSet<NormalizedPath>,
    ) -> Result<NormalizedPath> {
        filename_from_id(key)?;
        Ok(self.root.join(key))
    }

    fn write_local(&self, location: &NormalizedPath, record: &Record) -> Result<()> {
        let mut meta = record.clone();
        let mut config = match meta.remove("config") {
            Some(Value::Object(config)) => config,
            _ => Record::new(),
        };
        let views = match config.remove("views") {
            Some(Value::Array(views)) => views,
            _ => Vec::new(),
        };
        if !config.is_empty() {
            meta.insert("config".into(), Value::Object(config));
        }
        self.store.write(&location.join(META_FILE), &meta)?;
        self.write_views(location, &views)
    }

    fn delete_local(&self, location: &NormalizedPath) -> Result<()> {
        Ok(self.store.delete(location)?)
    }

    fn move_local(&self, from: &NormalizedPath, to: &NormalizedPath) -> Result<()> {
        Ok(self.store.rename(from, to)?)
    }

    fn rekey(&self, key: &str, record: &Record) -> Record {
        let mut out = record.clone();
        match url_path_from_dir_name(key) {
            Some(url_path) => {
                let current = out.get("url_path").and_then(Value::as_str);
                if current.map(|p| dir_name_from_url_path(Some(p))) != Some(key.to_string()) {
                    out.insert("url_path".into(), Value::String(url_path));
                }
            }
            None => {
                out.remove("url_path");
            }
        }
        out
    }

    fn payload(&self, key: &str, record: &Record) -> Record {
        let mut payload = record.clone();
        if !payload.contains_key("url_path")
            && let Some(url_path) = url_path_from_dir_name(key)
        {
            payload.insert("url_path".into(), Value::String(url_path));
        }
        payload
    }

    fn remote(&mut self) -> &mut dyn RemoteStore {
        self.remote.as_mut()
    }

    fn after_push(&self) -> Result<()> {
        for dir_name in self.store.subdirs(&self.root)? {
            let dir = self.root.join(&dir_name);
            if self.views_in_order(&dir)? {
                continue;
            }
            let views: Vec<Value> = self
                .read_views(&dir)?
                .into_iter()
                .map(|(_, view)| Value::Object(view))
                .collect();
            debug!(dashboard = %dir_name, views = views.len(), "renumbering view files");
            self.write_views(&dir, &views)?;
        }
        Ok(())
    }

    fn local_files(&self) -> Result<Vec<NormalizedPath>> {
        let mut files = Vec::new();
        for dir_name in self.store.subdirs(&self.root)? {
            let dir = self.root.join(&dir_name);
            let meta = dir.join(META_FILE);
            if meta.is_file() {
                files.push(meta);
            }
            files.extend(self.store.entity_files(&dir)?);
        }
        Ok(files)
    }

    fn check_local(&self, location: &NormalizedPath, record: &Record) -> LocalCheck {
        let mut check = LocalCheck::default();
        let mut record = record.clone();
        strip_bookkeeping(&mut record);
        let result = if location.file_name() == Some(META_FILE) {
            match record.remove("config") {
                None | Some(Value::Null) | Some(Value::Object(_)) => {}
                Some(_) => check.errors.push("config must be a mapping".to_string()),
            }
            catalog::dashboard_meta().normalize(&record).map(|_| ())
        } else {
            record.remove(POSITION);
            catalog::view().normalize(&record).map(|_| ())
        };
        if let Err(e) = result {
            check.errors.push(e.to_string());
        }
        check
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(None, "lovelace")]
    #[case(Some("dashboard-energy"), "energy")]
    #[case(Some("wall-panel"), "wall-panel")]
    fn test_dir_name_from_url_path(#[case] url_path: Option<&str>, #[case] expected: &str) {
        assert_eq!(dir_name_from_url_path(url_path), expected);
    }

    #[test]
    fn test_url_path_from_dir_name() {
        assert_eq!(url_path_from_dir_name("lovelace"), None);
        assert_eq!(url_path_from_dir_name("energy").as_deref(), Some("dashboard-energy"));
    }

    #[test]
    fn test_view_filename_prefers_path_then_title() {
        let view = |v: Value| v.as_object().cloned().unwrap();
        assert_eq!(
            view_filename(0, &view(serde_json::json!({"path": "home", "title": "Main"}))),
            "01_home.yaml"
        );
        assert_eq!(
            view_filename(1, &view(serde_json::json!({"title": "Living Room"}))),
            "02_living_room.yaml"
        );
        assert_eq!(view_filename(11, &view(serde_json::json!({}))), "12_view.yaml");
    }
}
