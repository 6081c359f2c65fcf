//! Configuration resolution
//!
//! Values come from, in increasing priority: built-in defaults, an optional
//! `ha-sync.toml` at the workspace root, a `.env` file at the root, and the
//! process environment.

use std::collections::HashMap;
use std::path::Path;

use hasync_fs::NormalizedPath;
use serde::Deserialize;

use crate::{Error, Result};

/// Name of the optional settings file at the workspace root.
pub const CONFIG_FILE: &str = "ha-sync.toml";

/// Name of the env file holding the connection settings.
pub const ENV_FILE: &str = ".env";

pub const DEFAULT_URL: &str = "http://homeassistant.local:8123";

/// Top-level directory of each entity family, relative to the root.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Paths {
    pub automations: String,
    pub scripts: String,
    pub scenes: String,
    pub helpers: String,
    pub dashboards: String,
}

impl Default for Paths {
    fn default() -> Self {
        Self {
            automations: "automations".into(),
            scripts: "scripts".into(),
            scenes: "scenes".into(),
            helpers: "helpers".into(),
            dashboards: "dashboards".into(),
        }
    }
}

impl Paths {
    pub fn all(&self) -> [&str; 5] {
        [
            &self.automations,
            &self.scripts,
            &self.scenes,
            &self.helpers,
            &self.dashboards,
        ]
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileConfig {
    url: Option<String>,
    paths: Paths,
    helpers: HelperSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct HelperSection {
    domains: Vec<String>,
}

/// Resolved settings for one invocation.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub root: NormalizedPath,
    pub url: String,
    pub token: Option<String>,
    pub paths: Paths,
    /// Config-entry helper domains to manage beyond the built-in list.
    pub extra_domains: Vec<String>,
}

impl SyncConfig {
    /// Defaults rooted at `root`, ignoring every file and the environment.
    pub fn new(root: impl Into<NormalizedPath>) -> Self {
        Self {
            root: root.into(),
            url: DEFAULT_URL.into(),
            token: None,
            paths: Paths::default(),
            extra_domains: Vec::new(),
        }
    }

    /// Resolve settings for the workspace at `root`.
    pub fn load(root: &Path) -> Result<Self> {
        Self::load_with(root, |key| std::env::var(key).ok())
    }

    /// Like [`load`](Self::load) with an explicit environment lookup.
    pub fn load_with(root: &Path, env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let root = NormalizedPath::new(root);
        let mut config = Self::new(root.clone());

        let file_path = root.join(CONFIG_FILE);
        if file_path.is_file() {
            let text = hasync_fs::io::read_text(&file_path)?;
            let file: FileConfig = toml::from_str(&text)
                .map_err(|e| Error::config(format!("{CONFIG_FILE}: {e}")))?;
            if let Some(url) = file.url {
                config.url = url;
            }
            config.paths = file.paths;
            config.extra_domains = file.helpers.domains;
        }

        let dotenv = read_env_file(&root.join(ENV_FILE))?;
        let lookup = |key: &str| env(key).or_else(|| dotenv.get(key).cloned());

        if let Some(url) = lookup("HA_URL").filter(|v| !v.trim().is_empty()) {
            config.url = url;
        }
        config.token = lookup("HA_TOKEN").filter(|v| !v.trim().is_empty());
        config.url = config.url.trim_end_matches('/').to_string();

        tracing::debug!(root = %config.root, url = %config.url, "configuration resolved");
        Ok(config)
    }

    /// The access token, or a configuration error naming where to set it.
    pub fn require_token(&self) -> Result<&str> {
        self.token.as_deref().ok_or_else(|| {
            Error::config(format!(
                "HA_TOKEN is not set; add it to {} or the environment",
                self.root.join(ENV_FILE)
            ))
        })
    }

    pub fn automations_dir(&self) -> NormalizedPath {
        self.root.join(&self.paths.automations)
    }

    pub fn scripts_dir(&self) -> NormalizedPath {
        self.root.join(&self.paths.scripts)
    }

    pub fn scenes_dir(&self) -> NormalizedPath {
        self.root.join(&self.paths.scenes)
    }

    pub fn helpers_dir(&self) -> NormalizedPath {
        self.root.join(&self.paths.helpers)
    }

    pub fn dashboards_dir(&self) -> NormalizedPath {
        self.root.join(&self.paths.dashboards)
    }
}

fn read_env_file(path: &NormalizedPath) -> Result<HashMap<String, String>> {
    if !path.is_file() {
        return Ok(HashMap::new());
    }
    let iter = dotenvy::from_path_iter(path.to_native())
        .map_err(|e| Error::config(format!("{path}: {e}")))?;
    iter.map(|item| item.map_err(|e| Error::config(format!("{path}: {e}"))))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_defaults_without_files() {
        let temp = TempDir::new().unwrap();
        let config = SyncConfig::load_with(temp.path(), no_env).unwrap();
        assert_eq!(config.url, DEFAULT_URL);
        assert!(config.token.is_none());
        assert_eq!(config.paths, Paths::default());
        assert!(config.require_token().is_err());
    }

    #[test]
    fn test_env_file_is_read() {
        let temp = TempDir::new().unwrap();
        fs::write(
            temp.path().join(".env"),
            "HA_URL=http://ha.lan:8123/\nHA_TOKEN=secret\n",
        )
        .unwrap();
        let config = SyncConfig::load_with(temp.path(), no_env).unwrap();
        assert_eq!(config.url, "http://ha.lan:8123");
        assert_eq!(config.require_token().unwrap(), "secret");
    }

    #[test]
    fn test_process_env_wins_over_env_file() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join(".env"), "HA_TOKEN=from-file\n").unwrap();
        let config = SyncConfig::load_with(temp.path(), |key| {
            (key == "HA_TOKEN").then(|| "from-env".to_string())
        })
        .unwrap();
        assert_eq!(config.token.as_deref(), Some("from-env"));
    }

    #[test]
    fn test_toml_overrides_paths_and_domains() {
        let temp = TempDir::new().unwrap();
        fs::write(
            temp.path().join(CONFIG_FILE),
            "url = \"http://10.0.0.2:8123\"\n[paths]\nautomations = \"auto\"\n[helpers]\ndomains = [\"history_stats\"]\n",
        )
        .unwrap();
        let config = SyncConfig::load_with(temp.path(), no_env).unwrap();
        assert_eq!(config.url, "http://10.0.0.2:8123");
        assert_eq!(config.paths.automations, "auto");
        assert_eq!(config.paths.scripts, "scripts");
        assert_eq!(config.extra_domains, vec!["history_stats".to_string()]);
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join(CONFIG_FILE), "url = [").unwrap();
        let err = SyncConfig::load_with(temp.path(), no_env).unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }
}
