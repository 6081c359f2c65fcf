//! Workspace detection and per-run wiring
//!
//! The workspace root is the nearest ancestor holding `ha-sync.toml`, so
//! commands work from any subdirectory. Without one the current directory
//! is the root.

use std::path::{Path, PathBuf};

use hasync_client::{HaClient, discover_helper_domains};
use hasync_core::config::CONFIG_FILE;
use hasync_core::{Error, RemoteStore, Selection, SyncConfig, known_helper_domains, resolve_path};
use hasync_meta::Record;
use tracing::{debug, warn};

use crate::error::{CliError, Result};

/// Walk up from `start` to the directory holding the config file.
pub fn find_root(start: &Path) -> PathBuf {
    start
        .ancestors()
        .find(|dir| dir.join(CONFIG_FILE).is_file())
        .unwrap_or(start)
        .to_path_buf()
}

pub struct Workspace {
    pub config: SyncConfig,
}

impl Workspace {
    pub fn load(root: Option<&Path>) -> Result<Self> {
        let root = match root {
            Some(root) if root.is_file() => {
                return Err(CliError::user(format!("{} is a file, not a workspace directory", root.display())));
            }
            Some(root) => root.to_path_buf(),
            None => find_root(&std::env::current_dir()?),
        };
        debug!(root = %root.display(), "workspace root");
        Ok(Self {
            config: SyncConfig::load(&root)?,
        })
    }

    pub fn connect(&self) -> Result<HaClient> {
        let token = self.config.require_token()?;
        Ok(HaClient::new(&self.config.url, token)?)
    }

    /// Known config-entry helper domains with a local directory.
    pub fn local_domains(&self) -> Vec<String> {
        let helpers = self.config.helpers_dir();
        known_helper_domains(&self.config)
            .into_iter()
            .filter(|domain| helpers.join(domain).is_dir())
            .collect()
    }

    /// Helper domains present locally or on the server.
    pub fn domains(&self, client: &HaClient) -> Vec<String> {
        let local = self.local_domains();
        let known = known_helper_domains(&self.config);
        let remote = match discover_helper_domains(client, &known) {
            Ok(remote) => remote,
            Err(e) => {
                warn!(error = %e, "could not discover helper domains; using local directories");
                return local;
            }
        };
        known
            .into_iter()
            .filter(|domain| local.contains(domain) || remote.contains(domain))
            .collect()
    }

    pub fn selections(&self, path: Option<&str>, domains: &[String]) -> Result<Vec<Selection>> {
        Ok(resolve_path(&self.config, path, domains)?)
    }

    /// Display form of `path`, relative to the root when below it.
    pub fn display(&self, path: &str) -> String {
        let root = format!("{}/", self.config.root.as_str().trim_end_matches('/'));
        path.strip_prefix(&root).unwrap_or(path).to_string()
    }
}

/// Remote for commands that only read local files.
pub struct Offline;

impl RemoteStore for Offline {
    fn list(&mut self) -> hasync_core::Result<Vec<(String, Record)>> {
        Err(Error::remote("list", "offline"))
    }

    fn create(&mut self, _local_key: &str, _payload: &Record) -> hasync_core::Result<String> {
        Err(Error::remote("create", "offline"))
    }

    fn update(&mut self, _key: &str, _payload: &Record) -> hasync_core::Result<()> {
        Err(Error::remote("update", "offline"))
    }

    fn delete(&mut self, _key: &str) -> hasync_core::Result<()> {
        Err(Error::remote("delete", "offline"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_find_root_walks_up() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join(CONFIG_FILE), "").unwrap();
        let nested = temp_dir.path().join("automations/sub");
        fs::create_dir_all(&nested).unwrap();

        assert_eq!(find_root(&nested), temp_dir.path());
    }

    #[test]
    fn test_find_root_defaults_to_start() {
        let temp_dir = TempDir::new().unwrap();
        assert_eq!(find_root(temp_dir.path()), temp_dir.path());
    }

    #[test]
    fn test_local_domains_follow_directories() {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir_all(temp_dir.path().join("helpers/threshold")).unwrap();
        fs::create_dir_all(temp_dir.path().join("helpers/input_boolean")).unwrap();
        let workspace = Workspace {
            config: SyncConfig::new(temp_dir.path()),
        };

        assert_eq!(workspace.local_domains(), vec!["threshold".to_string()]);
    }
}
