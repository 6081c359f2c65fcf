//! [`TestWorkspace`]: a scratch directory laid out like a synced tree.

use std::fs;
use std::path::{Path, PathBuf};

use hasync_core::SyncConfig;
use hasync_meta::Record;
use tempfile::TempDir;

/// A temporary workspace root with helpers for setup and assertions.
///
/// # Example
///
/// ```rust,no_run
/// use hasync_test_utils::TestWorkspace;
///
/// let ws = TestWorkspace::new();
/// ws.write("automations/morning.yaml", "id: morning\nalias: Morning\n");
/// ws.assert_file_exists("automations/morning.yaml");
/// ```
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl Default for TestWorkspace {
    fn default() -> Self {
        Self::new()
    }
}

impl TestWorkspace {
    pub fn new() -> Self {
        Self {
            temp_dir: TempDir::new().unwrap(),
        }
    }

    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn path(&self, relative: &str) -> PathBuf {
        self.root().join(relative)
    }

    /// Default configuration rooted here.
    pub fn config(&self) -> SyncConfig {
        SyncConfig::new(self.root())
    }

    /// Write `content` to `relative`, creating parent directories.
    pub fn write(&self, relative: &str, content: &str) {
        let path = self.path(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, content).unwrap();
    }

    pub fn read(&self, relative: &str) -> String {
        let path = self.path(relative);
        fs::read_to_string(&path).unwrap_or_else(|_| panic!("Could not read file: {}", path.display()))
    }

    /// Parse the YAML file at `relative` into a record.
    pub fn read_record(&self, relative: &str) -> Record {
        serde_yaml::from_str(&self.read(relative)).unwrap()
    }

    /// Sorted file names directly inside `relative`.
    pub fn files(&self, relative: &str) -> Vec<String> {
        let Ok(entries) = fs::read_dir(self.path(relative)) else {
            return Vec::new();
        };
        let mut names: Vec<String> = entries
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    /// # Panics
    /// Panics with a descriptive message if the path does not exist.
    pub fn assert_file_exists(&self, relative: &str) {
        let path = self.path(relative);
        assert!(path.exists(), "Expected file to exist: {}", path.display());
    }

    /// # Panics
    /// Panics with a descriptive message if the path exists.
    pub fn assert_file_not_exists(&self, relative: &str) {
        let path = self.path(relative);
        assert!(!path.exists(), "Expected file NOT to exist: {}", path.display());
    }

    /// # Panics
    /// Panics if the file cannot be read or does not contain `content`.
    pub fn assert_file_contains(&self, relative: &str, content: &str) {
        let text = self.read(relative);
        assert!(
            text.contains(content),
            "File {relative} does not contain expected content.\nExpected: {content}\nActual: {text}"
        );
    }
}
