//! Crash-safe reads and writes of entity files
//!
//! A pull may rewrite hundreds of YAML files. Each one is staged next to its
//! final location and renamed into place, so an interrupted run leaves either
//! the old file or the new one, never a truncated entity.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use fs2::FileExt;

use crate::{Error, NormalizedPath, Result};

/// Hidden sibling used to stage `target`.
///
/// Dot-prefixed so entity listings skip it; pid-suffixed so two processes
/// syncing the same tree never share one.
fn staging_path(target: &Path) -> PathBuf {
    let name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    target.with_file_name(format!(".{name}.{}.tmp", std::process::id()))
}

fn stage(staging: &Path, target: &Path, content: &[u8]) -> Result<()> {
    let mut file: File = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(staging)
        .map_err(|e| Error::io(staging, e))?;
    file.lock_exclusive().map_err(|_| Error::LockFailed {
        path: target.to_path_buf(),
    })?;
    file.write_all(content).map_err(|e| Error::io(staging, e))?;
    file.sync_all().map_err(|e| Error::io(staging, e))?;
    file.unlock().map_err(|_| Error::LockFailed {
        path: target.to_path_buf(),
    })
}

/// Replace the entity file at `path` with `content`.
///
/// Parent directories (a new helper type, a new dashboard) are created as
/// needed. On failure the staging file is removed and the previous content
/// of `path`, if any, is untouched.
pub fn write_atomic(path: &NormalizedPath, content: &[u8]) -> Result<()> {
    let target = path.to_native();
    if let Some(parent) = target.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
    }

    let staging = staging_path(&target);
    let outcome = stage(&staging, &target, content)
        .and_then(|()| fs::rename(&staging, &target).map_err(|e| Error::io(&target, e)));
    if outcome.is_err() {
        let _ = fs::remove_file(&staging);
    }
    outcome
}

/// Read an entity file as UTF-8 text.
pub fn read_text(path: &NormalizedPath) -> Result<String> {
    let native = path.to_native();
    fs::read_to_string(&native).map_err(|e| Error::io(&native, e))
}

pub fn write_text(path: &NormalizedPath, content: &str) -> Result<()> {
    write_atomic(path, content.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_staging_file_is_hidden_sibling() {
        let staging = staging_path(Path::new("/ws/automations/morning.yaml"));
        assert_eq!(staging.parent(), Some(Path::new("/ws/automations")));
        let name = staging.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with(".morning.yaml."), "{name}");
        assert!(name.ends_with(".tmp"), "{name}");
    }

    #[test]
    fn test_failed_write_leaves_no_staging_file() {
        let temp = tempfile::TempDir::new().unwrap();
        // A directory where the file should go makes the final rename fail
        let target = temp.path().join("scenes/evening.yaml");
        fs::create_dir_all(target.join("occupied")).unwrap();

        let result = write_atomic(&NormalizedPath::new(&target), b"id: evening\n");

        assert!(result.is_err());
        let leftovers: Vec<_> = fs::read_dir(temp.path().join("scenes"))
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(leftovers, vec!["evening.yaml".to_string()]);
    }
}
