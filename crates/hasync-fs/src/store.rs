//! Local entity store backed by a directory tree

use std::fs;

use tracing::debug;

use crate::naming::is_entity_file;
use crate::yaml::{self, Document};
use crate::{Error, NormalizedPath, Result};

/// File operations over the local configuration tree.
///
/// All paths handed out are absolute (rooted at `root`); kinds keep them as
/// entity locations and pass them back for writes, deletes and renames.
#[derive(Debug, Clone)]
pub struct LocalStore {
    root: NormalizedPath,
}

impl LocalStore {
    pub fn new(root: impl Into<NormalizedPath>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &NormalizedPath {
        &self.root
    }

    /// Resolve a path relative to the store root.
    pub fn resolve(&self, relative: &str) -> NormalizedPath {
        self.root.join(relative)
    }

    /// Entity files directly inside `dir`, sorted by filename.
    ///
    /// A missing directory has no entities.
    pub fn entity_files(&self, dir: &NormalizedPath) -> Result<Vec<NormalizedPath>> {
        let mut files: Vec<NormalizedPath> = self
            .entries(dir)?
            .into_iter()
            .filter(|(name, is_dir)| !is_dir && is_entity_file(name))
            .map(|(name, _)| dir.join(&name))
            .collect();
        files.sort();
        Ok(files)
    }

    /// Subdirectory names of `dir`, sorted. Hidden directories are skipped.
    pub fn subdirs(&self, dir: &NormalizedPath) -> Result<Vec<String>> {
        let mut names: Vec<String> = self
            .entries(dir)?
            .into_iter()
            .filter(|(name, is_dir)| *is_dir && !name.starts_with('.'))
            .map(|(name, _)| name)
            .collect();
        names.sort();
        Ok(names)
    }

    /// Read every entity file in `dir`.
    pub fn list(&self, dir: &NormalizedPath) -> Result<Vec<(NormalizedPath, Document)>> {
        self.entity_files(dir)?
            .into_iter()
            .map(|path| {
                let doc = yaml::read_document(&path)?;
                Ok((path, doc))
            })
            .collect()
    }

    pub fn read(&self, path: &NormalizedPath) -> Result<Document> {
        yaml::read_document(path)
    }

    /// Write a document, creating parent directories as needed.
    pub fn write(&self, path: &NormalizedPath, doc: &Document) -> Result<()> {
        debug!(path = %path, "writing entity file");
        yaml::write_document(path, doc)
    }

    /// Delete a file. Deleting a missing file is not an error.
    pub fn delete(&self, path: &NormalizedPath) -> Result<()> {
        if !path.exists() {
            return Ok(());
        }
        debug!(path = %path, "deleting entity file");
        let native = path.to_native();
        if native.is_dir() {
            fs::remove_dir_all(&native).map_err(|e| Error::io(&native, e))
        } else {
            fs::remove_file(&native).map_err(|e| Error::io(&native, e))
        }
    }

    /// Rename a file or directory, creating the target's parent.
    ///
    /// An existing target is never replaced.
    pub fn rename(&self, from: &NormalizedPath, to: &NormalizedPath) -> Result<()> {
        if from == to {
            return Ok(());
        }
        if to.exists() {
            return Err(Error::TargetExists { path: to.to_native() });
        }
        if let Some(parent) = to.parent() {
            let native = parent.to_native();
            fs::create_dir_all(&native).map_err(|e| Error::io(&native, e))?;
        }
        debug!(from = %from, to = %to, "renaming entity file");
        fs::rename(from.to_native(), to.to_native()).map_err(|e| Error::io(from.to_native(), e))
    }

    pub fn create_dir(&self, dir: &NormalizedPath) -> Result<()> {
        let native = dir.to_native();
        fs::create_dir_all(&native).map_err(|e| Error::io(&native, e))
    }

    fn entries(&self, dir: &NormalizedPath) -> Result<Vec<(String, bool)>> {
        let native = dir.to_native();
        if !native.is_dir() {
            return Ok(Vec::new());
        }
        let read = fs::read_dir(&native).map_err(|e| Error::io(&native, e))?;
        let mut out = Vec::new();
        for entry in read {
            let entry = entry.map_err(|e| Error::io(&native, e))?;
            let is_dir = entry.path().is_dir();
            out.push((entry.file_name().to_string_lossy().into_owned(), is_dir));
        }
        Ok(out)
    }
}
