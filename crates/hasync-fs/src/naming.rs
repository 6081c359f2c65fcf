//! Filename derivation for entity files
//!
//! Every kind derives its storage filename through these functions, both when
//! pulling and when rewriting files after a push, so the two never disagree.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::{Error, Result};

/// Extension used for every entity file.
pub const EXTENSION: &str = "yaml";

static NON_SLUG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^a-z0-9]+").unwrap());

/// Convert a human name to a filesystem-safe slug.
///
/// `"Living Room: Lights!"` -> `"living_room_lights"`
pub fn slugify(name: &str) -> String {
    let lower = name.to_lowercase();
    NON_SLUG
        .replace_all(&lower, "_")
        .trim_matches('_')
        .to_string()
}

/// Filename for an entity whose key is chosen by the user.
///
/// Rejects ids that cannot be a single path component.
pub fn filename_from_id(id: &str) -> Result<String> {
    validate_component(id)?;
    Ok(format!("{id}.{EXTENSION}"))
}

/// Key encoded in a filename: the name without its YAML extension.
pub fn id_from_filename(filename: &str) -> String {
    filename
        .strip_suffix(".yaml")
        .or_else(|| filename.strip_suffix(".yml"))
        .unwrap_or(filename)
        .to_string()
}

/// Filename for an entity whose key is assigned by the remote.
///
/// Uses the slug of `name`; when that filename is already in `used` (or the
/// slug is empty) the key is appended so two entities never share a file.
pub fn filename_from_name(name: &str, key: &str, used: &HashSet<String>) -> Result<String> {
    let slug = slugify(name);
    let candidate = if slug.is_empty() {
        key.to_string()
    } else {
        slug.clone()
    };
    let filename = format!("{candidate}.{EXTENSION}");
    if !slug.is_empty() && !used.contains(&filename) {
        return Ok(filename);
    }
    let fallback = if slug.is_empty() {
        key.to_string()
    } else {
        format!("{slug}-{key}")
    };
    validate_component(&fallback)?;
    Ok(format!("{fallback}.{EXTENSION}"))
}

/// Whether a filename looks like an entity file.
pub fn is_entity_file(filename: &str) -> bool {
    !filename.starts_with('.')
        && !filename.starts_with('_')
        && (filename.ends_with(".yaml") || filename.ends_with(".yml"))
}

fn validate_component(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::invalid_filename(name, "empty identifier"));
    }
    if name.contains('/') || name.contains('\\') {
        return Err(Error::invalid_filename(name, "contains a path separator"));
    }
    if name.starts_with('.') {
        return Err(Error::invalid_filename(name, "starts with '.'"));
    }
    if name.chars().any(char::is_control) {
        return Err(Error::invalid_filename(name, "contains control characters"));
    }
    Ok(())
}
