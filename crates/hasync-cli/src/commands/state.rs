//! State command implementation
//!
//! Accepts an entity id or a local entity file. Files are mapped to the
//! entity they define: the `id` field for automations, scripts, scenes and
//! input helpers, and the entity registry for config-entry helpers.

use colored::Colorize;
use hasync_client::{EntityState, HaClient};
use hasync_core::SyncConfig;
use hasync_core::kind::STORAGE_HELPER_TYPES;
use hasync_fs::NormalizedPath;
use hasync_fs::yaml::read_value;
use serde_json::Value;

use crate::context::Workspace;
use crate::error::{CliError, Result};

/// What a local file points at.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Target {
    Entity(String),
    /// A config entry; its entity comes from the registry.
    ConfigEntry(String),
}

/// Run the state command
pub fn run_state(workspace: &Workspace, entity: &str) -> Result<bool> {
    let is_file = entity.contains('/') || entity.ends_with(".yaml");
    let client = workspace.connect()?;

    let entity_id = if is_file {
        let Some(entity_id) = entity_for_file(workspace, &client, entity)? else {
            println!("{} {}", "Could not determine entity ID from file:".red(), entity);
            return Ok(false);
        };
        println!("{} {}", "File maps to entity:".dimmed(), entity_id);
        entity_id
    } else {
        entity.to_string()
    };

    match client.state(&entity_id)? {
        Some(state) => {
            print_state(&state);
            Ok(true)
        }
        None => {
            println!("{} {}", "Entity not found:".red(), entity_id);
            Ok(false)
        }
    }
}

fn entity_for_file(workspace: &Workspace, client: &HaClient, file: &str) -> Result<Option<String>> {
    let path = std::env::current_dir()?.join(file);
    let path = NormalizedPath::new(&path);
    if !path.is_file() {
        return Err(CliError::user(format!("File not found: {file}")));
    }
    let data = read_value(&path)?;
    let relative = path.relative_to(&workspace.config.root).unwrap_or(file);

    match target_for(&workspace.config, relative, &data) {
        Some(Target::Entity(entity_id)) => Ok(Some(entity_id)),
        Some(Target::ConfigEntry(entry_id)) => Ok(client.entities_for_entry(&entry_id)?.into_iter().next()),
        None => Ok(None),
    }
}

/// Map the entity file at `relative` (to the workspace root) holding `data`.
pub(crate) fn target_for(config: &SyncConfig, relative: &str, data: &Value) -> Option<Target> {
    let path = NormalizedPath::new(relative);
    let field = |name: &str| data.get(name).and_then(Value::as_str).filter(|s| !s.is_empty());
    let under = |dir: &str| path.relative_to(&NormalizedPath::new(dir)).filter(|rest| !rest.is_empty());

    if under(&config.paths.automations).is_some() {
        return field("id").map(|id| Target::Entity(format!("automation.{id}")));
    }
    if under(&config.paths.scenes).is_some() {
        return field("id").map(|id| Target::Entity(format!("scene.{id}")));
    }
    if under(&config.paths.scripts).is_some() {
        let id = field("id").or_else(|| path.stem())?;
        return Some(Target::Entity(format!("script.{id}")));
    }
    let rest = under(&config.paths.helpers)?;
    let (helper_type, _) = rest.split_once('/')?;
    if STORAGE_HELPER_TYPES.contains(&helper_type) {
        return field("id").map(|id| Target::Entity(format!("{helper_type}.{id}")));
    }
    field("entry_id").map(|entry| Target::ConfigEntry(entry.to_string()))
}

fn print_state(state: &EntityState) {
    let or_unknown = |s: &str| if s.is_empty() { "unknown".to_string() } else { s.to_string() };
    println!("{} {}", "Entity:".bold(), state.entity_id);
    println!("{} {}", "State:".bold(), or_unknown(&state.state));
    println!("{} {}", "Last Changed:".bold(), or_unknown(&state.last_changed));

    if state.attributes.is_empty() {
        return;
    }
    println!();
    println!("{}", "Attributes:".bold());
    let mut attributes: Vec<_> = state.attributes.iter().collect();
    attributes.sort_by(|a, b| a.0.cmp(b.0));
    for (key, value) in attributes {
        match value {
            Value::String(text) => println!("  {key}: {text}"),
            other => println!("  {key}: {other}"),
        }
    }
}
