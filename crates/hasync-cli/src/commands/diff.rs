//! Diff command implementation
//!
//! Shows what a push would change, with a YAML diff of every modified entity.

use colored::Colorize;
use hasync_client::remote_for;
use hasync_core::{DiffItem, DiffStatus, Scope, SyncEngine, build_kind};
use hasync_fs::{NormalizedPath, yaml};
use hasync_meta::Record;
use serde_json::json;
use similar::TextDiff;

use crate::context::Workspace;
use crate::error::Result;

/// Run the diff command
pub fn run_diff(workspace: &Workspace, path: Option<&str>, json: bool) -> Result<bool> {
    let client = workspace.connect()?;
    let domains = workspace.domains(&client);
    let selections = workspace.selections(path, &domains)?;

    let mut sections: Vec<(String, Vec<DiffItem>)> = Vec::new();
    let mut errors: Vec<(String, String)> = Vec::new();
    for selection in selections {
        let mut kind = build_kind(&selection.kind, &workspace.config, remote_for(&selection.kind, &client));
        let scope = Scope::from_filter(selection.filter);
        let outcome = SyncEngine::new(kind.as_mut()).diff(&scope);
        match outcome {
            Ok(items) => sections.push((kind.name().to_string(), items)),
            Err(e) => errors.push((kind.name().to_string(), e.to_string())),
        }
    }

    if json {
        let output = json!({
            "has_changes": sections.iter().any(|(_, items)| !items.is_empty()),
            "kinds": sections
                .iter()
                .filter(|(_, items)| !items.is_empty())
                .map(|(kind, items)| json!({"kind": kind, "items": items}))
                .collect::<Vec<_>>(),
            "errors": errors
                .iter()
                .map(|(kind, message)| json!({"kind": kind, "message": message}))
                .collect::<Vec<_>>(),
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        print_diff_output(workspace, &sections, &errors)?;
    }
    Ok(errors.is_empty())
}

fn print_diff_output(
    workspace: &Workspace,
    sections: &[(String, Vec<DiffItem>)],
    errors: &[(String, String)],
) -> Result<()> {
    if sections.iter().all(|(_, items)| items.is_empty()) && errors.is_empty() {
        println!("{} No differences.", "OK".green().bold());
        return Ok(());
    }

    for (kind, items) in sections.iter().filter(|(_, items)| !items.is_empty()) {
        println!("{} {}", "Diff".blue().bold(), kind.bold());
        for item in items {
            print_item(workspace, item)?;
        }
        println!();
    }

    if !errors.is_empty() {
        println!("{}", "Errors:".red().bold());
        for (kind, message) in errors {
            println!("  {} {}: {}", "!".red(), kind, message);
        }
    }
    Ok(())
}

fn print_item(workspace: &Workspace, item: &DiffItem) -> Result<()> {
    let label = match &item.path {
        Some(path) => workspace.display(path),
        None => item.key.clone(),
    };
    let status = item.status.to_string();
    let status = match item.status {
        DiffStatus::Added => status.green(),
        DiffStatus::Modified => status.yellow(),
        DiffStatus::Deleted => status.red(),
        DiffStatus::Renamed => status.blue(),
    };
    match (&item.status, &item.new_key) {
        (DiffStatus::Renamed, Some(new_key)) => println!("  {status} {} -> {new_key}", item.key),
        _ => println!("  {status} {label}"),
    }

    match (&item.status, &item.local, &item.remote) {
        (DiffStatus::Modified | DiffStatus::Renamed, Some(local), Some(remote)) => {
            for line in unified_yaml_diff(remote, local)?.lines() {
                let line = if line.starts_with("+++") || line.starts_with("---") {
                    line.dimmed()
                } else if line.starts_with("@@") {
                    line.cyan()
                } else if line.starts_with('+') {
                    line.green()
                } else if line.starts_with('-') {
                    line.red()
                } else {
                    line.dimmed()
                };
                println!("    {line}");
            }
        }
        (DiffStatus::Added, Some(local), _) => {
            for line in render(local)?.lines() {
                println!("    {}", format!("+{line}").green());
            }
        }
        (DiffStatus::Deleted, _, Some(remote)) => {
            for line in render(remote)?.lines() {
                println!("    {}", format!("-{line}").red());
            }
        }
        _ => {}
    }
    Ok(())
}

fn render(record: &Record) -> Result<String> {
    Ok(yaml::render_document(record, &NormalizedPath::new("<diff>"))?)
}

/// Unified diff from the remote rendering to the local one.
pub fn unified_yaml_diff(remote: &Record, local: &Record) -> Result<String> {
    let remote = render(remote)?;
    let local = render(local)?;
    Ok(TextDiff::from_lines(&remote, &local)
        .unified_diff()
        .context_radius(3)
        .header("remote", "local")
        .to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn record(value: Value) -> Record {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_unified_diff_from_remote_to_local() {
        let remote = record(json!({"id": "a", "alias": "Old"}));
        let local = record(json!({"id": "a", "alias": "New"}));

        let diff = unified_yaml_diff(&remote, &local).unwrap();

        assert!(diff.starts_with("--- remote\n+++ local\n"), "{diff}");
        assert!(diff.contains("-alias: Old\n"), "{diff}");
        assert!(diff.contains("+alias: New\n"), "{diff}");
    }

    #[test]
    fn test_identical_records_have_empty_diff() {
        let same = record(json!({"id": "a"}));
        assert_eq!(unified_yaml_diff(&same, &same).unwrap(), "");
    }
}
