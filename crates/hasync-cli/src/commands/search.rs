//! Search command implementation

use colored::{ColoredString, Colorize};
use hasync_client::{EntityState, StateQuery};

use crate::context::Workspace;
use crate::error::Result;

/// Run the search command
pub fn run_search(workspace: &Workspace, query: &str, domain: Option<&str>, state: Option<&str>) -> Result<bool> {
    let mut filter = StateQuery::new(query)?;
    if let Some(domain) = domain {
        filter = filter.in_domain(domain);
    }
    if let Some(state) = state {
        filter = filter.with_state(state);
    }

    let client = workspace.connect()?;
    let found = filter.filter(client.states()?);
    if found.is_empty() {
        println!("{}", "No entities found".dimmed());
        return Ok(true);
    }
    print_table(&found);
    Ok(true)
}

fn print_table(found: &[EntityState]) {
    let id_width = found.iter().map(|s| s.entity_id.len()).max().unwrap_or(0).max("Entity ID".len());
    let state_width = found.iter().map(|s| s.state.len()).max().unwrap_or(0).max("State".len());

    println!("{}", format!("Found {} entities", found.len()).bold());
    println!(
        "{}  {}  {}",
        format!("{:<id_width$}", "Entity ID").bold(),
        format!("{:<state_width$}", "State").bold(),
        "Name".bold()
    );
    for entity in found {
        println!(
            "{}  {}  {}",
            format!("{:<id_width$}", entity.entity_id).cyan(),
            paint_state(&format!("{:<state_width$}", entity.state), &entity.state),
            entity.friendly_name().dimmed()
        );
    }
}

fn paint_state(padded: &str, state: &str) -> ColoredString {
    match state {
        "on" | "home" | "playing" | "open" => padded.green(),
        "off" | "not_home" | "idle" | "closed" | "paused" => padded.dimmed(),
        "unavailable" => padded.red(),
        _ => padded.normal(),
    }
}
