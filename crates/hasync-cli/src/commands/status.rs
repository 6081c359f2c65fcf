//! Status command implementation

use colored::Colorize;
use hasync_client::discover_helper_domains;
use hasync_core::known_helper_domains;

use crate::context::Workspace;
use crate::error::Result;

/// Run the status command
pub fn run_status(workspace: &Workspace) -> Result<bool> {
    let config = &workspace.config;

    println!("{}", "ha-sync Status".bold());
    println!();
    println!("{}:   {}", "Root".dimmed(), config.root);
    println!("{}:    {}", "URL".dimmed(), config.url.cyan());
    let token = if config.token.is_some() {
        "set".green()
    } else {
        "not set".yellow()
    };
    println!("{}:  {}", "Token".dimmed(), token);
    println!();

    println!("{}:", "Directories".bold());
    for dir in config.paths.all() {
        let marker = if config.root.join(dir).is_dir() {
            "+".green()
        } else {
            "-".dimmed()
        };
        println!("  {} {}/", marker, dir);
    }
    println!();

    let client = workspace.connect()?;
    let message = client.api_status()?;
    let info = client.server_info()?;
    println!("{}:", "Connection".bold());
    println!("  {} {}", "OK".green().bold(), message);
    println!("  {}: {}", "Version".dimmed(), info.version);
    println!("  {}: {}", "Location".dimmed(), info.location_name);
    println!();

    println!("{}:", "Helper domains".bold());
    let domains = discover_helper_domains(&client, &known_helper_domains(config))?;
    if domains.is_empty() {
        println!("  {}", "None".dimmed());
    } else {
        for domain in &domains {
            println!("  {} {}", "+".green(), domain.cyan());
        }
    }
    Ok(true)
}
