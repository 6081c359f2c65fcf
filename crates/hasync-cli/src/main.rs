//! ha-sync CLI
//!
//! Keeps Home Assistant automations, scripts, scenes, helpers and dashboards
//! in a directory of YAML files.

mod cli;
mod commands;
mod context;
mod error;

use clap::Parser;
use colored::Colorize;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};
use context::Workspace;
use error::Result;

fn main() {
    match run() {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            std::process::exit(1);
        }
    }
}

fn run() -> Result<bool> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
    tracing::debug!("Verbose mode enabled");

    if cli.command == Commands::Version {
        return commands::run_version();
    }
    let workspace = Workspace::load(cli.root.as_deref())?;
    execute_command(&workspace, cli.command)
}

fn execute_command(workspace: &Workspace, cmd: Commands) -> Result<bool> {
    match cmd {
        Commands::Init => commands::run_init(workspace),
        Commands::Status => commands::run_status(workspace),
        Commands::Validate {
            path,
            check_templates,
            json,
        } => commands::run_validate(workspace, path.as_deref(), check_templates, json),
        Commands::Pull {
            path,
            sync_deletions,
            dry_run,
        } => commands::run_pull(workspace, path.as_deref(), sync_deletions, dry_run),
        Commands::Push {
            path,
            force,
            sync_deletions,
            dry_run,
        } => commands::run_push(workspace, path.as_deref(), force, sync_deletions, dry_run),
        Commands::Diff { path, json } => commands::run_diff(workspace, path.as_deref(), json),
        Commands::Template { template } => commands::run_template(workspace, &template),
        Commands::State { entity } => commands::run_state(workspace, &entity),
        Commands::Search { query, domain, state } => {
            commands::run_search(workspace, &query, domain.as_deref(), state.as_deref())
        }
        Commands::Version => commands::run_version(),
    }
}
