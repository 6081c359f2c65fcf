//! CLI argument parsing using clap derive

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// ha-sync - Keep Home Assistant configuration in YAML files
#[derive(Parser, Debug)]
#[command(name = "ha-sync")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Workspace root (defaults to the nearest directory with ha-sync.toml)
    #[arg(long, global = true, env = "HA_SYNC_ROOT")]
    pub root: Option<PathBuf>,

    /// The command to run
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Create the directory layout and a .env template
    Init,

    /// Show configuration and test the connection
    Status,

    /// Check local files without changing anything
    ///
    /// Examples:
    ///   ha-sync validate                      # Everything
    ///   ha-sync validate automations/         # One kind
    ///   ha-sync validate --check-templates    # Also render templates remotely
    Validate {
        /// Path to validate (e.g. automations/, helpers/template/sensor)
        path: Option<String>,

        /// Render every template on the server
        #[arg(long)]
        check_templates: bool,

        /// Output as JSON for scripting
        #[arg(long)]
        json: bool,
    },

    /// Write remote configuration to local files
    Pull {
        /// Path to pull (e.g. automations/, dashboards/energy)
        path: Option<String>,

        /// Delete local files the remote no longer has
        #[arg(long)]
        sync_deletions: bool,

        /// Preview changes without applying them
        #[arg(long)]
        dry_run: bool,
    },

    /// Send local files to the remote
    Push {
        /// Path to push (e.g. scripts/, helpers/input_boolean)
        path: Option<String>,

        /// Write every local entity, changed or not
        #[arg(long)]
        force: bool,

        /// Delete remote entities with no local file
        #[arg(long)]
        sync_deletions: bool,

        /// Preview changes without applying them
        #[arg(long)]
        dry_run: bool,
    },

    /// Show differences between local files and the remote
    Diff {
        /// Path to compare
        path: Option<String>,

        /// Output as JSON for scripting
        #[arg(long)]
        json: bool,
    },

    /// Render a Jinja2 template on the server
    ///
    /// Examples:
    ///   ha-sync template "{{ states('sun.sun') }}"
    Template {
        /// Template text to render
        template: String,
    },

    /// Show the current state of an entity
    ///
    /// Examples:
    ///   ha-sync state light.kitchen
    ///   ha-sync state automations/morning_lights.yaml
    State {
        /// Entity id, or the path of a local entity file
        entity: String,
    },

    /// Find entities by id or friendly name
    ///
    /// Examples:
    ///   ha-sync search kitchen
    ///   ha-sync search 'light.*' --state on
    Search {
        /// Substring, or a glob when it contains * or ?
        query: String,

        /// Only entities of this domain (e.g. light, switch)
        #[arg(short, long)]
        domain: Option<String>,

        /// Only entities in this state (e.g. on, off)
        #[arg(short, long)]
        state: Option<String>,
    },

    /// Show version information
    Version,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_flags() {
        let cli = Cli::parse_from(["ha-sync", "push", "automations/", "--force", "--dry-run"]);
        assert_eq!(
            cli.command,
            Commands::Push {
                path: Some("automations/".into()),
                force: true,
                sync_deletions: false,
                dry_run: true,
            }
        );
    }

    #[test]
    fn test_global_verbose_after_subcommand() {
        let cli = Cli::parse_from(["ha-sync", "diff", "--json", "-v"]);
        assert!(cli.verbose);
        assert_eq!(cli.command, Commands::Diff { path: None, json: true });
    }

    #[test]
    fn test_search_filters() {
        let cli = Cli::parse_from(["ha-sync", "search", "light.*", "-d", "light", "--state", "on"]);
        assert_eq!(
            cli.command,
            Commands::Search {
                query: "light.*".into(),
                domain: Some("light".into()),
                state: Some("on".into()),
            }
        );
    }

    #[test]
    fn test_template_takes_one_argument() {
        let cli = Cli::parse_from(["ha-sync", "template", "{{ 1 + 1 }}"]);
        assert_eq!(
            cli.command,
            Commands::Template {
                template: "{{ 1 + 1 }}".into()
            }
        );
        assert!(Cli::try_parse_from(["ha-sync", "template"]).is_err());
    }

    #[test]
    fn test_cli_definition() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
