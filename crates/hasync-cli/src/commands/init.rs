//! Init command implementation

use colored::Colorize;
use hasync_core::config::{DEFAULT_URL, ENV_FILE};

use crate::context::Workspace;
use crate::error::Result;

/// Run the init command
pub fn run_init(workspace: &Workspace) -> Result<bool> {
    let config = &workspace.config;
    println!("{} Initializing {}", "=>".blue().bold(), config.root.as_str().cyan());

    for dir in config.paths.all() {
        let path = config.root.join(dir);
        if path.is_dir() {
            println!("  {} {}/ {}", "=".dimmed(), dir, "(exists)".dimmed());
        } else {
            std::fs::create_dir_all(path.to_native())?;
            println!("  {} {}/", "+".green(), dir);
        }
    }

    let env_path = config.root.join(ENV_FILE);
    if env_path.exists() {
        println!("  {} {} {}", "=".dimmed(), ENV_FILE, "(exists)".dimmed());
    } else {
        hasync_fs::io::write_text(&env_path, &env_template(&config.url))?;
        println!("  {} {}", "+".green(), ENV_FILE);
    }

    println!();
    println!("{}: {}", "HA_URL".dimmed(), config.url);
    if config.token.is_some() {
        println!("{}: {}", "HA_TOKEN".dimmed(), "set".green());
        println!();
        println!("Run {} to fetch the current configuration.", "ha-sync pull".cyan());
    } else {
        println!("{}: {}", "HA_TOKEN".dimmed(), "not set".yellow());
        println!();
        println!(
            "Add a long-lived access token to {} then run {}.",
            ENV_FILE.cyan(),
            "ha-sync pull".cyan()
        );
    }
    Ok(true)
}

fn env_template(url: &str) -> String {
    let url = if url.is_empty() { DEFAULT_URL } else { url };
    format!("# Home Assistant connection\nHA_URL={url}\n# Long-lived access token (Profile > Security)\nHA_TOKEN=\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_template_carries_url_and_empty_token() {
        let text = env_template("http://ha.lan:8123");
        assert!(text.contains("HA_URL=http://ha.lan:8123\n"));
        assert!(text.contains("HA_TOKEN=\n"));
    }
}
