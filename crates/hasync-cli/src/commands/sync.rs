//! Pull and push command implementations

use colored::Colorize;
use hasync_client::remote_for;
use hasync_core::{PullOptions, PushOptions, Scope, SyncEngine, build_kind};

use super::report_kind;
use crate::context::Workspace;
use crate::error::Result;

/// Run the pull command
pub fn run_pull(workspace: &Workspace, path: Option<&str>, sync_deletions: bool, dry_run: bool) -> Result<bool> {
    let client = workspace.connect()?;
    let domains = workspace.domains(&client);
    let selections = workspace.selections(path, &domains)?;

    println!(
        "{} Pulling from {}{}",
        "=>".blue().bold(),
        workspace.config.url.cyan(),
        if dry_run { " (dry run)" } else { "" }
    );

    let mut clean = true;
    for selection in selections {
        let mut kind = build_kind(&selection.kind, &workspace.config, remote_for(&selection.kind, &client));
        let options = PullOptions {
            sync_deletions,
            dry_run,
            scope: Scope::from_filter(selection.filter),
        };
        let outcome = SyncEngine::new(kind.as_mut()).pull(&options);
        clean &= report_kind(
            kind.name(),
            outcome,
            &kind.unknown_types(),
            dry_run,
            "use --sync-deletions to remove local files",
        );
    }
    Ok(clean)
}

/// Run the push command
pub fn run_push(
    workspace: &Workspace,
    path: Option<&str>,
    force: bool,
    sync_deletions: bool,
    dry_run: bool,
) -> Result<bool> {
    let client = workspace.connect()?;
    let domains = workspace.domains(&client);
    let selections = workspace.selections(path, &domains)?;

    println!(
        "{} Pushing to {}{}",
        "=>".blue().bold(),
        workspace.config.url.cyan(),
        if dry_run { " (dry run)" } else { "" }
    );

    let mut clean = true;
    for selection in selections {
        let mut kind = build_kind(&selection.kind, &workspace.config, remote_for(&selection.kind, &client));
        let options = PushOptions {
            force,
            sync_deletions,
            dry_run,
            scope: Scope::from_filter(selection.filter),
        };
        let outcome = SyncEngine::new(kind.as_mut()).push(&options);
        clean &= report_kind(
            kind.name(),
            outcome,
            &kind.unknown_types(),
            dry_run,
            "use --sync-deletions to remove them remotely",
        );
    }
    Ok(clean)
}
