//! Command implementations for hasync-cli
//!
//! Every command returns whether it finished without recorded errors; the
//! binary exits non-zero otherwise.

pub mod diff;
pub mod init;
pub mod search;
pub mod state;
pub mod status;
pub mod sync;
pub mod template;
pub mod validate;
pub mod version;

pub use diff::run_diff;
pub use init::run_init;
pub use search::run_search;
pub use state::run_state;
pub use status::run_status;
pub use sync::{run_pull, run_push};
pub use template::run_template;
pub use validate::run_validate;
pub use version::run_version;

use colored::Colorize;
use hasync_core::SyncResult;

/// Print one kind's outcome and return whether it was error-free.
///
/// An `Err` means the kind could not be reconciled at all; it is reported as
/// an error keyed by the kind name.
pub(crate) fn report_kind(
    kind: &str,
    outcome: hasync_core::Result<SyncResult>,
    unknown_types: &[String],
    dry_run: bool,
    deletions_hint: &str,
) -> bool {
    let result = match outcome {
        Ok(result) => result,
        Err(e) => {
            println!("{} {}: {}", "!".red().bold(), kind.bold(), e);
            return false;
        }
    };

    let prefix = if dry_run { "would be " } else { "" };
    for key in &result.created {
        println!("  {} {} {}", "+".green(), key, format!("({prefix}created)").dimmed());
    }
    for key in &result.updated {
        println!("  {} {} {}", "~".yellow(), key, format!("({prefix}updated)").dimmed());
    }
    for key in &result.deleted {
        println!("  {} {} {}", "-".red(), key, format!("({prefix}deleted)").dimmed());
    }
    for (from, to) in &result.renamed {
        if from == to {
            println!("  {} {} {}", ">".blue(), from, format!("({prefix}moved)").dimmed());
        } else {
            println!("  {} {} -> {}", ">".blue(), from, to);
        }
    }
    for (key, message) in &result.errors {
        println!("  {} {}: {}", "!".red(), key, message.red());
    }

    let summary = format!(
        "{} created, {} updated, {} deleted, {} renamed",
        result.created.len(),
        result.updated.len(),
        result.deleted.len(),
        result.renamed.len()
    );
    if result.has_errors() {
        println!(
            "{} {}: {}, {}",
            "!".red().bold(),
            kind.bold(),
            summary,
            format!("{} errors", result.errors.len()).red()
        );
    } else if result.has_changes() {
        println!("{} {}: {}", "OK".green().bold(), kind.bold(), summary);
    } else {
        println!("{} {}: {}", "OK".green().bold(), kind.bold(), "up to date".dimmed());
    }

    if !result.orphaned.is_empty() {
        println!(
            "   {}",
            format!("{} item(s) only on the other side ({deletions_hint})", result.orphaned.len()).dimmed()
        );
    }
    for ty in unknown_types {
        println!("   {} unknown type '{}' kept without field checks", "note:".yellow(), ty);
    }
    !result.has_errors()
}
