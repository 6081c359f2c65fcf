//! Validate command implementation

use colored::Colorize;
use hasync_core::{Scope, ValidationReport, build_kind, validate_kind};

use crate::context::{Offline, Workspace};
use crate::error::Result;

/// Run the validate command
pub fn run_validate(workspace: &Workspace, path: Option<&str>, check_templates: bool, json: bool) -> Result<bool> {
    let domains = workspace.local_domains();
    let selections = workspace.selections(path, &domains)?;

    let mut report = ValidationReport::default();
    for selection in selections {
        let kind = build_kind(&selection.kind, &workspace.config, Box::new(Offline));
        match validate_kind(kind.as_ref(), &Scope::from_filter(selection.filter)) {
            Ok(kind_report) => report.merge(kind_report),
            Err(e) => report.error(kind.name(), e.to_string()),
        }
    }

    if check_templates && !report.templates.is_empty() {
        let client = workspace.connect()?;
        let failures: Vec<_> = report
            .templates
            .iter()
            .filter_map(|t| {
                client
                    .render_template(&t.template)
                    .err()
                    .map(|e| (t.path.clone(), format!("{}: {}", t.field, e)))
            })
            .collect();
        for (path, message) in failures {
            report.error(path, message);
        }
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(workspace, &report, check_templates);
    }
    Ok(report.is_ok())
}

fn print_report(workspace: &Workspace, report: &ValidationReport, check_templates: bool) {
    for finding in &report.errors {
        println!(
            "  {} {}: {}",
            "x".red().bold(),
            workspace.display(&finding.path),
            finding.message
        );
    }
    for finding in &report.warnings {
        println!(
            "  {} {}: {}",
            "!".yellow(),
            workspace.display(&finding.path),
            finding.message.dimmed()
        );
    }
    if !report.errors.is_empty() || !report.warnings.is_empty() {
        println!();
    }

    let templates = if check_templates {
        format!(", {} templates rendered", report.templates.len())
    } else {
        String::new()
    };
    let summary = format!("Checked {} files{}", report.files_checked, templates);
    if report.is_ok() {
        println!(
            "{} {} ({} warnings)",
            "OK".green().bold(),
            summary,
            report.warnings.len()
        );
    } else {
        println!(
            "{} {}: {}",
            "FAIL".red().bold(),
            summary,
            format!("{} errors", report.errors.len()).red()
        );
    }
}
