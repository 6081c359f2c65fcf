//! Template command implementation

use colored::Colorize;
use hasync_client::ClientError;

use crate::context::Workspace;
use crate::error::Result;

/// Run the template command
///
/// A template the server rejects is reported and fails the command;
/// connection problems are errors.
pub fn run_template(workspace: &Workspace, template: &str) -> Result<bool> {
    let client = workspace.connect()?;
    match client.render_template(template) {
        Ok(rendered) => {
            println!("{rendered}");
            Ok(true)
        }
        Err(ClientError::Status { body, .. }) => {
            println!("{} {}", "Template error:".red(), body);
            Ok(false)
        }
        Err(e) => Err(e.into()),
    }
}
