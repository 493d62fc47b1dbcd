use std::env;

use crate::env_manager::EnvManager;
use crate::errors::{ProvisionError, ToolFault};
use crate::util::exec::is_not_found;

/// Verify the environment manager is installed and answers its version query.
///
/// Returns the reported version line. No retries: a missing tool is a configuration fault.
pub fn verify(env_manager: &EnvManager<'_>) -> Result<String, ProvisionError> {
    let tool = env_manager.tool();
    let missing = |fault: ToolFault| ProvisionError::ToolMissing {
        tool: tool.to_string(),
        fault,
    };
    // The version query does not depend on any directory; fall back to the temp dir when the
    // process cwd is gone.
    let cwd = env::current_dir().unwrap_or_else(|_| env::temp_dir());
    let out = env_manager.version(&cwd).map_err(|e| {
        if is_not_found(&e) {
            missing(ToolFault::NotFound)
        } else {
            missing(ToolFault::Errored(format!("{e:#}")))
        }
    })?;
    if !out.success() {
        let detail = out.output.trim();
        return Err(missing(ToolFault::Errored(format!(
            "{} --version exited with {}{}{}",
            tool,
            crate::errors::describe_status(out.code),
            if detail.is_empty() { "" } else { ": " },
            detail
        ))));
    }
    let version = out.output.lines().next().unwrap_or_default().trim().to_string();
    tracing::info!(tool, version = %version, "preflight ok");
    Ok(version)
}
