//! Error mapping guide:
//! - Every stage returns a `ProvisionError`; the orchestrator passes it through untouched.
//! - Map a tool that is not on PATH (or io::ErrorKind::NotFound) to exit code 127.
//! - A failing script exits with its own code when it fits in 1..=255; everything else is 1.
use std::fmt;
use std::io;
use std::path::PathBuf;

/// Map an io::Error to a process exit code:
/// - 127 for NotFound (command not found)
/// - 1 for all other errors
pub fn exit_code_for_io_error(e: &io::Error) -> u8 {
    if e.kind() == io::ErrorKind::NotFound {
        127
    } else {
        1
    }
}

/// Why the environment-manager preflight failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolFault {
    /// The tool could not be located or spawned.
    NotFound,
    /// The tool started but its version query failed.
    Errored(String),
}

#[derive(Debug)]
pub enum ProvisionError {
    /// Configuration could not be assembled or is inconsistent.
    InvalidConfig(String),
    /// The staging root could not be created.
    StagingFailed { path: PathBuf, source: io::Error },
    ToolMissing { tool: String, fault: ToolFault },
    AcquisitionFailed { remote_url: String, reason: String },
    WorkingDirectoryQueryFailed(io::Error),
    DirectoryEntryFailed { path: PathBuf, source: io::Error },
    DependencySyncFailed {
        path: PathBuf,
        reason: String,
        output: String,
    },
    /// The script ran (or failed to start); `output` holds whatever it printed.
    ExecutionFailed {
        code: Option<i32>,
        reason: String,
        output: String,
    },
}

impl ProvisionError {
    /// Combined output captured from a failed script, if any.
    pub fn captured_output(&self) -> Option<&str> {
        match self {
            ProvisionError::ExecutionFailed { output, .. } if !output.is_empty() => Some(output),
            _ => None,
        }
    }

    /// Short, stable identifier of the error kind (used in logs).
    pub fn kind_str(&self) -> &'static str {
        match self {
            ProvisionError::InvalidConfig(_) => "invalid-config",
            ProvisionError::StagingFailed { .. } => "staging-failed",
            ProvisionError::ToolMissing { .. } => "tool-missing",
            ProvisionError::AcquisitionFailed { .. } => "acquisition-failed",
            ProvisionError::WorkingDirectoryQueryFailed(_) => "cwd-query-failed",
            ProvisionError::DirectoryEntryFailed { .. } => "directory-entry-failed",
            ProvisionError::DependencySyncFailed { .. } => "dependency-sync-failed",
            ProvisionError::ExecutionFailed { .. } => "execution-failed",
        }
    }
}

impl fmt::Display for ProvisionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProvisionError::InvalidConfig(msg) => write!(f, "invalid configuration: {msg}"),
            ProvisionError::StagingFailed { path, source } => write!(
                f,
                "could not prepare staging root {}: {source}",
                path.display()
            ),
            ProvisionError::ToolMissing {
                tool,
                fault: ToolFault::NotFound,
            } => write!(f, "{tool} is required and was not found in PATH"),
            ProvisionError::ToolMissing {
                tool,
                fault: ToolFault::Errored(detail),
            } => write!(f, "{tool} is installed but not usable: {detail}"),
            ProvisionError::AcquisitionFailed { remote_url, reason } => {
                write!(f, "could not clone {remote_url}: {reason}")
            }
            ProvisionError::WorkingDirectoryQueryFailed(e) => {
                write!(f, "problem getting current working directory: {e}")
            }
            ProvisionError::DirectoryEntryFailed { path, source } => write!(
                f,
                "could not enter project directory {}: {source}",
                path.display()
            ),
            ProvisionError::DependencySyncFailed { path, reason, .. } => write!(
                f,
                "dependency sync failed in {}: {reason}",
                path.display()
            ),
            ProvisionError::ExecutionFailed { reason, .. } => write!(f, "script failed: {reason}"),
        }
    }
}

impl std::error::Error for ProvisionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ProvisionError::StagingFailed { source, .. }
            | ProvisionError::DirectoryEntryFailed { source, .. } => Some(source),
            ProvisionError::WorkingDirectoryQueryFailed(e) => Some(e),
            _ => None,
        }
    }
}

/// Convert ProvisionError to a process exit code.
pub fn exit_code_for_provision_error(e: &ProvisionError) -> u8 {
    match e {
        ProvisionError::ToolMissing {
            fault: ToolFault::NotFound,
            ..
        } => 127,
        ProvisionError::StagingFailed { source, .. } => exit_code_for_io_error(source),
        ProvisionError::ExecutionFailed {
            code: Some(code), ..
        } if (1..=255).contains(code) => *code as u8,
        _ => 1,
    }
}

/// Describe a finished command's status for error messages.
pub(crate) fn describe_status(code: Option<i32>) -> String {
    match code {
        Some(c) => format!("exit status {c}"),
        None => "terminated by signal".to_string(),
    }
}
