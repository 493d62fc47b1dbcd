//! Version-control seam and its `git` CLI implementation.
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::util::{ExecRequest, ExecService};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VcsError {
    /// A repository is already present at the destination.
    AlreadyExists(PathBuf),
    Other(String),
}

impl fmt::Display for VcsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VcsError::AlreadyExists(p) => write!(f, "repository already exists at {}", p.display()),
            VcsError::Other(msg) => f.write_str(msg),
        }
    }
}

impl std::error::Error for VcsError {}

pub trait VersionControl {
    /// Materialize a working copy of `remote_url` at `local_path`.
    fn clone_repo(&self, remote_url: &str, local_path: &Path) -> Result<(), VcsError>;

    /// Bring an existing working copy up to date with its remote.
    fn refresh(&self, local_path: &Path) -> Result<(), VcsError>;
}

/// `git` executable driven through `ExecService`.
#[derive(Debug, Clone)]
pub struct GitCli {
    program: String,
    exec: ExecService,
}

impl GitCli {
    pub fn new(timeout: Option<Duration>) -> Self {
        Self {
            program: "git".to_string(),
            exec: ExecService::new(timeout.unwrap_or(Duration::ZERO)),
        }
    }

    fn git(&self) -> ExecRequest {
        // Fail instead of prompting for credentials on a terminal nobody watches.
        ExecRequest::new(&self.program).env("GIT_TERMINAL_PROMPT", "0")
    }

    fn run_git(&self, request: ExecRequest, what: &str) -> Result<(), VcsError> {
        let out = self
            .exec
            .run(request)
            .map_err(|e| VcsError::Other(format!("{what}: {e:#}")))?;
        if out.status.success() {
            Ok(())
        } else {
            let detail = out.output.trim();
            Err(VcsError::Other(format!(
                "{what} failed ({}){}{}",
                crate::errors::describe_status(out.status.code()),
                if detail.is_empty() { "" } else { ": " },
                detail
            )))
        }
    }
}

impl Default for GitCli {
    fn default() -> Self {
        Self::new(None)
    }
}

/// True when `path` holds a git working copy or a bare repository.
pub fn is_repository(path: &Path) -> bool {
    path.join(".git").exists() || (path.join("HEAD").is_file() && path.join("objects").is_dir())
}

impl VersionControl for GitCli {
    fn clone_repo(&self, remote_url: &str, local_path: &Path) -> Result<(), VcsError> {
        if is_repository(local_path) {
            return Err(VcsError::AlreadyExists(local_path.to_path_buf()));
        }
        let existed = local_path.exists();
        if let Some(parent) = local_path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                VcsError::Other(format!("cannot create {}: {e}", parent.display()))
            })?;
        }
        let request = self
            .git()
            .args(["clone", "--quiet", "--"])
            .arg(remote_url)
            .arg(local_path);
        let result = self.run_git(request, "git clone");
        if result.is_err() && !existed {
            // Leave no half-written checkout behind for the next attempt.
            let _ = fs::remove_dir_all(local_path);
        }
        result
    }

    fn refresh(&self, local_path: &Path) -> Result<(), VcsError> {
        let request = self
            .git()
            .arg("-C")
            .arg(local_path)
            .args(["pull", "--ff-only", "--quiet"]);
        self.run_git(request, "git pull")
    }
}
