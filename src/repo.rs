use std::path::{Path, PathBuf};

use crate::env_manager::EnvManager;
use crate::errors::ProvisionError;
use crate::vcs::{VcsError, VersionControl};
use crate::workdir::{self, WorkdirMode};

/// One provisioned project: where it comes from and where it lives on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Repository {
    remote_url: String,
    local_path: PathBuf,
}

/// Knobs for `Repository::create`.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcquireOptions {
    /// Fast-forward an already present working copy instead of using it as is.
    pub refresh_existing: bool,
    pub workdir_mode: WorkdirMode,
}

impl Repository {
    pub fn new(remote_url: impl Into<String>, local_path: impl Into<PathBuf>) -> Self {
        Self {
            remote_url: remote_url.into(),
            local_path: local_path.into(),
        }
    }

    pub fn remote_url(&self) -> &str {
        &self.remote_url
    }

    pub fn local_path(&self) -> &Path {
        &self.local_path
    }

    /// Materialize the working copy, then synchronize its dependencies.
    ///
    /// A repository already present at `local_path` counts as success, so calling this twice
    /// with the same descriptor succeeds both times.
    #[tracing::instrument(level = "info", skip_all, fields(remote = %self.remote_url, path = %self.local_path.display()))]
    pub fn create(
        &self,
        vcs: &dyn VersionControl,
        env_manager: &EnvManager<'_>,
        opts: AcquireOptions,
    ) -> Result<(), ProvisionError> {
        let acquisition_failed = |e: VcsError| ProvisionError::AcquisitionFailed {
            remote_url: self.remote_url.clone(),
            reason: e.to_string(),
        };
        match vcs.clone_repo(&self.remote_url, &self.local_path) {
            Ok(()) => tracing::info!("cloned repository"),
            Err(VcsError::AlreadyExists(_)) => {
                if opts.refresh_existing {
                    tracing::info!("repository already present; refreshing");
                    vcs.refresh(&self.local_path).map_err(acquisition_failed)?;
                } else {
                    tracing::info!("repository already present; reusing it");
                }
            }
            Err(e) => return Err(acquisition_failed(e)),
        }

        workdir::within(opts.workdir_mode, &self.local_path, |dir| {
            env_manager.sync(dir)
        })
    }
}

/// Checkout directory name derived from a remote URL: last path segment without `.git`.
pub fn default_checkout_name(remote_url: &str) -> String {
    let path = match url::Url::parse(remote_url) {
        Ok(u) => u.path().to_string(),
        // scp-like `git@host:owner/repo.git` and plain paths
        Err(_) => remote_url.to_string(),
    };
    let last = path
        .trim_end_matches('/')
        .rsplit(['/', ':', '\\'])
        .next()
        .unwrap_or_default();
    let name = last.strip_suffix(".git").unwrap_or(last);
    if name.is_empty() || name == "." || name == ".." {
        "repo".to_string()
    } else {
        name.to_string()
    }
}
