//! Working-directory scoping for stages that act inside the project directory.
//!
//! `Explicit` hands the project directory to each spawned command and never touches the
//! process working directory. `Relocate` changes into the directory for the duration of the
//! stage and restores the previous directory when the guard drops, on every exit path.
use std::env;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Deserialize;

use crate::errors::ProvisionError;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum WorkdirMode {
    #[default]
    Explicit,
    Relocate,
}

impl WorkdirMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkdirMode::Explicit => "explicit",
            WorkdirMode::Relocate => "relocate",
        }
    }
}

impl fmt::Display for WorkdirMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WorkdirMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "explicit" => Ok(WorkdirMode::Explicit),
            "relocate" => Ok(WorkdirMode::Relocate),
            other => Err(format!(
                "unknown working-directory mode '{other}' (expected explicit or relocate)"
            )),
        }
    }
}

/// Guard restoring the process working directory captured at `enter`.
#[derive(Debug)]
pub struct ScopedWorkdir {
    previous: PathBuf,
}

impl ScopedWorkdir {
    pub fn enter(dir: &Path) -> Result<Self, ProvisionError> {
        let previous = env::current_dir().map_err(ProvisionError::WorkingDirectoryQueryFailed)?;
        env::set_current_dir(dir).map_err(|source| ProvisionError::DirectoryEntryFailed {
            path: dir.to_path_buf(),
            source,
        })?;
        tracing::debug!(dir = %dir.display(), previous = %previous.display(), "entered project directory");
        Ok(Self { previous })
    }
}

impl Drop for ScopedWorkdir {
    fn drop(&mut self) {
        if let Err(e) = env::set_current_dir(&self.previous) {
            tracing::error!(
                previous = %self.previous.display(),
                "could not restore working directory: {e}"
            );
        }
    }
}

/// Absolute path of an existing project directory.
pub fn resolve_project_dir(dir: &Path) -> Result<PathBuf, ProvisionError> {
    let abs = if dir.is_absolute() {
        dir.to_path_buf()
    } else {
        env::current_dir()
            .map_err(ProvisionError::WorkingDirectoryQueryFailed)?
            .join(dir)
    };
    let meta = fs::metadata(&abs).map_err(|source| ProvisionError::DirectoryEntryFailed {
        path: abs.clone(),
        source,
    })?;
    if !meta.is_dir() {
        return Err(ProvisionError::DirectoryEntryFailed {
            path: abs,
            source: io::Error::other("not a directory"),
        });
    }
    Ok(abs)
}

/// Run `f` scoped to `dir` according to `mode`; `f` receives the absolute project directory.
pub fn within<T, F>(mode: WorkdirMode, dir: &Path, f: F) -> Result<T, ProvisionError>
where
    F: FnOnce(&Path) -> Result<T, ProvisionError>,
{
    let project = resolve_project_dir(dir)?;
    match mode {
        WorkdirMode::Explicit => f(&project),
        WorkdirMode::Relocate => {
            let _guard = ScopedWorkdir::enter(&project)?;
            f(&project)
        }
    }
}
