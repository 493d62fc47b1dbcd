use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::errors::ProvisionError;

/// Staging root owned by one run; removed recursively exactly once, at `remove` or on drop.
#[derive(Debug)]
pub struct StagingRoot {
    path: PathBuf,
    removed: bool,
}

impl StagingRoot {
    /// Create the directory (and parents) with a permissive mode for the delegated tools.
    ///
    /// An existing non-empty directory is refused: the run would delete foreign content.
    pub fn create(path: &Path) -> Result<Self, ProvisionError> {
        let fail = |source: io::Error| ProvisionError::StagingFailed {
            path: path.to_path_buf(),
            source,
        };
        if path.exists() {
            let mut entries = fs::read_dir(path).map_err(fail)?;
            if entries.next().is_some() {
                return Err(fail(io::Error::new(
                    io::ErrorKind::AlreadyExists,
                    "directory exists and is not empty",
                )));
            }
        }
        fs::create_dir_all(path).map_err(fail)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(path, fs::Permissions::from_mode(0o777)).map_err(fail)?;
        }
        tracing::info!(path = %path.display(), "created staging root");
        Ok(Self {
            path: path.to_path_buf(),
            removed: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Remove the staging root now and report the outcome.
    pub fn remove(mut self) -> io::Result<()> {
        self.removed = true;
        remove_tree(&self.path)
    }
}

impl Drop for StagingRoot {
    fn drop(&mut self) {
        if self.removed {
            return;
        }
        self.removed = true;
        if let Err(e) = remove_tree(&self.path) {
            tracing::warn!(path = %self.path.display(), "could not remove staging root: {e}");
        }
    }
}

fn remove_tree(path: &Path) -> io::Result<()> {
    match fs::remove_dir_all(path) {
        Ok(()) => {
            tracing::info!(path = %path.display(), "removed staging root");
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}
