use crate::env_manager::EnvManager;
use crate::errors::ProvisionError;
use crate::repo::Repository;
use crate::workdir::{self, WorkdirMode};

/// A request to run one script inside a provisioned repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptInvocation {
    argv: Vec<String>,
    repository: Repository,
}

impl ScriptInvocation {
    pub fn new(argv: Vec<String>, repository: Repository) -> Self {
        Self { argv, repository }
    }

    pub fn argv(&self) -> &[String] {
        &self.argv
    }

    pub fn repository(&self) -> &Repository {
        &self.repository
    }

    /// Arguments handed to the environment manager: `prefix` followed by the script's argv.
    pub fn command_args(&self, prefix: &[String]) -> Vec<String> {
        prefix.iter().chain(self.argv.iter()).cloned().collect()
    }

    /// Run the script through the environment manager inside the repository directory.
    ///
    /// On a non-zero exit the captured output travels inside `ProvisionError::ExecutionFailed`.
    #[tracing::instrument(level = "info", skip_all, fields(path = %self.repository.local_path().display()))]
    pub fn run(
        &self,
        env_manager: &EnvManager<'_>,
        prefix: &[String],
        mode: WorkdirMode,
    ) -> Result<String, ProvisionError> {
        let args = self.command_args(prefix);
        workdir::within(mode, self.repository.local_path(), |dir| {
            tracing::info!(tool = env_manager.tool(), args = %crate::util::shell_join(&args), "running script");
            env_manager.run(dir, &args)
        })
    }
}
