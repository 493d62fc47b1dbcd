//! Commands of the delegated environment manager (Poetry by default).
use std::path::Path;

use crate::errors::{describe_status, ProvisionError};
use crate::runtime::{CommandOutput, ProcessRuntime};

pub const DEFAULT_TOOL: &str = "poetry";
pub const VERSION_ARGS: [&str; 1] = ["--version"];
pub const SYNC_ARGS: [&str; 2] = ["install", "--sync"];

/// Default interpreter prefix placed before the script's own argv.
pub fn default_interpreter_prefix() -> Vec<String> {
    vec!["run".to_string(), "python".to_string()]
}

/// The environment-manager executable bound to the runtime that spawns it.
pub struct EnvManager<'a> {
    tool: &'a str,
    runtime: &'a dyn ProcessRuntime,
}

impl<'a> EnvManager<'a> {
    pub fn new(tool: &'a str, runtime: &'a dyn ProcessRuntime) -> Self {
        Self { tool, runtime }
    }

    pub fn tool(&self) -> &str {
        self.tool
    }

    /// `<tool> --version`, run from `cwd`.
    pub fn version(&self, cwd: &Path) -> anyhow::Result<CommandOutput> {
        self.runtime.run(self.tool, &to_args(&VERSION_ARGS), cwd)
    }

    /// `<tool> install --sync` inside `project_dir`.
    pub fn sync(&self, project_dir: &Path) -> Result<(), ProvisionError> {
        tracing::info!(tool = self.tool, dir = %project_dir.display(), "synchronizing dependencies");
        let fail = |reason: String, output: String| ProvisionError::DependencySyncFailed {
            path: project_dir.to_path_buf(),
            reason,
            output,
        };
        let out = self
            .runtime
            .run(self.tool, &to_args(&SYNC_ARGS), project_dir)
            .map_err(|e| fail(format!("{e:#}"), String::new()))?;
        if out.success() {
            Ok(())
        } else {
            Err(fail(describe_status(out.code), out.output))
        }
    }

    /// `<tool> <argv...>` inside `project_dir`; combined output on success.
    pub fn run(&self, project_dir: &Path, argv: &[String]) -> Result<String, ProvisionError> {
        let out = self
            .runtime
            .run(self.tool, argv, project_dir)
            .map_err(|e| ProvisionError::ExecutionFailed {
                code: None,
                reason: format!("{e:#}"),
                output: String::new(),
            })?;
        if out.success() {
            Ok(out.output)
        } else {
            Err(ProvisionError::ExecutionFailed {
                code: out.code,
                reason: describe_status(out.code),
                output: out.output,
            })
        }
    }
}

fn to_args(args: &[&str]) -> Vec<String> {
    args.iter().map(|s| s.to_string()).collect()
}
