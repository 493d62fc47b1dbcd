//! Process runtime seam: how the environment manager's commands are executed.
use std::path::Path;
use std::time::Duration;

use anyhow::Result;

use crate::util::{ExecRequest, ExecService};

/// Result of one finished command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code; `None` when the process was terminated by a signal.
    pub code: Option<i32>,
    /// Interleaved stdout and stderr text.
    pub output: String,
}

impl CommandOutput {
    pub fn new(code: Option<i32>, output: impl Into<String>) -> Self {
        Self {
            code,
            output: output.into(),
        }
    }

    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Executes `program args...` with `cwd` as working directory and returns its combined output.
///
/// Errors are reserved for commands that could not be started or awaited; a non-zero exit
/// is reported through `CommandOutput::code`. A program missing from PATH must produce an
/// error whose chain contains `io::ErrorKind::NotFound`.
pub trait ProcessRuntime {
    fn run(&self, program: &str, args: &[String], cwd: &Path) -> Result<CommandOutput>;
}

/// Runs commands on the host through `ExecService`.
#[derive(Debug, Clone, Default)]
pub struct SystemRuntime {
    exec: ExecService,
}

impl SystemRuntime {
    /// `None` disables the per-command timeout.
    pub fn new(timeout: Option<Duration>) -> Self {
        Self {
            exec: ExecService::new(timeout.unwrap_or(Duration::ZERO)),
        }
    }
}

impl ProcessRuntime for SystemRuntime {
    fn run(&self, program: &str, args: &[String], cwd: &Path) -> Result<CommandOutput> {
        tracing::debug!(program, ?args, cwd = %cwd.display(), "spawning command");
        let out = self
            .exec
            .run(ExecRequest::new(program).args(args).cwd(cwd))?;
        tracing::debug!(
            program,
            code = ?out.status.code(),
            elapsed = %humantime::format_duration(out.duration),
            "command finished"
        );
        Ok(CommandOutput::new(out.status.code(), out.output))
    }
}
