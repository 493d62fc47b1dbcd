//! Sequences preflight, acquisition and execution for one run and owns its staging root.
use std::fmt;

use crate::config::Config;
use crate::env_manager::{EnvManager, SYNC_ARGS, VERSION_ARGS};
use crate::errors::ProvisionError;
use crate::repo::AcquireOptions;
use crate::runtime::ProcessRuntime;
use crate::staging::StagingRoot;
use crate::util::{shell_escape, shell_join};
use crate::vcs::VersionControl;

/// Progress of a run. Any failure moves to `Failed`; nothing is resumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Init,
    Preflighted,
    Acquired,
    Executed,
    Done,
    Failed,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::Init => "init",
            Stage::Preflighted => "preflighted",
            Stage::Acquired => "acquired",
            Stage::Executed => "executed",
            Stage::Done => "done",
            Stage::Failed => "failed",
        };
        f.write_str(s)
    }
}

pub struct Orchestrator<'a> {
    config: Config,
    vcs: &'a dyn VersionControl,
    runtime: &'a dyn ProcessRuntime,
    stage: Stage,
}

impl<'a> Orchestrator<'a> {
    pub fn new(config: Config, vcs: &'a dyn VersionControl, runtime: &'a dyn ProcessRuntime) -> Self {
        Self {
            config,
            vcs,
            runtime,
            stage: Stage::Init,
        }
    }

    /// Run the whole pipeline and return the script's combined output.
    ///
    /// The staging root is removed before this returns, whatever the outcome; a stage error
    /// is returned exactly as the stage produced it.
    pub fn run(mut self) -> Result<String, ProvisionError> {
        self.config.validate()?;
        let staging = StagingRoot::create(&self.config.staging_root)?;

        let result = self.run_stages();
        if let Err(ref e) = result {
            tracing::info!(stage = %self.stage, kind = e.kind_str(), "run failed: {e}");
            advance(&mut self.stage, Stage::Failed);
        }

        let staging_path = staging.path().to_path_buf();
        if let Err(e) = staging.remove() {
            tracing::warn!(path = %staging_path.display(), "could not remove staging root: {e}");
        }
        if result.is_ok() {
            advance(&mut self.stage, Stage::Done);
        }
        result
    }

    fn run_stages(&mut self) -> Result<String, ProvisionError> {
        let env_manager = EnvManager::new(&self.config.tool, self.runtime);

        crate::preflight::verify(&env_manager)?;
        advance(&mut self.stage, Stage::Preflighted);

        let invocation = self.config.invocation()?;
        let opts = AcquireOptions {
            refresh_existing: self.config.refresh_existing,
            workdir_mode: self.config.workdir_mode,
        };
        invocation
            .repository()
            .create(self.vcs, &env_manager, opts)?;
        advance(&mut self.stage, Stage::Acquired);

        let output = invocation.run(
            &env_manager,
            &self.config.interpreter_prefix,
            self.config.workdir_mode,
        )?;
        advance(&mut self.stage, Stage::Executed);
        Ok(output)
    }
}

fn advance(stage: &mut Stage, next: Stage) {
    tracing::info!(from = %stage, to = %next, "stage transition");
    *stage = next;
}

/// Human-readable list of the commands a run would perform, in order.
pub fn preview(config: &Config) -> Result<Vec<String>, ProvisionError> {
    config.validate()?;
    let invocation = config.invocation()?;
    let repo = invocation.repository();
    let tool = shell_escape(&config.tool);
    let dir = shell_escape(&repo.local_path().display().to_string());
    let to_vec = |args: &[&str]| args.iter().map(|s| s.to_string()).collect::<Vec<_>>();

    let mut lines = vec![
        format!(
            "mkdir -p -m 0777 {}",
            shell_escape(&config.staging_root.display().to_string())
        ),
        format!("{tool} {}", shell_join(&to_vec(&VERSION_ARGS))),
        format!(
            "git clone --quiet -- {} {dir}",
            shell_escape(repo.remote_url())
        ),
    ];
    if config.refresh_existing {
        lines.push(format!("git -C {dir} pull --ff-only --quiet  # only if already present"));
    }
    lines.push(format!("(cd {dir} && {tool} {})", shell_join(&to_vec(&SYNC_ARGS))));
    lines.push(format!(
        "(cd {dir} && {tool} {})",
        shell_join(&invocation.command_args(&config.interpreter_prefix))
    ));
    lines.push(format!(
        "rm -rf {}",
        shell_escape(&config.staging_root.display().to_string())
    ));
    Ok(lines)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_preview_lists_commands_in_order() {
        let mut c = Config::new("https://example.test/proj.git", vec!["proj/hello.py".to_string()]);
        c.staging_root = PathBuf::from("/tmp/x");
        let lines = preview(&c).expect("preview");
        assert_eq!(lines.first().map(String::as_str), Some("mkdir -p -m 0777 /tmp/x"));
        assert_eq!(lines[1], "poetry --version");
        assert_eq!(lines[2], "git clone --quiet -- https://example.test/proj.git /tmp/x/proj");
        assert_eq!(lines[3], "(cd /tmp/x/proj && poetry install --sync)");
        assert_eq!(lines[4], "(cd /tmp/x/proj && poetry run python proj/hello.py)");
        assert_eq!(lines.last().map(String::as_str), Some("rm -rf /tmp/x"));
    }

    #[test]
    fn test_stage_display() {
        assert_eq!(Stage::Preflighted.to_string(), "preflighted");
        assert_eq!(Stage::Failed.to_string(), "failed");
    }
}
