use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use pungi::{ConfigLayer, WorkdirMode};

#[derive(Parser, Debug)]
#[command(
    name = "pungi",
    version,
    about = "Clone a Poetry project into a throwaway staging root, sync it and run one of its scripts."
)]
pub(crate) struct Cli {
    /// Print detailed execution info
    #[arg(long, global = true)]
    pub verbose: bool,

    /// YAML configuration file (default: $PUNGI_CONFIG or ~/.config/pungi/config.yml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub(crate) enum Command {
    /// Provision the repository and run a script inside it
    Run(RunArgs),
    /// Check that the environment manager and git are usable
    Doctor,
}

#[derive(Args, Debug, Clone)]
pub(crate) struct RunArgs {
    /// Remote repository URL to clone
    #[arg(long = "repo")]
    pub repo: Option<String>,

    /// Checkout location; relative paths are placed under the staging root
    #[arg(long = "dest")]
    pub dest: Option<PathBuf>,

    /// Directory holding this run's checkouts; removed when the run ends
    #[arg(long = "staging-root")]
    pub staging_root: Option<PathBuf>,

    /// Environment-manager executable
    #[arg(long = "tool")]
    pub tool: Option<String>,

    /// Arguments placed before the script (comma separated, default: run,python)
    #[arg(long = "prefix", value_delimiter = ',')]
    pub prefix: Vec<String>,

    /// Fast-forward an already present checkout before syncing
    #[arg(long = "refresh")]
    pub refresh: bool,

    /// How stages scope themselves to the project directory
    #[arg(long = "workdir-mode", value_enum)]
    pub workdir_mode: Option<WorkdirMode>,

    /// Per-command timeout, e.g. 90s or 5m (default: none)
    #[arg(long = "timeout")]
    pub timeout: Option<String>,

    /// Exit with the script's own status when it fails (default: report it and exit 0)
    #[arg(long = "propagate-exit-code")]
    pub propagate_exit_code: bool,

    /// Print what would run, but do not execute
    #[arg(long = "dry-run")]
    pub dry_run: bool,

    /// Script path and its arguments, relative to the checkout
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub script: Vec<String>,
}

impl RunArgs {
    /// Flags as the highest-precedence configuration layer.
    pub(crate) fn to_layer(&self) -> ConfigLayer {
        ConfigLayer {
            remote_url: self.repo.clone(),
            local_path: self.dest.clone(),
            script_args: Some(self.script.clone()),
            interpreter_prefix: Some(self.prefix.clone()),
            tool: self.tool.clone(),
            staging_root: self.staging_root.clone(),
            refresh_existing: self.refresh.then_some(true),
            workdir_mode: self.workdir_mode,
            timeout: self.timeout.clone(),
        }
    }
}
