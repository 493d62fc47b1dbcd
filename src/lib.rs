//! pungi: provision a throwaway checkout of a Poetry project, sync its environment, run one
//! of its scripts and remove everything again.
//!
//! The pipeline is `preflight -> acquire (clone + sync) -> execute`, driven by
//! [`Orchestrator`]. Version control and process spawning sit behind the [`VersionControl`]
//! and [`ProcessRuntime`] traits so stages can be exercised with stub collaborators.

pub mod config;
pub mod env_manager;
pub mod errors;
pub mod orchestrator;
pub mod preflight;
pub mod repo;
pub mod runtime;
pub mod script;
pub mod signals;
pub mod staging;
mod telemetry;
pub mod util;
pub mod vcs;
pub mod workdir;

pub use config::{load_base_layer, load_config, Config, ConfigLayer};
pub use env_manager::EnvManager;
pub use errors::{
    exit_code_for_io_error, exit_code_for_provision_error, ProvisionError, ToolFault,
};
pub use orchestrator::{preview, Orchestrator, Stage};
pub use repo::{AcquireOptions, Repository};
pub use runtime::{CommandOutput, ProcessRuntime, SystemRuntime};
pub use script::ScriptInvocation;
pub use staging::StagingRoot;
pub use telemetry::telemetry_init;
pub use vcs::{GitCli, VcsError, VersionControl};
pub use workdir::{ScopedWorkdir, WorkdirMode};
