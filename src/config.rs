//! Run configuration: defaults, then a YAML file, then `PUNGI_*` environment variables,
//! then command-line flags. Later layers win field by field.
use std::env;
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::env_manager::{default_interpreter_prefix, DEFAULT_TOOL};
use crate::errors::ProvisionError;
use crate::repo::{default_checkout_name, Repository};
use crate::script::ScriptInvocation;
use crate::util::{id::create_run_id, reject_newlines};
use crate::workdir::WorkdirMode;

/// Fully resolved settings for one orchestration run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub remote_url: String,
    /// Checkout location; relative paths live under the staging root.
    pub local_path: Option<PathBuf>,
    pub script_args: Vec<String>,
    pub interpreter_prefix: Vec<String>,
    pub tool: String,
    pub staging_root: PathBuf,
    pub refresh_existing: bool,
    pub workdir_mode: WorkdirMode,
    pub timeout: Option<Duration>,
}

impl Config {
    /// Defaults for everything but the two required inputs.
    pub fn new(remote_url: impl Into<String>, script_args: Vec<String>) -> Self {
        Self {
            remote_url: remote_url.into(),
            local_path: None,
            script_args,
            interpreter_prefix: default_interpreter_prefix(),
            tool: DEFAULT_TOOL.to_string(),
            staging_root: default_staging_root(),
            refresh_existing: false,
            workdir_mode: WorkdirMode::default(),
            timeout: None,
        }
    }

    /// Absolute checkout path, checked to lie strictly inside the staging root.
    pub fn checkout_path(&self) -> Result<PathBuf, ProvisionError> {
        let invalid = |msg: String| Err(ProvisionError::InvalidConfig(msg));
        let path = match &self.local_path {
            None => self.staging_root.join(default_checkout_name(&self.remote_url)),
            Some(p) if p.is_relative() => self.staging_root.join(p),
            Some(p) => p.clone(),
        };
        if path.components().any(|c| matches!(c, Component::ParentDir)) {
            return invalid(format!(
                "local path {} must not contain '..'",
                path.display()
            ));
        }
        if path == self.staging_root || !path.starts_with(&self.staging_root) {
            return invalid(format!(
                "local path {} must lie inside the staging root {}",
                path.display(),
                self.staging_root.display()
            ));
        }
        Ok(path)
    }

    pub fn repository(&self) -> Result<Repository, ProvisionError> {
        Ok(Repository::new(self.remote_url.clone(), self.checkout_path()?))
    }

    pub fn invocation(&self) -> Result<ScriptInvocation, ProvisionError> {
        Ok(ScriptInvocation::new(
            self.script_args.clone(),
            self.repository()?,
        ))
    }

    /// Check the invariants the pipeline relies on.
    pub fn validate(&self) -> Result<(), ProvisionError> {
        let invalid = |msg: String| ProvisionError::InvalidConfig(msg);
        if self.remote_url.trim().is_empty() {
            return Err(invalid("remote URL is required (--repo)".to_string()));
        }
        if self.script_args.is_empty() {
            return Err(invalid("a script to run is required".to_string()));
        }
        if self.tool.trim().is_empty() {
            return Err(invalid("environment-manager tool must not be empty".to_string()));
        }
        if self.interpreter_prefix.is_empty() {
            return Err(invalid("interpreter prefix must not be empty".to_string()));
        }
        if !self.staging_root.is_absolute() {
            return Err(invalid(format!(
                "staging root {} must be an absolute path",
                self.staging_root.display()
            )));
        }
        reject_newlines(&self.remote_url, "remote URL").map_err(invalid)?;
        for a in self.script_args.iter().chain(self.interpreter_prefix.iter()) {
            reject_newlines(a, "script argument").map_err(invalid)?;
        }
        self.checkout_path().map(|_| ())
    }
}

/// `$TMPDIR/pungi/run-<id>`, unique per run.
pub fn default_staging_root() -> PathBuf {
    env::temp_dir()
        .join("pungi")
        .join(format!("run-{}", create_run_id()))
}

/// One configuration source; every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigLayer {
    pub remote_url: Option<String>,
    pub local_path: Option<PathBuf>,
    pub script_args: Option<Vec<String>>,
    pub interpreter_prefix: Option<Vec<String>>,
    pub tool: Option<String>,
    pub staging_root: Option<PathBuf>,
    pub refresh_existing: Option<bool>,
    pub workdir_mode: Option<WorkdirMode>,
    /// humantime syntax, e.g. `90s` or `5m`
    pub timeout: Option<String>,
}

impl ConfigLayer {
    /// Parse a YAML configuration file.
    pub fn from_yaml_file(path: &Path) -> Result<Self, ProvisionError> {
        let content = fs::read_to_string(path).map_err(|e| {
            ProvisionError::InvalidConfig(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_yaml_str(&content).map_err(|e| match e {
            ProvisionError::InvalidConfig(msg) => {
                ProvisionError::InvalidConfig(format!("{}: {msg}", path.display()))
            }
            other => other,
        })
    }

    pub fn from_yaml_str(content: &str) -> Result<Self, ProvisionError> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content)
            .map_err(|e| ProvisionError::InvalidConfig(format!("cannot parse YAML: {e}")))
    }

    /// Layer built from `PUNGI_*` variables; `lookup` abstracts the process environment.
    pub fn from_env_with<F>(lookup: F) -> Result<Self, ProvisionError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let workdir_mode = match get("PUNGI_WORKDIR_MODE") {
            Some(v) => Some(v.parse::<WorkdirMode>().map_err(|e| {
                ProvisionError::InvalidConfig(format!("PUNGI_WORKDIR_MODE: {e}"))
            })?),
            None => None,
        };
        Ok(Self {
            remote_url: get("PUNGI_REMOTE_URL"),
            local_path: get("PUNGI_LOCAL_PATH").map(PathBuf::from),
            script_args: None,
            interpreter_prefix: get("PUNGI_INTERPRETER_PREFIX")
                .map(|v| v.split_whitespace().map(str::to_string).collect()),
            tool: get("PUNGI_TOOL"),
            staging_root: get("PUNGI_STAGING_ROOT").map(PathBuf::from),
            refresh_existing: get("PUNGI_REFRESH").map(|v| v == "1" || v.eq_ignore_ascii_case("true")),
            workdir_mode,
            timeout: get("PUNGI_TIMEOUT"),
        })
    }

    pub fn from_env() -> Result<Self, ProvisionError> {
        Self::from_env_with(|k| env::var(k).ok())
    }

    /// Overlay `higher` on top of `self`; fields set in `higher` win.
    pub fn merge(self, higher: ConfigLayer) -> ConfigLayer {
        ConfigLayer {
            remote_url: higher.remote_url.or(self.remote_url),
            local_path: higher.local_path.or(self.local_path),
            script_args: higher
                .script_args
                .filter(|v| !v.is_empty())
                .or(self.script_args),
            interpreter_prefix: higher
                .interpreter_prefix
                .filter(|v| !v.is_empty())
                .or(self.interpreter_prefix),
            tool: higher.tool.or(self.tool),
            staging_root: higher.staging_root.or(self.staging_root),
            refresh_existing: higher.refresh_existing.or(self.refresh_existing),
            workdir_mode: higher.workdir_mode.or(self.workdir_mode),
            timeout: higher.timeout.or(self.timeout),
        }
    }

    /// Fill remaining gaps with defaults and validate.
    pub fn resolve(self) -> Result<Config, ProvisionError> {
        let timeout = match self.timeout.as_deref() {
            None => None,
            Some(s) => {
                let d = humantime::parse_duration(s).map_err(|e| {
                    ProvisionError::InvalidConfig(format!("invalid timeout '{s}': {e}"))
                })?;
                (!d.is_zero()).then_some(d)
            }
        };
        let mut config = Config::new(
            self.remote_url.unwrap_or_default(),
            self.script_args.unwrap_or_default(),
        );
        config.local_path = self.local_path;
        if let Some(prefix) = self.interpreter_prefix {
            config.interpreter_prefix = prefix;
        }
        if let Some(tool) = self.tool {
            config.tool = tool;
        }
        if let Some(root) = self.staging_root {
            config.staging_root = root;
        }
        config.refresh_existing = self.refresh_existing.unwrap_or(false);
        config.workdir_mode = self.workdir_mode.unwrap_or_default();
        config.timeout = timeout;
        config.validate()?;
        Ok(config)
    }
}

/// Config file to read: explicit path, else `PUNGI_CONFIG`, else `~/.config/pungi/config.yml`
/// when it exists. An explicitly named file must exist.
pub fn config_file_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(p) = explicit {
        return Some(p.to_path_buf());
    }
    if let Some(p) = env::var("PUNGI_CONFIG")
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
    {
        return Some(PathBuf::from(p));
    }
    home::home_dir()
        .map(|h| h.join(".config").join("pungi").join("config.yml"))
        .filter(|p| p.is_file())
}

/// The file and environment layers merged (no command-line flags).
pub fn load_base_layer(config_file: Option<&Path>) -> Result<ConfigLayer, ProvisionError> {
    let file = match config_file_path(config_file) {
        Some(p) => ConfigLayer::from_yaml_file(&p)?,
        None => ConfigLayer::default(),
    };
    Ok(file.merge(ConfigLayer::from_env()?))
}

/// Assemble the run configuration from file, environment and command-line layers.
pub fn load_config(
    config_file: Option<&Path>,
    cli: ConfigLayer,
) -> Result<Config, ProvisionError> {
    load_base_layer(config_file)?.merge(cli).resolve()
}
