#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use pungi::{CommandOutput, ProcessRuntime, VcsError, VersionControl};

// Tests that compare or move the process working directory serialize on this lock.
static CWD_LOCK: Mutex<()> = Mutex::new(());

pub fn cwd_lock() -> MutexGuard<'static, ()> {
    CWD_LOCK.lock().unwrap_or_else(|e| e.into_inner())
}

/// One command seen by `StubRuntime`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: PathBuf,
    /// Process working directory at the time of the call.
    pub process_cwd: PathBuf,
}

/// Scripted reply keyed by the first argument (`--version`, `install`, `run`, ...).
#[derive(Debug, Clone)]
pub enum Reply {
    Output(CommandOutput),
    NotFound,
    SpawnError(String),
}

/// Process runtime that records every call and answers from a table.
#[derive(Debug, Default)]
pub struct StubRuntime {
    replies: HashMap<String, Reply>,
    calls: RefCell<Vec<Call>>,
}

impl StubRuntime {
    /// Every known subcommand succeeds with empty output.
    pub fn healthy() -> Self {
        Self::default()
            .reply("--version", Reply::Output(CommandOutput::new(Some(0), "Poetry (version 1.8.3)\n")))
            .reply("install", Reply::Output(CommandOutput::new(Some(0), "")))
            .reply("run", Reply::Output(CommandOutput::new(Some(0), "")))
    }

    pub fn reply(mut self, first_arg: &str, reply: Reply) -> Self {
        self.replies.insert(first_arg.to_string(), reply);
        self
    }

    pub fn exit(self, first_arg: &str, code: i32, output: &str) -> Self {
        self.reply(first_arg, Reply::Output(CommandOutput::new(Some(code), output)))
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    pub fn calls_starting_with(&self, first_arg: &str) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| c.args.first().map(String::as_str) == Some(first_arg))
            .collect()
    }
}

impl ProcessRuntime for StubRuntime {
    fn run(&self, program: &str, args: &[String], cwd: &Path) -> anyhow::Result<CommandOutput> {
        self.calls.borrow_mut().push(Call {
            program: program.to_string(),
            args: args.to_vec(),
            cwd: cwd.to_path_buf(),
            process_cwd: std::env::current_dir().unwrap_or_default(),
        });
        let key = args.first().cloned().unwrap_or_default();
        match self.replies.get(&key) {
            Some(Reply::Output(out)) => Ok(out.clone()),
            Some(Reply::NotFound) => Err(anyhow::Error::new(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("{program} not found in PATH"),
            ))),
            Some(Reply::SpawnError(msg)) => Err(anyhow::anyhow!("{msg}")),
            None => Err(anyhow::anyhow!("unexpected command: {program} {args:?}")),
        }
    }
}

/// How `StubVcs::clone_repo` behaves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloneBehavior {
    /// Create the directory with a `.git` marker; report AlreadyExists when present.
    Materialize,
    /// Report success without touching the filesystem.
    Pretend,
    Fail(String),
}

/// Version-control provider that records clones and refreshes.
#[derive(Debug)]
pub struct StubVcs {
    behavior: CloneBehavior,
    refresh_error: Option<String>,
    pub clones: RefCell<Vec<(String, PathBuf)>>,
    pub refreshes: RefCell<Vec<PathBuf>>,
}

impl StubVcs {
    pub fn new(behavior: CloneBehavior) -> Self {
        Self {
            behavior,
            refresh_error: None,
            clones: RefCell::new(Vec::new()),
            refreshes: RefCell::new(Vec::new()),
        }
    }

    pub fn materializing() -> Self {
        Self::new(CloneBehavior::Materialize)
    }

    pub fn failing_refresh(mut self, msg: &str) -> Self {
        self.refresh_error = Some(msg.to_string());
        self
    }

    pub fn invocations(&self) -> usize {
        self.clones.borrow().len() + self.refreshes.borrow().len()
    }
}

impl VersionControl for StubVcs {
    fn clone_repo(&self, remote_url: &str, local_path: &Path) -> Result<(), VcsError> {
        self.clones
            .borrow_mut()
            .push((remote_url.to_string(), local_path.to_path_buf()));
        match &self.behavior {
            CloneBehavior::Materialize => {
                if local_path.join(".git").exists() {
                    return Err(VcsError::AlreadyExists(local_path.to_path_buf()));
                }
                fs::create_dir_all(local_path.join(".git"))
                    .map_err(|e| VcsError::Other(e.to_string()))
            }
            CloneBehavior::Pretend => Ok(()),
            CloneBehavior::Fail(msg) => Err(VcsError::Other(msg.clone())),
        }
    }

    fn refresh(&self, local_path: &Path) -> Result<(), VcsError> {
        self.refreshes.borrow_mut().push(local_path.to_path_buf());
        match &self.refresh_error {
            Some(msg) => Err(VcsError::Other(msg.clone())),
            None => Ok(()),
        }
    }
}

/// Fresh config rooted in `base/stage` running `script` from `https://example.test/proj.git`.
pub fn config_in(base: &Path, script: &[&str]) -> pungi::Config {
    let mut config = pungi::Config::new(
        "https://example.test/proj.git",
        script.iter().map(|s| s.to_string()).collect(),
    );
    config.staging_root = base.join("stage");
    config
}

/// True when a `git` executable is reachable through PATH.
pub fn have_git() -> bool {
    which::which("git").is_ok()
}

/// Run `git args...` in `dir`, asserting success.
pub fn git(dir: &Path, args: &[&str]) {
    let status = std::process::Command::new("git")
        .args(["-c", "user.name=Pungi Test", "-c", "user.email=pungi@example.test"])
        .args(args)
        .current_dir(dir)
        .status()
        .expect("spawn git");
    assert!(status.success(), "git {args:?} failed in {}", dir.display());
}

/// A local repository with one commit holding `files`; returns its path.
pub fn init_origin(base: &Path, files: &[(&str, &str)]) -> PathBuf {
    let origin = base.join("origin");
    fs::create_dir_all(&origin).expect("mkdir origin");
    git(&origin, &["init", "--quiet"]);
    for (name, content) in files {
        fs::write(origin.join(name), content).expect("write file");
    }
    git(&origin, &["add", "-A"]);
    git(&origin, &["commit", "--quiet", "-m", "init"]);
    origin
}

// Stands in for poetry: `run python X` executes X with sh once `install --sync` has run.
const FAKE_POETRY: &str = r#"#!/bin/sh
case "$1" in
  --version)
    echo "Poetry (version 1.8.3)"
    ;;
  install)
    [ "$2" = "--sync" ] || exit 64
    touch .synced
    echo "Installing dependencies from lock file"
    ;;
  run)
    [ "$2" = "python" ] || exit 64
    shift 2
    [ -f .synced ] || { echo "environment not synced" >&2; exit 65; }
    exec sh "$@"
    ;;
  *)
    exit 64
    ;;
esac
"#;

/// Write the poetry stand-in into `dir` as an executable and return its path.
#[cfg(unix)]
pub fn write_fake_poetry(dir: &Path) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join("fake-poetry");
    fs::write(&path, FAKE_POETRY).expect("write fake poetry");
    let mut perms = fs::metadata(&path).expect("stat").permissions();
    perms.set_mode(0o755);
    fs::set_permissions(&path, perms).expect("chmod");
    path
}

/// The pungi binary run from `dir`, with an empty config file and no PUNGI_* overrides.
pub fn pungi_cmd(dir: &Path) -> std::process::Command {
    let config = dir.join("empty.yml");
    fs::write(&config, "").expect("write config");
    let mut cmd = std::process::Command::new(env!("CARGO_BIN_EXE_pungi"));
    for (key, _) in std::env::vars() {
        if key.starts_with("PUNGI_") {
            cmd.env_remove(key);
        }
    }
    cmd.env("PUNGI_CONFIG", &config).current_dir(dir);
    cmd
}
