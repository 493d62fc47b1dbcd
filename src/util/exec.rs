use std::ffi::OsString;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{anyhow, bail, Context, Result};
use wait_timeout::ChildExt;

use crate::signals::{self, ChildGuard};

/// Structured command execution with optional timeouts and combined output capture.
#[derive(Debug, Clone)]
pub struct ExecService {
    default_timeout: Duration,
}

impl ExecService {
    /// A zero timeout waits for the child indefinitely.
    pub fn new(default_timeout: Duration) -> Self {
        Self { default_timeout }
    }

    pub fn run(&self, request: ExecRequest) -> Result<ExecOutput> {
        if let Some(sig) = signals::pending() {
            bail!(
                "not starting {:?}: interrupted by signal {sig}",
                request.program
            );
        }
        // Resolve through PATH first so a missing tool surfaces as io::ErrorKind::NotFound.
        let program = which::which(&request.program).map_err(|e| {
            anyhow::Error::new(io::Error::new(
                io::ErrorKind::NotFound,
                format!("{} not found in PATH: {e}", request.program.to_string_lossy()),
            ))
        })?;

        let mut cmd = Command::new(&program);
        cmd.args(&request.args);
        if let Some(ref cwd) = request.cwd {
            cmd.current_dir(cwd);
        }
        for (key, value) in &request.env {
            cmd.env(key, value);
        }
        // Own process group, so forwarded signals and timeouts reach grandchildren too.
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            cmd.process_group(0);
        }

        // stdout and stderr share one pipe so the output keeps its interleaving.
        let (mut reader, writer) = io::pipe().context("failed to create output pipe")?;
        let writer_err = writer
            .try_clone()
            .context("failed to duplicate output pipe")?;
        cmd.stdin(Stdio::null())
            .stdout(Stdio::from(writer))
            .stderr(Stdio::from(writer_err));

        let mut child = cmd.spawn().with_context(|| {
            format!(
                "failed to spawn {:?} with args {:?}",
                request.program, request.args
            )
        })?;
        let _registration = ChildGuard::register(child.id());
        // Release our copies of the pipe's write end; EOF arrives once the child exits.
        drop(cmd);

        let collector = thread::spawn(move || -> io::Result<Vec<u8>> {
            let mut buf = Vec::new();
            reader.read_to_end(&mut buf)?;
            Ok(buf)
        });

        let timeout = self.default_timeout;
        let started = Instant::now();
        let status = if timeout.is_zero() {
            child.wait().context("failed to wait for process")?
        } else {
            match child
                .wait_timeout(timeout)
                .context("failed to wait with timeout")?
            {
                Some(status) => status,
                None => {
                    #[cfg(unix)]
                    if !signals::kill_group(child.id()) {
                        let _ = child.kill();
                    }
                    #[cfg(not(unix))]
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(anyhow!(
                        "command {:?} timed out after {}",
                        request.program,
                        humantime::format_duration(timeout)
                    ));
                }
            }
        };
        let duration = started.elapsed();

        let bytes = collector
            .join()
            .map_err(|_| anyhow!("output reader thread panicked"))?
            .context("failed to read process output")?;
        let output = String::from_utf8_lossy(&bytes).into_owned();

        Ok(ExecOutput {
            status,
            duration,
            output,
        })
    }
}

impl Default for ExecService {
    fn default() -> Self {
        Self::new(Duration::ZERO)
    }
}

#[derive(Debug, Default)]
pub struct ExecRequest {
    program: OsString,
    args: Vec<OsString>,
    cwd: Option<PathBuf>,
    env: Vec<(OsString, OsString)>,
}

impl ExecRequest {
    pub fn new(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
            ..Self::default()
        }
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn cwd(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    pub fn env(mut self, key: impl Into<OsString>, value: impl Into<OsString>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }
}

#[derive(Debug)]
pub struct ExecOutput {
    pub status: std::process::ExitStatus,
    pub duration: Duration,
    /// Interleaved stdout and stderr.
    pub output: String,
}

/// True when the error chain bottoms out in io::ErrorKind::NotFound.
pub fn is_not_found(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        cause
            .downcast_ref::<io::Error>()
            .map(|e| e.kind() == io::ErrorKind::NotFound)
            .unwrap_or(false)
    })
}
