//! Termination signals during a run.
//!
//! SIGINT, SIGTERM and SIGHUP are recorded and forwarded to the process group of the command
//! currently running. The command dies, its stage fails the ordinary way, and
//! `Orchestrator::run` removes the staging root before `main` exits with `128 + signal`.
use std::sync::atomic::{AtomicI32, Ordering};

#[cfg(unix)]
use nix::sys::signal::{self, SaFlags, SigAction, SigHandler, SigSet, Signal};
#[cfg(unix)]
use nix::unistd::Pid;

// First termination signal received, 0 while none.
static PENDING: AtomicI32 = AtomicI32::new(0);
// Process group of the running child, 0 while none.
static CHILD_PGID: AtomicI32 = AtomicI32::new(0);

#[cfg(unix)]
extern "C" fn handle_termination(sig: i32) {
    let _ = PENDING.compare_exchange(0, sig, Ordering::SeqCst, Ordering::SeqCst);
    forward(sig);
}

#[cfg(unix)]
fn forward(sig: i32) {
    let pgid = CHILD_PGID.load(Ordering::SeqCst);
    if pgid <= 0 {
        return;
    }
    if let Ok(signal) = Signal::try_from(sig) {
        let _ = signal::killpg(Pid::from_raw(pgid), signal);
    }
}

/// Install the handlers. Only `main` calls this, right before the pipeline starts.
#[cfg(unix)]
pub fn install_handlers() {
    let action = SigAction::new(
        SigHandler::Handler(handle_termination),
        SaFlags::SA_RESTART,
        SigSet::empty(),
    );
    for sig in [Signal::SIGINT, Signal::SIGTERM, Signal::SIGHUP] {
        // SAFETY: the handler only touches atomics and calls killpg(2), which is
        // async-signal-safe.
        if let Err(e) = unsafe { signal::sigaction(sig, &action) } {
            tracing::warn!("could not install {sig} handler: {e}");
        }
    }
}

#[cfg(not(unix))]
pub fn install_handlers() {}

/// The termination signal received so far, if any.
pub fn pending() -> Option<i32> {
    match PENDING.load(Ordering::SeqCst) {
        0 => None,
        sig => Some(sig),
    }
}

/// Registration of a spawned child as the target for forwarded signals.
///
/// The child must lead its own process group. Dropping the registration clears the target.
pub(crate) struct ChildGuard(());

impl ChildGuard {
    pub(crate) fn register(pid: u32) -> Self {
        CHILD_PGID.store(i32::try_from(pid).unwrap_or(0), Ordering::SeqCst);
        // A signal that landed between spawn and registration was not forwarded yet.
        #[cfg(unix)]
        if let Some(sig) = pending() {
            forward(sig);
        }
        ChildGuard(())
    }
}

impl Drop for ChildGuard {
    fn drop(&mut self) {
        CHILD_PGID.store(0, Ordering::SeqCst);
    }
}

/// SIGKILL the whole process group led by `pid` so grandchildren holding the output pipe
/// die with it.
#[cfg(unix)]
pub(crate) fn kill_group(pid: u32) -> bool {
    match i32::try_from(pid) {
        Ok(pgid) => signal::killpg(Pid::from_raw(pgid), Signal::SIGKILL).is_ok(),
        Err(_) => false,
    }
}
