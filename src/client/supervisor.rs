//! One worker process under supervision: spawn, bounded wait, staged kill.
//!
//! Lifecycle is `Starting → Running → (Exited | Terminating → Exited)` and
//! never moves backwards. On timeout or cancellation the child gets an
//! interrupt signal, a grace period, a terminate signal, a second grace
//! period, then a forced kill, so total latency is bounded by
//! `timeout + interrupt_grace + terminate_grace` regardless of whether the
//! worker cooperates. The disposition is fixed the moment termination is
//! initiated: a child that exits cleanly during a grace period still reports
//! the timeout or cancellation that triggered it.

use std::env;
use std::ffi::OsString;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tokio::io::AsyncReadExt;
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Ambient variables a worker is allowed to inherit. Everything else is
/// scrubbed so the parent environment cannot redirect worker output paths.
const ENV_ALLOWLIST: &[&str] = &[
    "PATH",
    "HOME",
    "TMPDIR",
    "STEM_STUDIO_MODELS",
    "SystemRoot",
    "TEMP",
    "TMP",
];

/// Grace periods between the stages of the termination sequence.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct TerminationPolicy {
    pub interrupt_grace: Duration,
    pub terminate_grace: Duration,
}

impl Default for TerminationPolicy {
    fn default() -> Self {
        Self {
            interrupt_grace: Duration::from_secs(2),
            terminate_grace: Duration::from_secs(2),
        }
    }
}

/// Bounds on how much worker output is kept in memory.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureLimits {
    /// Stdout is the result document; past this it is truncated, not grown.
    pub stdout_max_bytes: usize,
    /// Stderr keeps only the final bytes, as a diagnostic tail.
    pub stderr_tail_bytes: usize,
}

impl Default for CaptureLimits {
    fn default() -> Self {
        Self { stdout_max_bytes: 4 * 1024 * 1024, stderr_tail_bytes: 64 * 1024 }
    }
}

/// Lifecycle of one supervised process, monotonic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum HandleState {
    Starting,
    Running,
    Terminating,
    Exited,
}

/// Supervisor-private view of one child process.
#[derive(Debug)]
struct ProcessHandle {
    pid: u32,
    started_at: Instant,
    state: HandleState,
}

impl ProcessHandle {
    fn new(pid: u32) -> Self {
        Self { pid, started_at: Instant::now(), state: HandleState::Starting }
    }

    fn advance(&mut self, next: HandleState) {
        assert!(next >= self.state, "handle state went backwards: {:?} -> {next:?}", self.state);
        self.state = next;
    }
}

/// How the wait ended. Fixed at termination time; never revised afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Completed(ExitStatus),
    TimedOut,
    Cancelled,
}

/// Collected results of one supervised run.
#[derive(Debug)]
pub struct ProcessOutput {
    pub disposition: Disposition,
    pub stdout: Vec<u8>,
    pub stdout_truncated: bool,
    pub stderr_tail: String,
    pub pid: u32,
    pub elapsed: Duration,
}

/// What to spawn and where.
#[derive(Debug, Clone)]
pub struct SpawnSpec {
    pub program: PathBuf,
    pub args: Vec<OsString>,
    pub workdir: PathBuf,
}

/// Run one worker process to completion, timeout or cancellation.
pub async fn run(
    spec: SpawnSpec,
    timeout: Duration,
    cancel: CancellationToken,
    policy: &TerminationPolicy,
    limits: &CaptureLimits,
) -> std::io::Result<ProcessOutput> {
    let mut command = Command::new(&spec.program);
    command
        .args(&spec.args)
        .current_dir(&spec.workdir)
        .env_clear()
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    for key in ENV_ALLOWLIST {
        if let Some(value) = env::var_os(key) {
            command.env(key, value);
        }
    }

    let mut child = command.spawn()?;
    let pid = child.id().unwrap_or(0);
    let mut handle = ProcessHandle::new(pid);
    debug!(program = %spec.program.display(), pid, "worker spawned");

    // Readers drain the pipes for the whole lifetime of the child so a
    // flooding worker can neither exhaust memory nor block on a full pipe.
    let stdout_task: JoinHandle<(Vec<u8>, bool)> = {
        let stream = child.stdout.take().expect("stdout was piped");
        let cap = limits.stdout_max_bytes;
        tokio::spawn(read_capped(stream, cap))
    };
    let stderr_task: JoinHandle<Vec<u8>> = {
        let stream = child.stderr.take().expect("stderr was piped");
        let keep = limits.stderr_tail_bytes;
        tokio::spawn(read_tail(stream, keep))
    };

    handle.advance(HandleState::Running);

    enum WaitOutcome {
        Exited(std::io::Result<ExitStatus>),
        DeadlineElapsed,
        CancelRequested,
    }

    let outcome = tokio::select! {
        status = child.wait() => WaitOutcome::Exited(status),
        () = sleep(timeout) => WaitOutcome::DeadlineElapsed,
        () = cancel.cancelled() => WaitOutcome::CancelRequested,
    };

    let disposition = match outcome {
        WaitOutcome::Exited(status) => Disposition::Completed(status?),
        WaitOutcome::DeadlineElapsed => {
            handle.advance(HandleState::Terminating);
            warn!(pid, ?timeout, "worker exceeded its budget, terminating");
            terminate_staged(&mut child, pid, policy).await;
            Disposition::TimedOut
        }
        WaitOutcome::CancelRequested => {
            handle.advance(HandleState::Terminating);
            debug!(pid, "cancellation requested, terminating worker");
            terminate_staged(&mut child, pid, policy).await;
            Disposition::Cancelled
        }
    };

    handle.advance(HandleState::Exited);

    let (stdout, stdout_truncated) = stdout_task.await.unwrap_or_default();
    let stderr_bytes = stderr_task.await.unwrap_or_default();

    Ok(ProcessOutput {
        disposition,
        stdout,
        stdout_truncated,
        stderr_tail: String::from_utf8_lossy(&stderr_bytes).into_owned(),
        pid: handle.pid,
        elapsed: handle.started_at.elapsed(),
    })
}

/// Interrupt, wait, terminate, wait, force-kill. Each stage is skipped if
/// the child is already gone.
async fn terminate_staged(child: &mut Child, pid: u32, policy: &TerminationPolicy) {
    #[cfg(unix)]
    {
        if signal_and_wait(child, pid, libc::SIGINT, policy.interrupt_grace).await {
            return;
        }
        if signal_and_wait(child, pid, libc::SIGTERM, policy.terminate_grace).await {
            return;
        }
    }
    #[cfg(not(unix))]
    {
        let _ = (pid, policy);
    }

    let _ = child.start_kill();
    let _ = child.wait().await;
    debug!(pid, "worker force-killed");
}

#[cfg(unix)]
async fn signal_and_wait(child: &mut Child, pid: u32, signal: i32, grace: Duration) -> bool {
    if matches!(child.try_wait(), Ok(Some(_))) {
        return true;
    }
    // SAFETY: pid refers to a child we spawned and have not yet reaped.
    unsafe {
        libc::kill(pid as i32, signal);
    }
    match tokio::time::timeout(grace, child.wait()).await {
        Ok(_) => {
            debug!(pid, signal, "worker exited within the grace period");
            true
        }
        Err(_) => false,
    }
}

/// Read a stream keeping at most `cap` bytes; keep draining past the cap.
async fn read_capped(mut stream: impl AsyncReadExt + Unpin, cap: usize) -> (Vec<u8>, bool) {
    let mut buf = Vec::new();
    let mut truncated = false;
    let mut chunk = [0u8; 8192];
    loop {
        match stream.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                if buf.len() < cap {
                    let take = n.min(cap - buf.len());
                    buf.extend_from_slice(&chunk[..take]);
                    if take < n {
                        truncated = true;
                    }
                } else {
                    truncated = true;
                }
            }
        }
    }
    (buf, truncated)
}

/// Read a stream keeping only the final `keep` bytes.
async fn read_tail(mut stream: impl AsyncReadExt + Unpin, keep: usize) -> Vec<u8> {
    let mut buf: Vec<u8> = Vec::new();
    let mut chunk = [0u8; 8192];
    loop {
        match stream.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                buf.extend_from_slice(&chunk[..n]);
                if buf.len() > keep {
                    let excess = buf.len() - keep;
                    buf.drain(..excess);
                }
            }
        }
    }
    buf
}
