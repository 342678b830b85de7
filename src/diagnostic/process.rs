//! Process supervision for spawned diagnostic tools
//!
//! One supervision task owns the child and reports its exit; two pump tasks
//! turn stdout and stderr into lossily-decoded lines.

use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::types::CommandSpec;
use crate::error::{ProbeError, Result};

/// Exit code reported when the process was killed or died from a signal
pub const KILLED_EXIT_CODE: i32 = -1;

/// Lines buffered per stream before the pump waits on the consumer
const LINE_BUFFER: usize = 256;

/// How long a SIGTERM'd process gets before it is force-killed
const TERMINATE_GRACE: Duration = Duration::from_secs(2);

// ============================================================================
// Types
// ============================================================================

/// How a supervised process ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessExit {
    Exited(i32),
    /// Terminated through [`ProcessHandle::kill`]
    Killed,
}

impl ProcessExit {
    pub fn code(&self) -> i32 {
        match self {
            Self::Exited(code) => *code,
            Self::Killed => KILLED_EXIT_CODE,
        }
    }

    pub fn success(&self) -> bool {
        matches!(self, Self::Exited(0))
    }

    fn from_status(status: ExitStatus) -> Self {
        Self::Exited(status.code().unwrap_or(KILLED_EXIT_CODE))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    Stdout,
    Stderr,
}

/// One line of process output tagged with its source stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLine {
    pub stream: StreamKind,
    pub text: String,
}

/// A running diagnostic process, exclusively owned by one pipeline
pub struct ProcessHandle {
    pid: Option<u32>,
    stdout: mpsc::Receiver<String>,
    stderr: mpsc::Receiver<String>,
    stdout_open: bool,
    stderr_open: bool,
    exit_rx: Option<oneshot::Receiver<ProcessExit>>,
    exit: Option<ProcessExit>,
    kill: CancellationToken,
}

// ============================================================================
// Spawning
// ============================================================================

/// Spawn a command with piped stdout/stderr.
///
/// Fails with [`ProbeError::Spawn`] when the OS refuses to start the executable.
pub fn spawn(spec: &CommandSpec) -> Result<ProcessHandle> {
    let mut command = Command::new(&spec.executable);

    // cmd /c needs its command line untouched by argument quoting
    #[cfg(windows)]
    {
        for arg in &spec.arguments {
            command.raw_arg(arg);
        }
    }
    #[cfg(not(windows))]
    {
        command.args(&spec.arguments);
    }

    command
        .envs(&spec.environment)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = command
        .spawn()
        .map_err(|e| ProbeError::spawn(&spec.executable, e))?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| ProbeError::spawn(&spec.executable, "stdout was not captured"))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| ProbeError::spawn(&spec.executable, "stderr was not captured"))?;

    let pid = child.id();
    debug!(pid = ?pid, command = %spec.command_line(), "Spawned diagnostic process");

    let (stdout_tx, stdout_rx) = mpsc::channel(LINE_BUFFER);
    let (stderr_tx, stderr_rx) = mpsc::channel(LINE_BUFFER);
    tokio::spawn(pump_lines(stdout, stdout_tx));
    tokio::spawn(pump_lines(stderr, stderr_tx));

    let kill = CancellationToken::new();
    let (exit_tx, exit_rx) = oneshot::channel();
    tokio::spawn(supervise(child, kill.clone(), exit_tx));

    Ok(ProcessHandle {
        pid,
        stdout: stdout_rx,
        stderr: stderr_rx,
        stdout_open: true,
        stderr_open: true,
        exit_rx: Some(exit_rx),
        exit: None,
        kill,
    })
}

/// Read newline-delimited output, replacing malformed UTF-8
async fn pump_lines<R>(source: R, tx: mpsc::Sender<String>)
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(source);
    let mut buf = Vec::new();

    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                let decoded = String::from_utf8_lossy(&buf);
                let line = decoded.trim_end_matches(['\r', '\n']).to_string();
                if tx.send(line).await.is_err() {
                    debug!("Output receiver dropped, stopping pump");
                    break;
                }
            }
            Err(e) => {
                warn!(error = %e, "Failed to read process output");
                break;
            }
        }
    }
}

/// Own the child until it exits or a kill is requested
async fn supervise(
    mut child: Child,
    kill: CancellationToken,
    exit_tx: oneshot::Sender<ProcessExit>,
) {
    let exit = tokio::select! {
        status = child.wait() => match status {
            Ok(status) => ProcessExit::from_status(status),
            Err(e) => {
                warn!(error = %e, "Failed to wait on diagnostic process");
                ProcessExit::Exited(KILLED_EXIT_CODE)
            }
        },
        _ = kill.cancelled() => {
            terminate(&mut child).await;
            ProcessExit::Killed
        }
    };

    debug!(exit_code = exit.code(), "Diagnostic process finished");
    let _ = exit_tx.send(exit);
}

async fn terminate(child: &mut Child) {
    if request_termination(child).await
        && tokio::time::timeout(TERMINATE_GRACE, child.wait()).await.is_ok()
    {
        return;
    }

    if let Err(e) = child.start_kill() {
        debug!(error = %e, "Process already gone when force-killing");
    }
    let _ = child.wait().await;
}

/// Send SIGTERM; `false` when the signal could not be delivered
#[cfg(unix)]
async fn request_termination(child: &Child) -> bool {
    let Some(pid) = child.id() else {
        return false;
    };
    // SAFETY: the pid belongs to our child, which has not been reaped yet
    // because `child.id()` still returned it.
    let rc = unsafe { libc::kill(pid as libc::pid_t, libc::SIGTERM) };
    rc == 0
}

/// The child is `cmd.exe`; killing only it would leave ping/tracert running,
/// so the whole tree goes through `taskkill /T`
#[cfg(windows)]
async fn request_termination(child: &Child) -> bool {
    let Some(pid) = child.id() else {
        return false;
    };
    let spec = tree_kill_command(pid);
    let status = Command::new(&spec.executable)
        .args(&spec.arguments)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await;

    match status {
        Ok(status) => status.success(),
        Err(e) => {
            warn!(error = %e, pid, "taskkill failed");
            false
        }
    }
}

#[cfg(not(any(unix, windows)))]
async fn request_termination(_child: &Child) -> bool {
    false
}

/// `taskkill` invocation that force-kills `pid` and all of its descendants
#[cfg_attr(not(windows), allow(dead_code))]
fn tree_kill_command(pid: u32) -> CommandSpec {
    CommandSpec::new("taskkill")
        .arg("/T")
        .arg("/F")
        .arg("/PID")
        .arg(pid.to_string())
}

// ============================================================================
// Handle
// ============================================================================

impl ProcessHandle {
    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// Standard output lines, consumable independently of stderr
    pub fn stdout(&mut self) -> &mut mpsc::Receiver<String> {
        &mut self.stdout
    }

    /// Standard error lines, consumable independently of stdout
    pub fn stderr(&mut self) -> &mut mpsc::Receiver<String> {
        &mut self.stderr
    }

    /// Next line from either stream in arrival order; `None` once both are drained
    pub async fn next_line(&mut self) -> Option<OutputLine> {
        loop {
            if !self.stdout_open && !self.stderr_open {
                return None;
            }

            tokio::select! {
                line = self.stdout.recv(), if self.stdout_open => match line {
                    Some(text) => return Some(OutputLine { stream: StreamKind::Stdout, text }),
                    None => self.stdout_open = false,
                },
                line = self.stderr.recv(), if self.stderr_open => match line {
                    Some(text) => return Some(OutputLine { stream: StreamKind::Stderr, text }),
                    None => self.stderr_open = false,
                },
            }
        }
    }

    /// Request termination. Idempotent, and a no-op after the process exited.
    pub fn kill(&self) {
        if !self.kill.is_cancelled() {
            debug!(pid = ?self.pid, "Kill requested for diagnostic process");
            self.kill.cancel();
        }
    }

    /// Wait for the exit notification. Resolves immediately once observed.
    pub async fn wait(&mut self) -> ProcessExit {
        if let Some(exit) = self.exit {
            return exit;
        }

        let exit = match self.exit_rx.take() {
            Some(rx) => rx.await.unwrap_or(ProcessExit::Killed),
            None => ProcessExit::Killed,
        };
        self.exit = Some(exit);
        exit
    }
}

impl Drop for ProcessHandle {
    fn drop(&mut self) {
        // The supervisor owns the child; make sure it never outlives its handle
        if self.exit.is_none() {
            self.kill.cancel();
        }
    }
}
