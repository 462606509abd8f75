//! Single-check execution: shell spawn, output capture, watchdog timeout.
//!
//! Each invocation is independent; nothing is shared between concurrent
//! checks. All failure modes resolve into an [`ExecutionResult`] — this
//! module never panics and never returns an error to the caller.
//!
//! Timeout escalation: when the effective timeout elapses the child gets
//! SIGTERM; if it is still alive [`KILL_GRACE_MS`] later it gets SIGKILL.
//! The poll loop asks `try_wait` before comparing deadlines, so a process
//! observed exited in the same tick as the deadline counts as a normal exit,
//! never as a timeout.

use std::io::Read;
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

/// Grace period between SIGTERM and SIGKILL, fixed.
pub const KILL_GRACE_MS: u64 = 2000;

const POLL_INTERVAL: Duration = Duration::from_millis(20);

// After the child exits its remaining pipe output is already buffered, so
// readers normally finish within a tick. A backgrounded grandchild that
// inherited the pipes keeps them open indefinitely; readers still alive
// past this window are detached rather than waited on.
const READER_LINGER_MS: u64 = 250;

/// Outcome of one check's command, resolved exactly once.
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    /// True iff the process exited 0 and spawning succeeded.
    pub success: bool,
    /// Combined stdout+stderr in arrival order, trimmed.
    pub output: String,
    /// Exit code, or None when killed before exit or never spawned.
    pub exit_code: Option<i32>,
    /// Terminating signal name, when the process was killed.
    pub signal: Option<String>,
    /// Watchdog fired, or the process died to SIGTERM/SIGKILL.
    pub timed_out: bool,
    /// Wall-clock time from spawn to resolution, in milliseconds.
    pub duration_ms: u64,
}

/// Run one shell command to completion or timeout, from `cwd`.
pub fn run_command(command: &str, timeout_ms: u64, cwd: &Path) -> ExecutionResult {
    let started = Instant::now();

    let mut child = match shell_command(command)
        .current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
    {
        Ok(child) => child,
        Err(e) => {
            return ExecutionResult {
                success: false,
                output: format!("Failed to spawn command: {e}"),
                exit_code: None,
                signal: None,
                timed_out: false,
                duration_ms: elapsed_ms(started),
            };
        }
    };

    let buffer = Arc::new(Mutex::new(String::new()));
    let mut readers = Vec::new();
    if let Some(stdout) = child.stdout.take() {
        readers.push(spawn_reader(stdout, Arc::clone(&buffer)));
    }
    if let Some(stderr) = child.stderr.take() {
        readers.push(spawn_reader(stderr, Arc::clone(&buffer)));
    }

    let deadline = started + Duration::from_millis(timeout_ms);
    let mut timed_out = false;
    let mut term_sent_at: Option<Instant> = None;

    let status: Option<ExitStatus> = loop {
        match child.try_wait() {
            Ok(Some(status)) => break Some(status),
            Ok(None) => {
                let now = Instant::now();
                if !timed_out && now >= deadline {
                    timed_out = true;
                    term_sent_at = Some(now);
                    send_term(&mut child);
                } else if let Some(term_at) = term_sent_at {
                    if now.duration_since(term_at) >= Duration::from_millis(KILL_GRACE_MS) {
                        let _ = child.kill();
                        term_sent_at = None;
                    }
                }
                thread::sleep(POLL_INTERVAL);
            }
            Err(_) => {
                let _ = child.kill();
                break child.wait().ok();
            }
        }
    };

    let reader_deadline = Instant::now() + Duration::from_millis(READER_LINGER_MS);
    for handle in readers {
        while !handle.is_finished() && Instant::now() < reader_deadline {
            thread::sleep(POLL_INTERVAL);
        }
        if handle.is_finished() {
            let _ = handle.join();
        }
    }

    let output = match buffer.lock() {
        Ok(buf) => buf.trim().to_string(),
        Err(poisoned) => poisoned.into_inner().trim().to_string(),
    };

    let exit_code = status.as_ref().and_then(ExitStatus::code);
    let signal = status.as_ref().and_then(signal_name);
    let timed_out =
        timed_out || matches!(signal.as_deref(), Some("SIGTERM") | Some("SIGKILL"));

    ExecutionResult {
        success: exit_code == Some(0),
        output,
        exit_code,
        signal,
        timed_out,
        duration_ms: elapsed_ms(started),
    }
}

fn shell_command(command: &str) -> Command {
    #[cfg(windows)]
    {
        let mut cmd = Command::new("cmd");
        cmd.arg("/c").arg(command);
        cmd
    }
    #[cfg(not(windows))]
    {
        let mut cmd = Command::new("/bin/sh");
        cmd.arg("-c").arg(command);
        cmd
    }
}

fn spawn_reader(
    mut source: impl Read + Send + 'static,
    buffer: Arc<Mutex<String>>,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let mut chunk = [0u8; 4096];
        loop {
            match source.read(&mut chunk) {
                Ok(0) | Err(_) => break,
                Ok(n) => {
                    let text = String::from_utf8_lossy(&chunk[..n]).into_owned();
                    match buffer.lock() {
                        Ok(mut buf) => buf.push_str(&text),
                        Err(poisoned) => poisoned.into_inner().push_str(&text),
                    }
                }
            }
        }
    })
}

#[cfg(unix)]
fn send_term(child: &mut Child) {
    // SIGTERM first so the command can clean up; Child::kill is SIGKILL.
    let pid = child.id() as libc::pid_t;
    let rc = unsafe { libc::kill(pid, libc::SIGTERM) };
    if rc != 0 {
        let _ = child.kill();
    }
}

#[cfg(not(unix))]
fn send_term(child: &mut Child) {
    let _ = child.kill();
}

#[cfg(unix)]
fn signal_name(status: &ExitStatus) -> Option<String> {
    use std::os::unix::process::ExitStatusExt;
    status.signal().map(|sig| match sig {
        libc::SIGTERM => "SIGTERM".to_string(),
        libc::SIGKILL => "SIGKILL".to_string(),
        libc::SIGINT => "SIGINT".to_string(),
        other => format!("SIG{other}"),
    })
}

#[cfg(not(unix))]
fn signal_name(_status: &ExitStatus) -> Option<String> {
    None
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}
