//! Subprocess execution with a hard deadline.

use std::io::Read;
use std::process::{Command, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use crate::error::{DashError, Result};

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Captured result of a finished command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

/// Run `command` to completion, killing it if it outlives `timeout`.
///
/// Spawn failures are returned as `DashError::Io` so callers can tell a
/// missing binary apart from a hung one (`DashError::Timeout`). The
/// deadline also covers draining the pipes, which stay open while any
/// background grandchild holds them.
pub fn run_with_timeout(command: &mut Command, timeout: Duration) -> Result<CommandOutput> {
    let mut child = command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()?;

    // Drain pipes on their own threads so a chatty child cannot block on a full pipe.
    let stdout = child.stdout.take().map(spawn_reader);
    let stderr = child.stderr.take().map(spawn_reader);

    let deadline = Instant::now() + timeout;
    let status = loop {
        if let Some(status) = child.try_wait()? {
            break status;
        }
        if Instant::now() >= deadline {
            let _ = child.kill();
            let _ = child.wait();
            return Err(DashError::timeout(describe(command), timeout));
        }
        thread::sleep(POLL_INTERVAL);
    };

    Ok(CommandOutput {
        success: status.success(),
        stdout: collect_reader(stdout, deadline, command, timeout)?,
        stderr: collect_reader(stderr, deadline, command, timeout)?,
    })
}

fn spawn_reader<R: Read + Send + 'static>(mut pipe: R) -> Receiver<String> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = pipe.read_to_end(&mut buf);
        let _ = tx.send(String::from_utf8_lossy(&buf).into_owned());
    });
    rx
}

/// Wait for a reader until `deadline`. A reader still blocked past it is
/// left detached; it exits once the last writer closes the pipe.
fn collect_reader(
    reader: Option<Receiver<String>>,
    deadline: Instant,
    command: &Command,
    timeout: Duration,
) -> Result<String> {
    let Some(rx) = reader else {
        return Ok(String::new());
    };
    match rx.recv_timeout(deadline.saturating_duration_since(Instant::now())) {
        Ok(text) => Ok(text),
        Err(RecvTimeoutError::Timeout) => Err(DashError::timeout(describe(command), timeout)),
        Err(RecvTimeoutError::Disconnected) => Ok(String::new()),
    }
}

fn describe(command: &Command) -> String {
    let mut parts = vec![command.get_program().to_string_lossy().into_owned()];
    parts.extend(command.get_args().map(|a| a.to_string_lossy().into_owned()));
    parts.join(" ")
}
