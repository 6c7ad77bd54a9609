//! Child-process execution with a wall-clock timeout.
//!
//! Both the adb bridge and the VLM client shell out (`adb`, `curl`). Output
//! pipes are drained on reader threads so a chatty child cannot block on a
//! full pipe while we wait for it.

use std::io::{Read, Write};
use std::process::{Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use thiserror::Error;

/// How often an exiting child is polled once its stdout has closed
const WAIT_POLL: Duration = Duration::from_millis(10);

/// Captured result of a finished child process
#[derive(Debug)]
pub struct ProcessOutput {
    pub status: ExitStatus,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.status.success()
    }

    /// Trimmed stderr, falling back to stdout when stderr is empty
    pub fn diagnostic(&self) -> String {
        let stderr = String::from_utf8_lossy(&self.stderr).trim().to_string();
        if !stderr.is_empty() {
            return stderr;
        }
        let stdout = String::from_utf8_lossy(&self.stdout);
        stdout.trim().chars().take(300).collect()
    }
}

#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("failed to start '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Render a command line for logs and error messages
pub fn display_command(program: &str, args: &[String]) -> String {
    let mut line = program.to_string();
    for arg in args {
        line.push(' ');
        line.push_str(arg);
    }
    line
}

/// Run `program args...`, optionally feeding `stdin`, and kill it if it
/// outlives `timeout`.
pub fn run_with_timeout(
    program: &str,
    args: &[String],
    stdin: Option<Vec<u8>>,
    timeout: Duration,
) -> Result<ProcessOutput, ProcessError> {
    let mut child = Command::new(program)
        .args(args)
        .stdin(if stdin.is_some() { Stdio::piped() } else { Stdio::null() })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|source| ProcessError::Spawn {
            program: program.to_string(),
            source,
        })?;

    if let (Some(data), Some(mut pipe)) = (stdin, child.stdin.take()) {
        thread::spawn(move || {
            let _ = pipe.write_all(&data);
            // Dropping the pipe closes stdin so the child sees EOF
        });
    }

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| std::io::Error::other("failed to capture stdout"))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| std::io::Error::other("failed to capture stderr"))?;

    let stdout_rx = spawn_collector(stdout);
    let stderr_rx = spawn_collector(stderr);

    let start = Instant::now();
    let stdout = loop {
        let remaining = timeout.saturating_sub(start.elapsed());
        match stdout_rx.recv_timeout(remaining.max(Duration::from_millis(1))) {
            Ok(bytes) => break bytes?,
            Err(RecvTimeoutError::Timeout) => {
                if start.elapsed() >= timeout {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(ProcessError::Timeout(timeout));
                }
            }
            Err(RecvTimeoutError::Disconnected) => break Vec::new(),
        }
    };

    // A closed stdout does not mean the child has exited; keep the deadline
    let status = loop {
        if let Some(status) = child.try_wait()? {
            break status;
        }
        if start.elapsed() >= timeout {
            let _ = child.kill();
            let _ = child.wait();
            return Err(ProcessError::Timeout(timeout));
        }
        thread::sleep(WAIT_POLL);
    };

    // Grandchildren may still hold stderr open
    let stderr = stderr_rx
        .recv_timeout(Duration::from_secs(1))
        .ok()
        .and_then(Result::ok)
        .unwrap_or_default();

    Ok(ProcessOutput {
        status,
        stdout,
        stderr,
    })
}

fn spawn_collector<R: Read + Send + 'static>(
    mut reader: R,
) -> mpsc::Receiver<std::io::Result<Vec<u8>>> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut buffer = Vec::new();
        let result = reader.read_to_end(&mut buffer).map(|_| buffer);
        let _ = tx.send(result);
    });
    rx
}
