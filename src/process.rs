//! Bounded execution of external programs.
//!
//! `std::process::Command` has no deadline support, so the child is polled with `try_wait`
//! while two reader threads drain stdout and stderr (draining avoids pipe deadlocks on large
//! output). The readers hand their buffers back over channels and are waited on only until
//! the same deadline, since a grandchild that inherited the pipes can keep them open after
//! the child exits. On unix the child leads its own process group and the whole group is
//! killed on expiry.

use std::io::{self, Read};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(10);

#[derive(Debug)]
pub struct Captured {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    /// `None` when the deadline expired and the child was killed.
    pub status: Option<ExitStatus>,
    pub elapsed: Duration,
}

impl Captured {
    fn expired(start: Instant) -> Self {
        Self {
            stdout: Vec::new(),
            stderr: Vec::new(),
            status: None,
            elapsed: start.elapsed(),
        }
    }

    pub fn timed_out(&self) -> bool {
        self.status.is_none()
    }

    pub fn success(&self) -> bool {
        self.status.map(|status| status.success()).unwrap_or(false)
    }

    /// Stdout followed by stderr, lossily decoded.
    pub fn combined(&self) -> String {
        let mut bytes = Vec::with_capacity(self.stdout.len() + self.stderr.len());
        bytes.extend_from_slice(&self.stdout);
        bytes.extend_from_slice(&self.stderr);
        String::from_utf8_lossy(&bytes).into_owned()
    }

    pub fn stdout_text(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    pub fn stderr_text(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }

    pub fn describe_status(&self) -> String {
        match self.status {
            Some(status) => match status.code() {
                Some(code) => format!("exit status {code}"),
                None => "terminated by signal".to_string(),
            },
            None => format!("timed out after {}s", self.elapsed.as_secs()),
        }
    }
}

/// Run `cmd` to completion or until `timeout` elapses.
///
/// The deadline covers both the child and the draining of its output. Spawn errors are
/// returned unchanged so callers can tell `NotFound` apart.
pub fn run_with_timeout(mut cmd: Command, timeout: Duration) -> io::Result<Captured> {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        cmd.process_group(0);
    }
    let start = Instant::now();
    let deadline = start + timeout;
    let mut child = cmd.spawn()?;

    let stdout_reader = child.stdout.take().map(drain);
    let stderr_reader = child.stderr.take().map(drain);

    let status = loop {
        if let Some(status) = child.try_wait()? {
            break status;
        }
        if Instant::now() >= deadline {
            kill_tree(&mut child);
            return Ok(Captured::expired(start));
        }
        thread::sleep(POLL_INTERVAL);
    };

    let stdout = collect(stdout_reader, deadline);
    let stderr = collect(stderr_reader, deadline);
    let (Some(stdout), Some(stderr)) = (stdout, stderr) else {
        // The child exited but something it spawned still holds the pipes.
        kill_group(child.id());
        return Ok(Captured::expired(start));
    };

    Ok(Captured {
        stdout,
        stderr,
        status: Some(status),
        elapsed: start.elapsed(),
    })
}

fn drain<R: Read + Send + 'static>(mut reader: R) -> Receiver<Vec<u8>> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = reader.read_to_end(&mut buf);
        let _ = tx.send(buf);
    });
    rx
}

/// The drained buffer, or `None` when the deadline passed first.
fn collect(reader: Option<Receiver<Vec<u8>>>, deadline: Instant) -> Option<Vec<u8>> {
    let Some(reader) = reader else {
        return Some(Vec::new());
    };
    match reader.recv_timeout(deadline.saturating_duration_since(Instant::now())) {
        Ok(buf) => Some(buf),
        Err(RecvTimeoutError::Disconnected) => Some(Vec::new()),
        Err(RecvTimeoutError::Timeout) => None,
    }
}

fn kill_tree(child: &mut Child) {
    kill_group(child.id());
    let _ = child.kill();
    let _ = child.wait();
}

#[cfg(unix)]
fn kill_group(pid: u32) {
    let _ = Command::new("kill")
        .arg("-KILL")
        .arg("--")
        .arg(format!("-{pid}"))
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status();
}

#[cfg(not(unix))]
fn kill_group(_pid: u32) {}
