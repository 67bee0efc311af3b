//! Subprocess execution with a hard timeout.
//!
//! Every external tool call (ffmpeg, yt-dlp, fpcalc) goes through here so a
//! wedged tool can only ever stall one operation, never the whole run.

use anyhow::{bail, Context, Result};
use crossbeam_channel::bounded;
use std::process::{Command, Output, Stdio};
use std::thread;
use std::time::Duration;

/// Runs a command to completion, killing it if the timeout elapses.
pub fn run_with_timeout(mut command: Command, timeout: Duration, label: &str) -> Result<Output> {
    command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    let child = command
        .spawn()
        .with_context(|| format!("failed to start {label}"))?;
    let pid = child.id();

    let (tx, rx) = bounded(1);
    thread::spawn(move || {
        let _ = tx.send(child.wait_with_output());
    });

    match rx.recv_timeout(timeout) {
        Ok(outcome) => outcome.with_context(|| format!("failed to wait for {label}")),
        Err(_) => {
            // The waiter thread owns the child handle, so signal by pid and
            // let the thread reap it.
            let _ = Command::new("kill")
                .arg("-KILL")
                .arg(pid.to_string())
                .output();
            let _ = rx.recv_timeout(Duration::from_secs(5));
            bail!("{label} timed out after {}s", timeout.as_secs())
        }
    }
}

/// Last `max` bytes of a tool's stderr, lossily decoded. Tools like ffmpeg
/// bury the useful line at the bottom of pages of banner output.
pub fn tail_of(bytes: &[u8], max: usize) -> String {
    let start = bytes.len().saturating_sub(max);
    String::from_utf8_lossy(&bytes[start..]).trim().to_string()
}
