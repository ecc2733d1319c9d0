// Copyright (C) 2026 Checkmk GmbH - License: GNU General Public License v2
// This file is part of Checkmk (https://checkmk.com). It is subject to the terms and
// conditions defined in the file COPYING, which is part of this source code package.

//! Runs external tools with a bounded timeout and captures their output.

use std::io::Read;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::JoinHandle;
use std::time::Duration;
use thiserror::Error;
use wait_timeout::ChildExt;

/// Longest stderr excerpt kept in error messages.
const STDERR_EXCERPT_LEN: usize = 512;

pub type ProcessResult<T> = std::result::Result<T, ProcessError>;

/// Errors that can occur while running an external tool.
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("Command not found: {command}")]
    NotFound { command: String },
    #[error("Command failed: {command}")]
    Failed {
        command: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Command timed out after {timeout:?}: {command}")]
    Timeout { command: String, timeout: Duration },
    #[error("Command exited with status {code}: {command}: {stderr}")]
    ExitStatus {
        command: String,
        code: i32,
        stderr: String,
    },
}

/// Wait for a child process to complete with a timeout.
///
/// If the timeout is reached, the process is killed and reaped.
fn wait_with_timeout(
    child: &mut Child,
    timeout: Duration,
    command: &str,
) -> ProcessResult<ExitStatus> {
    if let Some(status) = child
        .wait_timeout(timeout)
        .map_err(|e| ProcessError::Failed {
            command: command.to_string(),
            source: e,
        })?
    {
        if status.code().is_some() {
            Ok(status)
        } else {
            Err(ProcessError::Failed {
                command: command.to_string(),
                source: std::io::Error::other("Process terminated by signal"),
            })
        }
    } else {
        // Timeout has been reached - kill the process
        let _ = child.kill();
        let _ = child.wait();
        Err(ProcessError::Timeout {
            command: command.to_string(),
            timeout,
        })
    }
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> JoinHandle<String> {
    std::thread::spawn(move || {
        let mut buffer = Vec::new();
        if let Some(mut pipe) = pipe {
            let _ = pipe.read_to_end(&mut buffer);
        }
        String::from_utf8_lossy(&buffer).into_owned()
    })
}

/// Run `command` and return its stdout.
///
/// Both pipes are drained on helper threads so a chatty tool cannot block on a
/// full pipe while we wait for it. A non-zero exit status is an error carrying
/// an excerpt of stderr.
///
/// # Errors
/// Returns an error if the command cannot be spawned, times out, is killed by a
/// signal or exits with a non-zero status.
pub(crate) fn run_with_timeout(mut command: Command, timeout: Duration) -> ProcessResult<String> {
    let name = command.get_program().to_string_lossy().into_owned();
    let mut child = command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ProcessError::NotFound {
                    command: name.clone(),
                }
            } else {
                ProcessError::Failed {
                    command: name.clone(),
                    source: e,
                }
            }
        })?;

    let stdout = drain(child.stdout.take());
    let stderr = drain(child.stderr.take());

    // On timeout the reader threads are left detached: grandchildren may still hold the pipes.
    let status = wait_with_timeout(&mut child, timeout, &name)?;

    let stdout = stdout.join().unwrap_or_default();
    if status.success() {
        return Ok(stdout);
    }
    let stderr = stderr.join().unwrap_or_default();
    let mut excerpt = stderr.trim().to_string();
    if excerpt.len() > STDERR_EXCERPT_LEN {
        let mut cut = STDERR_EXCERPT_LEN;
        while !excerpt.is_char_boundary(cut) {
            cut -= 1;
        }
        excerpt.truncate(cut);
    }
    Err(ProcessError::ExitStatus {
        command: name,
        code: status.code().unwrap_or(-1),
        stderr: excerpt,
    })
}
