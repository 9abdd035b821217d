use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("failed to start {}: {source}", .program.display())]
    Spawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error while talking to {}: {source}", .program.display())]
    Io {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{} timed out after {:.1}s and was killed", .program.display(), .after.as_secs_f64())]
    TimedOut { program: PathBuf, after: Duration },
}

/// Everything a finished child process produced.
#[derive(Debug)]
pub struct ProcessOutput {
    pub status: ExitStatus,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl ProcessOutput {
    pub fn stderr_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stderr).trim().to_string()
    }
}

/// Run `program`, feeding `input` on stdin while stdout and stderr are drained
/// concurrently.
///
/// The child is spawned with `kill_on_drop`, so it is terminated both when
/// `limit` elapses and when the calling future is dropped.
pub async fn run_with_input(
    program: &Path,
    args: &[String],
    input: &[u8],
    limit: Duration,
) -> Result<ProcessOutput, ProcessError> {
    let io_err = |source| ProcessError::Io {
        program: program.to_path_buf(),
        source,
    };

    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|source| ProcessError::Spawn {
            program: program.to_path_buf(),
            source,
        })?;

    let mut stdin = child
        .stdin
        .take()
        .ok_or_else(|| io_err(std::io::Error::other("stdin was not captured")))?;

    let feed = async move {
        let result = stdin.write_all(input).await;
        drop(stdin);
        match result {
            // The child may exit without reading everything; its exit status decides.
            Err(e) if e.kind() == ErrorKind::BrokenPipe => Ok(()),
            other => other,
        }
    };

    let run = async { tokio::join!(feed, child.wait_with_output()) };

    match tokio::time::timeout(limit, run).await {
        Ok((fed, output)) => {
            let output = output.map_err(io_err)?;
            if let Err(e) = fed
                && output.status.success()
            {
                return Err(io_err(e));
            }
            debug!(
                program = %program.display(),
                status = %output.status,
                stdout_bytes = output.stdout.len(),
                stderr_bytes = output.stderr.len(),
                "Child process finished"
            );
            Ok(ProcessOutput {
                status: output.status,
                stdout: output.stdout,
                stderr: output.stderr,
            })
        }
        Err(_) => Err(ProcessError::TimedOut {
            program: program.to_path_buf(),
            after: limit,
        }),
    }
}
