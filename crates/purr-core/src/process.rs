//! Child process execution with optional timeouts.
//!
//! Two flavours: [`run_streaming`] forwards the child's stdout/stderr to ours
//! as it arrives (installer scripts), [`run_captured`] collects them (git).
//! On Unix each child leads its own process group, and a timeout kills the
//! whole group so nothing the child spawned outlives it. Children are also
//! spawned with `kill_on_drop`.

use std::ffi::OsStr;
use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::process::{Child, Command};
use tracing::debug;

use crate::script::Invocation;

#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("failed to start '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("'{program}' exited with {}{}", describe(*status), stderr_suffix(stderr))]
    Failed {
        program: String,
        status: ExitStatus,
        stderr: String,
    },

    #[error("'{program}' timed out after {}s", after.as_secs())]
    TimedOut { program: String, after: Duration },

    #[error("I/O error while running '{program}': {source}")]
    Io {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

fn describe(status: ExitStatus) -> String {
    match status.code() {
        Some(code) => format!("exit code {code}"),
        None => "a signal".to_string(),
    }
}

fn stderr_suffix(stderr: &str) -> String {
    let trimmed = stderr.trim();
    if trimmed.is_empty() {
        String::new()
    } else {
        format!(": {trimmed}")
    }
}

/// Run `invocation` in `cwd`, streaming its output to our stdout/stderr.
pub async fn run_streaming(
    invocation: &Invocation,
    cwd: &Path,
    timeout: Option<Duration>,
) -> Result<(), ProcessError> {
    let program = invocation.program.to_string_lossy().into_owned();
    debug!(command = %invocation, cwd = %cwd.display(), "running");

    let mut child = spawn(&invocation.program, &invocation.args, &[], Some(cwd), &program)?;
    let stdout = child.stdout.take();
    let stderr = child.stderr.take();

    // Both pipes are drained concurrently so a chatty child cannot fill one
    // buffer and block forever.
    let out_task = stdout.map(|s| tokio::spawn(forward(s, tokio::io::stdout())));
    let err_task = stderr.map(|s| tokio::spawn(forward(s, tokio::io::stderr())));

    let status = wait(&mut child, timeout, &program).await?;

    for task in [out_task, err_task].into_iter().flatten() {
        let _ = task.await;
    }

    if status.success() {
        Ok(())
    } else {
        Err(ProcessError::Failed {
            program,
            status,
            stderr: String::new(),
        })
    }
}

/// Captured result of a finished child.
#[derive(Debug)]
pub struct Captured {
    pub stdout: String,
    pub stderr: String,
}

/// Run `program args...` with extra environment `envs`, collecting its output.
/// Non-zero exit is an error carrying the captured stderr.
pub async fn run_captured<I, S>(
    program: &str,
    args: I,
    envs: &[(&str, &str)],
    cwd: Option<&Path>,
    timeout: Option<Duration>,
) -> Result<Captured, ProcessError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let args: Vec<_> = args.into_iter().map(|a| a.as_ref().to_os_string()).collect();
    debug!(
        program,
        args = ?args,
        "running"
    );

    let child = spawn(OsStr::new(program), &args, envs, cwd, program)?;
    let pid = child.id();
    let output = child.wait_with_output();
    let output = match timeout {
        Some(limit) => tokio::time::timeout(limit, output)
            .await
            .map_err(|_| {
                kill_tree(pid);
                ProcessError::TimedOut {
                    program: program.to_string(),
                    after: limit,
                }
            })?,
        None => output.await,
    }
    .map_err(|source| ProcessError::Io {
        program: program.to_string(),
        source,
    })?;

    let captured = Captured {
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    };
    if output.status.success() {
        Ok(captured)
    } else {
        Err(ProcessError::Failed {
            program: program.to_string(),
            status: output.status,
            stderr: captured.stderr,
        })
    }
}

fn spawn(
    program: &OsStr,
    args: &[std::ffi::OsString],
    envs: &[(&str, &str)],
    cwd: Option<&Path>,
    label: &str,
) -> Result<Child, ProcessError> {
    let mut cmd = Command::new(program);
    cmd.args(args)
        .envs(envs.iter().copied())
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    #[cfg(unix)]
    cmd.process_group(0);
    if let Some(cwd) = cwd {
        cmd.current_dir(cwd);
    }
    cmd.spawn().map_err(|source| ProcessError::Spawn {
        program: label.to_string(),
        source,
    })
}

async fn wait(
    child: &mut Child,
    timeout: Option<Duration>,
    program: &str,
) -> Result<ExitStatus, ProcessError> {
    let io_err = |source| ProcessError::Io {
        program: program.to_string(),
        source,
    };
    match timeout {
        Some(limit) => match tokio::time::timeout(limit, child.wait()).await {
            Ok(status) => status.map_err(io_err),
            Err(_) => {
                kill_tree(child.id());
                let _ = child.kill().await;
                Err(ProcessError::TimedOut {
                    program: program.to_string(),
                    after: limit,
                })
            }
        },
        None => child.wait().await.map_err(io_err),
    }
}

/// Kill the process group led by `pid`.
#[cfg(unix)]
fn kill_tree(pid: Option<u32>) {
    use nix::sys::signal::{Signal, killpg};
    use nix::unistd::Pid;

    let Some(pid) = pid.and_then(|p| i32::try_from(p).ok()) else {
        return;
    };
    if let Err(e) = killpg(Pid::from_raw(pid), Signal::SIGKILL) {
        debug!(pid, error = %e, "killpg failed");
    }
}

#[cfg(not(unix))]
fn kill_tree(_pid: Option<u32>) {}

async fn forward<R, W>(mut reader: R, mut writer: W)
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let _ = tokio::io::copy(&mut reader, &mut writer).await;
    let _ = writer.flush().await;
}
