//! Process helpers for script submission and subprocess I/O.
//! Internal to `runner`; public API is re-exported from `runner`.

use super::{RunnerError, SHELL_PROGRAM, ScriptContent};
use crate::script_gen::DEFAULT_SUBMIT_PROGRAM;
use anyhow::{Context, Result as AnyResult};
use batch_env::{QSUB_ENV, SHELL_ENV};
use std::{
    env,
    ffi::OsString,
    io::{self, BufReader, Write},
    path::{Path, PathBuf},
    process::{Child, Command, ExitStatus, Stdio},
    thread,
};
use tracing::info;

mod file_io;
mod streaming;

pub use file_io::*;
use streaming::{ForwardStats, forward_child_output};

fn resolve_program_with<F>(var: &str, fallback: &str, mut read_env: F) -> PathBuf
where
    F: FnMut(&str) -> Option<OsString>,
{
    read_env(var)
        .filter(|value| !value.is_empty())
        .map_or_else(|| PathBuf::from(fallback), PathBuf::from)
}

/// Program that submits a single job script, honouring `QSUBGRAPH_QSUB`.
#[must_use]
pub fn resolve_submit_program() -> PathBuf {
    resolve_program_with(QSUB_ENV, DEFAULT_SUBMIT_PROGRAM, |key| env::var_os(key))
}

/// Shell that runs control scripts, honouring `QSUBGRAPH_SHELL`.
#[must_use]
pub fn resolve_shell_program() -> PathBuf {
    resolve_program_with(SHELL_ENV, SHELL_PROGRAM, |key| env::var_os(key))
}

/// Feed `script` to `program` on standard input and return the job id it
/// prints.
///
/// The id is the program's standard output with surrounding whitespace
/// removed. Its standard error passes straight through to ours.
///
/// # Errors
///
/// Returns an error if the program cannot be spawned or written to,
/// [`RunnerError::SubmissionFailed`] when it exits unsuccessfully and
/// [`RunnerError::EmptyJobId`] when it prints nothing.
pub fn submit_job_script(program: &Path, script: &ScriptContent) -> AnyResult<String> {
    let program_display = program.display().to_string();
    info!("Running command: {program_display}");
    let mut child = Command::new(program)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::inherit())
        .spawn()
        .with_context(|| format!("spawning {program_display}"))?;
    if let Some(mut stdin) = child.stdin.take() {
        match stdin.write_all(script.as_str().as_bytes()) {
            Err(err) if err.kind() == io::ErrorKind::BrokenPipe => {
                tracing::debug!("{program_display} closed its input early: {err}");
            }
            result => result.with_context(|| format!("writing job script to {program_display}"))?,
        }
    }
    let output = child
        .wait_with_output()
        .with_context(|| format!("waiting for {program_display}"))?;
    if !output.status.success() {
        return Err(RunnerError::SubmissionFailed {
            program: program_display,
            status: output.status,
        }
        .into());
    }
    let id = String::from_utf8_lossy(&output.stdout).trim().to_owned();
    if id.is_empty() {
        return Err(RunnerError::EmptyJobId {
            program: program_display,
        }
        .into());
    }
    info!("Submitted job {id}");
    Ok(id)
}

/// Run the control script at `script_file` with `shell`, streaming its
/// output back to the user.
///
/// # Errors
///
/// Returns an error if the shell cannot be spawned and
/// [`RunnerError::ControlScriptFailed`] when it exits unsuccessfully.
pub fn run_control_script(shell: &Path, script_file: &Path) -> AnyResult<()> {
    let shell_display = shell.display().to_string();
    info!(
        "Running command: {shell_display} {}",
        script_file.display()
    );
    let child = Command::new(shell)
        .arg(script_file)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .with_context(|| format!("spawning {shell_display}"))?;
    let status = spawn_and_stream_output(child)
        .with_context(|| format!("streaming output of {shell_display}"))?;
    if status.success() {
        Ok(())
    } else {
        Err(RunnerError::ControlScriptFailed {
            shell: shell_display,
            status,
        }
        .into())
    }
}

fn handle_forwarding_thread_result(result: thread::Result<ForwardStats>, stream_name: &str) {
    match result {
        Ok(stats) => {
            tracing::debug!("{stream_name} forwarded {} bytes", stats.bytes_read);
            if stats.write_failed {
                tracing::debug!(
                    "{stream_name} forwarding encountered closed pipe; output truncated"
                );
            }
        }
        Err(err) => {
            tracing::warn!("{stream_name} forwarding thread panicked: {err:?}");
        }
    }
}

fn spawn_and_stream_output(mut child: Child) -> io::Result<ExitStatus> {
    let Some(stdout) = child.stdout.take() else {
        terminate_child(&mut child, "stdout pipe unavailable");
        return Err(io::Error::other("child process missing stdout pipe"));
    };
    let Some(stderr) = child.stderr.take() else {
        terminate_child(&mut child, "stderr pipe unavailable");
        return Err(io::Error::other("child process missing stderr pipe"));
    };

    let out_handle = thread::spawn(move || {
        let mut lock = io::stdout().lock();
        forward_child_output(BufReader::new(stdout), &mut lock, "stdout")
    });
    let err_handle = thread::spawn(move || {
        let mut lock = io::stderr().lock();
        forward_child_output(BufReader::new(stderr), &mut lock, "stderr")
    });

    let status = child.wait()?;
    handle_forwarding_thread_result(out_handle.join(), "stdout");
    handle_forwarding_thread_result(err_handle.join(), "stderr");
    Ok(status)
}

fn terminate_child(child: &mut Child, context: &str) {
    if let Err(err) = child.kill() {
        tracing::debug!("failed to kill child after {context}: {err}");
    }
    if let Err(err) = child.wait() {
        tracing::debug!("failed to reap child after {context}: {err}");
    }
}
