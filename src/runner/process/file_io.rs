//! File creation helpers for the runner.
//! Handles temporary control scripts and writes to user-chosen targets.

use crate::runner::ScriptContent;
use anyhow::{Context, Result as AnyResult};
use std::fs;
use std::io::{self, Write};
use std::path::Path;
use tempfile::{Builder, NamedTempFile};
use tracing::info;

/// Return `true` when `path` is the CLI sentinel indicating "write to stdout".
#[must_use]
pub fn is_stdout_path(path: &Path) -> bool {
    path.as_os_str() == "-"
}

/// Write `content` to a fresh temporary file whose name starts with `name`.
///
/// Characters of `name` outside `[A-Za-z0-9_-]` become `_`, so the file
/// always lands directly in the system temporary directory. The file is
/// removed when the returned handle is dropped.
///
/// # Errors
///
/// Returns an error when the file cannot be created or written.
pub fn create_temp_script_file(content: &ScriptContent, name: &str) -> AnyResult<NamedTempFile> {
    let mut tmp = Builder::new()
        .prefix(&format!("{}.", temp_prefix(name)))
        .suffix(".sh")
        .tempfile()
        .context("creating temporary control script")?;
    {
        let handle = tmp.as_file_mut();
        handle
            .write_all(content.as_str().as_bytes())
            .context("writing temporary control script")?;
        handle
            .flush()
            .context("flushing temporary control script")?;
    }
    info!("Wrote temporary control script to {}", tmp.path().display());
    Ok(tmp)
}

fn temp_prefix(name: &str) -> String {
    name.chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || ch == '_' || ch == '-' {
                ch
            } else {
                '_'
            }
        })
        .collect()
}

/// Write `content` to `path`, creating missing parent directories.
///
/// # Errors
///
/// Returns an error when a directory or the file cannot be created or
/// written.
pub fn write_script_file(path: &Path, content: &ScriptContent) -> AnyResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating directory {}", parent.display()))?;
    }
    let mut file = fs::File::create(path)
        .with_context(|| format!("creating script file {}", path.display()))?;
    file.write_all(content.as_str().as_bytes())
        .with_context(|| format!("writing script file {}", path.display()))?;
    file.flush()
        .with_context(|| format!("flushing script file {}", path.display()))?;
    info!("Wrote script to {}", path.display());
    Ok(())
}

fn is_broken_pipe(err: &io::Error) -> bool {
    err.kind() == io::ErrorKind::BrokenPipe
}

fn write_all_ignoring_broken_pipe(writer: &mut impl Write, buf: &[u8]) -> io::Result<()> {
    match writer.write_all(buf) {
        Err(err) if is_broken_pipe(&err) => Ok(()),
        other => other,
    }
}

fn flush_ignoring_broken_pipe(writer: &mut impl Write) -> io::Result<()> {
    match writer.flush() {
        Err(err) if is_broken_pipe(&err) => Ok(()),
        other => other,
    }
}

/// Print `content` on standard output.
///
/// A closed pipe on the reading side is not treated as an error.
///
/// # Errors
///
/// Returns an error when writing to standard output fails otherwise.
pub fn write_script_stdout(content: &ScriptContent) -> AnyResult<()> {
    let mut stdout = io::stdout().lock();
    write_all_ignoring_broken_pipe(&mut stdout, content.as_str().as_bytes())
        .context("writing script to stdout")?;
    flush_ignoring_broken_pipe(&mut stdout).context("flushing stdout")?;
    Ok(())
}
