//! Fake `qsub` executables that record what they were asked to submit.
//!
//! Each invocation stores its standard input and arguments next to the
//! script and prints a job id of the form `<n>.fakepbs`, where `n` counts
//! submissions from one.

use anyhow::{Context, Result};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Suffix of every id printed by a [`FakeQsub`].
pub const ID_SUFFIX: &str = ".fakepbs";

const RECORDING_SCRIPT: &str = concat!(
    "#!/bin/sh\n",
    "dir=$(dirname \"$0\")\n",
    "n=$(cat \"$dir/count\" 2>/dev/null || echo 0)\n",
    "n=$((n + 1))\n",
    "echo \"$n\" > \"$dir/count\"\n",
    "cat > \"$dir/submission.$n\"\n",
    "printf '%s' \"$*\" > \"$dir/args.$n\"\n",
    "echo \"$n.fakepbs\"\n",
);

/// One recorded call of a fake submission program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    /// Job script read from standard input.
    pub script: String,
    /// Command-line arguments joined by spaces.
    pub args: String,
}

/// A fake submission program living in its own temporary directory.
#[derive(Debug)]
pub struct FakeQsub {
    dir: TempDir,
    program: PathBuf,
}

impl FakeQsub {
    /// Create a fake that records every submission and prints sequential ids.
    pub fn recording() -> Result<Self> {
        Self::with_script(RECORDING_SCRIPT)
    }

    /// Create a fake that prints `message` on standard error and exits with
    /// `exit_code` without printing an id.
    pub fn failing(exit_code: i32, message: &str) -> Result<Self> {
        Self::with_script(&format!(
            "#!/bin/sh\ncat > /dev/null\necho '{message}' >&2\nexit {exit_code}\n"
        ))
    }

    fn with_script(script: &str) -> Result<Self> {
        let dir = TempDir::new().context("fake qsub: create temp dir")?;
        let program = dir.path().join("qsub");
        let mut file = File::create(&program)
            .with_context(|| format!("fake qsub: create script {}", program.display()))?;
        file.write_all(script.as_bytes())
            .with_context(|| format!("fake qsub: write script {}", program.display()))?;
        drop(file);
        make_script_executable(&program)?;
        Ok(Self { dir, program })
    }

    /// Path of the executable.
    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Submissions recorded so far, in call order.
    pub fn submissions(&self) -> Result<Vec<Submission>> {
        let mut out = Vec::new();
        for n in 1.. {
            let script_path = self.dir.path().join(format!("submission.{n}"));
            if !script_path.exists() {
                break;
            }
            let script = fs::read_to_string(&script_path)
                .with_context(|| format!("fake qsub: read {}", script_path.display()))?;
            let args_path = self.dir.path().join(format!("args.{n}"));
            let args = fs::read_to_string(&args_path).unwrap_or_default();
            out.push(Submission { script, args });
        }
        Ok(out)
    }
}

/// Make a script file executable on Unix platforms.
#[cfg(unix)]
fn make_script_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    let mut perms = fs::metadata(path)
        .with_context(|| format!("fake qsub: read metadata {}", path.display()))?
        .permissions();
    perms.set_mode(0o755);
    fs::set_permissions(path, perms)
        .with_context(|| format!("fake qsub: set permissions {}", path.display()))?;
    Ok(())
}

#[cfg(not(unix))]
fn make_script_executable(_path: &Path) -> Result<()> {
    Ok(())
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::process::{Command, Stdio};

    #[rstest]
    fn recording_fake_counts_submissions() {
        let fake = FakeQsub::recording().expect("fake qsub");
        for expected in ["1.fakepbs", "2.fakepbs"] {
            let mut child = Command::new(fake.program())
                .arg("-W")
                .arg("depend=afterok:1")
                .stdin(Stdio::piped())
                .stdout(Stdio::piped())
                .spawn()
                .expect("spawn fake");
            child
                .stdin
                .take()
                .expect("stdin")
                .write_all(b"#PBS -N a\necho hi\n")
                .expect("write stdin");
            let output = child.wait_with_output().expect("wait");
            assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), expected);
        }
        let subs = fake.submissions().expect("submissions");
        assert_eq!(subs.len(), 2);
        assert!(subs.iter().all(|s| s.script == "#PBS -N a\necho hi\n"));
        assert!(subs.iter().all(|s| s.args == "-W depend=afterok:1"));
    }
}
