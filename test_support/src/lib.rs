//! Test utilities for process management.
//!
//! This crate provides fake batch submission programs and small helpers used
//! by the integration tests.

pub mod fake_qsub;

pub use fake_qsub::{FakeQsub, Submission};

use std::process::{Command, Stdio};

/// Report whether a `bash` executable can be run from `PATH`.
///
/// Tests that execute control scripts skip themselves when this is `false`.
#[must_use]
pub fn bash_available() -> bool {
    Command::new("bash")
        .args(["-c", "true"])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .is_ok_and(|status| status.success())
}
