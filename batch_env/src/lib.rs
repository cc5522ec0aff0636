#![forbid(unsafe_code)]

//! Shared environment constants used across qsubgraph crates (library, tests,
//! and helpers).

/// Environment variable override for the batch submission program.
///
/// The generated control script and `submit --type job` both invoke this
/// program in place of `qsub` when it is set.
///
/// # Examples
///
/// ```
/// use batch_env::QSUB_ENV;
/// assert_eq!(QSUB_ENV, "QSUBGRAPH_QSUB");
/// ```
pub const QSUB_ENV: &str = "QSUBGRAPH_QSUB";

/// Environment variable override for the shell that runs control scripts.
///
/// # Examples
///
/// ```
/// use batch_env::SHELL_ENV;
/// assert_eq!(SHELL_ENV, "QSUBGRAPH_SHELL");
/// ```
pub const SHELL_ENV: &str = "QSUBGRAPH_SHELL";
