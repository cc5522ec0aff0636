//! Error types for the runner module.

use miette::Diagnostic;
use std::process::ExitStatus;
use thiserror::Error;

/// Errors raised while handing scripts to external programs.
#[derive(Debug, Error, Diagnostic)]
pub enum RunnerError {
    /// The submission program exited unsuccessfully.
    #[error("{program} exited with {status}")]
    #[diagnostic(
        code(qsubgraph::runner::submission_failed),
        help("check the job script and the batch system's queue settings")
    )]
    SubmissionFailed {
        /// Submission program that was run.
        program: String,
        /// Exit status it reported.
        status: ExitStatus,
    },

    /// The submission program succeeded without printing a job id.
    #[error("{program} did not print a job id")]
    #[diagnostic(code(qsubgraph::runner::empty_job_id))]
    EmptyJobId {
        /// Submission program that was run.
        program: String,
    },

    /// The shell running a control script exited unsuccessfully.
    #[error("{shell} exited with {status} while running the control script")]
    #[diagnostic(code(qsubgraph::runner::control_script_failed))]
    ControlScriptFailed {
        /// Shell that ran the script.
        shell: String,
        /// Exit status it reported.
        status: ExitStatus,
    },
}
