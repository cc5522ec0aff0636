//! qsubgraph core library.
//!
//! Turns JSON descriptions of batch jobs, or graphs of interdependent jobs,
//! into PBS/Torque submission scripts. The model layer ([`job`], [`graph`],
//! [`script_gen`]) is pure: it neither reads the process environment nor
//! logs. The [`runner`] captures the environment once and drives external
//! programs.

pub mod cli;
pub mod error;
pub mod fields;
pub mod graph;
pub mod job;
pub mod runner;
pub mod scope;
pub mod script_gen;
pub mod substitute;

pub use error::{ErrorCategory, ModelError};
