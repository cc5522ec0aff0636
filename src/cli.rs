//! Command line interface definition using clap.
//!
//! This module defines the [`Cli`] structure and its subcommands. Defaults for
//! jobs may also be supplied through `QSUBGRAPH_*` environment variables.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::job::{DEFAULT_DIRECTORY, DEFAULT_QUEUE, JobDefaults, Resources};
use crate::script_gen::DependencyRelation;

/// How the JSON description should be interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DescriptionKind {
    /// A graph of jobs with dependencies.
    Graph,
    /// A single job.
    Job,
}

/// Manage PBS jobs described in JSON files.
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Interpret the description as a graph of jobs or a single job.
    #[arg(
        short = 't',
        long = "type",
        value_enum,
        default_value_t = DescriptionKind::Graph,
        global = true
    )]
    pub kind: DescriptionKind,

    /// Enable verbose logging output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Queue for jobs that do not name one.
    #[arg(
        long,
        value_name = "QUEUE",
        env = "QSUBGRAPH_QUEUE",
        default_value = DEFAULT_QUEUE,
        global = true
    )]
    pub queue: String,

    /// Working directory for jobs that do not name one.
    #[arg(
        long,
        value_name = "DIR",
        env = "QSUBGRAPH_DIR",
        default_value = DEFAULT_DIRECTORY,
        global = true
    )]
    pub dir: String,

    /// Keep shell environment variables out of command substitution unless a
    /// description enables SHELL explicitly.
    #[arg(long, global = true)]
    pub no_shell_env: bool,

    /// Dependency relation used between jobs of a graph.
    #[arg(
        long,
        value_name = "RELATION",
        env = "QSUBGRAPH_DEPEND",
        default_value_t = DependencyRelation::AfterOk,
        global = true
    )]
    pub depend: DependencyRelation,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Job defaults assembled from the command line flags.
    #[must_use]
    pub fn job_defaults(&self) -> JobDefaults {
        JobDefaults {
            directory: self.dir.clone(),
            queue: self.queue.clone(),
            resources: Resources::default(),
            use_shell_environment: !self.no_shell_env,
        }
    }
}

/// Available top-level commands.
#[derive(Debug, Subcommand, PartialEq, Eq, Clone)]
pub enum Commands {
    /// Convert a JSON description into a script.
    Convert {
        /// JSON description to read.
        #[arg(value_name = "JSON")]
        json: PathBuf,
        /// Output path; standard output when omitted or `-`.
        #[arg(value_name = "TARGET")]
        target: Option<PathBuf>,
    },

    /// Submit the jobs described by a JSON file.
    Submit {
        /// JSON description to read.
        #[arg(value_name = "JSON")]
        json: PathBuf,
    },
}
