//! CLI execution and command dispatch logic.
//!
//! This module keeps `main` minimal by providing a single entry point that
//! turns a JSON description into a script and then writes it out or hands it
//! to the batch system.

use crate::cli::{Cli, Commands, DescriptionKind};
use crate::graph::Graph;
use crate::job::{BuildContext, Job};
use crate::scope::Scope;
use crate::script_gen::{self, ScriptOptions};
use anyhow::{Context, Result};
use serde_json::Value;
use std::fs;
use std::io::{self, Write};
use std::path::Path;
use tracing::{debug, info};

mod error;
mod process;

pub use error::RunnerError;
pub use process::{
    create_temp_script_file, is_stdout_path, resolve_shell_program, resolve_submit_program,
    run_control_script, submit_job_script, write_script_file, write_script_stdout,
};

/// Shell program used to run control scripts when none is configured.
pub const SHELL_PROGRAM: &str = "bash";

/// Rendered script text ready to be written or submitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptContent(String);
impl ScriptContent {
    /// Store `content`, terminating it with a newline when missing.
    #[must_use]
    pub fn new(mut content: String) -> Self {
        if !content.ends_with('\n') {
            content.push('\n');
        }
        Self(content)
    }
    /// Borrow the underlying script text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// A description built into its model, ready for rendering.
#[derive(Debug)]
enum Description {
    Job(Job),
    Graph(Graph),
}

impl Description {
    fn render(&self, options: &ScriptOptions) -> Result<ScriptContent> {
        let script = match self {
            Self::Job(job) => job.to_script().context("rendering job script")?,
            Self::Graph(graph) => {
                script_gen::control_script(graph, options).context("rendering control script")?
            }
        };
        Ok(ScriptContent::new(script))
    }
}

/// Execute the parsed [`Cli`] commands.
///
/// # Errors
///
/// Returns an error if the description cannot be read or built, if writing
/// the script fails, or if the batch system rejects a submission.
pub fn run(cli: &Cli) -> Result<()> {
    match &cli.command {
        Commands::Convert { json, target } => handle_convert(cli, json, target.as_deref()),
        Commands::Submit { json } => handle_submit(cli, json),
    }
}

fn handle_convert(cli: &Cli, json: &Path, target: Option<&Path>) -> Result<()> {
    let description = load_description(cli, json)?;
    let script = description.render(&script_options(cli))?;
    target.filter(|path| !is_stdout_path(path)).map_or_else(
        || write_script_stdout(&script),
        |path| write_script_file(path, &script),
    )
}

fn handle_submit(cli: &Cli, json: &Path) -> Result<()> {
    let description = load_description(cli, json)?;
    let options = script_options(cli);
    let script = description.render(&options)?;
    match &description {
        Description::Job(job) => {
            let id = submit_job_script(&resolve_submit_program(), &script)
                .with_context(|| format!("submitting job {}", job.name()))?;
            let mut stdout = io::stdout().lock();
            writeln!(stdout, "{id}").context("writing job id to stdout")?;
            Ok(())
        }
        Description::Graph(graph) => {
            let tmp = create_temp_script_file(&script, graph.name())?;
            run_control_script(&resolve_shell_program(), tmp.path())
                .with_context(|| format!("submitting graph {}", graph.name()))?;
            info!("Submitted {} jobs of graph {}", graph.jobs().len(), graph.name());
            Ok(())
        }
    }
}

fn script_options(cli: &Cli) -> ScriptOptions {
    ScriptOptions {
        submit_program: resolve_submit_program().display().to_string(),
        relation: cli.depend,
    }
}

/// Read `path` and build the job or graph it describes.
///
/// The process environment is captured once here and passed down as data.
fn load_description(cli: &Cli, path: &Path) -> Result<Description> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("reading description at {}", path.display()))?;
    let value: Value = serde_json::from_str(&text)
        .with_context(|| format!("parsing JSON in {}", path.display()))?;
    let ctx = BuildContext {
        defaults: cli.job_defaults(),
        environment: Scope::from_env(),
        ..BuildContext::default()
    };
    let description = match cli.kind {
        DescriptionKind::Job => {
            Description::Job(Job::from_value(&value, &ctx).context("building job")?)
        }
        DescriptionKind::Graph => {
            Description::Graph(Graph::from_value(&value, &ctx).context("building graph")?)
        }
    };
    if tracing::enabled!(tracing::Level::DEBUG) {
        let model = match &description {
            Description::Job(job) => serde_json::to_string_pretty(job),
            Description::Graph(graph) => serde_json::to_string_pretty(graph),
        }
        .context("serialising description")?;
        debug!("Model:\n{model}");
    }
    Ok(description)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("a\nb", "a\nb\n")]
    #[case("a\n", "a\n")]
    #[case("", "\n")]
    fn script_content_ends_with_newline(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(ScriptContent::new(input.to_owned()).as_str(), expected);
    }
}
