//! PBS script generator.
//!
//! This module renders a [`Job`] into a `qsub` submission script and a
//! [`Graph`] into a bash control script that submits every job in dependency
//! order. Both outputs are deterministic: jobs appear in declaration order and
//! resources in mapping order.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use itertools::Itertools;
use shell_quote::{Bash, QuoteRefExt};

use crate::error::ModelError;
use crate::graph::Graph;
use crate::job::Job;

/// First line of every control script.
pub const SCRIPT_MARKER: &str = "#!/bin/bash";
/// Batch submission program used when none is configured.
pub const DEFAULT_SUBMIT_PROGRAM: &str = "qsub";

const DIRECTIVE: &str = "#PBS";

/// Condition under which a dependent job may start.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DependencyRelation {
    /// Start once every prerequisite completed successfully.
    #[default]
    AfterOk,
    /// Start once every prerequisite terminated, whatever its status.
    AfterAny,
    /// Start once every prerequisite failed.
    AfterNotOk,
    /// Start once every prerequisite has started.
    After,
}

impl DependencyRelation {
    /// Keyword used in `-W depend=` arguments.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AfterOk => "afterok",
            Self::AfterAny => "afterany",
            Self::AfterNotOk => "afternotok",
            Self::After => "after",
        }
    }
}

impl Display for DependencyRelation {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DependencyRelation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "afterok" => Ok(Self::AfterOk),
            "afterany" => Ok(Self::AfterAny),
            "afternotok" => Ok(Self::AfterNotOk),
            "after" => Ok(Self::After),
            other => Err(format!(
                "unknown dependency relation '{other}' (expected afterok, afterany, afternotok or after)"
            )),
        }
    }
}

/// Settings for control script emission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptOptions {
    /// Program that reads a job script on standard input and prints its id.
    pub submit_program: String,
    /// Relation attached to every dependency clause.
    pub relation: DependencyRelation,
}

impl Default for ScriptOptions {
    fn default() -> Self {
        Self {
            submit_program: DEFAULT_SUBMIT_PROGRAM.to_owned(),
            relation: DependencyRelation::default(),
        }
    }
}

/// Render the submission script for `job`.
///
/// The script holds the name, working directory, queue and resource
/// directives followed by the commands, one per line, without a trailing
/// newline.
///
/// # Errors
///
/// Returns [`ModelError::PpnWithoutNodes`] for malformed resources.
pub fn job_script(job: &Job) -> Result<String, ModelError> {
    let resources = job.resources().directives(job.name())?;
    let header = [("-N", job.name()), ("-d", job.directory()), ("-q", job.queue())]
        .into_iter()
        .chain(resources.iter().map(|resource| ("-l", resource.as_str())))
        .map(|(flag, value)| format!("{DIRECTIVE} {flag} {value}"));
    Ok(header.chain(job.commands().iter().cloned()).join("\n"))
}

/// Render the control script that submits every job of `graph`.
///
/// Job bodies are stored in `<name>_body` variables first, in declaration
/// order. Submissions follow in resolution order, each capturing its id in
/// `<name>_id` and echoing it.
///
/// # Errors
///
/// Returns [`ModelError::CyclicDependency`] when the jobs cannot be ordered
/// and [`ModelError::PpnWithoutNodes`] when a job's resources are malformed.
/// Nothing is rendered in either case.
pub fn control_script(graph: &Graph, options: &ScriptOptions) -> Result<String, ModelError> {
    let resolution = graph.resolution_order()?;
    let bodies = graph
        .jobs()
        .iter()
        .map(job_script)
        .collect::<Result<Vec<_>, _>>()?;

    let mut out = String::new();
    out.push_str(SCRIPT_MARKER);
    out.push_str("\n\n");
    for (job, body) in graph.jobs().iter().zip(&bodies) {
        out.push_str(&BodyAssignment { job, body }.to_string());
    }
    out.push('\n');
    for idx in resolution.order {
        let Some(job) = graph.jobs().get(idx) else {
            continue;
        };
        let submission = Submission {
            job,
            dependencies: graph.dependencies_of(idx).collect(),
            options,
        };
        out.push_str(&submission.to_string());
    }
    Ok(out)
}

/// `<name>_body=<quoted script>` on a single line.
struct BodyAssignment<'a> {
    job: &'a Job,
    body: &'a str,
}

impl Display for BodyAssignment<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}={}", body_var(self.job), bash_word(self.body))
    }
}

/// Submit statement, id echo and the separating blank line for one job.
struct Submission<'a> {
    job: &'a Job,
    dependencies: Vec<&'a Job>,
    options: &'a ScriptOptions,
}

impl Display for Submission<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let captured = id_var(self.job);
        write!(
            f,
            "{captured}=$(printf '%s\\n' \"${}\" | {}",
            body_var(self.job),
            bash_word(&self.options.submit_program)
        )?;
        if !self.dependencies.is_empty() {
            let ids = self
                .dependencies
                .iter()
                .map(|dep| format!("${}", id_var(dep)))
                .join(":");
            write!(f, " -W depend={}:{ids}", self.options.relation)?;
        }
        writeln!(f, ")")?;
        writeln!(f, "echo \"${captured}\"")?;
        writeln!(f)
    }
}

/// Quote `text` as one bash word. Plain paths pass through unchanged.
fn bash_word(text: &str) -> String {
    let quoted: Vec<u8> = text.quoted(Bash);
    String::from_utf8_lossy(&quoted).into_owned()
}

fn body_var(job: &Job) -> String {
    format!("{}_body", job.name())
}

fn id_var(job: &Job) -> String {
    format!("{}_id", job.name())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::BuildContext;
    use rstest::rstest;
    use serde_json::json;

    fn graph(description: &serde_json::Value) -> Graph {
        Graph::from_value(description, &BuildContext::default()).expect("graph")
    }

    #[rstest]
    fn control_script_has_expected_layout() {
        let g = graph(&json!({
            "dir": "/w",
            "jobs": [
                {"id": 0, "name": "a", "cmd": "true"},
                {"id": 1, "name": "b", "cmd": "true", "depend": 0}
            ]
        }));
        let script = control_script(&g, &ScriptOptions::default()).expect("script");
        let lines: Vec<&str> = script.lines().collect();

        assert_eq!(lines.first(), Some(&SCRIPT_MARKER));
        assert_eq!(lines.get(1), Some(&""));
        assert!(lines.get(2).is_some_and(|l| l.starts_with("a_body=")));
        assert!(lines.get(3).is_some_and(|l| l.starts_with("b_body=")));
        assert_eq!(lines.get(4), Some(&""));
        assert_eq!(
            lines.get(5),
            Some(&"a_id=$(printf '%s\\n' \"$a_body\" | qsub)")
        );
        assert_eq!(lines.get(6), Some(&"echo \"$a_id\""));
        assert_eq!(lines.get(7), Some(&""));
        assert_eq!(
            lines.get(8),
            Some(&"b_id=$(printf '%s\\n' \"$b_body\" | qsub -W depend=afterok:$a_id)")
        );
        assert_eq!(lines.get(9), Some(&"echo \"$b_id\""));
        assert_eq!(lines.get(10), Some(&""));
        assert_eq!(lines.len(), 11);
    }

    #[rstest]
    #[case("qsub", "| qsub)")]
    #[case("/opt/pbs/bin/qsub", "| /opt/pbs/bin/qsub)")]
    #[case("/opt/my pbs/qsub", "| $'/opt/my pbs/qsub')")]
    #[case("qsub;rm", "| $'qsub;rm')")]
    fn submit_program_is_one_shell_word(#[case] program: &str, #[case] tail: &str) {
        let g = graph(&json!({"jobs": [{"id": 0, "name": "a", "cmd": "true"}]}));
        let options = ScriptOptions {
            submit_program: program.to_owned(),
            ..ScriptOptions::default()
        };
        let script = control_script(&g, &options).expect("script");
        let submit = script
            .lines()
            .find(|line| line.starts_with("a_id="))
            .expect("submit line");
        assert!(submit.ends_with(tail), "unexpected submit line: {submit}");
    }

    #[rstest]
    #[case("afterok", DependencyRelation::AfterOk)]
    #[case("AfterAny", DependencyRelation::AfterAny)]
    #[case("afternotok", DependencyRelation::AfterNotOk)]
    #[case("after", DependencyRelation::After)]
    fn relations_parse(#[case] input: &str, #[case] expected: DependencyRelation) {
        assert_eq!(input.parse::<DependencyRelation>(), Ok(expected));
        assert_eq!(expected.to_string(), expected.as_str());
    }

    #[rstest]
    fn unknown_relation_is_rejected() {
        let err = "before".parse::<DependencyRelation>().expect_err("unknown");
        assert!(err.contains("before"));
    }
}
