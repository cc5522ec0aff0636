//! A single schedulable unit of work.
//!
//! [`Job::from_value`] runs the whole construction pipeline: key
//! normalisation, field extraction, scope layering and substitution into the
//! commands and working directory. The resulting job is immutable.
//!
//! ```
//! use qsubgraph::job::{BuildContext, Job};
//! use serde_json::json;
//!
//! let ctx = BuildContext::default();
//! let job = Job::from_value(
//!     &json!({"id": 0, "name": "hello", "dir": "/tmp", "cmd": "echo hi"}),
//!     &ctx,
//! )
//! .expect("job");
//! assert_eq!(job.queue(), "batch");
//! assert_eq!(job.commands(), ["echo hi"]);
//! ```

mod id;
mod resources;

pub use id::JobId;
pub use resources::{NODES_KEY, PPN_KEY, Resources};

use serde::Serialize;
use serde_json::Value;

use crate::error::ModelError;
use crate::fields::{Field, FieldTree, scalar_text};
use crate::scope::Scope;
use crate::script_gen;
use crate::substitute::{Sigils, substitute_command, substitute_path};

/// Default working directory of a job.
pub const DEFAULT_DIRECTORY: &str = "$HOME";
/// Default destination queue of a job.
pub const DEFAULT_QUEUE: &str = "batch";

/// Fallback values applied to every job that does not set them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobDefaults {
    /// Working directory, possibly containing variable tokens.
    pub directory: String,
    /// Destination queue.
    pub queue: String,
    /// Resource request.
    pub resources: Resources,
    /// Whether the shell environment participates in command substitution.
    pub use_shell_environment: bool,
}

impl Default for JobDefaults {
    fn default() -> Self {
        Self {
            directory: DEFAULT_DIRECTORY.to_owned(),
            queue: DEFAULT_QUEUE.to_owned(),
            resources: Resources::default(),
            use_shell_environment: true,
        }
    }
}

impl JobDefaults {
    /// Apply the DIR, QUEUE, RES and SHELL fields of `tree` on top of these
    /// defaults, returning a fresh copy.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::InvalidValue`] when one of those fields has the
    /// wrong shape.
    pub fn overridden_by(&self, tree: &FieldTree) -> Result<Self, ModelError> {
        Ok(Self {
            directory: tree
                .text(Field::Directory)?
                .unwrap_or_else(|| self.directory.clone()),
            queue: tree
                .text(Field::Queue)?
                .unwrap_or_else(|| self.queue.clone()),
            resources: extract_resources(tree)?.unwrap_or_else(|| self.resources.clone()),
            use_shell_environment: tree
                .get(Field::Shell)
                .map_or(self.use_shell_environment, shell_flag),
        })
    }
}

/// Ambient inputs shared by every job built from one description.
#[derive(Debug, Clone, Default)]
pub struct BuildContext {
    /// Fallback values for omitted job fields.
    pub defaults: JobDefaults,
    /// Graph-level variables.
    pub global_scope: Scope,
    /// Snapshot of the shell environment, captured by the caller.
    pub environment: Scope,
    /// Variable and escape sigils.
    pub sigils: Sigils,
}

/// A job with its commands and working directory already substituted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Job {
    id: JobId,
    name: String,
    queue: String,
    directory: String,
    resources: Resources,
    commands: Vec<String>,
    depends_on: Vec<JobId>,
    local_scope: Scope,
    use_shell_environment: bool,
    #[serde(skip)]
    effective_scope: Scope,
}

impl Job {
    /// Build a job from a parsed description.
    ///
    /// # Errors
    ///
    /// Returns a configuration [`ModelError`] when the description is
    /// malformed and [`ModelError::VariableNotFound`] when a command or the
    /// working directory references an unbound variable.
    pub fn from_value(value: &Value, ctx: &BuildContext) -> Result<Self, ModelError> {
        let tree = FieldTree::from_value(value, "a job")?;
        Self::from_tree(&tree, ctx)
    }

    /// Build a job from an already normalised description.
    ///
    /// # Errors
    ///
    /// See [`Job::from_value`].
    pub fn from_tree(tree: &FieldTree, ctx: &BuildContext) -> Result<Self, ModelError> {
        let id = JobId::from_value(tree.require(Field::Id)?).ok_or(ModelError::InvalidValue {
            field: Field::Id,
            expected: "an integer or a string",
        })?;
        let name = scalar_text(tree.require(Field::Name)?)
            .filter(|name| !name.trim().is_empty())
            .map(|name| normalize_name(&name))
            .ok_or(ModelError::InvalidValue {
                field: Field::Name,
                expected: "a non-empty string",
            })?;

        let directory = tree
            .text(Field::Directory)?
            .unwrap_or_else(|| ctx.defaults.directory.clone());
        let queue = tree
            .text(Field::Queue)?
            .unwrap_or_else(|| ctx.defaults.queue.clone());
        let commands = extract_commands(tree, &name)?;
        let resources =
            extract_resources(tree)?.unwrap_or_else(|| ctx.defaults.resources.clone());
        let depends_on = extract_dependencies(tree)?;
        let local_scope = tree
            .mapping(Field::Variables, ModelError::ScopeNotMapping)?
            .map(Scope::from_mapping)
            .unwrap_or_default();
        let use_shell_environment = tree
            .get(Field::Shell)
            .map_or(ctx.defaults.use_shell_environment, shell_flag);

        let empty = Scope::new();
        let shell_tier = if use_shell_environment {
            &ctx.environment
        } else {
            &empty
        };
        let effective_scope = Scope::layered(&[&local_scope, &ctx.global_scope, shell_tier]);

        let commands = commands
            .iter()
            .map(|command| substitute_command(command, &effective_scope, ctx.sigils))
            .collect::<Result<Vec<_>, _>>()?;
        let directory_scope = Scope::layered(&[&effective_scope, &ctx.environment]);
        let directory = substitute_path(&directory, &directory_scope, ctx.sigils)?;

        Ok(Self {
            id,
            name,
            queue,
            directory,
            resources,
            commands,
            depends_on,
            local_scope,
            use_shell_environment,
            effective_scope,
        })
    }

    /// Identifier referenced by other jobs' dependency lists.
    #[must_use]
    pub const fn id(&self) -> &JobId {
        &self.id
    }

    /// Name with whitespace replaced by underscores.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Destination queue.
    #[must_use]
    pub fn queue(&self) -> &str {
        &self.queue
    }

    /// Substituted working directory.
    #[must_use]
    pub fn directory(&self) -> &str {
        &self.directory
    }

    /// Resource request.
    #[must_use]
    pub const fn resources(&self) -> &Resources {
        &self.resources
    }

    /// Substituted command lines, in declaration order.
    #[must_use]
    pub fn commands(&self) -> &[String] {
        &self.commands
    }

    /// Ids of prerequisite jobs, in declaration order.
    #[must_use]
    pub fn depends_on(&self) -> &[JobId] {
        &self.depends_on
    }

    /// Variables declared on the job itself.
    #[must_use]
    pub const fn local_scope(&self) -> &Scope {
        &self.local_scope
    }

    /// Whether the shell environment took part in command substitution.
    #[must_use]
    pub const fn use_shell_environment(&self) -> bool {
        self.use_shell_environment
    }

    /// Local, global and (optionally) shell variables merged by precedence.
    #[must_use]
    pub const fn effective_scope(&self) -> &Scope {
        &self.effective_scope
    }

    /// Render the batch submission script for this job.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::PpnWithoutNodes`] for malformed resources.
    pub fn to_script(&self) -> Result<String, ModelError> {
        script_gen::job_script(self)
    }
}

/// Interpret a SHELL value.
///
/// `false`, the integer `0` and the string `"false"` (any case) disable the
/// shell environment; every other value enables it.
#[must_use]
pub fn shell_flag(value: &Value) -> bool {
    match value {
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_i64() != Some(0),
        Value::String(text) => !text.eq_ignore_ascii_case("false"),
        _ => true,
    }
}

fn normalize_name(name: &str) -> String {
    name.chars()
        .map(|ch| if ch.is_whitespace() { '_' } else { ch })
        .collect()
}

fn extract_commands(tree: &FieldTree, job: &str) -> Result<Vec<String>, ModelError> {
    let commands = tree
        .list(Field::Commands)
        .into_iter()
        .map(|value| {
            scalar_text(value).ok_or(ModelError::InvalidValue {
                field: Field::Commands,
                expected: "a string or a list of strings",
            })
        })
        .collect::<Result<Vec<_>, _>>()?;
    if commands.is_empty() {
        return Err(ModelError::EmptyCommands {
            job: job.to_owned(),
        });
    }
    Ok(commands)
}

fn extract_dependencies(tree: &FieldTree) -> Result<Vec<JobId>, ModelError> {
    tree.list(Field::Dependencies)
        .into_iter()
        .map(|value| {
            JobId::from_value(value).ok_or(ModelError::InvalidValue {
                field: Field::Dependencies,
                expected: "an id or a list of ids",
            })
        })
        .collect()
}

fn extract_resources(tree: &FieldTree) -> Result<Option<Resources>, ModelError> {
    let not_mapping = ModelError::InvalidValue {
        field: Field::Resources,
        expected: "an object mapping resource names to values",
    };
    Ok(tree
        .mapping(Field::Resources, not_mapping)?
        .map(Resources::from_mapping))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    #[case(json!(true), true)]
    #[case(json!(false), false)]
    #[case(json!(0), false)]
    #[case(json!(1), true)]
    #[case(json!("FALSE"), false)]
    #[case(json!("false"), false)]
    #[case(json!("no"), true)]
    #[case(json!(null), true)]
    fn shell_flag_coercion(#[case] input: Value, #[case] expected: bool) {
        assert_eq!(shell_flag(&input), expected);
    }

    #[rstest]
    #[case("be sunk in sleep", "be_sunk_in_sleep")]
    #[case("tab\tname", "tab_name")]
    #[case("plain", "plain")]
    fn names_replace_whitespace(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(normalize_name(input), expected);
    }

    #[rstest]
    fn defaults_are_overridden_per_field() {
        let tree = FieldTree::from_value(&json!({"q": "long", "shell": 0}), "graph")
            .expect("object");
        let base = JobDefaults::default();
        let merged = base.overridden_by(&tree).expect("defaults");
        assert_eq!(merged.queue, "long");
        assert_eq!(merged.directory, DEFAULT_DIRECTORY);
        assert_eq!(merged.resources, Resources::default());
        assert!(!merged.use_shell_environment);
        assert_eq!(base, JobDefaults::default());
    }
}
