//! Error taxonomy for job and graph construction and script emission.
//!
//! Every failure raised by the model is a [`ModelError`]. Variants fall into
//! three [`ErrorCategory`] groups so callers can tell content problems apart
//! from unresolved variables and dependency cycles without matching on each
//! variant.

use miette::Diagnostic;
use thiserror::Error;

use crate::fields::Field;

/// Broad classification of a [`ModelError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Missing or malformed content in the job or graph description.
    Configuration,
    /// A referenced variable is absent from the effective scope.
    Variable,
    /// The dependency relation cannot be ordered.
    Structural,
}

/// Errors raised while building jobs and graphs or rendering scripts.
#[derive(Debug, Error, Diagnostic, PartialEq, Eq)]
pub enum ModelError {
    /// The description (or one of its job entries) is not a JSON object.
    #[error("expected a JSON object for {context}")]
    #[diagnostic(code(qsubgraph::config::not_an_object))]
    NotAnObject {
        /// What the object was expected to describe.
        context: String,
    },

    /// A required field is absent.
    #[error("job description must contain the {field} field")]
    #[diagnostic(
        code(qsubgraph::config::missing_field),
        help("every job needs both an `id` and a `name`")
    )]
    MissingField {
        /// The logical field that was not found.
        field: Field,
    },

    /// A field holds a value of the wrong shape.
    #[error("field {field} must be {expected}")]
    #[diagnostic(code(qsubgraph::config::invalid_value))]
    InvalidValue {
        /// The offending field.
        field: Field,
        /// Description of the accepted shape.
        expected: &'static str,
    },

    /// A job lists no commands.
    #[error("job '{job}' must contain a non-empty CMD or COMMANDS field")]
    #[diagnostic(code(qsubgraph::config::empty_commands))]
    EmptyCommands {
        /// Name of the job without commands.
        job: String,
    },

    /// A graph lists no jobs.
    #[error("graph '{graph}' must contain at least one job")]
    #[diagnostic(code(qsubgraph::config::empty_graph))]
    EmptyGraph {
        /// Name of the graph without jobs.
        graph: String,
    },

    /// A variable block is not a mapping.
    #[error("VAR must be an object mapping names to values")]
    #[diagnostic(code(qsubgraph::config::scope_not_mapping))]
    ScopeNotMapping,

    /// A command line has unbalanced quotes and cannot be tokenised.
    #[error("command has unbalanced quotes: {command}")]
    #[diagnostic(code(qsubgraph::config::unbalanced_quotes))]
    UnbalancedQuotes {
        /// The command as written in the description.
        command: String,
    },

    /// `ppn` was requested without a node count.
    #[error("job '{job}' requests ppn without nodes")]
    #[diagnostic(
        code(qsubgraph::config::ppn_without_nodes),
        help("add a `nodes` entry next to `ppn` in the job's resources")
    )]
    PpnWithoutNodes {
        /// Name of the job with the malformed resources.
        job: String,
    },

    /// Two jobs share the same id.
    #[error("there are repeated job ids in the description: {id}")]
    #[diagnostic(code(qsubgraph::config::duplicate_id))]
    DuplicateId {
        /// The repeated id.
        id: String,
    },

    /// Two jobs share the same name.
    #[error("there are repeated job names in the description: {name}")]
    #[diagnostic(code(qsubgraph::config::duplicate_name))]
    DuplicateName {
        /// The repeated name.
        name: String,
    },

    /// A job name cannot serve as a shell variable name.
    #[error("job name '{name}' is not a valid shell identifier")]
    #[diagnostic(
        code(qsubgraph::config::invalid_name),
        help("use letters, digits and underscores, starting with a letter or underscore")
    )]
    InvalidName {
        /// The offending name after whitespace normalisation.
        name: String,
    },

    /// A dependency names an id that no job carries.
    #[error("job '{job}' depends on unknown job id {id}")]
    #[diagnostic(code(qsubgraph::config::unresolved_dependency))]
    UnresolvedDependency {
        /// Name of the dependent job.
        job: String,
        /// The id that could not be resolved.
        id: String,
    },

    /// A variable token refers to a name missing from scope.
    #[error("variable '{name}' not found")]
    #[diagnostic(
        code(qsubgraph::variable::not_found),
        help("declare it under VAR, enable SHELL, or escape the token with `^`")
    )]
    VariableNotFound {
        /// The variable name without its sigil.
        name: String,
    },

    /// The dependency relation contains a cycle.
    #[error("there are loops in the dependency relationship: {}", jobs.join(", "))]
    #[diagnostic(code(qsubgraph::structure::cyclic_dependency))]
    CyclicDependency {
        /// Names of the jobs left unresolved, in declaration order.
        jobs: Vec<String>,
    },
}

impl ModelError {
    /// Classify the error according to the stage that raised it.
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::VariableNotFound { .. } => ErrorCategory::Variable,
            Self::CyclicDependency { .. } => ErrorCategory::Structural,
            _ => ErrorCategory::Configuration,
        }
    }
}
