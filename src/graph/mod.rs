//! Job graphs: a set of jobs, their shared defaults and dependency edges.
//!
//! Construction validates id and name uniqueness and resolves every
//! dependency id to the index of the job carrying it. Cycles are not checked
//! here; they surface when [`Graph::resolution_order`] runs during control
//! script emission.
//!
//! ```
//! use qsubgraph::graph::Graph;
//! use qsubgraph::job::BuildContext;
//! use serde_json::json;
//!
//! let description = json!({
//!     "name": "demo",
//!     "dir": "/scratch",
//!     "jobs": [
//!         {"id": 0, "name": "first", "cmd": "sleep 10"},
//!         {"id": 1, "name": "second", "cmd": "echo hello", "depend": 0}
//!     ]
//! });
//! let graph = Graph::from_value(&description, &BuildContext::default()).expect("graph");
//! let deps: Vec<_> = graph.dependencies_of(1).map(|job| job.name()).collect();
//! assert_eq!(deps, ["first"]);
//! ```

mod order;

pub use order::ResolutionOrder;

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use serde_json::Value;

use crate::error::ModelError;
use crate::fields::{Field, FieldTree};
use crate::job::{BuildContext, Job, JobDefaults, JobId};
use crate::scope::Scope;

/// A validated collection of jobs with resolved dependency edges.
#[derive(Debug, Clone, Serialize)]
pub struct Graph {
    name: String,
    global_scope: Scope,
    defaults: JobDefaults,
    jobs: Vec<Job>,
    #[serde(skip)]
    dependencies: Vec<Vec<usize>>,
}

impl Graph {
    /// Build a graph from a parsed description.
    ///
    /// The graph's DIR, QUEUE, RES and SHELL fields override `ctx.defaults`
    /// and its VAR block overrides `ctx.global_scope` for every job.
    ///
    /// # Errors
    ///
    /// Returns any error raised while building a job, plus
    /// [`ModelError::EmptyGraph`], [`ModelError::DuplicateId`],
    /// [`ModelError::DuplicateName`], [`ModelError::InvalidName`] and
    /// [`ModelError::UnresolvedDependency`].
    pub fn from_value(value: &Value, ctx: &BuildContext) -> Result<Self, ModelError> {
        let tree = FieldTree::from_value(value, "a graph")?;
        let name = tree
            .text(Field::Name)?
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| uuid::Uuid::new_v4().simple().to_string());

        let defaults = ctx.defaults.overridden_by(&tree)?;
        let mut global_scope = tree
            .mapping(Field::Variables, ModelError::ScopeNotMapping)?
            .map(Scope::from_mapping)
            .unwrap_or_default();
        global_scope.fill_from(&ctx.global_scope);

        let entries = tree.list(Field::Jobs);
        if entries.is_empty() {
            return Err(ModelError::EmptyGraph { graph: name });
        }
        let job_ctx = BuildContext {
            defaults: defaults.clone(),
            global_scope: global_scope.clone(),
            environment: ctx.environment.clone(),
            sigils: ctx.sigils,
        };
        let jobs = entries
            .into_iter()
            .map(|entry| Job::from_value(entry, &job_ctx))
            .collect::<Result<Vec<_>, _>>()?;

        validate(&jobs)?;
        let dependencies = resolve_dependencies(&jobs)?;

        Ok(Self {
            name,
            global_scope,
            defaults,
            jobs,
            dependencies,
        })
    }

    /// Graph name, generated when the description omits it.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Graph-level variables shared by every job.
    #[must_use]
    pub const fn global_scope(&self) -> &Scope {
        &self.global_scope
    }

    /// Defaults applied to jobs that omit a field.
    #[must_use]
    pub const fn defaults(&self) -> &JobDefaults {
        &self.defaults
    }

    /// Jobs in declaration order.
    #[must_use]
    pub fn jobs(&self) -> &[Job] {
        &self.jobs
    }

    /// Prerequisites of the job at `index`, in the order it lists them.
    ///
    /// Yields nothing when `index` is out of range.
    pub fn dependencies_of(&self, index: usize) -> impl Iterator<Item = &Job> {
        self.dependencies
            .get(index)
            .into_iter()
            .flatten()
            .filter_map(|dep| self.jobs.get(*dep))
    }

    /// Order jobs so that each follows all of its prerequisites.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::CyclicDependency`] when the dependency relation
    /// contains a cycle.
    pub fn resolution_order(&self) -> Result<ResolutionOrder, ModelError> {
        order::resolve(&self.dependencies).map_err(|unresolved| ModelError::CyclicDependency {
            jobs: unresolved
                .into_iter()
                .filter_map(|idx| self.jobs.get(idx))
                .map(|job| job.name().to_owned())
                .collect(),
        })
    }
}

/// Reject repeated ids, repeated names and names unusable as shell variables.
///
/// Jobs are checked in declaration order and the first problem wins.
fn validate(jobs: &[Job]) -> Result<(), ModelError> {
    let mut ids = HashSet::new();
    let mut names = HashSet::new();
    for job in jobs {
        if !ids.insert(job.id()) {
            return Err(ModelError::DuplicateId {
                id: job.id().to_string(),
            });
        }
        if !names.insert(job.name()) {
            return Err(ModelError::DuplicateName {
                name: job.name().to_owned(),
            });
        }
        if !is_shell_identifier(job.name()) {
            return Err(ModelError::InvalidName {
                name: job.name().to_owned(),
            });
        }
    }
    Ok(())
}

fn is_shell_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|first| first.is_ascii_alphabetic() || first == '_')
        && chars.all(|ch| ch.is_ascii_alphanumeric() || ch == '_')
}

fn resolve_dependencies(jobs: &[Job]) -> Result<Vec<Vec<usize>>, ModelError> {
    let index: HashMap<&JobId, usize> = jobs
        .iter()
        .enumerate()
        .map(|(idx, job)| (job.id(), idx))
        .collect();
    jobs.iter()
        .map(|job| {
            job.depends_on()
                .iter()
                .map(|id| {
                    index
                        .get(id)
                        .copied()
                        .ok_or_else(|| ModelError::UnresolvedDependency {
                            job: job.name().to_owned(),
                            id: id.to_string(),
                        })
                })
                .collect()
        })
        .collect()
}
