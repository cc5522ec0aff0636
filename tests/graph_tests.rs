//! Integration tests for graph construction, validation and dependency
//! resolution.

use qsubgraph::graph::Graph;
use qsubgraph::job::{BuildContext, JobId};
use qsubgraph::scope::Scope;
use qsubgraph::{ErrorCategory, ModelError};
use rstest::{fixture, rstest};
use serde_json::{Value, json};

#[fixture]
fn ctx() -> BuildContext {
    BuildContext {
        environment: Scope::from_iter([("HOME", "/home/alice")]),
        ..BuildContext::default()
    }
}

fn job(id: &Value, name: &str) -> Value {
    json!({"id": id, "name": name, "cmd": "true"})
}

#[rstest]
fn graph_defaults_apply_to_jobs(ctx: BuildContext) {
    let graph = Graph::from_value(
        &json!({
            "name": "demo",
            "dir": "$HOME/scratch",
            "queue": "long",
            "res": {"nodes": 4},
            "jobs": [
                {"id": 0, "name": "a", "cmd": "true"},
                {"id": 1, "name": "b", "cmd": "true", "q": "short", "dir": "/tmp"}
            ]
        }),
        &ctx,
    )
    .expect("graph");
    let [a, b] = graph.jobs() else {
        panic!("expected two jobs");
    };
    assert_eq!(graph.name(), "demo");
    assert_eq!((a.queue(), a.directory()), ("long", "/home/alice/scratch"));
    assert_eq!(a.resources().get("nodes"), Some("4"));
    assert_eq!((b.queue(), b.directory()), ("short", "/tmp"));
    assert_eq!(graph.defaults().queue, "long");
}

#[rstest]
fn graph_variables_form_the_global_scope(ctx: BuildContext) {
    let ctx = BuildContext {
        global_scope: Scope::from_iter([("a", "outer"), ("b", "outer")]),
        ..ctx
    };
    let graph = Graph::from_value(
        &json!({
            "var": {"a": "graph"},
            "jobs": [
                {"id": 0, "name": "x", "cmd": "echo $a $b"},
                {"id": 1, "name": "y", "cmd": "echo $a", "var": {"a": "local"}}
            ]
        }),
        &ctx,
    )
    .expect("graph");
    let commands: Vec<&str> = graph
        .jobs()
        .iter()
        .flat_map(|job| job.commands().iter().map(String::as_str))
        .collect();
    assert_eq!(commands, ["echo graph outer", "echo local"]);
    assert_eq!(graph.global_scope().get("a"), Some("graph"));
}

#[rstest]
fn missing_name_is_generated(ctx: BuildContext) {
    let graph = Graph::from_value(&json!({"jobs": [job(&json!(0), "a")]}), &ctx).expect("graph");
    assert_eq!(graph.name().len(), 32);
    assert!(graph.name().chars().all(|ch| ch.is_ascii_hexdigit()));
}

#[rstest]
#[case(json!({"name": "g"}))]
#[case(json!({"name": "g", "jobs": []}))]
#[case(json!({"name": "g", "nodes": null}))]
fn graph_without_jobs_is_rejected(ctx: BuildContext, #[case] input: Value) {
    assert_eq!(
        Graph::from_value(&input, &ctx).expect_err("no jobs"),
        ModelError::EmptyGraph { graph: "g".to_owned() }
    );
}

#[rstest]
#[case(
    vec![job(&json!(0), "a"), job(&json!(0), "b")],
    ModelError::DuplicateId { id: "0".to_owned() }
)]
#[case(
    vec![job(&json!(0), "a"), job(&json!(1), "a")],
    ModelError::DuplicateName { name: "a".to_owned() }
)]
#[case(
    vec![job(&json!(0), "a"), job(&json!(1), "b"), job(&json!(1), "a")],
    ModelError::DuplicateId { id: "1".to_owned() }
)]
#[case(
    vec![job(&json!(0), "a"), job(&json!(1), "a"), job(&json!(0), "c")],
    ModelError::DuplicateName { name: "a".to_owned() }
)]
#[case(
    vec![job(&json!("x"), "a"), job(&json!("x"), "b")],
    ModelError::DuplicateId { id: "\"x\"".to_owned() }
)]
fn first_collision_is_reported(
    ctx: BuildContext,
    #[case] jobs: Vec<Value>,
    #[case] expected: ModelError,
) {
    let err = Graph::from_value(&json!({"jobs": jobs}), &ctx).expect_err("collision");
    assert_eq!(err, expected);
    assert_eq!(err.category(), ErrorCategory::Configuration);
}

#[rstest]
fn integer_and_string_ids_are_distinct(ctx: BuildContext) {
    let graph = Graph::from_value(
        &json!({"jobs": [job(&json!(1), "a"), job(&json!("1"), "b")]}),
        &ctx,
    )
    .expect("1 and \"1\" do not collide");
    assert_eq!(graph.jobs().len(), 2);

    let err = Graph::from_value(
        &json!({"jobs": [
            job(&json!(0), "a"),
            {"id": 1, "name": "b", "cmd": "true", "depend": "0"}
        ]}),
        &ctx,
    )
    .expect_err("\"0\" does not reference 0");
    assert_eq!(
        err,
        ModelError::UnresolvedDependency {
            job: "b".to_owned(),
            id: "\"0\"".to_owned(),
        }
    );
}

#[rstest]
fn unknown_dependency_is_rejected(ctx: BuildContext) {
    let err = Graph::from_value(
        &json!({"jobs": [{"id": 0, "name": "a", "cmd": "true", "depend": [7]}]}),
        &ctx,
    )
    .expect_err("unresolved");
    assert_eq!(
        err,
        ModelError::UnresolvedDependency {
            job: "a".to_owned(),
            id: "7".to_owned(),
        }
    );
}

#[rstest]
#[case("my-job")]
#[case("2nd")]
#[case("a.b")]
fn names_must_be_shell_identifiers(ctx: BuildContext, #[case] name: &str) {
    let err = Graph::from_value(&json!({"jobs": [job(&json!(0), name)]}), &ctx)
        .expect_err("invalid name");
    assert_eq!(err, ModelError::InvalidName { name: name.to_owned() });
}

#[rstest]
fn dependencies_resolve_to_jobs_in_listed_order(ctx: BuildContext) {
    let graph = Graph::from_value(
        &json!({"jobs": [
            job(&json!(0), "a"),
            job(&json!(1), "b"),
            {"id": 2, "name": "c", "cmd": "true", "dependent": [1, 0]}
        ]}),
        &ctx,
    )
    .expect("graph");
    let deps: Vec<&str> = graph.dependencies_of(2).map(|job| job.name()).collect();
    assert_eq!(deps, ["b", "a"]);
    assert_eq!(graph.dependencies_of(0).count(), 0);
    assert_eq!(graph.dependencies_of(99).count(), 0);
    let ids = graph.jobs().get(2).map(|job| job.depends_on().to_vec());
    assert_eq!(ids, Some(vec![JobId::Int(1), JobId::Int(0)]));
}

#[rstest]
fn cycles_do_not_prevent_construction(ctx: BuildContext) {
    let graph = Graph::from_value(
        &json!({"jobs": [
            {"id": 0, "name": "a", "cmd": "true", "depend": 1},
            {"id": 1, "name": "b", "cmd": "true", "depend": 0}
        ]}),
        &ctx,
    )
    .expect("cycle detection is deferred");
    let err = graph.resolution_order().expect_err("cycle");
    assert_eq!(
        err,
        ModelError::CyclicDependency {
            jobs: vec!["a".to_owned(), "b".to_owned()],
        }
    );
    assert_eq!(err.category(), ErrorCategory::Structural);
}

#[rstest]
fn resolution_follows_dependencies(ctx: BuildContext) {
    // d needs b and c, which both need a; declared in reverse.
    let graph = Graph::from_value(
        &json!({"jobs": [
            {"id": "d", "name": "d", "cmd": "true", "depend": ["b", "c"]},
            {"id": "c", "name": "c", "cmd": "true", "depend": "a"},
            {"id": "b", "name": "b", "cmd": "true", "depend": "a"},
            {"id": "a", "name": "a", "cmd": "true"}
        ]}),
        &ctx,
    )
    .expect("graph");
    let resolution = graph.resolution_order().expect("acyclic");
    assert_eq!(resolution.order, vec![3, 1, 2, 0]);
    assert_eq!(resolution.passes, 3);
}
