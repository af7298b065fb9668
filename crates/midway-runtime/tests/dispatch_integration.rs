// SPDX-FileCopyrightText: 2026 Midway Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end discovery, catalog refresh and dispatch against real plugin trees.

use std::sync::Arc;

use midway_core::{BASE_UID, MidwayError, ProcessingContext};
use midway_runtime::MiddlewareHost;
use midway_test_utils::harness::{BROKEN, ECHO_CONFIG, PASSTHROUGH, PluginTree, result_unit, unit_manifest};
use midway_test_utils::RecordingPipeline;
use serde_json::json;

fn host_for(tree: &PluginTree) -> (MiddlewareHost, Arc<RecordingPipeline>) {
    let pipeline = Arc::new(RecordingPipeline::new());
    let host = MiddlewareHost::start(tree.config(), pipeline.clone()).unwrap();
    (host, pipeline)
}

fn ctx() -> ProcessingContext {
    ProcessingContext(json!({"prompt": "a lighthouse", "steps": 20}))
}

#[test]
fn start_discovers_and_writes_catalog() {
    let tree = PluginTree::new();
    tree.write_module(
        "ExampleMiddleware",
        &unit_manifest("example_middleware", "Example Middleware", "example.wat"),
        &[("example.wat", PASSTHROUGH)],
    );

    let (host, _) = host_for(&tree);
    assert_eq!(
        host.list_selectable_units(),
        vec!["Example Middleware (example_middleware)"]
    );

    let written: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(tree.catalog_path()).unwrap()).unwrap();
    assert_eq!(
        written["middleware"]["example_middleware"],
        json!({"name": "Example Middleware", "module": "middleware.ExampleMiddleware"})
    );
}

#[test]
fn discovery_is_idempotent() {
    let tree = PluginTree::new();
    tree.write_module("a", &unit_manifest("a", "A", "a.wat"), &[("a.wat", PASSTHROUGH)]);
    tree.write_module("b", &unit_manifest("b", "B", "b.wat"), &[("b.wat", PASSTHROUGH)]);
    let (host, _) = host_for(&tree);

    let first = host.discover();
    let second = host.discover();
    assert_eq!(first.uids(), second.uids());
    assert!(!Arc::ptr_eq(&first, &second));
}

#[test]
fn base_unit_never_listed() {
    let tree = PluginTree::new();
    tree.write_module(
        "MiddlewareBase",
        &unit_manifest(BASE_UID, "Base Middleware", "base.wat"),
        &[("base.wat", PASSTHROUGH)],
    );
    tree.write_module("real", &unit_manifest("real", "Real", "r.wat"), &[("r.wat", PASSTHROUGH)]);
    let (host, _) = host_for(&tree);

    let registry = host.registry();
    assert!(registry.iter().all(|u| u.uid() != BASE_UID));
    assert_eq!(host.list_selectable_units(), vec!["Real (real)"]);
}

#[test]
fn selections_round_trip_in_natural_order() {
    let tree = PluginTree::new();
    for (uid, name) in [("u10", "unit10"), ("u2", "unit2"), ("u1", "Unit1")] {
        tree.write_module(uid, &unit_manifest(uid, name, "u.wat"), &[("u.wat", PASSTHROUGH)]);
    }
    let (host, _) = host_for(&tree);

    let choices = host.list_selectable_units();
    assert_eq!(choices, vec!["Unit1 (u1)", "unit2 (u2)", "unit10 (u10)"]);
    for choice in &choices {
        let class = host.resolve(Some(choice)).unwrap();
        assert_eq!(
            midway_plugin::format_selection(class.name(), class.uid()),
            *choice
        );
    }
}

#[test]
fn refresh_preserves_undiscovered_catalog_entries() {
    let tree = PluginTree::new();
    std::fs::create_dir_all(tree.catalog_path().parent().unwrap()).unwrap();
    std::fs::write(
        tree.catalog_path(),
        r#"{"middleware": {"X": {"name": "Old", "module": "m"}}}"#,
    )
    .unwrap();
    tree.write_module("a", &unit_manifest("a", "A", "a.wat"), &[("a.wat", PASSTHROUGH)]);

    let (host, _) = host_for(&tree);
    let catalog = host.refresh_catalog().unwrap();

    assert_eq!(catalog.middleware["X"], json!({"name": "Old", "module": "m"}));
    assert_eq!(catalog.middleware["a"], json!({"name": "A", "module": "middleware.a"}));
}

#[test]
fn corrupt_catalog_does_not_block_discovery() {
    let tree = PluginTree::new();
    std::fs::create_dir_all(tree.catalog_path().parent().unwrap()).unwrap();
    std::fs::write(tree.catalog_path(), "not json").unwrap();
    tree.write_module("a", &unit_manifest("a", "A", "a.wat"), &[("a.wat", PASSTHROUGH)]);

    let (host, _) = host_for(&tree);
    assert_eq!(host.registry().uids(), vec!["a"]);
    assert!(matches!(host.refresh_catalog(), Err(MidwayError::Storage { .. })));
    assert_eq!(std::fs::read_to_string(tree.catalog_path()).unwrap(), "not json");
}

#[tokio::test]
async fn dispatch_runs_passthrough_unit() {
    let tree = PluginTree::new();
    tree.write_module(
        "ExampleMiddleware",
        &unit_manifest("example_middleware", "Example Middleware", "example.wat"),
        &[("example.wat", PASSTHROUGH)],
    );
    let (host, pipeline) = host_for(&tree);

    let result = host
        .dispatch(Some("Example Middleware (example_middleware)"), None, ctx())
        .await
        .unwrap();
    assert_eq!(result.0, json!({"processed": {"prompt": "a lighthouse", "steps": 20}}));
    assert_eq!(pipeline.call_count(), 1);
}

#[tokio::test]
async fn dispatch_uses_freshly_reloaded_code() {
    let tree = PluginTree::new();
    tree.write_module(
        "m",
        &unit_manifest("versioned", "Versioned", "v.wat"),
        &[("v.wat", &result_unit(r#"{"version":1}"#))],
    );
    let (host, _) = host_for(&tree);

    let first = host.dispatch(Some("Versioned (versioned)"), None, ctx()).await.unwrap();
    assert_eq!(first.0, json!({"version": 1}));

    tree.write_source("m", "v.wat", &result_unit(r#"{"version":2}"#));
    let second = host.dispatch(Some("Versioned (versioned)"), None, ctx()).await.unwrap();
    assert_eq!(second.0, json!({"version": 2}));
}

#[tokio::test]
async fn broken_edit_fails_with_reload_error() {
    let tree = PluginTree::new();
    tree.write_module("m", &unit_manifest("u", "U", "u.wat"), &[("u.wat", PASSTHROUGH)]);
    let (host, pipeline) = host_for(&tree);

    tree.write_source("m", "u.wat", BROKEN);
    let err = host.dispatch(Some("U (u)"), None, ctx()).await.unwrap_err();
    assert!(matches!(err, MidwayError::Reload { ref module, .. } if module == "middleware.m"));
    assert_eq!(pipeline.call_count(), 0);
}

#[tokio::test]
async fn unknown_selection_runs_nothing() {
    let tree = PluginTree::new();
    tree.write_module("m", &unit_manifest("u", "U", "u.wat"), &[("u.wat", PASSTHROUGH)]);
    let (host, pipeline) = host_for(&tree);

    let err = host
        .dispatch(Some("Nonexistent (does_not_exist)"), Some(Default::default()), ctx())
        .await
        .unwrap_err();
    assert!(matches!(err, MidwayError::UnknownUnit { ref uid } if uid == "does_not_exist"));
    assert_eq!(err.to_string(), "Middleware does_not_exist not found");
    assert_eq!(pipeline.call_count(), 0);
}

#[tokio::test]
async fn missing_selection_is_reported() {
    let tree = PluginTree::new();
    let (host, _) = host_for(&tree);

    let err = host.dispatch(None, None, ctx()).await.unwrap_err();
    assert_eq!(err.to_string(), "Middleware is required");
    let err = host.dispatch(Some("no group here"), None, ctx()).await.unwrap_err();
    assert!(matches!(err, MidwayError::MalformedSelection { .. }));
}

#[tokio::test]
async fn missing_config_defaults_to_empty_mapping() {
    let tree = PluginTree::new();
    tree.write_module(
        "echo",
        "[[middleware]]\nuid = \"echo\"\nname = \"Echo\"\nsource = \"echo.wat\"\n",
        &[("echo.wat", ECHO_CONFIG)],
    );
    let (host, _) = host_for(&tree);

    let class = host.resolve(Some("Echo (echo)")).unwrap();
    assert!(class.default_configuration().is_empty());

    let result = host.dispatch(Some("Echo (echo)"), None, ctx()).await.unwrap();
    assert_eq!(result.0, json!({}));
}

#[tokio::test]
async fn registry_snapshot_goes_stale_until_reloaded() {
    let tree = PluginTree::new();
    tree.write_module("a", &unit_manifest("a", "A", "a.wat"), &[("a.wat", PASSTHROUGH)]);
    let (host, _) = host_for(&tree);
    let before = host.registry();

    tree.write_module("b", &unit_manifest("b", "B", "b.wat"), &[("b.wat", PASSTHROUGH)]);
    host.discover();

    assert_eq!(before.uids(), vec!["a"]);
    assert_eq!(host.registry().uids(), vec!["a", "b"]);
}
