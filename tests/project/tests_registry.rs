//! Registry tests: loading flow files from disk and validating in parallel.

use std::fs;
use std::path::Path;

use flowdef::project::{FlowRegistry, RegistryError};
use flowdef::validation::{StaticContext, ValidationOptions, codes};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

use crate::helpers::flow_fixtures::*;

fn write(dir: &Path, relative: &str, text: &str) {
    let path = dir.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, text).unwrap();
}

const CALLER: &str = r#"<flow start-state="call">
  <subflow-state id="call" flow="orders">
    <transition on="done" to="end"/>
  </subflow-state>
  <end-state id="end"/>
</flow>"#;

#[test]
fn test_load_dir_walks_nested_directories() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "orders.xml", ORDER_FLOW);
    write(dir.path(), "nested/deeper/marker.xml", MARKER_FLOW);
    write(dir.path(), "README.txt", "not a flow");

    let registry = FlowRegistry::new();
    let mut loaded = registry.load_dir(dir.path()).unwrap();
    loaded.sort();

    assert_eq!(loaded, vec!["marker", "orders"]);
    assert_eq!(registry.len(), 2);
    let handle = registry.get("marker").unwrap();
    let model = handle.read();
    assert!(model.state_by_id(model.root(), "done").is_some());
}

#[test]
fn test_load_dir_skips_broken_and_duplicate_files() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "a/orders.xml", ORDER_FLOW);
    write(dir.path(), "b/orders.xml", DANGLING_FLOW);
    write(dir.path(), "broken.xml", "<flow><view-state id=\"x\"></flow>");

    let registry = FlowRegistry::new();
    let loaded = registry.load_dir(dir.path()).unwrap();

    assert_eq!(loaded, vec!["orders"]);
    // Path order: `a/orders.xml` wins.
    let handle = registry.get("orders").unwrap();
    let model = handle.read();
    let b = model.state_by_id(model.root(), "B").unwrap();
    assert_eq!(model.inbound(b).len(), 1);
}

#[test]
fn test_load_dir_on_missing_directory_fails() {
    let dir = TempDir::new().unwrap();
    let registry = FlowRegistry::new();
    let result = registry.load_dir(&dir.path().join("absent"));
    assert!(matches!(result, Err(RegistryError::Io { .. })));
}

#[test]
fn test_load_file_rejects_other_extensions() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "orders.txt", ORDER_FLOW);

    let registry = FlowRegistry::new();
    let result = registry.load_file(&dir.path().join("orders.txt"));
    assert!(matches!(result, Err(RegistryError::UnsupportedExtension(ext)) if ext == "txt"));
    assert!(registry.is_empty());
}

#[test]
fn test_load_file_names_flow_after_stem() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "checkout-flow.xml", ORDER_FLOW);

    let registry = FlowRegistry::new();
    registry.load_file(&dir.path().join("checkout-flow.xml")).unwrap();
    assert!(registry.contains("checkout-flow"));

    let again = registry.load_file(&dir.path().join("checkout-flow.xml"));
    assert!(matches!(again, Err(RegistryError::Duplicate(name)) if name == "checkout-flow"));
}

#[test]
fn test_validate_all_reports_in_registration_order() {
    let registry = FlowRegistry::new();
    registry.load_str("dangling", DANGLING_FLOW).unwrap();
    registry.load_str("caller", CALLER).unwrap();
    registry.load_str("orders", ORDER_FLOW).unwrap();
    registry.load_str("rich", RICH_FLOW).unwrap();

    let ctx = StaticContext::new()
        .with_bean("orders", ["place"])
        .with_bean("cartService", ["load", "validate"])
        .with_bean("errors", Vec::<&str>::new())
        .with_type("com.acme.Cart", flowdef::validation::TypeShape::Concrete)
        .with_alias_types();
    let reports = registry.validate_all(&ctx, &ValidationOptions::default(), &CancellationToken::new());

    let names: Vec<_> = reports.iter().map(|(name, _)| name.as_str()).collect();
    assert_eq!(names, vec!["dangling", "caller", "orders", "rich"]);

    let dangling = &reports[0].1;
    let found: Vec<_> = dangling.problems.iter().map(|p| p.code).collect();
    assert_eq!(found, vec![codes::UNRESOLVED_TARGET]);
    // `caller` finds `orders` through the registry.
    assert!(reports[1].1.is_clean(), "{:?}", reports[1].1.problems);
    assert!(reports[2].1.is_clean());
    assert!(reports[3].1.is_clean(), "{:?}", reports[3].1.problems);
}

#[test]
fn test_validate_all_after_edit_and_removal() {
    let registry = FlowRegistry::new();
    let orders = registry.load_str("orders", DANGLING_FLOW).unwrap();
    registry.load_str("caller", CALLER).unwrap();
    let ctx = StaticContext::new().with_bean("orders", ["place"]);
    let options = ValidationOptions::default();

    {
        let mut model = orders.write();
        let root = model.root();
        model
            .add_state(root, flowdef::ElementKind::EndState, "C")
            .unwrap();
    }
    registry.remove("caller");

    let reports = registry.validate_all(&ctx, &options, &CancellationToken::new());
    assert_eq!(reports.len(), 1);
    assert!(reports[0].1.is_clean(), "{:?}", reports[0].1.problems);

    let cancel = CancellationToken::new();
    cancel.cancel();
    let cancelled = registry.validate_all(&ctx, &options, &cancel);
    assert!(cancelled.iter().all(|(_, report)| report.cancelled));
}

#[test]
fn test_unknown_subflow_without_registry_entry() {
    let registry = FlowRegistry::new();
    registry.load_str("caller", CALLER).unwrap();
    let reports = registry.validate_all(
        &StaticContext::new(),
        &ValidationOptions::default(),
        &CancellationToken::new(),
    );
    let found: Vec<_> = reports[0].1.problems.iter().map(|p| p.code).collect();
    assert_eq!(found, vec![codes::UNKNOWN_FLOW]);
}
