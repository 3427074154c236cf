//! Editing tests: rename propagation, removal and notifications.

use flowdef::base::ElementKind;
use flowdef::model::{Change, FlowModel, ModelError, StructureTopic};

use crate::helpers::flow_fixtures::*;
use crate::helpers::model_helpers::{EventLog, assert_reconnected, child_tags};

// =============================================================================
// RENAME
// =============================================================================

#[test]
fn test_rename_carries_inbound_transitions() {
    let mut model = FlowModel::parse(MARKER_FLOW).unwrap();
    let root = model.root();
    let a = model.state_by_id(root, "A").unwrap();
    let inbound_before = model.inbound(a).to_vec();
    assert_eq!(inbound_before.len(), 2);

    model.rename_state(a, "Start").unwrap();

    assert_eq!(model.id_of(a), Some("Start"));
    assert_eq!(model.inbound(a), inbound_before.as_slice());
    for transition in &inbound_before {
        assert_eq!(model.to_state_id(*transition), Some("Start"));
        assert_eq!(model.target(*transition), Some(a));
    }
    assert_eq!(model.start_state(root), Some(a));
    assert_reconnected(&model);
}

#[test]
fn test_rename_into_existing_id_keeps_both_reachable() {
    let mut model = FlowModel::parse(MARKER_FLOW).unwrap();
    let root = model.root();
    let a = model.state_by_id(root, "A").unwrap();
    let done = model.state_by_id(root, "done").unwrap();

    model.rename_state(done, "A").unwrap();

    assert_eq!(model.states_by_id(root, "A"), vec![a, done]);
    // Transitions keep the state they were resolved to.
    for transition in model.inbound(a).to_vec() {
        assert_eq!(model.target(transition), Some(a));
    }
    assert!(model.inbound(done).is_empty());
    assert_reconnected(&model);
}

#[test]
fn test_rename_rewrites_xml() {
    let mut model = FlowModel::parse(ORDER_FLOW).unwrap();
    let root = model.root();
    let b = model.state_by_id(root, "B").unwrap();
    model.rename_state(b, "review").unwrap();

    let xml = model.to_xml(&Default::default()).unwrap();
    assert!(xml.contains(r#"<transition on="success" to="review"/>"#));
    assert!(xml.contains(r#"<view-state id="review" view="confirmation"/>"#));
    assert!(xml.contains(r#"<flow start-state="A">"#));
}

#[test]
fn test_rename_fires_property_events_in_mutation_order() {
    let mut model = FlowModel::parse(ORDER_FLOW).unwrap();
    let root = model.root();
    let a = model.state_by_id(root, "A").unwrap();
    let b = model.state_by_id(root, "B").unwrap();
    let transition = model.outbound(a)[0];
    let log = EventLog::attach(&mut model);

    model.rename_state(b, "C").unwrap();

    let properties: Vec<_> = log
        .events()
        .into_iter()
        .filter_map(|e| match e.change {
            Change::Property { name, new, .. } => Some((e.element, name.to_string(), new)),
            Change::Structure { .. } => None,
        })
        .collect();
    assert_eq!(
        properties,
        vec![
            (b, "id".to_string(), Some("C".to_string())),
            (transition, "to".to_string(), Some("C".to_string())),
        ]
    );
}

// =============================================================================
// REMOVAL
// =============================================================================

#[test]
fn test_removing_absent_state_is_silent() {
    let mut model = FlowModel::parse(ORDER_FLOW).unwrap();
    let root = model.root();
    let b = model.state_by_id(root, "B").unwrap();
    assert!(model.remove_state(root, b).unwrap());

    let log = EventLog::attach(&mut model);
    assert!(!model.remove_state(root, b).unwrap());
    assert!(log.events().is_empty());
}

#[test]
fn test_removing_state_of_other_flow_is_noop() {
    let mut model = FlowModel::parse(RICH_FLOW).unwrap();
    let root = model.root();
    let nested = model.inline_flows(root)[0];
    let pick = model.state_by_id(nested, "pick").unwrap();

    let log = EventLog::attach(&mut model);
    assert!(!model.remove_state(root, pick).unwrap());
    assert!(log.events().is_empty());
    assert!(model.contains(pick));
}

#[test]
fn test_removal_fires_exactly_one_structure_change() {
    let mut model = FlowModel::parse(ORDER_FLOW).unwrap();
    let root = model.root();
    let b = model.state_by_id(root, "B").unwrap();
    let log = EventLog::attach(&mut model);

    assert!(model.remove_state(root, b).unwrap());

    assert_eq!(log.structure_count(), 1);
    assert_eq!(log.structure_on(root), vec![StructureTopic::RemoveChildren]);
    assert_eq!(model.states(root).len(), 1);
    assert_eq!(child_tags(&model, root), vec!["action-state"]);
}

#[test]
fn test_removed_handles_are_rejected() {
    let mut model = FlowModel::parse(ORDER_FLOW).unwrap();
    let root = model.root();
    let a = model.state_by_id(root, "A").unwrap();
    let transition = model.outbound(a)[0];
    model.remove_state(root, a).unwrap();

    assert!(!model.contains(transition));
    assert!(matches!(
        model.set_attribute(transition, "on", Some("x")),
        Err(ModelError::UnknownElement(_))
    ));
}

// =============================================================================
// CLONE AND VIEWS
// =============================================================================

#[test]
fn test_staged_clone_edit_keeps_handles() {
    let mut model = FlowModel::parse(RICH_FLOW).unwrap();
    let root = model.root();
    let ship = model.state_by_id(root, "ship").unwrap();
    let inbound = model.inbound(ship).to_vec();

    let clone = model.clone_detached(ship).unwrap();
    let copy_transition = model.outbound(clone.root)[0];
    model.set_attribute(copy_transition, "on", Some("shipped")).unwrap();
    model.apply_clone(ship, clone).unwrap();

    let view = model.flow_view().state("ship").unwrap();
    assert_eq!(view.inner.id, ship);
    assert_eq!(view.transitions()[0].on(), Some("shipped"));
    assert_eq!(model.inbound(ship), inbound.as_slice());
    assert!(view.attribute_mapper().is_some());
    assert_reconnected(&model);
}

#[test]
fn test_editing_through_the_inline_flow() {
    let mut model = FlowModel::parse(RICH_FLOW).unwrap();
    let root = model.root();
    let nested = model.inline_flows(root)[0];

    let extra = model.add_state(nested, ElementKind::EndState, "enter").unwrap();
    // Same id as an outer state; each flow resolves in its own namespace.
    let pick = model.state_by_id(nested, "pick").unwrap();
    let t = model.add_transition(pick, "restart", "enter").unwrap();
    assert_eq!(model.target(t), Some(extra));
    let outer_enter = model.state_by_id(root, "enter").unwrap();
    assert!(!model.inbound(outer_enter).contains(&t));
    assert_reconnected(&model);
}
