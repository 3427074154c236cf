//! End-to-end scenarios: build, validate, repair and rename a small flow.

use flowdef::base::ElementKind;
use flowdef::model::{ElementId, FlowModel, StructureTopic};
use flowdef::validation::{FlowValidator, StaticContext, ValidationOptions, ValidationReport, codes};
use tokio_util::sync::CancellationToken;

use crate::helpers::model_helpers::{EventLog, child_tags};

/// `A` (action state, one action) --success--> `to`, plus view state `B`.
fn build(to: &str) -> (FlowModel, ElementId, ElementId, ElementId) {
    let mut model = FlowModel::new();
    let root = model.root();
    let a = model.add_state(root, ElementKind::ActionState, "A").unwrap();
    let action = model.add_action(a, ElementKind::Action).unwrap();
    model.set_attribute(action, "bean", Some("orders")).unwrap();
    let b = model.add_state(root, ElementKind::ViewState, "B").unwrap();
    let transition = model.add_transition(a, "success", to).unwrap();
    model.set_start_state(root, Some("A")).unwrap();
    (model, a, b, transition)
}

fn validate(model: &FlowModel) -> ValidationReport {
    let ctx = StaticContext::new().with_bean("orders", ["place"]);
    FlowValidator::validate(model, &ctx, &ValidationOptions::default(), &CancellationToken::new())
}

#[test]
fn test_connected_flow_validates_cleanly() {
    let (model, a, b, transition) = build("B");
    assert_eq!(model.inbound(b), &[transition]);
    assert_eq!(model.target(transition), Some(b));
    assert_eq!(model.start_state(model.root()), Some(a));
    assert_eq!(validate(&model).error_count(), 0);
}

#[test]
fn test_dangling_transition_reports_one_error() {
    let (model, _, _, transition) = build("C");
    assert_eq!(model.target(transition), None);

    let report = validate(&model);
    assert_eq!(report.error_count(), 1);
    let problem = &report.problems[0];
    assert_eq!(problem.element, transition);
    assert_eq!(problem.code, codes::UNRESOLVED_TARGET);
    assert!(problem.message.contains("\"C\""));
}

#[test]
fn test_adding_missing_state_repairs_transition() {
    let (mut model, a, _, transition) = build("C");
    let root = model.root();
    let log = EventLog::attach(&mut model);

    let c = model.add_state(root, ElementKind::EndState, "C").unwrap();

    assert_eq!(model.target(transition), Some(c));
    assert_eq!(model.inbound(c), &[transition]);
    assert_eq!(log.structure_on(a), vec![StructureTopic::Outputs]);
    assert!(validate(&model).is_clean());
}

#[test]
fn test_entry_actions_and_action_order_in_fresh_state() {
    for entry_first in [true, false] {
        let mut model = FlowModel::new();
        let root = model.root();
        let state = model.add_state(root, ElementKind::ActionState, "s").unwrap();
        if entry_first {
            model.ensure_entry_actions(state).unwrap();
            model.add_action(state, ElementKind::Action).unwrap();
        } else {
            model.add_action(state, ElementKind::Action).unwrap();
            model.ensure_entry_actions(state).unwrap();
        }
        assert_eq!(child_tags(&model, state), vec!["entry-actions", "action"]);

        model.ensure_exit_actions(state).unwrap();
        assert_eq!(
            child_tags(&model, state),
            vec!["entry-actions", "action", "exit-actions"]
        );
    }
}

#[test]
fn test_renaming_start_state_updates_marker() {
    let mut model = FlowModel::parse(
        r#"<flow>
  <start-state idref="A"/>
  <action-state id="A">
    <action bean="orders"/>
    <transition on="success" to="B"/>
  </action-state>
  <view-state id="B">
    <transition on="back" to="A"/>
  </view-state>
</flow>"#,
    )
    .unwrap();
    let root = model.root();
    let a = model.state_by_id(root, "A").unwrap();
    let b = model.state_by_id(root, "B").unwrap();
    let forward = model.outbound(a)[0];

    model.rename_state(a, "A2").unwrap();

    let marker = model.start_state_markers(root)[0];
    assert_eq!(model.document().attribute(marker, "idref"), Some("A2"));
    assert_eq!(model.start_state(root), Some(a));
    assert_eq!(model.target(forward), Some(b));
    assert_eq!(model.inbound(a).len(), 1);
    assert!(validate(&model).is_clean());
}
