//! Reconnection tests: transition targets and inbound lists stay derived
//! from the current ids after any edit sequence.

use flowdef::base::ElementKind;
use flowdef::model::{FlowModel, StructureTopic};
use rstest::rstest;

use crate::helpers::flow_fixtures::*;
use crate::helpers::model_helpers::{EventLog, assert_reconnected};

#[derive(Clone, Copy, Debug)]
enum Edit {
    Add(&'static str),
    Remove(&'static str),
    Rename(&'static str, &'static str),
}

fn run(model: &mut FlowModel, edits: &[Edit]) {
    let root = model.root();
    for edit in edits {
        match *edit {
            Edit::Add(id) => {
                model.add_state(root, ElementKind::EndState, id).unwrap();
            }
            Edit::Remove(id) => {
                if let Some(state) = model.state_by_id(root, id) {
                    assert!(model.remove_state(root, state).unwrap());
                }
            }
            Edit::Rename(from, to) => {
                if let Some(state) = model.state_by_id(root, from) {
                    model.rename_state(state, to).unwrap();
                }
            }
        }
        assert_reconnected(model);
    }
}

#[rstest]
#[case::remove_then_add(&[Edit::Remove("B"), Edit::Add("B")])]
#[case::rename_away_and_back(&[Edit::Rename("B", "X"), Edit::Rename("X", "B")])]
#[case::collide(&[Edit::Add("A"), Edit::Remove("A"), Edit::Remove("A")])]
#[case::rename_into_collision(&[Edit::Rename("done", "B"), Edit::Remove("B"), Edit::Remove("B")])]
#[case::churn(&[
    Edit::Remove("A"),
    Edit::Add("C"),
    Edit::Rename("C", "A"),
    Edit::Add("B"),
    Edit::Remove("B"),
    Edit::Rename("done", "A"),
])]
fn test_links_follow_any_edit_sequence(#[case] edits: &[Edit]) {
    let mut model = FlowModel::parse(MARKER_FLOW).unwrap();
    assert_reconnected(&model);
    run(&mut model, edits);
}

#[test]
fn test_removed_target_leaves_transition_dangling() {
    let mut model = FlowModel::parse(ORDER_FLOW).unwrap();
    let root = model.root();
    let a = model.state_by_id(root, "A").unwrap();
    let b = model.state_by_id(root, "B").unwrap();
    let transition = model.outbound(a)[0];

    assert!(model.remove_state(root, b).unwrap());
    assert_eq!(model.target(transition), None);
    assert_eq!(model.to_state_id(transition), Some("B"));

    let b = model.add_state(root, ElementKind::ViewState, "B").unwrap();
    assert_eq!(model.target(transition), Some(b));
    assert_eq!(model.inbound(b), &[transition]);
}

#[test]
fn test_retargeting_moves_inbound_entry() {
    let mut model = FlowModel::parse(MARKER_FLOW).unwrap();
    let root = model.root();
    let a = model.state_by_id(root, "A").unwrap();
    let done = model.state_by_id(root, "done").unwrap();
    let to_b = model.outbound(a)[0];

    model.set_to_state_id(to_b, "done").unwrap();
    assert_eq!(model.target(to_b), Some(done));
    assert_eq!(model.inbound(done), &[to_b]);
    let b = model.state_by_id(root, "B").unwrap();
    assert!(model.inbound(b).is_empty());

    model.set_target(to_b, a).unwrap();
    assert_eq!(model.to_state_id(to_b), Some("A"));
    assert!(model.inbound(a).contains(&to_b));
    assert_reconnected(&model);
}

#[test]
fn test_explicit_reconnect_matches_derived_index() {
    let mut model = FlowModel::parse(RICH_FLOW).unwrap();
    let root = model.root();
    for flow in model.flows_within(root) {
        let wired = model.reconnect(flow).unwrap();
        assert!(wired.is_empty());
        for (state, transitions) in model.inbound_index(flow) {
            assert_eq!(model.inbound(state), transitions.as_slice());
        }
    }
}

#[test]
fn test_newly_resolved_transitions_are_announced() {
    let mut model = FlowModel::parse(MARKER_FLOW).unwrap();
    let root = model.root();
    let b = model.state_by_id(root, "B").unwrap();
    let back = model.outbound(b)[0];
    let a = model.state_by_id(root, "A").unwrap();
    model.remove_state(root, a).unwrap();

    let log = EventLog::attach(&mut model);
    let a = model.add_state(root, ElementKind::ActionState, "A").unwrap();
    assert_eq!(model.target(back), Some(a));
    assert!(log.structure_on(b).contains(&StructureTopic::Outputs));
    assert!(log.structure_on(a).contains(&StructureTopic::Inputs));
}
