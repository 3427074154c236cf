//! Ordering tests: children added through the model land at their
//! schema position no matter the call order.

use flowdef::base::ElementKind;
use flowdef::model::{ElementId, FlowModel};
use rstest::rstest;

use crate::helpers::model_helpers::child_tags;

#[derive(Clone, Copy, Debug)]
enum Add {
    Entry,
    Action,
    Transition,
    Exit,
    Attribute,
    Handler,
}

fn apply(model: &mut FlowModel, state: ElementId, step: Add) -> ElementId {
    match step {
        Add::Entry => model.ensure_entry_actions(state).unwrap(),
        Add::Action => model.add_action(state, ElementKind::Action).unwrap(),
        Add::Transition => model.add_transition(state, "next", "done").unwrap(),
        Add::Exit => model.ensure_exit_actions(state).unwrap(),
        Add::Attribute => model.add_attribute(state, "k", "v").unwrap(),
        Add::Handler => model.add_exception_handler(state, "handler").unwrap(),
    }
}

fn fresh_action_state() -> (FlowModel, ElementId) {
    let mut model = FlowModel::new();
    let root = model.root();
    let state = model.add_state(root, ElementKind::ActionState, "a").unwrap();
    (model, state)
}

#[rstest]
#[case(&[Add::Entry, Add::Action])]
#[case(&[Add::Action, Add::Entry])]
fn test_entry_actions_precede_actions(#[case] steps: &[Add]) {
    let (mut model, state) = fresh_action_state();
    for step in steps {
        apply(&mut model, state, *step);
    }
    assert_eq!(child_tags(&model, state), vec!["entry-actions", "action"]);
}

#[rstest]
#[case(&[Add::Handler, Add::Exit, Add::Transition, Add::Action, Add::Entry, Add::Attribute])]
#[case(&[Add::Transition, Add::Attribute, Add::Exit, Add::Entry, Add::Handler, Add::Action])]
#[case(&[Add::Attribute, Add::Entry, Add::Action, Add::Transition, Add::Exit, Add::Handler])]
fn test_action_state_children_follow_priority(#[case] steps: &[Add]) {
    let (mut model, state) = fresh_action_state();
    for step in steps {
        apply(&mut model, state, *step);
    }
    assert_eq!(
        child_tags(&model, state),
        vec![
            "attribute",
            "entry-actions",
            "action",
            "transition",
            "exit-actions",
            "exception-handler",
        ]
    );
    // Model children mirror the document order.
    let kinds: Vec<_> = model
        .children(state)
        .iter()
        .filter_map(|c| model.kind(*c))
        .map(|k| k.tag())
        .collect();
    assert_eq!(kinds, child_tags(&model, state));
}

#[test]
fn test_same_priority_keeps_insertion_order() {
    let (mut model, state) = fresh_action_state();
    let exit = model.ensure_exit_actions(state).unwrap();
    let first = model.add_transition(state, "one", "x").unwrap();
    let second = model.add_transition(state, "two", "y").unwrap();
    let action = model.add_action(state, ElementKind::Action).unwrap();

    assert_eq!(model.children(state), &[action, first, second, exit]);
    assert_eq!(
        child_tags(&model, state),
        vec!["action", "transition", "transition", "exit-actions"]
    );
}

#[test]
fn test_flow_children_follow_priority() {
    let mut model = FlowModel::new();
    let root = model.root();
    model.add_inline_flow(root, "nested").unwrap();
    model.add_state(root, ElementKind::EndState, "end").unwrap();
    model.add_import(root, "beans.xml").unwrap();
    model.add_global_transition(root, "cancel", "end").unwrap();
    model.add_state(root, ElementKind::ActionState, "first").unwrap();
    model.add_var(root, "cart", None).unwrap();
    model.add_attribute(root, "caption", "Demo").unwrap();
    model.add_state(root, ElementKind::ViewState, "form").unwrap();

    assert_eq!(
        child_tags(&model, root),
        vec![
            "attribute",
            "var",
            "action-state",
            "view-state",
            "end-state",
            "global-transitions",
            "import",
            "inline-flow",
        ]
    );
    let ids: Vec<_> = model
        .states(root)
        .into_iter()
        .filter_map(|s| model.id_of(s))
        .collect();
    assert_eq!(ids, vec!["first", "form", "end"]);
}

#[test]
fn test_added_children_respect_existing_unknown_content() {
    let mut model = FlowModel::parse(
        r#"<flow><custom-extension/><end-state id="end"/><!-- tail --></flow>"#,
    )
    .unwrap();
    let root = model.root();
    model.add_state(root, ElementKind::ViewState, "v").unwrap();
    let xml = model.to_xml(&Default::default()).unwrap();
    assert_eq!(
        xml,
        "<flow><custom-extension/><view-state id=\"v\"/><end-state id=\"end\"/><!-- tail --></flow>\n"
    );
}
