//! Round-trip tests: building a model and writing it back without edits.

use flowdef::document::XmlOptions;
use flowdef::model::FlowModel;
use rstest::rstest;

use crate::helpers::flow_fixtures::*;
use crate::helpers::model_helpers::shape;

#[rstest]
#[case::order(ORDER_FLOW)]
#[case::marker(MARKER_FLOW)]
#[case::rich(RICH_FLOW)]
fn test_unmodified_model_writes_input_back(#[case] source: &str) {
    let model = FlowModel::parse(source).unwrap();
    let written = model.to_xml(&XmlOptions::default()).unwrap();
    assert_eq!(written.trim_end(), source);
}

#[rstest]
#[case::order(ORDER_FLOW)]
#[case::rich(RICH_FLOW)]
fn test_pretty_output_rebuilds_same_graph(#[case] source: &str) {
    let model = FlowModel::parse(source).unwrap();
    let written = model.to_xml(&XmlOptions::pretty(4)).unwrap();
    let reread = FlowModel::parse(&written).unwrap();
    assert_eq!(shape(&reread), shape(&model));
}

#[test]
fn test_rich_flow_builds_every_declared_element() {
    let model = FlowModel::parse(RICH_FLOW).unwrap();
    let flow = model.flow_view();

    let ids: Vec<_> = flow.states().iter().filter_map(|s| s.id()).collect();
    assert_eq!(ids, vec!["enter", "check", "ship", "end"]);
    assert_eq!(flow.vars().len(), 1);
    assert_eq!(flow.imports().len(), 1);
    assert_eq!(flow.exception_handlers().len(), 1);
    assert_eq!(flow.start_actions().len(), 1);
    assert_eq!(flow.global_transitions().len(), 1);
    assert_eq!(flow.input_mapper().map(|m| m.mappings().len()), Some(2));

    let inline = flow.inline_flows();
    assert_eq!(inline.len(), 1);
    assert_eq!(inline[0].inline_id(), Some("shipping"));
    assert_eq!(inline[0].start_state_id(), Some("pick"));

    let check = flow.state("check").unwrap();
    let branches: Vec<_> = check.outbound().iter().filter_map(|t| t.to_state_id()).collect();
    assert_eq!(branches, vec!["enter", "ship"]);
}

#[test]
fn test_element_lines_come_from_source() {
    let model = FlowModel::parse(ORDER_FLOW).unwrap();
    let flow = model.flow_view();
    assert_eq!(flow.state("A").and_then(|s| s.inner.line()), Some(2));
    assert_eq!(flow.state("B").and_then(|s| s.inner.line()), Some(6));
}
