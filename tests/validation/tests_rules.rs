//! Rule tests: one offending element per case, checked by code and message.

use flowdef::model::FlowModel;
use flowdef::validation::{
    FlowValidator, Severity, StaticContext, TypeShape, ValidationOptions, ValidationReport, codes,
};
use rstest::rstest;
use tokio_util::sync::CancellationToken;

use crate::helpers::flow_fixtures::RICH_FLOW;

// =============================================================================
// HELPERS
// =============================================================================

fn context() -> StaticContext {
    StaticContext::new()
        .with_bean("svc", ["run"])
        .with_bean("cartService", ["load", "validate"])
        .with_bean("errors", Vec::<&str>::new())
        .with_factory_bean("factory")
        .with_type("com.acme.Cart", TypeShape::Concrete)
        .with_type("com.acme.Shape", TypeShape::Abstract)
        .with_type("com.acme.Api", TypeShape::Interface)
        .with_alias_types()
        .with_flow("known")
}

fn validate_with(source: &str, options: &ValidationOptions) -> ValidationReport {
    let model = FlowModel::parse(source).unwrap();
    FlowValidator::validate(&model, &context(), options, &CancellationToken::new())
}

/// A valid flow with `extra` appended to the flow's children.
fn flow_with(extra: &str) -> String {
    format!(r#"<flow start-state="s"><end-state id="s"/>{extra}</flow>"#)
}

fn problems_of(extra: &str) -> ValidationReport {
    validate_with(&flow_with(extra), &ValidationOptions::default())
}

// =============================================================================
// PER-KIND RULES
// =============================================================================

#[rstest]
#[case::action_state_without_actions(r#"<action-state id="x"/>"#, codes::MISSING_ACTIONS, "Element 'action-state' requires action sub elements")]
#[case::state_without_id(r#"<view-state/>"#, codes::MISSING_ATTRIBUTE, "Element 'view-state' requires unique 'id' attribute")]
#[case::unknown_bean(r#"<action-state id="x"><action bean="nope"/></action-state>"#, codes::UNKNOWN_BEAN, "Referenced bean \"nope\" cannot be found")]
#[case::unknown_method(r#"<action-state id="x"><action bean="svc" method="missing"/></action-state>"#, codes::UNKNOWN_METHOD, "Referenced action method \"missing\" cannot be found or is not a valid action method")]
#[case::bean_action_without_method(r#"<action-state id="x"><bean-action bean="svc"/></action-state>"#, codes::MISSING_ATTRIBUTE, "Element 'bean-action' requires 'method' attribute")]
#[case::action_without_bean(r#"<action-state id="x"><action method="run"/></action-state>"#, codes::MISSING_ATTRIBUTE, "Element 'action' requires 'bean' attribute")]
#[case::evaluate_without_expression(r#"<action-state id="x"><evaluate-action/></action-state>"#, codes::MISSING_ATTRIBUTE, "Element 'evaluate-action' requires 'expression' attribute")]
#[case::set_with_bad_scope(r#"<action-state id="x"><set attribute="a" value="v" scope="session"/></action-state>"#, codes::INVALID_SCOPE, "Invalid scope \"session\" specified")]
#[case::set_without_value(r#"<action-state id="x"><set attribute="a"/></action-state>"#, codes::MISSING_ATTRIBUTE, "Element 'set' requires 'value' attribute")]
#[case::result_without_name(r#"<action-state id="x"><evaluate-action expression="e"><evaluation-result/></evaluate-action></action-state>"#, codes::MISSING_ATTRIBUTE, "Element 'evaluation-result' requires 'name' attribute")]
#[case::abstract_var(r#"<var name="shape" class="com.acme.Shape"/>"#, codes::ABSTRACT_CLASS, "Class 'var' \"com.acme.Shape\" is either an interface or abstract")]
#[case::interface_var(r#"<var name="api" class="com.acme.Api"/>"#, codes::ABSTRACT_CLASS, "Class 'var' \"com.acme.Api\" is either an interface or abstract")]
#[case::unresolved_var(r#"<var name="cart" class="com.acme.Missing"/>"#, codes::UNRESOLVED_CLASS, "Class 'var' \"com.acme.Missing\" cannot be resolved")]
#[case::var_naming_unknown_bean(r#"<var name="ghost"/>"#, codes::UNKNOWN_BEAN, "Referenced bean \"ghost\" cannot be found")]
#[case::var_with_bad_scope(r#"<var name="cart" class="com.acme.Cart" scope="global"/>"#, codes::INVALID_SCOPE, "Invalid scope \"global\" specified")]
#[case::mapping_without_target(r#"<input-mapper><mapping source="a"/></input-mapper>"#, codes::MISSING_ATTRIBUTE, "Element 'mapping' requires 'target' or 'target-collection' attribute")]
#[case::mapping_with_bad_class(r#"<input-mapper><mapping source="a" target="b" from="not a class"/></input-mapper>"#, codes::UNRESOLVED_CLASS, "Class 'from' \"not a class\" cannot be resolved")]
#[case::input_attribute_without_name(r#"<input-mapper><input-attribute scope="flow"/></input-mapper>"#, codes::MISSING_ATTRIBUTE, "Element 'input-attribute' requires 'name' attribute")]
#[case::unknown_subflow(r#"<subflow-state id="x" flow="elsewhere"/>"#, codes::UNKNOWN_FLOW, "Referenced flow \"elsewhere\" cannot be found")]
#[case::subflow_without_flow(r#"<subflow-state id="x"/>"#, codes::MISSING_ATTRIBUTE, "Element 'subflow-state' requires 'flow' attribute")]
#[case::transition_without_to(r#"<view-state id="x"><transition on="go"/></view-state>"#, codes::MISSING_ATTRIBUTE, "Element 'transition' requires 'to' attribute")]
#[case::if_branch_to_nowhere(r#"<decision-state id="x"><if test="t" then="nowhere"/></decision-state>"#, codes::UNRESOLVED_TARGET, "Element 'if' references a non-existing state \"nowhere\" in 'then'")]
#[case::if_without_test(r#"<decision-state id="x"><if then="s"/></decision-state>"#, codes::MISSING_ATTRIBUTE, "Element 'if' requires 'test' attribute")]
#[case::import_without_resource(r#"<import/>"#, codes::MISSING_ATTRIBUTE, "Element 'import' requires 'resource' attribute")]
#[case::handler_with_unknown_bean(r#"<exception-handler bean="nope"/>"#, codes::UNKNOWN_BEAN, "Referenced bean \"nope\" cannot be found")]
#[case::attribute_with_bad_type(r#"<attribute name="n" type="com.acme.Nope" value="1"/>"#, codes::UNRESOLVED_CLASS, "Attribute 'type' \"com.acme.Nope\" cannot be resolved")]
#[case::attribute_without_value(r#"<attribute name="n"/>"#, codes::MISSING_ATTRIBUTE, "Element 'attribute' requires a 'value'")]
#[case::inline_flow_without_id(r#"<inline-flow><flow start-state="i"><end-state id="i"/></flow></inline-flow>"#, codes::MISSING_ATTRIBUTE, "Element 'inline-flow' requires 'id' attribute")]
fn test_rule_reports_single_problem(#[case] extra: &str, #[case] code: &str, #[case] message: &str) {
    let report = problems_of(extra);
    let found: Vec<_> = report.problems.iter().map(|p| (p.code, &*p.message)).collect();
    assert_eq!(found, vec![(code, message)]);
}

#[rstest]
#[case::factory_methods_unchecked(r#"<action-state id="x"><action bean="factory" method="anything"/></action-state>"#)]
#[case::var_naming_bean(r#"<var name="svc"/>"#)]
#[case::alias_class(r#"<input-mapper><mapping source="a" target="b" to="long"/></input-mapper>"#)]
#[case::target_collection(r#"<input-mapper><mapping source="a" target-collection="list"/></input-mapper>"#)]
#[case::known_subflow(r#"<subflow-state id="x" flow="known"/>"#)]
#[case::inline_subflow(r#"<subflow-state id="x" flow="inner"/><inline-flow id="inner"><flow start-state="i"><end-state id="i"/></flow></inline-flow>"#)]
#[case::expression_target(r#"<view-state id="x"><transition on="go" to="${flowScope.next}"/></view-state>"#)]
#[case::attribute_mapper_without_bean(r#"<subflow-state id="x" flow="known"><attribute-mapper/></subflow-state>"#)]
fn test_valid_elements_report_nothing(#[case] extra: &str) {
    let report = problems_of(extra);
    assert!(report.is_clean(), "{:?}", report.problems);
}

#[test]
fn test_unknown_bean_skips_method_check() {
    let report = problems_of(r#"<action-state id="x"><action bean="nope" method="m"/></action-state>"#);
    let found: Vec<_> = report.problems.iter().map(|p| p.code).collect();
    assert_eq!(found, vec![codes::UNKNOWN_BEAN]);
}

#[test]
fn test_duplicate_ids_reported_on_each_state() {
    let report = problems_of(r#"<view-state id="s"/>"#);
    assert_eq!(report.error_count(), 2);
    for problem in &report.problems {
        assert_eq!(problem.code, codes::DUPLICATE_STATE_ID);
        assert_eq!(&*problem.message, "Specified state id \"s\" is not unique");
    }
}

// =============================================================================
// START STATE
// =============================================================================

#[rstest]
#[case::missing(r#"<flow><end-state id="s"/></flow>"#, codes::MISSING_START_STATE)]
#[case::marker_without_idref(r#"<flow><start-state/><end-state id="s"/></flow>"#, codes::START_STATE_WITHOUT_IDREF)]
#[case::attribute_unresolved(r#"<flow start-state="zz"><end-state id="s"/></flow>"#, codes::UNRESOLVED_START_STATE)]
#[case::marker_unresolved(r#"<flow><start-state idref="zz"/><end-state id="s"/></flow>"#, codes::UNRESOLVED_START_STATE)]
fn test_start_state_rules(#[case] source: &str, #[case] code: &str) {
    let report = validate_with(source, &ValidationOptions::default());
    let found: Vec<_> = report.problems.iter().map(|p| p.code).collect();
    assert_eq!(found, vec![code]);
}

#[test]
fn test_duplicate_start_markers_warn_when_enabled() {
    let source = r#"<flow><start-state idref="s"/><start-state idref="s"/><end-state id="s"/></flow>"#;

    let report = validate_with(source, &ValidationOptions::default());
    assert_eq!(report.error_count(), 0);
    let warnings: Vec<_> = report.warnings().collect();
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].severity, Severity::Warning);
    assert_eq!(warnings[0].code, codes::DUPLICATE_START_STATE);

    let quiet = ValidationOptions {
        report_duplicate_start_state: false,
        ..ValidationOptions::default()
    };
    assert!(validate_with(source, &quiet).is_clean());
}

#[test]
fn test_custom_scopes() {
    let options = ValidationOptions {
        scope_types: vec!["session".into()],
        ..ValidationOptions::default()
    };
    let report = validate_with(
        &flow_with(r#"<action-state id="x"><set attribute="a" value="v" scope="session"/></action-state>"#),
        &options,
    );
    assert!(report.is_clean());
}

#[test]
fn test_rich_flow_is_clean() {
    let report = validate_with(RICH_FLOW, &ValidationOptions::default());
    assert!(report.is_clean(), "{:?}", report.problems);
}
