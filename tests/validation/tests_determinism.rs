//! Determinism and cancellation of the validation pass.

use flowdef::model::{ElementId, FlowModel};
use flowdef::validation::{FlowValidator, StaticContext, ValidationOptions, codes};
use flowdef::visit::{FlowVisitor, Walk};
use tokio_util::sync::CancellationToken;

use crate::helpers::flow_fixtures::*;

const BROKEN: &str = r#"<flow>
  <action-state id="a">
    <transition on="x" to="nowhere"/>
  </action-state>
  <action-state id="a">
    <set attribute="k" scope="galaxy"/>
  </action-state>
  <subflow-state id="sub" flow="unknown"/>
  <var name="ghost"/>
</flow>"#;

#[test]
fn test_repeated_runs_produce_identical_reports() {
    let model = FlowModel::parse(BROKEN).unwrap();
    let ctx = StaticContext::new();
    let options = ValidationOptions::default();

    let first = FlowValidator::validate(&model, &ctx, &options, &CancellationToken::new());
    let second = FlowValidator::validate(&model, &ctx, &options, &CancellationToken::new());
    assert_eq!(first, second);
    assert!(first.error_count() > 5);
}

#[test]
fn test_problems_follow_visit_order() {
    let model = FlowModel::parse(BROKEN).unwrap();
    let report = FlowValidator::validate(
        &model,
        &StaticContext::new(),
        &ValidationOptions::default(),
        &CancellationToken::new(),
    );
    let found: Vec<_> = report.problems.iter().map(|p| p.code).collect();
    assert_eq!(
        found,
        vec![
            codes::MISSING_START_STATE,
            codes::UNKNOWN_BEAN,
            codes::DUPLICATE_STATE_ID,
            codes::MISSING_ACTIONS,
            codes::UNRESOLVED_TARGET,
            codes::DUPLICATE_STATE_ID,
            codes::MISSING_ATTRIBUTE,
            codes::INVALID_SCOPE,
            codes::UNKNOWN_FLOW,
        ]
    );
    let lines: Vec<_> = report.problems.iter().map(|p| p.line).collect();
    assert_eq!(lines[4], Some(2));
}

#[test]
fn test_validation_does_not_mutate_model() {
    let model = FlowModel::parse(RICH_FLOW).unwrap();
    let before = model.to_xml(&Default::default()).unwrap();
    FlowValidator::validate(
        &model,
        &StaticContext::new(),
        &ValidationOptions::default(),
        &CancellationToken::new(),
    );
    assert_eq!(model.to_xml(&Default::default()).unwrap(), before);
}

/// Cancels its token after a number of visits.
struct Canceller {
    remaining: usize,
    token: CancellationToken,
}

impl FlowVisitor for Canceller {
    fn visit(&mut self, _: &FlowModel, _: ElementId) -> bool {
        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining == 0 {
            self.token.cancel();
        }
        true
    }
}

#[test]
fn test_cancelled_validation_reports_no_partial_problems() {
    let model = FlowModel::parse(BROKEN).unwrap();
    let token = CancellationToken::new();
    let mut canceller = Canceller {
        remaining: 3,
        token: token.clone(),
    };
    assert_eq!(model.accept(model.root(), &mut canceller, &token), Walk::Cancelled);

    let report = FlowValidator::validate(
        &model,
        &StaticContext::new(),
        &ValidationOptions::default(),
        &token,
    );
    assert!(report.cancelled);
    assert!(report.problems.is_empty());
}

#[cfg(feature = "interchange")]
#[test]
fn test_report_exports_as_json() {
    let model = FlowModel::parse(DANGLING_FLOW).unwrap();
    let report = FlowValidator::validate(
        &model,
        &StaticContext::new().with_bean("orders", ["place"]),
        &ValidationOptions::default(),
        &CancellationToken::new(),
    );
    let json = report.to_json().unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["cancelled"], false);
    assert_eq!(value["problems"][0]["code"], codes::UNRESOLVED_TARGET);
    assert_eq!(value["problems"][0]["element"], "transition");
    assert_eq!(value["problems"][0]["severity"], "error");
}
