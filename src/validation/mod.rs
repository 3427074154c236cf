//! Validation of a flow model.
//!
//! [`FlowValidator`] walks the model with [`FlowModel::accept`] and applies
//! a fixed set of rules per element kind: required attributes, unique state
//! ids, resolvable transition targets and start states, permitted scopes,
//! and references to beans, classes and flows that only the host
//! [`ValidationContext`] can answer.
//!
//! Rules only read the model. Running the same validation twice on an
//! unchanged model yields the same problems in the same order.
//!
//! ```
//! use flowdef::model::FlowModel;
//! use flowdef::validation::{FlowValidator, StaticContext, ValidationOptions};
//! use tokio_util::sync::CancellationToken;
//!
//! let model = FlowModel::parse(r#"
//!     <flow start-state="a">
//!       <view-state id="a"><transition on="go" to="missing"/></view-state>
//!     </flow>"#).unwrap();
//! let report = FlowValidator::validate(
//!     &model,
//!     &StaticContext::new(),
//!     &ValidationOptions::default(),
//!     &CancellationToken::new(),
//! );
//! assert_eq!(report.error_count(), 1);
//! ```

mod context;
mod problem;
mod rules;

pub use context::{StaticContext, TypeShape, ValidationContext, is_class_name, resolve_class};
pub use problem::{Problem, ProblemReporter, Severity, ValidationReport, codes};

use smol_str::SmolStr;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::base::constants;
use crate::model::{ElementId, FlowModel};
use crate::visit::FlowVisitor;
use rules::{RuleScope, rules_for};

/// Tunables for a validation run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidationOptions {
    /// Values accepted in `scope` attributes.
    pub scope_types: Vec<SmolStr>,
    /// Delimiters of a target expression; such targets are not resolved.
    pub expression_prefix: SmolStr,
    pub expression_suffix: SmolStr,
    /// Warn when a flow declares more than one start-state marker.
    pub report_duplicate_start_state: bool,
}

impl Default for ValidationOptions {
    fn default() -> Self {
        Self {
            scope_types: constants::SCOPE_TYPES.iter().map(|s| SmolStr::new(s)).collect(),
            expression_prefix: SmolStr::new(constants::EXPRESSION_PREFIX),
            expression_suffix: SmolStr::new(constants::EXPRESSION_SUFFIX),
            report_duplicate_start_state: true,
        }
    }
}

/// Visitor that applies the rules to every element it sees.
pub struct FlowValidator<'a> {
    context: &'a dyn ValidationContext,
    options: &'a ValidationOptions,
    reporter: ProblemReporter,
}

impl<'a> FlowValidator<'a> {
    pub fn new(context: &'a dyn ValidationContext, options: &'a ValidationOptions) -> Self {
        Self {
            context,
            options,
            reporter: ProblemReporter::new(),
        }
    }

    /// Validate the whole model.
    ///
    /// A cancelled run returns [`ValidationReport::cancelled`] with no
    /// problems, even if some were found before cancellation.
    pub fn validate(
        model: &FlowModel,
        context: &dyn ValidationContext,
        options: &ValidationOptions,
        cancel: &CancellationToken,
    ) -> ValidationReport {
        let mut validator = FlowValidator::new(context, options);
        if model.accept(model.root(), &mut validator, cancel).is_cancelled() {
            debug!("validation cancelled");
            return ValidationReport::cancelled();
        }
        let report = validator.into_report();
        debug!(
            problems = report.problems.len(),
            errors = report.error_count(),
            "validated flow"
        );
        report
    }

    pub fn into_report(self) -> ValidationReport {
        ValidationReport {
            problems: self.reporter.into_problems(),
            cancelled: false,
        }
    }
}

impl FlowVisitor for FlowValidator<'_> {
    fn visit(&mut self, model: &FlowModel, element: ElementId) -> bool {
        let Some(kind) = model.kind(element) else {
            return false;
        };
        let scope = RuleScope {
            model,
            context: self.context,
            options: self.options,
        };
        for check in rules_for(kind) {
            scope.apply(*check, element, kind, &mut self.reporter);
        }
        true
    }
}
