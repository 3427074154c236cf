//! The rule table.
//!
//! Each element kind maps to a fixed list of [`Check`]s, evaluated in
//! order. A check never stops the ones after it.

use super::codes;
use super::context::{ValidationContext, resolve_class};
use super::problem::ProblemReporter;
use super::ValidationOptions;
use crate::base::constants;
use crate::base::{Branch, ElementKind};
use crate::model::{ElementId, FlowModel};

/// One rule applied to an element.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Check {
    /// The attribute must be present and not blank.
    Required {
        attribute: &'static str,
        message: &'static str,
    },
    /// States need an id that is unique within their flow.
    StateId,
    /// Action states need at least one action.
    HasActions,
    /// A bean reference that must exist. `missing` reports an absent
    /// attribute; `None` makes the attribute optional.
    Bean {
        attribute: &'static str,
        missing: Option<&'static str>,
    },
    /// The `method` must be an action method of the referenced bean.
    Method { missing: Option<&'static str> },
    /// The transition target must resolve unless it is an expression.
    Target,
    /// The `scope` must be one of the permitted scopes.
    Scope,
    /// A class-valued attribute. `not_instantiable` also rejects
    /// interfaces and abstract classes.
    Class {
        attribute: &'static str,
        unresolved: &'static str,
        not_instantiable: Option<&'static str>,
    },
    /// A `var` without bean or class is looked up as a bean by name.
    VarBean,
    /// A `mapping` needs `target` or `target-collection`.
    MappingTarget,
    /// The referenced subflow must exist.
    Subflow,
    /// The flow's start state must be declared and resolve.
    StartState,
}

const fn required(attribute: &'static str, message: &'static str) -> Check {
    Check::Required { attribute, message }
}

const SCOPED_NAME: &[Check] = &[
    required(constants::NAME, "Element '{0}' requires 'name' attribute"),
    Check::Scope,
];

const IF_RULES: &[Check] = &[
    required(constants::TEST, "Element 'if' requires 'test' attribute"),
    required("then", "Element 'if' requires 'then' attribute"),
];

const ACTION_RULES: &[Check] = &[
    Check::Bean {
        attribute: constants::BEAN,
        missing: Some("Element 'action' requires 'bean' attribute"),
    },
    Check::Method { missing: None },
];

const BEAN_ACTION_RULES: &[Check] = &[
    Check::Bean {
        attribute: constants::BEAN,
        missing: Some("Element 'bean-action' requires 'bean' attribute"),
    },
    Check::Method {
        missing: Some("Element 'bean-action' requires 'method' attribute"),
    },
];

const EVALUATE_ACTION_RULES: &[Check] = &[required(
    constants::EXPRESSION,
    "Element 'evaluate-action' requires 'expression' attribute",
)];

const SET_RULES: &[Check] = &[
    required("attribute", "Element 'set' requires 'attribute' attribute"),
    required(constants::VALUE, "Element 'set' requires 'value' attribute"),
    Check::Scope,
];

const MAPPING_RULES: &[Check] = &[
    required("source", "Element 'mapping' requires 'source' attribute"),
    Check::MappingTarget,
    Check::Class {
        attribute: "to",
        unresolved: "Class 'to' \"{0}\" cannot be resolved",
        not_instantiable: None,
    },
    Check::Class {
        attribute: "from",
        unresolved: "Class 'from' \"{0}\" cannot be resolved",
        not_instantiable: None,
    },
];

const VAR_RULES: &[Check] = &[
    required(constants::NAME, "Element 'var' requires 'name' attribute"),
    Check::VarBean,
    Check::Scope,
    Check::Class {
        attribute: constants::CLASS,
        unresolved: "Class 'var' \"{0}\" cannot be resolved",
        not_instantiable: Some("Class 'var' \"{0}\" is either an interface or abstract"),
    },
    Check::Bean {
        attribute: constants::BEAN,
        missing: None,
    },
];

const ATTRIBUTE_RULES: &[Check] = &[
    required(constants::NAME, "Element 'attribute' requires 'name' attribute"),
    Check::Class {
        attribute: constants::TYPE,
        unresolved: "Attribute 'type' \"{0}\" cannot be resolved",
        not_instantiable: None,
    },
    required(constants::VALUE, "Element 'attribute' requires a 'value'"),
];

const INLINE_FLOW_RULES: &[Check] =
    &[required(constants::ID, "Element 'inline-flow' requires 'id' attribute")];

const IMPORT_RULES: &[Check] = &[required(
    constants::RESOURCE,
    "Element 'import' requires 'resource' attribute",
)];

const EXCEPTION_HANDLER_RULES: &[Check] = &[Check::Bean {
    attribute: constants::BEAN,
    missing: Some("Element 'exception-handler' requires 'bean' attribute"),
}];

const ATTRIBUTE_MAPPER_RULES: &[Check] = &[Check::Bean {
    attribute: constants::BEAN,
    missing: None,
}];

/// Checks for elements of `kind`, in evaluation order.
pub(crate) fn rules_for(kind: ElementKind) -> &'static [Check] {
    use ElementKind::*;
    match kind {
        Flow => &[Check::StartState],
        ActionState => &[Check::StateId, Check::HasActions],
        ViewState | DecisionState | EndState => &[Check::StateId],
        SubflowState => &[Check::StateId, Check::Subflow],
        Transition | IfTransition => &[Check::Target],
        If => IF_RULES,
        Action => ACTION_RULES,
        BeanAction => BEAN_ACTION_RULES,
        EvaluateAction => EVALUATE_ACTION_RULES,
        Set => SET_RULES,
        EvaluationResult | MethodResult | InputAttribute | OutputAttribute => SCOPED_NAME,
        Mapping => MAPPING_RULES,
        Var => VAR_RULES,
        Attribute => ATTRIBUTE_RULES,
        InlineFlow => INLINE_FLOW_RULES,
        Import => IMPORT_RULES,
        ExceptionHandler => EXCEPTION_HANDLER_RULES,
        AttributeMapper => ATTRIBUTE_MAPPER_RULES,
        _ => &[],
    }
}

/// Everything a check reads.
pub(crate) struct RuleScope<'a> {
    pub(crate) model: &'a FlowModel,
    pub(crate) context: &'a dyn ValidationContext,
    pub(crate) options: &'a ValidationOptions,
}

impl RuleScope<'_> {
    /// Attribute value with text in it.
    fn text(&self, element: ElementId, name: &str) -> Option<&str> {
        self.model
            .attribute(element, name)
            .filter(|v| !v.trim().is_empty())
    }

    fn is_expression(&self, value: &str) -> bool {
        value.starts_with(self.options.expression_prefix.as_str())
            && value.ends_with(self.options.expression_suffix.as_str())
    }

    /// Ids of every inline flow declared in the document.
    fn inline_flow_ids(&self) -> impl Iterator<Item = &str> {
        let model = self.model;
        model
            .flows_within(model.root())
            .into_iter()
            .flat_map(move |flow| model.children_of_kind(flow, ElementKind::InlineFlow).collect::<Vec<_>>())
            .filter_map(move |inline| model.id_of(inline))
    }

    pub(crate) fn apply(&self, check: Check, element: ElementId, kind: ElementKind, reporter: &mut ProblemReporter) {
        let model = self.model;
        match check {
            Check::Required { attribute, message } => {
                if self.text(element, attribute).is_none() {
                    reporter.error(model, element, codes::MISSING_ATTRIBUTE, fill(message, kind.tag()));
                }
            }

            Check::StateId => match self.text(element, constants::ID) {
                None => reporter.error(
                    model,
                    element,
                    codes::MISSING_ATTRIBUTE,
                    format!("Element '{}' requires unique 'id' attribute", kind.tag()),
                ),
                Some(id) => {
                    let duplicates = model
                        .flow_of(element)
                        .map(|flow| model.states_by_id(flow, id).len())
                        .unwrap_or(1);
                    if duplicates > 1 {
                        reporter.error(
                            model,
                            element,
                            codes::DUPLICATE_STATE_ID,
                            format!("Specified state id \"{id}\" is not unique"),
                        );
                    }
                }
            },

            Check::HasActions => {
                if model.actions(element).is_empty() {
                    reporter.error(
                        model,
                        element,
                        codes::MISSING_ACTIONS,
                        "Element 'action-state' requires action sub elements",
                    );
                }
            }

            Check::Bean { attribute, missing } => match self.text(element, attribute) {
                None => {
                    if let Some(message) = missing {
                        reporter.error(model, element, codes::MISSING_ATTRIBUTE, message);
                    }
                }
                Some(bean) => {
                    if !self.context.bean_exists(bean) {
                        reporter.error(
                            model,
                            element,
                            codes::UNKNOWN_BEAN,
                            format!("Referenced bean \"{bean}\" cannot be found"),
                        );
                    }
                }
            },

            Check::Method { missing } => match self.text(element, constants::METHOD) {
                None => {
                    if let Some(message) = missing {
                        reporter.error(model, element, codes::MISSING_ATTRIBUTE, message);
                    }
                }
                Some(method) => {
                    // Unknown beans are reported by the bean check.
                    let checked_bean = self
                        .text(element, constants::BEAN)
                        .filter(|bean| self.context.bean_exists(bean))
                        .filter(|bean| !self.context.is_factory_bean(bean));
                    if let Some(bean) = checked_bean {
                        if !self.context.bean_methods(bean).iter().any(|m| m == method) {
                            reporter.error(
                                model,
                                element,
                                codes::UNKNOWN_METHOD,
                                format!(
                                    "Referenced action method \"{method}\" cannot be found or is not a valid action method"
                                ),
                            );
                        }
                    }
                }
            },

            Check::Target => {
                let branch = model.branch(element);
                match (self.text(element, constants::TO), branch) {
                    (None, None) => reporter.error(
                        model,
                        element,
                        codes::MISSING_ATTRIBUTE,
                        "Element 'transition' requires 'to' attribute",
                    ),
                    // An empty branch is reported on the `if` itself.
                    (None, Some(_)) => {}
                    (Some(to), _) => {
                        if model.target(element).is_none() && !self.is_expression(to) {
                            let tag = if branch.is_some() { "if" } else { "transition" };
                            let via = match branch {
                                Some(Branch::Then) => " in 'then'",
                                Some(Branch::Else) => " in 'else'",
                                None => "",
                            };
                            reporter.error(
                                model,
                                element,
                                codes::UNRESOLVED_TARGET,
                                format!("Element '{tag}' references a non-existing state \"{to}\"{via}"),
                            );
                        }
                    }
                }
            }

            Check::Scope => {
                if let Some(scope) = self.text(element, constants::SCOPE) {
                    if !self.options.scope_types.iter().any(|s| s == scope) {
                        reporter.error(
                            model,
                            element,
                            codes::INVALID_SCOPE,
                            format!("Invalid scope \"{scope}\" specified"),
                        );
                    }
                }
            }

            Check::Class {
                attribute,
                unresolved,
                not_instantiable,
            } => {
                let Some(class_name) = self.text(element, attribute) else {
                    return;
                };
                match resolve_class(self.context, class_name) {
                    None => reporter.error(model, element, codes::UNRESOLVED_CLASS, fill(unresolved, class_name)),
                    Some(shape) => {
                        if let Some(message) = not_instantiable.filter(|_| !shape.is_instantiable()) {
                            reporter.error(model, element, codes::ABSTRACT_CLASS, fill(message, class_name));
                        }
                    }
                }
            }

            Check::VarBean => {
                let Some(name) = self.text(element, constants::NAME) else {
                    return;
                };
                let declared = self.text(element, constants::BEAN).is_some()
                    || self.text(element, constants::CLASS).is_some();
                if !declared && !self.context.bean_exists(name) {
                    reporter.error(
                        model,
                        element,
                        codes::UNKNOWN_BEAN,
                        format!("Referenced bean \"{name}\" cannot be found"),
                    );
                }
            }

            Check::MappingTarget => {
                if self.text(element, "target").is_none()
                    && self.text(element, "target-collection").is_none()
                {
                    reporter.error(
                        model,
                        element,
                        codes::MISSING_ATTRIBUTE,
                        "Element 'mapping' requires 'target' or 'target-collection' attribute",
                    );
                }
            }

            Check::Subflow => match self.text(element, constants::FLOW) {
                None => reporter.error(
                    model,
                    element,
                    codes::MISSING_ATTRIBUTE,
                    "Element 'subflow-state' requires 'flow' attribute",
                ),
                Some(flow) => {
                    let known = self.context.flow_exists(flow)
                        || self.inline_flow_ids().any(|id| id == flow);
                    if !known {
                        reporter.error(
                            model,
                            element,
                            codes::UNKNOWN_FLOW,
                            format!("Referenced flow \"{flow}\" cannot be found"),
                        );
                    }
                }
            },

            Check::StartState => {
                let markers = model.start_state_markers(element);
                if self.options.report_duplicate_start_state && markers.len() > 1 {
                    reporter.warning(
                        model,
                        element,
                        codes::DUPLICATE_START_STATE,
                        format!(
                            "Start state is defined {} times; only the first definition is used",
                            markers.len()
                        ),
                    );
                }
                if model.start_state(element).is_some() {
                    return;
                }
                match model.start_state_id(element) {
                    Some(id) => reporter.error(
                        model,
                        element,
                        codes::UNRESOLVED_START_STATE,
                        format!("Start state definition references non-existing state \"{id}\""),
                    ),
                    None if markers.is_empty() => reporter.error(
                        model,
                        element,
                        codes::MISSING_START_STATE,
                        "Start state definition is missing. Add a 'start-state' element",
                    ),
                    None => reporter.error(
                        model,
                        element,
                        codes::START_STATE_WITHOUT_IDREF,
                        "Start state definition misses 'idref' attribute",
                    ),
                }
            }
        }
    }
}

fn fill(template: &str, value: &str) -> String {
    template.replace("{0}", value)
}
