//! Problems reported by the validation pass.

use std::fmt;
use std::sync::Arc;

use crate::base::{ElementKind, TextRange};
use crate::model::{ElementId, FlowModel};

// ============================================================================
// PROBLEM TYPES
// ============================================================================

/// Severity level of a problem.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Severity {
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => f.write_str("error"),
            Severity::Warning => f.write_str("warning"),
        }
    }
}

/// One validation finding, tagged on the element that caused it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Problem {
    pub severity: Severity,
    /// Problem code (e.g., "E0107").
    pub code: &'static str,
    pub message: Arc<str>,
    pub element: ElementId,
    pub kind: ElementKind,
    /// Source range of the element's node, if it came from parsed text.
    pub range: Option<TextRange>,
    /// Zero-based source line.
    pub line: Option<u32>,
}

impl Problem {
    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Problem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line {
            Some(line) => write!(f, "{}:{} [{}] {}", line + 1, self.severity, self.code, self.message),
            None => write!(f, "{} [{}] {}", self.severity, self.code, self.message),
        }
    }
}

// ============================================================================
// PROBLEM CODES
// ============================================================================

/// Problem codes.
///
/// ## Ranges
///
/// - **E0101-E0199**: Flow definition errors
/// - **W0101-W0199**: Flow definition warnings
pub mod codes {
    /// A required attribute is missing or empty.
    pub const MISSING_ATTRIBUTE: &str = "E0101";
    /// Two states of one flow share an id.
    pub const DUPLICATE_STATE_ID: &str = "E0102";
    /// An action state without actions.
    pub const MISSING_ACTIONS: &str = "E0103";
    /// A bean reference that the context cannot find.
    pub const UNKNOWN_BEAN: &str = "E0104";
    /// An action method the bean does not provide.
    pub const UNKNOWN_METHOD: &str = "E0105";
    /// A transition whose target id names no state of its flow.
    pub const UNRESOLVED_TARGET: &str = "E0106";
    /// A scope outside the permitted set.
    pub const INVALID_SCOPE: &str = "E0107";
    /// A class-valued attribute that does not resolve.
    pub const UNRESOLVED_CLASS: &str = "E0108";
    /// A variable class that cannot be instantiated.
    pub const ABSTRACT_CLASS: &str = "E0109";
    /// A subflow reference to an unknown flow.
    pub const UNKNOWN_FLOW: &str = "E0110";
    /// No start state declared.
    pub const MISSING_START_STATE: &str = "E0111";
    /// A start-state marker without `idref`.
    pub const START_STATE_WITHOUT_IDREF: &str = "E0112";
    /// A start state naming no state.
    pub const UNRESOLVED_START_STATE: &str = "E0113";

    /// More than one start-state marker.
    pub const DUPLICATE_START_STATE: &str = "W0101";
}

// ============================================================================
// REPORTER
// ============================================================================

/// Collects problems in the order they are found.
#[derive(Clone, Debug, Default)]
pub struct ProblemReporter {
    problems: Vec<Problem>,
}

impl ProblemReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn report(
        &mut self,
        model: &FlowModel,
        element: ElementId,
        severity: Severity,
        code: &'static str,
        message: impl Into<Arc<str>>,
    ) {
        self.problems.push(Problem {
            severity,
            code,
            message: message.into(),
            element,
            kind: model.kind(element).unwrap_or(ElementKind::Flow),
            range: model.range(element),
            line: model.line(element),
        });
    }

    pub fn error(&mut self, model: &FlowModel, element: ElementId, code: &'static str, message: impl Into<Arc<str>>) {
        self.report(model, element, Severity::Error, code, message);
    }

    pub fn warning(&mut self, model: &FlowModel, element: ElementId, code: &'static str, message: impl Into<Arc<str>>) {
        self.report(model, element, Severity::Warning, code, message);
    }

    pub fn problems(&self) -> &[Problem] {
        &self.problems
    }

    pub fn into_problems(self) -> Vec<Problem> {
        self.problems
    }
}

// ============================================================================
// REPORT
// ============================================================================

/// Result of one validation run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ValidationReport {
    /// Problems in traversal order. Empty when the run was cancelled.
    pub problems: Vec<Problem>,
    pub cancelled: bool,
}

impl ValidationReport {
    pub fn cancelled() -> Self {
        Self {
            problems: Vec::new(),
            cancelled: true,
        }
    }

    pub fn errors(&self) -> impl Iterator<Item = &Problem> {
        self.problems.iter().filter(|p| p.is_error())
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Problem> {
        self.problems.iter().filter(|p| !p.is_error())
    }

    pub fn error_count(&self) -> usize {
        self.errors().count()
    }

    pub fn is_clean(&self) -> bool {
        !self.cancelled && self.problems.is_empty()
    }

    /// Problems tagged on `element`.
    pub fn for_element(&self, element: ElementId) -> Vec<&Problem> {
        self.problems.iter().filter(|p| p.element == element).collect()
    }
}

// ============================================================================
// JSON EXPORT
// ============================================================================

#[cfg(feature = "interchange")]
mod export {
    use serde::Serialize;

    use super::{Problem, ValidationReport};

    #[derive(Serialize)]
    struct ProblemRecord<'a> {
        severity: String,
        code: &'a str,
        message: &'a str,
        element: &'a str,
        #[serde(skip_serializing_if = "Option::is_none")]
        line: Option<u32>,
        #[serde(skip_serializing_if = "Option::is_none")]
        start: Option<u32>,
        #[serde(skip_serializing_if = "Option::is_none")]
        end: Option<u32>,
    }

    #[derive(Serialize)]
    struct ReportRecord<'a> {
        cancelled: bool,
        problems: Vec<ProblemRecord<'a>>,
    }

    impl<'a> From<&'a Problem> for ProblemRecord<'a> {
        fn from(problem: &'a Problem) -> Self {
            Self {
                severity: problem.severity.to_string(),
                code: problem.code,
                message: &problem.message,
                element: problem.kind.tag(),
                line: problem.line,
                start: problem.range.map(|r| r.start().into()),
                end: problem.range.map(|r| r.end().into()),
            }
        }
    }

    impl ValidationReport {
        /// Serialize the report as JSON.
        pub fn to_json(&self) -> Result<String, serde_json::Error> {
            let record = ReportRecord {
                cancelled: self.cancelled,
                problems: self.problems.iter().map(ProblemRecord::from).collect(),
            };
            serde_json::to_string_pretty(&record)
        }
    }
}
