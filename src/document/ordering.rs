//! Child ordering under each element kind.
//!
//! The flow schema fixes the order in which child elements may appear. A
//! static table gives each legal `(parent, child)` pair a priority, and new
//! children are inserted so that sibling order always follows it:
//!
//! ```text
//! action-state:  attribute(1) secured(2) entry-actions(3) on-entry(4)
//!                action(5) bean-action(6) evaluate-action(7) ...
//!                transition(8) exit-actions(9) on-exit(10) exception-handler(11)
//! ```
//!
//! Children of equal priority form a group; a new member is appended after
//! the last member of its group. Children without a table entry (text,
//! comments, unknown elements) are ignored when looking for a position.

use tracing::trace;

use super::{Document, DocumentError, NodeId};

/// Where a new child goes under its parent.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InsertionPoint {
    /// Insert before this existing child.
    Before(NodeId),
    /// Append after all existing children.
    Append,
}

impl InsertionPoint {
    pub fn reference(&self) -> Option<NodeId> {
        match self {
            Self::Before(node) => Some(*node),
            Self::Append => None,
        }
    }
}

/// Priority of `child` under `parent`, or `None` for pairs the schema does
/// not order.
pub fn priority(parent: &str, child: &str) -> Option<u8> {
    let parent = local_name(parent);
    let child = local_name(child);
    let priority = match parent {
        "flow" => match child {
            "attribute" => 1,
            "secured" => 2,
            "persistence-context" => 3,
            "var" => 4,
            "input-mapper" => 5,
            "input" => 6,
            "start-actions" => 7,
            "on-start" => 8,
            "start-state" => 9,
            "set" => 10,
            "action-state" => 11,
            "view-state" | "decision-state" | "subflow-state" => 12,
            "end-state" => 13,
            "global-transitions" => 14,
            "end-actions" => 15,
            "on-end" => 16,
            "output-mapper" => 17,
            "output" => 18,
            "exception-handler" => 19,
            "import" => 20,
            "bean-import" => 21,
            "inline-flow" => 22,
            _ => return None,
        },
        "action-state" => match child {
            "attribute" => 1,
            "secured" => 2,
            "entry-actions" => 3,
            "on-entry" => 4,
            "action" => 5,
            "bean-action" => 6,
            "evaluate-action" | "evaluate" | "render" | "set" => 7,
            "transition" => 8,
            "exit-actions" => 9,
            "on-exit" => 10,
            "exception-handler" => 11,
            _ => return None,
        },
        "view-state" => match child {
            "attribute" => 1,
            "secured" => 2,
            "var" => 3,
            "entry-actions" => 4,
            "on-entry" => 5,
            "render-actions" => 6,
            "on-render" => 7,
            "transition" => 8,
            "exit-actions" => 9,
            "on-exit" => 10,
            "exception-handler" => 12,
            _ => return None,
        },
        "decision-state" => match child {
            "attribute" => 1,
            "secured" => 2,
            "entry-actions" => 3,
            "on-entry" => 4,
            "if" => 5,
            "exit-actions" => 6,
            "on-exit" => 7,
            "exception-handler" => 8,
            _ => return None,
        },
        "subflow-state" => match child {
            "attribute" => 1,
            "secured" => 2,
            "entry-actions" => 3,
            "on-entry" => 4,
            "attribute-mapper" => 5,
            "input" => 6,
            "output" => 7,
            "transition" => 8,
            "exit-actions" => 9,
            "on-exit" => 10,
            "exception-handler" => 11,
            _ => return None,
        },
        "end-state" => match child {
            "attribute" => 1,
            "secured" => 2,
            "entry-actions" => 3,
            "on-entry" => 4,
            "output-mapper" => 5,
            "output" => 6,
            "exception-handler" => 7,
            _ => return None,
        },
        "bean-action" => match child {
            "attribute" => 1,
            "method-arguments" => 2,
            "method-result" => 3,
            _ => return None,
        },
        "evaluate-action" => match child {
            "attribute" => 1,
            "evaluation-result" => 2,
            _ => return None,
        },
        "evaluate" | "action" => match child {
            "attribute" => 1,
            _ => return None,
        },
        "input-mapper" => match child {
            "input-attribute" => 1,
            "mapping" => 2,
            _ => return None,
        },
        "output-mapper" => match child {
            "output-attribute" => 1,
            "mapping" => 2,
            _ => return None,
        },
        "transition" => match child {
            "attribute" => 1,
            "secured" => 2,
            "action" => 3,
            "bean-action" => 4,
            "evaluate-action" => 5,
            "evaluate" => 6,
            "render" => 7,
            "set" => 8,
            _ => return None,
        },
        _ => return None,
    };
    Some(priority)
}

fn local_name(tag: &str) -> &str {
    tag.rsplit(':').next().unwrap_or(tag)
}

/// Compute where an element tagged `child` belongs under `parent`.
pub fn insertion_point_for(doc: &Document, child: &str, parent: NodeId) -> InsertionPoint {
    let Some(parent_tag) = doc.kind(parent) else {
        return InsertionPoint::Append;
    };
    let Some(wanted) = priority(parent_tag, child) else {
        return InsertionPoint::Append;
    };

    let mut last_ordered = None;
    for existing in doc.children(parent) {
        let Some(existing_priority) = doc.kind(*existing).and_then(|tag| priority(parent_tag, tag))
        else {
            continue;
        };
        if existing_priority > wanted {
            return InsertionPoint::Before(*existing);
        }
        last_ordered = Some(*existing);
    }

    match last_ordered.and_then(|last| doc.next_sibling(last)) {
        Some(next) => InsertionPoint::Before(next),
        None => InsertionPoint::Append,
    }
}

/// Insert the detached element `child` under `parent` at its ordered position.
///
/// Returns the child's index among all of the parent's children.
pub fn insert_node(doc: &mut Document, parent: NodeId, child: NodeId) -> Result<usize, DocumentError> {
    let tag = doc
        .kind(child)
        .ok_or(DocumentError::NotAnElement(child))?
        .to_string();
    let point = insertion_point_for(doc, &tag, parent);
    trace!(parent = %parent, child = %tag, ?point, "ordered insert");
    doc.insert_before(parent, child, point.reference())
}

/// Compute where an element tagged `child` goes to become the `index`-th
/// member of its priority group under `parent`.
///
/// The group is the run of element siblings sharing the child's priority
/// (or, under parents the table does not order, every element child). An
/// index past the end of the group falls back to
/// [`insertion_point_for`], which appends to the group.
pub fn insertion_point_at(doc: &Document, child: &str, parent: NodeId, index: usize) -> InsertionPoint {
    let Some(parent_tag) = doc.kind(parent) else {
        return InsertionPoint::Append;
    };
    let wanted = priority(parent_tag, child);
    let member = doc
        .element_children(parent)
        .filter(|c| doc.kind(*c).map(|tag| priority(parent_tag, tag)) == Some(wanted))
        .nth(index);
    match member {
        Some(member) => InsertionPoint::Before(member),
        None => insertion_point_for(doc, child, parent),
    }
}

/// Insert the detached element `child` as the `index`-th member of its
/// priority group under `parent`.
///
/// Returns the child's index among all of the parent's children.
pub fn insert_node_at(
    doc: &mut Document,
    parent: NodeId,
    child: NodeId,
    index: usize,
) -> Result<usize, DocumentError> {
    let tag = doc
        .kind(child)
        .ok_or(DocumentError::NotAnElement(child))?
        .to_string();
    let point = insertion_point_at(doc, &tag, parent, index);
    trace!(parent = %parent, child = %tag, index, ?point, "positional insert");
    doc.insert_before(parent, child, point.reference())
}
