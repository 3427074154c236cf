//! Whole-graph traversal with pruning and cancellation.
//!
//! [`FlowModel::accept`] walks an element subtree depth-first, pre-order.
//! Children are visited in a fixed order per kind, derived from their
//! [`Slot`]: attributes, security, variables and input mapping first, then
//! entry actions, the kind-specific content (actions, render actions, `if`
//! branches, mappers, states), exit actions, exception handlers and
//! outbound transitions; a flow finishes with its global transitions,
//! imports and inline flows.
//!
//! A visitor returning `false` prunes that element's subtree only. The
//! cancellation token is checked before each element is visited; once it
//! fires the walk unwinds and reports [`Walk::Cancelled`].
//!
//! ```
//! use flowdef::model::{ElementId, FlowModel};
//! use flowdef::visit::Walk;
//! use tokio_util::sync::CancellationToken;
//!
//! let model = FlowModel::parse(r#"<flow><end-state id="done"/></flow>"#).unwrap();
//! let mut count = 0;
//! let walk = model.accept(model.root(), &mut |_: &FlowModel, _: ElementId| { count += 1; true }, &CancellationToken::new());
//! assert_eq!(walk, Walk::Completed);
//! assert_eq!(count, 2);
//! ```

use tokio_util::sync::CancellationToken;

use crate::base::Slot;
use crate::model::{ElementId, FlowModel};

/// Callback for [`FlowModel::accept`].
pub trait FlowVisitor {
    /// Visit one element. Return `false` to skip its children.
    fn visit(&mut self, model: &FlowModel, element: ElementId) -> bool;
}

impl<F> FlowVisitor for F
where
    F: FnMut(&FlowModel, ElementId) -> bool,
{
    fn visit(&mut self, model: &FlowModel, element: ElementId) -> bool {
        self(model, element)
    }
}

/// Outcome of a walk.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Walk {
    Completed,
    Cancelled,
}

impl Walk {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Walk::Cancelled)
    }
}

impl FlowModel {
    /// Walk the subtree of `root`, calling `visitor` on each element.
    pub fn accept<V>(&self, root: ElementId, visitor: &mut V, cancel: &CancellationToken) -> Walk
    where
        V: FlowVisitor + ?Sized,
    {
        if cancel.is_cancelled() {
            return Walk::Cancelled;
        }
        if !visitor.visit(self, root) {
            return Walk::Completed;
        }
        for child in self.visit_order(root) {
            if self.accept(child, visitor, cancel).is_cancelled() {
                return Walk::Cancelled;
            }
        }
        Walk::Completed
    }

    /// Children of `element` in visit order.
    pub fn visit_order(&self, element: ElementId) -> Vec<ElementId> {
        let mut children = self.children(element).to_vec();
        children.sort_by_key(|c| self.kind(*c).map(|k| k.slot()).unwrap_or(Slot::Body));
        children
    }

    /// Every element of the subtree of `root` in visit order, `root` first.
    pub fn descendants(&self, root: ElementId) -> Vec<ElementId> {
        let mut collected = Vec::new();
        self.accept(
            root,
            &mut |_: &FlowModel, element: ElementId| {
                collected.push(element);
                true
            },
            &CancellationToken::new(),
        );
        collected
    }
}
