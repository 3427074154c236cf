//! Detached copies and in-place replacement.
//!
//! An editor that wants to stage changes clones an element, edits the copy
//! while it is detached, then swaps it back in with
//! [`FlowModel::apply_clone`]. The target keeps its handle, so transitions
//! and views pointing at it stay valid.

use tracing::debug;

use super::{ElementId, FlowModel, ModelError, ModelEvent, StructureTopic};

/// A detached deep copy produced by [`FlowModel::clone_detached`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClonedElement {
    /// Root of the copy. Detached; its parent link names the source's parent.
    pub root: ElementId,
    /// `(source, copy)` pairs in visit order, starting with the roots.
    pub mapping: Vec<(ElementId, ElementId)>,
}

impl ClonedElement {
    /// The copy of `source`, if it was part of the cloned subtree.
    pub fn clone_of(&self, source: ElementId) -> Option<ElementId> {
        self.mapping
            .iter()
            .find(|(s, _)| *s == source)
            .map(|(_, c)| *c)
    }
}

impl FlowModel {
    /// Deep-copy `source` into a detached subtree.
    pub fn clone_detached(&mut self, source: ElementId) -> Result<ClonedElement, ModelError> {
        let element = self.element(source)?;
        if element.kind.is_virtual() {
            return Err(ModelError::wrong_kind("element with its own node", element.kind));
        }
        let (kind, node, parent, action_type) =
            (element.kind, element.node, element.parent, element.action_type);

        let copy_node = self.document.clone_deep(node)?;
        let root = self.construct(kind, copy_node, parent, action_type)?;
        for flow in self.flows_within(root) {
            self.relink(flow);
        }

        let mapping: Vec<_> = self
            .descendants(source)
            .into_iter()
            .zip(self.descendants(root))
            .collect();
        debug!(source = %source, copy = %root, elements = mapping.len(), "cloned element");
        Ok(ClonedElement { root, mapping })
    }

    /// Replace `target`'s node with the clone's and rebuild `target`'s
    /// children from it.
    ///
    /// `target` keeps its handle; the clone's root handle is consumed and
    /// the clone's descendants become `target`'s. Fires one `MoveChildren`
    /// event on the parent (on `target` itself for the root) and reconnects
    /// the affected flows.
    pub fn apply_clone(&mut self, target: ElementId, clone: ClonedElement) -> Result<(), ModelError> {
        let target_element = self.require_attached(target)?;
        let (target_kind, target_node, parent) =
            (target_element.kind, target_element.node, target_element.parent);
        let clone_element = self.element(clone.root)?;
        if clone_element.kind != target_kind {
            return Err(ModelError::wrong_kind(target_kind.tag(), clone_element.kind));
        }
        if self.is_attached(clone.root) {
            return Err(ModelError::NotOwned {
                parent: target,
                child: clone.root,
            });
        }
        let clone_node = clone_element.node;

        self.transaction(|model| {
            match parent {
                Some(parent) => {
                    let parent_node = model.element(parent)?.node;
                    model.document.replace_child(parent_node, clone_node, target_node)?;
                }
                None => model.document.replace_root(clone_node)?,
            }

            let old_children = std::mem::take(&mut model.element_mut(target)?.children);
            for child in old_children {
                model.drop_subtree(child);
            }
            let new_children = std::mem::take(&mut model.element_mut(clone.root)?.children);
            for child in &new_children {
                model.element_mut(*child)?.parent = Some(target);
            }
            let element = model.element_mut(target)?;
            element.children = new_children;
            element.node = clone_node;

            model.element_mut(clone.root)?.children.clear();
            model.drop_subtree(clone.root);
            model.document.discard(target_node)?;

            let event = match parent {
                Some(parent) => {
                    let index = model.children(parent).iter().position(|c| *c == target);
                    ModelEvent::structure(parent, StructureTopic::MoveChildren, target, index)
                }
                None => ModelEvent::structure(target, StructureTopic::MoveChildren, target, None),
            };
            model.emit(event);
            debug!(target = %target, "applied clone");

            model.relink_around(target);
            Ok(())
        })
    }
}
