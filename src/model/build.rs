//! Construction of the element graph from a document.
//!
//! Construction walks the node tree top-down. For each element it scans the
//! direct child nodes by tag and builds the kinds its registration table
//! lists ([`ElementKind::child_kinds`]); anything else is skipped so that
//! unknown or future elements never break loading. Once the whole tree is
//! built, transition links are reconciled once per flow.

use std::path::Path;

use rustc_hash::FxHashMap;
use tracing::{debug, trace};

use super::{Element, ElementId, ElementSlot, FlowModel, ModelError};
use crate::base::{ActionType, Branch, ElementKind};
use crate::document::{Document, DocumentError, NodeId, XmlOptions};

impl FlowModel {
    // ── Construction ─────────────────────────────────────────────────

    /// An empty flow.
    pub fn new() -> Self {
        let document = Document::with_root(ElementKind::Flow.tag());
        let root_node = document.root().unwrap_or(NodeId::new(0));
        let mut model = Self::empty(document);
        model.elements.push(ElementSlot {
            generation: 0,
            element: Some(Element {
                kind: ElementKind::Flow,
                node: root_node,
                parent: None,
                children: Vec::new(),
                action_type: None,
                branch: None,
            }),
        });
        model.relink(model.root);
        model
    }

    /// Build the model over an existing document. The root must be `flow`.
    pub fn from_document(document: Document) -> Result<Self, ModelError> {
        let root_node = document.root().ok_or(DocumentError::MissingRoot)?;
        let found = document.kind(root_node).unwrap_or_default();
        if ElementKind::from_tag(found) != Some(ElementKind::Flow) {
            return Err(DocumentError::UnexpectedRoot {
                expected: "flow",
                found: found.to_string(),
            }
            .into());
        }
        Self::assemble(document, root_node)
    }

    fn empty(document: Document) -> Self {
        FlowModel {
            document,
            elements: Vec::new(),
            free: Vec::new(),
            root: ElementId::new(0, 0),
            links: FxHashMap::default(),
            listeners: Vec::new(),
            next_listener: 0,
            queued: Vec::new(),
            batch_depth: 0,
        }
    }

    fn assemble(document: Document, root_node: NodeId) -> Result<Self, ModelError> {
        let mut model = Self::empty(document);
        model.root = model.construct(ElementKind::Flow, root_node, None, None)?;
        for flow in model.flows_within(model.root) {
            model.relink(flow);
        }
        debug!(elements = model.element_count(), "flow model built");
        Ok(model)
    }

    /// Parse XML text with default (lossless) options.
    pub fn parse(text: &str) -> Result<Self, ModelError> {
        Self::parse_with(text, &XmlOptions::default())
    }

    pub fn parse_with(text: &str, options: &XmlOptions) -> Result<Self, ModelError> {
        Self::from_document(Document::parse(text, options)?)
    }

    /// Read and build from a file.
    pub fn from_file(path: &Path) -> Result<Self, ModelError> {
        Self::from_document(Document::from_file(path, &XmlOptions::default())?)
    }

    // ── Recursive build ──────────────────────────────────────────────

    /// Place `element` in a free slot, growing the arena only when none is
    /// left.
    pub(crate) fn alloc(&mut self, element: Element) -> Result<ElementId, ModelError> {
        if let Some(id) = self.free.pop() {
            if let Some(slot) = self.elements.get_mut(id.index()) {
                slot.element = Some(element);
                return Ok(ElementId::new(id.index, slot.generation));
            }
        }
        let index = u32::try_from(self.elements.len()).map_err(|_| ModelError::ArenaFull)?;
        self.elements.push(ElementSlot {
            generation: 0,
            element: Some(element),
        });
        Ok(ElementId::new(index, 0))
    }

    /// Empty `id`'s slot and queue it for reuse. Handles to it go stale.
    fn release(&mut self, id: ElementId) -> Option<Element> {
        let slot = self
            .elements
            .get_mut(id.index())
            .filter(|slot| slot.generation == id.generation)?;
        let element = slot.element.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id);
        Some(element)
    }

    /// Build the element for `node` and, recursively, its recognized children.
    pub(crate) fn construct(
        &mut self,
        kind: ElementKind,
        node: NodeId,
        parent: Option<ElementId>,
        action_type: Option<ActionType>,
    ) -> Result<ElementId, ModelError> {
        let id = self.alloc(Element {
            kind,
            node,
            parent,
            children: Vec::new(),
            action_type,
            branch: None,
        })?;

        let children = if kind == ElementKind::If {
            self.construct_branches(id, node)?
        } else {
            self.construct_children(id, kind, node)?
        };
        self.element_mut(id)?.children = children;
        Ok(id)
    }

    fn construct_children(
        &mut self,
        id: ElementId,
        kind: ElementKind,
        node: NodeId,
    ) -> Result<Vec<ElementId>, ModelError> {
        let child_nodes: Vec<NodeId> = self.document.element_children(node).collect();
        let mut children = Vec::new();
        for child_node in child_nodes {
            let tag = self.document.kind(child_node).unwrap_or_default();
            let Some(child_kind) = ElementKind::from_tag(tag).filter(|k| kind.accepts(*k)) else {
                trace!(parent = %kind, child = tag, "skipping unrecognized child");
                continue;
            };
            let action_type = if child_kind.is_action() {
                ActionType::for_container(kind)
            } else {
                None
            };
            children.push(self.construct(child_kind, child_node, Some(id), action_type)?);
        }
        Ok(children)
    }

    /// One virtual transition per branch attribute present on the `if` node.
    pub(crate) fn construct_branches(
        &mut self,
        id: ElementId,
        node: NodeId,
    ) -> Result<Vec<ElementId>, ModelError> {
        let mut children = Vec::new();
        for branch in [Branch::Then, Branch::Else] {
            if self.document.attribute(node, branch.attribute()).is_some() {
                children.push(self.alloc_branch(id, node, branch)?);
            }
        }
        Ok(children)
    }

    pub(crate) fn alloc_branch(
        &mut self,
        parent: ElementId,
        node: NodeId,
        branch: Branch,
    ) -> Result<ElementId, ModelError> {
        self.alloc(Element {
            kind: ElementKind::IfTransition,
            node,
            parent: Some(parent),
            children: Vec::new(),
            action_type: None,
            branch: Some(branch),
        })
    }

    /// Drop `id` and its subtree from the arena. Their nodes are left to
    /// the caller.
    pub(crate) fn drop_subtree(&mut self, id: ElementId) {
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if let Some(element) = self.release(current) {
                if element.kind == ElementKind::Flow {
                    self.links.remove(&current);
                }
                stack.extend(element.children);
            }
        }
    }

    /// Drop a detached subtree together with its document nodes.
    pub(crate) fn discard_subtree(&mut self, id: ElementId) -> Result<(), ModelError> {
        let element = self.element(id)?;
        let node = (!element.kind.is_virtual()).then_some(element.node);
        self.drop_subtree(id);
        if let Some(node) = node {
            if self.document.parent(node).is_none() {
                let freed = self.document.discard(node)?;
                trace!(element = %id, nodes = freed, "freed nodes");
            }
        }
        Ok(())
    }
}

impl Default for FlowModel {
    fn default() -> Self {
        Self::new()
    }
}
