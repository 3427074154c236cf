//! The flow object model.
//!
//! A [`FlowModel`] is a typed graph of flow elements (states, transitions,
//! actions, mappers) projected over a [`Document`]. Every element owns
//! exactly one document node; attribute values are never cached and always
//! read through to the node.
//!
//! ## Structure
//!
//! Elements live in an arena and are addressed by [`ElementId`]. Parent
//! links and resolved transition targets are plain handles, so removing or
//! renaming an element cannot leave a dangling pointer behind: stale
//! handles are rejected with [`ModelError::UnknownElement`].
//!
//! ```
//! use flowdef::model::FlowModel;
//!
//! let model = FlowModel::parse(r#"
//!     <flow start-state="a">
//!       <view-state id="a"><transition on="next" to="b"/></view-state>
//!       <end-state id="b"/>
//!     </flow>"#).unwrap();
//! let flow = model.flow_view();
//! let b = flow.state("b").unwrap();
//! assert_eq!(b.inbound().len(), 1);
//! ```
//!
//! Mutations go through the editing API (`add_state`, `remove_state`,
//! `rename_state`, ...), which writes to the document at the position the
//! [ordering policy](crate::document::ordering) dictates, keeps the derived
//! transition links current and notifies listeners.

mod build;
mod clone;
mod editing;
mod error;
mod events;
mod links;
mod views;

pub use clone::ClonedElement;
pub use error::ModelError;
pub use events::{Change, Listener, ListenerId, ModelEvent, StructureTopic};
pub use views::{ActionView, ElementView, FlowView, MapperView, StateView, TransitionView};

use std::fmt;

use rustc_hash::FxHashMap;

use crate::base::constants;
use crate::base::{ActionType, Branch, ElementIdentity, ElementKind, TextRange};
use crate::document::{Document, NodeId, SchemaVersion, XmlOptions};
use links::LinkTable;

// ============================================================================
// ELEMENT
// ============================================================================

/// Handle of an element inside one model's arena.
///
/// Slots of dropped elements are reused; the generation tells a stale
/// handle apart from the element that took its slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId {
    index: u32,
    generation: u32,
}

impl ElementId {
    pub(crate) fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    pub fn index(self) -> usize {
        self.index as usize
    }

    pub fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.generation {
            0 => write!(f, "e{}", self.index),
            generation => write!(f, "e{}.{generation}", self.index),
        }
    }
}

/// Arena record of one element.
#[derive(Clone, Debug)]
pub(crate) struct Element {
    pub(crate) kind: ElementKind,
    pub(crate) node: NodeId,
    pub(crate) parent: Option<ElementId>,
    /// Recognized children in document order.
    pub(crate) children: Vec<ElementId>,
    pub(crate) action_type: Option<ActionType>,
    pub(crate) branch: Option<Branch>,
}

/// One arena slot. The generation is bumped each time the slot is freed.
#[derive(Clone, Debug, Default)]
pub(crate) struct ElementSlot {
    pub(crate) generation: u32,
    pub(crate) element: Option<Element>,
}

// ============================================================================
// MODEL
// ============================================================================

/// A flow definition: the document plus the typed element graph over it.
pub struct FlowModel {
    pub(crate) document: Document,
    pub(crate) elements: Vec<ElementSlot>,
    /// Freed slots, reused before the arena grows.
    pub(crate) free: Vec<ElementId>,
    pub(crate) root: ElementId,
    /// Derived transition links, one table per flow element.
    pub(crate) links: FxHashMap<ElementId, LinkTable>,
    pub(crate) listeners: Vec<(ListenerId, Listener)>,
    pub(crate) next_listener: u32,
    pub(crate) queued: Vec<ModelEvent>,
    pub(crate) batch_depth: usize,
}

impl fmt::Debug for FlowModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FlowModel")
            .field("root", &self.root)
            .field("elements", &self.element_count())
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl FlowModel {
    // ── Access ───────────────────────────────────────────────────────

    /// The root flow element.
    pub fn root(&self) -> ElementId {
        self.root
    }

    /// The underlying document (borrow).
    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Consume the model and return its document.
    pub fn into_document(self) -> Document {
        self.document
    }

    /// Serialize the underlying document.
    pub fn to_xml(&self, options: &XmlOptions) -> Result<String, ModelError> {
        Ok(self.document.to_xml(options)?)
    }

    pub fn schema_version(&self) -> SchemaVersion {
        self.document.schema_version()
    }

    pub(crate) fn element(&self, id: ElementId) -> Result<&Element, ModelError> {
        self.get(id).ok_or(ModelError::UnknownElement(id))
    }

    pub(crate) fn element_mut(&mut self, id: ElementId) -> Result<&mut Element, ModelError> {
        self.elements
            .get_mut(id.index())
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.element.as_mut())
            .ok_or(ModelError::UnknownElement(id))
    }

    fn get(&self, id: ElementId) -> Option<&Element> {
        self.elements
            .get(id.index())
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.element.as_ref())
    }

    /// True if `id` names a live element (attached or not).
    pub fn contains(&self, id: ElementId) -> bool {
        self.get(id).is_some()
    }

    /// Number of live elements.
    pub fn element_count(&self) -> usize {
        self.elements.iter().filter(|slot| slot.element.is_some()).count()
    }

    pub fn kind(&self, id: ElementId) -> Option<ElementKind> {
        self.get(id).map(|e| e.kind)
    }

    /// The document node an element projects.
    pub fn node(&self, id: ElementId) -> Option<NodeId> {
        self.get(id).map(|e| e.node)
    }

    pub fn parent(&self, id: ElementId) -> Option<ElementId> {
        self.get(id).and_then(|e| e.parent)
    }

    /// Recognized children in document order; empty for unknown handles.
    pub fn children(&self, id: ElementId) -> &[ElementId] {
        self.get(id).map(|e| e.children.as_slice()).unwrap_or(&[])
    }

    pub fn children_of_kind(
        &self,
        id: ElementId,
        kind: ElementKind,
    ) -> impl Iterator<Item = ElementId> + '_ {
        self.children(id)
            .iter()
            .copied()
            .filter(move |c| self.kind(*c) == Some(kind))
    }

    pub fn action_type(&self, id: ElementId) -> Option<ActionType> {
        self.get(id).and_then(|e| e.action_type)
    }

    pub fn branch(&self, id: ElementId) -> Option<Branch> {
        self.get(id).and_then(|e| e.branch)
    }

    /// Source range of the element's node.
    pub fn range(&self, id: ElementId) -> Option<TextRange> {
        self.node(id).and_then(|n| self.document.range(n))
    }

    /// Zero-based source line of the element's node.
    pub fn line(&self, id: ElementId) -> Option<u32> {
        self.node(id).and_then(|n| self.document.line_of(n))
    }

    /// True if the element is reachable from the root.
    pub fn is_attached(&self, id: ElementId) -> bool {
        let mut current = id;
        loop {
            if current == self.root {
                return self.contains(current);
            }
            let Some(parent) = self.parent(current) else {
                return false;
            };
            if !self.children(parent).contains(&current) {
                return false;
            }
            current = parent;
        }
    }

    pub(crate) fn require_attached(&self, id: ElementId) -> Result<&Element, ModelError> {
        let element = self.element(id)?;
        if !self.is_attached(id) {
            return Err(ModelError::Detached(id));
        }
        Ok(element)
    }

    // ── Attributes ───────────────────────────────────────────────────

    /// Read an attribute through to the node.
    ///
    /// An if-transition reads its `then`/`else` attribute from the `if`
    /// node under the name `to`.
    pub fn attribute(&self, id: ElementId, name: &str) -> Option<&str> {
        let element = self.get(id)?;
        let name = match element.branch {
            Some(branch) if name == constants::TO => branch.attribute(),
            _ => name,
        };
        self.document.attribute(element.node, name)
    }

    /// All attributes of the element's node, in document order.
    pub fn attributes(&self, id: ElementId) -> Vec<(&str, &str)> {
        match self.get(id) {
            Some(element) if element.branch.is_none() => {
                self.document.attributes(element.node).collect()
            }
            Some(_) => self
                .attribute(id, constants::TO)
                .map(|to| vec![(constants::TO, to)])
                .unwrap_or_default(),
            None => Vec::new(),
        }
    }

    /// The `id` attribute.
    pub fn id_of(&self, id: ElementId) -> Option<&str> {
        self.attribute(id, constants::ID)
    }

    /// The identity key of an element below its parent: its `id` when it
    /// has one, otherwise its kind and position among same-kind siblings.
    pub fn identity(&self, id: ElementId) -> Option<ElementIdentity> {
        let element = self.get(id)?;
        if let Some(key) = self.id_of(id) {
            return Some(ElementIdentity::opaque(key));
        }
        let ordinal = match element.parent {
            Some(parent) => self
                .children_of_kind(parent, element.kind)
                .position(|c| c == id)
                .unwrap_or(0),
            None => 0,
        };
        Some(ElementIdentity::typed(element.kind, ordinal))
    }

    /// Find a child of `parent` by identity key.
    pub fn lookup(&self, parent: ElementId, identity: &ElementIdentity) -> Option<ElementId> {
        match identity {
            ElementIdentity::Typed { kind, ordinal } => {
                self.children_of_kind(parent, *kind).nth(*ordinal)
            }
            ElementIdentity::Opaque(key) => self
                .children(parent)
                .iter()
                .copied()
                .find(|c| self.id_of(*c) == Some(key.as_str())),
        }
    }

    // ── Flow navigation ──────────────────────────────────────────────

    /// The nearest flow element at or above `id`.
    pub fn flow_of(&self, id: ElementId) -> Option<ElementId> {
        let mut current = Some(id);
        while let Some(c) = current {
            if self.kind(c)? == ElementKind::Flow {
                return Some(c);
            }
            current = self.parent(c);
        }
        None
    }

    /// States of a flow in document order.
    pub fn states(&self, flow: ElementId) -> Vec<ElementId> {
        self.children(flow)
            .iter()
            .copied()
            .filter(|c| self.kind(*c).is_some_and(|k| k.is_state()))
            .collect()
    }

    /// The first state of `flow` whose id is `state_id`.
    pub fn state_by_id(&self, flow: ElementId, state_id: &str) -> Option<ElementId> {
        self.states(flow)
            .into_iter()
            .find(|s| self.id_of(*s) == Some(state_id))
    }

    /// Every state of `flow` whose id is `state_id`.
    pub fn states_by_id(&self, flow: ElementId, state_id: &str) -> Vec<ElementId> {
        self.states(flow)
            .into_iter()
            .filter(|s| self.id_of(*s) == Some(state_id))
            .collect()
    }

    /// Nested flows declared through `inline-flow` children.
    pub fn inline_flows(&self, flow: ElementId) -> Vec<ElementId> {
        self.children_of_kind(flow, ElementKind::InlineFlow)
            .flat_map(|inline| self.children_of_kind(inline, ElementKind::Flow))
            .collect()
    }

    /// Every flow element in the subtree of `id`, outermost first.
    pub fn flows_within(&self, id: ElementId) -> Vec<ElementId> {
        let mut flows = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if self.kind(current) == Some(ElementKind::Flow) {
                flows.push(current);
            }
            stack.extend(self.children(current).iter().rev().copied());
        }
        flows
    }

    /// `start-state` marker nodes of a flow.
    pub fn start_state_markers(&self, flow: ElementId) -> Vec<NodeId> {
        match self.node(flow) {
            Some(node) => self
                .document
                .children_by_tag(node, constants::START_STATE_TAG)
                .collect(),
            None => Vec::new(),
        }
    }

    /// The id the flow names as its start state.
    ///
    /// Read from the `start-state` attribute when present, otherwise from
    /// the first marker's `idref`.
    pub fn start_state_id(&self, flow: ElementId) -> Option<&str> {
        let node = self.node(flow)?;
        if let Some(id) = self.document.attribute(node, constants::START_STATE_ATTRIBUTE) {
            return Some(id);
        }
        let marker = self.start_state_markers(flow).into_iter().next()?;
        self.document.attribute(marker, constants::START_STATE_IDREF)
    }

    /// The state the start-state reference resolves to.
    pub fn start_state(&self, flow: ElementId) -> Option<ElementId> {
        self.state_by_id(flow, self.start_state_id(flow)?)
    }

    /// The symbolic target of a transition.
    pub fn to_state_id(&self, transition: ElementId) -> Option<&str> {
        self.attribute(transition, constants::TO)
    }

    /// The element a transition leaves from: a state, or the flow for
    /// global transitions.
    pub fn transition_source(&self, transition: ElementId) -> Option<ElementId> {
        let parent = self.parent(transition)?;
        match self.kind(parent)? {
            ElementKind::If | ElementKind::GlobalTransitions => self.parent(parent),
            _ => Some(parent),
        }
    }

    /// The single child occupying `kind`'s slot, if any.
    pub fn slot_child(&self, parent: ElementId, kind: ElementKind) -> Option<ElementId> {
        let slot = kind.slot();
        self.children(parent)
            .iter()
            .copied()
            .find(|c| self.kind(*c).is_some_and(|k| k.slot() == slot))
    }

    /// The `secured` child of an element.
    pub fn secured(&self, id: ElementId) -> Option<ElementId> {
        self.slot_child(id, ElementKind::Secured)
    }

    /// Actions held by the entry-actions slot of `id`.
    pub fn entry_actions(&self, id: ElementId) -> Vec<ElementId> {
        self.slot_actions(id, ElementKind::EntryActions)
    }

    /// Actions held by the exit-actions slot of `id`.
    pub fn exit_actions(&self, id: ElementId) -> Vec<ElementId> {
        self.slot_actions(id, ElementKind::ExitActions)
    }

    /// Actions held by the render-actions slot of `id`.
    pub fn render_actions(&self, id: ElementId) -> Vec<ElementId> {
        self.slot_actions(id, ElementKind::RenderActions)
    }

    fn slot_actions(&self, id: ElementId, slot_kind: ElementKind) -> Vec<ElementId> {
        match self.slot_child(id, slot_kind) {
            Some(container) => self.actions(container),
            None => Vec::new(),
        }
    }

    /// Action children of an action-state, transition or action container.
    pub fn actions(&self, id: ElementId) -> Vec<ElementId> {
        self.children(id)
            .iter()
            .copied()
            .filter(|c| self.kind(*c).is_some_and(|k| k.is_action()))
            .collect()
    }
}
