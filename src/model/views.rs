//! Typed borrowed views over [`FlowModel`].
//!
//! Zero-copy views that pair an [`ElementId`] with the model it lives in.
//! Every navigation method returns further views, so callers rarely need
//! raw handles.
//!
//! ## Usage
//!
//! ```
//! use flowdef::model::FlowModel;
//!
//! let model = FlowModel::parse(r#"<flow start-state="a">
//!   <view-state id="a"><transition on="next" to="b"/></view-state>
//!   <end-state id="b"/>
//! </flow>"#).unwrap();
//!
//! let flow = model.flow_view();
//! let a = flow.start_state().unwrap();
//! for transition in a.transitions() {
//!     println!("{:?} -> {:?}", transition.on(), transition.target().and_then(|s| s.id()));
//! }
//! ```

use std::fmt;

use super::{ElementId, FlowModel};
use crate::base::constants;
use crate::base::{ActionType, Branch, ElementKind, Slot, TextRange};

impl FlowModel {
    /// View over any element.
    pub fn view(&self, id: ElementId) -> Option<ElementView<'_>> {
        ElementView::from_id(id, self)
    }

    /// View over the root flow.
    pub fn flow_view(&self) -> FlowView<'_> {
        FlowView {
            inner: ElementView {
                id: self.root,
                model: self,
            },
        }
    }
}

// ============================================================================
// CORE VIEW
// ============================================================================

/// A borrowed view over any element.
#[derive(Clone, Copy)]
pub struct ElementView<'m> {
    pub id: ElementId,
    pub model: &'m FlowModel,
}

impl<'m> ElementView<'m> {
    /// Create a view from an element handle. Returns None for stale handles.
    pub fn from_id(id: ElementId, model: &'m FlowModel) -> Option<Self> {
        model.contains(id).then_some(Self { id, model })
    }

    fn wrap(&self, id: ElementId) -> ElementView<'m> {
        ElementView {
            id,
            model: self.model,
        }
    }

    // ── Identity ────────────────────────────────────────────────────

    pub fn kind(&self) -> ElementKind {
        self.model.kind(self.id).unwrap_or(ElementKind::Flow)
    }

    pub fn id(&self) -> Option<&'m str> {
        self.model.id_of(self.id)
    }

    pub fn attribute(&self, name: &str) -> Option<&'m str> {
        self.model.attribute(self.id, name)
    }

    pub fn range(&self) -> Option<TextRange> {
        self.model.range(self.id)
    }

    pub fn line(&self) -> Option<u32> {
        self.model.line(self.id)
    }

    // ── Ownership ───────────────────────────────────────────────────

    pub fn parent(&self) -> Option<ElementView<'m>> {
        self.model.parent(self.id).map(|p| self.wrap(p))
    }

    pub fn children(&self) -> Vec<ElementView<'m>> {
        self.model
            .children(self.id)
            .iter()
            .map(|c| self.wrap(*c))
            .collect()
    }

    pub fn children_of_kind(&self, kind: ElementKind) -> Vec<ElementView<'m>> {
        self.model
            .children_of_kind(self.id, kind)
            .map(|c| self.wrap(c))
            .collect()
    }

    /// The flow this element belongs to.
    pub fn flow(&self) -> Option<FlowView<'m>> {
        self.model
            .flow_of(self.id)
            .map(|f| FlowView { inner: self.wrap(f) })
    }

    // ── Downcast to typed views ─────────────────────────────────────

    pub fn as_flow(&self) -> Option<FlowView<'m>> {
        (self.kind() == ElementKind::Flow).then_some(FlowView { inner: *self })
    }

    pub fn as_state(&self) -> Option<StateView<'m>> {
        self.kind().is_state().then_some(StateView { inner: *self })
    }

    pub fn as_transition(&self) -> Option<TransitionView<'m>> {
        self.kind()
            .is_transition()
            .then_some(TransitionView { inner: *self })
    }

    pub fn as_action(&self) -> Option<ActionView<'m>> {
        self.kind().is_action().then_some(ActionView { inner: *self })
    }

    pub fn as_mapper(&self) -> Option<MapperView<'m>> {
        self.kind().is_mapper().then_some(MapperView { inner: *self })
    }
}

impl fmt::Debug for ElementView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ElementView")
            .field("id", &self.id)
            .field("kind", &self.kind())
            .field("state_id", &self.id())
            .finish()
    }
}

// ============================================================================
// FLOW VIEW
// ============================================================================

/// View over a flow: the root or one nested in an `inline-flow`.
#[derive(Clone, Copy, Debug)]
pub struct FlowView<'m> {
    pub inner: ElementView<'m>,
}

impl<'m> FlowView<'m> {
    pub fn states(&self) -> Vec<StateView<'m>> {
        self.inner
            .model
            .states(self.inner.id)
            .into_iter()
            .map(|s| StateView { inner: self.inner.wrap(s) })
            .collect()
    }

    /// First state with the given id.
    pub fn state(&self, state_id: &str) -> Option<StateView<'m>> {
        self.inner
            .model
            .state_by_id(self.inner.id, state_id)
            .map(|s| StateView { inner: self.inner.wrap(s) })
    }

    pub fn start_state_id(&self) -> Option<&'m str> {
        self.inner.model.start_state_id(self.inner.id)
    }

    pub fn start_state(&self) -> Option<StateView<'m>> {
        self.inner
            .model
            .start_state(self.inner.id)
            .map(|s| StateView { inner: self.inner.wrap(s) })
    }

    pub fn global_transitions(&self) -> Vec<TransitionView<'m>> {
        self.inner
            .model
            .outbound(self.inner.id)
            .into_iter()
            .map(|t| TransitionView { inner: self.inner.wrap(t) })
            .collect()
    }

    pub fn inline_flows(&self) -> Vec<FlowView<'m>> {
        self.inner
            .model
            .inline_flows(self.inner.id)
            .into_iter()
            .map(|f| FlowView { inner: self.inner.wrap(f) })
            .collect()
    }

    /// Id of the enclosing `inline-flow`; None for the root flow.
    pub fn inline_id(&self) -> Option<&'m str> {
        self.inner.parent().and_then(|p| p.id())
    }

    pub fn input_mapper(&self) -> Option<MapperView<'m>> {
        self.slot_mapper(ElementKind::InputMapper)
    }

    pub fn output_mapper(&self) -> Option<MapperView<'m>> {
        self.slot_mapper(ElementKind::OutputMapper)
    }

    fn slot_mapper(&self, kind: ElementKind) -> Option<MapperView<'m>> {
        self.inner
            .model
            .slot_child(self.inner.id, kind)
            .map(|m| MapperView { inner: self.inner.wrap(m) })
    }

    pub fn vars(&self) -> Vec<ElementView<'m>> {
        self.inner.children_of_kind(ElementKind::Var)
    }

    pub fn imports(&self) -> Vec<ElementView<'m>> {
        self.inner.children_of_kind(ElementKind::Import)
    }

    pub fn exception_handlers(&self) -> Vec<ElementView<'m>> {
        self.inner.children_of_kind(ElementKind::ExceptionHandler)
    }

    pub fn start_actions(&self) -> Vec<ActionView<'m>> {
        actions(self.inner, self.inner.model.entry_actions(self.inner.id))
    }

    pub fn end_actions(&self) -> Vec<ActionView<'m>> {
        actions(self.inner, self.inner.model.exit_actions(self.inner.id))
    }
}

// ============================================================================
// STATE VIEW
// ============================================================================

/// View over any of the five state kinds.
#[derive(Clone, Copy, Debug)]
pub struct StateView<'m> {
    pub inner: ElementView<'m>,
}

impl<'m> StateView<'m> {
    pub fn id(&self) -> Option<&'m str> {
        self.inner.id()
    }

    pub fn kind(&self) -> ElementKind {
        self.inner.kind()
    }

    /// Transitions leaving this state (for decisions, the `if` branches).
    pub fn transitions(&self) -> Vec<TransitionView<'m>> {
        self.inner
            .model
            .outbound(self.inner.id)
            .into_iter()
            .map(|t| TransitionView { inner: self.inner.wrap(t) })
            .collect()
    }

    pub fn outbound(&self) -> Vec<TransitionView<'m>> {
        self.transitions()
    }

    /// `if` children of a decision state.
    pub fn ifs(&self) -> Vec<ElementView<'m>> {
        self.inner.children_of_kind(ElementKind::If)
    }

    pub fn exception_handlers(&self) -> Vec<ElementView<'m>> {
        self.inner.children_of_kind(ElementKind::ExceptionHandler)
    }

    /// Transitions resolved to this state.
    pub fn inbound(&self) -> Vec<TransitionView<'m>> {
        self.inner
            .model
            .inbound(self.inner.id)
            .iter()
            .map(|t| TransitionView { inner: self.inner.wrap(*t) })
            .collect()
    }

    pub fn is_start(&self) -> bool {
        let model = self.inner.model;
        model
            .flow_of(self.inner.id)
            .and_then(|flow| model.start_state(flow))
            == Some(self.inner.id)
    }

    /// Actions of an action state.
    pub fn actions(&self) -> Vec<ActionView<'m>> {
        actions(self.inner, self.inner.model.actions(self.inner.id))
    }

    pub fn entry_actions(&self) -> Vec<ActionView<'m>> {
        actions(self.inner, self.inner.model.entry_actions(self.inner.id))
    }

    pub fn exit_actions(&self) -> Vec<ActionView<'m>> {
        actions(self.inner, self.inner.model.exit_actions(self.inner.id))
    }

    pub fn render_actions(&self) -> Vec<ActionView<'m>> {
        actions(self.inner, self.inner.model.render_actions(self.inner.id))
    }

    /// The `view` of a view or end state.
    pub fn view_name(&self) -> Option<&'m str> {
        self.inner.attribute("view")
    }

    /// The subflow id of a subflow state.
    pub fn subflow(&self) -> Option<&'m str> {
        self.inner.attribute(constants::FLOW)
    }

    pub fn attribute_mapper(&self) -> Option<MapperView<'m>> {
        self.inner
            .model
            .slot_child(self.inner.id, ElementKind::AttributeMapper)
            .map(|m| MapperView { inner: self.inner.wrap(m) })
    }
}

// ============================================================================
// TRANSITION VIEW
// ============================================================================

/// View over a transition or an `if` branch.
#[derive(Clone, Copy, Debug)]
pub struct TransitionView<'m> {
    pub inner: ElementView<'m>,
}

impl<'m> TransitionView<'m> {
    /// Triggering event; None for `if` branches.
    pub fn on(&self) -> Option<&'m str> {
        self.inner.attribute(constants::ON)
    }

    pub fn on_exception(&self) -> Option<&'m str> {
        self.inner.attribute(constants::ON_EXCEPTION)
    }

    pub fn to_state_id(&self) -> Option<&'m str> {
        self.inner.model.to_state_id(self.inner.id)
    }

    pub fn branch(&self) -> Option<Branch> {
        self.inner.model.branch(self.inner.id)
    }

    /// The state this transition leaves from, or None for global
    /// transitions.
    pub fn source(&self) -> Option<StateView<'m>> {
        self.inner
            .model
            .transition_source(self.inner.id)
            .map(|s| self.inner.wrap(s))
            .and_then(|v| v.as_state())
    }

    pub fn is_global(&self) -> bool {
        self.inner.parent().map(|p| p.kind()) == Some(ElementKind::GlobalTransitions)
    }

    /// Resolved target, as of the last reconnection.
    pub fn target(&self) -> Option<StateView<'m>> {
        self.inner
            .model
            .target(self.inner.id)
            .map(|s| StateView { inner: self.inner.wrap(s) })
    }

    pub fn actions(&self) -> Vec<ActionView<'m>> {
        actions(self.inner, self.inner.model.actions(self.inner.id))
    }
}

// ============================================================================
// ACTION VIEW
// ============================================================================

/// View over an action leaf.
#[derive(Clone, Copy, Debug)]
pub struct ActionView<'m> {
    pub inner: ElementView<'m>,
}

impl<'m> ActionView<'m> {
    pub fn kind(&self) -> ElementKind {
        self.inner.kind()
    }

    pub fn action_type(&self) -> Option<ActionType> {
        self.inner.model.action_type(self.inner.id)
    }

    pub fn bean(&self) -> Option<&'m str> {
        self.inner.attribute(constants::BEAN)
    }

    pub fn method(&self) -> Option<&'m str> {
        self.inner.attribute(constants::METHOD)
    }

    pub fn expression(&self) -> Option<&'m str> {
        self.inner.attribute(constants::EXPRESSION)
    }

    /// Scope of a `set` action.
    pub fn scope(&self) -> Option<&'m str> {
        self.inner.attribute(constants::SCOPE)
    }

    /// Action `name`, used to qualify the result event.
    pub fn name(&self) -> Option<&'m str> {
        self.inner.attribute(constants::NAME)
    }
}

// ============================================================================
// MAPPER VIEW
// ============================================================================

/// View over an attribute, input or output mapper.
#[derive(Clone, Copy, Debug)]
pub struct MapperView<'m> {
    pub inner: ElementView<'m>,
}

impl<'m> MapperView<'m> {
    pub fn kind(&self) -> ElementKind {
        self.inner.kind()
    }

    /// Mapper bean reference, when the mapper is externally defined.
    pub fn bean(&self) -> Option<&'m str> {
        self.inner.attribute(constants::BEAN)
    }

    /// Input mapper nested in an attribute mapper.
    pub fn input_mapper(&self) -> Option<MapperView<'m>> {
        self.nested(ElementKind::InputMapper)
    }

    /// Output mapper nested in an attribute mapper.
    pub fn output_mapper(&self) -> Option<MapperView<'m>> {
        self.nested(ElementKind::OutputMapper)
    }

    fn nested(&self, kind: ElementKind) -> Option<MapperView<'m>> {
        self.inner
            .model
            .slot_child(self.inner.id, kind)
            .map(|m| MapperView { inner: self.inner.wrap(m) })
    }

    /// Mapping-like children: `mapping`, `input-attribute`,
    /// `output-attribute`.
    pub fn mappings(&self) -> Vec<ElementView<'m>> {
        self.inner
            .children()
            .into_iter()
            .filter(|c| c.kind().slot() == Slot::Mappings)
            .collect()
    }
}

fn actions<'m>(owner: ElementView<'m>, ids: Vec<ElementId>) -> Vec<ActionView<'m>> {
    ids.into_iter()
        .map(|id| ActionView { inner: owner.wrap(id) })
        .collect()
}
