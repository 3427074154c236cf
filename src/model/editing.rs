//! Mutation API for [`FlowModel`].
//!
//! Every operation here keeps three things in step: the document (written
//! at the position the ordering policy picks), the element graph, and the
//! derived transition links. Listeners are notified once all three agree.
//!
//! ## Example
//!
//! ```
//! use flowdef::base::ElementKind;
//! use flowdef::model::FlowModel;
//!
//! let mut model = FlowModel::new();
//! let flow = model.root();
//! let a = model.add_state(flow, ElementKind::ActionState, "a").unwrap();
//! model.add_action(a, ElementKind::Action).unwrap();
//! let t = model.add_transition(a, "success", "b").unwrap();
//! assert_eq!(model.target(t), None);
//!
//! let b = model.add_state(flow, ElementKind::ViewState, "b").unwrap();
//! assert_eq!(model.target(t), Some(b));
//! ```
//!
//! Operations on handles that are stale, detached or owned by a different
//! parent fail with a [`ModelError`] instead of doing nothing.

use tracing::debug;

use super::{Element, ElementId, FlowModel, ModelError, ModelEvent, StructureTopic};
use crate::base::constants;
use crate::base::{ActionType, Branch, ElementKind};
use crate::document::{NodeId, SchemaVersion, ordering};

impl FlowModel {
    // ── Attributes ───────────────────────────────────────────────────

    /// Write an attribute through to the node and fire a property event.
    ///
    /// The event fires even when the value is unchanged. `None` or an empty
    /// value removes the attribute. Detached elements may be written, so a
    /// fresh element can be configured before it is attached. Writing a
    /// state's `id` or a transition's target reconnects the flow; to carry
    /// inbound transitions along with a new id use
    /// [`rename_state`](Self::rename_state).
    pub fn set_attribute(
        &mut self,
        id: ElementId,
        name: &str,
        value: Option<&str>,
    ) -> Result<(), ModelError> {
        let element = self.element(id)?;
        match (element.kind, element.branch, element.parent) {
            (ElementKind::IfTransition, Some(branch), Some(parent)) if name == constants::TO => {
                return self.set_if_branch(parent, branch, value);
            }
            (ElementKind::If, _, _) if name == Branch::Then.attribute() => {
                return self.set_if_branch(id, Branch::Then, value);
            }
            (ElementKind::If, _, _) if name == Branch::Else.attribute() => {
                return self.set_if_branch(id, Branch::Else, value);
            }
            _ => {}
        }

        self.transaction(|model| {
            model.write_attribute(id, name, value)?;
            let kind = model.element(id)?.kind;
            let relinks = (kind.is_state() && name == constants::ID)
                || (kind == ElementKind::Transition && name == constants::TO);
            if relinks && model.is_attached(id) {
                if let Some(flow) = model.flow_of(id) {
                    model.relink_and_notify(flow);
                }
            }
            Ok(())
        })
    }

    /// Raw write plus property event, no reconnection.
    fn write_attribute(
        &mut self,
        id: ElementId,
        name: &str,
        value: Option<&str>,
    ) -> Result<(), ModelError> {
        let element = self.element(id)?;
        let node = element.node;
        let node_name = match element.branch {
            Some(branch) if name == constants::TO => branch.attribute(),
            _ => name,
        };
        let old = self.document.set_attribute(node, node_name, value)?;
        let new = self.document.attribute(node, node_name).map(str::to_string);
        self.emit(ModelEvent::property(id, name, old, new));
        Ok(())
    }

    // ── Creation ─────────────────────────────────────────────────────

    /// Allocate a fresh detached element of `kind` meant to live under
    /// `parent`.
    ///
    /// The element gets a new node of the right tag and a parent link, but
    /// joins the graph only when attached with [`add_child`](Self::add_child)
    /// or one of the slot setters.
    pub fn create_element(
        &mut self,
        kind: ElementKind,
        parent: ElementId,
    ) -> Result<ElementId, ModelError> {
        let parent_kind = self.element(parent)?.kind;
        if kind.is_virtual() || !parent_kind.accepts(kind) {
            return Err(ModelError::IllegalChild {
                parent: parent_kind,
                child: kind,
            });
        }
        let node = self.document.create_element(kind.tag());
        let action_type = if kind.is_action() {
            ActionType::for_container(parent_kind)
        } else {
            None
        };
        let id = self.construct(kind, node, Some(parent), action_type)?;
        // An inline flow always wraps a flow.
        if kind == ElementKind::InlineFlow {
            let flow_node = self.document.create_element(ElementKind::Flow.tag());
            self.document.append_child(node, flow_node)?;
            let flow = self.construct(ElementKind::Flow, flow_node, Some(id), None)?;
            self.element_mut(id)?.children.push(flow);
        }
        Ok(id)
    }

    /// Drop a detached element together with its subtree and nodes.
    ///
    /// Meant for elements from [`create_element`](Self::create_element) or
    /// [`clone_detached`](Self::clone_detached) that will not be attached.
    /// Fires nothing; attached elements are removed with
    /// [`remove_child`](Self::remove_child) instead.
    pub fn discard(&mut self, id: ElementId) -> Result<(), ModelError> {
        let element = self.element(id)?;
        if element.kind.is_virtual() {
            return Err(ModelError::wrong_kind("element with its own node", element.kind));
        }
        let linked = element
            .parent
            .is_some_and(|parent| self.children(parent).contains(&id));
        if linked || id == self.root {
            return Err(ModelError::Attached(id));
        }
        self.discard_subtree(id)?;
        debug!(element = %id, "discarded element");
        Ok(())
    }

    // ── Children ─────────────────────────────────────────────────────

    /// Attach a child created for `parent`.
    ///
    /// Returns `Ok(false)` if the child is already attached there. The node
    /// goes where the ordering policy puts it; one `AddChildren` event fires
    /// with the child's index among the parent's elements.
    pub fn add_child(&mut self, parent: ElementId, child: ElementId) -> Result<bool, ModelError> {
        self.check_child(parent, child)?;
        if self.children(parent).contains(&child) {
            return Ok(false);
        }
        self.attach_child(parent, child, None)?;
        Ok(true)
    }

    /// Attach `child` as the `index`-th member of its ordering group under
    /// `parent`, or move it there if it is already attached.
    ///
    /// The group is the run of siblings the ordering policy gives the same
    /// priority, so a child never leaves its schema position; an index past
    /// the end of the group appends to it. A new child fires
    /// `AddChildren`, a moved one `MoveChildren`. Returns the child's index
    /// among the parent's elements.
    pub fn insert_child_at(
        &mut self,
        parent: ElementId,
        child: ElementId,
        index: usize,
    ) -> Result<usize, ModelError> {
        self.check_child(parent, child)?;
        if self.children(parent).contains(&child) {
            return self.move_child_to(parent, child, index);
        }
        self.attach_child(parent, child, Some(index))
    }

    fn check_child(&self, parent: ElementId, child: ElementId) -> Result<(), ModelError> {
        let parent_kind = self.require_attached(parent)?.kind;
        let child_element = self.element(child)?;
        if child_element.parent != Some(parent) {
            return Err(ModelError::NotOwned { parent, child });
        }
        let child_kind = child_element.kind;
        if child_kind.is_virtual() || !parent_kind.accepts(child_kind) {
            return Err(ModelError::IllegalChild {
                parent: parent_kind,
                child: child_kind,
            });
        }
        Ok(())
    }

    fn attach_child(
        &mut self,
        parent: ElementId,
        child: ElementId,
        position: Option<usize>,
    ) -> Result<usize, ModelError> {
        let parent_kind = self.element(parent)?.kind;
        let child_kind = self.element(child)?.kind;
        if child_kind.slot().is_single(parent_kind) && self.slot_child(parent, child_kind).is_some()
        {
            return Err(ModelError::SlotOccupied {
                parent,
                kind: child_kind,
            });
        }

        self.transaction(|model| {
            let index = model.attach(parent, child, position)?;
            debug!(parent = %parent, child = %child, kind = %child_kind, index, "added child");
            model.emit(ModelEvent::structure(
                parent,
                StructureTopic::AddChildren,
                child,
                Some(index),
            ));
            model.relink_around(child);
            Ok(index)
        })
    }

    fn move_child_to(
        &mut self,
        parent: ElementId,
        child: ElementId,
        index: usize,
    ) -> Result<usize, ModelError> {
        self.transaction(|model| {
            model.detach(parent, child)?;
            let position = model.attach(parent, child, Some(index))?;
            debug!(parent = %parent, child = %child, index = position, "moved child");
            model.emit(ModelEvent::structure(
                parent,
                StructureTopic::MoveChildren,
                child,
                Some(position),
            ));
            if let Some(flow) = model.flow_of(parent) {
                model.relink_and_notify(flow);
            }
            Ok(position)
        })
    }

    /// Insert the child's node by ordering policy, at `position` within its
    /// group when given, and record it in the parent's child list at the
    /// matching place.
    fn attach(
        &mut self,
        parent: ElementId,
        child: ElementId,
        position: Option<usize>,
    ) -> Result<usize, ModelError> {
        let parent_node = self.element(parent)?.node;
        let child_node = self.element(child)?.node;
        match position {
            Some(index) => {
                ordering::insert_node_at(&mut self.document, parent_node, child_node, index)?
            }
            None => ordering::insert_node(&mut self.document, parent_node, child_node)?,
        };
        let index = self.element_index(parent, child_node);
        self.element_mut(parent)?.children.insert(index, child);
        Ok(index)
    }

    /// Position among the parent's elements for a node just inserted.
    fn element_index(&self, parent: ElementId, child_node: NodeId) -> usize {
        let Some(position) = self.document.index_in_parent(child_node) else {
            return self.children(parent).len();
        };
        self.children(parent)
            .iter()
            .filter(|c| {
                self.node(**c)
                    .and_then(|n| self.document.index_in_parent(n))
                    .is_some_and(|p| p < position)
            })
            .count()
    }

    /// Detach `child` from `parent` and drop it.
    ///
    /// Returns `Ok(false)` without firing anything if `child` is not a
    /// child of `parent`. Otherwise exactly one `RemoveChildren` event
    /// fires; the removed handle is stale afterwards.
    pub fn remove_child(&mut self, parent: ElementId, child: ElementId) -> Result<bool, ModelError> {
        self.require_attached(parent)?;
        let child_kind = self.element(child)?.kind;
        let Some(index) = self.children(parent).iter().position(|c| *c == child) else {
            return Ok(false);
        };
        if child_kind.is_virtual() {
            let branch = self.element(child)?.branch;
            if let Some(branch) = branch {
                self.set_if_branch(parent, branch, None)?;
                return Ok(true);
            }
        }

        self.transaction(|model| {
            model.detach(parent, child)?;
            model.discard_subtree(child)?;
            debug!(parent = %parent, child = %child, kind = %child_kind, "removed child");
            model.emit(ModelEvent::structure(
                parent,
                StructureTopic::RemoveChildren,
                child,
                Some(index),
            ));
            if let Some(flow) = model.flow_of(parent) {
                model.relink_and_notify(flow);
            }
            Ok(true)
        })
    }

    fn detach(&mut self, parent: ElementId, child: ElementId) -> Result<(), ModelError> {
        let parent_node = self.element(parent)?.node;
        let child_node = self.element(child)?.node;
        self.document.remove_child(parent_node, child_node)?;
        self.element_mut(parent)?.children.retain(|c| *c != child);
        Ok(())
    }

    // ── Single-valued slots ──────────────────────────────────────────

    /// Replace whatever occupies `slot_kind`'s slot under `parent`.
    ///
    /// `value` must be a detached element created for `parent`, or `None`
    /// to clear the slot. Fires one structure event: `AddChildren` when
    /// the slot was empty, `RemoveChildren` when cleared, `MoveChildren`
    /// when an occupant was replaced.
    fn set_slot(
        &mut self,
        parent: ElementId,
        slot_kind: ElementKind,
        value: Option<ElementId>,
    ) -> Result<(), ModelError> {
        let parent_kind = self.require_attached(parent)?.kind;
        if let Some(child) = value {
            let element = self.element(child)?;
            if element.parent != Some(parent) {
                return Err(ModelError::NotOwned { parent, child });
            }
            if element.kind.slot() != slot_kind.slot() || !parent_kind.accepts(element.kind) {
                return Err(ModelError::IllegalChild {
                    parent: parent_kind,
                    child: element.kind,
                });
            }
            if self.children(parent).contains(&child) {
                return Ok(());
            }
        }
        let old = self.slot_child(parent, slot_kind);
        if old.is_none() && value.is_none() {
            return Ok(());
        }

        self.transaction(|model| {
            let mut removed_index = None;
            if let Some(old) = old {
                removed_index = model.children(parent).iter().position(|c| *c == old);
                model.detach(parent, old)?;
                model.discard_subtree(old)?;
            }
            let event = match value {
                Some(child) => {
                    let index = model.attach(parent, child, None)?;
                    let topic = if old.is_some() {
                        StructureTopic::MoveChildren
                    } else {
                        StructureTopic::AddChildren
                    };
                    ModelEvent::structure(parent, topic, child, Some(index))
                }
                None => ModelEvent::structure(
                    parent,
                    StructureTopic::RemoveChildren,
                    old.unwrap_or(parent),
                    removed_index,
                ),
            };
            model.emit(event);
            match value {
                Some(child) => model.relink_around(child),
                None => {
                    if let Some(flow) = model.flow_of(parent) {
                        model.relink_and_notify(flow);
                    }
                }
            }
            Ok(())
        })
    }

    /// Set or clear the entry-actions container (`entry-actions`,
    /// `on-entry`, `start-actions` or `on-start`).
    pub fn set_entry_actions(&mut self, parent: ElementId, value: Option<ElementId>) -> Result<(), ModelError> {
        self.set_slot(parent, ElementKind::EntryActions, value)
    }

    /// Set or clear the exit-actions container.
    pub fn set_exit_actions(&mut self, parent: ElementId, value: Option<ElementId>) -> Result<(), ModelError> {
        self.set_slot(parent, ElementKind::ExitActions, value)
    }

    /// Set or clear a view state's render-actions container.
    pub fn set_render_actions(&mut self, parent: ElementId, value: Option<ElementId>) -> Result<(), ModelError> {
        self.set_slot(parent, ElementKind::RenderActions, value)
    }

    pub fn set_secured(&mut self, parent: ElementId, value: Option<ElementId>) -> Result<(), ModelError> {
        self.set_slot(parent, ElementKind::Secured, value)
    }

    pub fn set_input_mapper(&mut self, parent: ElementId, value: Option<ElementId>) -> Result<(), ModelError> {
        self.set_slot(parent, ElementKind::InputMapper, value)
    }

    pub fn set_output_mapper(&mut self, parent: ElementId, value: Option<ElementId>) -> Result<(), ModelError> {
        self.set_slot(parent, ElementKind::OutputMapper, value)
    }

    pub fn set_attribute_mapper(&mut self, parent: ElementId, value: Option<ElementId>) -> Result<(), ModelError> {
        self.set_slot(parent, ElementKind::AttributeMapper, value)
    }

    /// The entry-actions container of `parent`, created if missing.
    pub fn ensure_entry_actions(&mut self, parent: ElementId) -> Result<ElementId, ModelError> {
        self.ensure_slot(parent, ElementKind::EntryActions)
    }

    /// The exit-actions container of `parent`, created if missing.
    pub fn ensure_exit_actions(&mut self, parent: ElementId) -> Result<ElementId, ModelError> {
        self.ensure_slot(parent, ElementKind::ExitActions)
    }

    /// The render-actions container of a view state, created if missing.
    pub fn ensure_render_actions(&mut self, parent: ElementId) -> Result<ElementId, ModelError> {
        self.ensure_slot(parent, ElementKind::RenderActions)
    }

    fn ensure_slot(&mut self, parent: ElementId, slot_kind: ElementKind) -> Result<ElementId, ModelError> {
        if let Some(existing) = self.slot_child(parent, slot_kind) {
            return Ok(existing);
        }
        let parent_kind = self.element(parent)?.kind;
        // Flows use start/end actions for their entry and exit slots.
        let kind = match (parent_kind, slot_kind) {
            (ElementKind::Flow, ElementKind::EntryActions) => ElementKind::StartActions,
            (ElementKind::Flow, ElementKind::ExitActions) => ElementKind::EndActions,
            _ => slot_kind,
        };
        let container = self.create_element(kind, parent)?;
        self.set_slot(parent, slot_kind, Some(container))?;
        Ok(container)
    }

    // ── States ───────────────────────────────────────────────────────

    /// Create a state with the given id and add it to `flow`.
    ///
    /// Transitions that were waiting for this id become resolved; each one
    /// fires an `Outputs` event on its source.
    pub fn add_state(
        &mut self,
        flow: ElementId,
        kind: ElementKind,
        state_id: &str,
    ) -> Result<ElementId, ModelError> {
        self.new_state(flow, kind, state_id, None)
    }

    /// Like [`add_state`](Self::add_state), placing the state at `index`
    /// among the states of its ordering group (action states; view,
    /// decision and subflow states; end states).
    pub fn insert_state_at(
        &mut self,
        flow: ElementId,
        kind: ElementKind,
        state_id: &str,
        index: usize,
    ) -> Result<ElementId, ModelError> {
        self.new_state(flow, kind, state_id, Some(index))
    }

    fn new_state(
        &mut self,
        flow: ElementId,
        kind: ElementKind,
        state_id: &str,
        position: Option<usize>,
    ) -> Result<ElementId, ModelError> {
        self.require_flow(flow)?;
        if !kind.is_state() {
            return Err(ModelError::wrong_kind("state", kind));
        }
        self.add_configured(flow, kind, &[(constants::ID, Some(state_id))], position)
    }

    /// Remove a state from `flow`.
    ///
    /// Removing a state that is not in the flow is a no-op returning
    /// `Ok(false)`. Transitions that pointed at it are left unresolved.
    pub fn remove_state(&mut self, flow: ElementId, state: ElementId) -> Result<bool, ModelError> {
        self.require_flow(flow)?;
        if !self.children(flow).contains(&state) {
            return Ok(false);
        }
        self.remove_child(flow, state)
    }

    /// Give a state a new id and carry every transition resolved to it
    /// along: their `to` (or `then`/`else`) is rewritten to the new id, and
    /// a start-state reference naming the old id is updated.
    pub fn rename_state(&mut self, state: ElementId, new_id: &str) -> Result<(), ModelError> {
        let kind = self.require_attached(state)?.kind;
        if !kind.is_state() {
            return Err(ModelError::wrong_kind("state", kind));
        }
        let Some(flow) = self.flow_of(state) else {
            return Err(ModelError::Detached(state));
        };
        let old_id = self.id_of(state).map(str::to_string);
        let inbound = self.inbound(state).to_vec();
        let renames_start =
            old_id.is_some() && self.start_state_id(flow) == old_id.as_deref();

        self.transaction(|model| {
            model.write_attribute(state, constants::ID, Some(new_id))?;
            for transition in &inbound {
                model.write_attribute(*transition, constants::TO, Some(new_id))?;
            }
            if renames_start {
                model.write_start_state(flow, Some(new_id))?;
            }
            debug!(
                state = %state,
                old = ?old_id,
                new = new_id,
                inbound = inbound.len(),
                "renamed state"
            );
            model.relink_and_notify(flow);
            Ok(())
        })
    }

    /// Alias of [`rename_state`](Self::rename_state).
    pub fn set_state_id(&mut self, state: ElementId, new_id: &str) -> Result<(), ModelError> {
        self.rename_state(state, new_id)
    }

    /// Point the flow's start-state reference at `state_id`, or clear it.
    ///
    /// Documents written against the first schema generation keep a
    /// `start-state` marker element; others use the flow attribute.
    pub fn set_start_state(&mut self, flow: ElementId, state_id: Option<&str>) -> Result<(), ModelError> {
        self.require_flow(flow)?;
        self.transaction(|model| model.write_start_state(flow, state_id))
    }

    fn write_start_state(&mut self, flow: ElementId, state_id: Option<&str>) -> Result<(), ModelError> {
        let node = self.element(flow)?.node;
        let has_attribute = self
            .document
            .attribute(node, constants::START_STATE_ATTRIBUTE)
            .is_some();
        let markers = self.start_state_markers(flow);
        let use_marker = !has_attribute
            && (!markers.is_empty() || self.document.schema_version() == SchemaVersion::V1);

        if !use_marker {
            return self.write_attribute(flow, constants::START_STATE_ATTRIBUTE, state_id);
        }

        let (marker, created) = match (markers.first(), state_id) {
            (Some(marker), _) => (*marker, false),
            (None, None) => return Ok(()),
            (None, Some(_)) => (self.document.create_element(constants::START_STATE_TAG), true),
        };
        let old = self.document.set_attribute(marker, constants::START_STATE_IDREF, state_id)?;
        if created {
            ordering::insert_node(&mut self.document, node, marker)?;
        }
        let new = state_id.filter(|v| !v.is_empty()).map(str::to_string);
        self.emit(ModelEvent::property(flow, constants::START_STATE_ATTRIBUTE, old, new));
        Ok(())
    }

    fn require_flow(&self, flow: ElementId) -> Result<&Element, ModelError> {
        let element = self.require_attached(flow)?;
        if element.kind != ElementKind::Flow {
            return Err(ModelError::wrong_kind("flow", element.kind));
        }
        Ok(element)
    }

    // ── Transitions ──────────────────────────────────────────────────

    /// Add a transition on event `on` to state `to`.
    ///
    /// `source` is a transition-source state, or a flow, in which case the
    /// transition becomes a global transition.
    pub fn add_transition(
        &mut self,
        source: ElementId,
        on: &str,
        to: &str,
    ) -> Result<ElementId, ModelError> {
        let kind = self.require_attached(source)?.kind;
        if kind == ElementKind::Flow {
            return self.add_global_transition(source, on, to);
        }
        if !kind.accepts(ElementKind::Transition) {
            return Err(ModelError::IllegalChild {
                parent: kind,
                child: ElementKind::Transition,
            });
        }
        self.add_configured(
            source,
            ElementKind::Transition,
            &[(constants::ON, Some(on)), (constants::TO, Some(to))],
            None,
        )
    }

    /// Add a global transition to `flow`, creating the
    /// `global-transitions` block when needed.
    pub fn add_global_transition(
        &mut self,
        flow: ElementId,
        on: &str,
        to: &str,
    ) -> Result<ElementId, ModelError> {
        self.require_flow(flow)?;
        self.transaction(|model| {
            let block = match model.slot_child(flow, ElementKind::GlobalTransitions) {
                Some(block) => block,
                None => model.add_configured(flow, ElementKind::GlobalTransitions, &[], None)?,
            };
            model.add_configured(
                block,
                ElementKind::Transition,
                &[(constants::ON, Some(on)), (constants::TO, Some(to))],
                None,
            )
        })
    }

    /// Point a transition at a new state id.
    pub fn set_to_state_id(&mut self, transition: ElementId, to: &str) -> Result<(), ModelError> {
        let kind = self.element(transition)?.kind;
        if !kind.is_transition() {
            return Err(ModelError::wrong_kind("transition", kind));
        }
        self.set_attribute(transition, constants::TO, Some(to))
    }

    /// Point a transition at `state`, which must be in the same flow.
    pub fn set_target(&mut self, transition: ElementId, state: ElementId) -> Result<(), ModelError> {
        let kind = self.require_attached(state)?.kind;
        if !kind.is_transitionable_to() {
            return Err(ModelError::wrong_kind("state", kind));
        }
        let flow = self.flow_of(transition);
        if flow.is_none() || flow != self.flow_of(state) {
            return Err(ModelError::NotOwned {
                parent: flow.unwrap_or(transition),
                child: state,
            });
        }
        let state_id = self.id_of(state).unwrap_or_default().to_string();
        self.set_to_state_id(transition, &state_id)
    }

    /// Move a state transition to another source state in the same flow.
    ///
    /// Fires `RemoveChildren` on the old source and `AddChildren` on the
    /// new one; the handle stays valid.
    pub fn move_transition(&mut self, transition: ElementId, new_source: ElementId) -> Result<(), ModelError> {
        let element = self.require_attached(transition)?;
        if element.kind != ElementKind::Transition {
            return Err(ModelError::wrong_kind("transition", element.kind));
        }
        let Some(old_source) = element.parent else {
            return Err(ModelError::Detached(transition));
        };
        let target_kind = self.require_attached(new_source)?.kind;
        if !target_kind.accepts(ElementKind::Transition) {
            return Err(ModelError::IllegalChild {
                parent: target_kind,
                child: ElementKind::Transition,
            });
        }
        if old_source == new_source {
            return Ok(());
        }

        self.transaction(|model| {
            let old_index = model.children(old_source).iter().position(|c| *c == transition);
            model.detach(old_source, transition)?;
            model.emit(ModelEvent::structure(
                old_source,
                StructureTopic::RemoveChildren,
                transition,
                old_index,
            ));
            model.element_mut(transition)?.parent = Some(new_source);
            let index = model.attach(new_source, transition, None)?;
            model.emit(ModelEvent::structure(
                new_source,
                StructureTopic::AddChildren,
                transition,
                Some(index),
            ));
            let mut flows = vec![model.flow_of(old_source), model.flow_of(new_source)];
            flows.dedup();
            for flow in flows.into_iter().flatten() {
                model.relink_and_notify(flow);
            }
            Ok(())
        })
    }

    // ── Decisions ────────────────────────────────────────────────────

    /// Add an `if` to a decision state.
    pub fn add_if(
        &mut self,
        decision: ElementId,
        test: &str,
        then: &str,
        otherwise: Option<&str>,
    ) -> Result<ElementId, ModelError> {
        let kind = self.require_attached(decision)?.kind;
        if kind != ElementKind::DecisionState {
            return Err(ModelError::wrong_kind("decision-state", kind));
        }
        self.transaction(|model| {
            let branch = model.create_element(ElementKind::If, decision)?;
            let node = model.element(branch)?.node;
            model.document.set_attribute(node, constants::TEST, Some(test))?;
            model.document.set_attribute(node, Branch::Then.attribute(), Some(then))?;
            if let Some(otherwise) = otherwise {
                model.document.set_attribute(node, Branch::Else.attribute(), Some(otherwise))?;
            }
            let transitions = model.construct_branches(branch, node)?;
            model.element_mut(branch)?.children = transitions;
            model.add_child(decision, branch)?;
            Ok(branch)
        })
    }

    /// Set or clear one branch of an `if`.
    ///
    /// The branch transition appears when a target is set on an absent
    /// branch (`AddChildren`) and disappears when cleared (`RemoveChildren`).
    pub fn set_if_branch(
        &mut self,
        branch_owner: ElementId,
        branch: Branch,
        to: Option<&str>,
    ) -> Result<(), ModelError> {
        let element = self.element(branch_owner)?;
        if element.kind != ElementKind::If {
            return Err(ModelError::wrong_kind("if", element.kind));
        }
        let node = element.node;
        let existing = element
            .children
            .iter()
            .copied()
            .find(|c| self.branch(*c) == Some(branch));
        let to = to.filter(|v| !v.is_empty());

        self.transaction(|model| {
            match (existing, to) {
                (Some(transition), Some(_)) => {
                    model.write_attribute(transition, constants::TO, to)?;
                }
                (Some(transition), None) => {
                    model.document.set_attribute(node, branch.attribute(), None)?;
                    let index = model.children(branch_owner).iter().position(|c| *c == transition);
                    model.element_mut(branch_owner)?.children.retain(|c| *c != transition);
                    model.drop_subtree(transition);
                    model.emit(ModelEvent::structure(
                        branch_owner,
                        StructureTopic::RemoveChildren,
                        transition,
                        index,
                    ));
                }
                (None, Some(_)) => {
                    model.document.set_attribute(node, branch.attribute(), to)?;
                    let transition = model.alloc_branch(branch_owner, node, branch)?;
                    let children = &mut model.element_mut(branch_owner)?.children;
                    let index = match branch {
                        Branch::Then => 0,
                        Branch::Else => children.len(),
                    };
                    children.insert(index, transition);
                    model.emit(ModelEvent::structure(
                        branch_owner,
                        StructureTopic::AddChildren,
                        transition,
                        Some(index),
                    ));
                }
                (None, None) => return Ok(()),
            }
            if model.is_attached(branch_owner) {
                if let Some(flow) = model.flow_of(branch_owner) {
                    model.relink_and_notify(flow);
                }
            }
            Ok(())
        })
    }

    // ── Actions and other children ───────────────────────────────────

    /// Add an action leaf (`action`, `bean-action`, `evaluate-action` or
    /// `set`) to an action state, a transition or an action container.
    pub fn add_action(&mut self, container: ElementId, kind: ElementKind) -> Result<ElementId, ModelError> {
        self.new_action(container, kind, None)
    }

    /// Like [`add_action`](Self::add_action), placing the action at `index`
    /// among the actions of its ordering group.
    pub fn insert_action_at(
        &mut self,
        container: ElementId,
        kind: ElementKind,
        index: usize,
    ) -> Result<ElementId, ModelError> {
        self.new_action(container, kind, Some(index))
    }

    fn new_action(
        &mut self,
        container: ElementId,
        kind: ElementKind,
        position: Option<usize>,
    ) -> Result<ElementId, ModelError> {
        if !kind.is_action() {
            return Err(ModelError::wrong_kind("action", kind));
        }
        self.add_configured(container, kind, &[], position)
    }

    /// Add an `attribute` name/value child.
    pub fn add_attribute(&mut self, parent: ElementId, name: &str, value: &str) -> Result<ElementId, ModelError> {
        self.add_configured(
            parent,
            ElementKind::Attribute,
            &[(constants::NAME, Some(name)), (constants::VALUE, Some(value))],
            None,
        )
    }

    /// Add a `var` declaration.
    pub fn add_var(&mut self, parent: ElementId, name: &str, class: Option<&str>) -> Result<ElementId, ModelError> {
        self.add_configured(parent, ElementKind::Var, &[(constants::NAME, Some(name)), (constants::CLASS, class)], None)
    }

    /// Add a `var` declaration at `index` among the existing vars.
    pub fn insert_var_at(
        &mut self,
        parent: ElementId,
        name: &str,
        class: Option<&str>,
        index: usize,
    ) -> Result<ElementId, ModelError> {
        self.add_configured(
            parent,
            ElementKind::Var,
            &[(constants::NAME, Some(name)), (constants::CLASS, class)],
            Some(index),
        )
    }

    /// Add an `import` of a bean resource.
    pub fn add_import(&mut self, flow: ElementId, resource: &str) -> Result<ElementId, ModelError> {
        self.add_configured(flow, ElementKind::Import, &[(constants::RESOURCE, Some(resource))], None)
    }

    /// Add an `import` at `index` among the existing imports.
    pub fn insert_import_at(&mut self, flow: ElementId, resource: &str, index: usize) -> Result<ElementId, ModelError> {
        self.add_configured(flow, ElementKind::Import, &[(constants::RESOURCE, Some(resource))], Some(index))
    }

    /// Add an `exception-handler` referencing `bean`.
    pub fn add_exception_handler(&mut self, parent: ElementId, bean: &str) -> Result<ElementId, ModelError> {
        self.add_configured(parent, ElementKind::ExceptionHandler, &[(constants::BEAN, Some(bean))], None)
    }

    /// Add a `mapping` to an input or output mapper.
    pub fn add_mapping(&mut self, mapper: ElementId, source: &str, target: &str) -> Result<ElementId, ModelError> {
        self.add_configured(mapper, ElementKind::Mapping, &[("source", Some(source)), ("target", Some(target))], None)
    }

    /// Add an `inline-flow` with the given id. Returns the nested flow.
    pub fn add_inline_flow(&mut self, flow: ElementId, inline_id: &str) -> Result<ElementId, ModelError> {
        self.new_inline_flow(flow, inline_id, None)
    }

    /// Add an `inline-flow` at `index` among the existing inline flows.
    /// Returns the nested flow.
    pub fn insert_inline_flow_at(
        &mut self,
        flow: ElementId,
        inline_id: &str,
        index: usize,
    ) -> Result<ElementId, ModelError> {
        self.new_inline_flow(flow, inline_id, Some(index))
    }

    fn new_inline_flow(
        &mut self,
        flow: ElementId,
        inline_id: &str,
        position: Option<usize>,
    ) -> Result<ElementId, ModelError> {
        self.require_flow(flow)?;
        let inline = self.add_configured(flow, ElementKind::InlineFlow, &[(constants::ID, Some(inline_id))], position)?;
        self.children_of_kind(inline, ElementKind::Flow)
            .next()
            .ok_or(ModelError::UnknownElement(inline))
    }

    /// Create a child of `kind`, write its initial attributes and attach
    /// it. Listeners see the `AddChildren` event only; a child that cannot
    /// be attached is discarded again.
    fn add_configured(
        &mut self,
        parent: ElementId,
        kind: ElementKind,
        attributes: &[(&str, Option<&str>)],
        position: Option<usize>,
    ) -> Result<ElementId, ModelError> {
        self.require_attached(parent)?;
        self.transaction(|model| {
            let child = model.create_element(kind, parent)?;
            let node = model.element(child)?.node;
            for (name, value) in attributes {
                if value.is_some() {
                    model.document.set_attribute(node, name, *value)?;
                }
            }
            if let Err(error) = model.attach_child(parent, child, position) {
                model.discard_subtree(child)?;
                return Err(error);
            }
            Ok(child)
        })
    }
}
