//! Transition reference resolution.
//!
//! Transitions name their target by state id. Each flow keeps a link table
//! with the resolved target of every outbound transition and the derived
//! inbound list of every state. The table is only ever written by
//! [`FlowModel::reconnect`]; every structural mutation that can change an
//! answer calls it.
//!
//! Resolution is an exact string match against the states of the
//! transition's own flow, first match in document order. A cached target
//! is kept for as long as its id still equals the transition's `to`, so a
//! rename that collides with an existing id does not steal transitions from
//! the renamed state. Id uniqueness is left to validation.

use rustc_hash::FxHashMap;
use tracing::{debug, trace};

use super::{ElementId, FlowModel, ModelError, ModelEvent, StructureTopic};
use crate::base::ElementKind;

/// Resolved links of one flow.
#[derive(Clone, Debug, Default)]
pub(crate) struct LinkTable {
    /// Every outbound transition of the flow and its resolved target.
    targets: FxHashMap<ElementId, Option<ElementId>>,
    /// Inbound transitions per state, in transition order.
    inbound: FxHashMap<ElementId, Vec<ElementId>>,
}

impl FlowModel {
    // ── Queries ──────────────────────────────────────────────────────

    /// All transitions leaving states of `flow`, in document order: state
    /// transitions and `if` branches state by state, then the flow's
    /// global transitions.
    pub fn flow_transitions(&self, flow: ElementId) -> Vec<ElementId> {
        let mut transitions = Vec::new();
        for state in self.states(flow) {
            transitions.extend(self.outbound(state));
        }
        transitions.extend(self.outbound(flow));
        transitions
    }

    /// Transitions authored on `source`: a state's transitions or `if`
    /// branches, or a flow's global transitions.
    pub fn outbound(&self, source: ElementId) -> Vec<ElementId> {
        let Some(kind) = self.kind(source) else {
            return Vec::new();
        };
        match kind {
            ElementKind::DecisionState => self
                .children_of_kind(source, ElementKind::If)
                .flat_map(|branch| self.children(branch).iter().copied())
                .collect(),
            ElementKind::Flow => self
                .children_of_kind(source, ElementKind::GlobalTransitions)
                .flat_map(|global| self.children_of_kind(global, ElementKind::Transition))
                .collect(),
            k if k.is_transitionable_from() => self
                .children_of_kind(source, ElementKind::Transition)
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Transitions currently resolved to `state`.
    pub fn inbound(&self, state: ElementId) -> &[ElementId] {
        self.flow_of(state)
            .and_then(|flow| self.links.get(&flow))
            .and_then(|table| table.inbound.get(&state))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// The resolved target of a transition, as of the last reconnection.
    pub fn target(&self, transition: ElementId) -> Option<ElementId> {
        let flow = self.flow_of(transition)?;
        self.links.get(&flow)?.targets.get(&transition).copied().flatten()
    }

    /// Resolve a transition's target from the current tree, ignoring the
    /// cache: first state of the same flow whose id equals `to`.
    pub fn resolve_target(&self, transition: ElementId) -> Option<ElementId> {
        let flow = self.flow_of(transition)?;
        let to = self.to_state_id(transition)?;
        self.state_by_id(flow, to)
    }

    /// Inbound transitions per state derived from the current tree.
    pub fn inbound_index(&self, flow: ElementId) -> FxHashMap<ElementId, Vec<ElementId>> {
        let mut index: FxHashMap<ElementId, Vec<ElementId>> = FxHashMap::default();
        for transition in self.flow_transitions(flow) {
            if let Some(target) = self.resolve_target(transition) {
                index.entry(target).or_default().push(transition);
            }
        }
        index
    }

    // ── Reconnection ─────────────────────────────────────────────────

    /// Re-derive the link table of `flow`.
    ///
    /// Returns the transitions that were dangling before and resolve now.
    pub fn reconnect(&mut self, flow: ElementId) -> Result<Vec<ElementId>, ModelError> {
        let kind = self.element(flow)?.kind;
        if kind != ElementKind::Flow {
            return Err(ModelError::wrong_kind("flow", kind));
        }
        Ok(self.relink(flow))
    }

    pub(crate) fn relink(&mut self, flow: ElementId) -> Vec<ElementId> {
        let previous = self.links.remove(&flow).unwrap_or_default();
        let states = self.states(flow);

        let mut table = LinkTable::default();
        let mut wired = Vec::new();
        for transition in self.flow_transitions(flow) {
            let to = self.to_state_id(transition);
            let cached = previous.targets.get(&transition).copied().flatten();
            let target = match (cached, to) {
                (Some(state), Some(to))
                    if states.contains(&state) && self.id_of(state) == Some(to) =>
                {
                    Some(state)
                }
                (_, Some(to)) => states
                    .iter()
                    .copied()
                    .find(|s| self.id_of(*s) == Some(to)),
                (_, None) => None,
            };
            trace!(transition = %transition, to = ?to, target = ?target, "resolved transition");

            if let Some(state) = target {
                table.inbound.entry(state).or_default().push(transition);
                if matches!(previous.targets.get(&transition), Some(None)) {
                    wired.push(transition);
                }
            }
            table.targets.insert(transition, target);
        }

        debug!(
            flow = %flow,
            transitions = table.targets.len(),
            resolved = table.targets.values().filter(|t| t.is_some()).count(),
            newly_wired = wired.len(),
            "reconnected flow"
        );
        self.links.insert(flow, table);
        wired
    }

    /// Reconnect `flow` and announce transitions that became resolved: an
    /// `Outputs` event on each transition's source and an `Inputs` event on
    /// its new target.
    pub(crate) fn relink_and_notify(&mut self, flow: ElementId) {
        for transition in self.relink(flow) {
            if let Some(source) = self.transition_source(transition) {
                self.emit(ModelEvent::structure(
                    source,
                    StructureTopic::Outputs,
                    transition,
                    None,
                ));
            }
            if let Some(target) = self.target(transition) {
                let index = self.inbound(target).iter().position(|t| *t == transition);
                self.emit(ModelEvent::structure(
                    target,
                    StructureTopic::Inputs,
                    transition,
                    index,
                ));
            }
        }
    }

    /// Reconnect every flow inside `id` and the flow enclosing it.
    pub(crate) fn relink_around(&mut self, id: ElementId) {
        let mut flows = self.flows_within(id);
        if let Some(enclosing) = self.parent(id).and_then(|p| self.flow_of(p)) {
            flows.insert(0, enclosing);
        }
        for flow in flows {
            if self.is_attached(flow) {
                self.relink_and_notify(flow);
            }
        }
    }
}
