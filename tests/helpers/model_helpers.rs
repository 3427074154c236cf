//! Model test helpers: event recording and graph assertions.

use std::sync::Arc;

use flowdef::model::{ElementId, FlowModel, ModelEvent, StructureTopic};
use parking_lot::Mutex;

/// Records every event a model fires.
#[derive(Clone, Default)]
pub struct EventLog(Arc<Mutex<Vec<ModelEvent>>>);

impl EventLog {
    /// Subscribe a new log to `model`.
    pub fn attach(model: &mut FlowModel) -> Self {
        let log = Self::default();
        let sink = log.0.clone();
        model.subscribe(move |event| sink.lock().push(event.clone()));
        log
    }

    pub fn events(&self) -> Vec<ModelEvent> {
        self.0.lock().clone()
    }

    pub fn clear(&self) {
        self.0.lock().clear();
    }

    /// Structure topics fired on `element`, in order.
    pub fn structure_on(&self, element: ElementId) -> Vec<StructureTopic> {
        self.0
            .lock()
            .iter()
            .filter(|e| e.element == element)
            .filter_map(ModelEvent::topic)
            .collect()
    }

    pub fn structure_count(&self) -> usize {
        self.0.lock().iter().filter(|e| e.is_structure()).count()
    }
}

/// Element tags under `element`'s node, in document order.
pub fn child_tags(model: &FlowModel, element: ElementId) -> Vec<String> {
    let doc = model.document();
    let Some(node) = model.node(element) else {
        return Vec::new();
    };
    doc.element_children(node)
        .filter_map(|c| doc.kind(c).map(str::to_string))
        .collect()
}

/// Every transition resolves to a state carrying its target id, and is
/// listed among that state's inbound transitions; transitions naming no
/// state have no target.
pub fn assert_reconnected(model: &FlowModel) {
    for flow in model.flows_within(model.root()) {
        for transition in model.flow_transitions(flow) {
            let candidates = match model.to_state_id(transition) {
                Some(to) => model.states_by_id(flow, to),
                None => Vec::new(),
            };
            match model.target(transition) {
                Some(target) => {
                    assert!(
                        candidates.contains(&target),
                        "transition {transition} resolved to a state without id {:?}",
                        model.to_state_id(transition)
                    );
                    assert!(
                        model.inbound(target).contains(&transition),
                        "transition {transition} missing from inbound list of {target}"
                    );
                }
                None => assert!(
                    candidates.is_empty(),
                    "transition {transition} to {:?} should resolve",
                    model.to_state_id(transition)
                ),
            }
        }
    }
}

/// Kind and attribute snapshot of a whole model, in visit order.
pub fn shape(model: &FlowModel) -> Vec<String> {
    model
        .descendants(model.root())
        .into_iter()
        .map(|element| {
            let attributes: Vec<_> = model
                .attributes(element)
                .into_iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect();
            format!(
                "{} [{}]",
                model.kind(element).map(|k| k.tag()).unwrap_or("?"),
                attributes.join(" ")
            )
        })
        .collect()
}
