//! Change notifications.
//!
//! Every attribute write fires a [`Change::Property`] event, even when the
//! value did not change. Structural mutations fire one
//! [`Change::Structure`] event per affected child. Events raised while an
//! operation runs are queued and delivered, in mutation order, once the
//! tree and the derived links are consistent again.

use smol_str::SmolStr;

use super::{ElementId, FlowModel, ModelError};

/// What kind of structural change happened.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StructureTopic {
    AddChildren,
    RemoveChildren,
    MoveChildren,
    /// A transition now arrives at the element.
    Inputs,
    /// A transition leaving the element now resolves.
    Outputs,
}

/// Payload of a [`ModelEvent`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Change {
    Property {
        name: SmolStr,
        old: Option<String>,
        new: Option<String>,
    },
    Structure {
        topic: StructureTopic,
        /// The affected child. Removed children are no longer in the model.
        child: ElementId,
        /// Position among the element's children, where meaningful.
        index: Option<usize>,
    },
}

/// A change on `element`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModelEvent {
    pub element: ElementId,
    pub change: Change,
}

impl ModelEvent {
    pub fn property(
        element: ElementId,
        name: &str,
        old: Option<String>,
        new: Option<String>,
    ) -> Self {
        Self {
            element,
            change: Change::Property {
                name: SmolStr::new(name),
                old,
                new,
            },
        }
    }

    pub fn structure(
        element: ElementId,
        topic: StructureTopic,
        child: ElementId,
        index: Option<usize>,
    ) -> Self {
        Self {
            element,
            change: Change::Structure {
                topic,
                child,
                index,
            },
        }
    }

    /// The structure topic, for structure events.
    pub fn topic(&self) -> Option<StructureTopic> {
        match self.change {
            Change::Structure { topic, .. } => Some(topic),
            Change::Property { .. } => None,
        }
    }

    pub fn is_structure(&self) -> bool {
        matches!(self.change, Change::Structure { .. })
    }
}

/// Listener callback.
pub type Listener = Box<dyn FnMut(&ModelEvent) + Send + Sync>;

/// Handle returned by [`FlowModel::subscribe`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(u32);

impl FlowModel {
    /// Register a listener for property and structure changes.
    pub fn subscribe(&mut self, listener: impl FnMut(&ModelEvent) + Send + Sync + 'static) -> ListenerId {
        let id = ListenerId(self.next_listener);
        self.next_listener += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Remove a listener. Returns false if it was not registered.
    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(lid, _)| *lid != id);
        self.listeners.len() != before
    }

    pub(crate) fn emit(&mut self, event: ModelEvent) {
        self.queued.push(event);
        if self.batch_depth == 0 {
            self.deliver();
        }
    }

    fn deliver(&mut self) {
        let events = std::mem::take(&mut self.queued);
        for event in &events {
            for (_, listener) in &mut self.listeners {
                listener(event);
            }
        }
    }

    /// Run a mutation as one unit: document changes share one update
    /// bracket and events are delivered after `f` returns.
    ///
    /// When `f` fails, the events it queued are dropped, so a failed
    /// operation notifies nobody.
    pub(crate) fn transaction<R>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<R, ModelError>,
    ) -> Result<R, ModelError> {
        let mark = self.queued.len();
        self.batch_depth += 1;
        self.document.begin_update();
        let result = f(self);
        if result.is_err() {
            self.queued.truncate(mark);
        }
        self.document.end_update();
        self.batch_depth -= 1;
        if self.batch_depth == 0 {
            self.deliver();
        }
        result
    }
}
