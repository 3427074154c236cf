//! The node tree underneath a flow model.
//!
//! A [`Document`] is an arena of ordered, attribute-bearing nodes. It is the
//! serialized source of truth: the object model in [`crate::model`] never
//! caches attribute values and writes every change through to these nodes.
//!
//! ## Update transactions
//!
//! Every mutation records a [`TreeChange`]. Observers registered with
//! [`Document::subscribe`] receive the changes as one batch when the
//! outermost update bracket closes:
//!
//! ```
//! use flowdef::document::Document;
//!
//! let mut doc = Document::with_root("flow");
//! let root = doc.root().unwrap();
//! doc.update(|doc| {
//!     let state = doc.create_element("end-state");
//!     doc.set_attribute(state, "id", Some("finish")).unwrap();
//!     doc.append_child(root, state).unwrap();
//! });
//! assert_eq!(doc.element_children(root).count(), 1);
//! ```
//!
//! Mutations made outside an explicit bracket run in an implicit
//! single-operation bracket.

mod error;
mod node;
pub mod ordering;
mod options;
mod xml;

pub use error::DocumentError;
pub use node::{Node, NodeData, NodeId};
pub use options::XmlOptions;
pub use ordering::InsertionPoint;

use std::fmt;

use smol_str::SmolStr;

use crate::base::constants::{self, schema};
use crate::base::{LineIndex, TextRange};

/// A recorded tree mutation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TreeChange {
    Attribute {
        node: NodeId,
        name: SmolStr,
        old: Option<String>,
        new: Option<String>,
    },
    Inserted {
        parent: NodeId,
        child: NodeId,
        index: usize,
    },
    Removed {
        parent: NodeId,
        child: NodeId,
        index: usize,
    },
    Replaced {
        parent: Option<NodeId>,
        old: NodeId,
        new: NodeId,
    },
}

/// Observer callback receiving one batch per closed update bracket.
pub type Observer = Box<dyn FnMut(&[TreeChange]) + Send + Sync>;

/// Handle returned by [`Document::subscribe`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ObserverId(u32);

/// Generation of the flow schema a document is written against.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SchemaVersion {
    /// Start state given by a `start-state` marker element.
    V1,
    /// Start state given by the `start-state` attribute on `flow`.
    V2,
    Unknown,
}

/// The XML declaration, kept so the writer can reproduce it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct XmlDecl {
    pub version: SmolStr,
    pub encoding: Option<SmolStr>,
    pub standalone: Option<SmolStr>,
}

/// An ordered tree of nodes.
pub struct Document {
    nodes: Vec<Option<Node>>,
    /// Slots of discarded nodes, reused by later allocations.
    free: Vec<NodeId>,
    /// Top-level nodes in document order; the root element is one of them.
    top: Vec<NodeId>,
    root: Option<NodeId>,
    decl: Option<XmlDecl>,
    line_index: Option<LineIndex>,
    depth: usize,
    pending: Vec<TreeChange>,
    observers: Vec<(ObserverId, Observer)>,
    next_observer: u32,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("nodes", &self.len())
            .field("root", &self.root)
            .field("observers", &self.observers.len())
            .finish()
    }
}

impl Document {
    /// An empty document without a root.
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            free: Vec::new(),
            top: Vec::new(),
            root: None,
            decl: None,
            line_index: None,
            depth: 0,
            pending: Vec::new(),
            observers: Vec::new(),
            next_observer: 0,
        }
    }

    /// A document holding a single empty root element.
    pub fn with_root(tag: &str) -> Self {
        let mut doc = Self::new();
        let root = doc.alloc(NodeData::element(tag));
        doc.top.push(root);
        doc.root = Some(root);
        doc.decl = Some(XmlDecl {
            version: SmolStr::new_static("1.0"),
            encoding: Some(SmolStr::new_static("UTF-8")),
            standalone: None,
        });
        doc
    }

    // ── Queries ─────────────────────────────────────────────────────

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub fn declaration(&self) -> Option<&XmlDecl> {
        self.decl.as_ref()
    }

    pub fn node(&self, id: NodeId) -> Result<&Node, DocumentError> {
        self.get(id).ok_or(DocumentError::UnknownNode(id))
    }

    fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index()).and_then(Option::as_ref)
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut Node, DocumentError> {
        self.nodes
            .get_mut(id.index())
            .and_then(Option::as_mut)
            .ok_or(DocumentError::UnknownNode(id))
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.get(id).is_some()
    }

    /// Number of live nodes, attached or not.
    pub fn len(&self) -> usize {
        self.nodes.iter().flatten().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Children of `id` in order; empty for unknown nodes.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.get(id)
            .map(|n| n.children.as_slice())
            .unwrap_or(&[])
    }

    /// Element children of `id` in order.
    pub fn element_children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.children(id)
            .iter()
            .copied()
            .filter(|c| self.get(*c).is_some_and(Node::is_element))
    }

    /// Element children of `id` with the given tag.
    pub fn children_by_tag<'a>(
        &'a self,
        id: NodeId,
        tag: &'a str,
    ) -> impl Iterator<Item = NodeId> + 'a {
        self.element_children(id)
            .filter(move |c| self.kind(*c) == Some(tag))
    }

    /// Element tag of `id`; `None` for non-element or unknown nodes.
    pub fn kind(&self, id: NodeId) -> Option<&str> {
        self.get(id).and_then(Node::tag)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.parent)
    }

    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.get(id).and_then(|n| n.attribute(name))
    }

    pub fn attributes(&self, id: NodeId) -> impl Iterator<Item = (&str, &str)> {
        self.get(id).into_iter().flat_map(Node::attributes)
    }

    pub fn range(&self, id: NodeId) -> Option<TextRange> {
        self.get(id).and_then(|n| n.range)
    }

    /// Zero-based line of the node's start, for nodes read from source text.
    pub fn line_of(&self, id: NodeId) -> Option<u32> {
        let range = self.range(id)?;
        let index = self.line_index.as_ref()?;
        Some(index.line_col(range.start()).line)
    }

    pub fn line_index(&self) -> Option<&LineIndex> {
        self.line_index.as_ref()
    }

    /// True if `id` is reachable from the root.
    pub fn is_attached(&self, id: NodeId) -> bool {
        if !self.contains(id) {
            return false;
        }
        let mut current = id;
        while let Some(parent) = self.parent(current) {
            current = parent;
        }
        self.root == Some(current)
    }

    pub fn index_in_parent(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.children(parent).iter().position(|c| *c == id)
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let index = self.index_in_parent(id)?;
        self.children(parent).get(index + 1).copied()
    }

    /// Detect the schema generation from `xsi:schemaLocation`, falling back
    /// to how the start state is written.
    pub fn schema_version(&self) -> SchemaVersion {
        let Some(root) = self.root else {
            return SchemaVersion::Unknown;
        };
        if let Some(location) = self.attribute(root, schema::SCHEMA_LOCATION_ATTRIBUTE) {
            if location.contains(schema::V2_LOCATION) {
                return SchemaVersion::V2;
            }
            if location.contains(schema::V1_LOCATION) {
                return SchemaVersion::V1;
            }
        }
        if self.attribute(root, constants::START_STATE_ATTRIBUTE).is_some() {
            return SchemaVersion::V2;
        }
        if self
            .children_by_tag(root, constants::START_STATE_TAG)
            .next()
            .is_some()
        {
            return SchemaVersion::V1;
        }
        SchemaVersion::Unknown
    }

    // ── Update transactions ─────────────────────────────────────────

    /// Open an update bracket. Brackets nest; observers are notified when
    /// the outermost one closes.
    pub fn begin_update(&mut self) {
        self.depth += 1;
    }

    /// Close an update bracket. Unbalanced calls are ignored.
    pub fn end_update(&mut self) {
        if self.depth == 0 {
            return;
        }
        self.depth -= 1;
        if self.depth == 0 {
            self.flush();
        }
    }

    pub fn is_updating(&self) -> bool {
        self.depth > 0
    }

    /// Run `f` inside one update bracket.
    pub fn update<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        self.begin_update();
        let result = f(self);
        self.end_update();
        result
    }

    pub fn subscribe(&mut self, observer: impl FnMut(&[TreeChange]) + Send + Sync + 'static) -> ObserverId {
        let id = ObserverId(self.next_observer);
        self.next_observer += 1;
        self.observers.push((id, Box::new(observer)));
        id
    }

    pub fn unsubscribe(&mut self, id: ObserverId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(oid, _)| *oid != id);
        self.observers.len() != before
    }

    fn record(&mut self, change: TreeChange) {
        self.pending.push(change);
    }

    fn flush(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        let batch = std::mem::take(&mut self.pending);
        for (_, observer) in &mut self.observers {
            observer(&batch);
        }
    }

    // ── Creation ────────────────────────────────────────────────────

    fn alloc(&mut self, data: NodeData) -> NodeId {
        if let Some(id) = self.free.pop() {
            if let Some(slot) = self.nodes.get_mut(id.index()) {
                *slot = Some(Node::new(data));
                return id;
            }
        }
        let id = NodeId::new(self.nodes.len());
        self.nodes.push(Some(Node::new(data)));
        id
    }

    /// A fresh detached element.
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.alloc(NodeData::element(tag))
    }

    /// A fresh detached text node.
    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.alloc(NodeData::Text(text.to_string()))
    }

    pub fn create_comment(&mut self, text: &str) -> NodeId {
        self.alloc(NodeData::Comment(text.to_string()))
    }

    /// Copy `id` and its whole subtree into fresh detached nodes.
    pub fn clone_deep(&mut self, id: NodeId) -> Result<NodeId, DocumentError> {
        let source = self.node(id)?;
        let data = source.data.clone();
        let range = source.range;
        let children = source.children.clone();
        let copy = self.alloc(data);
        self.node_mut(copy)?.range = range;
        for child in children {
            let child_copy = self.clone_deep(child)?;
            self.node_mut(child_copy)?.parent = Some(copy);
            self.node_mut(copy)?.children.push(child_copy);
        }
        Ok(copy)
    }

    /// Free a detached node and its whole subtree. Returns the number of
    /// nodes freed.
    ///
    /// Freed handles are unknown to the document afterwards, until a later
    /// allocation hands the slot out again.
    pub fn discard(&mut self, id: NodeId) -> Result<usize, DocumentError> {
        if self.node(id)?.parent.is_some() || self.top.contains(&id) {
            return Err(DocumentError::AlreadyAttached(id));
        }
        let mut stack = vec![id];
        let mut freed = 0;
        while let Some(current) = stack.pop() {
            if let Some(node) = self.nodes.get_mut(current.index()).and_then(Option::take) {
                stack.extend(node.children);
                self.free.push(current);
                freed += 1;
            }
        }
        Ok(freed)
    }

    // ── Mutation ────────────────────────────────────────────────────

    /// Set or remove an attribute. `None` and the empty string remove it.
    ///
    /// Returns the previous value. Detached nodes may be written; fresh
    /// nodes stay detached until inserted.
    pub fn set_attribute(
        &mut self,
        id: NodeId,
        name: &str,
        value: Option<&str>,
    ) -> Result<Option<String>, DocumentError> {
        let node = self.node_mut(id)?;
        let NodeData::Element { attributes, .. } = &mut node.data else {
            return Err(DocumentError::NotAnElement(id));
        };
        let new = value.filter(|v| !v.is_empty()).map(str::to_string);
        let old = match &new {
            Some(v) => attributes.insert(SmolStr::new(name), v.clone()),
            None => attributes.shift_remove(name),
        };
        self.begin_update();
        self.record(TreeChange::Attribute {
            node: id,
            name: SmolStr::new(name),
            old: old.clone(),
            new,
        });
        self.end_update();
        Ok(old)
    }

    /// Insert the detached node `new` under `parent`, before `reference` or
    /// at the end.
    pub fn insert_before(
        &mut self,
        parent: NodeId,
        new: NodeId,
        reference: Option<NodeId>,
    ) -> Result<usize, DocumentError> {
        if !self.node(parent)?.is_element() {
            return Err(DocumentError::NotAnElement(parent));
        }
        if self.node(new)?.parent.is_some() || self.top.contains(&new) {
            return Err(DocumentError::AlreadyAttached(new));
        }
        if self.is_ancestor_or_self(new, parent) {
            return Err(DocumentError::AlreadyAttached(new));
        }
        let index = match reference {
            Some(r) => self
                .children(parent)
                .iter()
                .position(|c| *c == r)
                .ok_or(DocumentError::NotAChild { parent, child: r })?,
            None => self.children(parent).len(),
        };
        self.node_mut(parent)?.children.insert(index, new);
        self.node_mut(new)?.parent = Some(parent);
        self.begin_update();
        self.record(TreeChange::Inserted {
            parent,
            child: new,
            index,
        });
        self.end_update();
        Ok(index)
    }

    pub fn append_child(&mut self, parent: NodeId, new: NodeId) -> Result<usize, DocumentError> {
        self.insert_before(parent, new, None)
    }

    /// Detach `child` from `parent`, returning its former index.
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> Result<usize, DocumentError> {
        self.node(parent)?;
        self.node(child)?;
        let index = self
            .children(parent)
            .iter()
            .position(|c| *c == child)
            .ok_or(DocumentError::NotAChild { parent, child })?;
        self.node_mut(parent)?.children.remove(index);
        self.node_mut(child)?.parent = None;
        self.begin_update();
        self.record(TreeChange::Removed {
            parent,
            child,
            index,
        });
        self.end_update();
        Ok(index)
    }

    /// Put the detached node `new` where `old` is; `old` becomes detached.
    pub fn replace_child(
        &mut self,
        parent: NodeId,
        new: NodeId,
        old: NodeId,
    ) -> Result<usize, DocumentError> {
        self.node(parent)?;
        if self.node(new)?.parent.is_some() || self.top.contains(&new) {
            return Err(DocumentError::AlreadyAttached(new));
        }
        let index = self
            .children(parent)
            .iter()
            .position(|c| *c == old)
            .ok_or(DocumentError::NotAChild { parent, child: old })?;
        if let Some(slot) = self.node_mut(parent)?.children.get_mut(index) {
            *slot = new;
        }
        self.node_mut(new)?.parent = Some(parent);
        self.node_mut(old)?.parent = None;
        self.begin_update();
        self.record(TreeChange::Replaced {
            parent: Some(parent),
            old,
            new,
        });
        self.end_update();
        Ok(index)
    }

    /// Make the detached element `new` the root element.
    pub fn replace_root(&mut self, new: NodeId) -> Result<(), DocumentError> {
        let node = self.node(new)?;
        if !node.is_element() {
            return Err(DocumentError::NotAnElement(new));
        }
        if node.parent.is_some() || self.top.contains(&new) {
            return Err(DocumentError::AlreadyAttached(new));
        }
        let old = self.root.ok_or(DocumentError::MissingRoot)?;
        if let Some(slot) = self.top.iter_mut().find(|n| **n == old) {
            *slot = new;
        }
        self.root = Some(new);
        self.begin_update();
        self.record(TreeChange::Replaced {
            parent: None,
            old,
            new,
        });
        self.end_update();
        Ok(())
    }

    fn is_ancestor_or_self(&self, ancestor: NodeId, id: NodeId) -> bool {
        let mut current = Some(id);
        while let Some(c) = current {
            if c == ancestor {
                return true;
            }
            current = self.parent(c);
        }
        false
    }

    // ── Reader/writer support ───────────────────────────────────────

    pub(crate) fn push_top(&mut self, data: NodeData, range: Option<TextRange>) -> NodeId {
        let id = self.alloc(data);
        let is_element = match self.nodes.get_mut(id.index()).and_then(Option::as_mut) {
            Some(node) => {
                node.range = range;
                node.is_element()
            }
            None => false,
        };
        if self.root.is_none() && is_element {
            self.root = Some(id);
        }
        self.top.push(id);
        id
    }

    pub(crate) fn push_child(
        &mut self,
        parent: NodeId,
        data: NodeData,
        range: Option<TextRange>,
    ) -> NodeId {
        let id = self.alloc(data);
        if let Some(node) = self.nodes.get_mut(id.index()).and_then(Option::as_mut) {
            node.range = range;
            node.parent = Some(parent);
        }
        if let Some(node) = self.nodes.get_mut(parent.index()).and_then(Option::as_mut) {
            node.children.push(id);
        }
        id
    }

    pub(crate) fn set_range_end(&mut self, id: NodeId, end: crate::base::TextSize) {
        if let Some(node) = self.nodes.get_mut(id.index()).and_then(Option::as_mut) {
            node.range = node.range.map(|r| TextRange::new(r.start(), end.max(r.start())));
        }
    }

    pub(crate) fn top_level(&self) -> &[NodeId] {
        &self.top
    }

    pub(crate) fn set_declaration(&mut self, decl: Option<XmlDecl>) {
        self.decl = decl;
    }

    pub(crate) fn set_line_index(&mut self, index: LineIndex) {
        self.line_index = Some(index);
    }
}
