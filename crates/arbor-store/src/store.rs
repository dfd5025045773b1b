//! The node store.
//!
//! A [`NodeStore`] owns the base node table, the document root, the id
//! generator, the transactional overlay and the event channel. Every write
//! goes through the same three steps: resolve through the overlay, write
//! the new version (to the overlay while a transaction is active, to the base
//! otherwise), and emit one or more [`AtomicOperation`]s.

use crate::alias::take_alias;
use crate::config::StoreConfig;
use crate::error::{Result, StoreError};
use crate::events::{EventChannel, Listener};
use crate::overlay::{NodeTable, Overlay};
use arbor_core::interval::clamp_marks;
use arbor_core::{AtomicOperation, IdGenerator, NewNode, Node, NodeId, NodeUpdate, SchemaValidator};
use std::collections::HashSet;
use std::sync::Arc;

/// Transactional tree store.
pub struct NodeStore {
    config: StoreConfig,
    ids: IdGenerator,
    nodes: NodeTable,
    root_id: Option<NodeId>,
    overlay: Overlay,
    events: EventChannel,
    validator: Option<Arc<dyn SchemaValidator>>,
}

impl NodeStore {
    /// Create an empty store with a random session id.
    pub fn new() -> Self {
        Self::with_config(StoreConfig::default())
    }

    pub fn with_config(config: StoreConfig) -> Self {
        let ids = match &config.session_id {
            Some(session) => IdGenerator::new(session.clone()),
            None => IdGenerator::random_session(),
        };
        Self {
            config,
            ids,
            nodes: NodeTable::new(),
            root_id: None,
            overlay: Overlay::new(),
            events: EventChannel::new(),
            validator: None,
        }
    }

    pub fn with_validator(mut self, validator: Arc<dyn SchemaValidator>) -> Self {
        self.validator = Some(validator);
        self
    }

    pub fn set_validator(&mut self, validator: Option<Arc<dyn SchemaValidator>>) {
        self.validator = validator;
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn session_id(&self) -> &str {
        self.ids.session_id()
    }

    /// Issue a fresh `session:counter` id.
    pub fn generate_id(&self) -> NodeId {
        self.ids.next_id()
    }

    // === Reads ===

    /// The document root, including a root set inside the open transaction.
    pub fn root_id(&self) -> Option<NodeId> {
        if self.overlay.is_active() {
            if let Some(root) = self.overlay.pending_root() {
                return Some(root.clone());
            }
        }
        self.root_id.clone()
    }

    pub fn set_root_id(&mut self, id: &str) -> Result<()> {
        let id = self.require(id)?.sid.clone();
        self.set_root_internal(id);
        Ok(())
    }

    /// Map an alias to its node id. Anything that is not a bound alias is
    /// returned as is.
    pub fn resolve_alias(&self, id: &str) -> NodeId {
        self.overlay
            .aliases()
            .get(id)
            .cloned()
            .unwrap_or_else(|| NodeId::from(id))
    }

    /// Bind `alias` to `id` for the rest of the open transaction. Outside a
    /// transaction there is no alias scope and nothing is bound.
    pub fn set_alias(&mut self, alias: impl Into<String>, id: &str) -> Result<()> {
        let id = self.require(id)?.sid.clone();
        self.bind_alias(alias.into(), id)
    }

    fn bind_alias(&mut self, alias: String, id: NodeId) -> Result<()> {
        if !self.overlay.is_active() {
            tracing::debug!(%alias, node = %id, "alias ignored outside a transaction");
            return Ok(());
        }
        self.overlay.aliases_mut().bind(alias, id)
    }

    /// Borrow a node by id or alias.
    pub fn node(&self, id: &str) -> Option<&Node> {
        let id = self.resolve_alias(id);
        self.lookup(id.as_str())
    }

    pub fn get_node(&self, id: &str) -> Option<Node> {
        self.node(id).cloned()
    }

    pub fn has_node(&self, id: &str) -> bool {
        self.node(id).is_some()
    }

    pub fn node_ids(&self) -> Vec<NodeId> {
        if self.overlay.is_active() {
            self.overlay.visible_ids(&self.nodes).cloned().collect()
        } else {
            self.nodes.keys().cloned().collect()
        }
    }

    pub fn node_count(&self) -> usize {
        if self.overlay.is_active() {
            self.overlay.visible_ids(&self.nodes).count()
        } else {
            self.nodes.len()
        }
    }

    pub fn get_children(&self, id: &str) -> Vec<Node> {
        self.node(id)
            .map(|node| {
                node.content
                    .iter()
                    .filter_map(|child| self.lookup(child.as_str()).cloned())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn get_parent(&self, id: &str) -> Option<Node> {
        let parent = self.node(id)?.parent_id.as_ref()?;
        self.lookup(parent.as_str()).cloned()
    }

    /// Position of a node among its parent's children.
    pub fn index_in_parent(&self, id: &str) -> Option<usize> {
        let node = self.node(id)?;
        let parent = self.lookup(node.parent_id.as_ref()?.as_str())?;
        parent.child_index(node.sid.as_str())
    }

    /// Nested JSON rendering of the subtree rooted at `id`.
    pub fn to_tree_json(&self, id: &str) -> Option<serde_json::Value> {
        let node = self.node(id)?;
        let mut value = serde_json::to_value(node).ok()?;
        let children: Vec<serde_json::Value> = node
            .content
            .iter()
            .filter_map(|child| self.to_tree_json(child.as_str()))
            .collect();
        if let Some(object) = value.as_object_mut() {
            object.remove("content");
            if !children.is_empty() {
                object.insert("content".into(), serde_json::Value::Array(children));
            }
        }
        Some(value)
    }

    // === Writes ===

    /// Insert a node. A missing `sid` is generated. A `$alias` attribute
    /// binds an alias to the new id and is not stored.
    ///
    /// The first parentless node created in an empty store becomes the root.
    pub fn create_node(&mut self, node: Node) -> Result<NodeId> {
        self.insert_new(node, self.config.validate_on_write)
    }

    /// [`create_node`](Self::create_node), always consulting the validator.
    pub fn create_node_validated(&mut self, node: Node) -> Result<NodeId> {
        self.insert_new(node, true)
    }

    /// Create a node together with its embedded descendants, optionally
    /// attached under `parent` at `position`.
    ///
    /// Every node is checked before anything is written; a failed check
    /// leaves the store untouched.
    pub fn create_node_with_children(
        &mut self,
        tree: NewNode,
        parent: Option<&str>,
        position: Option<usize>,
    ) -> Result<NodeId> {
        let parent_id = match parent {
            Some(parent) => Some(self.require(parent)?.sid.clone()),
            None => None,
        };

        let mut flat = Vec::with_capacity(tree.size());
        let top = self.flatten(tree, parent_id.clone(), &mut flat);

        let mut seen_ids = HashSet::new();
        let mut seen_aliases = HashSet::new();
        for (node, alias) in &flat {
            if !seen_ids.insert(node.sid.clone()) {
                return Err(StoreError::invariant(format!("duplicate id {} in tree", node.sid)));
            }
            self.check_new(node, self.config.validate_on_write)?;
            if let Some(alias) = alias.as_ref().filter(|_| self.overlay.is_active()) {
                if !seen_aliases.insert(alias.clone()) || self.overlay.aliases().get(alias).is_some() {
                    return Err(StoreError::invariant(format!("alias '{}' is already bound", alias)));
                }
            }
        }

        for (node, alias) in flat {
            self.write_new(node, alias)?;
        }
        if let Some(parent_id) = parent_id {
            self.attach(&top, &parent_id, position)?;
        }
        Ok(top)
    }

    /// Apply a patch. `stype` may be repeated but never changed. Returns the
    /// updated node; a patch that changes nothing emits nothing.
    pub fn update_node(&mut self, id: &str, patch: NodeUpdate) -> Result<Node> {
        self.apply_update(id, patch, self.config.validate_on_write)
    }

    /// [`update_node`](Self::update_node), always consulting the validator.
    pub fn update_node_validated(&mut self, id: &str, patch: NodeUpdate) -> Result<Node> {
        self.apply_update(id, patch, true)
    }

    /// Delete a node and its whole subtree, deepest first.
    pub fn delete_node(&mut self, id: &str) -> Result<()> {
        let node = self.require(id)?.clone();
        if self.root_id().as_ref() == Some(&node.sid) {
            return Err(StoreError::invariant("cannot delete the document root"));
        }

        let mut doomed = Vec::new();
        self.collect_postorder(&node.sid, &mut doomed);

        if let Some(parent_id) = &node.parent_id {
            if let Some(mut parent) = self.lookup(parent_id.as_str()).cloned() {
                parent.content.retain(|c| *c != node.sid);
                self.put(parent);
            }
        }
        for (doomed_id, parent) in doomed {
            self.remove(&doomed_id, parent.clone());
            self.emit(AtomicOperation::delete(&doomed_id, parent.as_ref()));
        }
        tracing::debug!(node = %node.sid, "deleted subtree");
        Ok(())
    }

    /// Reparent `id` under `new_parent` at `position` (append when `None`).
    pub fn move_node(&mut self, id: &str, new_parent: &str, position: Option<usize>) -> Result<()> {
        let node_id = self.require(id)?.sid.clone();
        let parent_id = self.require(new_parent)?.sid.clone();
        if self.root_id().as_ref() == Some(&node_id) {
            return Err(StoreError::invariant("cannot move the document root"));
        }
        if self.is_ancestor_or_self(&node_id, &parent_id) {
            return Err(StoreError::invariant(format!(
                "cannot move {} under itself or a descendant",
                node_id
            )));
        }
        self.attach(&node_id, &parent_id, position)
    }

    /// Create `child` and attach it under `parent`. Emits a create followed
    /// by a move.
    pub fn add_child(&mut self, parent: &str, mut child: Node, position: Option<usize>) -> Result<NodeId> {
        let parent_id = self.require(parent)?.sid.clone();
        child.parent_id = Some(parent_id.clone());
        let id = self.insert_new(child, self.config.validate_on_write)?;
        self.attach(&id, &parent_id, position)?;
        Ok(id)
    }

    // === Transactions ===

    /// Start buffering writes in the overlay. Nested calls join the open
    /// transaction.
    pub fn begin_transaction(&mut self) {
        if self.overlay.is_active() {
            return;
        }
        self.overlay.begin();
        tracing::debug!(session = self.ids.session_id(), "transaction started");
    }

    pub fn in_transaction(&self) -> bool {
        self.overlay.is_active()
    }

    /// Snapshot of the operations buffered so far. The transaction stays open.
    pub fn end_transaction(&self) -> Vec<AtomicOperation> {
        self.overlay.operations().to_vec()
    }

    /// Replay the buffered operations into the base and close the
    /// transaction. On error the base is unchanged and the overlay is
    /// discarded. Without an open transaction this is a no-op.
    pub fn commit_transaction(&mut self) -> Result<Vec<AtomicOperation>> {
        if !self.overlay.is_active() {
            return Ok(Vec::new());
        }
        let staged = self.overlay.replay(&self.nodes);
        let operations = self.overlay.operations().to_vec();
        let pending_root = self.overlay.pending_root().cloned();
        self.overlay.reset();

        match staged {
            Ok(nodes) => {
                self.nodes = nodes;
                if let Some(root) = pending_root {
                    self.root_id = Some(root);
                }
                tracing::debug!(operations = operations.len(), "transaction committed");
                Ok(operations)
            }
            Err(err) => {
                tracing::warn!(error = %err, "transaction commit failed, base unchanged");
                Err(err)
            }
        }
    }

    /// Discard the overlay, its buffered operations and its aliases.
    pub fn rollback_transaction(&mut self) {
        if self.overlay.is_active() {
            tracing::debug!(
                operations = self.overlay.operations().len(),
                "transaction rolled back"
            );
        }
        self.overlay.reset();
    }

    // === Events and validation ===

    pub fn subscribe(&mut self, listener: Listener) {
        self.events.subscribe(listener);
    }

    pub fn unsubscribe(&mut self, listener: &Listener) -> bool {
        self.events.unsubscribe(listener)
    }

    /// Run the configured validator. Passes when none is set.
    pub fn validate_node(&self, node: &Node) -> Result<()> {
        let Some(validator) = &self.validator else {
            return Ok(());
        };
        let result = validator.validate(node);
        if result.valid {
            Ok(())
        } else {
            Err(StoreError::Validation {
                errors: result.errors,
            })
        }
    }

    // === Internals shared with the range, split and traversal modules ===

    /// Overlay-aware lookup without alias resolution.
    pub(crate) fn lookup(&self, id: &str) -> Option<&Node> {
        self.overlay.resolve(id, &self.nodes)
    }

    pub(crate) fn require(&self, id: &str) -> Result<&Node> {
        self.node(id).ok_or_else(|| StoreError::not_found(id))
    }

    /// Ids of the subtree rooted at `id`, in document order.
    pub(crate) fn subtree_preorder(&self, id: &NodeId, out: &mut Vec<NodeId>) {
        let Some(node) = self.lookup(id.as_str()) else {
            return;
        };
        out.push(id.clone());
        for child in &node.content {
            self.subtree_preorder(child, out);
        }
    }

    fn collect_postorder(&self, id: &NodeId, out: &mut Vec<(NodeId, Option<NodeId>)>) {
        let Some(node) = self.lookup(id.as_str()) else {
            return;
        };
        for child in &node.content {
            self.collect_postorder(child, out);
        }
        out.push((id.clone(), node.parent_id.clone()));
    }

    fn is_ancestor_or_self(&self, ancestor: &NodeId, node: &NodeId) -> bool {
        let mut visited = HashSet::new();
        let mut current = Some(node.clone());
        while let Some(id) = current {
            if id == *ancestor {
                return true;
            }
            if !visited.insert(id.clone()) {
                return false;
            }
            current = self.lookup(id.as_str()).and_then(|n| n.parent_id.clone());
        }
        false
    }

    fn put(&mut self, node: Node) {
        if self.overlay.is_active() {
            self.overlay.upsert_node(node);
        } else {
            self.nodes.insert(node.sid.clone(), node);
        }
    }

    fn remove(&mut self, id: &NodeId, parent: Option<NodeId>) {
        if self.overlay.is_active() {
            self.overlay.mark_deleted(id, parent);
        } else {
            self.nodes.remove(id);
        }
    }

    fn emit(&mut self, op: AtomicOperation) {
        tracing::trace!(op = %op.op_type, node = %op.node_id, "emit");
        self.events.emit(&op);
        if self.overlay.is_active() {
            self.overlay.record(op);
        }
    }

    fn set_root_internal(&mut self, id: NodeId) {
        if self.overlay.is_active() {
            self.overlay.set_pending_root(id);
        } else {
            self.root_id = Some(id);
        }
    }

    fn insert_new(&mut self, mut node: Node, validate: bool) -> Result<NodeId> {
        let alias = take_alias(&mut node.attributes);
        if node.sid.is_empty() {
            node.sid = self.ids.next_id();
        }
        self.check_new(&node, validate)?;
        self.write_new(node, alias)
    }

    fn check_new(&self, node: &Node, validate: bool) -> Result<()> {
        if self.lookup(node.sid.as_str()).is_some()
            || self.nodes.contains_key(&node.sid)
            || self.overlay.is_deleted(node.sid.as_str())
        {
            return Err(StoreError::invariant(format!("node {} already exists", node.sid)));
        }
        if validate {
            self.validate_node(node)?;
        }
        Ok(())
    }

    fn write_new(&mut self, mut node: Node, alias: Option<String>) -> Result<NodeId> {
        if let Some(alias) = alias {
            self.bind_alias(alias, node.sid.clone())?;
        }
        node.marks = clamp_marks(&node.marks, node.text_len());
        let id = node.sid.clone();
        if node.parent_id.is_none() && self.root_id().is_none() {
            self.set_root_internal(id.clone());
        }
        self.put(node.clone());
        self.emit(AtomicOperation::create(&node));
        Ok(id)
    }

    /// Assign ids depth-first and flatten `tree` into pre-order.
    fn flatten(
        &self,
        tree: NewNode,
        parent: Option<NodeId>,
        out: &mut Vec<(Node, Option<String>)>,
    ) -> NodeId {
        let NewNode {
            sid,
            stype,
            mut attributes,
            text,
            marks,
            children,
        } = tree;
        let alias = take_alias(&mut attributes);
        let id = sid
            .filter(|sid| !sid.is_empty())
            .unwrap_or_else(|| self.ids.next_id());

        let slot = out.len();
        out.push((
            Node {
                sid: id.clone(),
                stype,
                attributes,
                text,
                content: Vec::new(),
                parent_id: parent,
                marks,
            },
            alias,
        ));
        let content = children
            .into_iter()
            .map(|child| self.flatten(child, Some(id.clone()), out))
            .collect();
        out[slot].0.content = content;
        id
    }

    fn apply_update(&mut self, id: &str, mut patch: NodeUpdate, validate: bool) -> Result<Node> {
        let current = self.require(id)?.clone();
        if let Some(stype) = &patch.stype {
            if *stype != current.stype {
                return Err(StoreError::invariant(format!(
                    "cannot change type of {} from '{}' to '{}'",
                    current.sid, current.stype, stype
                )));
            }
        }
        patch.stype = None;

        let alias = patch.attributes.as_mut().and_then(take_alias);
        if patch.attributes.as_ref().is_some_and(|a| a.is_empty()) {
            patch.attributes = None;
        }

        let mut updated = current.clone();
        patch.apply_to(&mut updated);
        if patch.text.is_some() || patch.marks.is_some() {
            let clamped = clamp_marks(&updated.marks, updated.text_len());
            if clamped != updated.marks {
                updated.marks = clamped.clone();
                patch.marks = Some(clamped);
            }
        }
        if validate {
            self.validate_node(&updated)?;
        }
        if let Some(alias) = alias {
            self.bind_alias(alias, current.sid.clone())?;
        }
        if updated == current {
            return Ok(updated);
        }

        self.put(updated.clone());
        self.emit(AtomicOperation::update(&current.sid, &patch));
        Ok(updated)
    }

    /// Detach `id` from its current parent and insert it under `parent_id`.
    fn attach(&mut self, id: &NodeId, parent_id: &NodeId, position: Option<usize>) -> Result<()> {
        let mut node = self.require(id.as_str())?.clone();
        if let Some(old_parent) = node.parent_id.clone() {
            if let Some(mut old) = self.lookup(old_parent.as_str()).cloned() {
                if old.child_index(id.as_str()).is_some() {
                    old.content.retain(|c| c != id);
                    self.put(old);
                }
            }
        }

        let mut parent = self.require(parent_id.as_str())?.clone();
        parent.content.retain(|c| c != id);
        let index = position.map(|p| p.min(parent.content.len()));
        parent.content.insert(index.unwrap_or(parent.content.len()), id.clone());
        node.parent_id = Some(parent_id.clone());

        self.put(parent);
        self.put(node);
        self.emit(AtomicOperation::move_to(id, parent_id, index));
        Ok(())
    }
}

impl Default for NodeStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for NodeStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeStore")
            .field("session_id", &self.ids.session_id())
            .field("root_id", &self.root_id)
            .field("nodes", &self.nodes.len())
            .field("in_transaction", &self.overlay.is_active())
            .field("events", &self.events)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreConfigBuilder;
    use arbor_core::{Mark, OperationType, ValidationResult};
    use std::sync::Mutex;

    #[derive(Clone, Default)]
    struct Recorder(Arc<Mutex<Vec<AtomicOperation>>>);

    impl Recorder {
        fn listener(&self) -> Listener {
            let ops = self.0.clone();
            Arc::new(move |op: &AtomicOperation| ops.lock().unwrap().push(op.clone()))
        }

        fn kinds(&self) -> Vec<OperationType> {
            self.0.lock().unwrap().iter().map(|op| op.op_type).collect()
        }
    }

    fn store() -> NodeStore {
        NodeStore::with_config(StoreConfigBuilder::new().session_id("t").build())
    }

    fn doc_with_paragraph(store: &mut NodeStore) -> (NodeId, NodeId) {
        let root = store.create_node(Node::new("doc")).unwrap();
        let p = store
            .add_child(root.as_str(), Node::text_node("paragraph", "hello"), None)
            .unwrap();
        (root, p)
    }

    #[test]
    fn test_generated_ids_use_session_prefix() {
        let mut store = store();
        let a = store.create_node(Node::new("doc")).unwrap();
        let b = store.generate_id();
        assert_eq!(a, "t:1");
        assert_eq!(b, "t:2");
    }

    #[test]
    fn test_first_parentless_node_becomes_root() {
        let mut store = store();
        let (root, p) = doc_with_paragraph(&mut store);
        assert_eq!(store.root_id(), Some(root.clone()));
        assert_eq!(store.get_node(root.as_str()).unwrap().content, vec![p.clone()]);
        assert_eq!(store.get_parent(p.as_str()).unwrap().sid, root);
        assert_eq!(store.index_in_parent(p.as_str()), Some(0));
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let mut store = store();
        store.create_node(Node::new("doc").with_id("x")).unwrap();
        let err = store.create_node(Node::new("doc").with_id("x")).unwrap_err();
        assert!(matches!(err, StoreError::InvariantViolation(_)));
    }

    #[test]
    fn test_type_is_immutable() {
        let mut store = store();
        let (_, p) = doc_with_paragraph(&mut store);
        assert!(store
            .update_node(p.as_str(), NodeUpdate::new().stype("paragraph").text("hi"))
            .is_ok());
        let err = store
            .update_node(p.as_str(), NodeUpdate::new().stype("heading"))
            .unwrap_err();
        assert!(matches!(err, StoreError::InvariantViolation(_)));
    }

    #[test]
    fn test_update_clamps_marks_to_new_text() {
        let mut store = store();
        let (_, p) = doc_with_paragraph(&mut store);
        store
            .update_node(p.as_str(), NodeUpdate::new().marks(vec![Mark::ranged("bold", 1, 5)]))
            .unwrap();
        let node = store.update_node(p.as_str(), NodeUpdate::new().text("hi")).unwrap();
        assert_eq!(node.marks, vec![Mark::ranged("bold", 1, 2)]);
    }

    #[test]
    fn test_marks_covering_no_text_are_dropped() {
        let mut store = store();
        let (doc, p) = doc_with_paragraph(&mut store);
        store
            .update_node(p.as_str(), NodeUpdate::new().marks(vec![Mark::ranged("bold", 2, 5)]))
            .unwrap();
        let node = store.update_node(p.as_str(), NodeUpdate::new().text("hi")).unwrap();
        assert!(node.marks.is_empty());

        let short = Node::text_node("paragraph", "ab").with_mark(Mark::ranged("em", 2, 9));
        let id = store.add_child(doc.as_str(), short, None).unwrap();
        assert!(store.get_node(id.as_str()).unwrap().marks.is_empty());

        let node = store
            .update_node(p.as_str(), NodeUpdate::new().marks(vec![Mark::ranged("code", 1, 1)]))
            .unwrap();
        assert!(node.marks.is_empty());
    }

    #[test]
    fn test_noop_update_emits_nothing() {
        let mut store = store();
        let (_, p) = doc_with_paragraph(&mut store);
        let recorder = Recorder::default();
        store.subscribe(recorder.listener());
        store.update_node(p.as_str(), NodeUpdate::new().text("hello")).unwrap();
        assert!(recorder.kinds().is_empty());
    }

    #[test]
    fn test_validation_on_request() {
        let validator: Arc<dyn SchemaValidator> = Arc::new(|node: &Node| {
            if node.stype == "forbidden" {
                ValidationResult::invalid(vec!["type not allowed".into()])
            } else {
                ValidationResult::ok()
            }
        });
        let mut store = store().with_validator(validator);

        // not requested: accepted
        store.create_node(Node::new("forbidden").with_id("a")).unwrap();
        let err = store
            .create_node_validated(Node::new("forbidden").with_id("b"))
            .unwrap_err();
        assert_eq!(
            err,
            StoreError::Validation {
                errors: vec!["type not allowed".into()]
            }
        );
        assert!(!store.has_node("b"));
    }

    #[test]
    fn test_delete_removes_subtree_deepest_first() {
        let mut store = store();
        let root = store.create_node(Node::new("doc")).unwrap();
        let list = store.add_child(root.as_str(), Node::new("list"), None).unwrap();
        let item = store.add_child(list.as_str(), Node::text_node("item", "a"), None).unwrap();

        let recorder = Recorder::default();
        store.subscribe(recorder.listener());
        store.delete_node(list.as_str()).unwrap();

        let ops = recorder.0.lock().unwrap().clone();
        assert_eq!(ops.len(), 2);
        assert_eq!(ops[0].node_id, item);
        assert_eq!(ops[1].node_id, list);
        assert!(!store.has_node(item.as_str()));
        assert!(store.get_node(root.as_str()).unwrap().content.is_empty());
    }

    #[test]
    fn test_root_cannot_be_deleted_or_moved() {
        let mut store = store();
        let (root, p) = doc_with_paragraph(&mut store);
        assert!(matches!(
            store.delete_node(root.as_str()),
            Err(StoreError::InvariantViolation(_))
        ));
        assert!(matches!(
            store.move_node(root.as_str(), p.as_str(), None),
            Err(StoreError::InvariantViolation(_))
        ));
    }

    #[test]
    fn test_move_under_descendant_rejected() {
        let mut store = store();
        let root = store.create_node(Node::new("doc")).unwrap();
        let outer = store.add_child(root.as_str(), Node::new("section"), None).unwrap();
        let inner = store.add_child(outer.as_str(), Node::new("section"), None).unwrap();
        let err = store.move_node(outer.as_str(), inner.as_str(), None).unwrap_err();
        assert!(matches!(err, StoreError::InvariantViolation(_)));
    }

    #[test]
    fn test_move_within_parent_reorders() {
        let mut store = store();
        let root = store.create_node(Node::new("doc")).unwrap();
        let a = store.add_child(root.as_str(), Node::new("p"), None).unwrap();
        let b = store.add_child(root.as_str(), Node::new("p"), None).unwrap();
        let c = store.add_child(root.as_str(), Node::new("p"), None).unwrap();

        store.move_node(c.as_str(), root.as_str(), Some(0)).unwrap();
        assert_eq!(store.get_node(root.as_str()).unwrap().content, vec![c, a, b]);
    }

    #[test]
    fn test_add_child_emits_create_then_move() {
        let mut store = store();
        let root = store.create_node(Node::new("doc")).unwrap();
        let recorder = Recorder::default();
        store.subscribe(recorder.listener());
        store.add_child(root.as_str(), Node::new("p"), Some(0)).unwrap();
        assert_eq!(recorder.kinds(), vec![OperationType::Create, OperationType::Move]);
    }

    #[test]
    fn test_create_with_children_flattens_tree() {
        let mut store = store();
        let root = store.create_node(Node::new("doc")).unwrap();
        let recorder = Recorder::default();
        store.subscribe(recorder.listener());

        let tree = NewNode::new("list")
            .with_child(NewNode::text_node("item", "one"))
            .with_child(NewNode::text_node("item", "two"));
        let list = store
            .create_node_with_children(tree, Some(root.as_str()), None)
            .unwrap();

        assert_eq!(
            recorder.kinds(),
            vec![
                OperationType::Create,
                OperationType::Create,
                OperationType::Create,
                OperationType::Move
            ]
        );
        let items = store.get_children(list.as_str());
        assert_eq!(items.len(), 2);
        assert_eq!(items[1].text_str(), "two");
        assert_eq!(items[0].parent_id.as_ref(), Some(&list));
        assert_eq!(store.get_parent(list.as_str()).unwrap().sid, root);
    }

    #[test]
    fn test_create_with_children_checks_before_writing() {
        let mut store = store();
        let root = store.create_node(Node::new("doc")).unwrap();
        store.create_node(Node::new("p").with_id("taken").with_text("")).unwrap();
        let before = store.node_count();

        let tree = NewNode::new("list").with_child(NewNode::new("item").with_id("taken"));
        assert!(store
            .create_node_with_children(tree, Some(root.as_str()), None)
            .is_err());
        assert_eq!(store.node_count(), before);
    }

    #[test]
    fn test_alias_attribute_binds_and_is_stripped() {
        let mut store = store();
        let root = store.create_node(Node::new("doc")).unwrap();
        store.begin_transaction();
        let id = store
            .add_child(
                root.as_str(),
                Node::text_node("heading", "Title").with_attribute("$alias", "title"),
                None,
            )
            .unwrap();

        assert_eq!(store.resolve_alias("title"), id);
        assert_eq!(store.resolve_alias("unbound"), "unbound");
        let node = store.get_node("title").unwrap();
        assert!(node.attributes.is_empty());
        store.update_node("title", NodeUpdate::new().text("Renamed")).unwrap();
        store.commit_transaction().unwrap();
        assert_eq!(store.get_node(id.as_str()).unwrap().text_str(), "Renamed");
    }

    #[test]
    fn test_aliases_outside_transaction_do_not_persist() {
        let mut store = store();
        let root = store.create_node(Node::new("doc")).unwrap();
        let first = store
            .add_child(root.as_str(), Node::new("section").with_attribute("$alias", "intro"), None)
            .unwrap();
        let second = store
            .add_child(root.as_str(), Node::new("section").with_attribute("$alias", "intro"), None)
            .unwrap();

        assert_ne!(first, second);
        assert_eq!(store.resolve_alias("intro"), "intro");
        assert!(store.get_node(second.as_str()).unwrap().attributes.is_empty());
        store.set_alias("intro", first.as_str()).unwrap();
        store.set_alias("intro", second.as_str()).unwrap();
        assert!(store.get_node("intro").is_none());
    }

    #[test]
    fn test_to_tree_json_nests_children() {
        let mut store = store();
        let (root, _) = doc_with_paragraph(&mut store);
        let tree = store.to_tree_json(root.as_str()).unwrap();
        assert_eq!(tree["stype"], "doc");
        assert_eq!(tree["content"][0]["text"], "hello");
    }
}
