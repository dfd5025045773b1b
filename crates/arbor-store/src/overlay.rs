//! Transactional overlay.
//!
//! While a transaction is active every write lands here instead of in the
//! base table: upserts become snapshots, deletes become tombstones, and each
//! emitted operation is buffered. Reads resolve tombstone first, then
//! snapshot, then base.
//!
//! On commit the buffered operations are replayed against a copy of the base
//! table, grouped by type in the order create, update, move, delete. The copy
//! replaces the base only if every operation applies, so a failed commit
//! leaves the base untouched.

use crate::alias::AliasTable;
use crate::error::{Result, StoreError};
use arbor_core::{AtomicOperation, Node, NodeId, NodeUpdate, OperationType};
use std::collections::{HashMap, HashSet};

pub type NodeTable = HashMap<NodeId, Node>;

/// Copy-on-write layer over the base node table.
#[derive(Clone, Debug, Default)]
pub struct Overlay {
    active: bool,
    snapshots: HashMap<NodeId, Node>,
    /// Deleted ids and the parent each had when deleted.
    tombstones: HashMap<NodeId, Option<NodeId>>,
    operations: Vec<AtomicOperation>,
    pending_root: Option<NodeId>,
    aliases: AliasTable,
}

impl Overlay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Start buffering. Calling it while already active does nothing.
    pub fn begin(&mut self) {
        self.active = true;
    }

    /// Drop all buffered state and deactivate.
    pub fn reset(&mut self) {
        self.active = false;
        self.snapshots.clear();
        self.tombstones.clear();
        self.operations.clear();
        self.pending_root = None;
        self.aliases.clear();
    }

    /// Store the latest version of a node. A later upsert revives a
    /// tombstoned id.
    pub fn upsert_node(&mut self, node: Node) {
        self.tombstones.remove(&node.sid);
        self.snapshots.insert(node.sid.clone(), node);
    }

    pub fn mark_deleted(&mut self, id: &NodeId, parent: Option<NodeId>) {
        self.snapshots.remove(id);
        self.tombstones.insert(id.clone(), parent);
    }

    pub fn is_deleted(&self, id: &str) -> bool {
        self.tombstones.contains_key(id)
    }

    pub fn snapshot(&self, id: &str) -> Option<&Node> {
        self.snapshots.get(id)
    }

    /// Overlay-aware lookup.
    pub fn resolve<'a>(&'a self, id: &str, base: &'a NodeTable) -> Option<&'a Node> {
        if self.tombstones.contains_key(id) {
            return None;
        }
        self.snapshots.get(id).or_else(|| base.get(id))
    }

    /// Ids visible through the overlay.
    pub fn visible_ids<'a>(&'a self, base: &'a NodeTable) -> impl Iterator<Item = &'a NodeId> + 'a {
        base.keys()
            .filter(move |id| !self.snapshots.contains_key(*id))
            .chain(self.snapshots.keys())
            .filter(move |id| !self.tombstones.contains_key(*id))
    }

    pub fn record(&mut self, op: AtomicOperation) {
        self.operations.push(op);
    }

    pub fn operations(&self) -> &[AtomicOperation] {
        &self.operations
    }

    pub fn set_pending_root(&mut self, id: NodeId) {
        self.pending_root = Some(id);
    }

    pub fn pending_root(&self) -> Option<&NodeId> {
        self.pending_root.as_ref()
    }

    pub fn aliases(&self) -> &AliasTable {
        &self.aliases
    }

    pub fn aliases_mut(&mut self) -> &mut AliasTable {
        &mut self.aliases
    }

    /// Replay the buffered operations against a copy of `base`.
    pub fn replay(&self, base: &NodeTable) -> Result<NodeTable> {
        let mut staged = base.clone();
        for op_type in OperationType::REPLAY_ORDER {
            for op in self.operations.iter().filter(|op| op.op_type == op_type) {
                match op_type {
                    OperationType::Create => self.replay_create(&mut staged, base, op)?,
                    OperationType::Update => replay_update(&mut staged, op)?,
                    OperationType::Move => replay_move(&mut staged, op)?,
                    OperationType::Delete => replay_delete(&mut staged, op),
                }
            }
        }
        self.reconcile_child_order(&mut staged);
        Ok(staged)
    }

    fn replay_create(&self, staged: &mut NodeTable, base: &NodeTable, op: &AtomicOperation) -> Result<()> {
        let mut node = match self.snapshots.get(&op.node_id) {
            Some(snapshot) => snapshot.clone(),
            None => {
                let data = op.data.as_ref().ok_or_else(|| {
                    StoreError::Serialization(format!("create of {} carries no node", op.node_id))
                })?;
                serde_json::from_value::<Node>(data.clone())?
            }
        };
        if node.marks.is_empty() {
            if let Some(existing) = base.get(&op.node_id) {
                node.marks = existing.marks.clone();
            }
        }
        staged.insert(node.sid.clone(), node);
        Ok(())
    }

    /// After moves, parents whose overlay snapshot holds the same children
    /// adopt the snapshot's order. Positions recorded against the overlay
    /// view can drift when deletes replay after the moves they preceded.
    fn reconcile_child_order(&self, staged: &mut NodeTable) {
        let parents: HashSet<&NodeId> = self
            .operations
            .iter()
            .filter(|op| op.op_type == OperationType::Move)
            .filter_map(|op| op.parent_id.as_ref())
            .collect();
        for parent_id in parents {
            let (Some(snapshot), Some(staged_parent)) =
                (self.snapshots.get(parent_id), staged.get_mut(parent_id))
            else {
                continue;
            };
            if snapshot.content == staged_parent.content {
                continue;
            }
            let mut want: Vec<&NodeId> = snapshot.content.iter().collect();
            let mut have: Vec<&NodeId> = staged_parent.content.iter().collect();
            want.sort_unstable();
            have.sort_unstable();
            if want == have {
                staged_parent.content = snapshot.content.clone();
            }
        }
    }
}

fn replay_update(staged: &mut NodeTable, op: &AtomicOperation) -> Result<()> {
    let node = staged
        .get_mut(&op.node_id)
        .ok_or_else(|| StoreError::not_found(&op.node_id))?;
    if let Some(data) = &op.data {
        NodeUpdate::from_data(data)?.apply_to(node);
    }
    Ok(())
}

fn replay_move(staged: &mut NodeTable, op: &AtomicOperation) -> Result<()> {
    let parent_id = op
        .parent_id
        .clone()
        .ok_or_else(|| StoreError::invariant(format!("move of {} has no target parent", op.node_id)))?;
    let old_parent = staged
        .get(&op.node_id)
        .ok_or_else(|| StoreError::not_found(&op.node_id))?
        .parent_id
        .clone();
    if let Some(old) = old_parent {
        if let Some(old) = staged.get_mut(&old) {
            old.content.retain(|c| *c != op.node_id);
        }
    }
    let parent = staged
        .get_mut(&parent_id)
        .ok_or_else(|| StoreError::not_found(&parent_id))?;
    parent.content.retain(|c| *c != op.node_id);
    let index = op
        .position
        .map_or(parent.content.len(), |p| p.min(parent.content.len()));
    parent.content.insert(index, op.node_id.clone());
    if let Some(node) = staged.get_mut(&op.node_id) {
        node.parent_id = Some(parent_id);
    }
    Ok(())
}

fn replay_delete(staged: &mut NodeTable, op: &AtomicOperation) {
    let Some(node) = staged.remove(&op.node_id) else {
        tracing::trace!(node = %op.node_id, "delete replay: node already absent");
        return;
    };
    let parent = node.parent_id.or_else(|| op.parent_id.clone());
    if let Some(parent) = parent.and_then(|p| staged.get_mut(&p)) {
        parent.content.retain(|c| *c != op.node_id);
    }
}
