//! Atomic operation records.
//!
//! Every primitive mutation of the store produces exactly one record. Records
//! are observation-only: listeners and transaction buffers receive them, but
//! nothing mutates them after emission.

use crate::node::{Node, NodeId, NodeUpdate};
use serde::{Deserialize, Serialize};

/// Kind of a primitive mutation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationType {
    Create,
    Update,
    Move,
    Delete,
}

impl OperationType {
    /// Order in which buffered operations are replayed on commit.
    pub const REPLAY_ORDER: [OperationType; 4] = [
        OperationType::Create,
        OperationType::Update,
        OperationType::Move,
        OperationType::Delete,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OperationType::Create => "create",
            OperationType::Update => "update",
            OperationType::Move => "move",
            OperationType::Delete => "delete",
        }
    }
}

impl std::fmt::Display for OperationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single typed mutation record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AtomicOperation {
    #[serde(rename = "type")]
    pub op_type: OperationType,
    pub node_id: NodeId,
    /// Full node for `create`, the patch for `update`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    /// Milliseconds since the Unix epoch.
    pub timestamp: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<NodeId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<usize>,
}

impl AtomicOperation {
    pub fn create(node: &Node) -> Self {
        Self {
            op_type: OperationType::Create,
            node_id: node.sid.clone(),
            data: serde_json::to_value(node).ok(),
            timestamp: now_millis(),
            parent_id: node.parent_id.clone(),
            position: None,
        }
    }

    pub fn update(id: &NodeId, patch: &NodeUpdate) -> Self {
        Self {
            op_type: OperationType::Update,
            node_id: id.clone(),
            data: patch.to_data(),
            timestamp: now_millis(),
            parent_id: None,
            position: None,
        }
    }

    /// Attach `id` under `parent` at `position` (append when `None`).
    pub fn move_to(id: &NodeId, parent: &NodeId, position: Option<usize>) -> Self {
        Self {
            op_type: OperationType::Move,
            node_id: id.clone(),
            data: None,
            timestamp: now_millis(),
            parent_id: Some(parent.clone()),
            position,
        }
    }

    pub fn delete(id: &NodeId, parent: Option<&NodeId>) -> Self {
        Self {
            op_type: OperationType::Delete,
            node_id: id.clone(),
            data: None,
            timestamp: now_millis(),
            parent_id: parent.cloned(),
            position: None,
        }
    }
}

/// Current wall-clock time in milliseconds.
pub fn now_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
