//! Splitting and merging nodes.
//!
//! These compose ordinary store writes, so outside a transaction a failure
//! partway through leaves the earlier writes in place. Run them inside a
//! transaction when that matters.

use crate::error::{Result, StoreError};
use crate::store::NodeStore;
use arbor_core::interval::{materialize_marks, rebase_marks, split_marks};
use arbor_core::text::slice;
use arbor_core::{Node, NodeId, NodeUpdate};

impl NodeStore {
    /// Split a text node at char `pos`. The original keeps the left half;
    /// the right half becomes a new sibling placed right after it. Returns
    /// the new node's id.
    pub fn split_text_node(&mut self, id: &str, pos: usize) -> Result<NodeId> {
        let node = self.require(id)?.clone();
        if !node.is_text_bearing() {
            return Err(StoreError::invariant(format!("{} has no text to split", node.sid)));
        }
        let len = node.text_len();
        if pos > len {
            return Err(StoreError::invariant(format!(
                "split position {} is past the end of {} ({} chars)",
                pos, node.sid, len
            )));
        }

        let (left_marks, right_marks) = split_marks(&node.marks, pos);
        let left_text = slice(node.text_str(), 0, pos).to_string();
        let right_text = slice(node.text_str(), pos, len).to_string();
        self.update_node(
            node.sid.as_str(),
            NodeUpdate::new().text(left_text).marks(left_marks),
        )?;

        let right = Node {
            sid: NodeId::default(),
            stype: node.stype.clone(),
            attributes: node.attributes.clone(),
            text: Some(right_text),
            content: Vec::new(),
            parent_id: None,
            marks: right_marks,
        };
        match &node.parent_id {
            Some(parent) => {
                let position = self.index_in_parent(node.sid.as_str()).map(|i| i + 1);
                self.add_child(parent.as_str(), right, position)
            }
            None => self.create_node(right),
        }
    }

    /// Append `right`'s text and marks to `left`, then delete `right`.
    /// Returns the merged node.
    pub fn merge_text_nodes(&mut self, left: &str, right: &str) -> Result<Node> {
        let left = self.require(left)?.clone();
        let right = self.require(right)?.clone();
        if left.sid == right.sid {
            return Err(StoreError::invariant("cannot merge a node with itself"));
        }
        if !left.is_text_bearing() || !right.is_text_bearing() {
            return Err(StoreError::invariant(format!(
                "cannot merge {} and {}: both must carry text",
                left.sid, right.sid
            )));
        }

        let left_len = left.text_len();
        let mut marks = materialize_marks(&left.marks, left_len);
        marks.extend(rebase_marks(&right.marks, left_len, right.text_len()));
        let text = format!("{}{}", left.text_str(), right.text_str());

        let merged = self.update_node(left.sid.as_str(), NodeUpdate::new().text(text).marks(marks))?;
        self.delete_node(right.sid.as_str())?;
        Ok(merged)
    }

    /// Move the children of `id` from `index` on into a new sibling of the
    /// same type, placed right after it. Returns the new node's id.
    pub fn split_block_node(&mut self, id: &str, index: usize) -> Result<NodeId> {
        let node = self.require(id)?.clone();
        if index > node.content.len() {
            return Err(StoreError::invariant(format!(
                "split index {} is past the {} children of {}",
                index,
                node.content.len(),
                node.sid
            )));
        }
        let parent = node
            .parent_id
            .clone()
            .ok_or_else(|| StoreError::invariant(format!("{} has no parent to split into", node.sid)))?;

        let sibling = Node {
            sid: NodeId::default(),
            stype: node.stype.clone(),
            attributes: node.attributes.clone(),
            text: None,
            content: Vec::new(),
            parent_id: None,
            marks: Vec::new(),
        };
        let position = self.index_in_parent(node.sid.as_str()).map(|i| i + 1);
        let new_id = self.add_child(parent.as_str(), sibling, position)?;
        for (i, child) in node.content[index..].iter().enumerate() {
            self.move_node(child.as_str(), new_id.as_str(), Some(i))?;
        }
        Ok(new_id)
    }

    /// Move every child of `right` to the end of `left`, then delete
    /// `right`. Returns the merged node.
    pub fn merge_block_nodes(&mut self, left: &str, right: &str) -> Result<Node> {
        let left_id = self.require(left)?.sid.clone();
        let right = self.require(right)?.clone();
        if left_id == right.sid {
            return Err(StoreError::invariant("cannot merge a node with itself"));
        }
        for child in &right.content {
            self.move_node(child.as_str(), left_id.as_str(), None)?;
        }
        self.delete_node(right.sid.as_str())?;
        self.get_node(left_id.as_str())
            .ok_or_else(|| StoreError::not_found(&left_id))
    }
}
