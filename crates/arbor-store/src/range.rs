//! Range text and mark editing.
//!
//! A [`TextRange`] addresses text from an offset in one text-bearing node to
//! an offset in another (or the same) node. Multi-node ranges cover the
//! start node's tail, every text-bearing node in between, and the end node's
//! head.
//!
//! Text operations soft-fail: a stale range (missing node, offset out of
//! bounds, end before start) yields an empty string or `false` and writes
//! nothing.

use crate::error::Result;
use crate::store::NodeStore;
use crate::traversal::{TraversalOptions, TraversalRange};
use arbor_core::interval::{
    covers, cut_marks, delete_marks, insert_marks, normalize_marks, replace_marks, slice_marks,
};
use arbor_core::text::{char_len, slice, splice};
use arbor_core::{Mark, Node, NodeId, NodeUpdate};
use serde::{Deserialize, Serialize};

/// Selection over document text. Offsets count chars.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextRange {
    pub start_node_id: NodeId,
    pub start_offset: usize,
    pub end_node_id: NodeId,
    pub end_offset: usize,
}

impl TextRange {
    pub fn new(
        start_node_id: impl Into<NodeId>,
        start_offset: usize,
        end_node_id: impl Into<NodeId>,
        end_offset: usize,
    ) -> Self {
        Self {
            start_node_id: start_node_id.into(),
            start_offset,
            end_node_id: end_node_id.into(),
            end_offset,
        }
    }

    /// `[start, end)` within one node.
    pub fn within(node_id: impl Into<NodeId>, start: usize, end: usize) -> Self {
        let id = node_id.into();
        Self::new(id.clone(), start, id, end)
    }

    pub fn collapsed(node_id: impl Into<NodeId>, offset: usize) -> Self {
        Self::within(node_id, offset, offset)
    }

    pub fn is_single_node(&self) -> bool {
        self.start_node_id == self.end_node_id
    }

    pub fn is_collapsed(&self) -> bool {
        self.is_single_node() && self.start_offset == self.end_offset
    }
}

/// One text-bearing node's share of a range.
#[derive(Clone, Debug)]
struct Segment {
    id: NodeId,
    start: usize,
    end: usize,
    len: usize,
    /// Neither the first nor the last node of a multi-node range.
    interior: bool,
}

impl Segment {
    fn is_empty(&self) -> bool {
        self.start >= self.end
    }
}

impl NodeStore {
    /// Ids from `start` to `end` inclusive, in document order.
    ///
    /// Siblings take an index window over their parent's content; anything
    /// else walks the traversal engine. `None` when either node is missing or
    /// `end` does not follow `start`.
    pub fn nodes_between(&self, start: &str, end: &str) -> Option<Vec<NodeId>> {
        let start = self.node(start)?;
        let end = self.node(end)?;
        if start.sid == end.sid {
            return Some(vec![start.sid.clone()]);
        }
        if let (Some(a), Some(b)) = (&start.parent_id, &end.parent_id) {
            if a == b {
                let parent = self.node(a.as_str())?;
                let from = parent.child_index(start.sid.as_str())?;
                let to = parent.child_index(end.sid.as_str())?;
                if to < from {
                    return None;
                }
                let mut ids = Vec::new();
                for sibling in &parent.content[from..to] {
                    self.subtree_preorder(sibling, &mut ids);
                }
                ids.push(end.sid.clone());
                return Some(ids);
            }
        }
        self.nodes_between_by_traversal(&start.sid, &end.sid)
    }

    pub(crate) fn nodes_between_by_traversal(&self, start: &NodeId, end: &NodeId) -> Option<Vec<NodeId>> {
        let ids = self
            .traverse(TraversalOptions::new().range(TraversalRange::inclusive(start.clone(), end.clone())))
            .to_vec();
        (ids.last() == Some(end)).then_some(ids)
    }

    fn segments(&self, range: &TextRange) -> Option<Vec<Segment>> {
        let start = self.node(range.start_node_id.as_str())?;
        let end = self.node(range.end_node_id.as_str())?;
        if !start.is_text_bearing() || !end.is_text_bearing() {
            return None;
        }
        if start.sid == end.sid {
            let len = start.text_len();
            if range.start_offset > range.end_offset || range.end_offset > len {
                return None;
            }
            return Some(vec![Segment {
                id: start.sid.clone(),
                start: range.start_offset,
                end: range.end_offset,
                len,
                interior: false,
            }]);
        }
        if range.start_offset > start.text_len() || range.end_offset > end.text_len() {
            return None;
        }

        let ids = self.nodes_between(start.sid.as_str(), end.sid.as_str())?;
        let last = ids.len() - 1;
        let segments = ids
            .iter()
            .enumerate()
            .filter_map(|(i, id)| {
                let node = self.node(id.as_str()).filter(|n| n.is_text_bearing())?;
                let len = node.text_len();
                let (s, e) = match i {
                    0 => (range.start_offset, len),
                    i if i == last => (0, range.end_offset),
                    _ => (0, len),
                };
                Some(Segment {
                    id: id.clone(),
                    start: s,
                    end: e,
                    len,
                    interior: i != 0 && i != last,
                })
            })
            .collect();
        Some(segments)
    }

    /// Write new text and marks, skipping writes that change nothing.
    pub(crate) fn write_text(&mut self, id: &NodeId, text: String, marks: Vec<Mark>) -> bool {
        let (same_text, same_marks) = match self.node(id.as_str()) {
            Some(node) => (node.text.as_deref() == Some(text.as_str()), node.marks == marks),
            None => return false,
        };
        if same_text && same_marks {
            return false;
        }
        let mut patch = NodeUpdate::new();
        if !same_text {
            patch = patch.text(text);
        }
        if !same_marks {
            patch = patch.marks(marks);
        }
        match self.update_node(id.as_str(), patch) {
            Ok(_) => true,
            Err(err) => {
                tracing::debug!(node = %id, error = %err, "text write rejected");
                false
            }
        }
    }

    /// Replace `[start, end)` of one node, adjusting its marks.
    fn replace_in_node(&mut self, id: &NodeId, start: usize, end: usize, insert: &str) -> bool {
        let Some(node) = self.node(id.as_str()) else {
            return false;
        };
        let text = splice(node.text_str(), start, end, insert);
        let marks = replace_marks(&node.marks, start, end, char_len(insert));
        self.write_text(id, text, marks)
    }

    fn clear_node_text(&mut self, id: &NodeId) -> bool {
        self.write_text(id, String::new(), Vec::new())
    }

    /// Insert `text` at `offset`. Marks straddling the offset grow.
    pub fn insert_text(&mut self, node_id: &str, offset: usize, text: &str) -> bool {
        let Some(node) = self.node(node_id).filter(|n| n.is_text_bearing()) else {
            return false;
        };
        if offset > node.text_len() || text.is_empty() {
            return false;
        }
        let id = node.sid.clone();
        let new_text = splice(node.text_str(), offset, offset, text);
        let marks = insert_marks(&node.marks, offset, char_len(text));
        self.write_text(&id, new_text, marks)
    }

    /// Text covered by `range`, concatenated across nodes.
    pub fn extract_text(&self, range: &TextRange) -> String {
        let Some(segments) = self.segments(range) else {
            return String::new();
        };
        segments
            .iter()
            .filter_map(|seg| {
                let node = self.node(seg.id.as_str())?;
                Some(slice(node.text_str(), seg.start, seg.end).to_string())
            })
            .collect()
    }

    /// Delete the text covered by `range` and return it. Interior nodes are
    /// emptied and lose their marks.
    pub fn delete_text(&mut self, range: &TextRange) -> String {
        let Some(segments) = self.segments(range) else {
            return String::new();
        };
        let mut removed = String::new();
        for seg in &segments {
            let Some(node) = self.node(seg.id.as_str()) else {
                continue;
            };
            removed.push_str(slice(node.text_str(), seg.start, seg.end));
            if seg.interior {
                self.clear_node_text(&seg.id);
                continue;
            }
            if seg.is_empty() {
                continue;
            }
            let text = splice(node.text_str(), seg.start, seg.end, "");
            let marks = delete_marks(&node.marks, seg.start, seg.end);
            self.write_text(&seg.id, text, marks);
        }
        removed
    }

    /// Replace the text covered by `range` with `text`. Across nodes the
    /// replacement lands in the start node.
    pub fn replace_text(&mut self, range: &TextRange, text: &str) -> bool {
        let Some(segments) = self.segments(range) else {
            return false;
        };
        let last = segments.len() - 1;
        let mut changed = false;
        for (i, seg) in segments.iter().enumerate() {
            changed |= if i == 0 {
                self.replace_in_node(&seg.id, seg.start, seg.end, text)
            } else if seg.interior {
                self.clear_node_text(&seg.id)
            } else if i == last && !seg.is_empty() {
                self.replace_in_node(&seg.id, seg.start, seg.end, "")
            } else {
                false
            };
        }
        changed
    }

    /// Segments a mark operation touches: the whole single-node span, or
    /// the start tail and end head of a multi-node range.
    fn boundary_segments(&self, range: &TextRange) -> Option<Vec<Segment>> {
        let segments = self.segments(range)?;
        Some(
            segments
                .into_iter()
                .filter(|seg| !seg.interior && !seg.is_empty())
                .collect(),
        )
    }

    fn annotate(&mut self, seg: &Segment, mark: &Mark) -> bool {
        let Some(node) = self.node(seg.id.as_str()) else {
            return false;
        };
        let mut marks = node.marks.clone();
        marks.push(mark.with_range(seg.start, seg.end));
        let marks = normalize_marks(&marks, seg.len);
        let text = node.text_str().to_string();
        self.write_text(&seg.id, text, marks)
    }

    fn strip(&mut self, seg: &Segment, stype: &str) -> bool {
        let Some(node) = self.node(seg.id.as_str()) else {
            return false;
        };
        let (start, end) = if seg.interior { (0, seg.len) } else { (seg.start, seg.end) };
        let cut = cut_marks(&node.marks, stype, start, end, seg.len);
        if cut == node.marks {
            return false;
        }
        let marks = normalize_marks(&cut, seg.len);
        let text = node.text_str().to_string();
        self.write_text(&seg.id, text, marks)
    }

    /// Annotate `range` with `mark`. Across nodes only the start tail and
    /// end head are annotated; interior nodes are left alone.
    pub fn apply_mark(&mut self, range: &TextRange, mark: &Mark) -> bool {
        let Some(segments) = self.boundary_segments(range) else {
            return false;
        };
        let mut changed = false;
        for seg in &segments {
            changed |= self.annotate(seg, mark);
        }
        changed
    }

    /// Remove coverage of type `stype` from every node of `range`.
    pub fn remove_mark(&mut self, range: &TextRange, stype: &str) -> bool {
        let Some(segments) = self.segments(range) else {
            return false;
        };
        let mut changed = false;
        for seg in segments.iter().filter(|seg| seg.interior || !seg.is_empty()) {
            changed |= self.strip(seg, stype);
        }
        changed
    }

    /// Remove `mark` where it already covers every boundary segment,
    /// otherwise apply it.
    pub fn toggle_mark(&mut self, range: &TextRange, mark: &Mark) -> bool {
        let Some(segments) = self.boundary_segments(range) else {
            return false;
        };
        if segments.is_empty() {
            return false;
        }
        let covered = segments.iter().all(|seg| {
            self.node(seg.id.as_str())
                .is_some_and(|node| covers(&node.marks, mark, seg.start, seg.end, seg.len))
        });
        let mut changed = false;
        for seg in &segments {
            changed |= if covered {
                self.strip(seg, &mark.stype)
            } else {
                self.annotate(seg, mark)
            };
        }
        changed
    }

    /// Marks covering the char at `offset`.
    pub fn marks_at(&self, node_id: &str, offset: usize) -> Vec<Mark> {
        let Some(node) = self.node(node_id) else {
            return Vec::new();
        };
        let len = node.text_len();
        node.marks
            .iter()
            .filter(|mark| {
                let (s, e) = mark.bounds(len);
                s <= offset && offset < e
            })
            .cloned()
            .collect()
    }

    /// Detached copies of the text covered by `range`, one per text-bearing
    /// node, with marks clipped to the copied text.
    pub fn serialize_range(&self, range: &TextRange) -> Vec<Node> {
        let Some(segments) = self.segments(range) else {
            return Vec::new();
        };
        segments
            .iter()
            .filter_map(|seg| {
                let node = self.node(seg.id.as_str())?;
                Some(Node {
                    sid: node.sid.clone(),
                    stype: node.stype.clone(),
                    attributes: node.attributes.clone(),
                    text: Some(slice(node.text_str(), seg.start, seg.end).to_string()),
                    content: Vec::new(),
                    parent_id: None,
                    marks: slice_marks(&node.marks, seg.start, seg.end, seg.len),
                })
            })
            .collect()
    }

    pub fn serialize_range_json(&self, range: &TextRange) -> Result<String> {
        Ok(serde_json::to_string(&self.serialize_range(range))?)
    }

    /// Insert fresh copies of `nodes` under `parent`, starting at `position`
    /// (appended when `None`). Returns the new ids in order.
    pub fn deserialize_nodes(&mut self, parent: &str, nodes: &[Node], position: Option<usize>) -> Result<Vec<NodeId>> {
        let parent_id = self.require(parent)?.sid.clone();
        nodes
            .iter()
            .enumerate()
            .map(|(i, node)| {
                let fresh = Node {
                    sid: NodeId::default(),
                    content: Vec::new(),
                    parent_id: None,
                    ..node.clone()
                };
                self.add_child(parent_id.as_str(), fresh, position.map(|p| p + i))
            })
            .collect()
    }

    pub fn deserialize_nodes_json(&mut self, parent: &str, json: &str, position: Option<usize>) -> Result<Vec<NodeId>> {
        let nodes: Vec<Node> = serde_json::from_str(json)?;
        self.deserialize_nodes(parent, &nodes, position)
    }
}
