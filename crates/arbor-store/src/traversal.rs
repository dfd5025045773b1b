//! Lazy document-order traversal.
//!
//! A [`Traversal`] walks the tree in pre-order (or its exact reverse) one
//! node at a time, computing successors from `parent_id` links and child
//! positions. Nothing is materialized up front, so stopping early costs
//! only the nodes visited.
//!
//! Filters skip a node without pruning its descendants; only `max_depth`
//! prunes.

use crate::store::NodeStore;
use arbor_core::{Node, NodeId};

/// Predicate over nodes.
pub type NodePredicate<'a> = Box<dyn Fn(&Node) -> bool + 'a>;

/// Window of a traversal between two nodes in document order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TraversalRange {
    pub start: NodeId,
    pub end: NodeId,
    pub include_start: bool,
    pub include_end: bool,
}

impl TraversalRange {
    /// Both endpoints included.
    pub fn inclusive(start: impl Into<NodeId>, end: impl Into<NodeId>) -> Self {
        Self {
            start: start.into(),
            end: end.into(),
            include_start: true,
            include_end: true,
        }
    }

    /// Only the nodes strictly between the endpoints.
    pub fn exclusive(start: impl Into<NodeId>, end: impl Into<NodeId>) -> Self {
        Self {
            include_start: false,
            include_end: false,
            ..Self::inclusive(start, end)
        }
    }
}

/// Traversal configuration.
#[derive(Default)]
pub struct TraversalOptions<'a> {
    /// Subtree to walk. Defaults to the tree containing the starting node,
    /// or the document root.
    pub root: Option<NodeId>,
    pub start_from: Option<NodeId>,
    pub range: Option<TraversalRange>,
    /// Depth relative to `root`, which is depth 0.
    pub max_depth: Option<usize>,
    /// When non-empty, only these types are yielded.
    pub include_types: Vec<String>,
    pub exclude_types: Vec<String>,
    pub filter: Option<NodePredicate<'a>>,
    /// Ends the traversal at the first node it matches, without yielding it.
    pub stop_when: Option<NodePredicate<'a>>,
    pub reverse: bool,
}

impl<'a> TraversalOptions<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn root(mut self, id: impl Into<NodeId>) -> Self {
        self.root = Some(id.into());
        self
    }

    pub fn start_from(mut self, id: impl Into<NodeId>) -> Self {
        self.start_from = Some(id.into());
        self
    }

    pub fn range(mut self, range: TraversalRange) -> Self {
        self.range = Some(range);
        self
    }

    pub fn max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    pub fn include_type(mut self, stype: impl Into<String>) -> Self {
        self.include_types.push(stype.into());
        self
    }

    pub fn exclude_type(mut self, stype: impl Into<String>) -> Self {
        self.exclude_types.push(stype.into());
        self
    }

    pub fn filter(mut self, predicate: impl Fn(&Node) -> bool + 'a) -> Self {
        self.filter = Some(Box::new(predicate));
        self
    }

    pub fn stop_when(mut self, predicate: impl Fn(&Node) -> bool + 'a) -> Self {
        self.stop_when = Some(Box::new(predicate));
        self
    }

    pub fn reverse(mut self) -> Self {
        self.reverse = true;
        self
    }
}

/// Counters for one traversal run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TraversalStats {
    pub visited: usize,
    pub yielded: usize,
    pub skipped: usize,
}

/// Pre-order iterator over a store.
pub struct Traversal<'a> {
    store: &'a NodeStore,
    options: TraversalOptions<'a>,
    root: Option<NodeId>,
    cursor: Option<(NodeId, usize)>,
    /// False when the range end precedes its start, or either endpoint is
    /// not in the tree.
    window_ordered: bool,
    started: bool,
    finished: bool,
    stats: TraversalStats,
}

impl<'a> Traversal<'a> {
    pub fn new(store: &'a NodeStore, mut options: TraversalOptions<'a>) -> Self {
        options.start_from = options.start_from.map(|id| store.resolve_alias(id.as_str()));
        if let Some(range) = options.range.as_mut() {
            range.start = store.resolve_alias(range.start.as_str());
            range.end = store.resolve_alias(range.end.as_str());
        }
        let root = match &options.root {
            Some(root) => Some(store.resolve_alias(root.as_str())),
            None => {
                let anchor = options
                    .start_from
                    .as_ref()
                    .or(options.range.as_ref().map(|r| &r.start));
                match anchor {
                    Some(anchor) => top_ancestor(store, anchor),
                    None => store.root_id(),
                }
            }
        };
        let window_ordered = options.range.as_ref().map_or(true, |range| {
            match (tree_position(store, &range.start), tree_position(store, &range.end)) {
                (Some(start), Some(end)) => start.0 == end.0 && start.1 <= end.1,
                _ => false,
            }
        });
        if !window_ordered {
            tracing::debug!(range = ?options.range, "range end does not follow its start");
        }
        Self {
            store,
            options,
            root,
            cursor: None,
            window_ordered,
            started: false,
            finished: false,
            stats: TraversalStats::default(),
        }
    }

    pub fn stats(&self) -> TraversalStats {
        self.stats
    }

    /// Return to the configured starting point.
    pub fn reset(&mut self) {
        self.cursor = None;
        self.started = false;
        self.finished = false;
        self.stats = TraversalStats::default();
    }

    /// Restart from `id`, keeping every other option.
    pub fn start_from(&mut self, id: impl Into<NodeId>) {
        let id = id.into();
        self.options.start_from = Some(self.store.resolve_alias(id.as_str()));
        self.reset();
    }

    /// Every remaining node matching `predicate`.
    pub fn find_all(&mut self, predicate: impl Fn(&Node) -> bool) -> Vec<&'a Node> {
        self.by_ref().filter(|node| predicate(node)).collect()
    }

    /// Ids of every remaining node.
    pub fn to_vec(&mut self) -> Vec<NodeId> {
        self.by_ref().map(|node| node.sid.clone()).collect()
    }

    fn initial(&self) -> Option<(NodeId, usize)> {
        if !self.window_ordered {
            return None;
        }
        let root = self.root.as_ref()?;
        if self.options.reverse {
            match self
                .options
                .start_from
                .as_ref()
                .or(self.options.range.as_ref().map(|r| &r.end))
            {
                Some(anchor) => Some((anchor.clone(), self.depth_of(anchor)?)),
                None => Some(self.last_descendant(root.clone(), 0)),
            }
        } else {
            let anchor = self
                .options
                .start_from
                .as_ref()
                .or(self.options.range.as_ref().map(|r| &r.start))
                .unwrap_or(root);
            Some((anchor.clone(), self.depth_of(anchor)?))
        }
    }

    fn depth_of(&self, id: &NodeId) -> Option<usize> {
        let root = self.root.as_ref()?;
        let mut depth = 0;
        let mut current = self.store.node(id.as_str())?;
        while current.sid != *root {
            current = self.store.node(current.parent_id.as_ref()?.as_str())?;
            depth += 1;
        }
        Some(depth)
    }

    fn may_descend(&self, depth: usize) -> bool {
        self.options.max_depth.map_or(true, |max| depth < max)
    }

    fn first_present<'n>(&self, mut ids: impl Iterator<Item = &'n NodeId>) -> Option<NodeId> {
        ids.find(|id| self.store.node(id.as_str()).is_some()).cloned()
    }

    fn successor(&self, id: &NodeId, depth: usize) -> Option<(NodeId, usize)> {
        let mut current = self.store.node(id.as_str())?;
        if self.may_descend(depth) {
            if let Some(child) = self.first_present(current.content.iter()) {
                return Some((child, depth + 1));
            }
        }
        let mut depth = depth;
        loop {
            if Some(&current.sid) == self.root.as_ref() {
                return None;
            }
            let parent = self.store.node(current.parent_id.as_ref()?.as_str())?;
            let index = parent.child_index(current.sid.as_str())?;
            if let Some(next) = self.first_present(parent.content[index + 1..].iter()) {
                return Some((next, depth));
            }
            current = parent;
            depth = depth.saturating_sub(1);
        }
    }

    fn predecessor(&self, id: &NodeId, depth: usize) -> Option<(NodeId, usize)> {
        if Some(id) == self.root.as_ref() {
            return None;
        }
        let node = self.store.node(id.as_str())?;
        let parent = self.store.node(node.parent_id.as_ref()?.as_str())?;
        let index = parent.child_index(id.as_str())?;
        match self.first_present(parent.content[..index].iter().rev()) {
            Some(previous) => Some(self.last_descendant(previous, depth)),
            None => Some((parent.sid.clone(), depth.saturating_sub(1))),
        }
    }

    /// Deepest last descendant of `id` within the depth limit.
    fn last_descendant(&self, mut id: NodeId, mut depth: usize) -> (NodeId, usize) {
        while self.may_descend(depth) {
            let Some(node) = self.store.node(id.as_str()) else {
                break;
            };
            match self.first_present(node.content.iter().rev()) {
                Some(child) => {
                    id = child;
                    depth += 1;
                }
                None => break,
            }
        }
        (id, depth)
    }

    fn accepts(&self, node: &Node, depth: usize) -> bool {
        if self.options.max_depth.is_some_and(|max| depth > max) {
            return false;
        }
        if !self.options.include_types.is_empty() && !self.options.include_types.contains(&node.stype) {
            return false;
        }
        if self.options.exclude_types.contains(&node.stype) {
            return false;
        }
        self.options.filter.as_ref().map_or(true, |filter| filter(node))
    }
}

impl<'a> Iterator for Traversal<'a> {
    type Item = &'a Node;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.finished {
                return None;
            }
            if !self.started {
                self.started = true;
                self.cursor = self.initial();
            }
            let Some((id, depth)) = self.cursor.take() else {
                self.finished = true;
                return None;
            };
            self.cursor = if self.options.reverse {
                self.predecessor(&id, depth)
            } else {
                self.successor(&id, depth)
            };
            let store: &'a NodeStore = self.store;
            let Some(node) = store.node(id.as_str()) else {
                continue;
            };
            self.stats.visited += 1;

            if let Some(range) = &self.options.range {
                let (near, far, include_near, include_far) = if self.options.reverse {
                    (&range.end, &range.start, range.include_end, range.include_start)
                } else {
                    (&range.start, &range.end, range.include_start, range.include_end)
                };
                if id == *far {
                    self.finished = true;
                    if !include_far {
                        return None;
                    }
                } else if id == *near && !include_near {
                    continue;
                }
            }

            if let Some(stop) = &self.options.stop_when {
                if stop(node) {
                    self.finished = true;
                    return None;
                }
            }
            if !self.accepts(node, depth) {
                self.stats.skipped += 1;
                continue;
            }
            self.stats.yielded += 1;
            return Some(node);
        }
    }
}

fn top_ancestor(store: &NodeStore, id: &NodeId) -> Option<NodeId> {
    let mut current = store.node(id.as_str())?;
    let mut steps = 0usize;
    while let Some(parent) = current.parent_id.as_ref().and_then(|p| store.node(p.as_str())) {
        current = parent;
        steps += 1;
        if steps > store.node_count() {
            tracing::warn!(node = %id, "parent chain does not terminate");
            return None;
        }
    }
    Some(current.sid.clone())
}

/// Top ancestor of `id` and the child indices leading down to it.
///
/// Paths compare in document order: an ancestor's path is a prefix of its
/// descendants' and sorts first.
fn tree_position(store: &NodeStore, id: &NodeId) -> Option<(NodeId, Vec<usize>)> {
    let mut current = store.node(id.as_str())?;
    let mut path = Vec::new();
    while let Some(parent_id) = current.parent_id.as_ref() {
        let Some(parent) = store.node(parent_id.as_str()) else {
            break;
        };
        path.push(parent.child_index(current.sid.as_str())?);
        current = parent;
        if path.len() > store.node_count() {
            tracing::warn!(node = %id, "parent chain does not terminate");
            return None;
        }
    }
    path.reverse();
    Some((current.sid.clone(), path))
}

impl NodeStore {
    pub fn traverse<'a>(&'a self, options: TraversalOptions<'a>) -> Traversal<'a> {
        Traversal::new(self, options)
    }

    /// Every node reachable from the root, in document order.
    pub fn document_order(&self) -> Vec<NodeId> {
        self.traverse(TraversalOptions::new()).to_vec()
    }

    /// Descendants of `id` in document order, excluding `id` itself.
    pub fn descendants(&self, id: &str) -> Vec<NodeId> {
        let id = self.resolve_alias(id);
        let mut ids = self
            .traverse(TraversalOptions::new().root(id.clone()))
            .to_vec();
        if ids.first() == Some(&id) {
            ids.remove(0);
        }
        ids
    }

    /// The node after `id` in document order.
    pub fn next_node(&self, id: &str) -> Option<NodeId> {
        self.traverse(TraversalOptions::new().start_from(id))
            .nth(1)
            .map(|node| node.sid.clone())
    }

    /// The node before `id` in document order.
    pub fn previous_node(&self, id: &str) -> Option<NodeId> {
        self.traverse(TraversalOptions::new().start_from(id).reverse())
            .nth(1)
            .map(|node| node.sid.clone())
    }

    /// The next text-bearing node after `id`.
    pub fn next_text_node(&self, id: &str) -> Option<NodeId> {
        let start = self.resolve_alias(id);
        self.traverse(TraversalOptions::new().start_from(start.clone()))
            .find(|node| node.sid != start && node.is_text_bearing())
            .map(|node| node.sid.clone())
    }

    /// The closest text-bearing node before `id`.
    pub fn previous_text_node(&self, id: &str) -> Option<NodeId> {
        let start = self.resolve_alias(id);
        self.traverse(TraversalOptions::new().start_from(start.clone()).reverse())
            .find(|node| node.sid != start && node.is_text_bearing())
            .map(|node| node.sid.clone())
    }
}
