//! Nodes of the document tree.

use crate::mark::Mark;
use crate::text::char_len;
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;

/// String-keyed attribute bag.
pub type Attributes = serde_json::Map<String, serde_json::Value>;

/// Stable identifier of a node.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Borrow<str> for NodeId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for NodeId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for NodeId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for NodeId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&NodeId> for NodeId {
    fn from(id: &NodeId) -> Self {
        id.clone()
    }
}

impl PartialEq<str> for NodeId {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for NodeId {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// A vertex of the document tree.
///
/// A node is "text-bearing" when `text` is present, regardless of `stype`.
/// `content` lists child ids in document order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub sid: NodeId,
    pub stype: String,
    #[serde(default, skip_serializing_if = "Attributes::is_empty")]
    pub attributes: Attributes,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub content: Vec<NodeId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<NodeId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub marks: Vec<Mark>,
}

impl Node {
    /// A node with no id yet; the store assigns one on creation.
    pub fn new(stype: impl Into<String>) -> Self {
        Self {
            sid: NodeId::default(),
            stype: stype.into(),
            attributes: Attributes::new(),
            text: None,
            content: Vec::new(),
            parent_id: None,
            marks: Vec::new(),
        }
    }

    /// A text-bearing node.
    pub fn text_node(stype: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(stype).with_text(text)
    }

    pub fn with_id(mut self, id: impl Into<NodeId>) -> Self {
        self.sid = id.into();
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn with_mark(mut self, mark: Mark) -> Self {
        self.marks.push(mark);
        self
    }

    pub fn with_content(mut self, content: Vec<NodeId>) -> Self {
        self.content = content;
        self
    }

    pub fn is_text_bearing(&self) -> bool {
        self.text.is_some()
    }

    /// The text payload, or `""` when the node carries none.
    pub fn text_str(&self) -> &str {
        self.text.as_deref().unwrap_or("")
    }

    /// Text length in chars.
    pub fn text_len(&self) -> usize {
        char_len(self.text_str())
    }

    pub fn child_index(&self, child: &str) -> Option<usize> {
        self.content.iter().position(|c| c == child)
    }
}

/// A node to create together with its descendants.
///
/// On the wire the children travel as embedded objects under `content`; the
/// store flattens them into id lists on creation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NewNode {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sid: Option<NodeId>,
    pub stype: String,
    #[serde(default, skip_serializing_if = "Attributes::is_empty")]
    pub attributes: Attributes,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub marks: Vec<Mark>,
    #[serde(default, rename = "content", skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<NewNode>,
}

impl NewNode {
    pub fn new(stype: impl Into<String>) -> Self {
        Self {
            sid: None,
            stype: stype.into(),
            attributes: Attributes::new(),
            text: None,
            marks: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn text_node(stype: impl Into<String>, text: impl Into<String>) -> Self {
        let mut node = Self::new(stype);
        node.text = Some(text.into());
        node
    }

    pub fn with_id(mut self, id: impl Into<NodeId>) -> Self {
        self.sid = Some(id.into());
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn with_mark(mut self, mark: Mark) -> Self {
        self.marks.push(mark);
        self
    }

    pub fn with_child(mut self, child: NewNode) -> Self {
        self.children.push(child);
        self
    }

    /// Number of nodes in this tree, including the root.
    pub fn size(&self) -> usize {
        1 + self.children.iter().map(NewNode::size).sum::<usize>()
    }
}

/// A partial update to a node.
///
/// Fields left as `None` are untouched. `attributes` are merged key by key
/// into the existing bag; every other field replaces.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stype: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attributes: Option<Attributes>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marks: Option<Vec<Mark>>,
}

impl NodeUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn marks(mut self, marks: Vec<Mark>) -> Self {
        self.marks = Some(marks);
        self
    }

    pub fn attributes(mut self, attributes: Attributes) -> Self {
        self.attributes = Some(attributes);
        self
    }

    pub fn attribute(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.attributes
            .get_or_insert_with(Attributes::new)
            .insert(key.into(), value.into());
        self
    }

    pub fn stype(mut self, stype: impl Into<String>) -> Self {
        self.stype = Some(stype.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.stype.is_none() && self.text.is_none() && self.attributes.is_none() && self.marks.is_none()
    }

    /// Merge this patch into `node`.
    pub fn apply_to(&self, node: &mut Node) {
        if let Some(stype) = &self.stype {
            node.stype = stype.clone();
        }
        if let Some(text) = &self.text {
            node.text = Some(text.clone());
        }
        if let Some(attributes) = &self.attributes {
            for (key, value) in attributes {
                node.attributes.insert(key.clone(), value.clone());
            }
        }
        if let Some(marks) = &self.marks {
            node.marks = marks.clone();
        }
    }

    /// JSON form carried as the `data` of an update operation.
    pub fn to_data(&self) -> Option<serde_json::Value> {
        serde_json::to_value(self).ok()
    }

    pub fn from_data(data: &serde_json::Value) -> serde_json::Result<Self> {
        Self::deserialize(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_node_json_shape() {
        let node = Node::text_node("text", "Hi")
            .with_id("s:1")
            .with_mark(Mark::ranged("bold", 0, 2));
        let value = serde_json::to_value(&node).unwrap();
        assert_eq!(
            value,
            json!({
                "sid": "s:1",
                "stype": "text",
                "text": "Hi",
                "marks": [{"stype": "bold", "range": [0, 2]}]
            })
        );

        let back: Node = serde_json::from_value(value).unwrap();
        assert_eq!(back, node);
    }

    #[test]
    fn test_update_merges_attributes_one_level() {
        let mut node = Node::new("p")
            .with_attribute("align", "left")
            .with_attribute("indent", 1);
        let patch = NodeUpdate::new().attribute("align", "right").text("x");
        patch.apply_to(&mut node);

        assert_eq!(node.attributes["align"], json!("right"));
        assert_eq!(node.attributes["indent"], json!(1));
        assert_eq!(node.text.as_deref(), Some("x"));
    }

    #[test]
    fn test_update_data_roundtrip() {
        let patch = NodeUpdate::new().text("Hello World");
        let data = patch.to_data().unwrap();
        assert_eq!(data, json!({"text": "Hello World"}));
        assert_eq!(NodeUpdate::from_data(&data).unwrap(), patch);
    }

    #[test]
    fn test_new_node_children_travel_as_content() {
        let tree: NewNode = serde_json::from_value(json!({
            "stype": "paragraph",
            "content": [{"stype": "text", "text": "a"}, {"stype": "text", "text": "b"}]
        }))
        .unwrap();
        assert_eq!(tree.children.len(), 2);
        assert_eq!(tree.size(), 3);
    }

    #[test]
    fn test_text_len_counts_chars() {
        let node = Node::text_node("text", "ünïcode");
        assert_eq!(node.text_len(), 7);
        assert!(node.is_text_bearing());
        assert!(!Node::new("doc").is_text_bearing());
    }
}
