//! Text annotations (bold, links, comments, ...) attached to a text-bearing node.

use crate::node::Attributes;
use serde::{Deserialize, Serialize};

/// A typed annotation over the owning node's text.
///
/// `range` is `[start, end)` in chars. A mark without a range covers the
/// whole text, whatever its current length.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Mark {
    /// Mark type tag (`"bold"`, `"link"`, ...).
    pub stype: String,
    /// Covered span, absent for whole-text marks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<(usize, usize)>,
    /// Extra data (link target, comment author, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attrs: Option<Attributes>,
}

impl Mark {
    /// A whole-text mark.
    pub fn new(stype: impl Into<String>) -> Self {
        Self {
            stype: stype.into(),
            range: None,
            attrs: None,
        }
    }

    /// A mark over `[start, end)`.
    pub fn ranged(stype: impl Into<String>, start: usize, end: usize) -> Self {
        Self {
            stype: stype.into(),
            range: Some((start, end)),
            attrs: None,
        }
    }

    pub fn with_attrs(mut self, attrs: Attributes) -> Self {
        self.attrs = Some(attrs);
        self
    }

    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.attrs
            .get_or_insert_with(Attributes::new)
            .insert(key.into(), value.into());
        self
    }

    /// Copy of this mark over a different span.
    pub fn with_range(&self, start: usize, end: usize) -> Self {
        Self {
            stype: self.stype.clone(),
            range: Some((start, end)),
            attrs: self.attrs.clone(),
        }
    }

    /// Resolved `[start, end)` against a text of `len` chars.
    pub fn bounds(&self, len: usize) -> (usize, usize) {
        match self.range {
            Some((s, e)) => (s.min(len), e.min(len)),
            None => (0, len),
        }
    }

    /// Whether `other` has the same type and attributes.
    pub fn same_kind(&self, other: &Mark) -> bool {
        self.stype == other.stype && self.attrs == other.attrs
    }

    pub fn is_whole_text(&self) -> bool {
        self.range.is_none()
    }
}
