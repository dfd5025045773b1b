//! Text utilities built on the range engine.
//!
//! Each utility computes its result as one or more replacements and writes
//! it through the same mark arithmetic as direct edits. Writes whose output
//! equals the current text and marks are dropped, so re-running a utility on
//! its own output emits nothing.

use crate::error::Result;
use crate::range::TextRange;
use crate::store::NodeStore;
use arbor_core::interval::{delete_marks, replace_marks};
use arbor_core::text::{char_len, slice, splice};
use arbor_core::NodeId;
use regex::Regex;

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

impl NodeStore {
    fn text_node_parts(&self, node_id: &str) -> Option<(NodeId, String, Vec<arbor_core::Mark>)> {
        let node = self.node(node_id).filter(|n| n.is_text_bearing())?;
        Some((node.sid.clone(), node.text_str().to_string(), node.marks.clone()))
    }

    /// Strip leading and trailing whitespace.
    pub fn trim_text(&mut self, node_id: &str) -> bool {
        let Some((id, text, marks)) = self.text_node_parts(node_id) else {
            return false;
        };
        let len = char_len(&text);
        let leading = text.chars().take_while(|c| c.is_whitespace()).count();
        if leading == len {
            return len > 0 && self.write_text(&id, String::new(), delete_marks(&marks, 0, len));
        }
        let trailing = text.chars().rev().take_while(|c| c.is_whitespace()).count();
        if leading == 0 && trailing == 0 {
            return false;
        }

        let marks = delete_marks(&marks, len - trailing, len);
        let marks = delete_marks(&marks, 0, leading);
        let trimmed = slice(&text, leading, len - trailing).to_string();
        self.write_text(&id, trimmed, marks)
    }

    /// Collapse every whitespace run to a single space.
    pub fn normalize_whitespace(&mut self, node_id: &str) -> bool {
        let Some((id, text, mut marks)) = self.text_node_parts(node_id) else {
            return false;
        };

        let chars: Vec<char> = text.chars().collect();
        let mut runs = Vec::new();
        let mut i = 0;
        while i < chars.len() {
            if !chars[i].is_whitespace() {
                i += 1;
                continue;
            }
            let start = i;
            while i < chars.len() && chars[i].is_whitespace() {
                i += 1;
            }
            if i - start > 1 || chars[start] != ' ' {
                runs.push((start, i));
            }
        }
        if runs.is_empty() {
            return false;
        }

        let mut out = text;
        for &(start, end) in runs.iter().rev() {
            out = splice(&out, start, end, " ");
            marks = replace_marks(&marks, start, end, 1);
        }
        self.write_text(&id, out, marks)
    }

    /// Surround `range` with `prefix` and `suffix`.
    pub fn wrap_text(&mut self, range: &TextRange, prefix: &str, suffix: &str) -> bool {
        if prefix.is_empty() && suffix.is_empty() {
            return false;
        }
        if range.start_node_id == range.end_node_id && range.start_offset > range.end_offset {
            return false;
        }
        let valid = |store: &NodeStore, id: &NodeId, offset: usize| {
            store
                .node(id.as_str())
                .is_some_and(|n| n.is_text_bearing() && offset <= n.text_len())
        };
        if !valid(&*self, &range.start_node_id, range.start_offset)
            || !valid(&*self, &range.end_node_id, range.end_offset)
        {
            return false;
        }

        // suffix first so the start offset stays valid
        let mut changed = false;
        if !suffix.is_empty() {
            changed |= self.insert_text(range.end_node_id.as_str(), range.end_offset, suffix);
        }
        if !prefix.is_empty() {
            changed |= self.insert_text(range.start_node_id.as_str(), range.start_offset, prefix);
        }
        changed
    }

    /// Remove `prefix` from the start and `suffix` from the end of `range`
    /// when both are present.
    pub fn unwrap_text(&mut self, range: &TextRange, prefix: &str, suffix: &str) -> bool {
        let plen = char_len(prefix);
        let slen = char_len(suffix);
        if plen == 0 && slen == 0 {
            return false;
        }
        let (Some(start), Some(end)) = (
            self.node(range.start_node_id.as_str()),
            self.node(range.end_node_id.as_str()),
        ) else {
            return false;
        };
        let (so, eo) = (range.start_offset, range.end_offset);
        if so + plen > start.text_len() || eo < slen || eo > end.text_len() {
            return false;
        }
        if start.sid == end.sid && so + plen > eo - slen {
            return false;
        }
        if slice(start.text_str(), so, so + plen) != prefix || slice(end.text_str(), eo - slen, eo) != suffix {
            return false;
        }
        let (start_id, end_id) = (start.sid.clone(), end.sid.clone());

        if slen > 0 {
            self.delete_text(&TextRange::within(end_id, eo - slen, eo));
        }
        if plen > 0 {
            self.delete_text(&TextRange::within(start_id, so, so + plen));
        }
        true
    }

    /// First occurrence of `query` in document order.
    pub fn find_text(&self, query: &str) -> Option<TextRange> {
        if query.is_empty() {
            return None;
        }
        let qlen = char_len(query);
        self.document_order().into_iter().find_map(|id| {
            let node = self.node(id.as_str()).filter(|n| n.is_text_bearing())?;
            let byte = node.text_str().find(query)?;
            let start = char_len(&node.text_str()[..byte]);
            Some(TextRange::within(id, start, start + qlen))
        })
    }

    /// Every non-overlapping occurrence of `query` in document order.
    pub fn find_all_text(&self, query: &str) -> Vec<TextRange> {
        if query.is_empty() {
            return Vec::new();
        }
        let qlen = char_len(query);
        let mut found = Vec::new();
        for id in self.document_order() {
            let Some(node) = self.node(id.as_str()).filter(|n| n.is_text_bearing()) else {
                continue;
            };
            let text = node.text_str();
            for (byte, _) in text.match_indices(query) {
                let start = char_len(&text[..byte]);
                found.push(TextRange::within(id.clone(), start, start + qlen));
            }
        }
        found
    }

    /// Replace every match of `pattern` in one node. `replacement` may
    /// reference capture groups (`$1`, `${name}`). Empty matches are
    /// ignored. Returns the number of matches rewritten.
    pub fn replace_matches(&mut self, node_id: &str, pattern: &str, replacement: &str) -> Result<usize> {
        let regex = Regex::new(pattern)?;
        Ok(self.replace_regex_in_node(node_id, &regex, replacement))
    }

    /// [`replace_matches`](Self::replace_matches) over every text-bearing
    /// node of the document.
    pub fn replace_all_matches(&mut self, pattern: &str, replacement: &str) -> Result<usize> {
        let regex = Regex::new(pattern)?;
        let mut total = 0;
        for id in self.document_order() {
            total += self.replace_regex_in_node(id.as_str(), &regex, replacement);
        }
        Ok(total)
    }

    fn replace_regex_in_node(&mut self, node_id: &str, regex: &Regex, replacement: &str) -> usize {
        let Some((id, source, mut marks)) = self.text_node_parts(node_id) else {
            return 0;
        };

        let mut edits = Vec::new();
        for caps in regex.captures_iter(&source) {
            let Some(m) = caps.get(0) else {
                continue;
            };
            if m.as_str().is_empty() {
                continue;
            }
            let mut expanded = String::new();
            caps.expand(replacement, &mut expanded);
            if expanded != m.as_str() {
                edits.push((m.start(), m.end(), expanded));
            }
        }
        if edits.is_empty() {
            return 0;
        }

        let mut text = source.clone();
        for (byte_start, byte_end, expanded) in edits.iter().rev() {
            let start = char_len(&source[..*byte_start]);
            let end = start + char_len(&source[*byte_start..*byte_end]);
            marks = replace_marks(&marks, start, end, char_len(expanded));
            text.replace_range(*byte_start..*byte_end, expanded);
        }
        self.write_text(&id, text, marks);
        edits.len()
    }

    /// The word (alphanumerics and `_`) around `offset`. Collapsed when the
    /// offset touches no word.
    pub fn expand_to_word(&self, node_id: &str, offset: usize) -> Option<TextRange> {
        let node = self.node(node_id).filter(|n| n.is_text_bearing())?;
        let chars: Vec<char> = node.text_str().chars().collect();
        if offset > chars.len() {
            return None;
        }
        let mut start = offset;
        while start > 0 && is_word_char(chars[start - 1]) {
            start -= 1;
        }
        let mut end = offset;
        while end < chars.len() && is_word_char(chars[end]) {
            end += 1;
        }
        Some(TextRange::within(node.sid.clone(), start, end))
    }

    /// The line around `offset`, excluding its newline.
    pub fn expand_to_line(&self, node_id: &str, offset: usize) -> Option<TextRange> {
        let node = self.node(node_id).filter(|n| n.is_text_bearing())?;
        let chars: Vec<char> = node.text_str().chars().collect();
        if offset > chars.len() {
            return None;
        }
        let start = chars[..offset]
            .iter()
            .rposition(|c| *c == '\n')
            .map_or(0, |i| i + 1);
        let end = chars[offset..]
            .iter()
            .position(|c| *c == '\n')
            .map_or(chars.len(), |i| offset + i);
        Some(TextRange::within(node.sid.clone(), start, end))
    }
}
