//! Transaction-scoped symbolic names for node ids.
//!
//! Aliases let a batch of edits refer to nodes it has not created yet (or
//! whose generated ids it does not know) by a name of its choosing. The table
//! lives inside the overlay and is cleared with it on commit and rollback.

use crate::error::{Result, StoreError};
use arbor_core::{Attributes, NodeId};
use std::collections::HashMap;

/// Attribute key that binds an alias when a node is written.
pub const ALIAS_ATTRIBUTE: &str = "$alias";

/// Alias → node id bindings.
#[derive(Clone, Debug, Default)]
pub struct AliasTable {
    bindings: HashMap<String, NodeId>,
}

impl AliasTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `alias` to `id`. Rebinding to the same id is a no-op; rebinding
    /// to a different id fails.
    pub fn bind(&mut self, alias: impl Into<String>, id: NodeId) -> Result<()> {
        let alias = alias.into();
        match self.bindings.get(&alias) {
            Some(existing) if *existing == id => Ok(()),
            Some(existing) => Err(StoreError::invariant(format!(
                "alias '{}' is already bound to {}",
                alias, existing
            ))),
            None => {
                self.bindings.insert(alias, id);
                Ok(())
            }
        }
    }

    pub fn get(&self, alias: &str) -> Option<&NodeId> {
        self.bindings.get(alias)
    }

    pub fn clear(&mut self) {
        self.bindings.clear();
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

/// Remove the reserved alias attribute from `attributes`, returning its value.
pub fn take_alias(attributes: &mut Attributes) -> Option<String> {
    match attributes.remove(ALIAS_ATTRIBUTE)? {
        serde_json::Value::String(alias) => Some(alias),
        other => Some(other.to_string()),
    }
}
