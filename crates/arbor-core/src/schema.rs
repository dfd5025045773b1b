//! Validation collaborator interface.
//!
//! The store never interprets schemas itself. When a write asks for
//! validation, the configured [`SchemaValidator`] decides.

use crate::node::Node;
use serde::{Deserialize, Serialize};

/// Outcome of validating a node.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub errors: Vec<String>,
}

impl ValidationResult {
    pub fn ok() -> Self {
        Self {
            valid: true,
            errors: Vec::new(),
        }
    }

    pub fn invalid(errors: Vec<String>) -> Self {
        Self {
            valid: false,
            errors,
        }
    }
}

/// Schema checker consulted on validated writes.
pub trait SchemaValidator: Send + Sync {
    fn validate(&self, node: &Node) -> ValidationResult;
}

impl<F> SchemaValidator for F
where
    F: Fn(&Node) -> ValidationResult + Send + Sync,
{
    fn validate(&self, node: &Node) -> ValidationResult {
        self(node)
    }
}
