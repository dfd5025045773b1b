// File: `crates/arbor-core/src/lib.rs`
//! Core types for the Arbor document store.
//!
//! - [`node`]: nodes, node ids, creation trees and update patches
//! - [`mark`]: text annotations
//! - [`interval`]: mark range arithmetic under text mutation
//! - [`operation`]: atomic operation records
//! - [`id`]: identifier generation
//! - [`schema`]: the validation collaborator interface
//! - [`text`]: char-offset string helpers

pub mod id;
pub mod interval;
pub mod mark;
pub mod node;
pub mod operation;
pub mod schema;
pub mod text;

pub use id::IdGenerator;
pub use mark::Mark;
pub use node::{Attributes, NewNode, Node, NodeId, NodeUpdate};
pub use operation::{now_millis, AtomicOperation, OperationType};
pub use schema::{SchemaValidator, ValidationResult};
