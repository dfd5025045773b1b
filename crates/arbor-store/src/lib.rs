//! # arbor-store
//!
//! Transactional node store for Arbor.
//!
//! This crate provides:
//! - A node store addressed by stable ids, with per-store id generation
//! - Copy-on-write transactions replayed on commit (create, update, move, delete)
//! - A synchronous operation event channel
//! - Transaction-scoped aliases
//! - Range text and mark editing with interval-correct mark adjustment
//! - Text utilities (trim, whitespace, wrap, find, regex replace)
//! - Split and merge of text and block nodes
//! - A lazy, filterable document-order traversal
//!
//! ## Example
//!
//! ```rust,ignore
//! use arbor_store::{NodeStore, TextRange};
//! use arbor_core::{Mark, Node};
//!
//! let mut store = NodeStore::new();
//! let doc = store.create_node(Node::new("doc"))?;
//! let p = store.add_child(doc.as_str(), Node::text_node("paragraph", "Hello"), None)?;
//!
//! store.begin_transaction();
//! store.insert_text(p.as_str(), 5, " World");
//! store.apply_mark(&TextRange::within(p.clone(), 0, 5), &Mark::new("bold"));
//! let ops = store.commit_transaction()?;
//! ```

pub mod alias;
pub mod config;
pub mod error;
pub mod events;
pub mod overlay;
pub mod range;
pub mod split;
pub mod store;
pub mod traversal;
pub mod utilities;

pub use alias::{AliasTable, ALIAS_ATTRIBUTE};
pub use config::{StoreConfig, StoreConfigBuilder};
pub use error::{Result, StoreError};
pub use events::{EventChannel, Listener};
pub use overlay::Overlay;
pub use range::TextRange;
pub use store::NodeStore;
pub use traversal::{NodePredicate, Traversal, TraversalOptions, TraversalRange, TraversalStats};
