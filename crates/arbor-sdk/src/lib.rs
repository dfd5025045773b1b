//! Arbor SDK - async editing on top of the Arbor node store
//!
//! The store itself is synchronous. This crate adds the pieces needed to
//! share one store between concurrent tasks:
//!
//! - [`lock`] - A FIFO mutation lock with per-request wait timeouts and a
//!   safety timeout on every grant
//! - [`editor`] - An editor service running each batch as a locked
//!   transaction, with operations fanned out over a broadcast channel
//! - [`config`] - Lock and editor configuration
//! - [`error`] - Error types
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use arbor_core::Node;
//! use arbor_sdk::Editor;
//! use arbor_store::NodeStore;
//!
//! let mut store = NodeStore::new();
//! let doc = store.create_node(Node::new("doc"))?;
//! let editor = Editor::new(store);
//!
//! let (id, ops) = editor
//!     .batch("alice", |store| {
//!         store.add_child(doc.as_str(), Node::text_node("paragraph", "Hello"), None)
//!     })
//!     .await?;
//! ```

pub mod config;
pub mod editor;
pub mod error;
pub mod lock;

pub use config::{EditorConfig, LockConfig, LockConfigBuilder};
pub use editor::Editor;
pub use error::{Result, SdkError};
pub use lock::{LockHolder, LockStats, MutationLock, QueuedRequest};
