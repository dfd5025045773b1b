//! Node identifier generation.

use crate::node::NodeId;
use std::sync::atomic::{AtomicU64, Ordering};
use ulid::Ulid;

/// Issues `"{session}:{counter}"` identifiers.
///
/// Each store owns its own generator. Two generators sharing a session id
/// will issue colliding ids, so sessions default to a fresh ULID.
#[derive(Debug)]
pub struct IdGenerator {
    session_id: String,
    counter: AtomicU64,
}

impl IdGenerator {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            counter: AtomicU64::new(0),
        }
    }

    /// A generator with a random session id.
    pub fn random_session() -> Self {
        Self::new(Ulid::new().to_string())
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn next_id(&self) -> NodeId {
        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        NodeId(format!("{}:{}", self.session_id, n))
    }

    /// Number of ids issued so far.
    pub fn issued(&self) -> u64 {
        self.counter.load(Ordering::SeqCst)
    }
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::random_session()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_monotonic_ids() {
        let gen = IdGenerator::new("s");
        assert_eq!(gen.next_id(), "s:1");
        assert_eq!(gen.next_id(), "s:2");
        assert_eq!(gen.issued(), 2);
    }

    #[test]
    fn test_generators_are_independent() {
        let a = IdGenerator::new("a");
        let b = IdGenerator::new("b");
        a.next_id();
        a.next_id();
        assert_eq!(b.next_id(), "b:1");
    }
}
