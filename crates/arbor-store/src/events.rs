//! Operation event channel.
//!
//! Listeners are called synchronously, in subscription order, for every
//! emitted operation. A listener that panics is isolated: the panic is
//! caught and logged, and delivery continues with the next listener.

use arbor_core::AtomicOperation;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

/// Callback receiving every emitted operation.
pub type Listener = Arc<dyn Fn(&AtomicOperation) + Send + Sync>;

/// Observer list with per-listener failure containment.
#[derive(Default)]
pub struct EventChannel {
    listeners: Vec<Listener>,
}

impl EventChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, listener: Listener) {
        self.listeners.push(listener);
    }

    /// Remove a listener by identity. Unknown listeners are ignored.
    pub fn unsubscribe(&mut self, listener: &Listener) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|l| !Arc::ptr_eq(l, listener));
        self.listeners.len() != before
    }

    /// Deliver `op` to every listener. Returns how many returned normally.
    pub fn emit(&self, op: &AtomicOperation) -> usize {
        let mut delivered = 0;
        for listener in &self.listeners {
            match catch_unwind(AssertUnwindSafe(|| listener(op))) {
                Ok(()) => delivered += 1,
                Err(_) => tracing::warn!(
                    op = %op.op_type,
                    node = %op.node_id,
                    "operation listener panicked"
                ),
            }
        }
        delivered
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}

impl std::fmt::Debug for EventChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventChannel")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}
