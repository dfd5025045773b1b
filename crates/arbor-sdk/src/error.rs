//! Error types for the Arbor SDK.

use arbor_store::StoreError;
use thiserror::Error;

/// Error type for SDK operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SdkError {
    /// A queued acquisition gave up before it was granted.
    #[error("Lock wait timed out for {owner} after {waited_ms} ms")]
    LockTimeout { owner: String, waited_ms: u64 },

    /// A release presented a lock id that does not belong to the holder.
    #[error("Lock id mismatch: held as {expected}, release presented {presented}")]
    LockMismatch { expected: String, presented: String },

    /// A release arrived while nobody holds the lock.
    #[error("Lock is not held")]
    NotHeld,

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Result type for SDK operations.
pub type Result<T> = std::result::Result<T, SdkError>;
