// Typed errors with thiserror. Navigation failures never leave the engine;
// these cover config parsing and internal slot lookups.

use thiserror::Error;

/// Synchronizer error types.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SyncError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Unknown slot id: {0}")]
    UnknownSlot(String),

    #[error("Slot index {index} out of range for {len} slots")]
    SlotOutOfRange { index: usize, len: usize },

    #[error("Slot {0} has no measured offset")]
    Unmeasured(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        SyncError::Serialization(err.to_string())
    }
}
