//! Snapshot store port
//!
//! A swappable key-value store used as a write-through cache of the last
//! known conversation list. Absence of a store degrades to "no seed".

use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid key: {0}")]
    InvalidKey(String),
}

pub trait SnapshotStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<Value>, StoreError>;

    fn set(&self, key: &str, value: Value) -> Result<(), StoreError>;

    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

/// No-op store: never returns a seed, silently drops writes.
pub struct NoSnapshotStore;

impl SnapshotStore for NoSnapshotStore {
    fn get(&self, _key: &str) -> Result<Option<Value>, StoreError> {
        Ok(None)
    }

    fn set(&self, _key: &str, _value: Value) -> Result<(), StoreError> {
        Ok(())
    }

    fn remove(&self, _key: &str) -> Result<(), StoreError> {
        Ok(())
    }
}
