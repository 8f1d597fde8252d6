//! Per-entity attachment storage the ledger persists into.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::error::StorageError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttachmentValue {
    Bytes(Vec<u8>),
    Int(i32),
}

impl AttachmentValue {
    pub fn kind(&self) -> &'static str {
        match self {
            AttachmentValue::Bytes(_) => "bytes",
            AttachmentValue::Int(_) => "int",
        }
    }
}

/// Namespaced key/value storage attached to an entity and persisted with it
/// by the host.
pub trait AttachmentStore {
    fn get(&self, entity_id: &str, key: &str) -> Result<Option<AttachmentValue>, StorageError>;

    fn set(&self, entity_id: &str, key: &str, value: AttachmentValue) -> Result<(), StorageError>;

    fn remove(&self, entity_id: &str, key: &str) -> Result<(), StorageError>;
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryAttachmentStore {
    values: Arc<Mutex<BTreeMap<(String, String), AttachmentValue>>>,
    unavailable: Arc<AtomicBool>,
}

impl InMemoryAttachmentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// While set, every operation fails with [`StorageError::Unavailable`].
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn keys_for(&self, entity_id: &str) -> Vec<String> {
        let values = self.values.lock().expect("lock attachments");
        values
            .keys()
            .filter(|(entity, _)| entity == entity_id)
            .map(|(_, key)| key.clone())
            .collect()
    }

    fn check_available(&self) -> Result<(), StorageError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StorageError::unavailable("in-memory store switched off"));
        }
        Ok(())
    }
}

impl AttachmentStore for InMemoryAttachmentStore {
    fn get(&self, entity_id: &str, key: &str) -> Result<Option<AttachmentValue>, StorageError> {
        self.check_available()?;
        let values = self.values.lock().expect("lock attachments");
        Ok(values
            .get(&(entity_id.to_string(), key.to_string()))
            .cloned())
    }

    fn set(&self, entity_id: &str, key: &str, value: AttachmentValue) -> Result<(), StorageError> {
        self.check_available()?;
        let mut values = self.values.lock().expect("lock attachments");
        values.insert((entity_id.to_string(), key.to_string()), value);
        Ok(())
    }

    fn remove(&self, entity_id: &str, key: &str) -> Result<(), StorageError> {
        self.check_available()?;
        let mut values = self.values.lock().expect("lock attachments");
        values.remove(&(entity_id.to_string(), key.to_string()));
        Ok(())
    }
}
