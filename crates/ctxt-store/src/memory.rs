use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::sync::RwLock;

use crate::{BlobStore, StoreError, StoreResult, validate_id};

/// Process-local store for tests and embedding.
#[derive(Default)]
pub struct MemoryBlobStore {
    blobs: RwLock<BTreeMap<String, Vec<u8>>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BlobStore for MemoryBlobStore {
    fn get(&self, id: &str) -> StoreResult<Option<Vec<u8>>> {
        validate_id(id)?;
        let blobs = self.blobs.read().map_err(|_| StoreError::Poisoned)?;
        Ok(blobs.get(id).cloned())
    }

    fn put(&self, id: &str, bytes: &[u8]) -> StoreResult<()> {
        validate_id(id)?;
        let mut blobs = self.blobs.write().map_err(|_| StoreError::Poisoned)?;
        blobs.insert(id.to_string(), bytes.to_vec());
        Ok(())
    }

    fn put_new(&self, id: &str, bytes: &[u8]) -> StoreResult<bool> {
        validate_id(id)?;
        let mut blobs = self.blobs.write().map_err(|_| StoreError::Poisoned)?;
        match blobs.entry(id.to_string()) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(slot) => {
                slot.insert(bytes.to_vec());
                Ok(true)
            }
        }
    }

    fn list(&self) -> StoreResult<Vec<String>> {
        let blobs = self.blobs.read().map_err(|_| StoreError::Poisoned)?;
        Ok(blobs.keys().cloned().collect())
    }
}
