//! In-memory object storage using DashMap for concurrent access

use dashmap::DashMap;
use ledger_types::{ObjectId, Slot};
use std::sync::Arc;

use crate::types::RawObject;

/// Thread-safe in-memory object storage
#[derive(Clone, Default)]
pub struct ObjectStore {
    /// Main object storage
    objects: Arc<DashMap<ObjectId, RawObject>>,
    /// Track which slot each object was last modified
    object_slots: Arc<DashMap<ObjectId, Slot>>,
}

impl ObjectStore {
    /// Create a new empty object store
    pub fn new() -> Self {
        Self::default()
    }

    /// Get an object by id
    pub fn get_object(&self, id: &ObjectId) -> Option<RawObject> {
        self.objects.get(id).map(|r| r.value().clone())
    }

    /// Get an object with the slot it was last modified
    pub fn get_object_with_slot(&self, id: &ObjectId) -> Option<(RawObject, Slot)> {
        let object = self.objects.get(id)?;
        let slot = self.object_slots.get(id).map(|s| *s).unwrap_or(0);
        Some((object.value().clone(), slot))
    }

    /// Write object contents, bumping its version
    pub fn store_object(&self, id: ObjectId, data: Vec<u8>, slot: Slot) -> u64 {
        let mut entry = self.objects.entry(id).or_insert_with(|| RawObject {
            id,
            version: 0,
            data: Vec::new(),
        });
        entry.version += 1;
        entry.data = data;
        let version = entry.version;
        drop(entry);

        self.object_slots.insert(id, slot);
        version
    }

    /// Check if an object exists
    pub fn object_exists(&self, id: &ObjectId) -> bool {
        self.objects.contains_key(id)
    }

    /// Get object count
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Check if store is empty
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}
