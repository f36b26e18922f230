//! In-memory backend for tests and embedding.
//!
//! [`MemoryBackend`] keeps every record class in its own `HashMap` behind a
//! `RwLock`. Data is lost when the backend is dropped.

use std::collections::HashMap;
use std::fmt;
use std::io::{Cursor, Read};
use std::sync::{Arc, RwLock};

use hangar_types::{Deploy, DeployLookup, Dev, DevLookup, Entity, Infra, InfraLookup, Lookup};
use tracing::debug;

use crate::blob::{validate_key, BlobData};
use crate::error::StoreResult;
use crate::identity::{assign_id, PutOutcome};
use crate::traits::Backend;

/// One record class. The write lock is held across the whole
/// read-check-assign sequence of a put.
struct Table<E: Entity> {
    rows: RwLock<HashMap<E::Lookup, E>>,
}

impl<E: Entity> Table<E> {
    fn new() -> Self {
        Self {
            rows: RwLock::new(HashMap::new()),
        }
    }

    fn get(&self, lookup: &E::Lookup) -> StoreResult<Option<E>> {
        lookup.validate()?;
        let rows = self.rows.read()?;
        Ok(rows.get(lookup).cloned())
    }

    fn put(&self, record: E) -> StoreResult<E> {
        record.lookup().validate()?;
        let mut rows = self.rows.write()?;
        let (record, outcome) = assign_id(rows.get(record.lookup()), record)?;
        rows.insert(record.lookup().clone(), record.clone());
        debug!(
            kind = E::kind(),
            lookup = %record.lookup(),
            id = ?record.id(),
            created = outcome == PutOutcome::Created,
            "stored record"
        );
        Ok(record)
    }

    fn delete(&self, lookup: &E::Lookup) -> StoreResult<()> {
        lookup.validate()?;
        let mut rows = self.rows.write()?;
        if rows.remove(lookup).is_some() {
            debug!(kind = E::kind(), %lookup, "deleted record");
        }
        Ok(())
    }

    fn len(&self) -> usize {
        self.rows.read().map(|rows| rows.len()).unwrap_or(0)
    }

    fn clear(&self) -> StoreResult<()> {
        self.rows.write()?.clear();
        Ok(())
    }
}

/// In-memory, HashMap-based directory backend.
///
/// Blobs are held as shared buffers, so an open [`BlobData`] keeps reading
/// the bytes it was opened on even if the blob is overwritten meanwhile.
pub struct MemoryBackend {
    blobs: RwLock<HashMap<String, Arc<[u8]>>>,
    infra: Table<Infra>,
    deploys: Table<Deploy>,
    devs: Table<Dev>,
}

impl MemoryBackend {
    /// Create a new empty backend.
    pub fn new() -> Self {
        Self {
            blobs: RwLock::new(HashMap::new()),
            infra: Table::new(),
            deploys: Table::new(),
            devs: Table::new(),
        }
    }

    /// Number of records across all classes (blobs excluded).
    pub fn len(&self) -> usize {
        self.infra.len() + self.deploys.len() + self.devs.len()
    }

    /// Returns `true` if no records and no blobs are stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0 && self.blob_count() == 0
    }

    pub fn blob_count(&self) -> usize {
        self.blobs.read().map(|blobs| blobs.len()).unwrap_or(0)
    }

    /// Remove all records and blobs.
    pub fn clear(&self) -> StoreResult<()> {
        self.blobs.write()?.clear();
        self.infra.clear()?;
        self.deploys.clear()?;
        self.devs.clear()
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl Backend for MemoryBackend {
    fn get_blob(&self, key: &str) -> StoreResult<Option<BlobData>> {
        validate_key(key)?;
        let blobs = self.blobs.read()?;
        Ok(blobs
            .get(key)
            .map(|bytes| BlobData::new(key, Cursor::new(Arc::clone(bytes)))))
    }

    fn put_blob(&self, key: &str, data: &mut dyn Read) -> StoreResult<()> {
        validate_key(key)?;
        // Drain the source before taking the lock.
        let mut buf = Vec::new();
        data.read_to_end(&mut buf)?;
        let len = buf.len();
        self.blobs.write()?.insert(key.to_string(), Arc::from(buf));
        debug!(key, len, "stored blob");
        Ok(())
    }

    fn get_infra(&self, lookup: &InfraLookup) -> StoreResult<Option<Infra>> {
        self.infra.get(lookup)
    }

    fn put_infra(&self, infra: Infra) -> StoreResult<Infra> {
        self.infra.put(infra)
    }

    fn get_deploy(&self, lookup: &DeployLookup) -> StoreResult<Option<Deploy>> {
        self.deploys.get(lookup)
    }

    fn put_deploy(&self, deploy: Deploy) -> StoreResult<Deploy> {
        self.deploys.put(deploy)
    }

    fn get_dev(&self, lookup: &DevLookup) -> StoreResult<Option<Dev>> {
        self.devs.get(lookup)
    }

    fn put_dev(&self, dev: Dev) -> StoreResult<Dev> {
        self.devs.put(dev)
    }

    fn delete_dev(&self, lookup: &DevLookup) -> StoreResult<()> {
        self.devs.delete(lookup)
    }
}

impl fmt::Debug for MemoryBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryBackend")
            .field("infra_count", &self.infra.len())
            .field("deploy_count", &self.deploys.len())
            .field("dev_count", &self.devs.len())
            .field("blob_count", &self.blob_count())
            .finish()
    }
}
