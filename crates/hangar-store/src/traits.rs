use std::io::Read;

use hangar_types::{Deploy, DeployLookup, Dev, DevLookup, Infra, InfraLookup};

use crate::blob::BlobData;
use crate::error::StoreResult;

/// Storage backend for the deployment directory.
///
/// All implementations must satisfy these invariants:
/// - `get_*` returns `Ok(None)` when nothing is stored; errors are reserved
///   for faults of the storage medium.
/// - `put_*` creates the record when its lookup is new, minting a non-empty
///   id, and otherwise overwrites the payload while keeping the stored id.
///   The finalized record is returned and equals what a following `get_*`
///   returns.
/// - The create-or-update decision is atomic per lookup: concurrent puts for
///   an unseen lookup mint exactly one id.
/// - A put carrying an id that differs from the stored one fails with
///   [`StoreError::IdConflict`](crate::StoreError::IdConflict). A put
///   carrying an id for a lookup with no stored record is a create and the
///   supplied id is replaced.
/// - Deletes are idempotent, and recreating a deleted record mints a new id.
/// - Lookups with empty components are rejected with
///   [`StoreError::InvalidLookup`](crate::StoreError::InvalidLookup).
pub trait Backend: Send + Sync {
    /// Open the blob stored under `key`.
    ///
    /// Returns `Ok(None)` if no blob exists under `key`.
    fn get_blob(&self, key: &str) -> StoreResult<Option<BlobData>>;

    /// Consume `data` and store it under `key`, replacing any previous blob.
    fn put_blob(&self, key: &str, data: &mut dyn Read) -> StoreResult<()>;

    fn get_infra(&self, lookup: &InfraLookup) -> StoreResult<Option<Infra>>;

    fn put_infra(&self, infra: Infra) -> StoreResult<Infra>;

    fn get_deploy(&self, lookup: &DeployLookup) -> StoreResult<Option<Deploy>>;

    fn put_deploy(&self, deploy: Deploy) -> StoreResult<Deploy>;

    fn get_dev(&self, lookup: &DevLookup) -> StoreResult<Option<Dev>>;

    fn put_dev(&self, dev: Dev) -> StoreResult<Dev>;

    /// Remove the dev record for `lookup`. Succeeds when nothing is stored.
    fn delete_dev(&self, lookup: &DevLookup) -> StoreResult<()>;

    /// Store an in-memory buffer as a blob.
    fn put_blob_bytes(&self, key: &str, data: &[u8]) -> StoreResult<()> {
        let mut reader = data;
        self.put_blob(key, &mut reader)
    }
}
