//! Record identity assignment shared by the storage engines.
//!
//! Engines call [`assign_id`] while holding whatever guard serializes writes
//! for the record class, so the read-check-assign sequence is atomic.

use hangar_types::{Entity, RecordId};

use crate::error::{StoreError, StoreResult};

/// Whether a put created a record or updated an existing one.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PutOutcome {
    Created,
    Updated,
}

/// Finalize `record` against the currently stored record for its lookup.
///
/// - Nothing stored: mint a fresh id, discarding any id the caller carried.
/// - Stored record: keep its id. A caller-supplied id that differs is an
///   [`StoreError::IdConflict`].
pub fn assign_id<E: Entity>(existing: Option<&E>, mut record: E) -> StoreResult<(E, PutOutcome)> {
    match existing.and_then(|stored| stored.id()) {
        Some(stored) => {
            if let Some(supplied) = record.id() {
                if supplied != stored {
                    return Err(StoreError::IdConflict {
                        kind: E::kind(),
                        expected: stored.clone(),
                        found: supplied.clone(),
                    });
                }
            }
            record.set_id(stored.clone());
            Ok((record, PutOutcome::Updated))
        }
        None => {
            record.set_id(RecordId::generate());
            Ok((record, PutOutcome::Created))
        }
    }
}
