//! Pluggable storage for the Hangar deployment directory.
//!
//! The directory keeps blobs and three classes of records (infrastructure,
//! deployments, dev environments) behind a single [`Backend`] trait. Storage
//! engines are interchangeable: callers hold a `Box<dyn Backend>` and never
//! observe which engine sits behind it.
//!
//! # Storage Backends
//!
//! - [`MemoryBackend`] -- `HashMap`-based store for tests and embedding
//! - [`FileBackend`] -- one CRC-framed file per record under a root directory
//!
//! # Contract
//!
//! 1. "Not found" is `Ok(None)`, never an error.
//! 2. The backend is the only authority on record identity. The first `put`
//!    for a lookup mints an id; later puts for that lookup keep it.
//! 3. A delete ends the identity. Recreating the record mints a fresh id.
//! 4. Concurrent puts for one lookup mint exactly one id.
//! 5. A failed `put` leaves the previously stored record untouched.
//!
//! Every engine must pass [`conformance::check_backend`].

pub mod blob;
pub mod config;
pub mod conformance;
pub mod error;
pub mod file;
pub mod identity;
pub mod memory;
pub mod traits;

pub use blob::BlobData;
pub use config::{BackendConfig, FileBackendConfig, StoreConfig};
pub use error::{StoreError, StoreResult};
pub use file::FileBackend;
pub use memory::MemoryBackend;
pub use traits::Backend;

pub use hangar_types::{
    Deploy, DeployLookup, DeployState, Dev, DevLookup, DevState, Entity, Infra, InfraLookup,
    InfraState, Lookup, RecordId,
};
