//! Foundation types for the Hangar deployment directory.
//!
//! The directory persists the records a deployment tool needs to remember
//! between runs: which infrastructure exists, which applications have been
//! deployed onto it, and which local development environments are running.
//! Every storage engine in `hangar-store` speaks in terms of these types.
//!
//! # Key Types
//!
//! - [`InfraLookup`], [`DeployLookup`], [`DevLookup`] — Typed composite keys
//! - [`Infra`], [`Deploy`], [`Dev`] — Directory records
//! - [`RecordId`] — Opaque, backend-assigned record identity
//! - [`Entity`] — Common surface over all record classes

pub mod error;
pub mod id;
pub mod lookup;
pub mod record;

pub use error::{Result, TypeError};
pub use id::RecordId;
pub use lookup::{DeployLookup, DevLookup, InfraLookup, Lookup};
pub use record::{Deploy, DeployState, Dev, DevState, Entity, Infra, InfraState};
