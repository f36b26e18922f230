use hangar_types::{RecordId, TypeError};

/// Errors from backend operations.
///
/// A missing record or blob is not an error; lookups return `Ok(None)`.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// I/O error from the underlying storage medium.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Stored data failed an integrity check.
    #[error("corrupt data at {location}: {reason}")]
    Corrupt { location: String, reason: String },

    /// The lookup has an empty component.
    #[error("invalid lookup: {0}")]
    InvalidLookup(#[from] TypeError),

    /// Blob keys must be non-empty.
    #[error("blob key must not be empty")]
    InvalidBlobKey,

    /// The caller supplied an id that differs from the one stored for the
    /// lookup.
    #[error("{kind} id conflict: stored {expected}, caller supplied {found}")]
    IdConflict {
        kind: &'static str,
        expected: RecordId,
        found: RecordId,
    },

    /// A lock guarding backend state was poisoned by a panicking writer.
    #[error("lock poisoned: {0}")]
    LockPoisoned(String),

    /// Backend configuration could not be loaded.
    #[error("configuration error: {0}")]
    Config(String),
}

impl<T> From<std::sync::PoisonError<T>> for StoreError {
    fn from(e: std::sync::PoisonError<T>) -> Self {
        Self::LockPoisoned(e.to_string())
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
