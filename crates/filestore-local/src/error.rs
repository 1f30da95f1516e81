use std::io;

use filestore_types::{ObjectKey, TypeError};
use filestore_watch::WatchError;

/// Errors from storage adapter operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No usable root directory could be determined. Fatal at construction.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// There is no object for the given key or descriptor.
    #[error("object not found: {0}")]
    NotFound(String),

    /// A byte range with `end < start` (or too large to address).
    #[error("invalid byte range: start {start}, end {end}")]
    InvalidRange { start: u64, end: u64 },

    /// A key, usually derived from a descriptor, is not a valid object key.
    #[error("invalid key: {0}")]
    InvalidKey(#[from] TypeError),

    /// Read, write, open, close or unlink failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The change watcher could not be started or stopped cleanly.
    #[error("watch error: {0}")]
    Watch(#[from] WatchError),
}

impl StoreError {
    /// Translate an I/O error on `key`, turning a missing file into
    /// [`StoreError::NotFound`].
    pub(crate) fn at_key(key: &ObjectKey, err: io::Error) -> Self {
        if err.kind() == io::ErrorKind::NotFound {
            Self::NotFound(key.to_string())
        } else {
            Self::Io(err)
        }
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
