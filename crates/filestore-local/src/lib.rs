//! Local-filesystem storage adapter.
//!
//! [`FileSystemStore`] maps logical file descriptors to plain files under one
//! root directory and implements the [`StorageAdapter`] plugin contract that a
//! file-management layer drives: `get`, `get_stream`, `get_bytes`, `put`,
//! `put_stream`, `del`, `stats` and `watch`.
//!
//! # Layout
//!
//! - [`root`]: resolves configuration into an existing, canonical root
//! - [`naming`]: derives keys from descriptors and avoids collisions
//! - [`store`]: the filesystem-backed object store itself
//! - [`traits`]: the adapter contract
//!
//! # Design Rules
//!
//! 1. The filesystem is the only metadata store; there are no sidecar files.
//! 2. Keys never escape the root and never name a directory.
//! 3. Non-overwriting puts claim their key with create-if-absent, so two puts
//!    never end up sharing a file.
//! 4. Every operation reports its outcome exactly once through its `Result`.
//! 5. Nothing is retried; retry policy belongs to the caller.

pub mod config;
pub mod env;
pub mod error;
pub mod naming;
pub mod root;
pub mod store;
pub mod traits;

pub use config::{StoreConfig, StoreOptions};
pub use env::{EnvProvider, SystemEnv};
pub use error::{StoreError, StoreResult};
pub use naming::{desired_key, KeyNamer};
pub use root::resolve_root;
pub use store::{FileSystemStore, TYPE_NAME};
pub use traits::{ChangeCallback, StorageAdapter};

pub use filestore_types::{
    ByteStream, ChangeEvent, ChangeKind, CopyInfo, FileDescriptor, FileRecord, ObjectKey,
    ObjectStats, PutOptions,
};
pub use filestore_watch::{WatchConfig, WatchError, WatchHandle};
