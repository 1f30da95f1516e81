//! Change feed for a filestore root.
//!
//! [`ChangeWatcher`] watches a store root recursively through `notify` and
//! turns raw, platform-specific filesystem events into [`ChangeEvent`]s keyed
//! relative to the root. Hidden entries are skipped, bursts of writes to one
//! file are coalesced into a single change, and removals are reported as soon
//! as they are seen.
//!
//! Callbacks run serially on one tokio task. A callback error is fatal to the
//! watch and is handed back through [`WatchHandle::stop`] or
//! [`WatchHandle::finished`].
//!
//! [`ChangeEvent`]: filestore_types::ChangeEvent

pub mod config;
pub mod error;
pub mod normalize;
pub mod watcher;

pub use config::WatchConfig;
pub use error::{WatchError, WatchResult};
pub use normalize::EventNormalizer;
pub use watcher::{ChangeWatcher, WatchHandle};
