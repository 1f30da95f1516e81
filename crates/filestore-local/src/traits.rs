use async_trait::async_trait;
use bytes::Bytes;
use filestore_types::{ByteStream, ChangeEvent, FileDescriptor, ObjectKey, ObjectStats, PutOptions};
use filestore_watch::WatchHandle;

use crate::error::StoreResult;

/// Callback receiving the change feed. Returning an error stops the watch.
pub type ChangeCallback = Box<dyn FnMut(ChangeEvent) -> anyhow::Result<()> + Send>;

/// The storage plugin contract a file-management layer drives.
///
/// Descriptor-based operations look up the copy info recorded under
/// [`name`](Self::name) to find the object's key. All implementations must
/// satisfy these invariants:
/// - Every operation reports its outcome exactly once through its `Result`.
/// - `put` and `put_stream` return the key actually written; the caller
///   persists it as copy info.
/// - `del` on a descriptor without copy info for this store succeeds and
///   touches nothing.
/// - No operation retries on failure.
#[async_trait]
pub trait StorageAdapter: Send + Sync {
    /// Store name; also the copy-info namespace on descriptors.
    fn name(&self) -> &str;

    /// Adapter type identifier, e.g. `"storage.filesystem"`.
    fn type_name(&self) -> &'static str;

    /// Whole object for `file`.
    async fn get(&self, file: &dyn FileDescriptor) -> StoreResult<Bytes>;

    /// Lazy stream over the object for `file`.
    async fn get_stream(&self, file: &dyn FileDescriptor) -> StoreResult<ByteStream>;

    /// Bytes `start..end` of the object for `file`.
    async fn get_bytes(&self, file: &dyn FileDescriptor, start: u64, end: u64) -> StoreResult<Bytes>;

    /// Write the descriptor's buffer and return the key used.
    async fn put(&self, file: &dyn FileDescriptor, options: PutOptions) -> StoreResult<ObjectKey>;

    /// Pipe the descriptor's byte stream to storage and return the key used.
    async fn put_stream(&self, file: &dyn FileDescriptor, options: PutOptions) -> StoreResult<ObjectKey>;

    /// Remove the object for `file`.
    async fn del(&self, file: &dyn FileDescriptor) -> StoreResult<()>;

    /// Native metadata for the object at `key`.
    async fn stats(&self, key: &ObjectKey) -> StoreResult<ObjectStats>;

    /// Start reporting changes under the store root. Must be called from
    /// within a tokio runtime.
    fn watch(&self, callback: ChangeCallback) -> StoreResult<WatchHandle>;
}
