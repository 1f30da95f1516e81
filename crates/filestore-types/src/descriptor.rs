use std::collections::BTreeMap;
use std::io;
use std::pin::Pin;

use bytes::Bytes;
use futures::stream::{self, Stream};
use serde::{Deserialize, Serialize};

use crate::key::ObjectKey;

/// Forward-only, finite stream of object bytes.
pub type ByteStream = Pin<Box<dyn Stream<Item = io::Result<Bytes>> + Send>>;

/// Chunk size used when a [`FileRecord`] streams its buffer.
const RECORD_CHUNK_SIZE: usize = 64 * 1024;

/// Per-store record of where a descriptor's bytes were written.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CopyInfo {
    /// Key returned by the store's `put`/`put_stream`.
    pub key: ObjectKey,
}

impl CopyInfo {
    pub fn new(key: ObjectKey) -> Self {
        Self { key }
    }
}

/// Caller-owned identity of a logical file.
///
/// The storage adapter reads the identity fields to derive a candidate key,
/// looks up its own [`CopyInfo`] by store name, and pulls content through
/// [`buffer`](Self::buffer) or [`byte_stream`](Self::byte_stream). It never
/// mutates the descriptor; persisting the returned key is the caller's job.
pub trait FileDescriptor: Send + Sync {
    /// Name of the collection the file belongs to.
    fn collection_name(&self) -> &str;

    /// Collection-unique identifier of the file.
    fn id(&self) -> &str;

    /// Display name, usually the original file name.
    fn name(&self) -> &str;

    /// Copy info recorded for the store called `store_name`, if any.
    fn copy_info(&self, store_name: &str) -> Option<CopyInfo>;

    /// Fresh stream over the file's content.
    fn byte_stream(&self) -> ByteStream;

    /// The file's full content in memory.
    fn buffer(&self) -> Bytes;
}

/// Owned, in-memory [`FileDescriptor`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FileRecord {
    pub collection_name: String,
    pub id: String,
    pub name: String,
    pub data: Bytes,
    copies: BTreeMap<String, CopyInfo>,
}

impl FileRecord {
    pub fn new(
        collection_name: impl Into<String>,
        id: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            collection_name: collection_name.into(),
            id: id.into(),
            name: name.into(),
            ..Default::default()
        }
    }

    /// Attach content.
    pub fn with_data(mut self, data: impl Into<Bytes>) -> Self {
        self.data = data.into();
        self
    }

    /// Record where `store_name` put this file.
    pub fn set_copy_info(&mut self, store_name: impl Into<String>, key: ObjectKey) {
        self.copies.insert(store_name.into(), CopyInfo::new(key));
    }

    /// Forget the copy held by `store_name`.
    pub fn clear_copy_info(&mut self, store_name: &str) -> Option<CopyInfo> {
        self.copies.remove(store_name)
    }
}

impl FileDescriptor for FileRecord {
    fn collection_name(&self) -> &str {
        &self.collection_name
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn copy_info(&self, store_name: &str) -> Option<CopyInfo> {
        self.copies.get(store_name).cloned()
    }

    fn byte_stream(&self) -> ByteStream {
        let data = self.data.clone();
        let chunks: Vec<io::Result<Bytes>> = (0..data.len())
            .step_by(RECORD_CHUNK_SIZE)
            .map(|start| Ok(data.slice(start..(start + RECORD_CHUNK_SIZE).min(data.len()))))
            .collect();
        Box::pin(stream::iter(chunks))
    }

    fn buffer(&self) -> Bytes {
        self.data.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::TryStreamExt;

    #[test]
    fn copy_info_is_per_store() {
        let mut record = FileRecord::new("photos", "42", "cat.png");
        assert!(record.copy_info("disk").is_none());

        record.set_copy_info("disk", ObjectKey::new("photos-42-cat.png").unwrap());
        assert_eq!(
            record.copy_info("disk").unwrap().key.as_str(),
            "photos-42-cat.png"
        );
        assert!(record.copy_info("thumbs").is_none());

        assert!(record.clear_copy_info("disk").is_some());
        assert!(record.copy_info("disk").is_none());
    }

    #[tokio::test]
    async fn byte_stream_yields_whole_buffer_in_chunks() {
        let payload: Vec<u8> = (0..(RECORD_CHUNK_SIZE * 2 + 17)).map(|i| i as u8).collect();
        let record = FileRecord::new("c", "1", "big.bin").with_data(payload.clone());

        let chunks: Vec<Bytes> = record.byte_stream().try_collect().await.unwrap();
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks.concat(), payload);
    }

    #[tokio::test]
    async fn empty_record_streams_nothing() {
        let record = FileRecord::new("c", "1", "empty");
        let chunks: Vec<Bytes> = record.byte_stream().try_collect().await.unwrap();
        assert!(chunks.is_empty());
        assert!(record.buffer().is_empty());
    }
}
