use std::io::{self, SeekFrom};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use filestore_types::{
    ByteStream, FileDescriptor, ObjectKey, ObjectStats, PutOptions,
};
use filestore_watch::{ChangeWatcher, WatchHandle};
use futures::{stream, TryStreamExt};
use tokio::fs::{self, File};
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};
use tokio_util::io::{ReaderStream, StreamReader};
use tracing::{debug, info, warn};

use crate::config::StoreConfig;
use crate::env::{EnvProvider, SystemEnv};
use crate::error::{StoreError, StoreResult};
use crate::naming::{desired_key, KeyNamer};
use crate::root::resolve_root;
use crate::traits::{ChangeCallback, StorageAdapter};

/// Adapter type identifier reported by [`FileSystemStore`].
pub const TYPE_NAME: &str = "storage.filesystem";

/// Read size for object streams.
const STREAM_CHUNK_SIZE: usize = 64 * 1024;

/// Storage adapter that keeps each object as a plain file under one root.
///
/// The root is resolved and created once at construction. Keys map directly
/// to paths below it. There is no in-process locking: concurrent operations
/// rely on the filesystem's per-file atomicity, and non-overwriting puts
/// claim distinct keys through [`KeyNamer::reserve`].
#[derive(Debug)]
pub struct FileSystemStore {
    name: String,
    root: PathBuf,
    namer: KeyNamer,
    watcher: ChangeWatcher,
}

impl FileSystemStore {
    /// Open the store called `name` using the process environment.
    pub fn open(name: impl Into<String>, config: impl Into<StoreConfig>) -> StoreResult<Self> {
        Self::open_with_env(name, config, &SystemEnv)
    }

    /// Open the store called `name`, resolving its root against `env`.
    pub fn open_with_env(
        name: impl Into<String>,
        config: impl Into<StoreConfig>,
        env: &dyn EnvProvider,
    ) -> StoreResult<Self> {
        let name = name.into();
        let config = config.into();
        let watch = config.watch_config();
        watch
            .validate()
            .map_err(|e| StoreError::Configuration(e.to_string()))?;
        let root = resolve_root(&name, &config, env)?;

        info!(store = %name, root = %root.display(), "filesystem store mounted");

        Ok(Self {
            namer: KeyNamer::new(root.clone()),
            watcher: ChangeWatcher::new(root.clone(), watch),
            name,
            root,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn namer(&self) -> &KeyNamer {
        &self.namer
    }

    /// Absolute path of `key`.
    pub fn path_of(&self, key: &ObjectKey) -> PathBuf {
        key.to_path(&self.root)
    }

    /// Read the whole object at `key`.
    pub async fn read(&self, key: &ObjectKey) -> StoreResult<Bytes> {
        let data = fs::read(self.path_of(key))
            .await
            .map_err(|e| StoreError::at_key(key, e))?;
        Ok(Bytes::from(data))
    }

    /// Lazy stream over the object at `key`.
    ///
    /// The file is opened on first poll, so a missing object shows up as the
    /// stream's first item rather than as an error here.
    pub fn open_stream(&self, key: &ObjectKey) -> ByteStream {
        let path = self.path_of(key);
        let stream = stream::once(async move { File::open(path).await })
            .map_ok(|file| ReaderStream::with_capacity(file, STREAM_CHUNK_SIZE))
            .try_flatten();
        Box::pin(stream)
    }

    /// Read bytes `start..end` of the object at `key`.
    ///
    /// Opens, seeks, reads exactly `end - start` bytes and closes, without
    /// loading the rest of the object. Fails with [`StoreError::InvalidRange`]
    /// if `end < start` and with an `UnexpectedEof` I/O error if the object
    /// is shorter than `end`. The handle is closed by dropping it, so an
    /// error from the close itself is never observed and cannot fail a read
    /// that already completed.
    pub async fn read_range(&self, key: &ObjectKey, start: u64, end: u64) -> StoreResult<Bytes> {
        if end < start {
            return Err(StoreError::InvalidRange { start, end });
        }
        let len = usize::try_from(end - start).map_err(|_| StoreError::InvalidRange { start, end })?;

        let mut file = File::open(self.path_of(key))
            .await
            .map_err(|e| StoreError::at_key(key, e))?;

        let size = file.metadata().await?.len();
        if end > size {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("range {start}..{end} is past the end of {key} ({size} bytes)"),
            )
            .into());
        }

        let mut buf = vec![0u8; len];
        file.seek(SeekFrom::Start(start)).await?;
        file.read_exact(&mut buf).await?;
        drop(file);

        Ok(Bytes::from(buf))
    }

    /// Write `data` under `desired` (or the next free key) in one call.
    pub async fn write(&self, desired: &ObjectKey, data: &[u8], options: PutOptions) -> StoreResult<ObjectKey> {
        let (key, mut file) = self.namer.reserve(desired, options.overwrite).await?;
        file.write_all(data).await?;
        file.flush().await?;

        debug!(store = %self.name, key = %key, size = data.len(), "object written");
        Ok(key)
    }

    /// Pipe `input` into a file under `desired` (or the next free key).
    ///
    /// Completes once the output is flushed. On failure the partially
    /// written file stays in place unless `options.remove_partial` is set.
    pub async fn write_stream(
        &self,
        desired: &ObjectKey,
        input: ByteStream,
        options: PutOptions,
    ) -> StoreResult<ObjectKey> {
        let (key, file) = self.namer.reserve(desired, options.overwrite).await?;

        match pipe(input, file).await {
            Ok(written) => {
                debug!(store = %self.name, key = %key, size = written, "object streamed");
                Ok(key)
            }
            Err(e) => {
                if options.remove_partial {
                    if let Err(rm) = fs::remove_file(self.path_of(&key)).await {
                        warn!(key = %key, error = %rm, "failed to remove partial object");
                    }
                } else {
                    debug!(key = %key, "leaving partial object after failed stream");
                }
                Err(e.into())
            }
        }
    }

    /// Unlink the object at `key`.
    pub async fn remove(&self, key: &ObjectKey) -> StoreResult<()> {
        fs::remove_file(self.path_of(key)).await?;
        debug!(store = %self.name, key = %key, "object removed");
        Ok(())
    }

    /// Filesystem metadata for the object at `key`.
    pub async fn stat(&self, key: &ObjectKey) -> StoreResult<ObjectStats> {
        let meta = fs::metadata(self.path_of(key))
            .await
            .map_err(|e| StoreError::at_key(key, e))?;
        if meta.is_dir() {
            return Err(StoreError::NotFound(key.to_string()));
        }
        Ok(ObjectStats::from_metadata(&meta)?)
    }

    /// Key this store recorded on `file`, or `NotFound`.
    fn copy_key(&self, file: &dyn FileDescriptor) -> StoreResult<ObjectKey> {
        file.copy_info(&self.name).map(|info| info.key).ok_or_else(|| {
            StoreError::NotFound(format!(
                "{}/{} has no copy in store {}",
                file.collection_name(),
                file.id(),
                self.name
            ))
        })
    }
}

async fn pipe(input: ByteStream, mut file: File) -> io::Result<u64> {
    let mut reader = StreamReader::new(input);
    let written = tokio::io::copy(&mut reader, &mut file).await?;
    file.flush().await?;
    Ok(written)
}

#[async_trait]
impl StorageAdapter for FileSystemStore {
    fn name(&self) -> &str {
        &self.name
    }

    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    async fn get(&self, file: &dyn FileDescriptor) -> StoreResult<Bytes> {
        let key = self.copy_key(file)?;
        self.read(&key).await
    }

    async fn get_stream(&self, file: &dyn FileDescriptor) -> StoreResult<ByteStream> {
        let key = self.copy_key(file)?;
        Ok(self.open_stream(&key))
    }

    async fn get_bytes(&self, file: &dyn FileDescriptor, start: u64, end: u64) -> StoreResult<Bytes> {
        if end < start {
            return Err(StoreError::InvalidRange { start, end });
        }
        let key = self.copy_key(file)?;
        self.read_range(&key, start, end).await
    }

    async fn put(&self, file: &dyn FileDescriptor, options: PutOptions) -> StoreResult<ObjectKey> {
        let desired = desired_key(file)?;
        let data = file.buffer();
        self.write(&desired, &data, options).await
    }

    async fn put_stream(&self, file: &dyn FileDescriptor, options: PutOptions) -> StoreResult<ObjectKey> {
        let desired = desired_key(file)?;
        let input = file.byte_stream();
        self.write_stream(&desired, input, options).await
    }

    async fn del(&self, file: &dyn FileDescriptor) -> StoreResult<()> {
        match file.copy_info(&self.name) {
            Some(info) => self.remove(&info.key).await,
            None => {
                debug!(store = %self.name, id = file.id(), "nothing to delete");
                Ok(())
            }
        }
    }

    async fn stats(&self, key: &ObjectKey) -> StoreResult<ObjectStats> {
        self.stat(key).await
    }

    fn watch(&self, callback: ChangeCallback) -> StoreResult<WatchHandle> {
        Ok(self.watcher.watch(callback)?)
    }
}
