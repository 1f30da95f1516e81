use std::io;
use std::path::{Path, PathBuf};

use filestore_types::{FileDescriptor, ObjectKey};
use tokio::fs::{self, File, OpenOptions};
use tracing::debug;

use crate::error::StoreResult;

/// Separator between collection name, id and file name in derived keys.
pub const KEY_SEPARATOR: char = '-';

/// Key a descriptor would like to be stored under:
/// `<collection><SEP><id><SEP><name>`.
pub fn desired_key(file: &dyn FileDescriptor) -> StoreResult<ObjectKey> {
    let key = format!(
        "{}{KEY_SEPARATOR}{}{KEY_SEPARATOR}{}",
        file.collection_name(),
        file.id(),
        file.name()
    );
    Ok(ObjectKey::new(key)?)
}

/// Picks keys that do not collide with objects already under the root.
///
/// Collisions are resolved by inserting the smallest free positive integer
/// between base name and extension: `cat.png`, `cat1.png`, `cat2.png`, ...
#[derive(Clone, Debug)]
pub struct KeyNamer {
    root: PathBuf,
}

impl KeyNamer {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// First free key in the candidate sequence, by existence check only.
    ///
    /// With `overwrite` the desired key is returned as is. The answer can be
    /// stale by the time the caller writes; [`reserve`](Self::reserve) is the
    /// race-free variant used by the store.
    pub async fn next_key(&self, desired: &ObjectKey, overwrite: bool) -> StoreResult<ObjectKey> {
        if overwrite {
            return Ok(desired.clone());
        }
        let mut candidate = desired.clone();
        let mut suffix = 0u64;
        while fs::try_exists(candidate.to_path(&self.root)).await? {
            suffix += 1;
            candidate = desired.with_suffix(suffix);
        }
        Ok(candidate)
    }

    /// Claim a key and open its file for writing.
    ///
    /// Walks the same candidates as [`next_key`](Self::next_key) but creates
    /// each one with create-if-absent, so a candidate taken by a concurrent
    /// writer is skipped instead of shared. With `overwrite` the desired key
    /// is opened and truncated. Parent directories of nested keys are created.
    pub async fn reserve(&self, desired: &ObjectKey, overwrite: bool) -> StoreResult<(ObjectKey, File)> {
        let path = desired.to_path(&self.root);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        if overwrite {
            let file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(&path)
                .await?;
            return Ok((desired.clone(), file));
        }

        let mut candidate = desired.clone();
        let mut suffix = 0u64;
        loop {
            match OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(candidate.to_path(&self.root))
                .await
            {
                Ok(file) => {
                    if suffix > 0 {
                        debug!(desired = %desired, key = %candidate, "desired key taken; using suffixed key");
                    }
                    return Ok((candidate, file));
                }
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                    suffix += 1;
                    candidate = desired.with_suffix(suffix);
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}
