use std::collections::{HashMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use filestore_types::{ChangeEvent, ChangeKind, ObjectKey};
use notify::event::{ModifyKind, RemoveKind, RenameMode};
use notify::{Event, EventKind};
use tokio::time::Instant;
use tracing::{trace, warn};
use walkdir::WalkDir;

/// A create or modify that has not been reported yet.
#[derive(Clone, Copy, Debug)]
struct PendingChange {
    /// A create was seen since the last report for this path.
    created: bool,
    last_event: Instant,
}

/// Turns raw `notify` events into root-relative [`ChangeEvent`]s.
///
/// Creates and modifications are buffered per path and reported once the path
/// has been quiet for `debounce`, so one write that the OS reports as
/// create + modify + close becomes a single change whose size is the final
/// size. Removals are reported immediately and cancel any buffered change for
/// the same path.
///
/// A directory that appears under the root is scanned when its event arrives:
/// the backend only starts watching it after that, so files written into it
/// in the meantime would otherwise go unreported. Directories themselves are
/// never reported, including their removal.
#[derive(Debug)]
pub struct EventNormalizer {
    root: PathBuf,
    debounce: Duration,
    pending: HashMap<PathBuf, PendingChange>,
    /// Paths last seen as directories.
    dirs: HashSet<PathBuf>,
}

impl EventNormalizer {
    pub fn new(root: impl Into<PathBuf>, debounce: Duration) -> Self {
        Self {
            root: root.into(),
            debounce,
            pending: HashMap::new(),
            dirs: HashSet::new(),
        }
    }

    /// Record the directories already under the root, so that their later
    /// removal or move is recognized as a directory event. Returns how many
    /// were found.
    pub fn index_directories(&mut self) -> usize {
        let root = self.root.clone();
        let entries = WalkDir::new(&root)
            .min_depth(1)
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !is_hidden(e.file_name()));
        for entry in entries.flatten() {
            if entry.file_type().is_dir() {
                self.dirs.insert(entry.into_path());
            }
        }
        self.dirs.len()
    }

    /// Number of paths waiting to stabilize.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Feed one raw event. Returns the changes that can be reported right away
    /// (removals); everything else is buffered until [`flush`](Self::flush).
    pub fn ingest(&mut self, event: Event, now: Instant) -> Vec<ChangeEvent> {
        let mut out = Vec::new();
        match event.kind {
            EventKind::Access(_) => {
                trace!(paths = ?event.paths, "ignoring access event");
            }
            EventKind::Create(_) => {
                for path in &event.paths {
                    self.arrived(path, now);
                }
            }
            EventKind::Modify(ModifyKind::Name(mode)) => match mode {
                RenameMode::From => {
                    for path in &event.paths {
                        out.extend(self.remove(path));
                    }
                }
                RenameMode::To => {
                    for path in &event.paths {
                        self.arrived(path, now);
                    }
                }
                RenameMode::Both if event.paths.len() >= 2 => {
                    out.extend(self.remove(&event.paths[0]));
                    self.arrived(&event.paths[1], now);
                }
                _ => {
                    for path in &event.paths {
                        out.extend(self.resolve_ambiguous(path, true, now));
                    }
                }
            },
            EventKind::Modify(_) => {
                for path in &event.paths {
                    self.mark(path, false, now);
                }
            }
            EventKind::Remove(RemoveKind::Folder) => {
                for path in &event.paths {
                    self.forget_dir(path);
                }
            }
            EventKind::Remove(_) => {
                for path in &event.paths {
                    out.extend(self.remove(path));
                }
            }
            EventKind::Any | EventKind::Other => {
                for path in &event.paths {
                    out.extend(self.resolve_ambiguous(path, false, now));
                }
            }
        }
        out
    }

    /// Report every buffered change that has been quiet for at least the
    /// debounce period as of `now`. Paths are stat'ed here, so the reported
    /// size and mtime are those of the settled file. Directories and paths
    /// that no longer exist are dropped.
    pub async fn flush(&mut self, now: Instant) -> Vec<ChangeEvent> {
        let mut ready: Vec<(PathBuf, PendingChange)> = self
            .pending
            .iter()
            .filter(|(_, p)| now.saturating_duration_since(p.last_event) >= self.debounce)
            .map(|(path, p)| (path.clone(), *p))
            .collect();
        ready.sort_by(|a, b| a.0.cmp(&b.0));

        let mut out = Vec::with_capacity(ready.len());
        for (path, pending) in ready {
            self.pending.remove(&path);
            let Some(key) = self.key_for(&path) else {
                continue;
            };
            match tokio::fs::metadata(&path).await {
                Ok(meta) if meta.is_file() => {
                    let modified = match meta.modified() {
                        Ok(t) => t.into(),
                        Err(e) => {
                            warn!(path = %path.display(), error = %e, "no modification time; skipping change");
                            continue;
                        }
                    };
                    let kind = if pending.created {
                        ChangeKind::Added
                    } else {
                        ChangeKind::Modified
                    };
                    out.push(ChangeEvent::changed(kind, key, meta.len(), modified));
                }
                Ok(meta) => {
                    if meta.is_dir() {
                        self.dirs.insert(path.clone());
                    }
                    trace!(path = %path.display(), "skipping non-file change");
                }
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    trace!(path = %path.display(), "changed path vanished before it settled");
                }
                Err(e) => warn!(path = %path.display(), error = %e, "cannot stat changed path"),
            }
        }
        out
    }

    fn mark(&mut self, path: &Path, created: bool, now: Instant) {
        if self.key_for(path).is_none() {
            return;
        }
        let entry = self.pending.entry(path.to_path_buf()).or_insert(PendingChange {
            created: false,
            last_event: now,
        });
        entry.created |= created;
        entry.last_event = now;
    }

    /// A path was created or moved in. Directories are scanned and every
    /// visible regular file inside becomes a pending create.
    fn arrived(&mut self, path: &Path, now: Instant) {
        if !path.is_dir() {
            self.mark(path, true, now);
            return;
        }
        if self.key_for(path).is_none() {
            return;
        }

        let entries = WalkDir::new(path)
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !is_hidden(e.file_name()));
        for entry in entries {
            match entry {
                Ok(entry) if entry.file_type().is_dir() => {
                    self.dirs.insert(entry.into_path());
                }
                Ok(entry) if entry.file_type().is_file() => {
                    self.mark(entry.path(), true, now);
                }
                Ok(_) => {}
                // The tree can change under the scan; whatever vanished has
                // its own events.
                Err(e) => trace!(path = %path.display(), error = %e, "skipping entry during scan"),
            }
        }
    }

    fn remove(&mut self, path: &Path) -> Option<ChangeEvent> {
        if self.forget_dir(path) {
            return None;
        }
        let key = self.key_for(path)?;
        self.pending.remove(path);
        Some(ChangeEvent::removed(key))
    }

    /// Drop `path` and everything below it from the directory set. Returns
    /// `true` if `path` itself was a known directory.
    fn forget_dir(&mut self, path: &Path) -> bool {
        let known = self.dirs.remove(path);
        if known {
            self.dirs.retain(|d| !d.starts_with(path));
        }
        known
    }

    /// Backends that cannot tell which side of a rename (or what kind of
    /// change) a path is on: decide by whether the path still exists.
    fn resolve_ambiguous(&mut self, path: &Path, created: bool, now: Instant) -> Option<ChangeEvent> {
        if !path.exists() {
            return self.remove(path);
        }
        if created {
            self.arrived(path, now);
        } else {
            self.mark(path, false, now);
        }
        None
    }

    /// Root-relative key for `path`, or `None` if the path is the root
    /// itself, lies outside the root, or passes through a hidden entry.
    fn key_for(&self, path: &Path) -> Option<ObjectKey> {
        let rel = match path.strip_prefix(&self.root) {
            Ok(rel) => rel,
            Err(_) => {
                trace!(path = %path.display(), "ignoring event outside the root");
                return None;
            }
        };
        if rel.components().any(|c| is_hidden(c.as_os_str())) {
            return None;
        }
        ObjectKey::from_relative_path(rel).ok()
    }
}

fn is_hidden(name: &std::ffi::OsStr) -> bool {
    name.to_string_lossy().starts_with('.')
}
