use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::key::ObjectKey;

/// What happened to an object under the store root.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    /// A file appeared.
    Added,
    /// An existing file's content or metadata changed.
    Modified,
    /// A file disappeared.
    Removed,
}

impl ChangeKind {
    /// Event name delivered to adapter callbacks: `"change"` or `"remove"`.
    pub fn event_name(&self) -> &'static str {
        match self {
            Self::Added | Self::Modified => "change",
            Self::Removed => "remove",
        }
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Added => write!(f, "added"),
            Self::Modified => write!(f, "modified"),
            Self::Removed => write!(f, "removed"),
        }
    }
}

/// A normalized filesystem change, keyed relative to the store root.
///
/// `size` and `modified` are present for additions and modifications and
/// absent for removals. `content_type` is never sniffed by the watcher.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub kind: ChangeKind,
    pub key: ObjectKey,
    pub name: String,
    pub content_type: Option<String>,
    pub size: Option<u64>,
    pub modified: Option<DateTime<Utc>>,
}

impl ChangeEvent {
    /// An addition or modification observed with the given size and mtime.
    pub fn changed(kind: ChangeKind, key: ObjectKey, size: u64, modified: DateTime<Utc>) -> Self {
        let name = key.file_name().to_string();
        Self {
            kind,
            key,
            name,
            content_type: None,
            size: Some(size),
            modified: Some(modified),
        }
    }

    pub fn removed(key: ObjectKey) -> Self {
        let name = key.file_name().to_string();
        Self {
            kind: ChangeKind::Removed,
            key,
            name,
            content_type: None,
            size: None,
            modified: None,
        }
    }

    /// Shorthand for `self.kind.event_name()`.
    pub fn event_name(&self) -> &'static str {
        self.kind.event_name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_names_collapse_additions_and_modifications() {
        assert_eq!(ChangeKind::Added.event_name(), "change");
        assert_eq!(ChangeKind::Modified.event_name(), "change");
        assert_eq!(ChangeKind::Removed.event_name(), "remove");
    }

    #[test]
    fn removed_events_carry_no_stats() {
        let event = ChangeEvent::removed(ObjectKey::new("a/b.txt").unwrap());
        assert_eq!(event.name, "b.txt");
        assert_eq!(event.event_name(), "remove");
        assert!(event.size.is_none());
        assert!(event.modified.is_none());
    }

    #[test]
    fn changed_event_serializes_kind_lowercase() {
        let event = ChangeEvent::changed(
            ChangeKind::Added,
            ObjectKey::new("x.bin").unwrap(),
            3,
            DateTime::<Utc>::UNIX_EPOCH,
        );
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["kind"], "added");
        assert_eq!(json["key"], "x.bin");
        assert_eq!(json["size"], 3);
        assert!(json["content_type"].is_null());
    }
}
