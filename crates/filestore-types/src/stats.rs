use std::fs::Metadata;
use std::io;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Filesystem-reported metadata for one stored object.
///
/// There is no separate metadata store; these values come straight from the
/// filesystem. Access and creation times are optional because not every
/// platform or filesystem records them.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectStats {
    pub size: u64,
    pub modified: DateTime<Utc>,
    pub accessed: Option<DateTime<Utc>>,
    pub created: Option<DateTime<Utc>>,
    pub readonly: bool,
}

impl ObjectStats {
    /// Convert native metadata. Fails only if the platform cannot report a
    /// modification time.
    pub fn from_metadata(meta: &Metadata) -> io::Result<Self> {
        Ok(Self {
            size: meta.len(),
            modified: meta.modified()?.into(),
            accessed: meta.accessed().ok().map(Into::into),
            created: meta.created().ok().map(Into::into),
            readonly: meta.permissions().readonly(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_metadata_reports_size() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stats.bin");
        std::fs::write(&path, b"twelve bytes").unwrap();

        let stats = ObjectStats::from_metadata(&std::fs::metadata(&path).unwrap()).unwrap();
        assert_eq!(stats.size, 12);
        assert!(!stats.readonly);
    }
}
