use std::fmt;
use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Root-relative name of one stored object.
///
/// Keys use `/` to separate nested components regardless of platform. A key
/// is always relative and never climbs out of the root: empty components,
/// `.` and `..`, absolute prefixes and NUL bytes are rejected at
/// construction, so `root.join(key)` always stays under `root`.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ObjectKey(String);

impl ObjectKey {
    /// Validate and wrap a key.
    pub fn new(key: impl Into<String>) -> Result<Self, TypeError> {
        let key = key.into();
        validate(&key)?;
        Ok(Self(key))
    }

    /// Build a key from a path relative to the store root.
    pub fn from_relative_path(path: &Path) -> Result<Self, TypeError> {
        let mut parts = Vec::new();
        for component in path.components() {
            match component {
                Component::Normal(part) => parts.push(part.to_string_lossy().into_owned()),
                _ => {
                    return Err(TypeError::InvalidKey {
                        key: path.to_string_lossy().into_owned(),
                        reason: "path is not relative to the root",
                    })
                }
            }
        }
        Self::new(parts.join("/"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Absolute location of this key under `root`.
    pub fn to_path(&self, root: &Path) -> PathBuf {
        let mut path = root.to_path_buf();
        path.extend(self.0.split('/'));
        path
    }

    /// Last component of the key.
    pub fn file_name(&self) -> &str {
        match self.0.rfind('/') {
            Some(idx) => &self.0[idx + 1..],
            None => &self.0,
        }
    }

    /// Split into `(base, extension)` where the extension starts at the last
    /// `.` of the final component. A leading dot does not start an extension,
    /// so `.bashrc` has none while `a.tar.gz` has `.gz`.
    pub fn split_extension(&self) -> (&str, &str) {
        let name_start = self.0.len() - self.file_name().len();
        match self.file_name().rfind('.') {
            Some(idx) if idx > 0 => self.0.split_at(name_start + idx),
            _ => (&self.0, ""),
        }
    }

    /// The key with `suffix` inserted between base and extension:
    /// `cat.png` with 2 becomes `cat2.png`.
    pub fn with_suffix(&self, suffix: u64) -> Self {
        let (base, ext) = self.split_extension();
        Self(format!("{base}{suffix}{ext}"))
    }
}

fn validate(key: &str) -> Result<(), TypeError> {
    let invalid = |reason| TypeError::InvalidKey {
        key: key.to_string(),
        reason,
    };

    if key.is_empty() {
        return Err(invalid("key is empty"));
    }
    if key.contains('\0') {
        return Err(invalid("key contains a NUL byte"));
    }
    for part in key.split('/') {
        if part.is_empty() {
            return Err(invalid("key has an empty component"));
        }
        // Each `/`-separated part must be exactly one plain path component on
        // this platform (rejects `.`, `..`, drive prefixes and root markers).
        let mut components = Path::new(part).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(_)), None) => {}
            _ => return Err(invalid("key component is not a plain file name")),
        }
    }
    Ok(())
}

impl fmt::Debug for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectKey({})", self.0)
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ObjectKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ObjectKey {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<&str> for ObjectKey {
    type Error = TypeError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ObjectKey> for String {
    fn from(key: ObjectKey) -> Self {
        key.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn key(s: &str) -> ObjectKey {
        ObjectKey::new(s).unwrap()
    }

    #[test]
    fn accepts_flat_and_nested_keys() {
        assert_eq!(key("photos-42-cat.png").as_str(), "photos-42-cat.png");
        assert_eq!(key("a/b/c.txt").file_name(), "c.txt");
    }

    #[test]
    fn rejects_escaping_and_empty_keys() {
        for bad in ["", "/etc/passwd", "../up", "a/../b", "a//b", "a/", "./a", "nul\0byte"] {
            assert!(ObjectKey::new(bad).is_err(), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn split_extension_rules() {
        assert_eq!(key("cat.png").split_extension(), ("cat", ".png"));
        assert_eq!(key("a.tar.gz").split_extension(), ("a.tar", ".gz"));
        assert_eq!(key("README").split_extension(), ("README", ""));
        assert_eq!(key(".bashrc").split_extension(), (".bashrc", ""));
        assert_eq!(key("name.").split_extension(), ("name", "."));
        assert_eq!(key("dir.d/file").split_extension(), ("dir.d/file", ""));
        assert_eq!(key("dir.d/file.txt").split_extension(), ("dir.d/file", ".txt"));
    }

    #[test]
    fn with_suffix_keeps_extension() {
        assert_eq!(key("photos-42-cat.png").with_suffix(1).as_str(), "photos-42-cat1.png");
        assert_eq!(key("notes").with_suffix(12).as_str(), "notes12");
        assert_eq!(key("dir.d/.env").with_suffix(3).as_str(), "dir.d/.env3");
    }

    #[test]
    fn to_path_joins_components() {
        let root = Path::new("/srv/files");
        assert_eq!(key("a/b.txt").to_path(root), root.join("a").join("b.txt"));
    }

    #[test]
    fn from_relative_path_uses_forward_slashes() {
        let rel = Path::new("nested").join("deeper").join("x.bin");
        assert_eq!(ObjectKey::from_relative_path(&rel).unwrap().as_str(), "nested/deeper/x.bin");
        assert!(ObjectKey::from_relative_path(Path::new("../x")).is_err());
    }

    #[test]
    fn serde_rejects_invalid_keys() {
        let ok: ObjectKey = serde_json::from_str("\"a/b.txt\"").unwrap();
        assert_eq!(ok, key("a/b.txt"));
        assert!(serde_json::from_str::<ObjectKey>("\"../b.txt\"").is_err());
        assert_eq!(serde_json::to_string(&ok).unwrap(), "\"a/b.txt\"");
    }

    proptest! {
        #[test]
        fn suffix_preserves_base_and_extension(
            base in "[a-z][a-z0-9_-]{0,12}",
            ext in proptest::option::of("[a-z0-9]{1,4}"),
            n in 1u64..10_000,
        ) {
            let name = match &ext {
                Some(ext) => format!("{base}.{ext}"),
                None => base.clone(),
            };
            let suffixed = key(&name).with_suffix(n);
            let expected_base = format!("{base}{n}");
            let expected_ext = ext.map(|e| format!(".{e}")).unwrap_or_default();
            let (got_base, got_ext) = suffixed.split_extension();
            prop_assert_eq!(got_base, expected_base.as_str());
            prop_assert_eq!(got_ext, expected_ext.as_str());
        }
    }
}
