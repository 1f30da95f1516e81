use std::path::PathBuf;

use filestore_watch::WatchConfig;
use serde::{Deserialize, Serialize};

/// Store configuration: either a bare root path or a full options object.
///
/// Both shapes deserialize from the same field, so `"~/files"` and
/// `{"path": "~/files", "watch": {"debounce_ms": 250}}` are equally valid.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StoreConfig {
    Path(String),
    Options(StoreOptions),
}

/// Structured store options.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreOptions {
    /// Root directory. `None` falls back to the runtime-relative default.
    pub path: Option<String>,
    /// Change watcher tuning.
    pub watch: WatchConfig,
}

impl StoreConfig {
    /// Configured root path, treating an empty string as absent.
    pub fn path(&self) -> Option<&str> {
        let path = match self {
            Self::Path(path) => Some(path.as_str()),
            Self::Options(opts) => opts.path.as_deref(),
        };
        path.filter(|p| !p.is_empty())
    }

    pub fn watch_config(&self) -> WatchConfig {
        match self {
            Self::Path(_) => WatchConfig::default(),
            Self::Options(opts) => opts.watch.clone(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::Options(StoreOptions::default())
    }
}

impl From<&str> for StoreConfig {
    fn from(path: &str) -> Self {
        Self::Path(path.to_string())
    }
}

impl From<String> for StoreConfig {
    fn from(path: String) -> Self {
        Self::Path(path)
    }
}

impl From<PathBuf> for StoreConfig {
    fn from(path: PathBuf) -> Self {
        Self::Path(path.to_string_lossy().into_owned())
    }
}

impl From<&std::path::Path> for StoreConfig {
    fn from(path: &std::path::Path) -> Self {
        Self::Path(path.to_string_lossy().into_owned())
    }
}

impl From<StoreOptions> for StoreConfig {
    fn from(opts: StoreOptions) -> Self {
        Self::Options(opts)
    }
}
