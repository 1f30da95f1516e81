/// Errors produced by the change watcher.
#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    /// The OS watch backend could not be created or attached to the root.
    #[error("watch backend error: {0}")]
    Backend(#[from] notify::Error),

    /// The watch configuration cannot be used, e.g. a zero tick.
    #[error("invalid watch configuration: {0}")]
    Config(String),

    /// A change callback returned an error. The watch stops on the first one.
    #[error("change callback failed: {0:#}")]
    Callback(anyhow::Error),

    /// The watch task was cancelled by the runtime before it finished.
    #[error("watch task was cancelled")]
    Cancelled,
}

/// Convenience alias used throughout the watch crate.
pub type WatchResult<T> = Result<T, WatchError>;
