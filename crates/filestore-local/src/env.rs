use std::io;
use std::path::{Path, PathBuf};

/// Environment variables consulted for the home directory, in order.
pub const HOME_VARS: [&str; 3] = ["HOME", "HOMEPATH", "USERPROFILE"];

/// Process environment as seen by root resolution.
///
/// Injected so that home-directory expansion and the default-root fallback
/// can be exercised without touching the real process environment.
pub trait EnvProvider: Send + Sync {
    /// Value of an environment variable, if set.
    fn var(&self, key: &str) -> Option<String>;

    /// Directory the running program was launched from, if known. The
    /// default root is derived from its parent.
    fn runtime_dir(&self) -> Option<PathBuf>;

    /// Base for relative root paths.
    fn current_dir(&self) -> io::Result<PathBuf>;

    /// Home directory from the first non-empty of [`HOME_VARS`].
    fn home_dir(&self) -> Option<PathBuf> {
        HOME_VARS
            .iter()
            .filter_map(|key| self.var(key))
            .find(|value| !value.is_empty())
            .map(PathBuf::from)
    }
}

/// The real process environment.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemEnv;

impl EnvProvider for SystemEnv {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }

    fn runtime_dir(&self) -> Option<PathBuf> {
        let exe = std::env::current_exe().ok()?;
        exe.parent().map(Path::to_path_buf)
    }

    fn current_dir(&self) -> io::Result<PathBuf> {
        std::env::current_dir()
    }
}
