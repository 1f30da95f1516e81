use std::fs;
use std::path::{Component, PathBuf};

use tracing::debug;

use crate::config::StoreConfig;
use crate::env::EnvProvider;
use crate::error::{StoreError, StoreResult};

/// Resolve the root directory for the store called `store_name`.
///
/// The configured path wins; without one the root defaults to
/// `<parent of runtime dir>/cfs/files/<store_name>`. A leading `~` component
/// is replaced by the home directory, relative paths are taken from the
/// current directory, and the whole directory chain is created. The returned
/// path is canonical, which keeps it comparable with the paths the change
/// watcher receives from the OS.
pub fn resolve_root(
    store_name: &str,
    config: &StoreConfig,
    env: &dyn EnvProvider,
) -> StoreResult<PathBuf> {
    let configured = match config.path() {
        Some(path) => PathBuf::from(path),
        None => default_root(store_name, env)?,
    };

    let expanded = expand_home(configured, env)?;
    let absolute = if expanded.is_absolute() {
        expanded
    } else {
        env.current_dir()?.join(expanded)
    };

    fs::create_dir_all(&absolute)?;
    let root = absolute.canonicalize()?;

    if fs::metadata(&root)?.permissions().readonly() {
        return Err(StoreError::Configuration(format!(
            "store root {} is not writable",
            root.display()
        )));
    }

    debug!(store = store_name, root = %root.display(), "store root resolved");
    Ok(root)
}

fn default_root(store_name: &str, env: &dyn EnvProvider) -> StoreResult<PathBuf> {
    let runtime = env.runtime_dir().ok_or_else(|| {
        StoreError::Configuration(format!(
            "unable to determine a root path for store {store_name:?}"
        ))
    })?;
    let base = runtime.parent().unwrap_or(&runtime);
    Ok(base.join("cfs").join("files").join(store_name))
}

fn expand_home(path: PathBuf, env: &dyn EnvProvider) -> StoreResult<PathBuf> {
    let mut components = path.components();
    match components.next() {
        Some(Component::Normal(first)) if first == "~" => {
            let home = env.home_dir().ok_or_else(|| {
                StoreError::Configuration(
                    "unable to resolve \"~\" in path: no home directory in the environment".into(),
                )
            })?;
            let rest = components.as_path();
            if rest.as_os_str().is_empty() {
                Ok(home)
            } else {
                Ok(home.join(rest))
            }
        }
        _ => Ok(path),
    }
}
