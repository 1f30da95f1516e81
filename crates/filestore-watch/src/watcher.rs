use std::path::{Path, PathBuf};
use std::time::Duration;

use filestore_types::ChangeEvent;
use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace};

use crate::config::WatchConfig;
use crate::error::{WatchError, WatchResult};
use crate::normalize::EventNormalizer;

/// Watches a store root and reports normalized changes to a callback.
#[derive(Clone, Debug)]
pub struct ChangeWatcher {
    root: PathBuf,
    config: WatchConfig,
}

impl ChangeWatcher {
    /// `root` should be canonical so it matches the paths the OS reports.
    pub fn new(root: impl Into<PathBuf>, config: WatchConfig) -> Self {
        Self {
            root: root.into(),
            config,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &WatchConfig {
        &self.config
    }

    /// Start watching. Must be called from within a tokio runtime.
    ///
    /// Fails with [`WatchError::Config`] before touching the OS if the
    /// configuration is unusable. Only changes made after this call are
    /// reported. `callback` runs on the
    /// watch task, one event at a time; returning an error stops the watch and
    /// the error comes back from [`WatchHandle::stop`] or
    /// [`WatchHandle::finished`].
    pub fn watch<F>(&self, callback: F) -> WatchResult<WatchHandle>
    where
        F: FnMut(ChangeEvent) -> anyhow::Result<()> + Send + 'static,
    {
        self.config.validate()?;

        let (events_tx, events_rx) = mpsc::unbounded_channel();

        let mut watcher = notify::recommended_watcher(move |result: notify::Result<Event>| {
            // Unbounded send never blocks the backend thread.
            if events_tx.send(result).is_err() {
                trace!("watch task gone; dropping filesystem event");
            }
        })?;
        watcher.watch(&self.root, RecursiveMode::Recursive)?;

        let token = CancellationToken::new();
        let mut normalizer = EventNormalizer::new(self.root.clone(), self.config.debounce);
        let dirs = normalizer.index_directories();
        let task = tokio::spawn(run_watch(
            watcher,
            normalizer,
            events_rx,
            callback,
            token.clone(),
            self.config.tick,
        ));

        info!(root = %self.root.display(), dirs, "watching store root");

        Ok(WatchHandle {
            token,
            task: Some(task),
        })
    }
}

/// Handle to a running watch.
///
/// Dropping the handle stops the watch without waiting for it. The outcome
/// of the watch task, including a callback error that ended it, is only
/// delivered through [`stop`](Self::stop) or [`finished`](Self::finished);
/// once the handle is dropped such an error is logged and nothing more. A
/// callback panic is re-raised in whoever awaits one of those two methods.
#[derive(Debug)]
pub struct WatchHandle {
    token: CancellationToken,
    task: Option<JoinHandle<WatchResult<()>>>,
}

impl WatchHandle {
    /// Returns `true` once the watch task has exited, either after a stop
    /// request or because a callback failed.
    pub fn is_finished(&self) -> bool {
        self.task.as_ref().map_or(true, |t| t.is_finished())
    }

    /// Stop watching and wait for the task to exit.
    ///
    /// Returns the callback error that ended the watch early, if any.
    pub async fn stop(mut self) -> WatchResult<()> {
        self.token.cancel();
        self.join().await
    }

    /// Wait for the watch to end on its own, which only happens when a
    /// callback fails.
    pub async fn finished(mut self) -> WatchResult<()> {
        self.join().await
    }

    async fn join(&mut self) -> WatchResult<()> {
        let Some(task) = self.task.take() else {
            return Ok(());
        };
        match task.await {
            Ok(result) => result,
            Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
            Err(_) => Err(WatchError::Cancelled),
        }
    }
}

impl Drop for WatchHandle {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

async fn run_watch<F>(
    watcher: RecommendedWatcher,
    mut normalizer: EventNormalizer,
    mut events_rx: mpsc::UnboundedReceiver<notify::Result<Event>>,
    mut callback: F,
    token: CancellationToken,
    tick: Duration,
) -> WatchResult<()>
where
    F: FnMut(ChangeEvent) -> anyhow::Result<()> + Send + 'static,
{
    // The OS watch lives exactly as long as this task.
    let _watcher = watcher;

    let mut ticker = interval_at(Instant::now() + tick, tick);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        let changes = tokio::select! {
            _ = token.cancelled() => break,
            received = events_rx.recv() => match received {
                Some(Ok(event)) => normalizer.ingest(event, Instant::now()),
                Some(Err(e)) => {
                    error!(error = %e, "filesystem watch backend error");
                    continue;
                }
                None => break,
            },
            _ = ticker.tick() => normalizer.flush(Instant::now()).await,
        };

        for change in changes {
            debug!(kind = %change.kind, key = %change.key, "store change observed");
            if let Err(e) = callback(change) {
                error!(error = %format!("{e:#}"), "change callback failed; stopping watch");
                return Err(WatchError::Callback(e));
            }
        }
    }

    info!("watch stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use filestore_types::ChangeKind;
    use tokio::time::timeout;

    const WAIT: Duration = Duration::from_secs(5);
    const QUIET: Duration = Duration::from_millis(400);

    fn setup() -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().canonicalize().unwrap();
        (dir, root)
    }

    fn channel_watch(
        root: &Path,
    ) -> (WatchHandle, mpsc::UnboundedReceiver<ChangeEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = ChangeWatcher::new(root, WatchConfig::default())
            .watch(move |event| {
                tx.send(event)?;
                Ok(())
            })
            .unwrap();
        (handle, rx)
    }

    async fn next(rx: &mut mpsc::UnboundedReceiver<ChangeEvent>) -> ChangeEvent {
        timeout(WAIT, rx.recv())
            .await
            .expect("no change event in time")
            .expect("watch channel closed")
    }

    async fn assert_quiet(rx: &mut mpsc::UnboundedReceiver<ChangeEvent>) {
        if let Ok(Some(extra)) = timeout(QUIET, rx.recv()).await {
            panic!("unexpected extra event: {extra:?}");
        }
    }

    #[tokio::test]
    async fn new_file_reports_one_change_and_one_remove() {
        let (_dir, root) = setup();
        let (handle, mut rx) = channel_watch(&root);

        let path = root.join("report.pdf");
        tokio::fs::write(&path, b"0123456789").await.unwrap();

        let change = next(&mut rx).await;
        assert_eq!(change.event_name(), "change");
        assert_eq!(change.key.as_str(), "report.pdf");
        assert_eq!(change.name, "report.pdf");
        assert_eq!(change.size, Some(10));
        assert!(change.modified.is_some());
        assert_quiet(&mut rx).await;

        tokio::fs::remove_file(&path).await.unwrap();
        let removal = next(&mut rx).await;
        assert_eq!(removal.kind, ChangeKind::Removed);
        assert_eq!(removal.key.as_str(), "report.pdf");
        assert_quiet(&mut rx).await;

        handle.stop().await.unwrap();
    }

    #[tokio::test]
    async fn pre_existing_and_hidden_files_are_not_reported() {
        let (_dir, root) = setup();
        std::fs::write(root.join("old.txt"), b"before watch").unwrap();
        let (handle, mut rx) = channel_watch(&root);

        tokio::fs::write(root.join(".hidden"), b"secret").await.unwrap();
        tokio::fs::write(root.join("visible.txt"), b"hi").await.unwrap();

        let change = next(&mut rx).await;
        assert_eq!(change.key.as_str(), "visible.txt");
        assert_quiet(&mut rx).await;

        handle.stop().await.unwrap();
    }

    #[tokio::test]
    async fn nested_directories_are_watched() {
        let (_dir, root) = setup();
        let (handle, mut rx) = channel_watch(&root);

        let nested = root.join("2024").join("06");
        tokio::fs::create_dir_all(&nested).await.unwrap();
        tokio::fs::write(nested.join("img.jpg"), b"jpeg").await.unwrap();

        let change = next(&mut rx).await;
        assert_eq!(change.key.as_str(), "2024/06/img.jpg");
        assert_eq!(change.size, Some(4));

        handle.stop().await.unwrap();
    }

    #[tokio::test]
    async fn files_written_right_after_mkdir_are_reported() {
        let (_dir, root) = setup();
        let (handle, mut rx) = channel_watch(&root);

        for i in 0..5 {
            let album = root.join(format!("albums-{i}-2024"));
            tokio::fs::create_dir_all(&album).await.unwrap();
            tokio::fs::write(album.join("cover.jpg"), b"jpeg").await.unwrap();

            let change = next(&mut rx).await;
            assert_eq!(change.kind, ChangeKind::Added);
            assert_eq!(change.key.as_str(), format!("albums-{i}-2024/cover.jpg"));
            assert_eq!(change.size, Some(4));
        }
        assert_quiet(&mut rx).await;

        handle.stop().await.unwrap();
    }

    #[tokio::test]
    async fn removing_a_directory_is_not_reported() {
        let (_dir, root) = setup();
        std::fs::create_dir(root.join("emptydir")).unwrap();
        let (handle, mut rx) = channel_watch(&root);

        tokio::fs::remove_dir(root.join("emptydir")).await.unwrap();
        assert_quiet(&mut rx).await;

        handle.stop().await.unwrap();
    }

    #[tokio::test]
    async fn zero_tick_fails_before_watching() {
        let (_dir, root) = setup();
        let config: WatchConfig = serde_json::from_str(r#"{"tick_ms": 0}"#).unwrap();
        let err = ChangeWatcher::new(&root, config).watch(|_| Ok(())).unwrap_err();
        assert!(matches!(err, WatchError::Config(_)));
    }

    #[tokio::test]
    async fn dropping_the_handle_ends_the_watch() {
        let (_dir, root) = setup();
        let (handle, mut rx) = channel_watch(&root);
        drop(handle);

        // The task drops the callback, and with it the sender, on exit.
        let closed = timeout(WAIT, rx.recv()).await.expect("watch kept running");
        assert!(closed.is_none());
    }

    #[tokio::test]
    async fn callback_error_ends_the_watch() {
        let (_dir, root) = setup();
        let handle = ChangeWatcher::new(&root, WatchConfig::default())
            .watch(|event| anyhow::bail!("cannot handle {}", event.key))
            .unwrap();

        tokio::fs::write(root.join("boom.txt"), b"x").await.unwrap();

        let err = timeout(WAIT, handle.finished())
            .await
            .expect("watch did not end")
            .unwrap_err();
        assert!(matches!(err, WatchError::Callback(_)));
        assert!(err.to_string().contains("boom.txt"));
    }

    #[tokio::test]
    async fn stop_ends_an_idle_watch() {
        let (_dir, root) = setup();
        let (handle, _rx) = channel_watch(&root);
        assert!(!handle.is_finished());
        handle.stop().await.unwrap();
    }

    #[tokio::test]
    async fn watching_a_missing_root_fails() {
        let (_dir, root) = setup();
        let err = ChangeWatcher::new(root.join("missing"), WatchConfig::default())
            .watch(|_| Ok(()))
            .unwrap_err();
        assert!(matches!(err, WatchError::Backend(_)));
    }
}
