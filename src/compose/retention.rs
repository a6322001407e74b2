use std::{
    path::{Path, PathBuf},
    time::{Duration, SystemTime},
};

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Delete regular files directly under `dir` whose mtime is older than `max_age`.
///
/// Never fails: a missing directory sweeps nothing and per-file errors are logged.
pub async fn sweep_once(dir: &Path, max_age: Duration) -> usize {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return 0,
        Err(e) => {
            tracing::warn!(dir = %dir.display(), error = %e, "retention sweep could not list directory");
            return 0;
        }
    };

    let now = SystemTime::now();
    let mut removed = 0usize;
    loop {
        let entry = match entries.next_entry().await {
            Ok(Some(entry)) => entry,
            Ok(None) => break,
            Err(e) => {
                tracing::warn!(error = %e, "retention sweep stopped early");
                break;
            }
        };
        let path = entry.path();
        let meta = match entry.metadata().await {
            Ok(meta) if meta.is_file() => meta,
            Ok(_) => continue,
            Err(e) => {
                tracing::warn!(file = %path.display(), error = %e, "failed to stat output file");
                continue;
            }
        };
        let Ok(modified) = meta.modified() else {
            continue;
        };
        // Files from the future have age zero.
        let age = now.duration_since(modified).unwrap_or_default();
        if age < max_age {
            continue;
        }
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                removed += 1;
                tracing::info!(file = %path.display(), age_secs = age.as_secs(), "removed expired output");
            }
            Err(e) => tracing::warn!(file = %path.display(), error = %e, "failed to remove expired output"),
        }
    }
    removed
}

/// Handle of a running retention task.
#[derive(Debug)]
pub struct RetentionHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl RetentionHandle {
    /// Stop the task and wait for it to exit.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        if let Err(e) = self.task.await {
            tracing::warn!(error = %e, "retention task ended abnormally");
        }
    }

    pub fn token(&self) -> CancellationToken {
        self.cancel.clone()
    }
}

/// Sweep `dir` immediately and then every `interval` until the handle is shut down.
pub fn spawn_retention_sweep(
    dir: impl Into<PathBuf>,
    max_age: Duration,
    interval: Duration,
) -> RetentionHandle {
    let dir = dir.into();
    let cancel = CancellationToken::new();
    let token = cancel.clone();
    let task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                () = token.cancelled() => break,
                _ = ticker.tick() => {
                    let removed = sweep_once(&dir, max_age).await;
                    tracing::debug!(dir = %dir.display(), removed, "retention sweep finished");
                }
            }
        }
        tracing::info!(dir = %dir.display(), "retention sweep stopped");
    });
    RetentionHandle { cancel, task }
}

#[cfg(test)]
#[path = "../../tests/unit/compose/retention.rs"]
mod tests;
