//! Deck file watching.
//!
//! The parent directory is watched rather than the file itself: editors that
//! save by writing a temp file and renaming it over the original would
//! otherwise detach the watch after the first save.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use notify_debouncer_mini::notify::{RecommendedWatcher, RecursiveMode};
use notify_debouncer_mini::{DebounceEventResult, Debouncer, new_debouncer};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::live::reload::{ReloadCoordinator, ReloadOutcome};

const DEBOUNCE: Duration = Duration::from_millis(200);

/// Keeps the OS watch alive; dropping it stops change notifications.
pub struct FileWatcher {
    _debouncer: Debouncer<RecommendedWatcher>,
    path: PathBuf,
}

impl FileWatcher {
    /// Start watching `path`. A unit is sent on the returned channel after
    /// each debounced change; bursts collapse into one pending signal.
    pub fn start(path: &Path) -> Result<(Self, mpsc::Receiver<()>)> {
        let path = path
            .canonicalize()
            .with_context(|| format!("Failed to resolve {}", path.display()))?;
        let dir = path
            .parent()
            .map(Path::to_path_buf)
            .context("Deck file has no parent directory")?;

        let (tx, rx) = mpsc::channel(1);
        let target = path.clone();
        let mut debouncer = new_debouncer(DEBOUNCE, move |result: DebounceEventResult| match result {
            Ok(events) => {
                if events.iter().any(|e| is_target(&e.path, &target)) {
                    // Full means a reload is already queued.
                    let _ = tx.try_send(());
                }
            }
            Err(e) => warn!(error = %e, "file watch error"),
        })
        .context("Failed to create file watcher")?;

        debouncer
            .watcher()
            .watch(&dir, RecursiveMode::NonRecursive)
            .with_context(|| format!("Failed to watch {}", dir.display()))?;

        debug!(path = %path.display(), "watching deck");
        Ok((
            Self {
                _debouncer: debouncer,
                path,
            },
            rx,
        ))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn is_target(changed: &Path, target: &Path) -> bool {
    changed == target
        || (changed.file_name() == target.file_name()
            && changed.parent().and_then(|p| p.canonicalize().ok()).as_deref() == target.parent())
}

/// Reload the deck once per change signal. Parsing runs on the blocking
/// pool; the loop ends when the watcher is dropped.
pub fn spawn_reload_loop(
    mut changes: mpsc::Receiver<()>,
    coordinator: Arc<ReloadCoordinator>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while changes.recv().await.is_some() {
            let coordinator = Arc::clone(&coordinator);
            match tokio::task::spawn_blocking(move || coordinator.reload()).await {
                Ok(ReloadOutcome::Patched) => info!("deck reloaded"),
                Ok(ReloadOutcome::FullReload) => info!("deck reloaded, viewers refreshing"),
                Ok(ReloadOutcome::Failed) => {}
                Err(e) => error!(error = %e, "reload task panicked"),
            }
        }
        debug!("reload loop stopped");
    })
}
