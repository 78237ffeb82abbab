// src/watch/watcher.rs

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Result;
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tracing::{debug, info, warn};

use crate::engine::{Command, ExecutorHandle};
use crate::procedure::{DocumentFormat, parse_document};
use crate::watch::hash::{ContentTracker, compute_file_hash};

/// Handle for the procedure watcher.
///
/// Keeps the underlying `RecommendedWatcher` alive. Dropping this handle
/// stops watching.
pub struct WatcherHandle {
    _inner: RecommendedWatcher,
}

impl std::fmt::Debug for WatcherHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatcherHandle").finish()
    }
}

/// What happened to one change notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReloadOutcome {
    /// Content identical to the last loaded document.
    Unchanged,
    Loaded,
    /// Could not read or parse the file.
    Unreadable(String),
    /// The executor refused the document (invalid, or a sequence is active).
    Rejected(String),
}

/// Re-read `path` and submit it as `load_graph` if its content changed.
pub async fn process_procedure_change(
    path: &Path,
    tracker: &mut ContentTracker,
    handle: &ExecutorHandle,
) -> ReloadOutcome {
    let hash = match compute_file_hash(path) {
        Ok(hash) => hash,
        Err(err) => return ReloadOutcome::Unreadable(format!("{err:#}")),
    };
    if !tracker.is_changed(&hash) {
        debug!(path = %path.display(), "procedure content unchanged");
        return ReloadOutcome::Unchanged;
    }

    let graph = match fs::read_to_string(path)
        .map_err(|e| e.to_string())
        .and_then(|contents| {
            parse_document(&contents, DocumentFormat::from_path(path)).map_err(|e| e.to_string())
        }) {
        Ok(graph) => graph,
        Err(err) => {
            warn!(path = %path.display(), error = %err, "edited procedure does not parse; keeping current");
            return ReloadOutcome::Unreadable(err);
        }
    };

    match handle.send(Command::LoadGraph { graph }).await {
        Ok(_) => {
            tracker.record(hash);
            info!(path = %path.display(), "procedure reloaded");
            ReloadOutcome::Loaded
        }
        Err(err) => {
            warn!(path = %path.display(), error = %err, "edited procedure rejected; keeping current");
            ReloadOutcome::Rejected(err.to_string())
        }
    }
}

fn touches(event: &Event, target: &Path) -> bool {
    let relevant = matches!(
        event.kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Any
    );
    relevant
        && event
            .paths
            .iter()
            .any(|p| p.file_name() == target.file_name())
}

/// Watch the procedure file at `path` and reload it into the executor when
/// its content changes.
///
/// The parent directory is watched (non-recursively) so editors that replace
/// the file on save are still seen.
pub fn spawn_procedure_watcher(
    path: impl Into<PathBuf>,
    handle: ExecutorHandle,
) -> Result<WatcherHandle> {
    let path = path.into();
    let path = path.canonicalize().unwrap_or(path);
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };

    // Channel from the blocking notify callback into the async world.
    let (event_tx, mut event_rx) = tokio::sync::mpsc::unbounded_channel::<Event>();

    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| match res {
            Ok(event) => {
                if let Err(err) = event_tx.send(event) {
                    eprintln!("racestart: failed to forward notify event: {err}");
                }
            }
            Err(err) => eprintln!("racestart: file watch error: {err}"),
        },
        Config::default(),
    )?;
    watcher.watch(&dir, RecursiveMode::NonRecursive)?;

    info!(path = %path.display(), "watching procedure file");

    let mut tracker = ContentTracker::from_file(&path);
    tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            if !touches(&event, &path) {
                continue;
            }
            debug!(?event, "procedure file event");
            let outcome = process_procedure_change(&path, &mut tracker, &handle).await;
            debug!(?outcome, "procedure change processed");
        }
        debug!("procedure watcher loop finished");
    });

    Ok(WatcherHandle { _inner: watcher })
}
