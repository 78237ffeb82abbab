// src/engine/handle.rs

use tokio::sync::{broadcast, mpsc, oneshot};

use crate::engine::{Command, RuntimeEvent, Snapshot};
use crate::errors::{RaceStartError, Result};

/// Cloneable entry point into a running [`Runtime`](super::Runtime).
///
/// Commands are queued behind ticks and other commands; `send` waits for the
/// runtime to apply one and returns the resulting snapshot.
#[derive(Debug, Clone)]
pub struct ExecutorHandle {
    event_tx: mpsc::Sender<RuntimeEvent>,
    snapshot_tx: broadcast::Sender<Snapshot>,
}

impl ExecutorHandle {
    pub(crate) fn new(
        event_tx: mpsc::Sender<RuntimeEvent>,
        snapshot_tx: broadcast::Sender<Snapshot>,
    ) -> Self {
        Self {
            event_tx,
            snapshot_tx,
        }
    }

    /// Submit a command and wait for its outcome.
    pub async fn send(&self, command: Command) -> Result<Snapshot> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.event_tx
            .send(RuntimeEvent::Command {
                command,
                reply: Some(reply_tx),
            })
            .await
            .map_err(|_| RaceStartError::ExecutorGone)?;

        let outcome = reply_rx.await.map_err(|_| RaceStartError::ExecutorGone)?;
        Ok(outcome?)
    }

    /// Submit a command without waiting for it to be applied.
    pub async fn submit(&self, command: Command) -> Result<()> {
        self.event_tx
            .send(RuntimeEvent::Command {
                command,
                reply: None,
            })
            .await
            .map_err(|_| RaceStartError::ExecutorGone)
    }

    /// Receive every snapshot published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<Snapshot> {
        self.snapshot_tx.subscribe()
    }

    pub async fn shutdown(&self) -> Result<()> {
        self.event_tx
            .send(RuntimeEvent::ShutdownRequested)
            .await
            .map_err(|_| RaceStartError::ExecutorGone)
    }
}
