// src/engine/runtime.rs

use std::fmt;
use std::time::Instant;

use tokio::sync::{broadcast, mpsc};
use tokio::time::{Interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::announce::AnnouncerBackend;
use crate::engine::core::Executor;
use crate::engine::handle::ExecutorHandle;
use crate::engine::transition::Transition;
use crate::engine::{RuntimeEvent, RuntimeOptions, Snapshot};
use crate::errors::Result;

/// Async shell around the pure [`Executor`].
///
/// One loop owns the executor and applies commands and ticks one at a time,
/// so a tick never observes a half-applied command. Transitions go to the
/// announcer; a snapshot is broadcast after every accepted command and
/// every tick.
pub struct Runtime<A: AnnouncerBackend> {
    executor: Executor,
    event_rx: mpsc::Receiver<RuntimeEvent>,
    snapshot_tx: broadcast::Sender<Snapshot>,
    announcer: A,
    options: RuntimeOptions,
}

impl<A: AnnouncerBackend> fmt::Debug for Runtime<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("executor", &self.executor)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

/// Current time on the Tokio clock (pausable in tests).
fn clock_now() -> Instant {
    tokio::time::Instant::now().into_std()
}

async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}

impl<A: AnnouncerBackend> Runtime<A> {
    pub fn new(executor: Executor, announcer: A, options: RuntimeOptions) -> (Self, ExecutorHandle) {
        let (event_tx, event_rx) = mpsc::channel(options.command_buffer.max(1));
        let (snapshot_tx, _) = broadcast::channel(options.snapshot_buffer.max(1));
        let handle = ExecutorHandle::new(event_tx, snapshot_tx.clone());

        let runtime = Self {
            executor,
            event_rx,
            snapshot_tx,
            announcer,
            options,
        };
        (runtime, handle)
    }

    /// Main event loop. Returns on shutdown or when every handle is dropped.
    pub async fn run(mut self) -> Result<()> {
        info!(procedure = %self.executor.graph().id(), "sequence runtime started");

        let mut ticker: Option<Interval> = None;

        loop {
            tokio::select! {
                event = self.event_rx.recv() => {
                    let Some(event) = event else {
                        info!("command channel closed; exiting");
                        break;
                    };
                    if !self.handle_event(event).await {
                        break;
                    }
                }
                _ = next_tick(&mut ticker) => {
                    let now = clock_now();
                    let transitions = self.executor.tick(now);
                    self.announce(transitions).await;
                    self.publish(now);
                }
            }

            self.sync_ticker(&mut ticker);
        }

        info!("runtime exiting");
        Ok(())
    }

    /// Returns `false` when the loop should stop.
    async fn handle_event(&mut self, event: RuntimeEvent) -> bool {
        match event {
            RuntimeEvent::Command { command, reply } => {
                let kind = command.kind();
                debug!(command = %kind, "runtime received command");

                let now = clock_now();
                let outcome = match self.executor.apply(command, now) {
                    Ok(transitions) => {
                        self.announce(transitions).await;
                        Ok(self.publish(now))
                    }
                    Err(err) => {
                        warn!(command = %kind, error = %err, "command rejected");
                        Err(err)
                    }
                };

                if let Some(reply) = reply {
                    // The submitter may have stopped waiting.
                    let _ = reply.send(outcome);
                }
                true
            }
            RuntimeEvent::ShutdownRequested => {
                info!("shutdown requested");
                false
            }
        }
    }

    /// Arm the ticker while the executor has something to count down, drop
    /// it otherwise.
    fn sync_ticker(&self, ticker: &mut Option<Interval>) {
        match (self.executor.needs_ticks(), ticker.is_some()) {
            (true, false) => {
                let period = self.options.tick_interval;
                let mut interval =
                    tokio::time::interval_at(tokio::time::Instant::now() + period, period);
                interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
                *ticker = Some(interval);
                debug!(period_ms = period.as_millis() as u64, "ticker armed");
            }
            (false, true) => {
                *ticker = None;
                debug!("ticker stopped");
            }
            _ => {}
        }
    }

    async fn announce(&mut self, transitions: Vec<Transition>) {
        if transitions.is_empty() {
            return;
        }
        if let Err(err) = self.announcer.announce(transitions).await {
            warn!(error = %err, "announcer failed");
        }
    }

    fn publish(&self, now: Instant) -> Snapshot {
        let snapshot = self.executor.snapshot(now);
        // No subscribers is fine.
        let _ = self.snapshot_tx.send(snapshot.clone());
        snapshot
    }
}
