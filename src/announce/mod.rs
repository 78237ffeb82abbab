// src/announce/mod.rs

//! Pluggable announcer backend.
//!
//! The runtime hands every batch of [`Transition`]s to an `AnnouncerBackend`
//! instead of driving horns or flag displays itself. `LogAnnouncer` is the
//! default and reports each raise, lowering and sound through `tracing`;
//! tests substitute a recording backend.

use std::future::Future;
use std::pin::Pin;

use tracing::info;

use crate::engine::Transition;
use crate::errors::Result;

/// Receives flag and sound changes in the order they happened.
pub trait AnnouncerBackend: Send {
    fn announce(
        &mut self,
        transitions: Vec<Transition>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}

/// Announcer that logs every transition.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogAnnouncer;

impl AnnouncerBackend for LogAnnouncer {
    fn announce(
        &mut self,
        transitions: Vec<Transition>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            for t in transitions {
                for flag in &t.lowered {
                    info!(flag = %flag, node = ?t.from, "lower flag");
                }
                for flag in &t.raised {
                    info!(flag = %flag, node = ?t.to, "raise flag");
                }
                for sound in &t.sounds {
                    info!(sound = %sound, status = %t.status, "sound signal");
                }
            }
            Ok(())
        })
    }
}
