use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use racestart::announce::AnnouncerBackend;
use racestart::engine::Transition;
use racestart::errors::Result;
use racestart::types::{FlagId, SoundSignal};

/// Announcer that keeps every transition it receives.
///
/// Clones share the same log, so a test can keep one clone while the
/// runtime owns the other.
#[derive(Debug, Clone, Default)]
pub struct RecordingAnnouncer {
    log: Arc<Mutex<Vec<Transition>>>,
}

impl RecordingAnnouncer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn transitions(&self) -> Vec<Transition> {
        self.log.lock().unwrap().clone()
    }

    pub fn sounds(&self) -> Vec<SoundSignal> {
        self.transitions()
            .into_iter()
            .flat_map(|t| t.sounds)
            .collect()
    }

    pub fn raised(&self) -> Vec<FlagId> {
        self.transitions()
            .into_iter()
            .flat_map(|t| t.raised)
            .collect()
    }

    pub fn lowered(&self) -> Vec<FlagId> {
        self.transitions()
            .into_iter()
            .flat_map(|t| t.lowered)
            .collect()
    }
}

impl AnnouncerBackend for RecordingAnnouncer {
    fn announce(
        &mut self,
        transitions: Vec<Transition>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let log = Arc::clone(&self.log);
        Box::pin(async move {
            log.lock().unwrap().extend(transitions);
            Ok(())
        })
    }
}
