// src/engine/state.rs

use std::collections::BTreeSet;
use std::time::Instant;

use crate::types::{FlagId, NodeId, PrepFlag, RaceStatus};

/// What the current node is waiting for.
///
/// A `None` deadline means the duration could not be added to the anchor
/// instant; the executor reports a clock anomaly and treats it as expired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Countdown { deadline: Option<Instant> },
    /// Clock stopped until the operator resumes.
    Holding,
    PostTrigger { deadline: Option<Instant> },
    /// Nothing left to wait for on this node.
    Settled,
}

impl Phase {
    pub fn deadline(&self) -> Option<Option<Instant>> {
        match self {
            Phase::Countdown { deadline } | Phase::PostTrigger { deadline } => Some(*deadline),
            Phase::Holding | Phase::Settled => None,
        }
    }
}

/// State of a running sequence. Absent while the executor is idle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutorState {
    /// `None` once the race is finished.
    pub current_node_id: Option<NodeId>,
    pub phase: Phase,
    pub status: RaceStatus,
    pub active_flags: BTreeSet<FlagId>,
    pub resolved_prep_flag: PrepFlag,
    pub auto_restart: bool,
    pub restart_at: Option<Instant>,
    /// Minutes requested by the start that began this sequence.
    pub started_with_minutes: Option<u32>,
}

impl ExecutorState {
    pub fn new(prep_flag: PrepFlag, auto_restart: bool, minutes: Option<u32>) -> Self {
        Self {
            current_node_id: None,
            phase: Phase::Settled,
            status: RaceStatus::Idle,
            active_flags: BTreeSet::new(),
            resolved_prep_flag: prep_flag,
            auto_restart,
            restart_at: None,
            started_with_minutes: minutes,
        }
    }

    pub fn waiting_for_trigger(&self) -> bool {
        self.phase == Phase::Holding
    }

    /// Whole seconds left on the current countdown, rounded up.
    pub fn remaining_seconds(&self, now: Instant) -> Option<u64> {
        let deadline = self.phase.deadline()?;
        Some(deadline.map_or(0, |d| ceil_seconds(d.saturating_duration_since(now))))
    }

    /// Whether the runtime should keep ticking for this state.
    pub fn needs_ticks(&self) -> bool {
        self.phase != Phase::Settled || self.restart_at.is_some()
    }
}

fn ceil_seconds(d: std::time::Duration) -> u64 {
    let secs = d.as_secs();
    if d.subsec_nanos() > 0 { secs + 1 } else { secs }
}
