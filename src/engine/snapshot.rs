// src/engine/snapshot.rs

use serde::{Deserialize, Serialize};

use crate::types::{FlagId, NodeId, PrepFlag, RaceStatus};

/// Complete observable state, published after every command and tick.
///
/// Observers replace their view with the latest snapshot wholesale;
/// receiving the same snapshot twice is harmless.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub status: RaceStatus,
    /// Seconds left on the current node's countdown.
    pub remaining_seconds: Option<u64>,
    /// Seconds left until the start signal, while on the primary path.
    pub sequence_remaining_seconds: Option<u64>,
    pub active_flags: Vec<FlagId>,
    pub current_event_label: String,
    pub waiting_for_trigger: bool,
    pub action_label: Option<String>,
    pub current_node_id: Option<NodeId>,
    pub prep_flag: PrepFlag,
    pub auto_restart: bool,
}

impl Snapshot {
    pub fn idle(prep_flag: PrepFlag, auto_restart: bool) -> Self {
        Self {
            status: RaceStatus::Idle,
            remaining_seconds: None,
            sequence_remaining_seconds: None,
            active_flags: Vec::new(),
            current_event_label: "Idle".to_string(),
            waiting_for_trigger: false,
            action_label: None,
            current_node_id: None,
            prep_flag,
            auto_restart,
        }
    }

    pub fn is_flag_up(&self, flag: FlagId) -> bool {
        self.active_flags.contains(&flag)
    }
}
