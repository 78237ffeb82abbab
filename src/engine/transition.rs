// src/engine/transition.rs

use std::collections::BTreeSet;

use serde::Serialize;

use crate::types::{FlagId, NodeId, RaceStatus, SoundSignal};

/// What caused a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionCause {
    Timer,
    Operator,
    AutoRestart,
}

/// One change of current node (or of the flags on it).
///
/// Built once from the old and new flag sets, so every raise, lowering and
/// sound appears in exactly one transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Transition {
    pub from: Option<NodeId>,
    pub to: Option<NodeId>,
    pub status: RaceStatus,
    pub raised: Vec<FlagId>,
    pub lowered: Vec<FlagId>,
    /// Removal sound of the exited node first, then the entered node's sound.
    pub sounds: Vec<SoundSignal>,
    pub cause: TransitionCause,
}

impl Transition {
    #[allow(clippy::too_many_arguments)]
    pub fn between(
        from: Option<NodeId>,
        to: Option<NodeId>,
        status: RaceStatus,
        old_flags: &BTreeSet<FlagId>,
        new_flags: &BTreeSet<FlagId>,
        removal_sound: SoundSignal,
        enter_sound: SoundSignal,
        cause: TransitionCause,
    ) -> Self {
        let raised: Vec<FlagId> = new_flags.difference(old_flags).copied().collect();
        let lowered: Vec<FlagId> = old_flags.difference(new_flags).copied().collect();

        let mut sounds = Vec::new();
        if !lowered.is_empty() && !removal_sound.is_none() {
            sounds.push(removal_sound);
        }
        if !enter_sound.is_none() {
            sounds.push(enter_sound);
        }

        Self {
            from,
            to,
            status,
            raised,
            lowered,
            sounds,
            cause,
        }
    }

    /// Lower everything in `flags`, silently.
    pub fn lower_all(
        from: Option<NodeId>,
        status: RaceStatus,
        flags: &BTreeSet<FlagId>,
        cause: TransitionCause,
    ) -> Self {
        Self {
            from,
            to: None,
            status,
            raised: Vec::new(),
            lowered: flags.iter().copied().collect(),
            sounds: Vec::new(),
            cause,
        }
    }

    pub fn is_silent(&self) -> bool {
        self.sounds.is_empty()
    }
}
