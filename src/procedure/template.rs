// src/procedure/template.rs

//! Built-in start sequence used when no custom procedure is configured.
//!
//! The primary path is the classic N-minute start (warning, preparatory,
//! one-minute, start). Postponement, recalls and abandonment are special
//! nodes the operator triggers by id.

use std::collections::BTreeSet;

use crate::errors::GraphValidationError;
use crate::procedure::compiler::compile_document;
use crate::procedure::graph::ProcedureGraph;
use crate::procedure::model::StepSpec;
use crate::types::{FlagId, RaceStatus, SoundSignal};

pub const DEFAULT_SEQUENCE_MINUTES: u32 = 5;
/// Shortest sequence with a preparatory period of at least one minute.
pub const MIN_SEQUENCE_MINUTES: u32 = 3;

pub const WARNING_NODE: &str = "1";
pub const START_NODE: &str = "4";

pub const POSTPONE: &str = "postpone";
pub const POSTPONE_DOWN: &str = "postpone_down";
pub const GENERAL_RECALL: &str = "general_recall";
pub const GENERAL_RECALL_DOWN: &str = "general_recall_down";
pub const INDIVIDUAL_RECALL: &str = "individual_recall";
pub const ABANDON: &str = "abandon";

fn flags<const N: usize>(list: [FlagId; N]) -> BTreeSet<FlagId> {
    list.into_iter().collect()
}

fn primary_steps(minutes: u32) -> Vec<StepSpec> {
    vec![
        StepSpec {
            label: "Warning Signal".to_string(),
            duration_seconds: 60,
            flags_up: flags([FlagId::Class]),
            sound_on_enter: SoundSignal::OneShort,
            race_status: Some(RaceStatus::Warning),
            ..StepSpec::default()
        },
        StepSpec {
            label: "Preparatory Signal".to_string(),
            duration_seconds: u64::from(minutes - 2) * 60,
            flags_up: flags([FlagId::Class, FlagId::Prep]),
            sound_on_enter: SoundSignal::OneShort,
            sound_on_flag_removal: SoundSignal::OneLong,
            race_status: Some(RaceStatus::Preparatory),
            ..StepSpec::default()
        },
        StepSpec {
            label: "One-Minute".to_string(),
            duration_seconds: 60,
            flags_up: flags([FlagId::Class]),
            sound_on_flag_removal: SoundSignal::OneShort,
            race_status: Some(RaceStatus::OneMinute),
            ..StepSpec::default()
        },
        StepSpec {
            label: "Start".to_string(),
            race_status: Some(RaceStatus::Racing),
            ..StepSpec::default()
        },
    ]
}

/// Standard sequence of `minutes` length with the usual override branches.
pub fn standard_procedure(minutes: u32) -> Result<ProcedureGraph, GraphValidationError> {
    if minutes < MIN_SEQUENCE_MINUTES {
        return Err(GraphValidationError::Malformed(format!(
            "a standard sequence needs at least {MIN_SEQUENCE_MINUTES} minutes (got {minutes})"
        )));
    }

    let mut doc = compile_document(&format!("standard-{minutes}min"), &primary_steps(minutes));

    doc.add_special(
        POSTPONE,
        StepSpec {
            label: "Postponement".to_string(),
            flags_up: flags([FlagId::Ap]),
            sound_on_enter: SoundSignal::TwoShort,
            sound_on_flag_removal: SoundSignal::OneShort,
            wait_for_trigger: true,
            action_label: Some("Lower AP".to_string()),
            race_status: Some(RaceStatus::Postponed),
            ..StepSpec::default()
        },
        Some(POSTPONE_DOWN),
    );
    doc.add_special(
        POSTPONE_DOWN,
        StepSpec {
            label: "AP Lowered".to_string(),
            duration_seconds: 60,
            race_status: Some(RaceStatus::Postponed),
            ..StepSpec::default()
        },
        Some(WARNING_NODE),
    );
    doc.add_special(
        GENERAL_RECALL,
        StepSpec {
            label: "General Recall".to_string(),
            flags_up: flags([FlagId::FirstSub]),
            sound_on_enter: SoundSignal::TwoShort,
            sound_on_flag_removal: SoundSignal::OneShort,
            wait_for_trigger: true,
            action_label: Some("Lower 1st Substitute".to_string()),
            race_status: Some(RaceStatus::GeneralRecall),
            ..StepSpec::default()
        },
        Some(GENERAL_RECALL_DOWN),
    );
    doc.add_special(
        GENERAL_RECALL_DOWN,
        StepSpec {
            label: "1st Substitute Lowered".to_string(),
            duration_seconds: 60,
            race_status: Some(RaceStatus::GeneralRecall),
            ..StepSpec::default()
        },
        Some(WARNING_NODE),
    );
    doc.add_special(
        INDIVIDUAL_RECALL,
        StepSpec {
            label: "Individual Recall".to_string(),
            duration_seconds: 240,
            flags_up: flags([FlagId::X]),
            sound_on_enter: SoundSignal::OneShort,
            race_status: Some(RaceStatus::IndividualRecall),
            ..StepSpec::default()
        },
        Some(START_NODE),
    );
    doc.add_special(
        ABANDON,
        StepSpec {
            label: "Abandonment".to_string(),
            flags_up: flags([FlagId::N]),
            sound_on_enter: SoundSignal::ThreeShort,
            race_status: Some(RaceStatus::Abandoned),
            ..StepSpec::default()
        },
        None,
    );

    ProcedureGraph::try_from(doc)
}

/// The five-minute standard sequence.
pub fn default_procedure() -> ProcedureGraph {
    match standard_procedure(DEFAULT_SEQUENCE_MINUTES) {
        Ok(graph) => graph,
        Err(err) => unreachable!("built-in procedure is invalid: {err}"),
    }
}
