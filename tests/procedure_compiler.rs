// tests/procedure_compiler.rs

mod common;
use crate::common::init_tracing;

use std::collections::BTreeSet;

use racestart::errors::GraphValidationError;
use racestart::procedure::{
    ENTRY_NODE_ID, compile, compile_document, decompile, default_procedure, special_nodes,
    standard_procedure,
};
use racestart::types::{FlagId, RaceStatus};
use racestart_test_utils::builders::{ProcedureBuilder, StepBuilder, two_step_steps};

fn standard_steps() -> Vec<racestart::procedure::StepSpec> {
    vec![
        StepBuilder::new("Warning").duration(60).flag(FlagId::Class).status(RaceStatus::Warning).build(),
        StepBuilder::new("Preparatory").duration(180).flag(FlagId::Prep).status(RaceStatus::Preparatory).build(),
        StepBuilder::new("One-Minute").duration(60).flag(FlagId::Class).status(RaceStatus::OneMinute).build(),
        StepBuilder::new("Start").status(RaceStatus::Racing).build(),
    ]
}

#[test]
fn compile_document_prepends_idle_entry_and_chains_steps() {
    init_tracing();

    let doc = compile_document("club", &two_step_steps());

    let ids: Vec<&str> = doc.nodes.iter().map(|n| n.id.as_str()).collect();
    assert_eq!(ids, vec![ENTRY_NODE_ID, "1", "2"]);
    assert_eq!(doc.nodes[0].step.race_status, Some(RaceStatus::Idle));
    assert_eq!(doc.nodes[0].step.label, "Idle");

    let edges: Vec<(&str, &str, &str)> = doc
        .edges
        .iter()
        .map(|e| (e.id.as_str(), e.source_node_id.as_str(), e.target_node_id.as_str()))
        .collect();
    assert_eq!(edges, vec![("e0-1", "0", "1"), ("e1-2", "1", "2")]);
}

#[test]
fn decompile_reports_countdown_offsets() {
    init_tracing();

    let schedule = decompile(&compile_document("std", &standard_steps()));

    let offsets: Vec<u64> = schedule.iter().map(|s| s.countdown_offset_seconds).collect();
    assert_eq!(offsets, vec![240, 60, 0, 0]);

    let labels: Vec<&str> = schedule.iter().map(|s| s.step.label.as_str()).collect();
    assert_eq!(labels, vec!["Warning", "Preparatory", "One-Minute", "Start"]);
}

#[test]
fn decompile_follows_first_defined_edge() {
    init_tracing();

    let doc = ProcedureBuilder::empty("fanout")
        .idle_entry()
        .node("a", StepBuilder::new("A").status(RaceStatus::Racing).build())
        .node("b", StepBuilder::new("B").status(RaceStatus::Racing).build())
        .edge("0", "a")
        .edge("0", "b")
        .document();

    let walked: Vec<String> = decompile(&doc).into_iter().map(|s| s.node_id).collect();
    assert_eq!(walked, vec!["a".to_string()]);
    assert_eq!(special_nodes(&doc), BTreeSet::from(["b".to_string()]));
}

#[test]
fn decompile_terminates_on_cycles() {
    init_tracing();

    let doc = ProcedureBuilder::empty("loop")
        .idle_entry()
        .node("a", StepBuilder::new("A").duration(5).build())
        .node("b", StepBuilder::new("B").duration(7).build())
        .edge("0", "a")
        .edge("a", "b")
        .edge("b", "a")
        .document();

    let schedule = decompile(&doc);
    let walked: Vec<&str> = schedule.iter().map(|s| s.node_id.as_str()).collect();
    assert_eq!(walked, vec!["a", "b"]);
    assert_eq!(schedule[0].countdown_offset_seconds, 7);
}

#[test]
fn decompile_without_entry_is_empty() {
    init_tracing();

    let doc = ProcedureBuilder::empty("headless")
        .node("x", StepBuilder::new("X").duration(5).build())
        .document();

    assert!(decompile(&doc).is_empty());
    assert_eq!(special_nodes(&doc), BTreeSet::from(["x".to_string()]));
}

#[test]
fn standard_template_special_nodes() {
    init_tracing();

    let graph = default_procedure();
    let specials = special_nodes(graph.document());
    let expected: BTreeSet<String> = [
        "postpone",
        "postpone_down",
        "general_recall",
        "general_recall_down",
        "individual_recall",
        "abandon",
    ]
    .into_iter()
    .map(String::from)
    .collect();

    assert_eq!(specials, expected);
    assert_eq!(graph.special_nodes().count(), 6);
    assert_eq!(graph.primary(), ["0", "1", "2", "3", "4"]);
    assert_eq!(graph.next("general_recall_down").map(String::as_str), Some("1"));
    assert_eq!(graph.rejoin_index("postpone"), Some(1));
    assert_eq!(graph.rejoin_index("abandon"), None);
}

#[test]
fn standard_template_scales_preparatory_period() {
    init_tracing();

    let three = standard_procedure(3).unwrap();
    let ten = standard_procedure(10).unwrap();

    assert_eq!(three.node("2").unwrap().step.duration_seconds, 60);
    assert_eq!(ten.node("2").unwrap().step.duration_seconds, 480);
    assert_eq!(three.schedule()[0].countdown_offset_seconds, 120);
    assert!(standard_procedure(2).is_err());
}

#[test]
fn compile_validates_the_chain() {
    init_tracing();

    let graph = compile(&two_step_steps()).unwrap();
    assert_eq!(graph.primary(), ["0", "1", "2"]);
    assert_eq!(graph.terminal(), "2");

    let warning_only = vec![StepBuilder::new("Warning").duration(60).status(RaceStatus::Warning).build()];
    assert!(matches!(
        compile(&warning_only),
        Err(GraphValidationError::UnterminatedPrimaryPath { .. })
    ));
}
