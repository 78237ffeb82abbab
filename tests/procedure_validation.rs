// tests/procedure_validation.rs

mod common;
use crate::common::init_tracing;

use std::fs;

use racestart::errors::GraphValidationError;
use racestart::procedure::{
    DocumentFormat, MAX_STEP_SECONDS, ProcedureGraph, ProcedureSource, RawProcedureGraph,
    compile_document, load_or_default, parse_document, validate,
};
use racestart::types::{FlagId, RaceStatus};
use racestart_test_utils::builders::{ProcedureBuilder, StepBuilder, two_step_steps};

fn racing() -> racestart::procedure::StepSpec {
    StepBuilder::new("Start").status(RaceStatus::Racing).build()
}

fn warning(secs: u64) -> racestart::procedure::StepSpec {
    StepBuilder::new("Warning")
        .duration(secs)
        .flag(FlagId::Class)
        .status(RaceStatus::Warning)
        .build()
}

#[test]
fn duplicate_node_ids_are_rejected() {
    init_tracing();

    let json = r#"{
        "id": "dup",
        "nodes": [
            {"id": "0", "label": "Idle", "race_status": "IDLE"},
            {"id": "1", "label": "Start", "race_status": "RACING"},
            {"id": "1", "label": "Again", "race_status": "RACING"}
        ],
        "edges": [{"id": "e", "source_node_id": "0", "target_node_id": "1"}]
    }"#;
    let raw = parse_document(json, DocumentFormat::Json).unwrap();

    assert_eq!(raw.nodes.len(), 3);
    assert_eq!(validate(&raw), Err(GraphValidationError::DuplicateNode("1".to_string())));
}

#[test]
fn missing_entry_node_is_rejected() {
    init_tracing();

    let raw = ProcedureBuilder::empty("no-entry")
        .node("1", warning(60))
        .node("2", racing())
        .edge("1", "2")
        .document();

    assert_eq!(validate(&raw), Err(GraphValidationError::NoEntryNode));
}

#[test]
fn second_idle_node_is_rejected() {
    init_tracing();

    let mut steps = two_step_steps();
    steps.insert(0, StepBuilder::new("Also idle").status(RaceStatus::Idle).build());

    assert!(matches!(
        validate(&compile_document("idle2", &steps)),
        Err(GraphValidationError::MultipleEntryNodes(ids)) if ids == vec!["0".to_string(), "1".to_string()]
    ));
}

#[test]
fn cyclic_primary_path_is_rejected() {
    init_tracing();

    let raw = ProcedureBuilder::empty("cycle")
        .idle_entry()
        .node("1", warning(60))
        .node("2", warning(60))
        .edge("0", "1")
        .edge("1", "2")
        .edge("2", "1")
        .document();

    assert_eq!(validate(&raw), Err(GraphValidationError::CyclicPrimaryPath("1".to_string())));
}

#[test]
fn ambiguous_fan_out_is_rejected() {
    init_tracing();

    let raw = ProcedureBuilder::empty("fanout")
        .idle_entry()
        .node("a", racing())
        .node("b", StepBuilder::new("Other").build())
        .edge("0", "a")
        .edge("0", "b")
        .document();

    assert!(matches!(
        validate(&raw),
        Err(GraphValidationError::AmbiguousFanOut { node, targets })
            if node == "0" && targets == vec!["a".to_string(), "b".to_string()]
    ));
}

#[test]
fn unknown_edge_endpoint_is_rejected() {
    init_tracing();

    let raw = ProcedureBuilder::chain("dangling", two_step_steps())
        .edge("2", "ghost")
        .document();

    assert!(matches!(
        validate(&raw),
        Err(GraphValidationError::UnknownEdgeEndpoint { node, .. }) if node == "ghost"
    ));
}

#[test]
fn primary_path_must_end_racing() {
    init_tracing();

    let raw = compile_document("short", &[warning(60)]);

    assert_eq!(
        validate(&raw),
        Err(GraphValidationError::UnterminatedPrimaryPath {
            node: "1".to_string(),
            status: Some(RaceStatus::Warning),
        })
    );
}

#[test]
fn racing_node_may_only_show_result_markers() {
    init_tracing();

    let flagged = StepBuilder::new("Start")
        .flag(FlagId::Class)
        .status(RaceStatus::Racing)
        .build();
    let raw = compile_document("dirty-start", &[warning(60), flagged]);
    assert!(matches!(
        validate(&raw),
        Err(GraphValidationError::FlagsAtStart { flags, .. }) if flags == vec![FlagId::Class]
    ));

    let shortened = StepBuilder::new("Start")
        .flag(FlagId::S)
        .status(RaceStatus::Racing)
        .build();
    assert_eq!(validate(&compile_document("short-course", &[warning(60), shortened])), Ok(()));
}

#[test]
fn cyclic_special_branch_is_rejected() {
    init_tracing();

    let raw = ProcedureBuilder::chain("branchy", two_step_steps())
        .special("x", StepBuilder::new("X").duration(5).build(), Some("y"))
        .special("y", StepBuilder::new("Y").duration(5).build(), Some("x"))
        .document();

    assert!(matches!(validate(&raw), Err(GraphValidationError::CyclicBranch(_))));
}

#[test]
fn durations_are_bounded() {
    init_tracing();

    let raw = compile_document("long", &[warning(MAX_STEP_SECONDS + 1), racing()]);

    assert!(matches!(
        validate(&raw),
        Err(GraphValidationError::DurationOutOfRange { seconds, .. }) if seconds == MAX_STEP_SECONDS + 1
    ));
}

#[test]
fn editor_documents_parse_with_extra_fields() {
    init_tracing();

    let json = r#"{
        "id": "club",
        "nodes": {
            "0": {"label": "Idle", "race_status": "IDLE", "position": {"x": 0, "y": 0}},
            "1": {"label": "Warning", "duration_seconds": 60, "flags_up": ["CLASS"],
                  "sound_on_enter": "ONE_SHORT", "race_status": "WARNING", "type": "step"},
            "2": {"label": "Start", "race_status": "RACING"}
        },
        "edges": [
            {"id": "a", "source_node_id": "0", "target_node_id": "1", "animated": true},
            {"id": "b", "source_node_id": "1", "target_node_id": "2"}
        ],
        "auto_restart": true
    }"#;

    let raw = parse_document(json, DocumentFormat::Json).unwrap();
    let graph = ProcedureGraph::try_from(raw).unwrap();

    assert!(graph.auto_restart());
    assert_eq!(graph.primary(), ["0", "1", "2"]);
    let warning = graph.node("1").unwrap();
    assert_eq!(warning.id, "1");
    assert!(warning.step.flags_up.contains(&FlagId::Class));
    assert!(!warning.step.wait_for_trigger);
}

#[test]
fn toml_documents_parse_node_lists() {
    init_tracing();

    let toml = r#"
        id = "toml-proc"

        [[nodes]]
        id = "0"
        label = "Idle"
        race_status = "IDLE"

        [[nodes]]
        id = "w"
        label = "Warning"
        duration_seconds = 90
        flags_up = ["CLASS", "PREP"]
        race_status = "WARNING"

        [[nodes]]
        id = "s"
        label = "Start"
        race_status = "RACING"

        [[edges]]
        source_node_id = "0"
        target_node_id = "w"

        [[edges]]
        source_node_id = "w"
        target_node_id = "s"
    "#;

    let raw = parse_document(toml, DocumentFormat::Toml).unwrap();
    let graph = ProcedureGraph::try_from(raw).unwrap();

    assert_eq!(graph.id(), "toml-proc");
    assert_eq!(graph.node("w").unwrap().step.duration_seconds, 90);
    assert_eq!(graph.schedule()[0].countdown_offset_seconds, 0);
}

#[test]
fn documents_serialize_nodes_keyed_by_id() {
    init_tracing();

    let doc = compile_document("keyed", &two_step_steps());
    let value = serde_json::to_value(&doc).unwrap();

    assert_eq!(value["nodes"]["1"]["label"], "Warning");
    assert_eq!(value["nodes"]["1"]["flags_up"][0], "CLASS");
    assert_eq!(value["edges"][0]["source_node_id"], "0");
}

#[test]
fn malformed_documents_report_parse_errors() {
    init_tracing();

    let err = parse_document("{ not json", DocumentFormat::Json).unwrap_err();
    assert!(matches!(err, GraphValidationError::Malformed(_)));

    let bad_flag = r#"{"nodes": [{"id": "0", "flags_up": ["PURPLE"]}]}"#;
    assert!(parse_document(bad_flag, DocumentFormat::Json).is_err());
}

#[test]
fn loader_falls_back_to_standard_template() {
    init_tracing();

    let dir = tempfile::tempdir().unwrap();

    let missing = dir.path().join("missing.json");
    let (graph, source) = load_or_default(&missing, 5).unwrap();
    assert_eq!(source, ProcedureSource::Standard { minutes: 5 });
    assert_eq!(graph.schedule().len(), 4);

    let invalid = dir.path().join("invalid.json");
    let raw: RawProcedureGraph = compile_document("bad", &[warning(60)]);
    fs::write(&invalid, serde_json::to_string(&raw).unwrap()).unwrap();
    let (graph, source) = load_or_default(&invalid, 3).unwrap();
    assert_eq!(source, ProcedureSource::Standard { minutes: 3 });
    assert_eq!(graph.schedule()[0].countdown_offset_seconds, 120);

    let valid = dir.path().join("club.json");
    let raw = compile_document("club", &two_step_steps());
    fs::write(&valid, serde_json::to_string_pretty(&raw).unwrap()).unwrap();
    let (graph, source) = load_or_default(&valid, 5).unwrap();
    assert_eq!(source, ProcedureSource::Custom);
    assert_eq!(graph.id(), "club");
}

#[test]
fn statusless_special_raising_signal_flags_is_rejected() {
    init_tracing();

    let raw = ProcedureBuilder::chain("recall", two_step_steps())
        .special("x", StepBuilder::new("Recall").duration(30).flag(FlagId::X).build(), None)
        .document();

    assert_eq!(
        validate(&raw),
        Err(GraphValidationError::FlagsWhileRacing {
            node: "x".to_string(),
            flags: vec![FlagId::X],
        })
    );
}

#[test]
fn inherited_status_is_checked_along_special_branches() {
    init_tracing();

    let steps = vec![
        warning(60),
        StepBuilder::new("Course signal").duration(60).flag(FlagId::Class).build(),
        racing(),
    ];

    // A silent statusless hop rejoins at a flagged statusless step.
    let raw = ProcedureBuilder::chain("branch", steps.clone())
        .special("hop", StepBuilder::new("Hop").duration(5).build(), Some("2"))
        .document();
    assert_eq!(
        validate(&raw),
        Err(GraphValidationError::FlagsWhileRacing {
            node: "2".to_string(),
            flags: vec![FlagId::Class],
        })
    );

    // Naming a status ends the inheritance.
    let recall = StepBuilder::new("Recall")
        .duration(30)
        .flag(FlagId::X)
        .status(RaceStatus::IndividualRecall)
        .build();
    let raw = ProcedureBuilder::chain("branch", steps)
        .special("recall", recall, Some("2"))
        .special("marker", StepBuilder::new("Shortened").flag(FlagId::S).build(), None)
        .document();
    assert_eq!(validate(&raw), Ok(()));
}
