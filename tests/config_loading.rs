// tests/config_loading.rs

mod common;
use crate::common::init_tracing;

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use racestart::config::{ConfigFile, RawConfigFile, load_and_validate, load_or_default};
use racestart::errors::RaceStartError;
use racestart::procedure::{ProcedureGraph, compile_document};
use racestart::types::{FlagId, PrepFlag, RaceStatus};
use tempfile::TempDir;

fn write_config(contents: &str) -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("Racestart.toml");
    fs::write(&path, contents).unwrap();
    (dir, path)
}

fn parse(contents: &str) -> Result<ConfigFile, RaceStartError> {
    let raw: RawConfigFile = toml::from_str(contents).unwrap();
    ConfigFile::try_from(raw)
}

#[test]
fn full_config_is_loaded() {
    init_tracing();

    let (_dir, path) = write_config(
        r#"
        [sequence]
        duration_minutes = 4
        prep_flag = "Z"
        auto_restart = true
        restart_gap_seconds = 90

        [runtime]
        tick_interval_ms = 250
        snapshot_buffer = 8
        command_buffer = 4

        [procedure]
        id = "inline-club"

        [[procedure.step]]
        label = "Warning"
        duration_seconds = 60
        flags_up = ["CLASS"]
        sound_on_enter = "ONE_SHORT"
        race_status = "WARNING"

        [[procedure.step]]
        label = "Start"
        race_status = "RACING"
        "#,
    );

    let cfg = load_and_validate(&path).unwrap();

    assert_eq!(cfg.sequence.duration_minutes, 4);
    let options = cfg.executor_options();
    assert_eq!(options.prep_flag, PrepFlag::Z);
    assert_eq!(options.auto_restart, Some(true));
    assert_eq!(options.restart_gap, Duration::from_secs(90));

    let runtime = cfg.runtime_options();
    assert_eq!(runtime.tick_interval, Duration::from_millis(250));
    assert_eq!(runtime.snapshot_buffer, 8);
    assert_eq!(runtime.command_buffer, 4);

    assert_eq!(cfg.procedure.steps.len(), 2);
    assert!(cfg.procedure.steps[0].flags_up.contains(&FlagId::Class));
    let doc = compile_document(cfg.procedure.id.as_deref().unwrap(), &cfg.procedure.steps);
    let graph = ProcedureGraph::try_from(doc).unwrap();
    assert_eq!(graph.node("2").unwrap().step.race_status, Some(RaceStatus::Racing));
}

#[test]
fn empty_config_uses_defaults() {
    init_tracing();

    let cfg = parse("").unwrap();

    assert_eq!(cfg.sequence.duration_minutes, 5);
    assert_eq!(cfg.sequence.prep_flag, PrepFlag::P);
    assert_eq!(cfg.sequence.auto_restart, None);
    assert_eq!(cfg.runtime_options().tick_interval, Duration::from_secs(1));
    assert!(cfg.procedure.path.is_none());
    assert!(!cfg.procedure.watch);
}

#[test]
fn out_of_range_values_are_rejected() {
    init_tracing();

    let cases = [
        "[sequence]\nduration_minutes = 2",
        "[sequence]\nrestart_gap_seconds = 0",
        "[runtime]\ntick_interval_ms = 5",
        "[runtime]\ntick_interval_ms = 5000",
        "[runtime]\nsnapshot_buffer = 0",
        "[runtime]\ncommand_buffer = 0",
        "[procedure]\nwatch = true",
        "[procedure]\npath = \"club.json\"\n[[procedure.step]]\nlabel = \"Start\"",
    ];

    for case in cases {
        let result = parse(case);
        assert!(
            matches!(result, Err(RaceStartError::ConfigError(_))),
            "expected rejection for {case:?}, got {result:?}"
        );
    }
}

#[test]
fn unknown_prep_flag_fails_to_parse() {
    init_tracing();

    let (_dir, path) = write_config("[sequence]\nprep_flag = \"CLASS\"\n");

    assert!(matches!(
        load_and_validate(&path),
        Err(RaceStartError::TomlError(_))
    ));
}

#[test]
fn missing_default_config_falls_back() {
    init_tracing();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("Racestart.toml");

    let cfg = load_or_default(&path, false).unwrap();
    assert_eq!(cfg.sequence.duration_minutes, 5);

    assert!(matches!(
        load_or_default(&path, true),
        Err(RaceStartError::IoError(_))
    ));
}

#[test]
fn existing_config_is_validated_even_when_implicit() {
    init_tracing();

    let (_dir, path) = write_config("[sequence]\nduration_minutes = 1\n");

    assert!(matches!(
        load_or_default(&path, false),
        Err(RaceStartError::ConfigError(_))
    ));
}
