// tests/console_parsing.rs

mod common;
use crate::common::{init_tracing, with_timeout};

use std::fs;
use std::path::PathBuf;

use racestart::console::{ConsoleInput, parse_line, print_snapshots, run_console};
use racestart::engine::runtime::Runtime;
use racestart::engine::{Command, Executor, ExecutorOptions, RuntimeOptions, Snapshot};
use racestart::procedure::compile_document;
use racestart::types::{PrepFlag, RaceStatus, SoundSignal};
use racestart_test_utils::builders::two_step_steps;
use racestart_test_utils::recording::RecordingAnnouncer;
use tokio::io::BufReader;
use tokio::sync::broadcast;

fn command(line: &str) -> Command {
    match parse_line(line) {
        Ok(Some(ConsoleInput::Command(command))) => command,
        other => panic!("expected a command for {line:?}, got {other:?}"),
    }
}

#[test]
fn short_forms_parse_to_commands() {
    init_tracing();

    assert_eq!(
        command("start"),
        Command::Start {
            duration_minutes: None,
            prep_flag: None
        }
    );
    assert_eq!(
        command("start 7 I"),
        Command::Start {
            duration_minutes: Some(7),
            prep_flag: Some(PrepFlag::I)
        }
    );
    assert_eq!(
        command("  start black "),
        Command::Start {
            duration_minutes: None,
            prep_flag: Some(PrepFlag::Black)
        }
    );
    assert_eq!(
        command("mutate 3 +30"),
        Command::MutateFutureDuration {
            node_id: "3".to_string(),
            delta_seconds: 30
        }
    );
    assert_eq!(
        command("mutate 2 -15"),
        Command::MutateFutureDuration {
            node_id: "2".to_string(),
            delta_seconds: -15
        }
    );
    assert_eq!(
        command("trigger abandon"),
        Command::TriggerSpecial {
            node_id: "abandon".to_string()
        }
    );
    assert_eq!(command("prep z"), Command::SetPrepFlag { flag: PrepFlag::Z });
    assert_eq!(command("auto off"), Command::SetAutoRestart { enabled: false });
    assert_eq!(command("resume"), Command::Resume);
    assert_eq!(command("finish"), Command::Finish);
}

#[test]
fn json_lines_parse_to_commands() {
    init_tracing();

    assert_eq!(
        command(r#"{"command": "mutate_future_duration", "node_id": "3", "delta_seconds": -10}"#),
        Command::MutateFutureDuration {
            node_id: "3".to_string(),
            delta_seconds: -10
        }
    );
    assert_eq!(
        command(r#"{"command": "start"}"#),
        Command::Start {
            duration_minutes: None,
            prep_flag: None
        }
    );
    assert_eq!(command(r#"{"command": "reset"}"#), Command::Reset);
}

#[test]
fn other_inputs() {
    init_tracing();

    assert_eq!(parse_line("   "), Ok(None));
    assert_eq!(parse_line("# warm-up race"), Ok(None));
    assert_eq!(parse_line("help"), Ok(Some(ConsoleInput::Help)));
    assert_eq!(parse_line("exit"), Ok(Some(ConsoleInput::Quit)));
    assert_eq!(
        parse_line("load procs/club.json"),
        Ok(Some(ConsoleInput::Load(PathBuf::from("procs/club.json"))))
    );

    for bad in [
        "dance",
        "start 5 purple",
        "auto maybe",
        "mutate 3 soon",
        r#"{"command": "launch"}"#,
    ] {
        assert!(parse_line(bad).is_err(), "{bad:?} should not parse");
    }
}

#[tokio::test]
async fn console_session_drives_the_runtime() {
    init_tracing();

    let dir = tempfile::tempdir().unwrap();
    let doc_path = dir.path().join("club.json");
    let doc = compile_document("club", &two_step_steps());
    fs::write(&doc_path, serde_json::to_string(&doc).unwrap()).unwrap();

    let announcer = RecordingAnnouncer::new();
    let executor = Executor::standard(ExecutorOptions::default());
    let (runtime, handle) = Runtime::new(executor, announcer.clone(), RuntimeOptions::default());
    let mut rx = handle.subscribe();
    let task = tokio::spawn(runtime.run());

    let script = format!(
        "# session\nload {}\nresume\nnonsense\nstart\nquit\nstart\n",
        doc_path.display()
    );
    with_timeout(run_console(BufReader::new(script.as_bytes()), handle))
        .await
        .unwrap();
    with_timeout(task).await.unwrap().unwrap();

    let loaded = rx.recv().await.unwrap();
    assert_eq!(loaded.status, RaceStatus::Idle);
    let started = rx.recv().await.unwrap();
    assert_eq!(started.status, RaceStatus::Warning);
    assert_eq!(started.remaining_seconds, Some(10));
    assert_eq!(announcer.sounds(), vec![SoundSignal::OneShort]);
}

#[tokio::test]
async fn snapshots_are_printed_as_json_lines() {
    init_tracing();

    let (tx, rx) = broadcast::channel(8);
    let idle = Snapshot::idle(PrepFlag::P, false);
    let mut warning = idle.clone();
    warning.status = RaceStatus::Warning;
    warning.remaining_seconds = Some(60);

    tx.send(idle.clone()).unwrap();
    tx.send(warning.clone()).unwrap();
    drop(tx);

    let mut out = Vec::new();
    with_timeout(print_snapshots(rx, &mut out)).await.unwrap();

    let text = String::from_utf8(out).unwrap();
    let lines: Vec<Snapshot> = text
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(lines, vec![idle, warning]);
    assert!(text.contains(r#""status":"WARNING""#));
}
