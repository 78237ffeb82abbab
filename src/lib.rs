// src/lib.rs

pub mod announce;
pub mod cli;
pub mod config;
pub mod console;
pub mod engine;
pub mod errors;
pub mod logging;
pub mod procedure;
pub mod types;
pub mod watch;

use std::path::{Path, PathBuf};

use anyhow::{Result, bail};
use tokio::io::BufReader;
use tracing::{debug, info, warn};

use crate::announce::LogAnnouncer;
use crate::cli::CliArgs;
use crate::config::{ConfigFile, DEFAULT_CONFIG_FILE, load_or_default};
use crate::console::{print_snapshots, run_console};
use crate::engine::{Command, Executor, Runtime};
use crate::procedure::template::MIN_SEQUENCE_MINUTES;
use crate::procedure::{ProcedureGraph, ProcedureSource, compile_document, standard_procedure};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading and procedure resolution
/// - executor + runtime
/// - (optional) procedure file watcher
/// - operator console and snapshot printer
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<()> {
    let config_path = PathBuf::from(&args.config);
    let cfg = load_or_default(&config_path, args.config != DEFAULT_CONFIG_FILE)?;

    let minutes = args.minutes.unwrap_or(cfg.sequence.duration_minutes);
    if minutes < MIN_SEQUENCE_MINUTES {
        bail!("--minutes must be at least {MIN_SEQUENCE_MINUTES} (got {minutes})");
    }

    let procedure_path = procedure_path(&args, &cfg, &config_path);
    let (graph, source) = resolve_procedure(procedure_path.as_deref(), &cfg, minutes)?;

    if args.dry_run {
        print_dry_run(&graph, source);
        return Ok(());
    }
    if args.emit_graph {
        println!("{}", serde_json::to_string_pretty(graph.document())?);
        return Ok(());
    }

    let mut options = cfg.executor_options();
    if let Some(flag) = args.prep_flag {
        options.prep_flag = flag;
    }
    if args.auto_restart {
        options.auto_restart = Some(true);
    }

    let executor = Executor::new(graph, source, options);
    let (runtime, handle) = Runtime::new(executor, LogAnnouncer, cfg.runtime_options());

    let _watcher_handle = match procedure_path.filter(|_| cfg.procedure.watch) {
        Some(path) => Some(crate::watch::spawn_procedure_watcher(path, handle.clone())?),
        None => None,
    };

    // Ctrl-C → graceful shutdown.
    {
        let handle = handle.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                eprintln!("failed to listen for Ctrl+C: {e}");
                return;
            }
            let _ = handle.shutdown().await;
        });
    }

    let printer = tokio::spawn(print_snapshots(handle.subscribe(), tokio::io::stdout()));
    let runtime_task = tokio::spawn(runtime.run());

    if args.start {
        let snapshot = handle
            .send(Command::Start {
                duration_minutes: Some(minutes),
                prep_flag: None,
            })
            .await?;
        info!(status = %snapshot.status, "sequence started on launch");
    }

    if !args.no_console {
        let handle = handle.clone();
        tokio::spawn(async move {
            let stdin = BufReader::new(tokio::io::stdin());
            if let Err(err) = run_console(stdin, handle).await {
                warn!(error = %err, "operator console stopped");
            }
        });
    }
    drop(handle);

    runtime_task.await??;
    printer.abort();
    Ok(())
}

/// Directory relative config paths are resolved against.
///
/// - If the config path has a non-empty parent (e.g. "club/Racestart.toml"),
///   we use that directory.
/// - If it's just a bare filename, we fall back to the current directory.
fn config_root_dir(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// `--procedure` wins over `[procedure].path`; the latter is relative to the
/// config file.
fn procedure_path(args: &CliArgs, cfg: &ConfigFile, config_path: &Path) -> Option<PathBuf> {
    if let Some(path) = &args.procedure {
        return Some(PathBuf::from(path));
    }
    cfg.procedure.path.as_ref().map(|path| {
        if path.is_relative() {
            config_root_dir(config_path).join(path)
        } else {
            path.clone()
        }
    })
}

fn resolve_procedure(
    path: Option<&Path>,
    cfg: &ConfigFile,
    minutes: u32,
) -> Result<(ProcedureGraph, ProcedureSource)> {
    if let Some(path) = path {
        return Ok(crate::procedure::load_or_default(path, minutes)?);
    }

    if !cfg.procedure.steps.is_empty() {
        let id = cfg.procedure.id.as_deref().unwrap_or("inline");
        match ProcedureGraph::try_from(compile_document(id, &cfg.procedure.steps)) {
            Ok(graph) => return Ok((graph, ProcedureSource::Custom)),
            Err(err) => {
                warn!(error = %err, "inline procedure is invalid; using the standard template");
            }
        }
    }

    Ok((
        standard_procedure(minutes)?,
        ProcedureSource::Standard { minutes },
    ))
}

fn format_clock(seconds: u64) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}

/// Dry-run output: schedule with countdown offsets, then special nodes.
fn print_dry_run(graph: &ProcedureGraph, source: ProcedureSource) {
    println!("racestart dry-run");
    println!("  procedure = {}", graph.id());
    println!("  source = {source:?}");
    println!("  auto_restart = {}", graph.auto_restart());
    println!();

    let schedule = graph.schedule();
    println!("steps ({}):", schedule.len());
    for scheduled in &schedule {
        let step = &scheduled.step;
        let begins_at = scheduled.countdown_offset_seconds + step.duration_seconds;
        println!(
            "  - T-{:>5}  [{}] {} ({}s)",
            format_clock(begins_at),
            scheduled.node_id,
            step.label,
            step.duration_seconds
        );
        if !step.flags_up.is_empty() {
            println!("      flags: {:?}", step.flags_up);
        }
        if !step.sound_on_enter.is_none() {
            println!("      sound on enter: {}", step.sound_on_enter);
        }
        if !step.sound_on_flag_removal.is_none() {
            println!("      sound on removal: {}", step.sound_on_flag_removal);
        }
        if step.wait_for_trigger {
            println!(
                "      waits for: {}",
                step.action_label.as_deref().unwrap_or("operator")
            );
        }
    }

    let specials: Vec<&str> = graph.special_nodes().collect();
    if !specials.is_empty() {
        println!();
        println!("special nodes ({}):", specials.len());
        for id in specials {
            let label = graph.node(id).map_or("", |n| n.step.label.as_str());
            match graph.next(id) {
                Some(next) => println!("  - [{id}] {label} -> {next}"),
                None => println!("  - [{id}] {label}"),
            }
        }
    }

    debug!("dry-run complete (no sequence started)");
}
