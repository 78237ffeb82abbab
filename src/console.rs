// src/console.rs

//! Operator console: commands on stdin, snapshots on stdout.
//!
//! A line is either a JSON command (`{"command": "start", ...}`) or one of
//! the short forms listed in [`HELP`].

use std::path::PathBuf;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::engine::{Command, ExecutorHandle, Snapshot};
use crate::errors::Result;
use crate::procedure::loader::load_from_path;
use crate::types::PrepFlag;

pub const HELP: &str = "\
commands:
  start [minutes] [prep]     begin the sequence (e.g. `start 5 I`)
  resume                     release a hold
  special <node>             trigger a special node (alias: trigger)
  mutate <node> <+/-secs>    change a future step's duration
  prep <flag>                choose the preparatory flag (P, I, Z, U, BLACK)
  reset                      return to idle from a special or terminal state
  finish                     mark the race finished
  auto <on|off>              toggle automatic restart
  load <path>                load a procedure document
  help                       show this text
  quit                       stop the service";

/// One parsed console line.
#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleInput {
    Command(Command),
    Load(PathBuf),
    Help,
    Quit,
}

fn parse_on_off(word: &str) -> std::result::Result<bool, String> {
    match word.to_lowercase().as_str() {
        "on" | "true" | "yes" => Ok(true),
        "off" | "false" | "no" => Ok(false),
        other => Err(format!("expected on or off, got `{other}`")),
    }
}

/// Parse one console line. Blank lines and `#` comments yield `None`.
pub fn parse_line(line: &str) -> std::result::Result<Option<ConsoleInput>, String> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }
    if line.starts_with('{') {
        return serde_json::from_str::<Command>(line)
            .map(|c| Some(ConsoleInput::Command(c)))
            .map_err(|e| format!("invalid JSON command: {e}"));
    }

    let words: Vec<&str> = line.split_whitespace().collect();
    let input = match words.as_slice() {
        ["start", rest @ ..] if rest.len() <= 2 => {
            let mut duration_minutes = None;
            let mut prep_flag = None;
            for word in rest {
                match word.parse::<u32>() {
                    Ok(minutes) => duration_minutes = Some(minutes),
                    Err(_) => prep_flag = Some(word.parse::<PrepFlag>()?),
                }
            }
            ConsoleInput::Command(Command::Start {
                duration_minutes,
                prep_flag,
            })
        }
        ["resume"] => ConsoleInput::Command(Command::Resume),
        ["special" | "trigger", node] => ConsoleInput::Command(Command::TriggerSpecial {
            node_id: node.to_string(),
        }),
        ["mutate", node, delta] => {
            let delta_seconds = delta
                .trim_start_matches('+')
                .parse::<i64>()
                .map_err(|e| format!("invalid delta `{delta}`: {e}"))?;
            ConsoleInput::Command(Command::MutateFutureDuration {
                node_id: node.to_string(),
                delta_seconds,
            })
        }
        ["prep", flag] => ConsoleInput::Command(Command::SetPrepFlag {
            flag: flag.parse()?,
        }),
        ["reset"] => ConsoleInput::Command(Command::Reset),
        ["finish"] => ConsoleInput::Command(Command::Finish),
        ["auto", value] => ConsoleInput::Command(Command::SetAutoRestart {
            enabled: parse_on_off(value)?,
        }),
        ["load", path] => ConsoleInput::Load(PathBuf::from(path)),
        ["help"] => ConsoleInput::Help,
        ["quit" | "exit"] => ConsoleInput::Quit,
        _ => return Err(format!("unrecognised command `{line}` (try `help`)")),
    };
    Ok(Some(input))
}

/// Read operator commands until EOF or `quit`.
///
/// Rejected or malformed commands are logged and reading continues.
pub async fn run_console<R>(input: R, handle: ExecutorHandle) -> Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = input.lines();
    while let Some(line) = lines.next_line().await? {
        let parsed = match parse_line(&line) {
            Ok(Some(parsed)) => parsed,
            Ok(None) => continue,
            Err(err) => {
                warn!(error = %err, "could not parse console input");
                continue;
            }
        };

        let command = match parsed {
            ConsoleInput::Command(command) => command,
            ConsoleInput::Load(path) => match load_from_path(&path) {
                Ok(graph) => Command::LoadGraph { graph },
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "could not read procedure");
                    continue;
                }
            },
            ConsoleInput::Help => {
                eprintln!("{HELP}");
                continue;
            }
            ConsoleInput::Quit => {
                info!("operator requested shutdown");
                handle.shutdown().await?;
                return Ok(());
            }
        };

        let kind = command.kind();
        match handle.send(command).await {
            Ok(snapshot) => debug!(command = %kind, status = %snapshot.status, "command applied"),
            Err(crate::errors::RaceStartError::Command(err)) => {
                warn!(command = %kind, error = %err, "command rejected");
            }
            Err(err) => return Err(err),
        }
    }
    debug!("console input closed");
    Ok(())
}

/// Write each snapshot as one JSON line until the channel closes.
pub async fn print_snapshots<W>(mut rx: broadcast::Receiver<Snapshot>, mut out: W) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    loop {
        match rx.recv().await {
            Ok(snapshot) => {
                let mut line = serde_json::to_vec(&snapshot)?;
                line.push(b'\n');
                out.write_all(&line).await?;
                out.flush().await?;
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                debug!(skipped, "snapshot printer lagged; continuing with latest");
            }
            Err(broadcast::error::RecvError::Closed) => return Ok(()),
        }
    }
}
