// src/engine/mod.rs

//! Sequence execution engine.
//!
//! The pure state machine lives in [`core`] (`Executor`): it receives
//! commands and ticks with an explicit `Instant` and returns the flag/sound
//! [`Transition`]s they caused. The async shell in [`runtime`] serializes
//! commands and ticks through one queue, forwards transitions to an
//! announcer and broadcasts [`Snapshot`]s. Collaborators talk to it through
//! an [`ExecutorHandle`].

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

use crate::errors::CommandError;
use crate::procedure::RawProcedureGraph;
use crate::types::{NodeId, PrepFlag};

pub mod core;
pub mod handle;
pub mod runtime;
pub mod snapshot;
pub mod state;
pub mod transition;

pub use core::{Executor, ExecutorOptions};
pub use handle::ExecutorHandle;
pub use runtime::Runtime;
pub use snapshot::Snapshot;
pub use state::{ExecutorState, Phase};
pub use transition::{Transition, TransitionCause};

/// Operator or collaborator request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Command {
    Start {
        #[serde(default)]
        duration_minutes: Option<u32>,
        #[serde(default)]
        prep_flag: Option<PrepFlag>,
    },
    Resume,
    TriggerSpecial {
        node_id: NodeId,
    },
    MutateFutureDuration {
        node_id: NodeId,
        delta_seconds: i64,
    },
    SetPrepFlag {
        flag: PrepFlag,
    },
    Reset,
    Finish,
    LoadGraph {
        graph: RawProcedureGraph,
    },
    SetAutoRestart {
        enabled: bool,
    },
}

impl Command {
    pub fn kind(&self) -> CommandKind {
        match self {
            Command::Start { .. } => CommandKind::Start,
            Command::Resume => CommandKind::Resume,
            Command::TriggerSpecial { .. } => CommandKind::TriggerSpecial,
            Command::MutateFutureDuration { .. } => CommandKind::MutateFutureDuration,
            Command::SetPrepFlag { .. } => CommandKind::SetPrepFlag,
            Command::Reset => CommandKind::Reset,
            Command::Finish => CommandKind::Finish,
            Command::LoadGraph { .. } => CommandKind::LoadGraph,
            Command::SetAutoRestart { .. } => CommandKind::SetAutoRestart,
        }
    }
}

/// Payload-free command name, used in errors and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    Start,
    Resume,
    TriggerSpecial,
    MutateFutureDuration,
    SetPrepFlag,
    Reset,
    Finish,
    LoadGraph,
    SetAutoRestart,
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CommandKind::Start => "start",
            CommandKind::Resume => "resume",
            CommandKind::TriggerSpecial => "trigger_special",
            CommandKind::MutateFutureDuration => "mutate_future_duration",
            CommandKind::SetPrepFlag => "set_prep_flag",
            CommandKind::Reset => "reset",
            CommandKind::Finish => "finish",
            CommandKind::LoadGraph => "load_graph",
            CommandKind::SetAutoRestart => "set_auto_restart",
        };
        f.write_str(s)
    }
}

/// Reply delivered to a command's submitter.
pub type CommandReply = std::result::Result<Snapshot, CommandError>;

/// Events flowing into the runtime.
#[derive(Debug)]
pub enum RuntimeEvent {
    Command {
        command: Command,
        reply: Option<oneshot::Sender<CommandReply>>,
    },
    /// Graceful shutdown requested (e.g. Ctrl-C).
    ShutdownRequested,
}

/// Runtime shell settings.
#[derive(Debug, Clone, Copy)]
pub struct RuntimeOptions {
    /// Cadence of snapshot/tick processing while a sequence is active.
    pub tick_interval: Duration,
    pub command_buffer: usize,
    pub snapshot_buffer: usize,
}

impl Default for RuntimeOptions {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(1),
            command_buffer: 32,
            snapshot_buffer: 64,
        }
    }
}
