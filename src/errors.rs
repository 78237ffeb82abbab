// src/errors.rs

//! Crate-wide error types.

use thiserror::Error;

use crate::engine::CommandKind;
use crate::types::{FlagId, NodeId, RaceStatus};

#[derive(Error, Debug)]
pub enum RaceStartError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid procedure: {0}")]
    GraphValidation(#[from] GraphValidationError),

    #[error(transparent)]
    Command(#[from] CommandError),

    #[error("sequence executor is no longer running")]
    ExecutorGone,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Why a procedure document cannot become a `ProcedureGraph`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphValidationError {
    #[error("malformed procedure document: {0}")]
    Malformed(String),

    #[error("procedure has no nodes")]
    Empty,

    #[error("duplicate node id '{0}'")]
    DuplicateNode(NodeId),

    #[error("edge '{edge}' references unknown node '{node}'")]
    UnknownEdgeEndpoint { edge: String, node: NodeId },

    #[error("procedure has no IDLE entry node")]
    NoEntryNode,

    #[error("procedure has several IDLE entry nodes: {0:?}")]
    MultipleEntryNodes(Vec<NodeId>),

    #[error("node '{node}' has several outgoing edges (to {targets:?})")]
    AmbiguousFanOut { node: NodeId, targets: Vec<NodeId> },

    #[error("primary path revisits node '{0}'")]
    CyclicPrimaryPath(NodeId),

    #[error("primary path ends at node '{node}' with status {status:?}, expected RACING")]
    UnterminatedPrimaryPath {
        node: NodeId,
        status: Option<RaceStatus>,
    },

    #[error("RACING node '{node}' raises non-result flags {flags:?}")]
    FlagsAtStart { node: NodeId, flags: Vec<FlagId> },

    #[error("node '{node}' has no status, can be entered while RACING and raises {flags:?}")]
    FlagsWhileRacing { node: NodeId, flags: Vec<FlagId> },

    #[error("special branch through node '{0}' is cyclic")]
    CyclicBranch(NodeId),

    #[error("node '{node}' duration {seconds}s exceeds the {max}s limit")]
    DurationOutOfRange { node: NodeId, seconds: u64, max: u64 },
}

/// A command that is not valid in the executor's current state.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{command} rejected: {reason}")]
pub struct InvalidCommand {
    pub command: CommandKind,
    pub reason: String,
}

impl InvalidCommand {
    pub fn new(command: CommandKind, reason: impl Into<String>) -> Self {
        Self {
            command,
            reason: reason.into(),
        }
    }
}

/// Rejection returned to whoever submitted a command.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error(transparent)]
    Invalid(#[from] InvalidCommand),

    #[error(transparent)]
    Graph(#[from] GraphValidationError),
}

/// Timer inconsistency observed while running a sequence.
///
/// Never propagated to callers: the executor logs it and treats the affected
/// countdown as expired.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClockAnomaly {
    #[error("node '{node}' has no representable deadline")]
    MissingDeadline { node: NodeId },
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, RaceStartError>;
