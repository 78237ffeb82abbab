// src/config/model.rs

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::engine::{ExecutorOptions, RuntimeOptions};
use crate::procedure::StepSpec;
use crate::types::PrepFlag;

/// Top-level configuration as read from `Racestart.toml`.
///
/// ```toml
/// [sequence]
/// duration_minutes = 5
/// prep_flag = "P"
///
/// [runtime]
/// tick_interval_ms = 1000
///
/// [procedure]
/// path = "procedures/club.json"
/// watch = true
/// ```
///
/// All sections are optional and have reasonable defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub sequence: SequenceSection,

    #[serde(default)]
    pub runtime: RuntimeSection,

    #[serde(default)]
    pub procedure: ProcedureSection,
}

/// Validated configuration. Obtain through `ConfigFile::try_from(raw)`.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub sequence: SequenceSection,
    pub runtime: RuntimeSection,
    pub procedure: ProcedureSection,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(
        sequence: SequenceSection,
        runtime: RuntimeSection,
        procedure: ProcedureSection,
    ) -> Self {
        Self {
            sequence,
            runtime,
            procedure,
        }
    }

    pub fn executor_options(&self) -> ExecutorOptions {
        ExecutorOptions {
            prep_flag: self.sequence.prep_flag,
            auto_restart: self.sequence.auto_restart,
            restart_gap: Duration::from_secs(self.sequence.restart_gap_seconds),
        }
    }

    pub fn runtime_options(&self) -> RuntimeOptions {
        RuntimeOptions {
            tick_interval: Duration::from_millis(self.runtime.tick_interval_ms),
            command_buffer: self.runtime.command_buffer,
            snapshot_buffer: self.runtime.snapshot_buffer,
        }
    }
}

impl Default for ConfigFile {
    fn default() -> Self {
        let raw = RawConfigFile::default();
        Self::new_unchecked(raw.sequence, raw.runtime, raw.procedure)
    }
}

/// `[sequence]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct SequenceSection {
    /// Length of the standard sequence, warning to start.
    #[serde(default = "default_duration_minutes")]
    pub duration_minutes: u32,

    #[serde(default)]
    pub prep_flag: PrepFlag,

    /// If `None`, the procedure document decides.
    #[serde(default)]
    pub auto_restart: Option<bool>,

    #[serde(default = "default_restart_gap_seconds")]
    pub restart_gap_seconds: u64,
}

fn default_duration_minutes() -> u32 {
    5
}

fn default_restart_gap_seconds() -> u64 {
    60
}

impl Default for SequenceSection {
    fn default() -> Self {
        Self {
            duration_minutes: default_duration_minutes(),
            prep_flag: PrepFlag::default(),
            auto_restart: None,
            restart_gap_seconds: default_restart_gap_seconds(),
        }
    }
}

/// `[runtime]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct RuntimeSection {
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    #[serde(default = "default_snapshot_buffer")]
    pub snapshot_buffer: usize,

    #[serde(default = "default_command_buffer")]
    pub command_buffer: usize,
}

fn default_tick_interval_ms() -> u64 {
    1000
}

fn default_snapshot_buffer() -> usize {
    64
}

fn default_command_buffer() -> usize {
    32
}

impl Default for RuntimeSection {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
            snapshot_buffer: default_snapshot_buffer(),
            command_buffer: default_command_buffer(),
        }
    }
}

/// `[procedure]` section: either a document on disk or inline steps.
///
/// ```toml
/// [[procedure.step]]
/// label = "Warning"
/// duration_seconds = 60
/// flags_up = ["CLASS"]
/// race_status = "WARNING"
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProcedureSection {
    #[serde(default)]
    pub path: Option<PathBuf>,

    /// Reload the document when the file changes.
    #[serde(default)]
    pub watch: bool,

    /// Id given to a procedure compiled from inline steps.
    #[serde(default)]
    pub id: Option<String>,

    #[serde(default, rename = "step")]
    pub steps: Vec<StepSpec>,
}
