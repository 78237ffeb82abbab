// src/config/validate.rs

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{RaceStartError, Result};
use crate::procedure::template::MIN_SEQUENCE_MINUTES;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = RaceStartError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw.sequence, raw.runtime, raw.procedure))
    }
}

pub fn validate_config(cfg: &RawConfigFile) -> Result<()> {
    validate_sequence(cfg)?;
    validate_runtime(cfg)?;
    validate_procedure(cfg)?;
    Ok(())
}

fn config_error(msg: String) -> RaceStartError {
    RaceStartError::ConfigError(msg)
}

fn validate_sequence(cfg: &RawConfigFile) -> Result<()> {
    let minutes = cfg.sequence.duration_minutes;
    if minutes < MIN_SEQUENCE_MINUTES {
        return Err(config_error(format!(
            "[sequence].duration_minutes must be >= {MIN_SEQUENCE_MINUTES} (got {minutes})"
        )));
    }
    if cfg.sequence.restart_gap_seconds == 0 {
        return Err(config_error(
            "[sequence].restart_gap_seconds must be >= 1 (got 0)".to_string(),
        ));
    }
    Ok(())
}

fn validate_runtime(cfg: &RawConfigFile) -> Result<()> {
    let tick = cfg.runtime.tick_interval_ms;
    if !(10..=1000).contains(&tick) {
        return Err(config_error(format!(
            "[runtime].tick_interval_ms must be between 10 and 1000 (got {tick})"
        )));
    }
    if cfg.runtime.snapshot_buffer == 0 {
        return Err(config_error(
            "[runtime].snapshot_buffer must be >= 1 (got 0)".to_string(),
        ));
    }
    if cfg.runtime.command_buffer == 0 {
        return Err(config_error(
            "[runtime].command_buffer must be >= 1 (got 0)".to_string(),
        ));
    }
    Ok(())
}

fn validate_procedure(cfg: &RawConfigFile) -> Result<()> {
    let procedure = &cfg.procedure;
    if procedure.path.is_some() && !procedure.steps.is_empty() {
        return Err(config_error(
            "[procedure] takes either `path` or inline `[[procedure.step]]` entries, not both"
                .to_string(),
        ));
    }
    if procedure.watch && procedure.path.is_none() {
        return Err(config_error(
            "[procedure].watch = true requires [procedure].path".to_string(),
        ));
    }
    Ok(())
}
