// src/config/mod.rs

//! Service configuration for racestart.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Validate value ranges and section combinations (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{DEFAULT_CONFIG_FILE, load_and_validate, load_from_path, load_or_default};
pub use model::{ConfigFile, ProcedureSection, RawConfigFile, RuntimeSection, SequenceSection};
pub use validate::validate_config;
