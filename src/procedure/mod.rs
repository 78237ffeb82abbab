// src/procedure/mod.rs

//! Procedure graphs: the data that drives a start sequence.
//!
//! - [`model`]: serde document types (`RawProcedureGraph`, `StepNode`, ...).
//! - [`validate`]: structural checks turning a document into a
//!   [`ProcedureGraph`].
//! - [`compiler`]: linear step list <-> graph conversion and countdown offsets.
//! - [`template`]: the built-in standard sequence.
//! - [`loader`]: reading documents from JSON or TOML files.

pub mod compiler;
pub mod graph;
pub mod loader;
pub mod model;
pub mod template;
pub mod validate;

pub use compiler::{ScheduledStep, compile, compile_document, decompile, special_nodes};
pub use graph::{NodeKind, ProcedureGraph};
pub use loader::{DocumentFormat, ProcedureSource, load_and_validate, load_or_default, parse_document};
pub use model::{ENTRY_NODE_ID, Edge, MAX_STEP_SECONDS, RawProcedureGraph, StepNode, StepSpec};
pub use template::{default_procedure, standard_procedure};
pub use validate::validate;
