// src/procedure/loader.rs

use std::fs;
use std::path::Path;

use tracing::{info, warn};

use crate::errors::{GraphValidationError, Result};
use crate::procedure::graph::ProcedureGraph;
use crate::procedure::model::RawProcedureGraph;
use crate::procedure::template::standard_procedure;

/// Encoding of a procedure document, picked from the file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Json,
    Toml,
}

impl DocumentFormat {
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => DocumentFormat::Json,
            _ => DocumentFormat::Toml,
        }
    }
}

/// Where the executor's active graph came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcedureSource {
    /// Built-in template; regenerated when a start asks for other minutes.
    Standard { minutes: u32 },
    /// Loaded or compiled document; start minutes are ignored.
    Custom,
}

/// Parse a document without validating it.
pub fn parse_document(
    contents: &str,
    format: DocumentFormat,
) -> std::result::Result<RawProcedureGraph, GraphValidationError> {
    match format {
        DocumentFormat::Json => serde_json::from_str(contents)
            .map_err(|e| GraphValidationError::Malformed(e.to_string())),
        DocumentFormat::Toml => {
            toml::from_str(contents).map_err(|e| GraphValidationError::Malformed(e.to_string()))
        }
    }
}

/// Read and parse a document from disk.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawProcedureGraph> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;
    Ok(parse_document(&contents, DocumentFormat::from_path(path))?)
}

/// Read, parse and validate a document.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ProcedureGraph> {
    let raw = load_from_path(path)?;
    Ok(ProcedureGraph::try_from(raw)?)
}

/// Load `path`, falling back to the standard template of `minutes` length
/// when the file is unreadable or invalid.
pub fn load_or_default(path: impl AsRef<Path>, minutes: u32) -> Result<(ProcedureGraph, ProcedureSource)> {
    let path = path.as_ref();
    match load_and_validate(path) {
        Ok(graph) => {
            info!(path = %path.display(), procedure = %graph.id(), "loaded procedure");
            Ok((graph, ProcedureSource::Custom))
        }
        Err(err) => {
            warn!(
                path = %path.display(),
                error = %err,
                minutes,
                "procedure could not be loaded; using the standard template"
            );
            let graph = standard_procedure(minutes)?;
            Ok((graph, ProcedureSource::Standard { minutes }))
        }
    }
}
