// src/watch/mod.rs

//! Hot reload of the procedure document.
//!
//! `notify` reports changes in the document's directory; `blake3` content
//! hashes filter out saves that did not change anything. Changed documents
//! are submitted to the executor as `load_graph`, which keeps the current
//! graph when the new one is invalid or a sequence is running.

pub mod hash;
pub mod watcher;

pub use hash::{ContentTracker, compute_file_hash};
pub use watcher::{ReloadOutcome, WatcherHandle, process_procedure_change, spawn_procedure_watcher};
