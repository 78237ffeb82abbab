// src/procedure/compiler.rs

//! Conversion between the linear authoring view and the graph form.
//!
//! `compile` turns an ordered list of steps into a chain behind a synthetic
//! IDLE entry node. `decompile` walks a document back into that list, which
//! is also how countdown offsets are derived for display.

use std::collections::{BTreeSet, HashSet};

use crate::errors::GraphValidationError;
use crate::procedure::graph::ProcedureGraph;
use crate::procedure::model::{ENTRY_NODE_ID, Edge, RawProcedureGraph, StepNode, StepSpec};
use crate::types::{NodeId, RaceStatus};

/// A primary step together with the time left to the start signal when it
/// begins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledStep {
    pub node_id: NodeId,
    pub step: StepSpec,
    /// Sum of the durations of every later primary step.
    pub countdown_offset_seconds: u64,
}

fn entry_step() -> StepSpec {
    StepSpec {
        label: "Idle".to_string(),
        race_status: Some(RaceStatus::Idle),
        ..StepSpec::default()
    }
}

/// Build the document for `steps` without validating it.
pub fn compile_document(id: &str, steps: &[StepSpec]) -> RawProcedureGraph {
    let mut nodes = Vec::with_capacity(steps.len() + 1);
    let mut edges = Vec::with_capacity(steps.len());

    nodes.push(StepNode::new(ENTRY_NODE_ID, entry_step()));
    let mut previous = ENTRY_NODE_ID.to_string();

    for (i, step) in steps.iter().enumerate() {
        let node_id = (i + 1).to_string();
        nodes.push(StepNode::new(node_id.clone(), step.clone()));
        edges.push(Edge::new(previous, node_id.clone()));
        previous = node_id;
    }

    RawProcedureGraph {
        id: id.to_string(),
        nodes,
        edges,
        auto_restart: false,
    }
}

/// Compile and validate an authored step list.
pub fn compile(steps: &[StepSpec]) -> Result<ProcedureGraph, GraphValidationError> {
    ProcedureGraph::try_from(compile_document("custom", steps))
}

/// Node ids on the primary walk, entry first.
///
/// Follows the first-defined outgoing edge and stops at a dead end or a
/// repeated node, so it terminates on any document.
fn primary_walk(graph: &RawProcedureGraph) -> Vec<&str> {
    let Some(entry) = graph.entry_node() else {
        return Vec::new();
    };

    let mut seen = HashSet::new();
    let mut walk = Vec::new();
    let mut current = entry.id.as_str();

    while seen.insert(current) {
        walk.push(current);
        match graph.first_successor(current) {
            Some(next) => current = next.as_str(),
            None => break,
        }
    }
    walk
}

/// Recover the ordered step list (entry excluded) from a document.
pub fn decompile(graph: &RawProcedureGraph) -> Vec<ScheduledStep> {
    let mut steps: Vec<ScheduledStep> = primary_walk(graph)
        .into_iter()
        .skip(1)
        .filter_map(|id| graph.node(id))
        .map(|node| ScheduledStep {
            node_id: node.id.clone(),
            step: node.step.clone(),
            countdown_offset_seconds: 0,
        })
        .collect();

    let mut later = 0u64;
    for scheduled in steps.iter_mut().rev() {
        scheduled.countdown_offset_seconds = later;
        later = later.saturating_add(scheduled.step.duration_seconds);
    }
    steps
}

/// Nodes the primary walk never visits.
pub fn special_nodes(graph: &RawProcedureGraph) -> BTreeSet<NodeId> {
    let walked: HashSet<&str> = primary_walk(graph).into_iter().collect();
    graph
        .nodes
        .iter()
        .filter(|n| !walked.contains(n.id.as_str()))
        .map(|n| n.id.clone())
        .collect()
}
