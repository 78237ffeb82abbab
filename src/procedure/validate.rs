// src/procedure/validate.rs

use std::collections::{HashMap, HashSet};

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::errors::GraphValidationError;
use crate::procedure::graph::ProcedureGraph;
use crate::procedure::model::{MAX_STEP_SECONDS, RawProcedureGraph, StepNode};
use crate::types::{FlagId, NodeId, RaceStatus};

type Result<T> = std::result::Result<T, GraphValidationError>;

impl TryFrom<RawProcedureGraph> for ProcedureGraph {
    type Error = GraphValidationError;

    fn try_from(raw: RawProcedureGraph) -> Result<Self> {
        let (next, primary) = analyse(&raw)?;
        Ok(ProcedureGraph::new_unchecked(raw, next, primary))
    }
}

/// Check every structural rule a document must satisfy before it can drive
/// the executor.
pub fn validate(raw: &RawProcedureGraph) -> Result<()> {
    analyse(raw).map(|_| ())
}

fn analyse(raw: &RawProcedureGraph) -> Result<(HashMap<NodeId, NodeId>, Vec<NodeId>)> {
    ensure_unique_nodes(raw)?;
    ensure_durations_in_range(raw)?;
    let next = successor_map(raw)?;
    let entry = entry_node(raw)?;
    let primary = primary_path(raw, &next, entry)?;
    ensure_branches_acyclic(raw)?;
    ensure_clean_start(raw)?;
    ensure_clean_branches(raw, &next, &primary)?;
    Ok((next, primary))
}

fn ensure_unique_nodes(raw: &RawProcedureGraph) -> Result<()> {
    if raw.nodes.is_empty() {
        return Err(GraphValidationError::Empty);
    }

    let mut seen = HashSet::new();
    for node in &raw.nodes {
        if !seen.insert(node.id.as_str()) {
            return Err(GraphValidationError::DuplicateNode(node.id.clone()));
        }
    }
    Ok(())
}

fn ensure_durations_in_range(raw: &RawProcedureGraph) -> Result<()> {
    for node in &raw.nodes {
        let longest = node
            .step
            .duration_seconds
            .max(node.step.post_trigger_duration_seconds);
        if longest > MAX_STEP_SECONDS {
            return Err(GraphValidationError::DurationOutOfRange {
                node: node.id.clone(),
                seconds: longest,
                max: MAX_STEP_SECONDS,
            });
        }
    }
    Ok(())
}

/// One successor per node; both endpoints of every edge must exist.
fn successor_map(raw: &RawProcedureGraph) -> Result<HashMap<NodeId, NodeId>> {
    let known: HashSet<&str> = raw.nodes.iter().map(|n| n.id.as_str()).collect();
    let mut targets: HashMap<&str, Vec<NodeId>> = HashMap::new();

    for edge in &raw.edges {
        for endpoint in [&edge.source_node_id, &edge.target_node_id] {
            if !known.contains(endpoint.as_str()) {
                return Err(GraphValidationError::UnknownEdgeEndpoint {
                    edge: edge.id.clone(),
                    node: endpoint.clone(),
                });
            }
        }
        targets
            .entry(edge.source_node_id.as_str())
            .or_default()
            .push(edge.target_node_id.clone());
    }

    let mut next = HashMap::new();
    for (source, mut outgoing) in targets {
        if outgoing.len() > 1 {
            return Err(GraphValidationError::AmbiguousFanOut {
                node: source.to_string(),
                targets: outgoing,
            });
        }
        if let Some(target) = outgoing.pop() {
            next.insert(source.to_string(), target);
        }
    }
    Ok(next)
}

fn entry_node(raw: &RawProcedureGraph) -> Result<&str> {
    let entries: Vec<&str> = raw
        .nodes
        .iter()
        .filter(|n| n.step.race_status == Some(RaceStatus::Idle))
        .map(|n| n.id.as_str())
        .collect();

    match entries.as_slice() {
        [] => Err(GraphValidationError::NoEntryNode),
        [entry] => Ok(*entry),
        many => Err(GraphValidationError::MultipleEntryNodes(
            many.iter().map(|id| id.to_string()).collect(),
        )),
    }
}

fn primary_path(
    raw: &RawProcedureGraph,
    next: &HashMap<NodeId, NodeId>,
    entry: &str,
) -> Result<Vec<NodeId>> {
    let mut visited = HashSet::new();
    let mut path = Vec::new();
    let mut current = entry.to_string();

    loop {
        if !visited.insert(current.clone()) {
            return Err(GraphValidationError::CyclicPrimaryPath(current));
        }
        path.push(current.clone());
        match next.get(&current) {
            Some(target) => current = target.clone(),
            None => break,
        }
    }

    let status = raw.node(&current).and_then(|n| n.step.race_status);
    if status != Some(RaceStatus::Racing) {
        return Err(GraphValidationError::UnterminatedPrimaryPath {
            node: current,
            status,
        });
    }
    Ok(path)
}

fn ensure_branches_acyclic(raw: &RawProcedureGraph) -> Result<()> {
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();
    for node in &raw.nodes {
        graph.add_node(node.id.as_str());
    }
    for edge in &raw.edges {
        graph.add_edge(edge.source_node_id.as_str(), edge.target_node_id.as_str(), ());
    }

    match toposort(&graph, None) {
        Ok(_order) => Ok(()),
        Err(cycle) => Err(GraphValidationError::CyclicBranch(
            cycle.node_id().to_string(),
        )),
    }
}

fn signal_flags(node: &StepNode) -> Vec<FlagId> {
    node.step
        .flags_up
        .iter()
        .chain(node.step.post_trigger_flags_up.iter())
        .copied()
        .filter(|flag| !flag.is_result_marker())
        .collect()
}

/// Nothing but result markers may be displayed once the race is underway.
fn ensure_clean_start(raw: &RawProcedureGraph) -> Result<()> {
    for node in &raw.nodes {
        if node.step.race_status != Some(RaceStatus::Racing) {
            continue;
        }
        let offending = signal_flags(node);
        if !offending.is_empty() {
            return Err(GraphValidationError::FlagsAtStart {
                node: node.id.clone(),
                flags: offending,
            });
        }
    }
    Ok(())
}

/// Special nodes can be triggered during RACING. Along each special branch a
/// node without a status keeps the status it was entered with, so until a
/// node names a status other than RACING the branch must not raise signal
/// flags.
fn ensure_clean_branches(
    raw: &RawProcedureGraph,
    next: &HashMap<NodeId, NodeId>,
    primary: &[NodeId],
) -> Result<()> {
    let on_primary: HashSet<&str> = primary.iter().map(String::as_str).collect();

    for special in raw.nodes.iter().filter(|n| !on_primary.contains(n.id.as_str())) {
        let mut maybe_racing = true;
        let mut seen = HashSet::new();
        let mut current = Some(special.id.as_str());

        while let Some(id) = current {
            if !maybe_racing || !seen.insert(id) {
                break;
            }
            let Some(node) = raw.node(id) else {
                break;
            };
            match node.step.race_status {
                Some(status) => maybe_racing = status == RaceStatus::Racing,
                None => {
                    let offending = signal_flags(node);
                    if !offending.is_empty() {
                        return Err(GraphValidationError::FlagsWhileRacing {
                            node: node.id.clone(),
                            flags: offending,
                        });
                    }
                }
            }
            current = next.get(id).map(String::as_str);
        }
    }
    Ok(())
}
