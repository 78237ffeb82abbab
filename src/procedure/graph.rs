// src/procedure/graph.rs

use std::collections::HashMap;

use crate::procedure::compiler::{ScheduledStep, decompile};
use crate::procedure::model::{RawProcedureGraph, StepNode};
use crate::types::NodeId;

/// Where a node sits in a validated graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// On the path walked from the entry node; `index` 0 is the entry.
    Primary { index: usize },
    /// Reachable only through an explicit operator trigger.
    Special,
}

/// A procedure document that passed validation.
///
/// Construct through `ProcedureGraph::try_from(raw)` (see
/// [`validate`](super::validate)) or the compiler. Every node has at most one
/// successor, so traversal never depends on edge order.
#[derive(Debug, Clone)]
pub struct ProcedureGraph {
    document: RawProcedureGraph,
    positions: HashMap<NodeId, usize>,
    kinds: HashMap<NodeId, NodeKind>,
    next: HashMap<NodeId, NodeId>,
    primary: Vec<NodeId>,
}

impl ProcedureGraph {
    /// Build from parts that validation already checked.
    pub(crate) fn new_unchecked(
        document: RawProcedureGraph,
        next: HashMap<NodeId, NodeId>,
        primary: Vec<NodeId>,
    ) -> Self {
        let positions = document
            .nodes
            .iter()
            .enumerate()
            .map(|(pos, node)| (node.id.clone(), pos))
            .collect();

        let mut kinds: HashMap<NodeId, NodeKind> = document
            .nodes
            .iter()
            .map(|node| (node.id.clone(), NodeKind::Special))
            .collect();
        for (index, id) in primary.iter().enumerate() {
            kinds.insert(id.clone(), NodeKind::Primary { index });
        }

        Self {
            document,
            positions,
            kinds,
            next,
            primary,
        }
    }

    pub fn id(&self) -> &str {
        &self.document.id
    }

    pub fn auto_restart(&self) -> bool {
        self.document.auto_restart
    }

    pub fn len(&self) -> usize {
        self.document.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.document.nodes.is_empty()
    }

    pub fn document(&self) -> &RawProcedureGraph {
        &self.document
    }

    pub fn into_document(self) -> RawProcedureGraph {
        self.document
    }

    pub fn node(&self, id: &str) -> Option<&StepNode> {
        self.positions.get(id).map(|&pos| &self.document.nodes[pos])
    }

    pub fn kind(&self, id: &str) -> Option<NodeKind> {
        self.kinds.get(id).copied()
    }

    pub fn is_special(&self, id: &str) -> bool {
        self.kind(id) == Some(NodeKind::Special)
    }

    pub fn primary_index(&self, id: &str) -> Option<usize> {
        match self.kind(id)? {
            NodeKind::Primary { index } => Some(index),
            NodeKind::Special => None,
        }
    }

    /// Successor of `id`: the next primary node, or a special node's rejoin
    /// target.
    pub fn next(&self, id: &str) -> Option<&NodeId> {
        self.next.get(id)
    }

    pub fn entry(&self) -> &str {
        &self.primary[0]
    }

    /// The terminal RACING node.
    pub fn terminal(&self) -> &str {
        &self.primary[self.primary.len() - 1]
    }

    /// Primary path, entry first.
    pub fn primary(&self) -> &[NodeId] {
        &self.primary
    }

    /// Special node ids in document order.
    pub fn special_nodes(&self) -> impl Iterator<Item = &str> + '_ {
        self.document
            .nodes
            .iter()
            .map(|n| n.id.as_str())
            .filter(|id| self.is_special(id))
    }

    /// First primary node reached by following successors from `id`.
    pub fn rejoin_index(&self, id: &str) -> Option<usize> {
        let mut current = id;
        for _ in 0..self.len() {
            if let Some(index) = self.primary_index(current) {
                return Some(index);
            }
            current = self.next(current)?;
        }
        None
    }

    /// Primary steps with their countdown offsets.
    pub fn schedule(&self) -> Vec<ScheduledStep> {
        decompile(&self.document)
    }

    pub(crate) fn set_duration(&mut self, id: &str, seconds: u64) -> bool {
        match self.positions.get(id) {
            Some(&pos) => {
                self.document.nodes[pos].step.duration_seconds = seconds;
                true
            }
            None => false,
        }
    }
}
