// src/procedure/model.rs

//! Procedure documents as exchanged with editors and files.
//!
//! A [`RawProcedureGraph`] is only a parsed document: it may contain
//! duplicate ids, dangling edges or cycles. Turn it into a
//! [`ProcedureGraph`](super::ProcedureGraph) through validation before handing
//! it to the executor.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::types::{FlagId, NodeId, RaceStatus, SoundSignal};

/// Id of the synthetic `IDLE` node produced by the compiler.
pub const ENTRY_NODE_ID: &str = "0";

/// Upper bound for any step duration (one day).
pub const MAX_STEP_SECONDS: u64 = 86_400;

/// Authoring view of one step of a start sequence.
///
/// Mirrors a procedure file entry:
///
/// ```toml
/// label = "Preparatory Signal"
/// duration_seconds = 180
/// flags_up = ["CLASS", "PREP"]
/// sound_on_enter = "ONE_SHORT"
/// sound_on_flag_removal = "ONE_LONG"
/// race_status = "PREPARATORY"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StepSpec {
    #[serde(default)]
    pub label: String,

    #[serde(default)]
    pub duration_seconds: u64,

    /// Flags displayed while this step is current. `PREP` resolves to the
    /// operator's preparatory flag.
    #[serde(default)]
    pub flags_up: BTreeSet<FlagId>,

    #[serde(default)]
    pub sound_on_enter: SoundSignal,

    /// Played when leaving this step lowers at least one of its flags.
    #[serde(default)]
    pub sound_on_flag_removal: SoundSignal,

    /// Hold at this step until the operator resumes.
    #[serde(default)]
    pub wait_for_trigger: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_label: Option<String>,

    #[serde(default)]
    pub post_trigger_duration_seconds: u64,

    #[serde(default)]
    pub post_trigger_flags_up: BTreeSet<FlagId>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub race_status: Option<RaceStatus>,
}

/// A step placed in a graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepNode {
    #[serde(default)]
    pub id: NodeId,

    #[serde(flatten)]
    pub step: StepSpec,
}

impl StepNode {
    pub fn new(id: impl Into<NodeId>, step: StepSpec) -> Self {
        Self { id: id.into(), step }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    #[serde(default)]
    pub id: String,
    pub source_node_id: NodeId,
    pub target_node_id: NodeId,
}

impl Edge {
    pub fn new(source: impl Into<NodeId>, target: impl Into<NodeId>) -> Self {
        let source = source.into();
        let target = target.into();
        Self {
            id: format!("e{source}-{target}"),
            source_node_id: source,
            target_node_id: target,
        }
    }
}

/// Procedure document.
///
/// `nodes` is written as a map keyed by node id. On input a list of nodes is
/// accepted too; every entry is kept (duplicates included) so validation can
/// report them.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RawProcedureGraph {
    #[serde(default)]
    pub id: String,

    #[serde(default, with = "node_table")]
    pub nodes: Vec<StepNode>,

    #[serde(default)]
    pub edges: Vec<Edge>,

    #[serde(default)]
    pub auto_restart: bool,
}

impl RawProcedureGraph {
    pub fn node(&self, id: &str) -> Option<&StepNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// The `IDLE` node the sequence starts from, falling back to a node with
    /// the compiler's entry id.
    pub fn entry_node(&self) -> Option<&StepNode> {
        self.nodes
            .iter()
            .find(|n| n.step.race_status == Some(RaceStatus::Idle))
            .or_else(|| self.node(ENTRY_NODE_ID))
    }

    /// First-defined outgoing edge target of `id`.
    pub fn first_successor(&self, id: &str) -> Option<&NodeId> {
        self.edges
            .iter()
            .find(|e| e.source_node_id == id)
            .map(|e| &e.target_node_id)
    }

    /// Append a special node, optionally rejoining `rejoin`.
    pub fn add_special(&mut self, id: &str, step: StepSpec, rejoin: Option<&str>) {
        self.nodes.push(StepNode::new(id, step));
        if let Some(target) = rejoin {
            self.edges.push(Edge::new(id, target));
        }
    }
}

mod node_table {
    use std::fmt;

    use serde::de::{MapAccess, SeqAccess, Visitor};
    use serde::ser::SerializeMap;
    use serde::{Deserializer, Serializer};

    use super::StepNode;

    pub fn serialize<S>(nodes: &[StepNode], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(nodes.len()))?;
        for node in nodes {
            map.serialize_entry(&node.id, node)?;
        }
        map.end()
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<StepNode>, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(NodeTableVisitor)
    }

    struct NodeTableVisitor;

    impl<'de> Visitor<'de> for NodeTableVisitor {
        type Value = Vec<StepNode>;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a map of node id to node, or a list of nodes")
        }

        fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
        where
            A: SeqAccess<'de>,
        {
            let mut nodes = Vec::with_capacity(seq.size_hint().unwrap_or(0));
            while let Some(node) = seq.next_element::<StepNode>()? {
                nodes.push(node);
            }
            Ok(nodes)
        }

        fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
        where
            A: MapAccess<'de>,
        {
            let mut nodes = Vec::with_capacity(map.size_hint().unwrap_or(0));
            while let Some((key, mut node)) = map.next_entry::<String, StepNode>()? {
                if node.id.is_empty() {
                    node.id = key;
                }
                nodes.push(node);
            }
            Ok(nodes)
        }
    }
}
