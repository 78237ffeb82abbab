#![allow(dead_code)]

use racestart::procedure::{
    ENTRY_NODE_ID, Edge, ProcedureGraph, RawProcedureGraph, StepNode, StepSpec, compile_document,
};
use racestart::types::{FlagId, RaceStatus, SoundSignal};

/// Builder for `StepSpec` to simplify test setup.
pub struct StepBuilder {
    step: StepSpec,
}

impl StepBuilder {
    pub fn new(label: &str) -> Self {
        Self {
            step: StepSpec {
                label: label.to_string(),
                ..StepSpec::default()
            },
        }
    }

    pub fn duration(mut self, seconds: u64) -> Self {
        self.step.duration_seconds = seconds;
        self
    }

    pub fn flag(mut self, flag: FlagId) -> Self {
        self.step.flags_up.insert(flag);
        self
    }

    pub fn on_enter(mut self, sound: SoundSignal) -> Self {
        self.step.sound_on_enter = sound;
        self
    }

    pub fn on_removal(mut self, sound: SoundSignal) -> Self {
        self.step.sound_on_flag_removal = sound;
        self
    }

    pub fn hold(mut self, action: &str) -> Self {
        self.step.wait_for_trigger = true;
        self.step.action_label = Some(action.to_string());
        self
    }

    pub fn post_trigger(mut self, seconds: u64, flags: &[FlagId]) -> Self {
        self.step.post_trigger_duration_seconds = seconds;
        self.step.post_trigger_flags_up = flags.iter().copied().collect();
        self
    }

    pub fn status(mut self, status: RaceStatus) -> Self {
        self.step.race_status = Some(status);
        self
    }

    pub fn build(self) -> StepSpec {
        self.step
    }
}

/// Builder for procedure documents: a primary chain plus special nodes.
pub struct ProcedureBuilder {
    doc: RawProcedureGraph,
}

impl ProcedureBuilder {
    /// Start from a compiled primary chain.
    pub fn chain(id: &str, steps: Vec<StepSpec>) -> Self {
        Self {
            doc: compile_document(id, &steps),
        }
    }

    /// Start from an empty document.
    pub fn empty(id: &str) -> Self {
        Self {
            doc: RawProcedureGraph {
                id: id.to_string(),
                ..RawProcedureGraph::default()
            },
        }
    }

    pub fn idle_entry(self) -> Self {
        self.node(
            ENTRY_NODE_ID,
            StepBuilder::new("Idle").status(RaceStatus::Idle).build(),
        )
    }

    pub fn node(mut self, id: &str, step: StepSpec) -> Self {
        self.doc.nodes.push(StepNode::new(id, step));
        self
    }

    pub fn edge(mut self, source: &str, target: &str) -> Self {
        self.doc.edges.push(Edge::new(source, target));
        self
    }

    pub fn special(mut self, id: &str, step: StepSpec, rejoin: Option<&str>) -> Self {
        self.doc.add_special(id, step, rejoin);
        self
    }

    pub fn auto_restart(mut self, enabled: bool) -> Self {
        self.doc.auto_restart = enabled;
        self
    }

    pub fn document(self) -> RawProcedureGraph {
        self.doc
    }

    pub fn build(self) -> ProcedureGraph {
        ProcedureGraph::try_from(self.doc).expect("Failed to build valid procedure from builder")
    }
}

/// Warning (10s, CLASS) -> Start (RACING): the smallest useful sequence.
pub fn two_step_steps() -> Vec<StepSpec> {
    vec![
        StepBuilder::new("Warning")
            .duration(10)
            .flag(FlagId::Class)
            .on_enter(SoundSignal::OneShort)
            .on_removal(SoundSignal::OneShort)
            .status(RaceStatus::Warning)
            .build(),
        StepBuilder::new("Start").status(RaceStatus::Racing).build(),
    ]
}
