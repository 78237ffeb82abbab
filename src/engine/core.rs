// src/engine/core.rs

//! Pure sequence executor.
//!
//! `Executor` owns the active procedure graph and the state of the running
//! sequence. It performs no IO and reads no clock: every operation receives
//! the current `Instant`, so tests drive it with synthetic time and the async
//! shell (`engine::runtime::Runtime`) stays a thin adapter.
//!
//! Countdowns are kept as absolute deadlines. When a deadline passes, the
//! next node is anchored at that deadline rather than at the tick that
//! noticed it, so late ticks never shift the start signal.

use std::collections::BTreeSet;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::engine::state::{ExecutorState, Phase};
use crate::engine::transition::{Transition, TransitionCause};
use crate::engine::{Command, CommandKind, Snapshot};
use crate::errors::{ClockAnomaly, CommandError, InvalidCommand};
use crate::procedure::template::{DEFAULT_SEQUENCE_MINUTES, MIN_SEQUENCE_MINUTES};
use crate::procedure::{
    MAX_STEP_SECONDS, NodeKind, ProcedureGraph, ProcedureSource, RawProcedureGraph,
    ScheduledStep, StepNode, default_procedure, standard_procedure,
};
use crate::types::{FlagId, PrepFlag, RaceStatus, SoundSignal};

type CommandResult<T> = std::result::Result<T, CommandError>;

fn reject(command: CommandKind, reason: impl Into<String>) -> CommandError {
    InvalidCommand::new(command, reason).into()
}

fn resolve_flags(flags: &BTreeSet<FlagId>, prep_flag: PrepFlag) -> BTreeSet<FlagId> {
    flags
        .iter()
        .map(|&flag| match flag {
            FlagId::Prep => FlagId::from(prep_flag),
            other => other,
        })
        .collect()
}

#[derive(Debug, Clone, Copy)]
pub struct ExecutorOptions {
    /// Preparatory flag used when a start does not name one.
    pub prep_flag: PrepFlag,
    /// Overrides the graph's `auto_restart` when set.
    pub auto_restart: Option<bool>,
    /// Pause between reaching the start signal and the automatic restart.
    pub restart_gap: Duration,
}

impl Default for ExecutorOptions {
    fn default() -> Self {
        Self {
            prep_flag: PrepFlag::P,
            auto_restart: None,
            restart_gap: Duration::from_secs(60),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Executor {
    graph: ProcedureGraph,
    source: ProcedureSource,
    prep_flag: PrepFlag,
    auto_restart: bool,
    /// Configured or operator-chosen setting; wins over every loaded graph.
    auto_restart_override: Option<bool>,
    restart_gap: Duration,
    run: Option<ExecutorState>,
}

impl Executor {
    pub fn new(graph: ProcedureGraph, source: ProcedureSource, options: ExecutorOptions) -> Self {
        let auto_restart = options.auto_restart.unwrap_or(graph.auto_restart());
        Self {
            graph,
            source,
            prep_flag: options.prep_flag,
            auto_restart,
            auto_restart_override: options.auto_restart,
            restart_gap: options.restart_gap,
            run: None,
        }
    }

    /// Executor on the five-minute standard template.
    pub fn standard(options: ExecutorOptions) -> Self {
        Self::new(
            default_procedure(),
            ProcedureSource::Standard {
                minutes: DEFAULT_SEQUENCE_MINUTES,
            },
            options,
        )
    }

    pub fn graph(&self) -> &ProcedureGraph {
        &self.graph
    }

    pub fn source(&self) -> ProcedureSource {
        self.source
    }

    pub fn state(&self) -> Option<&ExecutorState> {
        self.run.as_ref()
    }

    pub fn status(&self) -> RaceStatus {
        self.run.as_ref().map_or(RaceStatus::Idle, |s| s.status)
    }

    pub fn prep_flag(&self) -> PrepFlag {
        self.prep_flag
    }

    pub fn auto_restart(&self) -> bool {
        self.auto_restart
    }

    /// Whether a countdown, hold or pending restart wants periodic ticks.
    pub fn needs_ticks(&self) -> bool {
        self.run.as_ref().is_some_and(ExecutorState::needs_ticks)
    }

    pub fn schedule(&self) -> Vec<ScheduledStep> {
        self.graph.schedule()
    }

    pub fn current_node(&self) -> Option<&StepNode> {
        let id = self.run.as_ref()?.current_node_id.as_deref()?;
        self.graph.node(id)
    }

    /// Apply one command. Rejected commands leave the executor unchanged.
    pub fn apply(&mut self, command: Command, now: Instant) -> CommandResult<Vec<Transition>> {
        match command {
            Command::Start {
                duration_minutes,
                prep_flag,
            } => self.start(duration_minutes, prep_flag, now),
            Command::Resume => self.resume(now),
            Command::TriggerSpecial { node_id } => self.trigger_special(&node_id, now),
            Command::MutateFutureDuration {
                node_id,
                delta_seconds,
            } => self
                .mutate_future_duration(&node_id, delta_seconds)
                .map(|()| Vec::new()),
            Command::SetPrepFlag { flag } => self.set_prep_flag(flag).map(|()| Vec::new()),
            Command::Reset => self.reset(),
            Command::Finish => self.finish(),
            Command::LoadGraph { graph } => self.load_graph(graph).map(|()| Vec::new()),
            Command::SetAutoRestart { enabled } => {
                self.set_auto_restart(enabled, now);
                Ok(Vec::new())
            }
        }
    }

    /// Begin a sequence from IDLE.
    pub fn start(
        &mut self,
        duration_minutes: Option<u32>,
        prep_flag: Option<PrepFlag>,
        now: Instant,
    ) -> CommandResult<Vec<Transition>> {
        if let Some(state) = &self.run {
            return Err(reject(
                CommandKind::Start,
                format!("a sequence is already active ({})", state.status),
            ));
        }
        if let Some(minutes) = duration_minutes {
            self.use_minutes(minutes)?;
        }

        let prep_flag = prep_flag.unwrap_or(self.prep_flag);
        self.prep_flag = prep_flag;

        let mut out = Vec::new();
        self.begin(duration_minutes, prep_flag, now, TransitionCause::Operator, &mut out);
        self.advance_due(now, &mut out);
        Ok(out)
    }

    fn use_minutes(&mut self, minutes: u32) -> CommandResult<()> {
        match self.source {
            ProcedureSource::Standard { minutes: current } if current == minutes => {}
            ProcedureSource::Standard { .. } => {
                if minutes < MIN_SEQUENCE_MINUTES {
                    return Err(reject(
                        CommandKind::Start,
                        format!("sequence must last at least {MIN_SEQUENCE_MINUTES} minutes (got {minutes})"),
                    ));
                }
                self.graph = standard_procedure(minutes)?;
                self.source = ProcedureSource::Standard { minutes };
                info!(minutes, "regenerated standard procedure");
            }
            ProcedureSource::Custom => {
                debug!(minutes, "custom procedure ignores requested sequence length");
            }
        }
        Ok(())
    }

    fn begin(
        &mut self,
        minutes: Option<u32>,
        prep_flag: PrepFlag,
        anchor: Instant,
        cause: TransitionCause,
        out: &mut Vec<Transition>,
    ) {
        self.run = Some(ExecutorState::new(prep_flag, self.auto_restart, minutes));
        let entry = self.graph.entry().to_string();
        info!(procedure = %self.graph.id(), prep_flag = %prep_flag, "sequence started");
        self.enter(&entry, anchor, SoundSignal::None, cause, out);
    }

    /// Recompute countdowns and advance through every node whose deadline
    /// has passed.
    pub fn tick(&mut self, now: Instant) -> Vec<Transition> {
        let mut out = Vec::new();
        self.advance_due(now, &mut out);
        self.restart_if_due(now, &mut out);
        out
    }

    /// Release a hold.
    pub fn resume(&mut self, now: Instant) -> CommandResult<Vec<Transition>> {
        let Some(state) = &self.run else {
            return Err(reject(CommandKind::Resume, "no sequence is running"));
        };
        if state.phase != Phase::Holding {
            return Err(reject(CommandKind::Resume, "not waiting for a trigger"));
        }
        let Some(node) = self.current_node().cloned() else {
            return Err(reject(CommandKind::Resume, "no current node"));
        };

        let mut out = Vec::new();
        let post = node.step.post_trigger_duration_seconds;
        if post > 0 {
            if let Some(state) = self.run.as_mut() {
                if !node.step.post_trigger_flags_up.is_empty() {
                    let flags = resolve_flags(&node.step.post_trigger_flags_up, state.resolved_prep_flag);
                    out.push(Transition::between(
                        Some(node.id.clone()),
                        Some(node.id.clone()),
                        state.status,
                        &state.active_flags,
                        &flags,
                        SoundSignal::None,
                        SoundSignal::None,
                        TransitionCause::Operator,
                    ));
                    state.active_flags = flags;
                }
                state.phase = Phase::PostTrigger {
                    deadline: now.checked_add(Duration::from_secs(post)),
                };
            }
            info!(node = %node.id, post_trigger_seconds = post, "hold released");
        } else {
            info!(node = %node.id, "hold released");
            self.advance(now, TransitionCause::Operator, &mut out);
        }

        self.advance_due(now, &mut out);
        Ok(out)
    }

    /// Change the duration of a primary node that has not been reached yet.
    pub fn mutate_future_duration(&mut self, node_id: &str, delta_seconds: i64) -> CommandResult<()> {
        let kind = CommandKind::MutateFutureDuration;
        let Some(index) = self.graph.primary_index(node_id) else {
            let reason = match self.graph.kind(node_id) {
                Some(_) => format!("'{node_id}' is a special node"),
                None => format!("unknown node '{node_id}'"),
            };
            return Err(reject(kind, reason));
        };

        let first_future = match &self.run {
            None => 1,
            Some(state) => {
                let Some(current) = state.current_node_id.as_deref() else {
                    return Err(reject(kind, "the race is finished"));
                };
                match self.graph.kind(current) {
                    Some(NodeKind::Primary { index }) => index + 1,
                    _ => self.graph.rejoin_index(current).ok_or_else(|| {
                        reject(kind, format!("special node '{current}' does not rejoin the sequence"))
                    })?,
                }
            }
        };
        if index < first_future {
            return Err(reject(kind, format!("'{node_id}' has already been reached")));
        }

        let before = self.graph.node(node_id).map_or(0, |n| n.step.duration_seconds);
        let after = i128::from(before) + i128::from(delta_seconds);
        let after = u64::try_from(after)
            .ok()
            .filter(|&secs| secs <= MAX_STEP_SECONDS)
            .ok_or_else(|| reject(kind, format!("duration of '{node_id}' would become {after}s")))?;

        self.graph.set_duration(node_id, after);
        info!(node = node_id, before, after, "future step duration changed");
        Ok(())
    }

    /// Jump to a special node.
    pub fn trigger_special(&mut self, node_id: &str, now: Instant) -> CommandResult<Vec<Transition>> {
        let kind = CommandKind::TriggerSpecial;
        if self.run.is_none() {
            return Err(reject(kind, "no sequence is running"));
        }
        match self.graph.kind(node_id) {
            None => return Err(reject(kind, format!("unknown node '{node_id}'"))),
            Some(NodeKind::Primary { .. }) => {
                return Err(reject(kind, format!("'{node_id}' is on the primary path")));
            }
            Some(NodeKind::Special) => {}
        }

        if let Some(state) = self.run.as_mut() {
            state.restart_at = None;
        }
        info!(node = node_id, "special node triggered");

        let mut out = Vec::new();
        self.enter(node_id, now, SoundSignal::None, TransitionCause::Operator, &mut out);
        self.advance_due(now, &mut out);
        Ok(out)
    }

    /// Return to IDLE from a special or terminal state.
    pub fn reset(&mut self) -> CommandResult<Vec<Transition>> {
        let Some(state) = &self.run else {
            return Err(reject(CommandKind::Reset, "already idle"));
        };
        let on_special = state
            .current_node_id
            .as_deref()
            .is_some_and(|id| self.graph.is_special(id));
        if !(on_special || state.status.is_special() || state.status.is_terminal()) {
            return Err(reject(
                CommandKind::Reset,
                format!("not available during {}", state.status),
            ));
        }

        let mut out = Vec::new();
        self.clear(TransitionCause::Operator, &mut out);
        info!("sequence reset");
        Ok(out)
    }

    /// Mark a running race as finished.
    pub fn finish(&mut self) -> CommandResult<Vec<Transition>> {
        let Some(state) = self.run.as_mut() else {
            return Err(reject(CommandKind::Finish, "no sequence is running"));
        };
        if !matches!(state.status, RaceStatus::Racing | RaceStatus::IndividualRecall) {
            return Err(reject(
                CommandKind::Finish,
                format!("race is not underway ({})", state.status),
            ));
        }

        let transition = Transition::lower_all(
            state.current_node_id.take(),
            RaceStatus::Finished,
            &state.active_flags,
            TransitionCause::Operator,
        );
        state.active_flags.clear();
        state.status = RaceStatus::Finished;
        state.phase = Phase::Settled;
        state.restart_at = None;
        info!("race finished");
        Ok(vec![transition])
    }

    pub fn set_prep_flag(&mut self, flag: PrepFlag) -> CommandResult<()> {
        if let Some(state) = &self.run {
            return Err(reject(
                CommandKind::SetPrepFlag,
                format!("a sequence is active ({})", state.status),
            ));
        }
        self.prep_flag = flag;
        info!(prep_flag = %flag, "preparatory flag selected");
        Ok(())
    }

    /// Replace the procedure. Only while idle; an invalid document leaves the
    /// current graph in place.
    pub fn load_graph(&mut self, raw: RawProcedureGraph) -> CommandResult<()> {
        if let Some(state) = &self.run {
            return Err(reject(
                CommandKind::LoadGraph,
                format!("a sequence is active ({})", state.status),
            ));
        }
        let graph = ProcedureGraph::try_from(raw)?;
        info!(procedure = %graph.id(), nodes = graph.len(), "procedure loaded");
        self.auto_restart = self.auto_restart_override.unwrap_or(graph.auto_restart());
        self.graph = graph;
        self.source = ProcedureSource::Custom;
        Ok(())
    }

    pub fn set_auto_restart(&mut self, enabled: bool, now: Instant) {
        self.auto_restart = enabled;
        self.auto_restart_override = Some(enabled);
        let gap = self.restart_gap;
        let terminal = self.graph.terminal();

        if let Some(state) = self.run.as_mut() {
            state.auto_restart = enabled;
            if !enabled {
                state.restart_at = None;
            } else if state.phase == Phase::Settled
                && state.restart_at.is_none()
                && state.current_node_id.as_deref() == Some(terminal)
            {
                state.restart_at = now.checked_add(gap);
            }
        }
        info!(enabled, "auto restart updated");
    }

    pub fn snapshot(&self, now: Instant) -> Snapshot {
        let Some(state) = &self.run else {
            return Snapshot::idle(self.prep_flag, self.auto_restart);
        };

        let node = self.current_node();
        let remaining = state.remaining_seconds(now);
        let sequence_remaining = state
            .current_node_id
            .as_deref()
            .and_then(|id| self.countdown_offset(id))
            .map(|offset| offset + remaining.unwrap_or(0));
        let waiting = state.waiting_for_trigger();

        Snapshot {
            status: state.status,
            remaining_seconds: remaining,
            sequence_remaining_seconds: sequence_remaining,
            active_flags: state.active_flags.iter().copied().collect(),
            current_event_label: node.map_or_else(|| "Finished".to_string(), |n| n.step.label.clone()),
            waiting_for_trigger: waiting,
            action_label: node
                .filter(|_| waiting)
                .and_then(|n| n.step.action_label.clone().or_else(|| Some(n.step.label.clone()))),
            current_node_id: state.current_node_id.clone(),
            prep_flag: state.resolved_prep_flag,
            auto_restart: state.auto_restart,
        }
    }

    /// Sum of the durations of primary nodes after `id`.
    fn countdown_offset(&self, id: &str) -> Option<u64> {
        let index = self.graph.primary_index(id)?;
        Some(
            self.graph.primary()[index + 1..]
                .iter()
                .filter_map(|later| self.graph.node(later))
                .map(|n| n.step.duration_seconds)
                .sum(),
        )
    }

    fn enter(
        &mut self,
        node_id: &str,
        anchor: Instant,
        removal_sound: SoundSignal,
        cause: TransitionCause,
        out: &mut Vec<Transition>,
    ) {
        let Some(node) = self.graph.node(node_id) else {
            warn!(node = node_id, "cannot enter unknown node");
            return;
        };
        let Some(state) = self.run.as_mut() else {
            return;
        };

        let flags = resolve_flags(&node.step.flags_up, state.resolved_prep_flag);
        let status = node.step.race_status.unwrap_or(match state.status {
            RaceStatus::Idle => RaceStatus::Warning,
            inherited => inherited,
        });

        let transition = Transition::between(
            state.current_node_id.take(),
            Some(node.id.clone()),
            status,
            &state.active_flags,
            &flags,
            removal_sound,
            node.step.sound_on_enter,
            cause,
        );

        state.current_node_id = Some(node.id.clone());
        state.active_flags = flags;
        state.status = status;
        state.phase = Phase::Countdown {
            deadline: anchor.checked_add(Duration::from_secs(node.step.duration_seconds)),
        };

        info!(
            node = %node.id,
            label = %node.step.label,
            status = %status,
            duration_seconds = node.step.duration_seconds,
            "entered node"
        );
        out.push(transition);
    }

    fn advance_due(&mut self, now: Instant, out: &mut Vec<Transition>) {
        // Each iteration enters a new node and the graph is acyclic.
        let limit = self.graph.len() * 2 + 2;
        for _ in 0..limit {
            let Some(state) = &self.run else {
                return;
            };
            let (deadline, post_trigger) = match state.phase {
                Phase::Countdown { deadline } => (deadline, false),
                Phase::PostTrigger { deadline } => (deadline, true),
                Phase::Holding | Phase::Settled => return,
            };
            let anchor = match deadline {
                Some(due) if due <= now => due,
                Some(_) => return,
                None => {
                    self.report_missing_deadline();
                    now
                }
            };

            if post_trigger {
                self.advance(anchor, TransitionCause::Timer, out);
            } else {
                self.complete_countdown(anchor, out);
            }
        }
        warn!(limit, "stopped advancing after too many immediate transitions");
    }

    fn report_missing_deadline(&self) {
        let node = self
            .run
            .as_ref()
            .and_then(|s| s.current_node_id.clone())
            .unwrap_or_default();
        let anomaly = ClockAnomaly::MissingDeadline { node };
        warn!(error = %anomaly, "treating countdown as expired");
    }

    fn complete_countdown(&mut self, anchor: Instant, out: &mut Vec<Transition>) {
        let holds = self.current_node().is_some_and(|n| n.step.wait_for_trigger);
        if !holds {
            self.advance(anchor, TransitionCause::Timer, out);
            return;
        }
        if let Some(state) = self.run.as_mut() {
            state.phase = Phase::Holding;
            info!(node = ?state.current_node_id, "holding for operator trigger");
        }
    }

    fn advance(&mut self, anchor: Instant, cause: TransitionCause, out: &mut Vec<Transition>) {
        let Some(current) = self.run.as_ref().and_then(|s| s.current_node_id.clone()) else {
            return;
        };
        let removal_sound = self
            .graph
            .node(&current)
            .map_or(SoundSignal::None, |n| n.step.sound_on_flag_removal);

        match self.graph.next(&current).cloned() {
            Some(next) => self.enter(&next, anchor, removal_sound, cause, out),
            None => self.settle(&current, anchor),
        }
    }

    fn settle(&mut self, current: &str, anchor: Instant) {
        let at_start_signal = current == self.graph.terminal();
        let gap = self.restart_gap;
        let Some(state) = self.run.as_mut() else {
            return;
        };

        state.phase = Phase::Settled;
        info!(node = current, status = %state.status, "sequence settled");

        if at_start_signal && state.auto_restart {
            state.restart_at = anchor.checked_add(gap);
            match state.restart_at {
                Some(_) => info!(gap_seconds = gap.as_secs(), "restart scheduled"),
                None => warn!("restart gap overflows the clock; not restarting"),
            }
        }
    }

    fn restart_if_due(&mut self, now: Instant, out: &mut Vec<Transition>) {
        let Some(state) = &self.run else {
            return;
        };
        let Some(at) = state.restart_at.filter(|&at| at <= now) else {
            return;
        };
        let minutes = state.started_with_minutes;
        let prep_flag = state.resolved_prep_flag;

        info!("restarting sequence");
        self.clear(TransitionCause::AutoRestart, out);
        self.begin(minutes, prep_flag, at, TransitionCause::AutoRestart, out);
        self.advance_due(now, out);
    }

    fn clear(&mut self, cause: TransitionCause, out: &mut Vec<Transition>) {
        if let Some(state) = self.run.take() {
            if !state.active_flags.is_empty() {
                out.push(Transition::lower_all(
                    state.current_node_id,
                    RaceStatus::Idle,
                    &state.active_flags,
                    cause,
                ));
            }
        }
    }
}
