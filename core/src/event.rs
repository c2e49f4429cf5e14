//! Simulation events and the player-facing event log.
//!
//! `SimEvent` is the structured record returned to the host after each
//! step. `EventLog` is the bounded, newest-first message feed the UI
//! shows; it only ever holds the last `capacity` entries.

use crate::{
    graph::{NodeStatus, NodeType, Zone},
    scenario::ScenarioId,
    tech::TechId,
    types::{NodeId, SimSeconds, Tick},
};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Every event emitted during simulation.
/// Variants are appended, never removed or reordered.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SimEvent {
    // ── Engine events ──────────────────────────────
    TickStarted {
        tick: Tick,
    },
    TickCompleted {
        tick: Tick,
    },
    SimulationReset,

    // ── Build events ───────────────────────────────
    NodePlaced {
        node_id: NodeId,
        node_type: NodeType,
        cost: f64,
    },
    NodeRemoved {
        node_id: NodeId,
    },
    Connected {
        a: NodeId,
        b: NodeId,
    },
    Disconnected {
        a: NodeId,
        b: NodeId,
    },
    NodeUpgraded {
        node_id: NodeId,
        tier: u8,
        cost: f64,
    },
    NodeRepaired {
        node_id: NodeId,
        cost: f64,
        automatic: bool,
    },
    NodeDamaged {
        node_id: NodeId,
        health: f64,
    },
    NodeStatusChanged {
        node_id: NodeId,
        status: NodeStatus,
    },

    // ── Economy events ─────────────────────────────
    EconomyTicked {
        tick: Tick,
        upkeep: f64,
        repairs: u32,
        cash: f64,
        reputation: f64,
    },
    LoadReported {
        tick: Tick,
        total_load: u64,
    },
    TechUnlocked {
        tech: TechId,
    },

    // ── Auto-scaling events ────────────────────────
    ScaledOut {
        tick: Tick,
        node_id: NodeId,
        utilization: f64,
    },
    ScaledIn {
        tick: Tick,
        node_id: NodeId,
        utilization: f64,
    },

    // ── Chaos events ───────────────────────────────
    NodeKilled {
        node_id: NodeId,
        cause: String,
    },
    ZoneOutage {
        tick: Tick,
        zone: Zone,
        nodes: Vec<NodeId>,
    },

    // ── Scenario events ────────────────────────────
    ScenarioStarted {
        scenario: ScenarioId,
    },
    ScenarioPhaseEntered {
        tick: Tick,
        scenario: ScenarioId,
        phase: String,
    },
    ScenarioCompleted {
        tick: Tick,
        scenario: ScenarioId,
    },
    ScenarioLost {
        scenario: ScenarioId,
        failures: u64,
    },

    // ── Player control events ──────────────────────
    TrafficConfigChanged,
    TimeScaleChanged {
        scale: f64,
    },
    PauseChanged {
        paused: bool,
    },
    ToggleChanged {
        toggle: String,
        enabled: bool,
    },
    CommandRejected {
        command: String,
        reason: String,
    },
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LogSeverity {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LogEntry {
    pub seq: u64,
    pub time: SimSeconds,
    pub severity: LogSeverity,
    pub message: String,
    pub source_id: Option<NodeId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventLog {
    capacity: usize,
    next_seq: u64,
    entries: VecDeque<LogEntry>,
}

impl EventLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            next_seq: 0,
            entries: VecDeque::with_capacity(capacity.max(1)),
        }
    }

    pub fn push(
        &mut self,
        time: SimSeconds,
        severity: LogSeverity,
        message: impl Into<String>,
        source_id: Option<NodeId>,
    ) {
        self.next_seq += 1;
        self.entries.push_front(LogEntry {
            seq: self.next_seq,
            time,
            severity,
            message: message.into(),
            source_id,
        });
        self.entries.truncate(self.capacity);
    }

    /// Newest first.
    pub fn entries(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Count of entries currently retained whose message contains `needle`.
    pub fn count_containing(&self, needle: &str) -> usize {
        self.entries.iter().filter(|e| e.message.contains(needle)).count()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Stable string name of a SimEvent variant, for logs and tooling.
pub fn event_type_name(event: &SimEvent) -> &'static str {
    match event {
        SimEvent::TickStarted { .. }          => "tick_started",
        SimEvent::TickCompleted { .. }        => "tick_completed",
        SimEvent::SimulationReset             => "simulation_reset",
        SimEvent::NodePlaced { .. }           => "node_placed",
        SimEvent::NodeRemoved { .. }          => "node_removed",
        SimEvent::Connected { .. }            => "connected",
        SimEvent::Disconnected { .. }         => "disconnected",
        SimEvent::NodeUpgraded { .. }         => "node_upgraded",
        SimEvent::NodeRepaired { .. }         => "node_repaired",
        SimEvent::NodeDamaged { .. }          => "node_damaged",
        SimEvent::NodeStatusChanged { .. }    => "node_status_changed",
        SimEvent::EconomyTicked { .. }        => "economy_ticked",
        SimEvent::LoadReported { .. }         => "load_reported",
        SimEvent::TechUnlocked { .. }         => "tech_unlocked",
        SimEvent::ScaledOut { .. }            => "scaled_out",
        SimEvent::ScaledIn { .. }             => "scaled_in",
        SimEvent::NodeKilled { .. }           => "node_killed",
        SimEvent::ZoneOutage { .. }           => "zone_outage",
        SimEvent::ScenarioStarted { .. }      => "scenario_started",
        SimEvent::ScenarioPhaseEntered { .. } => "scenario_phase_entered",
        SimEvent::ScenarioCompleted { .. }    => "scenario_completed",
        SimEvent::ScenarioLost { .. }         => "scenario_lost",
        SimEvent::TrafficConfigChanged        => "traffic_config_changed",
        SimEvent::TimeScaleChanged { .. }     => "time_scale_changed",
        SimEvent::PauseChanged { .. }         => "pause_changed",
        SimEvent::ToggleChanged { .. }        => "toggle_changed",
        SimEvent::CommandRejected { .. }      => "command_rejected",
    }
}
