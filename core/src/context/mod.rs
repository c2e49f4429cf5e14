//! The simulation context: the single owner of all mutable state.
//!
//! RULE: Every subsystem receives `&mut SimContext` and mutates state
//! only through it. Nothing lives in globals, so tests can build as
//! many isolated contexts as they like.
//!
//! Cash, reputation, damage and failures each have exactly one
//! chokepoint here, so their side effects (log entries, the loss
//! check, the health/status invariant) can never be skipped.

mod build;
mod lifecycle;
mod research;

use crate::{
    clock::SimClock,
    config::SimConfig,
    event::{EventLog, LogSeverity, SimEvent},
    graph::{InfraGraph, NodeStatus, NodeType},
    scenario::ScenarioState,
    tech::TechId,
    traffic::TrafficConfig,
    types::NodeId,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const MAX_REPUTATION: f64 = 100.0;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EconomyState {
    pub cash: f64,
    /// 0..=100.
    pub reputation: f64,
    pub failures: u64,
    pub score: u64,
    pub requests_served: u64,
    pub research_points: f64,
    /// Append-only.
    pub unlocked_techs: Vec<TechId>,
}

impl Default for EconomyState {
    fn default() -> Self {
        Self {
            cash: 1000.0,
            reputation: MAX_REPUTATION,
            failures: 0,
            score: 0,
            requests_served: 0,
            research_points: 0.0,
            unlocked_techs: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Toggles {
    pub auto_repair: bool,
    pub chaos: bool,
    /// Only takes effect once the auto-scaling tech is researched.
    pub auto_scaling: bool,
}

impl Default for Toggles {
    fn default() -> Self {
        Self { auto_repair: false, chaos: false, auto_scaling: true }
    }
}

/// Operating cost per second, split the way the FinOps panel shows it.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct CostBreakdown {
    pub compute: f64,
    pub database: f64,
    pub storage: f64,
    pub security: f64,
    pub total: f64,
}

pub struct SimContext {
    pub config: SimConfig,
    pub clock: SimClock,
    pub graph: InfraGraph,
    pub economy: EconomyState,
    pub scenario: ScenarioState,
    pub traffic: TrafficConfig,
    pub toggles: Toggles,
    pub log: EventLog,
    /// Requests resolved per node since the last load report.
    load_window: BTreeMap<NodeId, u32>,
    /// Events raised deep inside a step (loss, kills). Drained by the engine.
    outbox: Vec<SimEvent>,
}

impl SimContext {
    pub fn new(config: SimConfig) -> Self {
        let log = EventLog::new(config.log_capacity);
        Self {
            config,
            clock: SimClock::new(),
            graph: InfraGraph::new(),
            economy: EconomyState::default(),
            scenario: ScenarioState::default(),
            traffic: TrafficConfig::default(),
            toggles: Toggles::default(),
            log,
            load_window: BTreeMap::new(),
            outbox: Vec::new(),
        }
    }

    // ── Event plumbing ────────────────────────────────────────────

    /// Append to the player-facing log and mirror it to the `log` facade.
    pub fn log(&mut self, severity: LogSeverity, message: impl Into<String>, source: Option<&str>) {
        let message = message.into();
        let t = self.clock.sim_time;
        match severity {
            LogSeverity::Info    => log::info!("t={t:.1} {message}"),
            LogSeverity::Warning => log::warn!("t={t:.1} {message}"),
            LogSeverity::Error   => log::warn!("t={t:.1} [error] {message}"),
        }
        self.log.push(t, severity, message, source.map(str::to_string));
    }

    pub fn emit(&mut self, event: SimEvent) {
        self.outbox.push(event);
    }

    pub fn drain_outbox(&mut self) -> Vec<SimEvent> {
        std::mem::take(&mut self.outbox)
    }

    // ── Economy chokepoints ───────────────────────────────────────

    /// Unconditional cash change. Only spending checks the floor.
    pub fn adjust_cash(&mut self, delta: f64) {
        self.economy.cash += delta;
    }

    /// True if spending `cost` keeps cash at or above the soft floor.
    pub fn can_spend_to_floor(&self, cost: f64) -> bool {
        self.economy.cash - cost >= self.config.economy.cash_floor
    }

    pub fn adjust_reputation(&mut self, delta: f64) {
        self.economy.reputation = (self.economy.reputation + delta).clamp(0.0, MAX_REPUTATION);
        if delta < 0.0 {
            self.check_loss();
        }
    }

    pub fn has_tech(&self, tech: TechId) -> bool {
        self.economy.unlocked_techs.contains(&tech)
    }

    /// A request finished successfully at a terminal node.
    pub fn serve_request(&mut self) {
        self.economy.score += 1;
        self.economy.requests_served += 1;
        self.economy.research_points += self.config.routing.research_per_request;
    }

    /// Count, charge and log one failure. Multi-AZ halves the penalty.
    pub fn record_failure(&mut self, source: &str, reason: impl Into<String>) {
        let (mut cash_penalty, mut rep_penalty) = (
            self.config.routing.failure_cash_penalty,
            self.config.routing.failure_reputation_penalty,
        );
        if self.has_tech(TechId::MultiAz) {
            cash_penalty /= 2.0;
            rep_penalty /= 2.0;
        }
        self.economy.failures += 1;
        self.adjust_cash(-cash_penalty);
        self.log(LogSeverity::Error, reason, Some(source));
        self.adjust_reputation(-rep_penalty);
    }

    /// Reputation at zero during a scenario is a loss and freezes both
    /// clocks until the player restarts or resets.
    pub fn check_loss(&mut self) {
        let Some(scenario) = self.scenario.active else {
            return;
        };
        if self.scenario.lost || self.economy.reputation > 0.0 {
            return;
        }
        self.scenario.lost = true;
        self.clock.freeze();
        self.log(
            LogSeverity::Error,
            "Reputation collapsed. Customers have left for good. Scenario failed.",
            None,
        );
        self.emit(SimEvent::ScenarioLost {
            scenario,
            failures: self.economy.failures,
        });
    }

    // ── Node health ───────────────────────────────────────────────

    /// Reduce health; a node reaching zero goes down. Down nodes take
    /// no further damage. Returns the new health if anything changed.
    pub fn damage_node(&mut self, id: &str, amount: f64) -> Option<f64> {
        let node = self.graph.node_mut(id)?;
        if node.status == NodeStatus::Down {
            return None;
        }
        node.health = (node.health - amount).max(0.0);
        let health = node.health;
        if health <= 0.0 {
            node.status = NodeStatus::Down;
            node.reboot_remaining = 0;
            self.emit(SimEvent::NodeStatusChanged {
                node_id: id.to_string(),
                status: NodeStatus::Down,
            });
        }
        Some(health)
    }

    /// Take a node down outright (scripted or chaos failure).
    pub fn kill_node(&mut self, id: &str, cause: &str) -> bool {
        let Some(node) = self.graph.node_mut(id) else {
            return false;
        };
        node.health = 0.0;
        node.status = NodeStatus::Down;
        node.reboot_remaining = 0;
        self.emit(SimEvent::NodeKilled {
            node_id: id.to_string(),
            cause: cause.to_string(),
        });
        true
    }

    // ── Load window ───────────────────────────────────────────────

    /// Count one resolution against `id`; returns the window total.
    pub fn record_load(&mut self, id: &str) -> u32 {
        let count = self.load_window.entry(id.to_string()).or_insert(0);
        *count += 1;
        *count
    }

    pub fn window_load(&self, id: &str) -> u32 {
        self.load_window.get(id).copied().unwrap_or(0)
    }

    /// Hand the window to the reporter and start a fresh one.
    pub fn take_load_window(&mut self) -> BTreeMap<NodeId, u32> {
        std::mem::take(&mut self.load_window)
    }

    // ── Derived figures ───────────────────────────────────────────

    pub fn capacity_of(&self, id: &str) -> Option<u32> {
        let node = self.graph.node(id)?;
        Some(self.config.capacity(node.node_type, node.tier))
    }

    /// Per-tick upkeep: rate(type) * tier over every non-gateway node.
    pub fn upkeep_due(&self) -> f64 {
        self.graph
            .nodes
            .iter()
            .map(|n| self.config.upkeep_rate(n.node_type) * n.tier as f64)
            .sum()
    }

    pub fn operating_cost(&self) -> f64 {
        self.cost_breakdown().total
    }

    pub fn cost_breakdown(&self) -> CostBreakdown {
        let rate = self.config.economy.opex_per_tier;
        let mut out = CostBreakdown::default();
        for node in &self.graph.nodes {
            let cost = node.tier as f64 * rate;
            match node.node_type {
                NodeType::WebServer | NodeType::LoadBalancer | NodeType::Cache | NodeType::Queue => {
                    out.compute += cost
                }
                NodeType::Database => out.database += cost,
                NodeType::ObjectStore => out.storage += cost,
                NodeType::Gateway | NodeType::Waf => out.security += cost,
            }
            out.total += cost;
        }
        out
    }
}
