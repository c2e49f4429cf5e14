//! Read model handed to hosts: everything a UI needs to draw one frame
//! of the simulation, as plain serializable data.
//!
//! This is not a save format. Nothing reads a snapshot back in.

use crate::{
    clock::SimClock,
    context::{CostBreakdown, EconomyState, SimContext, Toggles},
    director_subsystem::{goal_progress, GoalProgress},
    event::LogEntry,
    graph::{Connection, Node},
    scenario::ScenarioId,
    traffic::TrafficConfig,
    types::Tick,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScenarioView {
    pub active: Option<ScenarioId>,
    pub elapsed_secs: Tick,
    pub phase: Option<String>,
    pub complete: bool,
    pub lost: bool,
    pub goals: Vec<GoalProgress>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimSnapshot {
    pub tick: Tick,
    pub clock: SimClock,
    pub nodes: Vec<Node>,
    pub connections: Vec<Connection>,
    pub economy: EconomyState,
    pub scenario: ScenarioView,
    pub traffic: TrafficConfig,
    pub toggles: Toggles,
    /// Newest first.
    pub log: Vec<LogEntry>,
    pub operating_cost: f64,
    pub cost_breakdown: CostBreakdown,
    pub active_packets: usize,
}

impl SimSnapshot {
    pub fn capture(ctx: &SimContext, active_packets: usize) -> Self {
        let cost_breakdown = ctx.cost_breakdown();
        Self {
            tick: ctx.clock.current_tick,
            clock: ctx.clock.clone(),
            nodes: ctx.graph.nodes.clone(),
            connections: ctx.graph.connections.clone(),
            economy: ctx.economy.clone(),
            scenario: ScenarioView {
                active: ctx.scenario.active,
                elapsed_secs: ctx.scenario.elapsed_secs,
                phase: ctx.scenario.phase.clone(),
                complete: ctx.scenario.complete,
                lost: ctx.scenario.lost,
                goals: goal_progress(ctx),
            },
            traffic: ctx.traffic.clone(),
            toggles: ctx.toggles,
            log: ctx.log.entries().cloned().collect(),
            operating_cost: cost_breakdown.total,
            cost_breakdown,
            active_packets,
        }
    }
}
