//! Scenario catalog and per-run scenario state.
//!
//! A scenario is static data: starting cash, a starting topology, a
//! traffic configuration and a list of goals. The time-keyed script
//! that reshapes it while playing lives in director_subsystem.rs.

use crate::{
    graph::NodeType,
    traffic::{TrafficConfig, TrafficMix},
    types::{GridPos, Tick},
};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum ScenarioId {
    Sandbox,
    Startup,
    BlackFriday,
    Ddos,
    HighThroughput,
    Chaos,
    Legacy,
}

impl ScenarioId {
    pub const ALL: [ScenarioId; 7] = [
        Self::Sandbox,
        Self::Startup,
        Self::BlackFriday,
        Self::Ddos,
        Self::HighThroughput,
        Self::Chaos,
        Self::Legacy,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sandbox        => "sandbox",
            Self::Startup        => "startup",
            Self::BlackFriday    => "black-friday",
            Self::Ddos           => "ddos",
            Self::HighThroughput => "high-throughput",
            Self::Chaos          => "chaos",
            Self::Legacy         => "legacy",
        }
    }
}

impl fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScenarioId {
    type Err = crate::error::SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|id| id.as_str() == s)
            .ok_or_else(|| crate::error::SimError::UnknownScenario { id: s.to_string() })
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GoalKind {
    /// cash >= target
    Cash,
    /// reputation >= target
    Reputation,
    /// scenario elapsed seconds >= target
    Uptime,
    /// requests served >= target
    RequestsServed,
    /// operating cost <= target
    OperatingCost,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Goal {
    pub kind: GoalKind,
    pub target: f64,
    pub label: String,
}

impl Goal {
    pub fn new(kind: GoalKind, target: f64, label: &str) -> Self {
        Self { kind, target, label: label.to_string() }
    }

    /// Operating cost is a ceiling; every other goal is a floor.
    pub fn is_met_by(&self, current: f64) -> bool {
        match self.kind {
            GoalKind::OperatingCost => current <= self.target,
            _ => current >= self.target,
        }
    }
}

pub struct ScenarioDef {
    pub id: ScenarioId,
    pub name: &'static str,
    pub description: &'static str,
    pub initial_cash: f64,
    pub nodes: Vec<(NodeType, GridPos)>,
    /// Index pairs into `nodes`.
    pub connections: Vec<(usize, usize)>,
    pub traffic: TrafficConfig,
    pub goals: Vec<Goal>,
}

/// Live scenario progress. Owned by SimContext so a reset clears it
/// together with the graph and economy.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScenarioState {
    pub active: Option<ScenarioId>,
    pub elapsed_secs: Tick,
    pub goals: Vec<Goal>,
    /// Sticky once set.
    pub complete: bool,
    /// Reputation collapsed while the scenario was running.
    pub lost: bool,
    /// Last script phase applied. Re-entering the same phase is a no-op.
    pub phase: Option<String>,
    /// Elapsed time of the last scripted node kill.
    pub last_kill_secs: Option<Tick>,
}

impl ScenarioState {
    pub fn clear(&mut self) {
        *self = ScenarioState::default();
    }
}

fn lone_gateway() -> Vec<(NodeType, GridPos)> {
    vec![(NodeType::Gateway, (0, 6))]
}

/// The full catalog entry for a scenario.
pub fn scenario_def(id: ScenarioId) -> ScenarioDef {
    match id {
        ScenarioId::Sandbox => ScenarioDef {
            id,
            name: "Sandbox Mode",
            description: "Build freely with no limits or specific goals.",
            initial_cash: 1000.0,
            nodes: vec![
                (NodeType::Gateway, (0, 6)),
                (NodeType::Waf, (0, 2)),
                (NodeType::LoadBalancer, (0, -2)),
                (NodeType::WebServer, (-4, -6)),
                (NodeType::Database, (-4, -10)),
                (NodeType::WebServer, (4, -6)),
                (NodeType::ObjectStore, (4, -10)),
            ],
            connections: vec![(0, 1), (1, 2), (2, 3), (2, 5), (3, 4), (5, 6), (5, 4)],
            traffic: TrafficConfig::default(),
            goals: vec![],
        },
        ScenarioId::Startup => ScenarioDef {
            id,
            name: "The Startup",
            description: "You have limited seed funding. Build a basic architecture \
                          (Gateway -> WAF -> LB -> Server -> DB) and reach $2000 in cash.",
            initial_cash: 1500.0,
            nodes: lone_gateway(),
            connections: vec![],
            traffic: TrafficConfig {
                granular_rates: TrafficMix::new(1.0, 1.0, 0.5, 0.5, 0.0, 0.0),
                ..TrafficConfig::aggregate(2.0, TrafficMix::new(40.0, 40.0, 10.0, 10.0, 0.0, 0.0))
            },
            goals: vec![Goal::new(GoalKind::Cash, 2000.0, "Accumulate $2,000 Cash")],
        },
        ScenarioId::BlackFriday => ScenarioDef {
            id,
            name: "Black Friday",
            description: "Survive the spike!",
            initial_cash: 5000.0,
            nodes: lone_gateway(),
            connections: vec![],
            traffic: TrafficConfig::aggregate(5.0, TrafficMix::new(30.0, 30.0, 20.0, 10.0, 10.0, 0.0)),
            goals: vec![
                Goal::new(GoalKind::Uptime, 180.0, "Stay online for 3 minutes"),
                Goal::new(GoalKind::Reputation, 50.0, "Keep reputation at 50+"),
            ],
        },
        ScenarioId::Ddos => ScenarioDef {
            id,
            name: "DDoS Defense",
            description: "Malicious traffic incoming.",
            initial_cash: 2000.0,
            nodes: lone_gateway(),
            connections: vec![],
            traffic: TrafficConfig::aggregate(10.0, TrafficMix::new(10.0, 10.0, 0.0, 0.0, 0.0, 80.0)),
            goals: vec![
                Goal::new(GoalKind::Uptime, 150.0, "Weather the attack for 150 seconds"),
                Goal::new(GoalKind::Reputation, 40.0, "Keep reputation at 40+"),
            ],
        },
        ScenarioId::HighThroughput => ScenarioDef {
            id,
            name: "High Throughput",
            description: "Caching is key.",
            initial_cash: 3000.0,
            nodes: lone_gateway(),
            connections: vec![],
            traffic: TrafficConfig::aggregate(20.0, TrafficMix::new(5.0, 90.0, 5.0, 0.0, 0.0, 0.0)),
            goals: vec![
                Goal::new(GoalKind::RequestsServed, 3000.0, "Serve 3,000 requests"),
                Goal::new(GoalKind::Uptime, 120.0, "Stay online for 2 minutes"),
            ],
        },
        ScenarioId::Chaos => ScenarioDef {
            id,
            name: "Chaos Monkey",
            description: "Things will break.",
            initial_cash: 5000.0,
            nodes: lone_gateway(),
            connections: vec![],
            traffic: TrafficConfig::aggregate(5.0, TrafficMix::new(20.0, 20.0, 20.0, 20.0, 10.0, 10.0)),
            goals: vec![
                Goal::new(GoalKind::Uptime, 150.0, "Survive the monkey for 150 seconds"),
                Goal::new(GoalKind::Reputation, 30.0, "Keep reputation at 30+"),
            ],
        },
        ScenarioId::Legacy => ScenarioDef {
            id,
            name: "Legacy Migration",
            description: "Fix the mess.",
            initial_cash: 1000.0,
            nodes: vec![
                (NodeType::Gateway, (0, 6)),
                (NodeType::LoadBalancer, (0, -2)),
                (NodeType::WebServer, (-4, -6)),
                (NodeType::Database, (-4, -10)),
                (NodeType::Queue, (4, -6)),
                (NodeType::Database, (4, -10)),
            ],
            connections: vec![(0, 1), (1, 2), (2, 3), (1, 4)],
            traffic: TrafficConfig::aggregate(5.0, TrafficMix::new(30.0, 30.0, 10.0, 10.0, 10.0, 10.0)),
            goals: vec![
                Goal::new(GoalKind::Cash, 2500.0, "Grow cash to $2,500"),
                Goal::new(GoalKind::OperatingCost, 8.0, "Run at $8/s or less"),
            ],
        },
    }
}
