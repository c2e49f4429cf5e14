use crate::{
    graph::{NodeStatus, NodeType},
    scenario::ScenarioId,
    tech::TechId,
    traffic::TrafficPatch,
    types::NodeId,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// All player-issued commands.
/// Variants are appended, never removed or reordered.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum PlayerCommand {
    // ── Clock control ─────────────────────────────
    SetPaused { paused: bool },
    SetTimeScale { scale: f64 },

    // ── Build ─────────────────────────────────────
    PlaceNode { node_type: NodeType, x: i32, y: i32 },
    RemoveNode { node_id: NodeId },
    Connect { a: NodeId, b: NodeId },
    Disconnect { a: NodeId, b: NodeId },

    // ── Node maintenance ──────────────────────────
    RepairNode { node_id: NodeId },
    UpgradeNode { node_id: NodeId },
    DamageNode { node_id: NodeId, amount: f64 },
    SetNodeStatus { node_id: NodeId, status: NodeStatus },
    RebootNode { node_id: NodeId },

    // ── Traffic and scenario ──────────────────────
    SetTrafficConfig { patch: TrafficPatch },
    StartScenario { scenario: ScenarioId },
    ResetScenario,

    // ── Research and toggles ──────────────────────
    UnlockTech { tech: TechId },
    SetAutoRepair { enabled: bool },
    SetChaos { enabled: bool },
    SetAutoScaling { enabled: bool },
}

impl PlayerCommand {
    /// Stable name for logs and rejection events.
    pub fn name(&self) -> &'static str {
        match self {
            Self::SetPaused { .. }        => "set_paused",
            Self::SetTimeScale { .. }     => "set_time_scale",
            Self::PlaceNode { .. }        => "place_node",
            Self::RemoveNode { .. }       => "remove_node",
            Self::Connect { .. }          => "connect",
            Self::Disconnect { .. }       => "disconnect",
            Self::RepairNode { .. }       => "repair_node",
            Self::UpgradeNode { .. }      => "upgrade_node",
            Self::DamageNode { .. }       => "damage_node",
            Self::SetNodeStatus { .. }    => "set_node_status",
            Self::RebootNode { .. }       => "reboot_node",
            Self::SetTrafficConfig { .. } => "set_traffic_config",
            Self::StartScenario { .. }    => "start_scenario",
            Self::ResetScenario           => "reset_scenario",
            Self::UnlockTech { .. }       => "unlock_tech",
            Self::SetAutoRepair { .. }    => "set_auto_repair",
            Self::SetChaos { .. }         => "set_chaos",
            Self::SetAutoScaling { .. }   => "set_auto_scaling",
        }
    }
}

/// Why a player command left the simulation unchanged.
///
/// Rejections are not errors: the engine logs them as warnings and
/// reports a `CommandRejected` event.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Rejection {
    #[error("Node '{id}' does not exist")]
    UnknownNode { id: NodeId },

    #[error("Cell ({x}, {y}) is already occupied")]
    CellOccupied { x: i32, y: i32 },

    #[error("Not enough cash. Need ${needed:.0}, have ${available:.0}")]
    InsufficientFunds { needed: f64, available: f64 },

    #[error("A node cannot connect to itself")]
    SelfConnection,

    #[error("Connection {a} <-> {b} already exists")]
    DuplicateConnection { a: NodeId, b: NodeId },

    #[error("No connection between {a} and {b}")]
    NoSuchConnection { a: NodeId, b: NodeId },

    #[error("{id} is already at the maximum tier")]
    MaxTier { id: NodeId },

    #[error("Research \"{tech}\" to unlock this upgrade")]
    TechRequired { tech: &'static str },

    #[error("Tech '{tech}' already unlocked")]
    AlreadyUnlocked { tech: &'static str },

    #[error("Not enough research points to unlock '{tech}'. Cost: {cost}, Have: {have:.0}")]
    InsufficientResearch { tech: &'static str, cost: f64, have: f64 },

    #[error("Missing prerequisites for '{tech}': {missing}")]
    MissingPrerequisites { tech: &'static str, missing: String },

    #[error("{id} is down and must be repaired first")]
    NodeDown { id: NodeId },

    #[error("Time scale must be between 0 and {max}, got {scale}")]
    InvalidTimeScale { scale: f64, max: f64 },

    #[error("Traffic rate '{field}' must be a finite non-negative number, got {value}")]
    InvalidTrafficRate { field: &'static str, value: f64 },
}
