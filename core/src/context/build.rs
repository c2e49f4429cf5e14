//! Player build and maintenance operations on the graph.
//!
//! Every operation either succeeds completely or returns a `Rejection`
//! with nothing changed. The engine turns rejections into log warnings.

use super::SimContext;
use crate::{
    command::Rejection,
    event::{LogSeverity, SimEvent},
    graph::{Node, NodeStatus, NodeType},
    tech::TechId,
    types::{GridPos, NodeId},
};

impl SimContext {
    fn require_node(&self, id: &str) -> Result<&Node, Rejection> {
        self.graph.node(id).ok_or_else(|| Rejection::UnknownNode { id: id.to_string() })
    }

    /// Insert a node without charging for it. Used when loading
    /// scenario topology and after the auto-scaler has already paid.
    pub fn insert_node(&mut self, node_type: NodeType, pos: GridPos) -> NodeId {
        let id = self.graph.next_id(node_type);
        self.graph.add_node(Node::new(id.clone(), node_type, pos));
        id
    }

    pub fn place_node(&mut self, node_type: NodeType, pos: GridPos) -> Result<SimEvent, Rejection> {
        if self.graph.is_occupied(pos) {
            return Err(Rejection::CellOccupied { x: pos.0, y: pos.1 });
        }
        let cost = self.config.placement_cost(node_type);
        if !self.can_spend_to_floor(cost) {
            return Err(Rejection::InsufficientFunds {
                needed: cost,
                available: self.economy.cash,
            });
        }
        self.adjust_cash(-cost);
        let node_id = self.insert_node(node_type, pos);
        self.log(
            LogSeverity::Info,
            format!("Placed {} for ${cost:.0}", node_type.label()),
            Some(&node_id),
        );
        Ok(SimEvent::NodePlaced { node_id, node_type, cost })
    }

    /// Remove a node and every connection touching it. No refund.
    pub fn remove_node(&mut self, id: &str) -> Result<SimEvent, Rejection> {
        let node = self
            .graph
            .remove_node(id)
            .ok_or_else(|| Rejection::UnknownNode { id: id.to_string() })?;
        self.log(
            LogSeverity::Info,
            format!("Removed {}", node.node_type.label()),
            Some(&node.id),
        );
        Ok(SimEvent::NodeRemoved { node_id: node.id })
    }

    pub fn connect(&mut self, a: &str, b: &str) -> Result<SimEvent, Rejection> {
        if a == b {
            return Err(Rejection::SelfConnection);
        }
        self.require_node(a)?;
        self.require_node(b)?;
        if !self.graph.add_connection(a, b) {
            return Err(Rejection::DuplicateConnection {
                a: a.to_string(),
                b: b.to_string(),
            });
        }
        Ok(SimEvent::Connected { a: a.to_string(), b: b.to_string() })
    }

    pub fn disconnect(&mut self, a: &str, b: &str) -> Result<SimEvent, Rejection> {
        if !self.graph.remove_connection(a, b) {
            return Err(Rejection::NoSuchConnection {
                a: a.to_string(),
                b: b.to_string(),
            });
        }
        Ok(SimEvent::Disconnected { a: a.to_string(), b: b.to_string() })
    }

    /// Raise a node one tier. Web servers and databases need their
    /// optimisation tech first. Upgrading restores health to 100.
    pub fn upgrade_node(&mut self, id: &str) -> Result<SimEvent, Rejection> {
        let node = self.require_node(id)?;
        let (node_type, tier) = (node.node_type, node.tier);

        let gate = match node_type {
            NodeType::WebServer => Some(TechId::ServerOpt1),
            NodeType::Database  => Some(TechId::DbSharding1),
            _                   => None,
        };
        if let Some(tech) = gate.filter(|t| !self.has_tech(*t)) {
            return Err(Rejection::TechRequired { tech: tech.label() });
        }
        let cost = self
            .config
            .upgrade_cost(node_type, tier)
            .ok_or_else(|| Rejection::MaxTier { id: id.to_string() })?;
        if self.economy.cash < cost {
            return Err(Rejection::InsufficientFunds {
                needed: cost,
                available: self.economy.cash,
            });
        }

        self.adjust_cash(-cost);
        let new_tier = tier + 1;
        if let Some(node) = self.graph.node_mut(id) {
            node.tier = new_tier;
            node.health = 100.0;
        }
        self.log(
            LogSeverity::Info,
            format!("Upgraded {} to tier {new_tier} for ${cost:.0}", node_type.label()),
            Some(id),
        );
        Ok(SimEvent::NodeUpgraded { node_id: id.to_string(), tier: new_tier, cost })
    }

    /// Manual repair: full health, back to active.
    pub fn repair_node(&mut self, id: &str) -> Result<SimEvent, Rejection> {
        self.require_node(id)?;
        let cost = self.config.economy.repair_cost;
        if self.economy.cash < cost {
            return Err(Rejection::InsufficientFunds {
                needed: cost,
                available: self.economy.cash,
            });
        }
        self.adjust_cash(-cost);
        self.restore_node(id);
        self.log(LogSeverity::Info, format!("Repaired {id} for ${cost:.0}"), Some(id));
        Ok(SimEvent::NodeRepaired { node_id: id.to_string(), cost, automatic: false })
    }

    /// Full health, active, reboot cancelled.
    pub(crate) fn restore_node(&mut self, id: &str) {
        if let Some(node) = self.graph.node_mut(id) {
            node.health = 100.0;
            node.status = NodeStatus::Active;
            node.reboot_remaining = 0;
        }
    }

    pub fn set_node_status(&mut self, id: &str, status: NodeStatus) -> Result<SimEvent, Rejection> {
        let node = self.require_node(id)?;
        // Health 0 always means down; only a repair brings it back.
        if node.health <= 0.0 && status != NodeStatus::Down {
            return Err(Rejection::NodeDown { id: id.to_string() });
        }
        let reboot = self.config.economy.reboot_seconds;
        if let Some(node) = self.graph.node_mut(id) {
            node.status = status;
            node.reboot_remaining = if status == NodeStatus::Rebooting { reboot } else { 0 };
        }
        Ok(SimEvent::NodeStatusChanged { node_id: id.to_string(), status })
    }

    /// Take a node offline for a few seconds. Down nodes need a repair.
    pub fn reboot_node(&mut self, id: &str) -> Result<SimEvent, Rejection> {
        if self.require_node(id)?.status == NodeStatus::Down {
            return Err(Rejection::NodeDown { id: id.to_string() });
        }
        let event = self.set_node_status(id, NodeStatus::Rebooting)?;
        self.log(LogSeverity::Info, format!("Rebooting {id}"), Some(id));
        Ok(event)
    }

    /// Player- or test-inflicted damage.
    pub fn damage_command(&mut self, id: &str, amount: f64) -> Result<SimEvent, Rejection> {
        self.require_node(id)?;
        let health = self
            .damage_node(id, amount.max(0.0))
            .ok_or_else(|| Rejection::NodeDown { id: id.to_string() })?;
        Ok(SimEvent::NodeDamaged { node_id: id.to_string(), health })
    }
}
