//! Infrastructure graph: placed nodes and the undirected links between
//! them.
//!
//! RULE: The graph is a pure data store. It never touches cash,
//! reputation or the event log; SimContext wraps it with the economic
//! side effects.

use crate::types::{GridPos, NodeId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum NodeType {
    Gateway,
    Waf,
    LoadBalancer,
    WebServer,
    Database,
    Cache,
    ObjectStore,
    Queue,
}

impl NodeType {
    pub const ALL: [NodeType; 8] = [
        Self::Gateway,
        Self::Waf,
        Self::LoadBalancer,
        Self::WebServer,
        Self::Database,
        Self::Cache,
        Self::ObjectStore,
        Self::Queue,
    ];

    /// Prefix used for generated node ids.
    pub fn id_prefix(&self) -> &'static str {
        match self {
            Self::Gateway      => "gw",
            Self::Waf          => "waf",
            Self::LoadBalancer => "lb",
            Self::WebServer    => "ws",
            Self::Database     => "db",
            Self::Cache        => "cache",
            Self::ObjectStore  => "s3",
            Self::Queue        => "queue",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Gateway      => "gateway",
            Self::Waf          => "waf",
            Self::LoadBalancer => "load-balancer",
            Self::WebServer    => "web-server",
            Self::Database     => "database",
            Self::Cache        => "cache",
            Self::ObjectStore  => "object-store",
            Self::Queue        => "queue",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NodeStatus {
    Active,
    Down,
    Rebooting,
}

impl NodeStatus {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Active    => "ACTIVE",
            Self::Down      => "DOWN",
            Self::Rebooting => "REBOOTING",
        }
    }
}

/// Availability zone, derived from the grid column a node sits in.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Zone {
    A,
    B,
}

impl Zone {
    /// Left of the centre line is zone A, right is zone B. Nodes on the
    /// centre line belong to no zone.
    pub fn from_pos(pos: GridPos) -> Option<Zone> {
        match pos.0 {
            x if x < 0 => Some(Zone::A),
            x if x > 0 => Some(Zone::B),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Node {
    pub id: NodeId,
    pub node_type: NodeType,
    pub pos: GridPos,
    pub zone: Option<Zone>,
    pub status: NodeStatus,
    /// 0..=100. At 0 the node is always down.
    pub health: f64,
    /// 1..=5.
    pub tier: u8,
    /// Requests resolved against this node in the last reporting window.
    pub current_load: u32,
    /// Simulated seconds left before a rebooting node comes back.
    pub reboot_remaining: u32,
}

impl Node {
    pub fn new(id: NodeId, node_type: NodeType, pos: GridPos) -> Self {
        Self {
            id,
            node_type,
            pos,
            zone: Zone::from_pos(pos),
            status: NodeStatus::Active,
            health: 100.0,
            tier: 1,
            current_load: 0,
            reboot_remaining: 0,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == NodeStatus::Active
    }
}

/// An undirected link. `a`/`b` keep the order the player drew them in.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Connection {
    pub id: String,
    pub a: NodeId,
    pub b: NodeId,
}

impl Connection {
    pub fn joins(&self, x: &str, y: &str) -> bool {
        (self.a == x && self.b == y) || (self.a == y && self.b == x)
    }

    pub fn touches(&self, id: &str) -> bool {
        self.a == id || self.b == id
    }

    /// The endpoint opposite `id`, if `id` is an endpoint.
    pub fn other(&self, id: &str) -> Option<&NodeId> {
        if self.a == id {
            Some(&self.b)
        } else if self.b == id {
            Some(&self.a)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InfraGraph {
    /// Insertion order is meaningful: "first discovered" and
    /// "most recently added" both read it.
    pub nodes: Vec<Node>,
    pub connections: Vec<Connection>,
    next_seq: u64,
}

impl InfraGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a fresh id such as `ws-7`.
    pub fn next_id(&mut self, node_type: NodeType) -> NodeId {
        self.next_seq += 1;
        format!("{}-{}", node_type.id_prefix(), self.next_seq)
    }

    pub fn add_node(&mut self, node: Node) {
        self.nodes.push(node);
    }

    /// Remove a node and every connection touching it.
    pub fn remove_node(&mut self, id: &str) -> Option<Node> {
        let idx = self.nodes.iter().position(|n| n.id == id)?;
        self.connections.retain(|c| !c.touches(id));
        Some(self.nodes.remove(idx))
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn node_mut(&mut self, id: &str) -> Option<&mut Node> {
        self.nodes.iter_mut().find(|n| n.id == id)
    }

    pub fn is_occupied(&self, pos: GridPos) -> bool {
        self.nodes.iter().any(|n| n.pos == pos)
    }

    pub fn has_connection(&self, a: &str, b: &str) -> bool {
        self.connections.iter().any(|c| c.joins(a, b))
    }

    /// Returns false (and changes nothing) for self-links, duplicates
    /// in either direction, or unknown endpoints.
    pub fn add_connection(&mut self, a: &str, b: &str) -> bool {
        if a == b || self.has_connection(a, b) {
            return false;
        }
        if self.node(a).is_none() || self.node(b).is_none() {
            return false;
        }
        self.connections.push(Connection {
            id: format!("{a}-{b}"),
            a: a.to_string(),
            b: b.to_string(),
        });
        true
    }

    pub fn remove_connection(&mut self, a: &str, b: &str) -> bool {
        let before = self.connections.len();
        self.connections.retain(|c| !c.joins(a, b));
        self.connections.len() != before
    }

    /// Every node linked to `id`, regardless of edge direction, in
    /// connection order.
    pub fn neighbors_of(&self, id: &str) -> Vec<NodeId> {
        self.connections
            .iter()
            .filter_map(|c| c.other(id).cloned())
            .collect()
    }

    /// Neighbours whose type is in `types`, optionally only active ones.
    pub fn neighbors_matching(&self, id: &str, types: &[NodeType], active_only: bool) -> Vec<NodeId> {
        self.neighbors_of(id)
            .into_iter()
            .filter(|nid| {
                self.node(nid).is_some_and(|n| {
                    types.contains(&n.node_type) && (!active_only || n.is_active())
                })
            })
            .collect()
    }

    pub fn ids_of_type(&self, node_type: NodeType) -> Vec<NodeId> {
        self.nodes
            .iter()
            .filter(|n| n.node_type == node_type)
            .map(|n| n.id.clone())
            .collect()
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
        self.connections.clear();
        self.next_seq = 0;
    }
}
