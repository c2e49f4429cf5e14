//! Research tree. Unlocking is append-only and paid in research points.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum TechId {
    #[serde(rename = "server-opt-1")]
    ServerOpt1,
    #[serde(rename = "db-sharding-1")]
    DbSharding1,
    AutoScaling,
    MultiAz,
    GlobalCdn,
}

#[derive(Debug, Clone)]
pub struct TechNode {
    pub id: TechId,
    pub label: &'static str,
    pub description: &'static str,
    pub cost: f64,
    pub requirements: &'static [TechId],
}

pub const TECH_TREE: &[TechNode] = &[
    TechNode {
        id: TechId::ServerOpt1,
        label: "Server Optimization I",
        description: "Unlock Tier 2+ Web Servers",
        cost: 100.0,
        requirements: &[],
    },
    TechNode {
        id: TechId::DbSharding1,
        label: "DB Sharding I",
        description: "Unlock Tier 2+ Databases",
        cost: 150.0,
        requirements: &[],
    },
    TechNode {
        id: TechId::AutoScaling,
        label: "Auto-Scaling",
        description: "Automatically manage web server capacity",
        cost: 500.0,
        requirements: &[TechId::ServerOpt1],
    },
    TechNode {
        id: TechId::MultiAz,
        label: "Multi-AZ Deployment",
        description: "Halves the penalty of every failure",
        cost: 800.0,
        requirements: &[TechId::ServerOpt1, TechId::DbSharding1],
    },
    TechNode {
        id: TechId::GlobalCdn,
        label: "Global CDN",
        description: "Serve half of all static traffic at the edge",
        cost: 2000.0,
        requirements: &[TechId::AutoScaling],
    },
];

impl TechId {
    /// TECH_TREE is declared in TechId order.
    pub fn node(&self) -> &'static TechNode {
        &TECH_TREE[*self as usize]
    }

    pub fn label(&self) -> &'static str {
        self.node().label
    }
}
