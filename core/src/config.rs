//! Balance configuration.
//!
//! Every tunable number lives here. `SimConfig::default()` is the
//! canonical balance; `SimConfig::load` overlays a JSON file on top of
//! it, so a file only needs the fields it changes.

use crate::{graph::NodeType, traffic::TrafficType, types::GridPos};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct TierStats {
    /// Requests per reporting window before the node is overloaded.
    pub capacity: u32,
    /// Cost of upgrading INTO this tier.
    pub cost: f64,
}

const fn tier(capacity: u32, cost: f64) -> TierStats {
    TierStats { capacity, cost }
}

pub const MAX_TIER: u8 = 5;

fn default_tier_table() -> BTreeMap<NodeType, Vec<TierStats>> {
    [
        (NodeType::Gateway, vec![tier(50, 0.0), tier(100, 1000.0), tier(250, 2500.0), tier(500, 6000.0), tier(1000, 15000.0)]),
        (NodeType::Waf, vec![tier(30, 0.0), tier(60, 600.0), tier(150, 1500.0), tier(400, 4000.0), tier(1000, 10000.0)]),
        (NodeType::LoadBalancer, vec![tier(40, 0.0), tier(100, 800.0), tier(300, 2000.0), tier(800, 5000.0), tier(2000, 12000.0)]),
        (NodeType::WebServer, vec![tier(10, 0.0), tier(25, 400.0), tier(60, 1000.0), tier(150, 2500.0), tier(400, 6000.0)]),
        (NodeType::Database, vec![tier(15, 0.0), tier(40, 600.0), tier(100, 1500.0), tier(250, 4000.0), tier(600, 10000.0)]),
        (NodeType::Cache, vec![tier(50, 0.0), tier(150, 500.0), tier(400, 1200.0), tier(1000, 3000.0), tier(2500, 8000.0)]),
        (NodeType::ObjectStore, vec![tier(100, 0.0), tier(300, 600.0), tier(800, 1500.0), tier(2000, 4000.0), tier(5000, 10000.0)]),
        (NodeType::Queue, vec![tier(100, 0.0), tier(300, 500.0), tier(800, 1200.0), tier(2000, 3000.0), tier(5000, 8000.0)]),
    ]
    .into_iter()
    .collect()
}

fn default_placement_costs() -> BTreeMap<NodeType, f64> {
    [
        (NodeType::Gateway, 500.0),
        (NodeType::Waf, 300.0),
        (NodeType::LoadBalancer, 200.0),
        (NodeType::WebServer, 100.0),
        (NodeType::Queue, 150.0),
        (NodeType::Database, 200.0),
        (NodeType::Cache, 150.0),
        (NodeType::ObjectStore, 50.0),
    ]
    .into_iter()
    .collect()
}

// ── Economy ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EconomyConfig {
    /// Spending may not push cash below this.
    pub cash_floor: f64,
    pub base_upkeep: f64,
    pub database_upkeep: f64,
    pub repair_cost: f64,
    pub auto_repair_threshold: f64,
    pub auto_repair_cost: f64,
    pub reputation_regen_per_tick: f64,
    pub reboot_seconds: u32,
    /// Operating cost per tier per node, per second.
    pub opex_per_tier: f64,
}

impl Default for EconomyConfig {
    fn default() -> Self {
        Self {
            cash_floor: -1000.0,
            base_upkeep: 1.0,
            database_upkeep: 2.0,
            repair_cost: 50.0,
            auto_repair_threshold: 50.0,
            auto_repair_cost: 60.0,
            reputation_regen_per_tick: 0.5,
            reboot_seconds: 5,
            opex_per_tier: 1.0,
        }
    }
}

// ── Routing ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutingConfig {
    pub packet_pool_size: usize,
    pub packet_speed_min: f64,
    pub packet_speed_jitter: f64,

    pub failure_cash_penalty: f64,
    pub failure_reputation_penalty: f64,
    pub refused_cash_penalty: f64,
    pub overload_damage: f64,

    pub web_server_reward: f64,
    pub cache_hit_reward: f64,
    pub db_write_reward: f64,
    pub db_read_reward: f64,
    pub object_upload_reward: f64,
    pub object_reward: f64,
    pub waf_block_score: u64,
    pub waf_block_reputation: f64,
    pub research_per_request: f64,

    /// Chance a malicious request on a web server attempts injection
    /// against a database instead of hitting the server itself.
    pub injection_chance: f64,
    pub breach_cash_penalty: f64,
    pub breach_damage: f64,
    pub leak_cash_penalty: f64,
    pub leak_reputation_penalty: f64,
    pub leak_damage: f64,

    pub cache_hit_rates: BTreeMap<TrafficType, f64>,
    /// Fraction of static requests the CDN serves at the edge.
    pub cdn_static_offload: f64,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            packet_pool_size: 2000,
            packet_speed_min: 0.01,
            packet_speed_jitter: 0.005,

            failure_cash_penalty: 10.0,
            failure_reputation_penalty: 2.0,
            refused_cash_penalty: 5.0,
            overload_damage: 2.0,

            web_server_reward: 5.0,
            cache_hit_reward: 10.0,
            db_write_reward: 20.0,
            db_read_reward: 15.0,
            object_upload_reward: 25.0,
            object_reward: 5.0,
            waf_block_score: 5,
            waf_block_reputation: 0.1,
            research_per_request: 0.1,

            injection_chance: 0.3,
            breach_cash_penalty: 50.0,
            breach_damage: 20.0,
            leak_cash_penalty: 200.0,
            leak_reputation_penalty: 10.0,
            leak_damage: 50.0,

            cache_hit_rates: [
                (TrafficType::Static, 0.90),
                (TrafficType::Read, 0.40),
                (TrafficType::Search, 0.15),
            ]
            .into_iter()
            .collect(),
            cdn_static_offload: 0.5,
        }
    }
}

// ── Auto-scaling ──────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AutoScalingConfig {
    pub scale_out_above: f64,
    pub scale_in_below: f64,
    /// Scale-in only while more than this many servers are active.
    pub min_servers: usize,
    /// First grid cell tried for new servers; later ones fill a row of
    /// `row_width` cells, two apart.
    pub origin: GridPos,
    pub row_width: i32,
}

impl Default for AutoScalingConfig {
    fn default() -> Self {
        Self {
            scale_out_above: 0.8,
            scale_in_below: 0.3,
            min_servers: 2,
            origin: (10, -10),
            row_width: 5,
        }
    }
}

// ── Chaos ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChaosConfig {
    pub interval_ticks: u64,
    pub event_chance: f64,
    pub zone_outage_chance: f64,
}

impl Default for ChaosConfig {
    fn default() -> Self {
        Self {
            interval_ticks: 10,
            event_chance: 0.5,
            zone_outage_chance: 0.5,
        }
    }
}

// ── Root ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub tiers: BTreeMap<NodeType, Vec<TierStats>>,
    pub placement_costs: BTreeMap<NodeType, f64>,
    pub economy: EconomyConfig,
    pub routing: RoutingConfig,
    pub auto_scaling: AutoScalingConfig,
    pub chaos: ChaosConfig,
    pub log_capacity: usize,
    /// Fastest time scale a player may select.
    pub max_time_scale: f64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            tiers: default_tier_table(),
            placement_costs: default_placement_costs(),
            economy: EconomyConfig::default(),
            routing: RoutingConfig::default(),
            auto_scaling: AutoScalingConfig::default(),
            chaos: ChaosConfig::default(),
            log_capacity: 50,
            max_time_scale: 10.0,
        }
    }
}

impl SimConfig {
    /// Load a balance file. Fields the file omits keep their defaults.
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let config: SimConfig = serde_json::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Cannot parse {path}: {e}"))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        for node_type in NodeType::ALL {
            let tiers = self
                .tiers
                .get(&node_type)
                .ok_or_else(|| anyhow::anyhow!("tier table missing {}", node_type.label()))?;
            if tiers.len() != MAX_TIER as usize {
                anyhow::bail!(
                    "tier table for {} has {} tiers, expected {MAX_TIER}",
                    node_type.label(),
                    tiers.len()
                );
            }
        }
        if self.routing.packet_speed_min <= 0.0 {
            anyhow::bail!("packet_speed_min must be positive");
        }
        if self.log_capacity == 0 {
            anyhow::bail!("log_capacity must be at least 1");
        }
        if !self.max_time_scale.is_finite() || self.max_time_scale < 1.0 {
            anyhow::bail!("max_time_scale must be finite and at least 1");
        }
        Ok(())
    }

    /// Capacity of a node at its current tier (1-based).
    pub fn capacity(&self, node_type: NodeType, tier: u8) -> u32 {
        self.tier_stats(node_type, tier).map(|t| t.capacity).unwrap_or(0)
    }

    /// Stats of tier `tier` (1-based), if it exists.
    pub fn tier_stats(&self, node_type: NodeType, tier: u8) -> Option<&TierStats> {
        let idx = (tier as usize).checked_sub(1)?;
        self.tiers.get(&node_type)?.get(idx)
    }

    /// Cost of reaching the tier after `current`, if there is one.
    pub fn upgrade_cost(&self, node_type: NodeType, current: u8) -> Option<f64> {
        self.tier_stats(node_type, current.checked_add(1)?).map(|t| t.cost)
    }

    pub fn placement_cost(&self, node_type: NodeType) -> f64 {
        self.placement_costs.get(&node_type).copied().unwrap_or(0.0)
    }

    pub fn upkeep_rate(&self, node_type: NodeType) -> f64 {
        match node_type {
            NodeType::Gateway  => 0.0,
            NodeType::Database => self.economy.database_upkeep,
            _                  => self.economy.base_upkeep,
        }
    }

    pub fn cache_hit_rate(&self, t: TrafficType) -> f64 {
        self.routing.cache_hit_rates.get(&t).copied().unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        SimConfig::default().validate().unwrap();
    }

    #[test]
    fn upgrade_cost_reads_the_next_tier() {
        let cfg = SimConfig::default();
        assert_eq!(cfg.capacity(NodeType::WebServer, 1), 10);
        assert_eq!(cfg.upgrade_cost(NodeType::WebServer, 1), Some(400.0));
        assert_eq!(cfg.upgrade_cost(NodeType::WebServer, 5), None);
    }

    #[test]
    fn shipped_balance_matches_defaults() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/../data/balance.json");
        let shipped = SimConfig::load(path).unwrap();
        assert_eq!(
            serde_json::to_value(&shipped).unwrap(),
            serde_json::to_value(SimConfig::default()).unwrap()
        );
    }

    #[test]
    fn max_time_scale_below_one_is_invalid() {
        let cfg = SimConfig { max_time_scale: 0.5, ..SimConfig::default() };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let cfg: SimConfig =
            serde_json::from_str(r#"{ "economy": { "repair_cost": 75.0 } }"#).unwrap();
        assert_eq!(cfg.economy.repair_cost, 75.0);
        assert_eq!(cfg.economy.auto_repair_cost, 60.0);
        assert_eq!(cfg.capacity(NodeType::Cache, 2), 150);
    }
}
