//! Packet routing subsystem: spawns, advances and resolves traffic.
//!
//! This subsystem:
//!   1. Spawns packets at every active gateway from the traffic config
//!   2. Advances every in-flight packet along its current hop
//!   3. Resolves arrivals: overload check, down check, then the
//!      per-node-type handler from the dispatch table
//!   4. Re-launches relayed packets after the resolve pass, never
//!      inside it
//!
//! A packet whose target no longer exists vanishes silently.
//!
//! Execution: every frame (variable delta), driven by SimEngine::frame.
//! Depends on: graph, traffic config, economy (via SimContext).

use crate::{
    context::SimContext,
    graph::{NodeStatus, NodeType},
    rng::SubsystemRng,
    tech::TechId,
    traffic::{pick_weighted, TrafficMode, TrafficType},
    types::NodeId,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Node types a gateway may hand a fresh request to.
const ENTRY_TYPES: &[NodeType] = &[NodeType::LoadBalancer, NodeType::WebServer, NodeType::Waf];

// ── Public types ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct Packet {
    pub active: bool,
    pub traffic: TrafficType,
    /// 0..1 along the current hop.
    pub progress: f64,
    pub speed: f64,
    pub source: NodeId,
    pub target: NodeId,
}

impl Packet {
    fn idle() -> Self {
        Self {
            active: false,
            traffic: TrafficType::Read,
            progress: 0.0,
            speed: 0.0,
            source: NodeId::new(),
            target: NodeId::new(),
        }
    }
}

/// What happened when a packet reached its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// Target no longer exists, or cannot process requests.
    Vanished,
    Overloaded,
    Refused,
    /// Malicious request stopped without harm.
    Blocked,
    Served,
    Relayed,
    /// No valid downstream neighbour.
    Failed,
    Breach,
    DataLeak,
}

impl Outcome {
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            Self::Overloaded | Self::Refused | Self::Failed | Self::Breach | Self::DataLeak
        )
    }
}

/// Counters for one frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FrameSummary {
    pub spawned: u32,
    /// Static requests the CDN served at the edge.
    pub absorbed: u32,
    /// Gateways with nowhere to send a request.
    pub spawn_failures: u32,
    /// Launches lost to an exhausted packet pool.
    pub dropped: u32,
    pub resolved: u32,
    pub served: u32,
    pub relayed: u32,
    pub failed: u32,
}

impl FrameSummary {
    fn record(&mut self, outcome: Outcome) {
        self.resolved += 1;
        match outcome {
            Outcome::Served  => self.served += 1,
            Outcome::Relayed => self.relayed += 1,
            o if o.is_failure() => self.failed += 1,
            _ => {}
        }
    }
}

#[derive(Debug, Clone)]
struct Relay {
    from: NodeId,
    to: NodeId,
    traffic: TrafficType,
}

// ── Dispatch table ───────────────────────────────────────────────────────────

/// One resolution in progress at `node_id`.
struct Hop<'a> {
    ctx: &'a mut SimContext,
    rng: &'a mut SubsystemRng,
    relays: &'a mut Vec<Relay>,
    node_id: &'a str,
    traffic: TrafficType,
}

impl Hop<'_> {
    /// Queue the request toward a random active neighbour of one of
    /// `types`. False if there is none.
    fn relay(&mut self, types: &[NodeType]) -> bool {
        let targets = self.ctx.graph.neighbors_matching(self.node_id, types, true);
        let Some(next) = self.rng.pick(&targets) else {
            return false;
        };
        self.relays.push(Relay {
            from: self.node_id.to_string(),
            to: next.clone(),
            traffic: self.traffic,
        });
        true
    }

    fn relay_or_fail(&mut self, types: &[NodeType], reason: impl Into<String>) -> Outcome {
        if self.relay(types) {
            Outcome::Relayed
        } else {
            self.ctx.record_failure(self.node_id, reason);
            Outcome::Failed
        }
    }

    fn serve(&mut self, reward: f64) -> Outcome {
        self.ctx.adjust_cash(reward);
        self.ctx.serve_request();
        Outcome::Served
    }
}

type Handler = fn(&mut Hop<'_>) -> Outcome;

const DISPATCH: &[(NodeType, Handler)] = &[
    (NodeType::Waf,          resolve_waf),
    (NodeType::LoadBalancer, resolve_load_balancer),
    (NodeType::WebServer,    resolve_web_server),
    (NodeType::Cache,        resolve_cache),
    (NodeType::Database,     resolve_database),
    (NodeType::ObjectStore,  resolve_object_store),
    (NodeType::Queue,        resolve_queue),
];

fn handler_for(node_type: NodeType) -> Option<Handler> {
    DISPATCH
        .iter()
        .find(|(t, _)| *t == node_type)
        .map(|(_, handler)| *handler)
}

/// Where a read-style request goes when no cache answers it.
fn origin_for(traffic: TrafficType) -> NodeType {
    match traffic {
        TrafficType::Static => NodeType::ObjectStore,
        _                   => NodeType::Database,
    }
}

fn resolve_waf(hop: &mut Hop<'_>) -> Outcome {
    if hop.traffic == TrafficType::Malicious {
        let routing = &hop.ctx.config.routing;
        let (score, reputation) = (routing.waf_block_score, routing.waf_block_reputation);
        hop.ctx.economy.score += score;
        hop.ctx.adjust_reputation(reputation);
        return Outcome::Blocked;
    }
    hop.relay_or_fail(
        &[NodeType::LoadBalancer, NodeType::WebServer],
        "WAF: No route to application",
    )
}

fn resolve_load_balancer(hop: &mut Hop<'_>) -> Outcome {
    hop.relay_or_fail(&[NodeType::WebServer], "LB: No healthy web servers")
}

fn resolve_web_server(hop: &mut Hop<'_>) -> Outcome {
    if hop.traffic == TrafficType::Malicious {
        let routing = &hop.ctx.config.routing;
        let (chance, penalty, damage) =
            (routing.injection_chance, routing.breach_cash_penalty, routing.breach_damage);
        if hop.rng.chance(chance) {
            // Injection attempt. With no database behind it, nothing leaks.
            return if hop.relay(&[NodeType::Database]) { Outcome::Relayed } else { Outcome::Blocked };
        }
        hop.ctx.adjust_cash(-penalty);
        hop.ctx.damage_node(hop.node_id, damage);
        hop.ctx
            .record_failure(hop.node_id, "Security breach: malicious traffic on web server");
        return Outcome::Breach;
    }

    let reward = hop.ctx.config.routing.web_server_reward;
    hop.ctx.adjust_cash(reward);
    match hop.traffic {
        TrafficType::Write => {
            hop.relay_or_fail(&[NodeType::Database], "App: Write failed, no database available")
        }
        TrafficType::Upload => hop.relay_or_fail(
            &[NodeType::ObjectStore],
            "App: Upload failed, no object-store available",
        ),
        traffic => {
            if hop.relay(&[NodeType::Cache]) {
                return Outcome::Relayed;
            }
            let origin = origin_for(traffic);
            hop.relay_or_fail(&[origin], format!("App: Read failed, no {} available", origin.label()))
        }
    }
}

fn resolve_cache(hop: &mut Hop<'_>) -> Outcome {
    let hit_rate = hop.ctx.config.cache_hit_rate(hop.traffic);
    if hop.rng.chance(hit_rate) {
        let reward = hop.ctx.config.routing.cache_hit_reward;
        return hop.serve(reward);
    }
    let origin = origin_for(hop.traffic);
    hop.relay_or_fail(&[origin], format!("Cache miss: origin {} unreachable", origin.label()))
}

fn resolve_database(hop: &mut Hop<'_>) -> Outcome {
    let routing = &hop.ctx.config.routing;
    if hop.traffic == TrafficType::Malicious {
        let (cash, reputation, damage) =
            (routing.leak_cash_penalty, routing.leak_reputation_penalty, routing.leak_damage);
        hop.ctx.damage_node(hop.node_id, damage);
        hop.ctx.adjust_cash(-cash);
        hop.ctx.record_failure(hop.node_id, "DATA LEAK: malicious query reached the database");
        hop.ctx.adjust_reputation(-reputation);
        return Outcome::DataLeak;
    }
    let reward = match hop.traffic {
        TrafficType::Write => routing.db_write_reward,
        _                  => routing.db_read_reward,
    };
    hop.serve(reward)
}

fn resolve_object_store(hop: &mut Hop<'_>) -> Outcome {
    let routing = &hop.ctx.config.routing;
    let reward = match hop.traffic {
        TrafficType::Upload => routing.object_upload_reward,
        _                   => routing.object_reward,
    };
    hop.serve(reward)
}

/// Queues hand work to whatever consumes it: uploads to object
/// storage, everything else to a database.
fn resolve_queue(hop: &mut Hop<'_>) -> Outcome {
    let consumer = match hop.traffic {
        TrafficType::Upload => NodeType::ObjectStore,
        _                   => NodeType::Database,
    };
    hop.relay_or_fail(&[consumer], format!("Queue: no {} consumer", consumer.label()))
}

// ── Subsystem ────────────────────────────────────────────────────────────────

pub struct RoutingSubsystem {
    pool: Vec<Packet>,
    /// Fractional spawns carried between frames, per gateway.
    spawn_accumulators: BTreeMap<NodeId, f64>,
    /// Relays produced by the current resolve pass.
    pending: Vec<Relay>,
}

impl RoutingSubsystem {
    pub fn new(pool_size: usize) -> Self {
        Self {
            pool: vec![Packet::idle(); pool_size],
            spawn_accumulators: BTreeMap::new(),
            pending: Vec::new(),
        }
    }

    pub fn name(&self) -> &'static str {
        "routing"
    }

    /// Return every packet to the pool and forget carried spawns.
    pub fn clear(&mut self) {
        for packet in &mut self.pool {
            *packet = Packet::idle();
        }
        self.spawn_accumulators.clear();
        self.pending.clear();
    }

    pub fn active_packets(&self) -> usize {
        self.pool.iter().filter(|p| p.active).count()
    }

    pub fn packets(&self) -> impl Iterator<Item = &Packet> {
        self.pool.iter().filter(|p| p.active)
    }

    /// One frame. `scaled_delta` is simulated seconds for spawning;
    /// packets advance by `speed * time_scale` regardless of delta.
    pub fn step(
        &mut self,
        ctx: &mut SimContext,
        rng: &mut SubsystemRng,
        scaled_delta: f64,
    ) -> FrameSummary {
        let mut summary = FrameSummary::default();
        self.spawn(ctx, rng, scaled_delta, &mut summary);

        let advance = ctx.clock.time_scale;
        for i in 0..self.pool.len() {
            let packet = &mut self.pool[i];
            if !packet.active {
                continue;
            }
            packet.progress += packet.speed * advance;
            if packet.progress < 1.0 {
                continue;
            }
            packet.active = false;
            let target = std::mem::take(&mut packet.target);
            let traffic = packet.traffic;

            let outcome = self.resolve_arrival(ctx, rng, &target, traffic);
            summary.record(outcome);
            if ctx.clock.frozen {
                break;
            }
        }

        let lost = self.flush_relays(ctx, rng);
        summary.dropped = summary.dropped.saturating_add(lost);
        if summary.dropped > 0 {
            log::debug!(
                "tick={} routing: packet pool exhausted, {} launches dropped",
                ctx.clock.current_tick,
                summary.dropped
            );
        }
        summary
    }

    /// Resolve one arrival at `target`. Relays it produces are queued
    /// until `flush_relays`.
    pub fn resolve_arrival(
        &mut self,
        ctx: &mut SimContext,
        rng: &mut SubsystemRng,
        target: &str,
        traffic: TrafficType,
    ) -> Outcome {
        let Some(node) = ctx.graph.node(target) else {
            return Outcome::Vanished;
        };
        let (node_type, status) = (node.node_type, node.status);
        let capacity = ctx.config.capacity(node_type, node.tier);

        let load = ctx.record_load(target);
        if load > capacity {
            let damage = ctx.config.routing.overload_damage;
            ctx.damage_node(target, damage);
            ctx.record_failure(target, format!("Capacity Exceeded ({load} > {capacity})"));
            return Outcome::Overloaded;
        }

        if status != NodeStatus::Active {
            let penalty = ctx.config.routing.refused_cash_penalty;
            ctx.adjust_cash(-penalty);
            ctx.record_failure(target, format!("Connection Refused: Node {}", status.label()));
            return Outcome::Refused;
        }

        let Some(handler) = handler_for(node_type) else {
            return Outcome::Vanished;
        };
        let mut hop = Hop {
            ctx,
            rng,
            relays: &mut self.pending,
            node_id: target,
            traffic,
        };
        handler(&mut hop)
    }

    /// Launch every queued relay. Returns how many were dropped.
    pub fn flush_relays(&mut self, ctx: &SimContext, rng: &mut SubsystemRng) -> u32 {
        let mut dropped = 0;
        for relay in std::mem::take(&mut self.pending) {
            if !self.launch(ctx, rng, relay.from, relay.to, relay.traffic) {
                dropped += 1;
            }
        }
        dropped
    }

    /// Put a packet in flight directly. Used by relays and by tests.
    pub fn launch(
        &mut self,
        ctx: &SimContext,
        rng: &mut SubsystemRng,
        source: NodeId,
        target: NodeId,
        traffic: TrafficType,
    ) -> bool {
        let routing = &ctx.config.routing;
        let speed = rng.range_f64(
            routing.packet_speed_min,
            routing.packet_speed_min + routing.packet_speed_jitter,
        );
        let Some(slot) = self.pool.iter_mut().find(|p| !p.active) else {
            return false;
        };
        *slot = Packet {
            active: true,
            traffic,
            progress: 0.0,
            speed,
            source,
            target,
        };
        true
    }

    // ── Spawning ─────────────────────────────────────────────────────────────

    fn spawn(
        &mut self,
        ctx: &mut SimContext,
        rng: &mut SubsystemRng,
        scaled_delta: f64,
        summary: &mut FrameSummary,
    ) {
        let gateway_count = ctx.graph.ids_of_type(NodeType::Gateway).len();
        let gateways: Vec<NodeId> = ctx
            .graph
            .nodes
            .iter()
            .filter(|n| n.node_type == NodeType::Gateway && n.is_active())
            .map(|n| n.id.clone())
            .collect();
        self.spawn_accumulators.retain(|id, _| gateways.contains(id));
        if gateways.is_empty() || scaled_delta <= 0.0 {
            return;
        }
        // Every gateway takes an equal share; a down gateway's share is lost.
        let share = 1.0 / gateway_count as f64;
        // No frame launches more packets than the pool has free slots.
        let mut budget = (self.pool.len() - self.active_packets()) as u32;

        match ctx.traffic.mode {
            TrafficMode::Aggregate => {
                let per_gateway = ctx.traffic.total_rate.max(0.0) * share * scaled_delta;
                for gateway in &gateways {
                    let wanted = {
                        let acc = self.spawn_accumulators.entry(gateway.clone()).or_insert(0.0);
                        *acc += per_gateway;
                        let whole = acc.floor();
                        *acc -= whole;
                        whole as u32
                    };
                    let count = take_budget(&mut budget, wanted, summary);
                    for _ in 0..count {
                        self.spawn_from(ctx, rng, gateway, None, summary);
                    }
                }
            }
            TrafficMode::Granular => {
                for gateway in &gateways {
                    for traffic in TrafficType::ALL {
                        let expected =
                            ctx.traffic.granular_rates.get(traffic).max(0.0) * share * scaled_delta;
                        let mut wanted = expected.floor() as u32;
                        if rng.chance(expected.fract()) {
                            wanted = wanted.saturating_add(1);
                        }
                        let count = take_budget(&mut budget, wanted, summary);
                        for _ in 0..count {
                            self.spawn_from(ctx, rng, gateway, Some(traffic), summary);
                        }
                    }
                }
            }
        }
    }

    fn spawn_from(
        &mut self,
        ctx: &mut SimContext,
        rng: &mut SubsystemRng,
        gateway: &str,
        traffic: Option<TrafficType>,
        summary: &mut FrameSummary,
    ) {
        let traffic = match traffic {
            Some(t) => t,
            None => pick_weighted(&ctx.traffic.distribution, rng.next_f64() * 100.0),
        };

        if traffic == TrafficType::Static && ctx.has_tech(TechId::GlobalCdn) {
            let offload = ctx.config.routing.cdn_static_offload;
            if rng.chance(offload) {
                ctx.serve_request();
                summary.absorbed += 1;
                return;
            }
        }

        let targets = ctx.graph.neighbors_matching(gateway, ENTRY_TYPES, false);
        let Some(target) = rng.pick(&targets).cloned() else {
            ctx.record_failure(gateway, "Gateway: No route to infrastructure");
            summary.spawn_failures += 1;
            return;
        };
        if self.launch(ctx, rng, gateway.to_string(), target, traffic) {
            summary.spawned += 1;
        } else {
            summary.dropped = summary.dropped.saturating_add(1);
        }
    }
}

/// Grant up to `wanted` launches from the frame's budget. The rest
/// count as dropped.
fn take_budget(budget: &mut u32, wanted: u32, summary: &mut FrameSummary) -> u32 {
    let granted = wanted.min(*budget);
    *budget -= granted;
    summary.dropped = summary.dropped.saturating_add(wanted - granted);
    granted
}
