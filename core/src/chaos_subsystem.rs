//! Chaos subsystem: random infrastructure failures for resilience drills.
//!
//! Every `interval_ticks` seconds, while the chaos toggle is on, a coin
//! flip decides whether anything breaks. If it does, either a whole
//! availability zone goes dark or one random node fails. Gateways and
//! load balancers are never targeted.
//!
//! Execution: every second tick, after auto-scaling.
//! Depends on: none.

use crate::{
    context::SimContext,
    error::SimResult,
    event::{LogSeverity, SimEvent},
    graph::{Node, NodeType, Zone},
    rng::SubsystemRng,
    subsystem::SimSubsystem,
};
use std::any::Any;

#[derive(Debug, Default)]
pub struct ChaosSubsystem {
    pub incidents: u32,
}

impl ChaosSubsystem {
    pub fn new() -> Self {
        Self::default()
    }

    fn is_target(node: &Node) -> bool {
        node.is_active() && !matches!(node.node_type, NodeType::Gateway | NodeType::LoadBalancer)
    }

    fn zone_outage(ctx: &mut SimContext, rng: &mut SubsystemRng) -> SimEvent {
        let zone = if rng.chance(0.5) { Zone::A } else { Zone::B };
        let victims: Vec<_> = ctx
            .graph
            .nodes
            .iter()
            .filter(|n| Self::is_target(n) && n.zone == Some(zone))
            .map(|n| n.id.clone())
            .collect();
        for id in &victims {
            ctx.kill_node(id, "zone_outage");
        }
        ctx.log(
            LogSeverity::Error,
            format!("CHAOS EVENT: Zone {zone:?} outage, {} nodes down", victims.len()),
            None,
        );
        SimEvent::ZoneOutage {
            tick: ctx.clock.current_tick,
            zone,
            nodes: victims,
        }
    }
}

impl SimSubsystem for ChaosSubsystem {
    fn name(&self) -> &'static str {
        "chaos"
    }

    fn update(&mut self, ctx: &mut SimContext, rng: &mut SubsystemRng) -> SimResult<Vec<SimEvent>> {
        let tick = ctx.clock.current_tick;
        let cfg = ctx.config.chaos.clone();
        if !ctx.toggles.chaos || cfg.interval_ticks == 0 || tick % cfg.interval_ticks != 0 {
            return Ok(vec![]);
        }
        if !rng.chance(cfg.event_chance) {
            log::debug!("tick={tick} chaos: nothing broke");
            return Ok(vec![]);
        }
        let candidates: Vec<_> = ctx
            .graph
            .nodes
            .iter()
            .filter(|n| Self::is_target(n))
            .map(|n| n.id.clone())
            .collect();
        if candidates.is_empty() {
            return Ok(vec![]);
        }

        self.incidents += 1;
        if rng.chance(cfg.zone_outage_chance) {
            return Ok(vec![Self::zone_outage(ctx, rng)]);
        }

        if let Some(victim) = rng.pick(&candidates) {
            ctx.kill_node(victim, "chaos");
            ctx.log(
                LogSeverity::Warning,
                format!("CHAOS EVENT: Node {victim} failed"),
                Some(victim),
            );
        }
        // NodeKilled travels through the context outbox.
        Ok(vec![])
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
