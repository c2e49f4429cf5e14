//! Economy subsystem: upkeep, reboots, auto-repair and reputation.
//!
//! This subsystem:
//!   1. Charges upkeep for every non-gateway node (no cash floor here)
//!   2. Counts down rebooting nodes and brings them back online
//!   3. Auto-repairs damaged nodes in node order while cash allows
//!   4. Regenerates reputation, unless it has already collapsed to 0
//!
//! Execution: every second tick, first.
//! Depends on: none.

use crate::{
    context::{SimContext, MAX_REPUTATION},
    error::SimResult,
    event::{LogSeverity, SimEvent},
    graph::NodeStatus,
    rng::SubsystemRng,
    subsystem::SimSubsystem,
};
use std::any::Any;

#[derive(Debug, Default)]
pub struct EconomySubsystem {
    /// Total upkeep charged since the run started.
    pub upkeep_paid: f64,
}

impl EconomySubsystem {
    pub fn new() -> Self {
        Self::default()
    }

    fn tick_reboots(ctx: &mut SimContext, events: &mut Vec<SimEvent>) {
        let mut online = Vec::new();
        for node in ctx.graph.nodes.iter_mut() {
            if node.status != NodeStatus::Rebooting {
                continue;
            }
            node.reboot_remaining = node.reboot_remaining.saturating_sub(1);
            if node.reboot_remaining == 0 {
                node.status = NodeStatus::Active;
                online.push(node.id.clone());
            }
        }
        for id in online {
            ctx.log(LogSeverity::Info, format!("{id} is back online"), Some(&id));
            events.push(SimEvent::NodeStatusChanged { node_id: id, status: NodeStatus::Active });
        }
    }

    fn auto_repair(ctx: &mut SimContext, events: &mut Vec<SimEvent>) -> u32 {
        let threshold = ctx.config.economy.auto_repair_threshold;
        let cost = ctx.config.economy.auto_repair_cost;
        let damaged: Vec<_> = ctx
            .graph
            .nodes
            .iter()
            .filter(|n| n.health < threshold)
            .map(|n| n.id.clone())
            .collect();

        let mut repairs = 0;
        for id in damaged {
            if ctx.economy.cash < cost {
                continue;
            }
            ctx.adjust_cash(-cost);
            ctx.restore_node(&id);
            ctx.log(LogSeverity::Info, format!("Auto-repaired {id} for ${cost:.0}"), Some(&id));
            events.push(SimEvent::NodeRepaired { node_id: id, cost, automatic: true });
            repairs += 1;
        }
        repairs
    }
}

impl SimSubsystem for EconomySubsystem {
    fn name(&self) -> &'static str {
        "economy"
    }

    fn update(&mut self, ctx: &mut SimContext, _rng: &mut SubsystemRng) -> SimResult<Vec<SimEvent>> {
        let tick = ctx.clock.current_tick;
        let mut events = Vec::new();

        let upkeep = ctx.upkeep_due();
        ctx.adjust_cash(-upkeep);
        self.upkeep_paid += upkeep;

        Self::tick_reboots(ctx, &mut events);

        let repairs = if ctx.toggles.auto_repair {
            Self::auto_repair(ctx, &mut events)
        } else {
            0
        };

        if ctx.economy.reputation > 0.0 {
            let regen = ctx.config.economy.reputation_regen_per_tick;
            ctx.economy.reputation = (ctx.economy.reputation + regen).min(MAX_REPUTATION);
        }

        log::debug!(
            "tick={tick} economy: upkeep={upkeep:.1} repairs={repairs} cash={:.1} reputation={:.1}",
            ctx.economy.cash,
            ctx.economy.reputation
        );

        events.push(SimEvent::EconomyTicked {
            tick,
            upkeep,
            repairs,
            cash: ctx.economy.cash,
            reputation: ctx.economy.reputation,
        });
        Ok(events)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
