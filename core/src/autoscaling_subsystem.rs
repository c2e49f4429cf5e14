//! Auto-scaling subsystem: grows and shrinks the web-server fleet.
//!
//! Utilization is the reported load of active web servers over their
//! combined tier capacity. Above the scale-out threshold a tier-1
//! server is bought, placed on the next free cell of the scaling grid
//! and wired to the first load balancer. Below the scale-in threshold
//! the most recently added active server is removed. There is no
//! hysteresis beyond the two thresholds, so a fleet can flap.
//!
//! Execution: every second tick, after the load report.
//! Depends on: load report, research (auto-scaling tech).

use crate::{
    context::SimContext,
    error::SimResult,
    event::{LogSeverity, SimEvent},
    graph::NodeType,
    rng::SubsystemRng,
    subsystem::SimSubsystem,
    tech::TechId,
    types::GridPos,
};
use std::any::Any;

#[derive(Debug, Default)]
pub struct AutoScalingSubsystem {
    pub scale_outs: u32,
    pub scale_ins: u32,
}

impl AutoScalingSubsystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load over capacity for active web servers, with their count.
    /// None when there is no active capacity to measure.
    pub fn utilization(ctx: &SimContext) -> Option<(f64, usize)> {
        let (mut load, mut capacity, mut count) = (0u64, 0u64, 0usize);
        for node in ctx
            .graph
            .nodes
            .iter()
            .filter(|n| n.node_type == NodeType::WebServer && n.is_active())
        {
            load += node.current_load as u64;
            capacity += ctx.config.capacity(node.node_type, node.tier) as u64;
            count += 1;
        }
        (capacity > 0).then(|| (load as f64 / capacity as f64, count))
    }

    /// First unoccupied cell of the scaling grid.
    fn free_cell(ctx: &SimContext) -> GridPos {
        let cfg = &ctx.config.auto_scaling;
        let width = cfg.row_width.max(1);
        (0..)
            .map(|i: i32| (cfg.origin.0 + (i % width) * 2, cfg.origin.1 - (i / width) * 2))
            .find(|pos| !ctx.graph.is_occupied(*pos))
            .unwrap_or(cfg.origin)
    }

    fn scale_out(&mut self, ctx: &mut SimContext, utilization: f64) -> Option<SimEvent> {
        let cost = ctx.config.placement_cost(NodeType::WebServer);
        if ctx.economy.cash < cost {
            return None;
        }
        let pos = Self::free_cell(ctx);
        let balancer = ctx.graph.ids_of_type(NodeType::LoadBalancer).into_iter().next();

        ctx.adjust_cash(-cost);
        let node_id = ctx.insert_node(NodeType::WebServer, pos);
        if let Some(lb) = balancer {
            ctx.graph.add_connection(&lb, &node_id);
        }
        ctx.log(
            LogSeverity::Info,
            format!("Auto-Scaling: launched {node_id} (utilization {:.0}%)", utilization * 100.0),
            Some(&node_id),
        );
        self.scale_outs += 1;
        Some(SimEvent::ScaledOut {
            tick: ctx.clock.current_tick,
            node_id,
            utilization,
        })
    }

    fn scale_in(&mut self, ctx: &mut SimContext, utilization: f64) -> Option<SimEvent> {
        let victim = ctx
            .graph
            .nodes
            .iter()
            .rev()
            .find(|n| n.node_type == NodeType::WebServer && n.is_active())
            .map(|n| n.id.clone())?;
        ctx.graph.remove_node(&victim);
        ctx.log(
            LogSeverity::Info,
            format!("Auto-Scaling: terminated {victim} (utilization {:.0}%)", utilization * 100.0),
            None,
        );
        self.scale_ins += 1;
        Some(SimEvent::ScaledIn {
            tick: ctx.clock.current_tick,
            node_id: victim,
            utilization,
        })
    }
}

impl SimSubsystem for AutoScalingSubsystem {
    fn name(&self) -> &'static str {
        "auto_scaling"
    }

    fn update(&mut self, ctx: &mut SimContext, _rng: &mut SubsystemRng) -> SimResult<Vec<SimEvent>> {
        if !ctx.toggles.auto_scaling || !ctx.has_tech(TechId::AutoScaling) {
            return Ok(vec![]);
        }
        let Some((utilization, active)) = Self::utilization(ctx) else {
            return Ok(vec![]);
        };
        let (out_above, in_below, min_servers) = (
            ctx.config.auto_scaling.scale_out_above,
            ctx.config.auto_scaling.scale_in_below,
            ctx.config.auto_scaling.min_servers,
        );

        let event = if utilization > out_above {
            self.scale_out(ctx, utilization)
        } else if utilization < in_below && active > min_servers {
            self.scale_in(ctx, utilization)
        } else {
            None
        };

        if let Some(ev) = &event {
            log::debug!("tick={} auto_scaling: {ev:?}", ctx.clock.current_tick);
        }
        Ok(event.into_iter().collect())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
