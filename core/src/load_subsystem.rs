//! Load report subsystem: publishes the per-node request window.
//!
//! Copies each node's resolved-request count for the last second into
//! `current_load` (idle nodes report 0), then starts a fresh window.
//! The overload check in routing reads the live window; auto-scaling
//! reads the reported figure.
//!
//! Execution: every second tick, after economy, before auto-scaling.
//! Depends on: routing (fills the window).

use crate::{
    context::SimContext,
    error::SimResult,
    event::SimEvent,
    rng::SubsystemRng,
    subsystem::SimSubsystem,
};
use std::any::Any;

#[derive(Debug, Default)]
pub struct LoadReportSubsystem;

impl LoadReportSubsystem {
    pub fn new() -> Self {
        Self
    }
}

impl SimSubsystem for LoadReportSubsystem {
    fn name(&self) -> &'static str {
        "load_report"
    }

    fn update(&mut self, ctx: &mut SimContext, _rng: &mut SubsystemRng) -> SimResult<Vec<SimEvent>> {
        let window = ctx.take_load_window();
        let mut total_load = 0u64;
        for node in ctx.graph.nodes.iter_mut() {
            node.current_load = window.get(&node.id).copied().unwrap_or(0);
            total_load += node.current_load as u64;
        }
        Ok(vec![SimEvent::LoadReported {
            tick: ctx.clock.current_tick,
            total_load,
        }])
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
