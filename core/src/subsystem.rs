//! Subsystem trait.
//!
//! RULE: Every fixed-rate subsystem implements SimSubsystem.
//! The engine calls update() on each registered subsystem
//! in registration order, once per simulated second.
//! Execution order is fixed and documented in engine.rs.

use crate::{context::SimContext, error::SimResult, event::SimEvent, rng::SubsystemRng};
use std::any::Any;

/// The contract every fixed-rate subsystem must fulfill.
pub trait SimSubsystem: Send {
    /// Unique stable name for this subsystem.
    fn name(&self) -> &'static str;

    /// Called once per second tick by the engine.
    ///
    /// - `ctx`: the shared simulation state; the only way to mutate it
    /// - `rng`: this subsystem's persistent deterministic stream
    ///
    /// Returns the events this subsystem produced.
    fn update(&mut self, ctx: &mut SimContext, rng: &mut SubsystemRng) -> SimResult<Vec<SimEvent>>;

    /// For downcasting in tests and tooling only.
    /// Production sim code never uses this.
    fn as_any(&self) -> &dyn Any;
}
