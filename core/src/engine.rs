//! The simulation engine: owns the context, the RNG bank and every
//! subsystem, and drives the two clocks.
//!
//! FRAME CLOCK (variable delta, `frame`):
//!   Routing: spawn, advance, resolve, relay.
//!
//! SECOND CLOCK (1 Hz of simulated time, `second_tick`).
//! EXECUTION ORDER (fixed, documented, never reordered):
//!   1. Economy       upkeep, reboots, auto-repair, reputation
//!   2. LoadReport    publish and reset the per-node load window
//!   3. AutoScaling   reads the load just reported
//!   4. Chaos         random failures (toggle)
//!   5. Director      scenario script, scripted kills, goals
//!
//! RULES:
//!   - Both clocks stop while paused, at time scale 0, or after a loss.
//!   - The second clock runs on simulated time: its real period is
//!     1 / time_scale.
//!   - All randomness flows through the RngBank.
//!   - All state lives in SimContext; subsystems never call each other.

use crate::{
    autoscaling_subsystem::AutoScalingSubsystem,
    chaos_subsystem::ChaosSubsystem,
    command::{PlayerCommand, Rejection},
    config::SimConfig,
    context::SimContext,
    director_subsystem::DirectorSubsystem,
    economy_subsystem::EconomySubsystem,
    error::{SimError, SimResult},
    event::{event_type_name, LogSeverity, SimEvent},
    load_subsystem::LoadReportSubsystem,
    rng::{RngBank, SubsystemSlot},
    routing_subsystem::{FrameSummary, RoutingSubsystem},
    scenario::{scenario_def, ScenarioId},
    snapshot::SimSnapshot,
    subsystem::SimSubsystem,
};

pub struct SimEngine {
    pub ctx: SimContext,
    pub rng_bank: RngBank,
    routing: RoutingSubsystem,
    subsystems: Vec<(SubsystemSlot, Box<dyn SimSubsystem>)>,
}

impl SimEngine {
    pub fn new(seed: u64, config: SimConfig) -> Self {
        let routing = RoutingSubsystem::new(config.routing.packet_pool_size);
        Self {
            ctx: SimContext::new(config),
            rng_bank: RngBank::new(seed),
            routing,
            subsystems: Vec::new(),
        }
    }

    /// Build a fully wired engine with all subsystems registered.
    /// Call this instead of new() + manual register() calls.
    pub fn build(seed: u64, config: SimConfig) -> SimResult<Self> {
        config
            .validate()
            .map_err(|e| SimError::InvalidConfig { reason: e.to_string() })?;
        let mut engine = SimEngine::new(seed, config);
        engine.register_defaults();
        Ok(engine)
    }

    /// Engine with the default balance.
    pub fn build_test(seed: u64) -> SimResult<Self> {
        Self::build(seed, SimConfig::default())
    }

    /// Register a subsystem. Call in the documented execution order.
    pub fn register(&mut self, slot: SubsystemSlot, subsystem: Box<dyn SimSubsystem>) {
        self.subsystems.push((slot, subsystem));
    }

    fn register_defaults(&mut self) {
        self.subsystems.clear();
        // EXECUTION ORDER, fixed, documented, never reordered.
        self.register(SubsystemSlot::Economy, Box::new(EconomySubsystem::new()));
        self.register(SubsystemSlot::LoadReport, Box::new(LoadReportSubsystem::new()));
        self.register(SubsystemSlot::AutoScaling, Box::new(AutoScalingSubsystem::new()));
        self.register(SubsystemSlot::Chaos, Box::new(ChaosSubsystem::new()));
        self.register(SubsystemSlot::Scenario, Box::new(DirectorSubsystem::new()));
    }

    // ── Clocks ───────────────────────────────────────────────────────────────

    /// One animation frame of routing. Domain events it raises stay
    /// queued until the next `advance`, `second_tick` or `take_events`.
    pub fn frame(&mut self, real_delta: f64) -> FrameSummary {
        if self.ctx.clock.is_halted() {
            return FrameSummary::default();
        }
        let scaled = self.ctx.clock.scaled(real_delta);
        self.ctx.clock.advance_time(scaled);
        let rng = self.rng_bank.for_subsystem(SubsystemSlot::Traffic);
        self.routing.step(&mut self.ctx, rng, scaled)
    }

    /// Run every fixed-rate subsystem once, in order.
    pub fn second_tick(&mut self) -> SimResult<Vec<SimEvent>> {
        if self.ctx.clock.is_halted() {
            return Ok(vec![]);
        }
        let tick = self.ctx.clock.advance_tick();
        let mut events = vec![SimEvent::TickStarted { tick }];
        events.extend(self.ctx.drain_outbox());

        for (slot, subsystem) in &mut self.subsystems {
            let rng = self.rng_bank.for_subsystem(*slot);
            let new_events = subsystem.update(&mut self.ctx, rng)?;
            for event in &new_events {
                log::debug!("tick={tick} {}: {}", subsystem.name(), event_type_name(event));
            }
            events.extend(new_events);
            events.extend(self.ctx.drain_outbox());
            if self.ctx.clock.frozen {
                break;
            }
        }

        events.push(SimEvent::TickCompleted { tick });
        Ok(events)
    }

    /// One frame, then one second tick per whole simulated second banked.
    pub fn advance(&mut self, real_delta: f64) -> SimResult<Vec<SimEvent>> {
        if self.ctx.clock.is_halted() {
            return Ok(vec![]);
        }
        let scaled = self.ctx.clock.scaled(real_delta);
        self.frame(real_delta);
        let mut events = self.ctx.drain_outbox();

        self.ctx.clock.bank(scaled);
        while self.ctx.clock.take_second() {
            if self.ctx.clock.is_halted() {
                break;
            }
            events.extend(self.second_tick()?);
        }
        Ok(events)
    }

    /// Drive `seconds` of real time at a steady frame rate. Used by the
    /// runner and tests.
    pub fn run_seconds(&mut self, seconds: f64, fps: u32) -> SimResult<Vec<SimEvent>> {
        let fps = fps.max(1);
        let frames = (seconds * fps as f64).round() as u64;
        let delta = 1.0 / fps as f64;
        let mut events = Vec::new();
        for _ in 0..frames {
            events.extend(self.advance(delta)?);
        }
        Ok(events)
    }

    /// Events raised outside a tick (routing damage, loss).
    pub fn take_events(&mut self) -> Vec<SimEvent> {
        self.ctx.drain_outbox()
    }

    // ── Commands ─────────────────────────────────────────────────────────────

    /// Apply a player command. Rejected commands change nothing and
    /// produce a `CommandRejected` event plus a warning log entry.
    pub fn apply(&mut self, command: PlayerCommand) -> Vec<SimEvent> {
        let name = command.name();
        let ctx = &mut self.ctx;
        let result: Result<Vec<SimEvent>, Rejection> = match command {
            PlayerCommand::SetPaused { paused } => {
                if paused {
                    ctx.clock.pause();
                } else {
                    ctx.clock.resume();
                }
                Ok(vec![SimEvent::PauseChanged { paused }])
            }
            PlayerCommand::SetTimeScale { scale } => {
                let max = ctx.config.max_time_scale;
                if scale.is_finite() && (0.0..=max).contains(&scale) {
                    ctx.clock.set_time_scale(scale);
                    Ok(vec![SimEvent::TimeScaleChanged { scale }])
                } else {
                    Err(Rejection::InvalidTimeScale { scale, max })
                }
            }
            PlayerCommand::PlaceNode { node_type, x, y } => ctx.place_node(node_type, (x, y)).map(one),
            PlayerCommand::RemoveNode { node_id }        => ctx.remove_node(&node_id).map(one),
            PlayerCommand::Connect { a, b }              => ctx.connect(&a, &b).map(one),
            PlayerCommand::Disconnect { a, b }           => ctx.disconnect(&a, &b).map(one),
            PlayerCommand::RepairNode { node_id }        => ctx.repair_node(&node_id).map(one),
            PlayerCommand::UpgradeNode { node_id }       => ctx.upgrade_node(&node_id).map(one),
            PlayerCommand::DamageNode { node_id, amount } => ctx.damage_command(&node_id, amount).map(one),
            PlayerCommand::SetNodeStatus { node_id, status } => {
                ctx.set_node_status(&node_id, status).map(one)
            }
            PlayerCommand::RebootNode { node_id } => ctx.reboot_node(&node_id).map(one),
            PlayerCommand::SetTrafficConfig { patch } => match patch.invalid_field() {
                Some((field, value)) => Err(Rejection::InvalidTrafficRate { field, value }),
                None => {
                    ctx.traffic.apply(&patch);
                    Ok(vec![SimEvent::TrafficConfigChanged])
                }
            },
            PlayerCommand::UnlockTech { tech } => ctx.unlock_tech(tech).map(one),
            PlayerCommand::SetAutoRepair { enabled } => {
                ctx.toggles.auto_repair = enabled;
                Ok(vec![toggle("auto_repair", enabled)])
            }
            PlayerCommand::SetChaos { enabled } => {
                ctx.toggles.chaos = enabled;
                Ok(vec![toggle("chaos", enabled)])
            }
            PlayerCommand::SetAutoScaling { enabled } => {
                ctx.toggles.auto_scaling = enabled;
                Ok(vec![toggle("auto_scaling", enabled)])
            }
            PlayerCommand::StartScenario { scenario } => Ok(self.start_scenario(scenario)),
            PlayerCommand::ResetScenario                => Ok(self.reset()),
        };

        match result {
            Ok(mut events) => {
                events.extend(self.ctx.drain_outbox());
                events
            }
            Err(rejection) => {
                let reason = rejection.to_string();
                self.ctx.log(LogSeverity::Warning, reason.clone(), None);
                vec![SimEvent::CommandRejected { command: name.to_string(), reason }]
            }
        }
    }

    /// Replace the run with a scenario. Packets, timers and RNG streams
    /// restart with it; the script's opening phase applies at once.
    pub fn start_scenario(&mut self, scenario: ScenarioId) -> Vec<SimEvent> {
        self.routing.clear();
        self.rng_bank.reseed();
        self.register_defaults();

        let def = scenario_def(scenario);
        let mut events = vec![self.ctx.load_scenario(&def)];
        let rng = self.rng_bank.for_subsystem(SubsystemSlot::Scenario);
        events.extend(DirectorSubsystem::apply_script(&mut self.ctx, rng));
        events.extend(self.ctx.drain_outbox());
        log::info!("scenario {scenario} started (seed {})", self.rng_bank.master_seed());
        events
    }

    /// Leave the current scenario: empty graph, default economy, paused.
    pub fn reset(&mut self) -> Vec<SimEvent> {
        self.routing.clear();
        self.rng_bank.reseed();
        self.register_defaults();
        vec![self.ctx.reset()]
    }

    // ── Read access ──────────────────────────────────────────────────────────

    pub fn snapshot(&self) -> SimSnapshot {
        SimSnapshot::capture(&self.ctx, self.routing.active_packets())
    }

    pub fn routing(&self) -> &RoutingSubsystem {
        &self.routing
    }

    /// Look up a registered subsystem by concrete type.
    /// Used by tests and tooling.
    pub fn subsystem<T: 'static>(&self) -> Option<&T> {
        self.subsystems
            .iter()
            .find_map(|(_, sub)| sub.as_any().downcast_ref::<T>())
    }
}

fn one(event: SimEvent) -> Vec<SimEvent> {
    vec![event]
}

fn toggle(name: &str, enabled: bool) -> SimEvent {
    SimEvent::ToggleChanged { toggle: name.to_string(), enabled }
}
