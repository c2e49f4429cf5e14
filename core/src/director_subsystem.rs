//! Scenario director subsystem: scripted phases, scripted kills, goals.
//!
//! This subsystem:
//!   1. Advances scenario time by one second while a scenario runs
//!   2. Looks up the script phase for the elapsed time and applies it
//!      once, on entry (traffic patch + log message)
//!   3. Fires scripted node kills on the phase's cadence
//!   4. Completes the scenario the first tick every goal is met
//!
//! `script_phase` is a pure function of (scenario, elapsed seconds), so
//! the whole script can be tested without an engine.
//!
//! Execution: every second tick, last.
//! Depends on: economy, auto-scaling (goals read their results).

use crate::{
    context::SimContext,
    error::SimResult,
    event::{LogSeverity, SimEvent},
    graph::NodeType,
    rng::SubsystemRng,
    scenario::{GoalKind, ScenarioId},
    subsystem::SimSubsystem,
    traffic::{TrafficMix, TrafficPatch},
    types::Tick,
};
use serde::{Deserialize, Serialize};
use std::any::Any;

// ── Script model ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KillCadence {
    None,
    /// One kill for the whole run.
    Once,
    /// A kill whenever this many seconds have passed since the last.
    Every(Tick),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScriptPhase {
    pub name: &'static str,
    pub traffic: Option<TrafficPatch>,
    pub message: Option<(LogSeverity, &'static str)>,
    pub kills: KillCadence,
}

impl ScriptPhase {
    fn quiet(name: &'static str) -> Self {
        Self { name, traffic: None, message: None, kills: KillCadence::None }
    }

    fn traffic(mut self, patch: TrafficPatch) -> Self {
        self.traffic = Some(patch);
        self
    }

    fn say(mut self, severity: LogSeverity, message: &'static str) -> Self {
        self.message = Some((severity, message));
        self
    }

    fn kills(mut self, cadence: KillCadence) -> Self {
        self.kills = cadence;
        self
    }
}

fn black_friday(t: Tick) -> ScriptPhase {
    match t {
        0..=29 => ScriptPhase::quiet("calm").traffic(TrafficPatch::rate(5.0)),
        30..=59 => ScriptPhase::quiet("ramping")
            .traffic(TrafficPatch::rate(20.0))
            .say(LogSeverity::Warning, "Traffic is ramping up! Prepare for impact!"),
        60..=119 => ScriptPhase::quiet("spike")
            .traffic(TrafficPatch::rate(100.0))
            .say(LogSeverity::Error, "BLACK FRIDAY SALE STARTED! TRAFFIC SURGE DETECTED!"),
        _ => ScriptPhase::quiet("cooldown")
            .traffic(TrafficPatch::rate(50.0))
            .say(LogSeverity::Info, "Traffic stabilizing. Sale frenzy ending."),
    }
}

fn ddos(t: Tick) -> ScriptPhase {
    match t {
        0..=19 => ScriptPhase::quiet("clean").traffic(TrafficPatch::rate_and_mix(
            10.0,
            TrafficMix::new(40.0, 40.0, 10.0, 10.0, 0.0, 0.0),
        )),
        20..=44 => ScriptPhase::quiet("probe")
            .traffic(TrafficPatch::rate_and_mix(15.0, TrafficMix::new(40.0, 40.0, 0.0, 0.0, 0.0, 20.0)))
            .say(LogSeverity::Warning, "Suspicious traffic patterns detected. Potential probe."),
        45..=89 => ScriptPhase::quiet("attack-1")
            .traffic(TrafficPatch::rate_and_mix(30.0, TrafficMix::new(20.0, 20.0, 0.0, 0.0, 0.0, 60.0)))
            .say(LogSeverity::Error, "DDoS Attack Detected! Deploy WAFs immediately!"),
        _ => ScriptPhase::quiet("flood")
            .traffic(TrafficPatch::rate_and_mix(80.0, TrafficMix::new(10.0, 10.0, 0.0, 0.0, 0.0, 80.0)))
            .say(LogSeverity::Error, "MASSIVE ATTACK SIGNATURE INCOMING!"),
    }
}

fn high_throughput(t: Tick) -> ScriptPhase {
    match t {
        0..=29 => ScriptPhase::quiet("warmup").traffic(TrafficPatch::rate_and_mix(
            10.0,
            TrafficMix::new(50.0, 40.0, 10.0, 0.0, 0.0, 0.0),
        )),
        30..=59 => ScriptPhase::quiet("stress")
            .traffic(TrafficPatch::rate(30.0))
            .say(LogSeverity::Warning, "Traffic rising. Database load increasing."),
        60..=89 => ScriptPhase::quiet("high")
            .traffic(TrafficPatch::rate(60.0))
            .say(LogSeverity::Error, "Heavy traffic detected! Caching is required to survive."),
        _ => ScriptPhase::quiet("peak")
            .traffic(TrafficPatch::rate(80.0))
            .say(LogSeverity::Error, "Peak traffic reached!"),
    }
}

fn chaos_monkey(t: Tick) -> Option<ScriptPhase> {
    let phase = match t {
        0..=19 => return None,
        20..=44 => ScriptPhase::quiet("active")
            .say(LogSeverity::Warning, "A wild Chaos Monkey appeared!")
            .kills(KillCadence::Once),
        45..=89 => ScriptPhase::quiet("rampage")
            .say(LogSeverity::Error, "The Chaos Monkey is destroying infrastructure!")
            .kills(KillCadence::Every(10)),
        _ => ScriptPhase::quiet("chaos")
            .say(LogSeverity::Error, "MAXIMUM CHAOS! SURVIVE IF YOU CAN!")
            .kills(KillCadence::Every(5)),
    };
    Some(phase)
}

fn legacy(t: Tick) -> Option<ScriptPhase> {
    let phase = match t {
        0 => return None,
        1..=59 => ScriptPhase::quiet("online").say(
            LogSeverity::Info,
            "Legacy System Online. Modernize it without dropping requests.",
        ),
        60..=149 => ScriptPhase::quiet("pressure").say(
            LogSeverity::Warning,
            "Management is asking why the infrastructure bill is so high.",
        ),
        _ => ScriptPhase::quiet("audit")
            .say(LogSeverity::Info, "Final audit underway. Keep operating costs down."),
    };
    Some(phase)
}

/// The script phase for a scenario at `elapsed` seconds, if any.
pub fn script_phase(id: ScenarioId, elapsed: Tick) -> Option<ScriptPhase> {
    match id {
        ScenarioId::BlackFriday    => Some(black_friday(elapsed)),
        ScenarioId::Ddos           => Some(ddos(elapsed)),
        ScenarioId::HighThroughput => Some(high_throughput(elapsed)),
        ScenarioId::Chaos          => chaos_monkey(elapsed),
        ScenarioId::Legacy         => legacy(elapsed),
        ScenarioId::Sandbox | ScenarioId::Startup => None,
    }
}

fn kill_due(cadence: KillCadence, elapsed: Tick, last_kill: Option<Tick>) -> bool {
    match cadence {
        KillCadence::None     => false,
        KillCadence::Once     => last_kill.is_none(),
        KillCadence::Every(n) => elapsed.saturating_sub(last_kill.unwrap_or(0)) >= n,
    }
}

// ── Goals ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GoalProgress {
    pub kind: GoalKind,
    pub label: String,
    pub target: f64,
    pub current: f64,
    pub met: bool,
}

/// The live figure a goal of `kind` is measured against.
pub fn goal_value(ctx: &SimContext, kind: GoalKind) -> f64 {
    match kind {
        GoalKind::Cash           => ctx.economy.cash,
        GoalKind::Reputation     => ctx.economy.reputation,
        GoalKind::Uptime         => ctx.scenario.elapsed_secs as f64,
        GoalKind::RequestsServed => ctx.economy.requests_served as f64,
        GoalKind::OperatingCost  => ctx.operating_cost(),
    }
}

pub fn goal_progress(ctx: &SimContext) -> Vec<GoalProgress> {
    ctx.scenario
        .goals
        .iter()
        .map(|goal| {
            let current = goal_value(ctx, goal.kind);
            GoalProgress {
                kind: goal.kind,
                label: goal.label.clone(),
                target: goal.target,
                current,
                met: goal.is_met_by(current),
            }
        })
        .collect()
}

// ── Subsystem ────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct DirectorSubsystem;

impl DirectorSubsystem {
    pub fn new() -> Self {
        Self
    }

    /// Apply the current script phase. Entering a phase applies its
    /// traffic patch and message exactly once; kills follow the
    /// phase's cadence.
    pub fn apply_script(ctx: &mut SimContext, rng: &mut SubsystemRng) -> Vec<SimEvent> {
        let Some(scenario) = ctx.scenario.active else {
            return vec![];
        };
        let elapsed = ctx.scenario.elapsed_secs;
        let Some(phase) = script_phase(scenario, elapsed) else {
            return vec![];
        };

        let mut events = Vec::new();
        if ctx.scenario.phase.as_deref() != Some(phase.name) {
            ctx.scenario.phase = Some(phase.name.to_string());
            if let Some(patch) = &phase.traffic {
                ctx.traffic.apply(patch);
                events.push(SimEvent::TrafficConfigChanged);
            }
            if let Some((severity, message)) = phase.message {
                ctx.log(severity, message, None);
            }
            log::info!("tick={} director: {scenario} entered phase '{}'", ctx.clock.current_tick, phase.name);
            events.push(SimEvent::ScenarioPhaseEntered {
                tick: ctx.clock.current_tick,
                scenario,
                phase: phase.name.to_string(),
            });
        }

        if kill_due(phase.kills, elapsed, ctx.scenario.last_kill_secs) {
            ctx.scenario.last_kill_secs = Some(elapsed);
            Self::kill_random_node(ctx, rng);
        }
        events
    }

    /// Take down one random active node that is not a gateway.
    fn kill_random_node(ctx: &mut SimContext, rng: &mut SubsystemRng) {
        let eligible: Vec<_> = ctx
            .graph
            .nodes
            .iter()
            .filter(|n| n.is_active() && n.node_type != NodeType::Gateway)
            .map(|n| n.id.clone())
            .collect();
        if let Some(victim) = rng.pick(&eligible) {
            ctx.kill_node(victim, "chaos_monkey");
            ctx.log(
                LogSeverity::Error,
                format!("Chaos Monkey destroyed {victim}!"),
                Some(victim),
            );
        }
    }

    /// Complete the scenario the first time every goal holds at once.
    pub fn evaluate_goals(ctx: &mut SimContext) -> Option<SimEvent> {
        let scenario = ctx.scenario.active?;
        if ctx.scenario.complete || ctx.scenario.lost || ctx.scenario.goals.is_empty() {
            return None;
        }
        let progress = goal_progress(ctx);
        if !progress.iter().all(|g| g.met) {
            return None;
        }

        ctx.scenario.complete = true;
        ctx.clock.pause();
        for goal in &progress {
            ctx.log(LogSeverity::Info, format!("GOAL MET: {}!", goal.label), None);
        }
        log::info!("tick={} director: {scenario} complete", ctx.clock.current_tick);
        Some(SimEvent::ScenarioCompleted {
            tick: ctx.clock.current_tick,
            scenario,
        })
    }
}

impl SimSubsystem for DirectorSubsystem {
    fn name(&self) -> &'static str {
        "director"
    }

    fn update(&mut self, ctx: &mut SimContext, rng: &mut SubsystemRng) -> SimResult<Vec<SimEvent>> {
        if ctx.scenario.active.is_none() || ctx.scenario.lost {
            return Ok(vec![]);
        }
        ctx.check_loss();
        if ctx.scenario.lost {
            return Ok(vec![]);
        }
        ctx.scenario.elapsed_secs += 1;

        let mut events = Self::apply_script(ctx, rng);
        events.extend(Self::evaluate_goals(ctx));
        Ok(events)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
