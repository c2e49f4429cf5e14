//! Whole-engine runs driven only through commands and the clocks.
//!
//! Every run uses 64 frames per second so frame deltas are exact
//! binary fractions and spawn timing is predictable.

use netops_core::{
    command::PlayerCommand,
    config::SimConfig,
    economy_subsystem::EconomySubsystem,
    engine::SimEngine,
    error::SimError,
    event::{LogSeverity, SimEvent},
    graph::NodeType,
    scenario::ScenarioId,
    traffic::{TrafficMix, TrafficPatch},
    types::NodeId,
};

const FPS: u32 = 64;

fn running(scenario: ScenarioId) -> SimEngine {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut engine = SimEngine::build_test(42).unwrap();
    engine.start_scenario(scenario);
    engine.apply(PlayerCommand::SetPaused { paused: false });
    engine
}

fn place(engine: &mut SimEngine, node_type: NodeType, x: i32, y: i32) -> NodeId {
    let events = engine.apply(PlayerCommand::PlaceNode { node_type, x, y });
    match &events[0] {
        SimEvent::NodePlaced { node_id, .. } => node_id.clone(),
        other => panic!("placement rejected: {other:?}"),
    }
}

fn connect(engine: &mut SimEngine, a: &NodeId, b: &NodeId) {
    let events = engine.apply(PlayerCommand::Connect { a: a.clone(), b: b.clone() });
    assert!(matches!(events[0], SimEvent::Connected { .. }), "{events:?}");
}

#[test]
fn unbuilt_startup_bleeds_out() {
    let mut engine = running(ScenarioId::Startup);

    engine.run_seconds(10.0, FPS).unwrap();
    assert_eq!(engine.ctx.economy.failures, 20);
    assert_eq!(engine.ctx.economy.cash, 1300.0, "two failed requests a second at $10");
    assert_eq!(engine.ctx.economy.reputation, 65.0, "-4 a second, +0.5 regen");

    let events = engine.run_seconds(30.0, FPS).unwrap();
    assert!(events.iter().any(|e| matches!(e, SimEvent::ScenarioLost { .. })));
    assert!(engine.ctx.scenario.lost);
    assert!(!engine.ctx.scenario.complete);
    assert_eq!(engine.ctx.scenario.elapsed_secs, 28);
    assert!((engine.ctx.clock.sim_time - 28.5).abs() < 1e-9);
    assert_eq!(engine.ctx.economy.failures, 57);
}

#[test]
fn hand_built_chain_serves_a_read() {
    let mut engine = SimEngine::build_test(42).unwrap();
    engine.apply(PlayerCommand::ResetScenario);
    engine.apply(PlayerCommand::SetPaused { paused: false });

    let gw = place(&mut engine, NodeType::Gateway, 0, 6);
    let waf = place(&mut engine, NodeType::Waf, 0, 2);
    let lb = place(&mut engine, NodeType::LoadBalancer, 0, -2);
    let ws = place(&mut engine, NodeType::WebServer, 0, -6);
    let db = place(&mut engine, NodeType::Database, 0, -10);
    assert_eq!(engine.ctx.economy.cash, -300.0);
    for (a, b) in [(&gw, &waf), (&waf, &lb), (&lb, &ws), (&ws, &db)] {
        connect(&mut engine, a, b);
    }

    let reads_only = TrafficMix::new(0.0, 100.0, 0.0, 0.0, 0.0, 0.0);
    engine.apply(PlayerCommand::SetTrafficConfig {
        patch: TrafficPatch::rate_and_mix(1.0, reads_only),
    });
    engine.run_seconds(1.0, FPS).unwrap();
    engine.apply(PlayerCommand::SetTrafficConfig { patch: TrafficPatch::rate(0.0) });
    engine.run_seconds(10.0, FPS).unwrap();

    assert_eq!(engine.routing().active_packets(), 0);
    assert_eq!(engine.ctx.economy.score, 1);
    assert_eq!(engine.ctx.economy.failures, 0);
    assert_eq!(engine.ctx.economy.cash, -335.0, "11 s of $5 upkeep, +5 server, +15 database");
    let economy = engine.subsystem::<EconomySubsystem>().unwrap();
    assert_eq!(economy.upkeep_paid, 55.0);
}

#[test]
fn paused_engine_does_nothing() {
    let mut engine = SimEngine::build_test(42).unwrap();
    engine.start_scenario(ScenarioId::Sandbox);

    let events = engine.run_seconds(5.0, FPS).unwrap();
    assert!(events.is_empty());
    assert_eq!(engine.ctx.clock.current_tick, 0);
    assert_eq!(engine.ctx.clock.sim_time, 0.0);
    assert_eq!(engine.routing().active_packets(), 0);
}

#[test]
fn time_scale_speeds_up_the_second_clock() {
    let mut engine = running(ScenarioId::Sandbox);
    engine.apply(PlayerCommand::ResetScenario);
    engine.apply(PlayerCommand::SetPaused { paused: false });
    engine.apply(PlayerCommand::SetTimeScale { scale: 3.0 });

    let events = engine.run_seconds(2.0, FPS).unwrap();
    let ticks = events
        .iter()
        .filter(|e| matches!(e, SimEvent::TickCompleted { .. }))
        .count();
    assert_eq!(ticks, 6);
    assert_eq!(engine.ctx.clock.current_tick, 6);
}

#[test]
fn zero_time_scale_stops_both_clocks() {
    let mut engine = running(ScenarioId::Sandbox);
    engine.run_seconds(1.0, FPS).unwrap();
    engine.apply(PlayerCommand::SetTimeScale { scale: 0.0 });
    let tick = engine.ctx.clock.current_tick;
    let sim_time = engine.ctx.clock.sim_time;

    engine.run_seconds(3.0, FPS).unwrap();
    assert_eq!(engine.ctx.clock.current_tick, tick);
    assert_eq!(engine.ctx.clock.sim_time, sim_time);
}

#[test]
fn negative_time_scale_is_rejected() {
    let mut engine = running(ScenarioId::Sandbox);
    let events = engine.apply(PlayerCommand::SetTimeScale { scale: -1.0 });
    assert!(matches!(events[0], SimEvent::CommandRejected { .. }));
    assert_eq!(engine.ctx.clock.time_scale, 1.0);
}

#[test]
fn time_scale_above_the_limit_is_rejected() {
    let mut engine = running(ScenarioId::Sandbox);
    let max = engine.ctx.config.max_time_scale;
    assert!(matches!(
        engine.apply(PlayerCommand::SetTimeScale { scale: max })[0],
        SimEvent::TimeScaleChanged { .. }
    ));

    let events = engine.apply(PlayerCommand::SetTimeScale { scale: 1e12 });
    assert!(matches!(events[0], SimEvent::CommandRejected { .. }));
    assert_eq!(engine.ctx.clock.time_scale, max);
}

#[test]
fn non_finite_or_negative_traffic_is_rejected_whole() {
    let mut engine = running(ScenarioId::Sandbox);
    let before = engine.ctx.traffic.clone();
    let mut nan_rates = TrafficMix::default();
    nan_rates.write = f64::NAN;
    let mut negative_mix = TrafficMix::new(50.0, 50.0, 0.0, 0.0, 0.0, 0.0);
    negative_mix.malicious = -10.0;

    for patch in [
        TrafficPatch::rate(f64::INFINITY),
        TrafficPatch::rate(-1.0),
        TrafficPatch { granular_rates: Some(nan_rates), ..TrafficPatch::default() },
        TrafficPatch::rate_and_mix(5.0, negative_mix),
    ] {
        let events = engine.apply(PlayerCommand::SetTrafficConfig { patch });
        match &events[..] {
            [SimEvent::CommandRejected { command, .. }] => assert_eq!(command, "set_traffic_config"),
            other => panic!("expected a rejection, got {other:?}"),
        }
        assert_eq!(engine.ctx.traffic, before);
        assert_eq!(engine.ctx.log.entries().next().unwrap().severity, LogSeverity::Warning);
    }

    engine.run_seconds(1.0, FPS).unwrap();
    assert!(engine.routing().active_packets() > 0, "gateways still spawn");
}

#[test]
fn rejected_commands_log_a_warning() {
    let mut engine = running(ScenarioId::Sandbox);
    let gw = engine.ctx.graph.nodes[0].id.clone();

    let events = engine.apply(PlayerCommand::Connect { a: gw.clone(), b: gw });
    match &events[..] {
        [SimEvent::CommandRejected { command, reason }] => {
            assert_eq!(command, "connect");
            assert!(reason.contains("itself"));
        }
        other => panic!("expected a rejection, got {other:?}"),
    }
    let newest = engine.ctx.log.entries().next().unwrap();
    assert_eq!(newest.severity, LogSeverity::Warning);
    assert!(newest.message.contains("itself"));
}

#[test]
fn reset_clears_the_world_but_keeps_toggles() {
    let mut engine = running(ScenarioId::Sandbox);
    engine.apply(PlayerCommand::SetChaos { enabled: true });
    engine.run_seconds(3.0, FPS).unwrap();
    assert!(engine.routing().active_packets() > 0);

    let events = engine.apply(PlayerCommand::ResetScenario);
    assert_eq!(events, vec![SimEvent::SimulationReset]);
    assert_eq!(engine.routing().active_packets(), 0);
    assert!(engine.ctx.graph.nodes.is_empty());
    assert_eq!(engine.ctx.economy.cash, 1000.0);
    assert_eq!(engine.ctx.scenario.active, None);
    assert!(engine.ctx.clock.paused);
    assert_eq!(engine.ctx.clock.current_tick, 0);
    assert!(engine.ctx.toggles.chaos);
}

#[test]
fn snapshot_reports_the_live_run() {
    let mut engine = running(ScenarioId::Sandbox);
    engine.run_seconds(2.0, FPS).unwrap();

    let snapshot = engine.snapshot();
    assert_eq!(snapshot.tick, 2);
    assert_eq!(snapshot.nodes.len(), 7);
    assert_eq!(snapshot.scenario.active, Some(ScenarioId::Sandbox));
    assert!(snapshot.scenario.goals.is_empty());
    assert_eq!(snapshot.operating_cost, 7.0, "seven tier-1 nodes");
    assert_eq!(snapshot.active_packets, engine.routing().active_packets());

    let json = serde_json::to_value(&snapshot).unwrap();
    assert_eq!(json["nodes"][0]["node_type"], "gateway");
}

#[test]
fn commands_parse_from_host_json() {
    let json = r#"{"cmd":"place_node","node_type":"web-server","x":4,"y":-6}"#;
    let command: PlayerCommand = serde_json::from_str(json).unwrap();
    assert_eq!(command, PlayerCommand::PlaceNode { node_type: NodeType::WebServer, x: 4, y: -6 });

    let json = r#"{"cmd":"unlock_tech","tech":"server-opt-1"}"#;
    let command: PlayerCommand = serde_json::from_str(json).unwrap();
    assert_eq!(command.name(), "unlock_tech");
}

#[test]
fn invalid_balance_is_refused_at_build() {
    let config = SimConfig { log_capacity: 0, ..SimConfig::default() };
    assert!(matches!(
        SimEngine::build(1, config),
        Err(SimError::InvalidConfig { .. })
    ));
}
