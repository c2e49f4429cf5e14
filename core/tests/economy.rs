//! Economy, build and research tests. The economy subsystem is driven
//! directly, one `update` per simulated second.

use netops_core::{
    command::Rejection,
    config::SimConfig,
    context::SimContext,
    economy_subsystem::EconomySubsystem,
    event::SimEvent,
    graph::{NodeStatus, NodeType},
    rng::SubsystemRng,
    subsystem::SimSubsystem,
    tech::TechId,
};

fn setup() -> (SimContext, EconomySubsystem, SubsystemRng) {
    (
        SimContext::new(SimConfig::default()),
        EconomySubsystem::new(),
        SubsystemRng::new(1, 1),
    )
}

#[test]
fn upkeep_scales_with_type_and_skips_gateways() {
    let (mut ctx, mut economy, mut rng) = setup();
    ctx.insert_node(NodeType::Gateway, (0, 6));
    ctx.insert_node(NodeType::WebServer, (0, 2));
    ctx.insert_node(NodeType::Database, (0, -2));

    economy.update(&mut ctx, &mut rng).unwrap();
    assert_eq!(ctx.economy.cash, 997.0);
    assert_eq!(economy.upkeep_paid, 3.0);
}

#[test]
fn upkeep_multiplies_by_tier() {
    let (mut ctx, mut economy, mut rng) = setup();
    let db = ctx.insert_node(NodeType::Database, (0, -2));
    ctx.graph.node_mut(&db).unwrap().tier = 3;

    economy.update(&mut ctx, &mut rng).unwrap();
    assert_eq!(ctx.economy.cash, 994.0);
}

#[test]
fn upkeep_may_push_cash_negative() {
    let (mut ctx, mut economy, mut rng) = setup();
    ctx.insert_node(NodeType::Database, (0, -2));
    ctx.economy.cash = 1.0;

    economy.update(&mut ctx, &mut rng).unwrap();
    assert_eq!(ctx.economy.cash, -1.0);
}

#[test]
fn auto_repair_restores_damaged_nodes() {
    let (mut ctx, mut economy, mut rng) = setup();
    let ws = ctx.insert_node(NodeType::WebServer, (0, 2));
    ctx.damage_node(&ws, 60.0);
    ctx.toggles.auto_repair = true;

    let events = economy.update(&mut ctx, &mut rng).unwrap();
    let node = ctx.graph.node(&ws).unwrap();
    assert_eq!(node.health, 100.0);
    assert_eq!(node.status, NodeStatus::Active);
    assert_eq!(ctx.economy.cash, 939.0, "-1 upkeep, -60 repair");
    assert!(events.iter().any(|e| matches!(
        e,
        SimEvent::NodeRepaired { automatic: true, .. }
    )));
}

#[test]
fn auto_repair_brings_dead_nodes_back() {
    let (mut ctx, mut economy, mut rng) = setup();
    let ws = ctx.insert_node(NodeType::WebServer, (0, 2));
    ctx.kill_node(&ws, "test");
    ctx.toggles.auto_repair = true;

    economy.update(&mut ctx, &mut rng).unwrap();
    assert!(ctx.graph.node(&ws).unwrap().is_active());
}

#[test]
fn auto_repair_waits_for_cash() {
    let (mut ctx, mut economy, mut rng) = setup();
    let ws = ctx.insert_node(NodeType::WebServer, (0, 2));
    ctx.damage_node(&ws, 60.0);
    ctx.toggles.auto_repair = true;
    ctx.economy.cash = 50.0;

    economy.update(&mut ctx, &mut rng).unwrap();
    assert_eq!(ctx.graph.node(&ws).unwrap().health, 40.0);
    assert_eq!(ctx.economy.cash, 49.0);
}

#[test]
fn auto_repair_is_off_by_default() {
    let (mut ctx, mut economy, mut rng) = setup();
    let ws = ctx.insert_node(NodeType::WebServer, (0, 2));
    ctx.damage_node(&ws, 60.0);

    economy.update(&mut ctx, &mut rng).unwrap();
    assert_eq!(ctx.graph.node(&ws).unwrap().health, 40.0);
}

#[test]
fn reputation_regenerates_up_to_the_cap() {
    let (mut ctx, mut economy, mut rng) = setup();
    ctx.economy.reputation = 99.8;
    economy.update(&mut ctx, &mut rng).unwrap();
    assert_eq!(ctx.economy.reputation, 100.0);

    ctx.economy.reputation = 50.0;
    economy.update(&mut ctx, &mut rng).unwrap();
    assert_eq!(ctx.economy.reputation, 50.5);
}

#[test]
fn collapsed_reputation_does_not_regenerate() {
    let (mut ctx, mut economy, mut rng) = setup();
    ctx.economy.reputation = 0.0;
    for _ in 0..10 {
        economy.update(&mut ctx, &mut rng).unwrap();
    }
    assert_eq!(ctx.economy.reputation, 0.0);
}

#[test]
fn reboot_takes_five_seconds() {
    let (mut ctx, mut economy, mut rng) = setup();
    let lb = ctx.insert_node(NodeType::LoadBalancer, (0, -2));
    ctx.reboot_node(&lb).unwrap();

    for _ in 0..4 {
        economy.update(&mut ctx, &mut rng).unwrap();
        assert_eq!(ctx.graph.node(&lb).unwrap().status, NodeStatus::Rebooting);
    }
    economy.update(&mut ctx, &mut rng).unwrap();
    assert_eq!(ctx.graph.node(&lb).unwrap().status, NodeStatus::Active);
    assert_eq!(ctx.log.count_containing("is back online"), 1);
}

#[test]
fn rebooting_a_down_node_is_rejected() {
    let (mut ctx, _, _) = setup();
    let lb = ctx.insert_node(NodeType::LoadBalancer, (0, -2));
    ctx.kill_node(&lb, "test");
    assert_eq!(ctx.reboot_node(&lb), Err(Rejection::NodeDown { id: lb.clone() }));
}

#[test]
fn dead_node_cannot_be_set_active() {
    let (mut ctx, _, _) = setup();
    let ws = ctx.insert_node(NodeType::WebServer, (0, 2));
    ctx.damage_node(&ws, 500.0);
    assert_eq!(ctx.graph.node(&ws).unwrap().status, NodeStatus::Down);
    assert!(ctx.set_node_status(&ws, NodeStatus::Active).is_err());
}

// ── Build and maintenance ─────────────────────────────────────────

#[test]
fn placement_respects_the_cash_floor() {
    let (mut ctx, _, _) = setup();
    ctx.economy.cash = -850.0;

    let rejected = ctx.place_node(NodeType::Gateway, (0, 6));
    assert!(matches!(rejected, Err(Rejection::InsufficientFunds { .. })));
    assert!(ctx.graph.nodes.is_empty());

    ctx.place_node(NodeType::WebServer, (0, 2)).unwrap();
    assert_eq!(ctx.economy.cash, -950.0);
    assert_eq!(ctx.log.count_containing("Placed"), 1);
}

#[test]
fn placement_rejects_occupied_cells() {
    let (mut ctx, _, _) = setup();
    ctx.place_node(NodeType::WebServer, (2, 2)).unwrap();
    let again = ctx.place_node(NodeType::Database, (2, 2));
    assert_eq!(again, Err(Rejection::CellOccupied { x: 2, y: 2 }));
    assert_eq!(ctx.economy.cash, 900.0, "rejected placement costs nothing");
}

#[test]
fn ids_count_up_across_types() {
    let (mut ctx, _, _) = setup();
    let gw = ctx.place_node(NodeType::Gateway, (0, 6)).unwrap();
    let ws = ctx.place_node(NodeType::WebServer, (0, 2)).unwrap();
    assert!(matches!(gw, SimEvent::NodePlaced { ref node_id, .. } if node_id == "gw-1"));
    assert!(matches!(ws, SimEvent::NodePlaced { ref node_id, .. } if node_id == "ws-2"));
}

#[test]
fn connections_need_two_distinct_known_nodes() {
    let (mut ctx, _, _) = setup();
    let a = ctx.insert_node(NodeType::LoadBalancer, (0, -2));
    let b = ctx.insert_node(NodeType::WebServer, (0, -6));

    assert_eq!(ctx.connect(&a, &a), Err(Rejection::SelfConnection));
    assert_eq!(
        ctx.connect(&a, "ws-99"),
        Err(Rejection::UnknownNode { id: "ws-99".to_string() })
    );
    ctx.connect(&a, &b).unwrap();
    assert!(matches!(ctx.connect(&b, &a), Err(Rejection::DuplicateConnection { .. })));

    ctx.disconnect(&b, &a).unwrap();
    assert!(matches!(ctx.disconnect(&a, &b), Err(Rejection::NoSuchConnection { .. })));
}

#[test]
fn removing_a_node_drops_its_links_without_refund() {
    let (mut ctx, _, _) = setup();
    ctx.place_node(NodeType::LoadBalancer, (0, -2)).unwrap();
    let lb = ctx.graph.nodes[0].id.clone();
    let ws = ctx.insert_node(NodeType::WebServer, (0, -6));
    ctx.connect(&lb, &ws).unwrap();

    ctx.remove_node(&ws).unwrap();
    assert!(ctx.graph.connections.is_empty());
    assert_eq!(ctx.economy.cash, 800.0);
    assert!(ctx.remove_node(&ws).is_err());
}

#[test]
fn web_server_upgrade_needs_research() {
    let (mut ctx, _, _) = setup();
    let ws = ctx.insert_node(NodeType::WebServer, (0, 2));

    assert_eq!(
        ctx.upgrade_node(&ws),
        Err(Rejection::TechRequired { tech: "Server Optimization I" })
    );

    ctx.economy.unlocked_techs.push(TechId::ServerOpt1);
    ctx.upgrade_node(&ws).unwrap();
    assert_eq!(ctx.graph.node(&ws).unwrap().tier, 2);
    assert_eq!(ctx.economy.cash, 600.0);
    assert_eq!(ctx.capacity_of(&ws), Some(25));
}

#[test]
fn database_upgrade_needs_sharding() {
    let (mut ctx, _, _) = setup();
    let db = ctx.insert_node(NodeType::Database, (0, -2));
    assert_eq!(
        ctx.upgrade_node(&db),
        Err(Rejection::TechRequired { tech: "DB Sharding I" })
    );
}

#[test]
fn upgrade_restores_health_and_stops_at_max_tier() {
    let (mut ctx, _, _) = setup();
    let lb = ctx.insert_node(NodeType::LoadBalancer, (0, -2));
    ctx.damage_node(&lb, 30.0);

    ctx.upgrade_node(&lb).unwrap();
    let node = ctx.graph.node(&lb).unwrap();
    assert_eq!((node.tier, node.health), (2, 100.0));
    assert_eq!(ctx.economy.cash, 200.0);

    ctx.graph.node_mut(&lb).unwrap().tier = 5;
    assert_eq!(ctx.upgrade_node(&lb), Err(Rejection::MaxTier { id: lb.clone() }));
}

#[test]
fn upgrade_needs_cash_on_hand() {
    let (mut ctx, _, _) = setup();
    let cache = ctx.insert_node(NodeType::Cache, (0, 0));
    ctx.economy.cash = 499.0;
    assert!(matches!(ctx.upgrade_node(&cache), Err(Rejection::InsufficientFunds { .. })));
    assert_eq!(ctx.graph.node(&cache).unwrap().tier, 1);
}

#[test]
fn manual_repair_revives_a_dead_node() {
    let (mut ctx, _, _) = setup();
    let db = ctx.insert_node(NodeType::Database, (0, -2));
    ctx.kill_node(&db, "test");

    ctx.repair_node(&db).unwrap();
    let node = ctx.graph.node(&db).unwrap();
    assert_eq!(node.status, NodeStatus::Active);
    assert_eq!(node.health, 100.0);
    assert_eq!(ctx.economy.cash, 950.0);

    ctx.economy.cash = 10.0;
    assert!(ctx.repair_node(&db).is_err());
}

// ── Research ──────────────────────────────────────────────────────

#[test]
fn tech_unlocks_follow_prerequisites_and_cost() {
    let (mut ctx, _, _) = setup();

    assert!(matches!(
        ctx.unlock_tech(TechId::AutoScaling),
        Err(Rejection::MissingPrerequisites { .. })
    ));

    ctx.economy.research_points = 50.0;
    assert!(matches!(
        ctx.unlock_tech(TechId::ServerOpt1),
        Err(Rejection::InsufficientResearch { .. })
    ));

    ctx.economy.research_points = 700.0;
    ctx.unlock_tech(TechId::ServerOpt1).unwrap();
    ctx.unlock_tech(TechId::AutoScaling).unwrap();
    assert!((ctx.economy.research_points - 100.0).abs() < 1e-9);
    assert_eq!(ctx.economy.unlocked_techs, vec![TechId::ServerOpt1, TechId::AutoScaling]);
    assert_eq!(ctx.log.count_containing("Unlocked Tech: Auto-Scaling"), 1);

    assert!(matches!(
        ctx.unlock_tech(TechId::ServerOpt1),
        Err(Rejection::AlreadyUnlocked { .. })
    ));
}

#[test]
fn multi_az_needs_both_foundations() {
    let (mut ctx, _, _) = setup();
    ctx.economy.research_points = 5000.0;
    ctx.unlock_tech(TechId::ServerOpt1).unwrap();
    assert!(ctx.unlock_tech(TechId::MultiAz).is_err());
    ctx.unlock_tech(TechId::DbSharding1).unwrap();
    ctx.unlock_tech(TechId::MultiAz).unwrap();
    assert!(ctx.has_tech(TechId::MultiAz));
}

// ── Operating cost ────────────────────────────────────────────────

#[test]
fn operating_cost_sums_tiers_by_category() {
    let (mut ctx, _, _) = setup();
    ctx.insert_node(NodeType::Gateway, (0, 6));
    let ws = ctx.insert_node(NodeType::WebServer, (0, 2));
    ctx.insert_node(NodeType::Database, (0, -2));
    ctx.insert_node(NodeType::ObjectStore, (2, -2));
    ctx.graph.node_mut(&ws).unwrap().tier = 2;

    let costs = ctx.cost_breakdown();
    assert_eq!(costs.security, 1.0);
    assert_eq!(costs.compute, 2.0);
    assert_eq!(costs.database, 1.0);
    assert_eq!(costs.storage, 1.0);
    assert_eq!(costs.total, 5.0);
    assert_eq!(ctx.operating_cost(), 5.0);
}
