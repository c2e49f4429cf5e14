//! netops-core: deterministic simulation engine for a cloud
//! infrastructure operations game.
//!
//! Players build a graph of gateways, firewalls, balancers, servers,
//! caches and stores; synthetic traffic flows through it hop by hop
//! and pays (or costs) money and reputation on the way.

pub mod autoscaling_subsystem;
pub mod chaos_subsystem;
pub mod clock;
pub mod command;
pub mod config;
pub mod context;
pub mod director_subsystem;
pub mod economy_subsystem;
pub mod engine;
pub mod error;
pub mod event;
pub mod graph;
pub mod load_subsystem;
pub mod rng;
pub mod routing_subsystem;
pub mod scenario;
pub mod snapshot;
pub mod subsystem;
pub mod tech;
pub mod traffic;
pub mod types;
