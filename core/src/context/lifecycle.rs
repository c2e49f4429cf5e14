//! Scenario start and reset. Both replace every piece of run state at
//! once; the engine clears its packet pool in the same call.

use super::{EconomyState, SimContext};
use crate::{
    clock::SimClock,
    event::{LogSeverity, SimEvent},
    scenario::ScenarioDef,
    traffic::TrafficConfig,
};

impl SimContext {
    /// Replace the run with a scenario's starting state. The clock is
    /// left paused so the player can read the briefing first.
    pub fn load_scenario(&mut self, def: &ScenarioDef) -> SimEvent {
        self.clear_run_state();
        self.economy.cash = def.initial_cash;
        self.traffic = def.traffic.clone();

        let ids: Vec<_> = def
            .nodes
            .iter()
            .map(|(node_type, pos)| self.insert_node(*node_type, *pos))
            .collect();
        for (a, b) in &def.connections {
            if let (Some(a), Some(b)) = (ids.get(*a), ids.get(*b)) {
                self.graph.add_connection(a, b);
            }
        }

        self.scenario.active = Some(def.id);
        self.scenario.goals = def.goals.clone();
        self.log(LogSeverity::Info, format!("Started Scenario: {}", def.name), None);
        self.log(LogSeverity::Info, def.description, None);
        SimEvent::ScenarioStarted { scenario: def.id }
    }

    /// Leave any scenario and return to an empty, paused world.
    pub fn reset(&mut self) -> SimEvent {
        self.clear_run_state();
        SimEvent::SimulationReset
    }

    fn clear_run_state(&mut self) {
        self.graph.clear();
        self.economy = EconomyState::default();
        self.scenario.clear();
        self.traffic = TrafficConfig::default();
        self.clock = SimClock::new();
        self.log.clear();
        self.load_window.clear();
        self.outbox.clear();
    }
}
