use super::SimContext;
use crate::{
    command::Rejection,
    event::{LogSeverity, SimEvent},
    tech::TechId,
};

impl SimContext {
    /// Spend research points on a tech whose prerequisites are all met.
    pub fn unlock_tech(&mut self, tech: TechId) -> Result<SimEvent, Rejection> {
        let node = tech.node();
        if self.has_tech(tech) {
            return Err(Rejection::AlreadyUnlocked { tech: node.label });
        }
        let missing: Vec<&str> = node
            .requirements
            .iter()
            .filter(|req| !self.has_tech(**req))
            .map(|req| req.label())
            .collect();
        if !missing.is_empty() {
            return Err(Rejection::MissingPrerequisites {
                tech: node.label,
                missing: missing.join(", "),
            });
        }
        if self.economy.research_points < node.cost {
            return Err(Rejection::InsufficientResearch {
                tech: node.label,
                cost: node.cost,
                have: self.economy.research_points,
            });
        }

        self.economy.research_points -= node.cost;
        self.economy.unlocked_techs.push(tech);
        self.log(LogSeverity::Info, format!("Unlocked Tech: {}", node.label), None);
        Ok(SimEvent::TechUnlocked { tech })
    }
}
