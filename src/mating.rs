//! Mating-investment model over an unstructured population.
//!
//! Fertile females draw a random partner from the whole population. A male
//! invests when his paternity certainty, which depends only on whether the
//! female conceals ovulation, exceeds a threshold. Overt females pay a
//! rivalry cost on every successful mating.

use crate::config::{BehaviorConfig, MatingConfig};
use crate::metrics::{MatingCollector, MatingSnapshot};
use crate::model::Model;
use crate::population::{AgentId, Population};
use crate::rng::RandomSource;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Female {
    cycle_day: u32,
    is_ovulation_concealed: bool,
    offspring_success_score: f64,
    partner_id: Option<AgentId>,
}

impl Female {
    pub fn new(cycle_day: u32, is_ovulation_concealed: bool) -> Self {
        Self {
            cycle_day,
            is_ovulation_concealed,
            offspring_success_score: 0.0,
            partner_id: None,
        }
    }

    pub fn cycle_day(&self) -> u32 {
        self.cycle_day
    }

    pub fn is_ovulation_concealed(&self) -> bool {
        self.is_ovulation_concealed
    }

    pub fn offspring_success_score(&self) -> f64 {
        self.offspring_success_score
    }

    /// Most recent partner, if any.
    pub fn partner_id(&self) -> Option<AgentId> {
        self.partner_id
    }

    /// Move to the next day of the cycle, wrapping from `cycle_length` to 1.
    pub fn advance_cycle(&mut self, cycle_length: u32) -> u32 {
        self.cycle_day = (self.cycle_day % cycle_length) + 1;
        self.cycle_day
    }

    /// Record a successful mating.
    pub fn add_success(&mut self, success: f64, partner_id: AgentId) {
        self.offspring_success_score += success;
        self.partner_id = Some(partner_id);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Male {
    is_investing: bool,
    investment_resources: f64,
}

impl Male {
    pub fn new() -> Self {
        Self {
            is_investing: false,
            investment_resources: 0.0,
        }
    }

    pub fn is_investing(&self) -> bool {
        self.is_investing
    }

    pub fn investment_resources(&self) -> f64 {
        self.investment_resources
    }

    pub fn add_resources(&mut self, amount: f64) {
        self.investment_resources += amount;
    }

    /// Decide whether to invest in a female with the given concealment status.
    ///
    /// Deterministic: compares a fixed certainty against the threshold. A positive
    /// decision adds one unit of resources and starts the per-tick investment.
    pub fn decide_to_invest(&mut self, concealed: bool, behavior: &BehaviorConfig) -> bool {
        let certainty = if concealed {
            behavior.paternity_certainty_concealed
        } else {
            behavior.paternity_certainty_overt
        };
        if certainty > behavior.investment_threshold {
            self.investment_resources += 1.0;
            self.is_investing = true;
            return true;
        }
        false
    }
}

impl Default for Male {
    fn default() -> Self {
        Self::new()
    }
}

/// Agent role, fixed at creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Sex {
    Female(Female),
    Male(Male),
}

impl Sex {
    pub fn as_female(&self) -> Option<&Female> {
        match self {
            Sex::Female(female) => Some(female),
            Sex::Male(_) => None,
        }
    }

    pub fn as_male(&self) -> Option<&Male> {
        match self {
            Sex::Male(male) => Some(male),
            Sex::Female(_) => None,
        }
    }

    fn as_female_mut(&mut self) -> Option<&mut Female> {
        match self {
            Sex::Female(female) => Some(female),
            Sex::Male(_) => None,
        }
    }

    fn as_male_mut(&mut self) -> Option<&mut Male> {
        match self {
            Sex::Male(male) => Some(male),
            Sex::Female(_) => None,
        }
    }

    pub fn label(&self, id: AgentId) -> String {
        match self {
            Sex::Female(_) => format!("F{}", id.index()),
            Sex::Male(_) => format!("M{}", id.index()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatingModel {
    cfg: MatingConfig,
    population: Population<Sex>,
    collector: MatingCollector,
}

impl MatingModel {
    pub fn population(&self) -> &Population<Sex> {
        &self.population
    }

    pub fn female_ids(&self) -> &[AgentId] {
        self.collector.female_ids()
    }

    pub fn male_ids(&self) -> &[AgentId] {
        self.collector.male_ids()
    }

    fn step_female(&mut self, id: AgentId, rng: &mut RandomSource) -> Result<()> {
        let bio = &self.cfg.biology;
        let Some(female) = self.population[id].as_female_mut() else {
            return Ok(());
        };
        if female.advance_cycle(bio.cycle_length) != bio.fertile_day {
            return Ok(());
        }

        let concealed = female.is_ovulation_concealed();
        let penalty = if concealed {
            0.0
        } else {
            self.cfg.social.rivalry_cost_factor
        };

        let mate_id = self
            .population
            .random_id(rng)
            .context("failed to choose a potential mate")?;
        let Some(male) = self.population[mate_id].as_male_mut() else {
            return Ok(());
        };
        if !male.decide_to_invest(concealed, &self.cfg.behavior) {
            return Ok(());
        }

        let success = self.cfg.biology.base_offspring_success * (1.0 - penalty);
        if let Some(female) = self.population[id].as_female_mut() {
            female.add_success(success, mate_id);
        }
        Ok(())
    }

    fn step_male(&mut self, id: AgentId) {
        let increment = self.cfg.behavior.investment_increment;
        if let Some(male) = self.population[id].as_male_mut() {
            if male.is_investing() {
                male.add_resources(increment);
            }
        }
    }
}

impl Model for MatingModel {
    type Config = MatingConfig;
    type Snapshot = MatingSnapshot;

    const NAME: &'static str = "mating";

    fn new(cfg: MatingConfig, rng: &mut RandomSource) -> Result<Self> {
        let n_agents = cfg.simulation.n_agents;
        let n_concealed = n_agents as f64 * cfg.social.concealed_fraction;
        let cycle_length = cfg.biology.cycle_length as usize;

        let mut agt_vec = Vec::with_capacity(2 * n_agents);
        for i_agt in 0..n_agents {
            let cycle_day = rng.range_int(1, cycle_length + 1) as u32;
            let concealed = (i_agt as f64) < n_concealed;
            agt_vec.push(Sex::Female(Female::new(cycle_day, concealed)));
        }
        agt_vec.resize_with(2 * n_agents, || Sex::Male(Male::new()));

        let population = Population::new(agt_vec);
        let collector = MatingCollector::new(n_agents, &population);

        Ok(Self {
            cfg,
            population,
            collector,
        })
    }

    fn config(&self) -> &MatingConfig {
        &self.cfg
    }

    fn n_agents(&self) -> usize {
        self.population.len()
    }

    fn step_agent(&mut self, id: AgentId, rng: &mut RandomSource) -> Result<()> {
        if self.population[id].as_female().is_some() {
            self.step_female(id, rng)
                .with_context(|| format!("failed to step {}", self.population[id].label(id)))?;
        } else {
            self.step_male(id);
        }
        Ok(())
    }

    fn collect(&self, step: usize) -> MatingSnapshot {
        self.collector.collect(step, &self.population)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BiologyConfig, SimulationConfig, SocialConfig};

    fn behavior(concealed: f64, overt: f64) -> BehaviorConfig {
        BehaviorConfig {
            paternity_certainty_concealed: concealed,
            paternity_certainty_overt: overt,
            investment_threshold: 0.5,
            investment_increment: 0.25,
        }
    }

    fn config(n_agents: usize, cycle_length: u32, fertile_day: u32) -> MatingConfig {
        MatingConfig {
            simulation: SimulationConfig {
                n_agents,
                n_steps: 10,
                seed: Some(9),
            },
            biology: BiologyConfig {
                cycle_length,
                fertile_day,
                base_offspring_success: 2.0,
            },
            social: SocialConfig {
                rivalry_cost_factor: 0.25,
                concealed_fraction: 0.5,
            },
            behavior: behavior(0.6, 0.9),
        }
    }

    #[test]
    fn population_layout() {
        let mut rng = RandomSource::new(1);
        let model = MatingModel::new(config(4, 28, 14), &mut rng).unwrap();
        assert_eq!(model.n_agents(), 8);
        assert_eq!(model.female_ids(), &[AgentId(0), AgentId(1), AgentId(2), AgentId(3)]);
        assert_eq!(model.male_ids(), &[AgentId(4), AgentId(5), AgentId(6), AgentId(7)]);

        let concealed: Vec<_> = model
            .female_ids()
            .iter()
            .filter_map(|&id| model.population()[id].as_female())
            .map(Female::is_ovulation_concealed)
            .collect();
        assert_eq!(concealed, vec![true, true, false, false]);

        for &id in model.female_ids() {
            let day = model.population()[id].as_female().unwrap().cycle_day();
            assert!((1..=28).contains(&day));
        }
        assert_eq!(model.population()[AgentId(5)].label(AgentId(5)), "M5");
    }

    #[test]
    fn cycle_wraps() {
        let mut female = Female::new(27, false);
        assert_eq!(female.advance_cycle(28), 28);
        assert_eq!(female.advance_cycle(28), 1);
        assert_eq!(female.advance_cycle(1), 1);
    }

    #[test]
    fn male_decision_depends_only_on_concealment() {
        let beh = behavior(0.4, 0.9);
        let mut male = Male::new();
        assert!(!male.decide_to_invest(true, &beh));
        assert!(!male.is_investing());
        assert_eq!(male.investment_resources(), 0.0);

        assert!(male.decide_to_invest(false, &beh));
        assert!(male.is_investing());
        assert_eq!(male.investment_resources(), 1.0);
    }

    #[test]
    fn investing_male_accrues_every_turn() {
        let mut rng = RandomSource::new(1);
        let mut model = MatingModel::new(config(1, 28, 14), &mut rng).unwrap();
        let male_id = AgentId(1);

        model.step_agent(male_id, &mut rng).unwrap();
        assert_eq!(model.collect(1).avg_male_investment, 0.0);

        if let Some(male) = model.population[male_id].as_male_mut() {
            male.decide_to_invest(false, &behavior(0.6, 0.9));
        }
        model.step_agent(male_id, &mut rng).unwrap();
        model.step_agent(male_id, &mut rng).unwrap();
        assert_eq!(model.collect(2).avg_male_investment, 1.5);
    }

    #[test]
    fn fertile_female_mating_records_partner_and_penalty() {
        // With one female and one male the draw hits the male half of the time.
        let mut rng = RandomSource::new(12);
        let mut cfg = config(1, 1, 1);
        cfg.social.concealed_fraction = 0.0;
        let mut model = MatingModel::new(cfg, &mut rng).unwrap();
        let female_id = AgentId(0);
        let male_id = AgentId(1);

        for _ in 0..64 {
            model.step_agent(female_id, &mut rng).unwrap();
        }

        let female = model.population()[female_id].as_female().unwrap();
        let male = model.population()[male_id].as_male().unwrap();
        assert!(!female.is_ovulation_concealed());
        assert_eq!(female.partner_id(), Some(male_id));
        assert!(male.is_investing());

        let n_matings = male.investment_resources();
        assert!(n_matings >= 1.0);
        assert_eq!(female.offspring_success_score(), n_matings * 1.5);
    }

    #[test]
    fn infertile_day_skips_mating() {
        let mut rng = RandomSource::new(2);
        let mut model = MatingModel::new(config(1, 3, 2), &mut rng).unwrap();
        if let Some(female) = model.population[AgentId(0)].as_female_mut() {
            female.cycle_day = 2;
        }
        model.step_agent(AgentId(0), &mut rng).unwrap();
        let female = model.population()[AgentId(0)].as_female().unwrap();
        assert_eq!(female.cycle_day(), 3);
        assert_eq!(female.partner_id(), None);
        assert_eq!(female.offspring_success_score(), 0.0);
    }
}
