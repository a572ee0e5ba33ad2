//! Susceptible/Infected/Recovered spread on a toroidal grid.

use crate::config::EpidemicConfig;
use crate::error::EngineError;
use crate::grid::{MultiGrid, Pos};
use crate::metrics::EpidemicSnapshot;
use crate::model::Model;
use crate::population::{AgentId, Population};
use crate::rng::RandomSource;
use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

/// Health state. `Recovered` is absorbing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Health {
    Susceptible,
    Infected,
    Recovered,
}

/// A person walking the grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Human {
    health: Health,
    pos: Pos,
}

impl Human {
    pub fn new(health: Health, pos: Pos) -> Self {
        Self { health, pos }
    }

    pub fn health(&self) -> Health {
        self.health
    }

    pub fn pos(&self) -> Pos {
        self.pos
    }

    pub fn label(id: AgentId) -> String {
        format!("Person_{}", id.index())
    }
}

/// Epidemic model: agents, their grid placement and the disease parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpidemicModel {
    cfg: EpidemicConfig,
    population: Population<Human>,
    grid: MultiGrid,
    #[serde(skip)]
    cellmates: Vec<AgentId>,
}

impl EpidemicModel {
    pub fn population(&self) -> &Population<Human> {
        &self.population
    }

    pub fn grid(&self) -> &MultiGrid {
        &self.grid
    }

    fn move_randomly(&mut self, id: AgentId, rng: &mut RandomSource) -> Result<Pos> {
        let from = self.population[id].pos;
        let nbrs = self.grid.neighbors_of(from);
        let &to = rng.choice(&nbrs).context("failed to choose a neighboring cell")?;
        self.grid
            .move_agent(id, from, to)
            .with_context(|| format!("failed to move {}", Human::label(id)))?;
        self.population[id].pos = to;
        Ok(to)
    }

    fn infect_cellmates(&mut self, pos: Pos, rng: &mut RandomSource) {
        let infection_probability = self.cfg.virus.infection_probability;

        // Infecting a cellmate never changes the occupancy of the cell.
        self.cellmates.clear();
        self.cellmates.extend_from_slice(self.grid.occupants_of(pos));

        for &mate in &self.cellmates {
            let mate = &mut self.population[mate];
            if mate.health == Health::Susceptible && rng.next_float() < infection_probability {
                mate.health = Health::Infected;
            }
        }
    }

    fn try_to_recover(&mut self, id: AgentId, rng: &mut RandomSource) {
        if rng.next_float() < self.cfg.virus.recovery_probability {
            self.population[id].health = Health::Recovered;
        }
    }
}

impl Model for EpidemicModel {
    type Config = EpidemicConfig;
    type Snapshot = EpidemicSnapshot;

    const NAME: &'static str = "epidemic";

    fn new(cfg: EpidemicConfig, rng: &mut RandomSource) -> Result<Self> {
        let n_agents = cfg.simulation.n_agents;
        let mut grid = MultiGrid::new(cfg.grid.width, cfg.grid.height);

        let mut agt_vec = Vec::with_capacity(n_agents);
        for i_agt in 0..n_agents {
            let health = if rng.next_float() < cfg.virus.initial_infected_fraction {
                Health::Infected
            } else {
                Health::Susceptible
            };
            let x = rng.range_int(0, grid.width());
            let y = rng.range_int(0, grid.height());
            let pos = grid.place(AgentId(i_agt), Pos::new(x, y));
            agt_vec.push(Human::new(health, pos));
        }

        Ok(Self {
            cfg,
            population: Population::new(agt_vec),
            grid,
            cellmates: Vec::new(),
        })
    }

    fn config(&self) -> &EpidemicConfig {
        &self.cfg
    }

    fn n_agents(&self) -> usize {
        self.population.len()
    }

    fn step_agent(&mut self, id: AgentId, rng: &mut RandomSource) -> Result<()> {
        let pos = self.move_randomly(id, rng)?;

        // Agents infected earlier this tick by someone else act on their own turn;
        // those infected after their turn wait for the next tick.
        if self.population[id].health == Health::Infected {
            self.infect_cellmates(pos, rng);
            self.try_to_recover(id, rng);
        }

        Ok(())
    }

    fn check_consistency(&self) -> Result<()> {
        let n_placed = self.grid.n_placed();
        if n_placed != self.population.len() {
            bail!(EngineError::Consistency(format!(
                "grid holds {n_placed} placements for {} agents",
                self.population.len()
            )));
        }
        for (id, human) in self.population.iter() {
            let n_found = self
                .grid
                .occupants_of(human.pos)
                .iter()
                .filter(|&&occ| occ == id)
                .count();
            if n_found != 1 {
                bail!(EngineError::Consistency(format!(
                    "{} is recorded {n_found} times at {:?}",
                    Human::label(id),
                    human.pos
                )));
            }
        }
        Ok(())
    }

    fn collect(&self, step: usize) -> EpidemicSnapshot {
        EpidemicSnapshot::collect(step, &self.population)
    }
}
