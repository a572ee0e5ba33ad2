use crate::model::Model;
use crate::population::AgentId;
use crate::rng::RandomSource;
use anyhow::{Context, Result};

/// Random-order activation of every agent, one at a time.
///
/// Each tick the insertion order is reshuffled from scratch, then agents act
/// sequentially; later agents see the effects of earlier ones.
#[derive(Debug, Default)]
pub struct Scheduler {
    order: Vec<AgentId>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self { order: Vec::new() }
    }

    /// Activation order of the last tick.
    pub fn order(&self) -> &[AgentId] {
        &self.order
    }

    /// Shuffle the population and let every agent act once.
    pub fn step<M: Model>(&mut self, model: &mut M, rng: &mut RandomSource) -> Result<()> {
        self.order.clear();
        self.order.extend((0..model.n_agents()).map(AgentId));
        rng.shuffle(&mut self.order);

        for &id in &self.order {
            model
                .step_agent(id, rng)
                .with_context(|| format!("failed to step {id}"))?;
        }

        Ok(())
    }
}
