use crate::config::ModelConfig;
use crate::metrics::Snapshot;
use crate::population::AgentId;
use crate::rng::RandomSource;
use anyhow::Result;
use serde::{Serialize, de::DeserializeOwned};

/// A concrete simulation: its agents, their per-tick behaviour and its metrics.
///
/// The model owns its configuration and agent arena (plus any spatial index);
/// the run's [`RandomSource`] is handed in explicitly on every call that needs it.
pub trait Model: Sized + Serialize + DeserializeOwned {
    type Config: ModelConfig;
    type Snapshot: Snapshot;

    /// Short name used in logs and file names.
    const NAME: &'static str;

    /// Build the initial population, drawing from `rng`.
    ///
    /// `cfg` has already been validated.
    fn new(cfg: Self::Config, rng: &mut RandomSource) -> Result<Self>;

    fn config(&self) -> &Self::Config;

    /// Number of agents; identifiers are `AgentId(0)..AgentId(n_agents)`.
    fn n_agents(&self) -> usize;

    /// Perform the turn of one agent within the current tick.
    fn step_agent(&mut self, id: AgentId, rng: &mut RandomSource) -> Result<()>;

    /// Verify internal invariants once every agent has moved.
    fn check_consistency(&self) -> Result<()> {
        Ok(())
    }

    /// Summarize the population after tick `step` (1-based).
    fn collect(&self, step: usize) -> Self::Snapshot;
}
