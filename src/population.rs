//! Fixed-size arena owning every agent of a run.

use crate::rng::RandomSource;
use serde::{Deserialize, Serialize};
use std::{
    fmt,
    ops::{Index, IndexMut},
};

/// Stable agent identifier: the agent's slot in its [`Population`].
///
/// Assigned at creation and never reused, since the arena never shrinks or grows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AgentId(pub usize);

impl AgentId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AgentId({})", self.0)
    }
}

/// Insertion-ordered collection of agents, sized once at construction.
///
/// Other components (grid cells, partner links) refer to agents only by
/// [`AgentId`]; the population is the sole owner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Population<A> {
    agt_vec: Vec<A>,
}

impl<A> Population<A> {
    pub fn new(agt_vec: Vec<A>) -> Self {
        Self { agt_vec }
    }

    pub fn len(&self) -> usize {
        self.agt_vec.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agt_vec.is_empty()
    }

    pub fn get(&self, id: AgentId) -> Option<&A> {
        self.agt_vec.get(id.0)
    }

    pub fn get_mut(&mut self, id: AgentId) -> Option<&mut A> {
        self.agt_vec.get_mut(id.0)
    }

    /// Identifiers in insertion order.
    pub fn ids(&self) -> impl Iterator<Item = AgentId> + '_ {
        (0..self.agt_vec.len()).map(AgentId)
    }

    /// Agents with their identifiers, in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (AgentId, &A)> + '_ {
        self.agt_vec.iter().enumerate().map(|(i, a)| (AgentId(i), a))
    }

    /// Uniformly drawn agent identifier, or `None` for an empty population.
    pub fn random_id(&self, rng: &mut RandomSource) -> Option<AgentId> {
        if self.agt_vec.is_empty() {
            return None;
        }
        Some(AgentId(rng.range_int(0, self.agt_vec.len())))
    }
}

impl<A> Index<AgentId> for Population<A> {
    type Output = A;

    fn index(&self, id: AgentId) -> &A {
        &self.agt_vec[id.0]
    }
}

impl<A> IndexMut<AgentId> for Population<A> {
    fn index_mut(&mut self, id: AgentId) -> &mut A {
        &mut self.agt_vec[id.0]
    }
}
