//! Per-tick population summaries and their append-only history.

use crate::epidemic::{Health, Human};
use crate::mating::Sex;
use crate::population::{AgentId, Population};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::fmt::Debug;

/// One tick's aggregate statistics.
pub trait Snapshot: Debug + Clone + PartialEq + Serialize + DeserializeOwned {
    /// Tick this snapshot summarizes (1-based).
    fn step(&self) -> usize;

    /// Named numeric fields, in display order.
    fn fields(&self) -> Vec<(&'static str, f64)>;
}

/// Health-state counts. The three counts always sum to the population size.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpidemicSnapshot {
    pub step: usize,
    pub susceptible: usize,
    pub infected: usize,
    pub recovered: usize,
}

impl EpidemicSnapshot {
    pub fn collect(step: usize, population: &Population<Human>) -> Self {
        let mut snapshot = Self {
            step,
            susceptible: 0,
            infected: 0,
            recovered: 0,
        };
        for (_, human) in population.iter() {
            match human.health() {
                Health::Susceptible => snapshot.susceptible += 1,
                Health::Infected => snapshot.infected += 1,
                Health::Recovered => snapshot.recovered += 1,
            }
        }
        snapshot
    }

    pub fn total(&self) -> usize {
        self.susceptible + self.infected + self.recovered
    }
}

impl Snapshot for EpidemicSnapshot {
    fn step(&self) -> usize {
        self.step
    }

    fn fields(&self) -> Vec<(&'static str, f64)> {
        vec![
            ("Susceptible", self.susceptible as f64),
            ("Infected", self.infected as f64),
            ("Recovered", self.recovered as f64),
        ]
    }
}

/// Male investment and female success totals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatingSnapshot {
    pub step: usize,
    pub avg_male_investment: f64,
    pub total_female_success: f64,
}

impl Snapshot for MatingSnapshot {
    fn step(&self) -> usize {
        self.step
    }

    fn fields(&self) -> Vec<(&'static str, f64)> {
        vec![
            ("AvgMaleInvestment", self.avg_male_investment),
            ("TotalFemaleSuccess", self.total_female_success),
        ]
    }
}

/// Builds [`MatingSnapshot`]s from per-sex identifier buckets.
///
/// The investment mean divides by the agent count given at construction,
/// whatever the number of males found.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatingCollector {
    n_agents: usize,
    female_ids: Vec<AgentId>,
    male_ids: Vec<AgentId>,
}

impl MatingCollector {
    pub fn new(n_agents: usize, population: &Population<Sex>) -> Self {
        let mut female_ids = Vec::new();
        let mut male_ids = Vec::new();
        for (id, agt) in population.iter() {
            match agt {
                Sex::Female(_) => female_ids.push(id),
                Sex::Male(_) => male_ids.push(id),
            }
        }
        Self {
            n_agents,
            female_ids,
            male_ids,
        }
    }

    pub fn female_ids(&self) -> &[AgentId] {
        &self.female_ids
    }

    pub fn male_ids(&self) -> &[AgentId] {
        &self.male_ids
    }

    pub fn collect(&self, step: usize, population: &Population<Sex>) -> MatingSnapshot {
        let investment: f64 = self
            .male_ids
            .iter()
            .filter_map(|&id| population[id].as_male())
            .map(|male| male.investment_resources())
            .sum();
        let total_female_success = self
            .female_ids
            .iter()
            .filter_map(|&id| population[id].as_female())
            .map(|female| female.offspring_success_score())
            .sum();
        MatingSnapshot {
            step,
            avg_male_investment: investment / self.n_agents as f64,
            total_female_success,
        }
    }
}

/// Ordered snapshots, one per completed tick.
///
/// Entries can only be appended, and only by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsHistory<S> {
    snapshots: Vec<S>,
}

impl<S> MetricsHistory<S> {
    pub fn new() -> Self {
        Self {
            snapshots: Vec::new(),
        }
    }

    pub(crate) fn push(&mut self, snapshot: S) {
        self.snapshots.push(snapshot);
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn as_slice(&self) -> &[S] {
        &self.snapshots
    }

    pub fn last(&self) -> Option<&S> {
        self.snapshots.last()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, S> {
        self.snapshots.iter()
    }

    /// The last `n` snapshots (fewer if the history is shorter).
    pub fn tail(&self, n: usize) -> &[S] {
        &self.snapshots[self.snapshots.len().saturating_sub(n)..]
    }
}

impl<S> Default for MetricsHistory<S> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Pos;
    use crate::mating::{Female, Male};

    #[test]
    fn epidemic_counts_partition_the_population() {
        let pop = Population::new(vec![
            Human::new(Health::Susceptible, Pos::new(0, 0)),
            Human::new(Health::Infected, Pos::new(0, 0)),
            Human::new(Health::Infected, Pos::new(1, 0)),
            Human::new(Health::Recovered, Pos::new(1, 1)),
        ]);
        let snapshot = EpidemicSnapshot::collect(3, &pop);
        assert_eq!(snapshot.step, 3);
        assert_eq!(
            (snapshot.susceptible, snapshot.infected, snapshot.recovered),
            (1, 2, 1)
        );
        assert_eq!(snapshot.total(), pop.len());
    }

    #[test]
    fn mating_mean_uses_configured_denominator() {
        let mut rich = Male::new();
        rich.add_resources(6.0);
        let mut female = Female::new(1, false);
        female.add_success(2.5, AgentId(1));
        let pop = Population::new(vec![
            Sex::Female(female),
            Sex::Male(rich),
            Sex::Male(Male::new()),
        ]);
        let collector = MatingCollector::new(4, &pop);
        assert_eq!(collector.female_ids(), &[AgentId(0)]);
        assert_eq!(collector.male_ids(), &[AgentId(1), AgentId(2)]);

        let snapshot = collector.collect(1, &pop);
        assert_eq!(snapshot.avg_male_investment, 1.5);
        assert_eq!(snapshot.total_female_success, 2.5);
    }

    #[test]
    fn tail_is_clamped() {
        let mut history = MetricsHistory::new();
        for step in 1..=3 {
            history.push(step);
        }
        assert_eq!(history.tail(5), &[1, 2, 3]);
        assert_eq!(history.tail(2), &[2, 3]);
        assert_eq!(history.last(), Some(&3));
    }
}
