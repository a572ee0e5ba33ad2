//! Discrete-time stochastic agent-based simulation engine.
//!
//! Every tick the [`Scheduler`](scheduler::Scheduler) activates all agents of a
//! [`Model`](model::Model) once, in a freshly shuffled order, then the model's
//! snapshot is appended to the run's [`MetricsHistory`](metrics::MetricsHistory).
//! All randomness flows from one seeded [`RandomSource`](rng::RandomSource), so a
//! seed and a configuration fully determine a run.
//!
//! Two models are provided: [`epidemic`] (SIR spread on a toroidal grid) and
//! [`mating`] (paternal investment under concealed or overt ovulation).

pub mod config;
pub mod engine;
pub mod epidemic;
pub mod error;
pub mod grid;
pub mod manager;
pub mod mating;
pub mod metrics;
pub mod model;
pub mod population;
pub mod rng;
pub mod scheduler;
pub mod stats;

pub use engine::Engine;
pub use error::EngineError;
pub use model::Model;
