use crate::config::ModelConfig;
use crate::metrics::MetricsHistory;
use crate::model::Model;
use crate::rng::RandomSource;
use crate::scheduler::Scheduler;
use anyhow::{Context, Result};
use rmp_serde::{decode, encode};
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, BufWriter, Write},
    path::Path,
};

/// Simulation run.
///
/// Holds the model, the run's single random source and the metrics history,
/// and provides methods to step, run, save, and load simulations. The history
/// always has one snapshot per completed tick, so a caller may stop between
/// any two calls to [`Engine::step`].
#[derive(Serialize, Deserialize)]
#[serde(bound = "")]
pub struct Engine<M: Model> {
    model: M,
    rng: RandomSource,
    history: MetricsHistory<M::Snapshot>,
    #[serde(skip)]
    scheduler: Scheduler,
}

impl<M: Model> Engine<M> {
    /// Validate the configuration and build the initial population.
    ///
    /// # Errors
    /// Fails with a configuration error before any tick runs.
    pub fn new(cfg: M::Config) -> Result<Self> {
        cfg.validate().context("failed to validate config")?;

        let mut rng = RandomSource::from_optional_seed(cfg.simulation().seed);
        log::info!("{} seed: {}", M::NAME, rng.seed());

        let model = M::new(cfg, &mut rng).context("failed to build initial population")?;

        Ok(Self {
            model,
            rng,
            history: MetricsHistory::new(),
            scheduler: Scheduler::new(),
        })
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn cfg(&self) -> &M::Config {
        self.model.config()
    }

    pub fn seed(&self) -> u64 {
        self.rng.seed()
    }

    pub fn history(&self) -> &MetricsHistory<M::Snapshot> {
        &self.history
    }

    /// Number of completed ticks.
    pub fn tick(&self) -> usize {
        self.history.len()
    }

    /// Perform one tick and return its snapshot.
    ///
    /// On error the tick is not recorded and the run should be abandoned.
    pub fn step(&mut self) -> Result<&M::Snapshot> {
        self.scheduler
            .step(&mut self.model, &mut self.rng)
            .context("failed to activate agents")?;

        self.model
            .check_consistency()
            .context("failed to verify model state")?;

        let snapshot = self.model.collect(self.tick() + 1);
        log::debug!("{snapshot:?}");
        self.history.push(snapshot);

        self.history
            .last()
            .context("history is empty after a completed tick")
    }

    /// Perform `n_steps` ticks.
    pub fn run(&mut self, n_steps: usize) -> Result<()> {
        let log_every = (n_steps / 10).max(1);
        for i_step in 0..n_steps {
            let tick = self.tick() + 1;
            self.step()
                .with_context(|| format!("failed to perform tick {tick}"))?;

            if (i_step + 1) % log_every == 0 || i_step + 1 == n_steps {
                let progress = 100.0 * (i_step + 1) as f64 / n_steps as f64;
                log::info!("completed {progress:06.2}%");
            }
        }
        Ok(())
    }

    /// Save a checkpoint of the entire engine state.
    ///
    /// Can be used to resume the simulation later on the same random stream.
    pub fn save_checkpoint<P: AsRef<Path>>(&self, file: P) -> Result<()> {
        let file = file.as_ref();
        let file = File::create(file).with_context(|| format!("failed to create {file:?}"))?;
        let mut writer = BufWriter::new(file);
        encode::write(&mut writer, &self).context("failed to serialize engine")?;
        writer.flush().context("failed to flush writer stream")?;
        Ok(())
    }

    /// Load a previously saved engine checkpoint.
    pub fn load_checkpoint<P: AsRef<Path>>(file: P) -> Result<Self> {
        let file = file.as_ref();
        let file = File::open(file).with_context(|| format!("failed to open {file:?}"))?;
        let mut reader = BufReader::new(file);
        let engine = decode::from_read(&mut reader).context("failed to deserialize engine")?;
        Ok(engine)
    }

    /// Write the metrics history alone, for external consumers.
    pub fn save_history<P: AsRef<Path>>(&self, file: P) -> Result<()> {
        let file = file.as_ref();
        let file = File::create(file).with_context(|| format!("failed to create {file:?}"))?;
        let mut writer = BufWriter::new(file);
        encode::write(&mut writer, &self.history).context("failed to serialize history")?;
        writer.flush().context("failed to flush writer stream")?;
        Ok(())
    }
}

/// Read a metrics history written by [`Engine::save_history`].
pub fn load_history<M: Model, P: AsRef<Path>>(file: P) -> Result<MetricsHistory<M::Snapshot>> {
    let file = file.as_ref();
    let file = File::open(file).with_context(|| format!("failed to open {file:?}"))?;
    let mut reader = BufReader::new(file);
    decode::from_read(&mut reader).context("failed to deserialize history")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{EpidemicConfig, GridConfig, SimulationConfig, VirusConfig};
    use crate::epidemic::EpidemicModel;
    use crate::error::EngineError;

    fn cfg(seed: Option<u64>) -> EpidemicConfig {
        EpidemicConfig {
            grid: GridConfig {
                width: 6,
                height: 6,
            },
            simulation: SimulationConfig {
                n_agents: 40,
                n_steps: 15,
                seed,
            },
            virus: VirusConfig {
                infection_probability: 0.4,
                recovery_probability: 0.1,
                initial_infected_fraction: 0.1,
            },
        }
    }

    #[test]
    fn history_grows_by_one_per_tick() {
        let mut engine = Engine::<EpidemicModel>::new(cfg(Some(3))).unwrap();
        assert!(engine.history().is_empty());
        for tick in 1..=4 {
            let snapshot = engine.step().unwrap().clone();
            assert_eq!(snapshot.step, tick);
            assert_eq!(engine.tick(), tick);
        }
        engine.run(6).unwrap();
        assert_eq!(engine.history().len(), 10);
    }

    #[test]
    fn invalid_config_fails_before_any_tick() {
        let mut bad = cfg(Some(3));
        bad.virus.recovery_probability = -0.1;
        let err = Engine::<EpidemicModel>::new(bad).err().unwrap();
        assert!(matches!(
            err.root_cause().downcast_ref::<EngineError>(),
            Some(EngineError::Configuration(_))
        ));
    }

    #[test]
    fn unseeded_run_is_replayable_from_its_seed() {
        let mut first = Engine::<EpidemicModel>::new(cfg(None)).unwrap();
        let mut replay = Engine::<EpidemicModel>::new(cfg(Some(first.seed()))).unwrap();
        first.run(10).unwrap();
        replay.run(10).unwrap();
        assert_eq!(first.history(), replay.history());
    }

    #[test]
    fn checkpoint_resumes_the_same_stream() {
        let dir = std::env::temp_dir().join(format!("agentsim-engine-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let file = dir.join("checkpoint.msgpack");

        let mut straight = Engine::<EpidemicModel>::new(cfg(Some(17))).unwrap();
        straight.run(12).unwrap();

        let mut split = Engine::<EpidemicModel>::new(cfg(Some(17))).unwrap();
        split.run(5).unwrap();
        split.save_checkpoint(&file).unwrap();
        let mut resumed = Engine::<EpidemicModel>::load_checkpoint(&file).unwrap();
        assert_eq!(resumed.cfg(), split.cfg());
        resumed.run(7).unwrap();

        assert_eq!(resumed.history(), straight.history());

        let history_file = dir.join("metrics.msgpack");
        resumed.save_history(&history_file).unwrap();
        let loaded = load_history::<EpidemicModel, _>(&history_file).unwrap();
        assert_eq!(&loaded, resumed.history());

        std::fs::remove_dir_all(&dir).ok();
    }
}
