use crate::config::ModelConfig;
use crate::engine::{Engine, load_history};
use crate::metrics::Snapshot;
use crate::model::Model;
use crate::stats::Accumulator;
use anyhow::{Context, Result, bail};
use glob::glob;
use std::{
    fs,
    marker::PhantomData,
    path::{Path, PathBuf},
};

/// Number of trailing snapshots printed per run by [`Manager::report`].
const REPORT_TAIL: usize = 5;

/// Simulation directory of one model.
///
/// `sim_dir/config.toml` holds the configuration; every run lives in its own
/// `run-NNNN` directory with a checkpoint and a metrics file.
pub struct Manager<M: Model> {
    sim_dir: PathBuf,
    cfg: M::Config,
    model: PhantomData<M>,
}

impl<M: Model> Manager<M> {
    pub fn new<P: AsRef<Path>>(sim_dir: P) -> Result<Self> {
        let sim_dir = sim_dir.as_ref().to_path_buf();

        let cfg = M::Config::from_file(sim_dir.join("config.toml"))
            .context("failed to construct cfg")?;
        log::info!("{cfg:#?}");

        Ok(Self {
            sim_dir,
            cfg,
            model: PhantomData,
        })
    }

    /// Start a new run and perform `n_steps` ticks.
    pub fn create_run(&self) -> Result<()> {
        let run_idx = self.count_run_dirs().context("failed to count run dirs")?;

        let run_dir = self.run_dir(run_idx);
        fs::create_dir_all(&run_dir).with_context(|| format!("failed to create {run_dir:?}"))?;
        log::info!("created {run_dir:?}");

        let engine = Engine::<M>::new(self.cfg.clone()).context("failed to construct engine")?;

        self.advance_run(run_idx, engine)
    }

    /// Continue an existing run for another `n_steps` ticks.
    pub fn resume_run(&self, run_idx: usize) -> Result<()> {
        let checkpoint_file = self.checkpoint_file(run_idx);
        let engine = Engine::<M>::load_checkpoint(&checkpoint_file)
            .with_context(|| format!("failed to load {checkpoint_file:?}"))?;
        if engine.cfg() != &self.cfg {
            bail!("checkpoint config differs from the current config");
        }
        log::info!("loaded {checkpoint_file:?}");

        self.advance_run(run_idx, engine)
    }

    /// Print the last snapshots of every run and the spread of final values across runs.
    pub fn report(&self) -> Result<()> {
        let n_runs = self.count_run_dirs().context("failed to count run dirs")?;
        let mut acc_vec: Vec<(&'static str, Accumulator)> = Vec::new();

        for run_idx in 0..n_runs {
            let metrics_file = self.metrics_file(run_idx);
            let history = load_history::<M, _>(&metrics_file)
                .with_context(|| format!("failed to load {metrics_file:?}"))?;

            println!("run-{run_idx:04} (last {REPORT_TAIL} steps):");
            for snapshot in history.tail(REPORT_TAIL) {
                let row: Vec<_> = snapshot
                    .fields()
                    .iter()
                    .map(|(name, val)| format!("{name}={val:.4}"))
                    .collect();
                println!("{:>8} {}", snapshot.step(), row.join(" "));
            }

            let Some(last) = history.last() else {
                continue;
            };
            for (i_field, (name, val)) in last.fields().into_iter().enumerate() {
                if acc_vec.len() <= i_field {
                    acc_vec.push((name, Accumulator::new()));
                }
                acc_vec[i_field].1.add(val);
            }
        }

        for (name, acc) in &acc_vec {
            let report = acc.report();
            log::info!("final {name}: mean {:.4}, std dev {:.4}", report.mean, report.std_dev);
        }

        Ok(())
    }

    /// Delete every run directory.
    pub fn clean(&self) -> Result<()> {
        let n_runs = self.count_run_dirs().context("failed to count run dirs")?;
        for run_idx in 0..n_runs {
            let run_dir = self.run_dir(run_idx);
            fs::remove_dir_all(&run_dir).with_context(|| format!("failed to remove {run_dir:?}"))?;
            log::info!("removed {run_dir:?}");
        }
        Ok(())
    }

    fn advance_run(&self, run_idx: usize, mut engine: Engine<M>) -> Result<()> {
        engine
            .run(self.cfg.simulation().n_steps)
            .context("failed to run simulation")?;

        engine
            .save_checkpoint(self.checkpoint_file(run_idx))
            .context("failed to save checkpoint")?;

        engine
            .save_history(self.metrics_file(run_idx))
            .context("failed to save metrics")?;

        Ok(())
    }

    fn count_run_dirs(&self) -> Result<usize> {
        let pattern = self.sim_dir.join("run-*");
        let pattern = pattern.to_str().context("pattern is not valid UTF-8")?;
        let count = glob(pattern)
            .context("failed to glob run dirs")?
            .filter_map(Result::ok)
            .filter(|p| p.is_dir())
            .count();
        Ok(count)
    }

    fn run_dir(&self, run_idx: usize) -> PathBuf {
        self.sim_dir.join(format!("run-{run_idx:04}"))
    }

    fn checkpoint_file(&self, run_idx: usize) -> PathBuf {
        self.run_dir(run_idx).join("checkpoint.msgpack")
    }

    fn metrics_file(&self, run_idx: usize) -> PathBuf {
        self.run_dir(run_idx).join("metrics.msgpack")
    }
}
