use agentsim::epidemic::EpidemicModel;
use agentsim::manager::Manager;
use agentsim::mating::MatingModel;
use agentsim::model::Model;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(version, about)]
struct CLI {
    #[arg(long)]
    sim_dir: PathBuf,

    #[arg(long, value_enum)]
    model: ModelKind,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ModelKind {
    Epidemic,
    Mating,
}

#[derive(Debug, Subcommand)]
enum Command {
    Create,

    Resume {
        #[arg(long)]
        run_idx: usize,
    },

    Report,

    Clean,
}

fn main() {
    env_logger::Builder::new()
        .format_timestamp_millis()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    if let Err(error) = run_cli() {
        log::error!("{error:#?}");
        std::process::exit(1);
    }
}

fn run_cli() -> Result<()> {
    let args = CLI::parse();
    log::info!("{args:#?}");

    match args.model {
        ModelKind::Epidemic => run_command::<EpidemicModel>(args),
        ModelKind::Mating => run_command::<MatingModel>(args),
    }
}

fn run_command<M: Model>(args: CLI) -> Result<()> {
    let mgr = Manager::<M>::new(args.sim_dir).context("failed to construct mgr")?;

    match args.command {
        Command::Create => mgr.create_run()?,
        Command::Resume { run_idx } => mgr.resume_run(run_idx)?,
        Command::Report => mgr.report()?,
        Command::Clean => mgr.clean()?,
    }

    Ok(())
}
