use crate::error::EngineError;
use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::{fmt::Debug, fs, ops::RangeBounds, path::Path};

/// Grid dimensions (epidemic model only).
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct GridConfig {
    pub width: usize,
    pub height: usize,
}

/// Run length and population size shared by every model.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Number of agents (for the mating model, number of agents of each sex).
    pub n_agents: usize,
    /// Number of ticks performed by each `create` or `resume`.
    pub n_steps: usize,
    /// Seed of the random source. Drawn from the OS when absent.
    #[serde(default)]
    pub seed: Option<u64>,
}

/// Disease parameters.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct VirusConfig {
    pub infection_probability: f64,
    pub recovery_probability: f64,
    pub initial_infected_fraction: f64,
}

/// Female cycle parameters.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct BiologyConfig {
    pub cycle_length: u32,
    pub fertile_day: u32,
    pub base_offspring_success: f64,
}

/// Social cost parameters.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct SocialConfig {
    pub rivalry_cost_factor: f64,
    pub concealed_fraction: f64,
}

/// Male decision parameters.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct BehaviorConfig {
    pub paternity_certainty_concealed: f64,
    pub paternity_certainty_overt: f64,
    pub investment_threshold: f64,
    pub investment_increment: f64,
}

/// Configuration of the epidemic (SIR) model.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct EpidemicConfig {
    pub grid: GridConfig,
    pub simulation: SimulationConfig,
    pub virus: VirusConfig,
}

/// Configuration of the mating-investment model.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct MatingConfig {
    pub simulation: SimulationConfig,
    pub biology: BiologyConfig,
    pub social: SocialConfig,
    pub behavior: BehaviorConfig,
}

/// Behaviour shared by the per-model configuration types.
pub trait ModelConfig: Debug + Clone + PartialEq + Serialize + DeserializeOwned {
    fn simulation(&self) -> &SimulationConfig;

    /// Check every range invariant.
    ///
    /// # Errors
    /// Fails with [`EngineError::Configuration`] as root cause.
    fn validate(&self) -> Result<()>;

    /// Parse and validate a TOML document.
    fn from_toml_str(toml_str: &str) -> Result<Self> {
        let config: Self = toml::from_str(toml_str).context("failed to deserialize config")?;
        config.validate().context("failed to validate config")?;
        Ok(config)
    }

    /// Load a configuration from a TOML file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, deserialized,
    /// or if the configuration values are invalid.
    fn from_file<P: AsRef<Path>>(file: P) -> Result<Self> {
        let file = file.as_ref();
        let toml_str = fs::read_to_string(file).with_context(|| format!("failed to read {file:?}"))?;
        Self::from_toml_str(&toml_str).with_context(|| format!("failed to load {file:?}"))
    }
}

impl SimulationConfig {
    fn validate(&self) -> Result<()> {
        check_num(self.n_agents, 1..=1_000_000).context("invalid number of agents")?;
        check_num(self.n_steps, 1..=10_000_000).context("invalid number of steps")?;
        Ok(())
    }
}

impl ModelConfig for EpidemicConfig {
    fn simulation(&self) -> &SimulationConfig {
        &self.simulation
    }

    fn validate(&self) -> Result<()> {
        check_num(self.grid.width, 1..=100_000).context("invalid grid width")?;
        check_num(self.grid.height, 1..=100_000).context("invalid grid height")?;

        self.simulation.validate()?;

        check_num(self.virus.infection_probability, 0.0..=1.0)
            .context("invalid infection probability")?;
        check_num(self.virus.recovery_probability, 0.0..=1.0)
            .context("invalid recovery probability")?;
        check_num(self.virus.initial_infected_fraction, 0.0..=1.0)
            .context("invalid initial infected fraction")?;

        Ok(())
    }
}

impl ModelConfig for MatingConfig {
    fn simulation(&self) -> &SimulationConfig {
        &self.simulation
    }

    fn validate(&self) -> Result<()> {
        self.simulation.validate()?;

        let bio = &self.biology;
        check_num(bio.cycle_length, 1..=10_000).context("invalid cycle length")?;
        check_num(bio.fertile_day, 1..=bio.cycle_length).context("invalid fertile day")?;
        check_num(bio.base_offspring_success, 0.0..=f64::MAX)
            .context("invalid base offspring success")?;

        check_num(self.social.rivalry_cost_factor, 0.0..=1.0)
            .context("invalid rivalry cost factor")?;
        check_num(self.social.concealed_fraction, 0.0..=1.0)
            .context("invalid concealed fraction")?;

        let beh = &self.behavior;
        check_finite(beh.paternity_certainty_concealed)
            .context("invalid paternity certainty (concealed)")?;
        check_finite(beh.paternity_certainty_overt)
            .context("invalid paternity certainty (overt)")?;
        check_finite(beh.investment_threshold).context("invalid investment threshold")?;
        check_num(beh.investment_increment, 0.0..=f64::MAX)
            .context("invalid investment increment")?;

        Ok(())
    }
}

fn check_num<T, R>(num: T, range: R) -> Result<()>
where
    T: PartialOrd + Debug,
    R: RangeBounds<T> + Debug,
{
    if !range.contains(&num) {
        bail!(EngineError::Configuration(format!(
            "number must be in the range {range:?}, but is {num:?}"
        )));
    }
    Ok(())
}

fn check_finite(num: f64) -> Result<()> {
    if !num.is_finite() {
        bail!(EngineError::Configuration(format!(
            "number must be finite, but is {num:?}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPIDEMIC_TOML: &str = r#"
[grid]
width = 10
height = 10

[simulation]
n_agents = 50
n_steps = 20
seed = 42

[virus]
infection_probability = 0.3
recovery_probability = 0.1
initial_infected_fraction = 0.1
"#;

    const MATING_TOML: &str = r#"
[simulation]
n_agents = 10
n_steps = 30

[biology]
cycle_length = 28
fertile_day = 14
base_offspring_success = 1.0

[social]
rivalry_cost_factor = 0.3
concealed_fraction = 0.5

[behavior]
paternity_certainty_concealed = 0.6
paternity_certainty_overt = 0.9
investment_threshold = 0.5
investment_increment = 0.1
"#;

    fn config_error(err: &anyhow::Error) -> bool {
        matches!(
            err.root_cause().downcast_ref::<EngineError>(),
            Some(EngineError::Configuration(_))
        )
    }

    #[test]
    fn parses_epidemic_config() {
        let cfg = EpidemicConfig::from_toml_str(EPIDEMIC_TOML).unwrap();
        assert_eq!(cfg.grid.width, 10);
        assert_eq!(cfg.simulation.seed, Some(42));
        assert_eq!(cfg.virus.infection_probability, 0.3);
    }

    #[test]
    fn seed_is_optional() {
        let cfg = MatingConfig::from_toml_str(MATING_TOML).unwrap();
        assert_eq!(cfg.simulation.seed, None);
        assert_eq!(cfg.biology.fertile_day, 14);
    }

    #[test]
    fn rejects_probability_out_of_range() {
        let toml_str = EPIDEMIC_TOML.replace("infection_probability = 0.3", "infection_probability = 1.5");
        let err = EpidemicConfig::from_toml_str(&toml_str).unwrap_err();
        assert!(config_error(&err), "{err:#}");
    }

    #[test]
    fn rejects_zero_agents_and_steps() {
        let toml_str = EPIDEMIC_TOML.replace("n_agents = 50", "n_agents = 0");
        assert!(config_error(&EpidemicConfig::from_toml_str(&toml_str).unwrap_err()));

        let toml_str = MATING_TOML.replace("n_steps = 30", "n_steps = 0");
        assert!(config_error(&MatingConfig::from_toml_str(&toml_str).unwrap_err()));
    }

    #[test]
    fn rejects_fertile_day_outside_cycle() {
        let toml_str = MATING_TOML.replace("fertile_day = 14", "fertile_day = 29");
        assert!(config_error(&MatingConfig::from_toml_str(&toml_str).unwrap_err()));

        let toml_str = MATING_TOML.replace("fertile_day = 14", "fertile_day = 0");
        assert!(config_error(&MatingConfig::from_toml_str(&toml_str).unwrap_err()));
    }

    #[test]
    fn rejects_negative_increment() {
        let toml_str = MATING_TOML.replace("investment_increment = 0.1", "investment_increment = -0.1");
        assert!(config_error(&MatingConfig::from_toml_str(&toml_str).unwrap_err()));
    }

    #[test]
    fn missing_section_is_not_a_range_error() {
        let err = MatingConfig::from_toml_str("[simulation]\nn_agents = 1\nn_steps = 1\n").unwrap_err();
        assert!(!config_error(&err));
    }
}
