pub mod scenario;

pub use scenario::ScenarioConfig;

#[cfg(feature = "cli")]
use clap::Parser;

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Parser)]
#[command(name = "taf-forecast")]
#[command(about = "Rescales a baseline flight schedule to TAF growth targets")]
pub struct CliConfig {
    /// Scenario TOML describing inputs, window and stage parameters
    #[arg(long, default_value = "./scenario.toml")]
    pub scenario: String,

    /// Override the scenario's output path
    #[arg(long)]
    pub output_path: Option<String>,

    /// Override the clone-selection stream seed (Monte Carlo trials)
    #[arg(long)]
    pub clone_selection_seed: Option<u64>,

    /// Override the time-shift stream seed
    #[arg(long)]
    pub time_shift_seed: Option<u64>,

    /// Override the VFR local-time stream seed
    #[arg(long)]
    pub vfr_local_time_seed: Option<u64>,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Enable system monitoring")]
    pub monitor: bool,
}

#[cfg(feature = "cli")]
impl CliConfig {
    /// Load the scenario file and fold in the CLI overrides.
    pub fn load_scenario(&self) -> crate::utils::error::Result<ScenarioConfig> {
        let mut config = ScenarioConfig::from_file(&self.scenario)?;

        if let Some(output_path) = &self.output_path {
            config.load.output_path = output_path.clone();
        }
        if let Some(seed) = self.clone_selection_seed {
            config.seeds.clone_selection = seed;
        }
        if let Some(seed) = self.time_shift_seed {
            config.seeds.time_shift = seed;
        }
        if let Some(seed) = self.vfr_local_time_seed {
            config.seeds.vfr_local_time = seed;
        }

        Ok(config)
    }
}
