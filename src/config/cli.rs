use crate::config::HarvestConfig;
use crate::utils::error::Result;
use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "registry-harvest")]
#[command(about = "Resumable, time-boxed harvester for the outpatient-care registry")]
pub struct CliArgs {
    /// TOML configuration file; defaults apply when omitted
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Identifier CSV (overrides input.path)
    #[arg(long)]
    pub input: Option<String>,

    /// Output directory (overrides output.output_path)
    #[arg(long)]
    pub output_path: Option<String>,

    /// Wall-clock budget in seconds (overrides run.time_budget_seconds)
    #[arg(long)]
    pub time_budget_secs: Option<u64>,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit JSON log lines")]
    pub json_logs: bool,

    #[arg(long, help = "Load identifiers and checkpoints without fetching")]
    pub dry_run: bool,
}

impl CliArgs {
    /// Loads the configuration file (if any) and applies the overrides.
    pub fn load_config(&self) -> Result<HarvestConfig> {
        let mut config = match &self.config {
            Some(path) => HarvestConfig::from_file(path)?,
            None => HarvestConfig::default(),
        };

        if let Some(input) = &self.input {
            config.input.path = input.clone();
        }
        if let Some(output_path) = &self.output_path {
            config.output.output_path = output_path.clone();
        }
        if let Some(budget) = self.time_budget_secs {
            config.run.time_budget_seconds = budget;
        }

        Ok(config)
    }
}
