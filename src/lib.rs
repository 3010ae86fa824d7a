pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::cli::CliArgs;

pub use adapters::{FileCheckpointStore, HttpRegistryClient, LocalStorage, RunOutputWriter};
pub use config::HarvestConfig;
pub use core::engine::{HarvestEngine, RunPlan, SystemClock};
pub use core::normalizer::normalize;
pub use core::scheduler::{BatchScheduler, SchedulerSettings, TransientErrorPolicy};
pub use domain::model::{NormalizedAddress, RunReport, StopReason};
pub use utils::error::{HarvestError, Result};
