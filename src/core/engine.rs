use crate::adapters::{
    load_identifiers, FileCheckpointStore, HttpRegistryClient, LocalStorage, RunOutputWriter,
};
use crate::config::HarvestConfig;
use crate::core::scheduler::{pending_identifiers, BatchScheduler};
use crate::domain::model::RunReport;
use crate::domain::ports::{CheckpointStore, Clock};
use crate::utils::error::Result;
use std::time::{Duration, Instant};

/// Wall clock backed by tokio's timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// What a run would do, computed without touching the network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunPlan {
    pub total: usize,
    pub handled: usize,
    pub pending: usize,
}

/// Wires configuration to the concrete adapters and runs the scheduler.
pub struct HarvestEngine {
    config: HarvestConfig,
    started_at: Instant,
}

impl HarvestEngine {
    /// `started_at` is the process start; the time budget counts from it.
    pub fn new(config: HarvestConfig, started_at: Instant) -> Self {
        Self { config, started_at }
    }

    pub fn config(&self) -> &HarvestConfig {
        &self.config
    }

    fn identifiers(&self) -> Result<Vec<String>> {
        load_identifiers(
            &self.config.input.path,
            self.config.input.id_column,
            self.config.input.has_headers,
        )
    }

    fn checkpoint_store(&self) -> FileCheckpointStore {
        FileCheckpointStore::new(self.config.output.checkpoint_path())
    }

    pub fn plan(&self) -> Result<RunPlan> {
        let identifiers = self.identifiers()?;
        let handled = self.checkpoint_store().load()?;
        let pending = pending_identifiers(&identifiers, &handled).len();

        Ok(RunPlan {
            total: identifiers.len(),
            handled: handled.len(),
            pending,
        })
    }

    pub async fn run(&self) -> Result<RunReport> {
        let identifiers = self.identifiers()?;
        let client = HttpRegistryClient::new(&self.config.source)?;

        let output = &self.config.output;
        let storage = LocalStorage::new(output.output_path.clone());
        let sink = RunOutputWriter::new(
            storage,
            output.output_path.clone(),
            &output.file_prefix,
            output.compression,
            output.continuation_file.clone(),
        );
        tracing::info!("📁 Output for this run: {}", sink.run_name());

        let mut scheduler = BatchScheduler::new(
            client,
            self.checkpoint_store(),
            sink,
            SystemClock,
            self.config.scheduler_settings(self.started_at),
        );

        scheduler.run(&identifiers).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_plan_counts_pending_against_checkpoint_log() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("ids.csv");
        fs::write(&input, "Name,Number\nA,1\nB,2\nC,3\nA,1\n").unwrap();
        fs::write(dir.path().join("processed_ids.txt"), "2\n99\n").unwrap();

        let mut config = HarvestConfig::default();
        config.input.path = input.to_string_lossy().to_string();
        config.output.output_path = dir.path().to_string_lossy().to_string();

        let plan = HarvestEngine::new(config, Instant::now()).plan().unwrap();

        assert_eq!(
            plan,
            RunPlan {
                total: 4,
                handled: 2,
                pending: 2,
            }
        );
    }

    #[tokio::test]
    async fn test_system_clock_sleeps() {
        let clock = SystemClock;
        let before = clock.now();
        clock.sleep(Duration::from_millis(5)).await;
        assert!(clock.now().duration_since(before) >= Duration::from_millis(5));
    }
}
