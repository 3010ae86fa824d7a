//! Resumable, time-boxed batch loop.
//!
//! One identifier at a time: fetch, parse, checkpoint, throttle. The budget
//! is checked before each identifier, never in the middle of a fetch. An
//! identifier is checkpointed as soon as its outcome is known, so a crash
//! costs at most the one identifier in flight.

use crate::core::parser;
use crate::domain::model::{
    ContinuationSignal, FetchOutcome, HarvestTables, RunReport, RunStats, SchedulerState,
    StopReason,
};
use crate::domain::ports::{CheckpointStore, Clock, RegistryClient, TableSink};
use crate::utils::error::Result;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::{Duration, Instant};

/// What to do with an identifier whose lookup failed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransientErrorPolicy {
    /// Checkpoint it like any other outcome; it is never looked up again.
    #[default]
    Checkpoint,
    /// Leave it out of the checkpoint log so the next run tries it again.
    LeavePending,
}

#[derive(Debug, Clone)]
pub struct SchedulerSettings {
    /// Wall-clock ceiling measured from `started_at`.
    pub time_budget: Duration,
    /// Process start; the budget is measured from here, not from `run`.
    pub started_at: Instant,
    pub min_delay: Duration,
    pub max_delay: Duration,
    pub on_transient_error: TransientErrorPolicy,
    /// Rewrite the run's output every N identifiers that produced rows.
    pub flush_every: Option<usize>,
}

impl SchedulerSettings {
    fn next_delay(&self) -> Duration {
        if self.max_delay <= self.min_delay {
            return self.min_delay;
        }
        let millis = rand::thread_rng()
            .gen_range(self.min_delay.as_millis() as u64..=self.max_delay.as_millis() as u64);
        Duration::from_millis(millis)
    }
}

/// Identifiers not yet in the checkpoint set, in input order, first
/// occurrence only.
pub fn pending_identifiers(identifiers: &[String], handled: &HashSet<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    identifiers
        .iter()
        .filter(|id| !handled.contains(id.as_str()))
        .filter(|id| seen.insert(id.as_str()))
        .cloned()
        .collect()
}

pub struct BatchScheduler<R, C, S, K>
where
    R: RegistryClient,
    C: CheckpointStore,
    S: TableSink,
    K: Clock,
{
    client: R,
    checkpoints: C,
    sink: S,
    clock: K,
    settings: SchedulerSettings,
    state: SchedulerState,
}

impl<R, C, S, K> BatchScheduler<R, C, S, K>
where
    R: RegistryClient,
    C: CheckpointStore,
    S: TableSink,
    K: Clock,
{
    pub fn new(client: R, checkpoints: C, sink: S, clock: K, settings: SchedulerSettings) -> Self {
        Self {
            client,
            checkpoints,
            sink,
            clock,
            settings,
            state: SchedulerState::Idle,
        }
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn checkpoints(&self) -> &C {
        &self.checkpoints
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Resume filter: all identifiers minus the checkpoint set.
    pub fn pending(&self, identifiers: &[String]) -> Result<Vec<String>> {
        let handled = self.checkpoints.load()?;
        Ok(pending_identifiers(identifiers, &handled))
    }

    fn budget_exceeded(&self) -> bool {
        self.clock.now().saturating_duration_since(self.settings.started_at)
            > self.settings.time_budget
    }

    /// Runs the loop over `identifiers` (the full input list; handled ones
    /// are filtered out here) and flushes the accumulated tables.
    pub async fn run(&mut self, identifiers: &[String]) -> Result<RunReport> {
        let pending = self.pending(identifiers)?;
        let total = pending.len();
        tracing::info!(
            "🚀 {} identifiers in input, {} already handled, {} pending",
            identifiers.len(),
            identifiers.len().saturating_sub(total),
            total
        );

        self.state = SchedulerState::Running;
        let mut tables = HarvestTables::new();
        let mut stats = RunStats::default();
        let mut processed = Vec::new();
        let mut deferred = Vec::new();
        let mut since_flush = 0usize;
        let mut next_index = 0usize;

        while next_index < total {
            if self.budget_exceeded() {
                self.state = SchedulerState::TimeBudgetExceeded;
                break;
            }

            let identifier = &pending[next_index];
            next_index += 1;
            let percent = next_index as f64 / total as f64 * 100.0;
            tracing::info!("[{}/{}] {:.2}% Processing: {}", next_index, total, percent, identifier);

            let outcome = self.client.fetch(identifier).await;
            let checkpoint = match outcome {
                FetchOutcome::Found(payload) => {
                    let (rows, dropped) = parser::parse_payload(payload);
                    stats.found += 1;
                    stats.records_dropped += dropped;
                    if rows.is_empty() {
                        tracing::info!("    [-] {} returned no usable records", identifier);
                    } else {
                        tracing::info!(
                            "    [+] {} hospital / {} address / {} doctor rows",
                            rows.hospitals.len(),
                            rows.addresses.len(),
                            rows.doctors.len()
                        );
                        tables.append(rows);
                        since_flush += 1;
                    }
                    true
                }
                FetchOutcome::NotFound => {
                    stats.not_found += 1;
                    tracing::info!("    [-] {} not found", identifier);
                    true
                }
                FetchOutcome::Failed { reason } => {
                    stats.failed += 1;
                    tracing::warn!("    [!] {} failed: {}", identifier, reason);
                    self.settings.on_transient_error == TransientErrorPolicy::Checkpoint
                }
            };

            if checkpoint {
                if let Err(e) = self.checkpoints.record(identifier) {
                    tracing::error!("❌ Checkpoint write failed for {}: {}", identifier, e);
                    // 已寫入檢查點的識別碼不會再被抓取，先把收集到的資料寫出
                    if !tables.is_empty() {
                        if let Err(flush_error) = self.sink.flush(&tables).await {
                            tracing::error!("❌ Flush after checkpoint failure also failed: {}", flush_error);
                        }
                    }
                    self.state = SchedulerState::Finished;
                    return Err(e);
                }
                processed.push(identifier.clone());
            } else {
                deferred.push(identifier.clone());
            }

            if let Some(every) = self.settings.flush_every {
                if since_flush >= every {
                    since_flush = 0;
                    self.snapshot(&tables).await;
                }
            }

            let delay = self.settings.next_delay();
            self.clock.sleep(delay).await;
        }

        if self.state == SchedulerState::Running {
            self.state = SchedulerState::Drained;
        }
        let stop_reason = match self.state {
            SchedulerState::TimeBudgetExceeded => StopReason::TimeBudgetExceeded,
            _ => StopReason::Drained,
        };
        let remaining = total - next_index;

        match stop_reason {
            StopReason::TimeBudgetExceeded => {
                tracing::warn!(
                    "⏰ Time budget of {:?} exceeded, {} identifiers left for the next run",
                    self.settings.time_budget,
                    remaining
                );
                let signal = ContinuationSignal {
                    created_at: chrono::Utc::now(),
                    processed_this_run: processed.len(),
                    remaining,
                };
                if let Err(e) = self.sink.signal_continuation(&signal).await {
                    tracing::error!("❌ Failed to write continuation signal: {}", e);
                }
            }
            StopReason::Drained => {
                tracing::info!("✅ All pending identifiers handled");
                if let Err(e) = self.sink.clear_continuation().await {
                    tracing::warn!("Failed to remove stale continuation signal: {}", e);
                }
            }
        }

        stats.hospital_rows = tables.hospitals.len();
        stats.address_rows = tables.addresses.len();
        stats.doctor_rows = tables.doctors.len();

        let output_path = if tables.is_empty() {
            tracing::info!("No rows collected this run, nothing to write");
            None
        } else {
            Some(self.sink.flush(&tables).await?)
        };
        drop(tables);
        self.state = SchedulerState::Finished;

        Ok(RunReport {
            stop_reason,
            processed,
            deferred,
            remaining,
            stats,
            output_path,
        })
    }

    async fn snapshot(&self, tables: &HarvestTables) {
        match self.sink.flush(tables).await {
            Ok(path) => tracing::debug!("Snapshot written to {}", path),
            Err(e) => tracing::warn!("Snapshot flush failed, continuing: {}", e),
        }
    }
}
