use crate::domain::model::{ContinuationSignal, FetchOutcome, HarvestTables};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::collections::HashSet;
use std::time::{Duration, Instant};

pub trait Storage: Send + Sync {
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
    /// Removing a file that does not exist is not an error.
    fn remove_file(&self, path: &str) -> impl std::future::Future<Output = Result<()>> + Send;
}

/// Remote per-identifier lookup. Never fails: transport problems are folded
/// into [`FetchOutcome::Failed`].
#[async_trait]
pub trait RegistryClient: Send + Sync {
    async fn fetch(&self, identifier: &str) -> FetchOutcome;
}

/// Durable, append-only set of handled identifiers.
pub trait CheckpointStore: Send {
    fn load(&self) -> Result<HashSet<String>>;
    fn record(&mut self, identifier: &str) -> Result<()>;
}

/// Time source for the budget check and the inter-request delay.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send;
}

/// Destination of the run's tables and of the continuation signal.
#[async_trait]
pub trait TableSink: Send + Sync {
    /// Persists the tables, returning where they went.
    async fn flush(&self, tables: &HarvestTables) -> Result<String>;
    async fn signal_continuation(&self, signal: &ContinuationSignal) -> Result<()>;
    async fn clear_continuation(&self) -> Result<()>;
}
