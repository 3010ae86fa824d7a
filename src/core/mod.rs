pub mod engine;
pub mod normalizer;
pub mod parser;
pub mod scheduler;
pub mod stopwords;

pub use crate::domain::ports::{CheckpointStore, Clock, RegistryClient, Storage, TableSink};
pub use crate::utils::error::Result;
