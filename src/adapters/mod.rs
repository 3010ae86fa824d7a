// Adapters: concrete implementations of the domain ports (filesystem, http, csv/zip)

pub mod checkpoint;
pub mod http;
pub mod input;
pub mod output;
pub mod storage;

pub use checkpoint::FileCheckpointStore;
pub use http::HttpRegistryClient;
pub use input::load_identifiers;
pub use output::RunOutputWriter;
pub use storage::LocalStorage;
