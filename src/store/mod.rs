use std::io;

use crate::manager::ModelVersion;

/// Local filesystem store
pub mod fs;

pub use fs::FsModelStore;

/// Durable persistence of a whole `ModelVersion` as a single unit
pub trait ModelStore<P>: Send + Sync {
    /// Load the persisted version
    fn load(&self) -> Result<ModelVersion<P>, StoreError>;

    /// Replace the persisted version. Readers must observe either the previous or the new
    /// version in full, even if the process dies mid-save.
    fn save(&self, version: &ModelVersion<P>) -> Result<(), StoreError>;
}

/// Store Error
#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    /// The underlying storage failed
    #[error("storage i/o failed: {0}")]
    Io(#[from] io::Error),

    /// The version could not be encoded or decoded
    #[error("unable to (de)serialize model: {0}")]
    Serialize(#[from] serde_json::Error),

    /// The stored data is not in a format this build understands
    #[error("unsupported model format: {0}")]
    Format(String),
}
