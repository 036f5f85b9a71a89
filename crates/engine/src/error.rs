use datastore::StoreError;
use thiserror::Error;

/// Defines the specific, structured errors that can occur while running the
/// analytics pipeline.
#[derive(Error, Debug)]
pub enum EngineError {
    /// A storage read or write failed. Wraps the datastore's own error.
    #[error("Datastore operation failed: {0}")]
    Store(#[from] StoreError),

    /// A spawned baseline task could not be joined.
    #[error("Baseline task for scope '{scope}' failed: {reason}")]
    BaselineTask { scope: String, reason: String },

    /// The run was asked to process an empty or unusable input set.
    #[error("Nothing to process: {0}")]
    EmptyInput(String),
}
