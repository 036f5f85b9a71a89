use thiserror::Error;

/// Defines the specific, structured errors that can occur during anomaly
/// detection and strategy scoring.
#[derive(Error, Debug)]
pub enum OpportunityError {
    /// Occurs when a candidate cannot be scored from the available data.
    #[error("Scoring failed for candidate '{source_id}': {reason}")]
    Scoring { source_id: String, reason: String },

    /// Occurs when the configured scoring weights are inconsistent.
    #[error("Invalid scoring configuration: {0}")]
    InvalidConfig(String),
}
