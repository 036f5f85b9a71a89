use thiserror::Error;

#[derive(Error, Debug)]
pub enum RiskError {
    #[error("Invalid risk thresholds: {0}")]
    InvalidThresholds(String),
}
