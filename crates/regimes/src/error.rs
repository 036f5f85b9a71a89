use thiserror::Error;

#[derive(Error, Debug)]
pub enum RegimeError {
    #[error("Invalid regime thresholds: {0}")]
    InvalidThresholds(String),
}
