use thiserror::Error;

#[derive(Error, Debug)]
pub enum NormalizerError {
    #[error("Invalid normalizer parameters: {0}")]
    InvalidParameters(String),
}
