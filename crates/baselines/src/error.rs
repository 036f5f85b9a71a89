use thiserror::Error;

#[derive(Error, Debug)]
pub enum BaselineError {
    #[error("Baseline calculation failed for {scope}: {message}")]
    Calculation { scope: String, message: String },
}
