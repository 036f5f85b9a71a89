use thiserror::Error;

#[derive(Error, Debug)]
pub enum KpiError {
    #[error("KPI computation failed for {scope}: {message}")]
    Computation { scope: String, message: String },
}
