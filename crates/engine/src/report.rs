//! Per-run accounting.

use chrono::NaiveDate;
use core_types::RunStatus;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What one pipeline run did, stage by stage. Emitted at the end of every
/// run for the log and the CLI.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub date: NaiveDate,
    pub features_loaded: usize,
    pub baselines_computed: usize,
    /// Scope/window pairs skipped for insufficient data.
    pub scopes_skipped: usize,
    pub regimes_classified: usize,
    pub regime_changes: usize,
    pub kpi_rows: usize,
    pub risk_rows: usize,
    pub candidates_detected: usize,
    pub opportunities_scored: usize,
    pub opportunities_closed: u64,
    pub elapsed_ms: u128,
    pub status: RunStatus,
}

impl RunReport {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            date,
            features_loaded: 0,
            baselines_computed: 0,
            scopes_skipped: 0,
            regimes_classified: 0,
            regime_changes: 0,
            kpi_rows: 0,
            risk_rows: 0,
            candidates_detected: 0,
            opportunities_scored: 0,
            opportunities_closed: 0,
            elapsed_ms: 0,
            status: RunStatus::Success,
        }
    }
}
