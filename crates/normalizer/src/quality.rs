use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use core_types::{Feature, RejectReason, RunStatus, SourceKind};

/// Raw fields whose completeness is tracked for observability.
const TRACKED_FIELDS: [&str; 7] = [
    "project",
    "building",
    "property_type",
    "offplan",
    "days_on_market",
    "price_change_count",
    "geo",
];

/// Accept/reject counters and per-field completeness for one normalization
/// batch. Threaded through the stage as a value and merged into the run
/// report, rather than living in a global logger.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QualityAccumulator {
    pub total: u64,
    pub accepted: u64,
    pub rejected: u64,
    pub reject_reasons: BTreeMap<String, u64>,
    field_non_null: BTreeMap<String, u64>,
}

impl QualityAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_accept(&mut self, feature: &Feature) {
        self.total += 1;
        self.accepted += 1;

        let mut bump = |field: &str, present: bool| {
            if present {
                *self.field_non_null.entry(field.to_string()).or_insert(0) += 1;
            }
        };
        bump("project", feature.project.is_some());
        bump("building", feature.building.is_some());
        bump("property_type", feature.property_type.is_some());
        bump("offplan", true);
        bump(
            "days_on_market",
            feature.days_on_market.is_some() || feature.source == SourceKind::Transaction,
        );
        bump("price_change_count", true);
        bump("geo", feature.geo.is_some());
    }

    pub fn record_reject(&mut self, reason: RejectReason) {
        self.total += 1;
        self.rejected += 1;
        *self
            .reject_reasons
            .entry(reason.as_str().to_string())
            .or_insert(0) += 1;
    }

    pub fn merge(&mut self, other: &QualityAccumulator) {
        self.total += other.total;
        self.accepted += other.accepted;
        self.rejected += other.rejected;
        for (reason, count) in &other.reject_reasons {
            *self.reject_reasons.entry(reason.clone()).or_insert(0) += count;
        }
        for (field, count) in &other.field_non_null {
            *self.field_non_null.entry(field.clone()).or_insert(0) += count;
        }
    }

    pub fn rejection_rate(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.rejected as f64 / self.total as f64
    }

    /// Finalizes the counters into the quality report for this batch.
    pub fn report(&self) -> QualityReport {
        let completeness_pct = TRACKED_FIELDS
            .iter()
            .map(|field| {
                let pct = if self.accepted == 0 {
                    0.0
                } else {
                    let non_null = self.field_non_null.get(*field).copied().unwrap_or(0);
                    non_null as f64 / self.accepted as f64 * 100.0
                };
                (field.to_string(), pct)
            })
            .collect();

        let status = if self.rejection_rate() > 0.5 {
            RunStatus::Warning
        } else {
            RunStatus::Success
        };

        QualityReport {
            total: self.total,
            accepted: self.accepted,
            rejected: self.rejected,
            reject_reasons: self.reject_reasons.clone(),
            completeness_pct,
            status,
        }
    }
}

/// The aggregate quality picture of one ingest batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityReport {
    pub total: u64,
    pub accepted: u64,
    pub rejected: u64,
    pub reject_reasons: BTreeMap<String, u64>,
    pub completeness_pct: BTreeMap<String, f64>,
    pub status: RunStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejection_rate_over_half_degrades_status() {
        let mut quality = QualityAccumulator::new();
        quality.record_reject(RejectReason::MissingPrice);
        quality.record_reject(RejectReason::Outlier);
        quality.record_reject(RejectReason::Outlier);
        assert_eq!(quality.report().status, RunStatus::Warning);
        assert_eq!(quality.report().reject_reasons["outlier"], 2);
    }

    #[test]
    fn empty_batch_reports_success() {
        let quality = QualityAccumulator::new();
        let report = quality.report();
        assert_eq!(report.status, RunStatus::Success);
        assert_eq!(report.total, 0);
    }
}
