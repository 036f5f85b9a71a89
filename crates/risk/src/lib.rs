//! # Skyline Risk Summarizer
//!
//! Condenses KPI values into a per-zone risk picture: three banded risk
//! levels, a weighted overall score, and human-readable risk factors for
//! downstream briefs.

use tracing::debug;

use configuration::RiskThresholds;
use core_types::{LocationKey, RiskLevel, RiskSummary};

// Declare the modules that constitute this crate.
pub mod error;

// Re-export the key components to create a clean, public-facing API.
pub use error::RiskError;

const SUPPLY_WEIGHT: f64 = 0.40;
const VOLATILITY_WEIGHT: f64 = 0.35;
const DIVERGENCE_WEIGHT: f64 = 0.25;

/// Maps SPI, volatility and |TLS| into a `RiskSummary` per location.
#[derive(Debug, Clone)]
pub struct RiskSummarizer {
    thresholds: RiskThresholds,
}

impl RiskSummarizer {
    pub fn new(thresholds: RiskThresholds) -> Self {
        Self { thresholds }
    }

    pub fn summarize(
        &self,
        date: chrono::NaiveDate,
        location: LocationKey,
        spi: Option<f64>,
        volatility: Option<f64>,
        tls: Option<f64>,
    ) -> RiskSummary {
        let t = &self.thresholds;
        let tls_abs = tls.map(f64::abs);

        let supply_risk = classify(spi, t.supply_low, t.supply_high);
        let volatility_risk = classify(volatility, t.volatility_low, t.volatility_high);
        let divergence_risk = classify(tls_abs, t.divergence_low, t.divergence_high);

        let risk_score = SUPPLY_WEIGHT * level_score(supply_risk)
            + VOLATILITY_WEIGHT * level_score(volatility_risk)
            + DIVERGENCE_WEIGHT * level_score(divergence_risk);

        let mut risk_factors = Vec::new();
        if let Some(factor) = supply_factor(supply_risk, spi) {
            risk_factors.push(factor);
        }
        if let Some(factor) = volatility_factor(volatility_risk, volatility) {
            risk_factors.push(factor);
        }
        if let Some(factor) = divergence_factor(divergence_risk, tls_abs) {
            risk_factors.push(factor);
        }

        debug!(%location, risk_score, "risk summarized");

        RiskSummary {
            date,
            location,
            supply_risk,
            volatility_risk,
            divergence_risk,
            spi,
            volatility,
            tls_abs,
            risk_score,
            risk_factors,
        }
    }
}

/// value < low -> LOW; low <= value <= high -> MEDIUM; value > high -> HIGH;
/// missing -> UNKNOWN.
fn classify(value: Option<f64>, low: f64, high: f64) -> RiskLevel {
    match value {
        None => RiskLevel::Unknown,
        Some(v) if v < low => RiskLevel::Low,
        Some(v) if v > high => RiskLevel::High,
        Some(_) => RiskLevel::Medium,
    }
}

fn level_score(level: RiskLevel) -> f64 {
    match level {
        RiskLevel::Low => 20.0,
        RiskLevel::Medium => 50.0,
        RiskLevel::High => 85.0,
        RiskLevel::Unknown => 50.0,
    }
}

fn supply_factor(level: RiskLevel, spi: Option<f64>) -> Option<String> {
    if !matches!(level, RiskLevel::Medium | RiskLevel::High) {
        return None;
    }
    Some(format!(
        "Supply pressure is {} (SPI {:.1}): incoming units could outpace absorption",
        level,
        spi.unwrap_or_default()
    ))
}

fn volatility_factor(level: RiskLevel, volatility: Option<f64>) -> Option<String> {
    if !matches!(level, RiskLevel::Medium | RiskLevel::High) {
        return None;
    }
    Some(format!(
        "Price volatility is {} ({:.1}% coefficient of variation)",
        level,
        volatility.unwrap_or_default() * 100.0
    ))
}

fn divergence_factor(level: RiskLevel, tls_abs: Option<f64>) -> Option<String> {
    if !matches!(level, RiskLevel::Medium | RiskLevel::High) {
        return None;
    }
    Some(format!(
        "Listing prices diverge from closed transactions by {} ({:.1}%)",
        level,
        tls_abs.unwrap_or_default() * 100.0
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn summarize(spi: Option<f64>, vol: Option<f64>, tls: Option<f64>) -> RiskSummary {
        RiskSummarizer::new(RiskThresholds::default()).summarize(
            NaiveDate::from_ymd_opt(2025, 6, 30).unwrap(),
            LocationKey::community_only("Marina"),
            spi,
            vol,
            tls,
        )
    }

    #[test]
    fn all_low_scores_below_thirty() {
        let summary = summarize(Some(10.0), Some(0.05), Some(0.02));
        assert_eq!(summary.supply_risk, RiskLevel::Low);
        assert_eq!(summary.volatility_risk, RiskLevel::Low);
        assert_eq!(summary.divergence_risk, RiskLevel::Low);
        assert!(summary.risk_score < 30.0);
        assert!(summary.risk_factors.is_empty());
    }

    #[test]
    fn all_high_scores_above_eighty() {
        let summary = summarize(Some(90.0), Some(0.40), Some(-0.35));
        assert_eq!(summary.supply_risk, RiskLevel::High);
        assert_eq!(summary.volatility_risk, RiskLevel::High);
        assert_eq!(summary.divergence_risk, RiskLevel::High);
        assert!(summary.risk_score > 80.0);
        assert_eq!(summary.risk_factors.len(), 3);
    }

    #[test]
    fn band_edges_are_medium() {
        let summary = summarize(Some(30.0), Some(0.25), Some(0.10));
        assert_eq!(summary.supply_risk, RiskLevel::Medium);
        assert_eq!(summary.volatility_risk, RiskLevel::Medium);
        assert_eq!(summary.divergence_risk, RiskLevel::Medium);
    }

    #[test]
    fn missing_values_are_unknown_at_neutral_weight() {
        let summary = summarize(None, None, None);
        assert_eq!(summary.supply_risk, RiskLevel::Unknown);
        assert_eq!(summary.risk_score, 50.0);
        assert!(summary.risk_factors.is_empty());
    }

    #[test]
    fn divergence_uses_absolute_spread() {
        let summary = summarize(Some(10.0), Some(0.05), Some(-0.30));
        assert_eq!(summary.divergence_risk, RiskLevel::High);
        assert_eq!(summary.tls_abs, Some(0.30));
    }
}
