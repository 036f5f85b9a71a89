//! # Skyline Regime Classifier
//!
//! Maps a `MarketBaseline` into a qualitative market-phase label with a
//! confidence score.
//!
//! The five rules are evaluated in strict priority order; the first match
//! wins. Boundary semantics are a calibration contract: every threshold comes
//! from `RegimeThresholds`, and tuning them against historical labels is
//! expected, not a bug.

use serde::Serialize;

use configuration::RegimeThresholds;
use core_types::{BandLevel, MarketBaseline, Regime, TrendLabel};

// Declare the modules that constitute this crate.
pub mod error;

// Re-export the key components to create a clean, public-facing API.
pub use error::RegimeError;

/// A classification result before being keyed to a date and location.
#[derive(Debug, Clone, Serialize)]
pub struct Classification {
    pub regime: Regime,
    /// Normalized margin over the triggering thresholds, clamped to [0, 1].
    pub confidence: f64,
    pub price_trend: TrendLabel,
    pub volume_trend: TrendLabel,
    pub dispersion_level: BandLevel,
    pub volatility_level: BandLevel,
}

/// Threshold-driven market-phase classifier.
#[derive(Debug, Clone)]
pub struct RegimeClassifier {
    thresholds: RegimeThresholds,
}

impl RegimeClassifier {
    pub fn new(thresholds: RegimeThresholds) -> Self {
        Self { thresholds }
    }

    pub fn classify(&self, baseline: &MarketBaseline) -> Classification {
        let t = &self.thresholds;
        // A scope with no preceding window has no measurable momentum; treat
        // it as flat rather than excluding it from classification.
        let momentum = baseline.momentum.unwrap_or(0.0);
        let dispersion = baseline.dispersion;
        let volatility = baseline.volatility;

        let (regime, confidence) = if momentum >= t.momentum_up && dispersion < t.dispersion_medium
        {
            let margin = f64::min(
                margin_above(momentum, t.momentum_up),
                margin_below(dispersion, t.dispersion_medium),
            );
            (Regime::Expansion, margin)
        } else if momentum <= t.momentum_down && volatility >= t.volatility_high {
            let margin = f64::min(
                margin_below(momentum, t.momentum_down),
                margin_above(volatility, t.volatility_high),
            );
            (Regime::Retournement, margin)
        } else if momentum <= t.momentum_down && dispersion >= t.dispersion_high {
            let margin = f64::min(
                margin_below(momentum, t.momentum_down),
                margin_above(dispersion, t.dispersion_high),
            );
            (Regime::Distribution, margin)
        } else if momentum.abs() < t.momentum_up
            && dispersion < t.dispersion_medium
            && volatility < t.volatility_medium
        {
            let margin = f64::min(
                margin_below(momentum.abs(), t.momentum_up),
                f64::min(
                    margin_below(dispersion, t.dispersion_medium),
                    margin_below(volatility, t.volatility_medium),
                ),
            );
            (Regime::Accumulation, margin)
        } else {
            (Regime::Neutral, 0.5)
        };

        Classification {
            regime,
            confidence: confidence.clamp(0.0, 1.0),
            price_trend: trend(momentum, t.momentum_up, t.momentum_down),
            volume_trend: trend(
                baseline.volume_momentum.unwrap_or(0.0),
                t.momentum_up,
                t.momentum_down,
            ),
            dispersion_level: band(dispersion, t.dispersion_medium, t.dispersion_high),
            volatility_level: band(volatility, t.volatility_medium, t.volatility_high),
        }
    }
}

/// How far `value` sits above `threshold`, normalized by the threshold
/// magnitude.
fn margin_above(value: f64, threshold: f64) -> f64 {
    let scale = threshold.abs().max(f64::EPSILON);
    (value - threshold) / scale
}

/// How far `value` sits below `threshold`, normalized by the threshold
/// magnitude.
fn margin_below(value: f64, threshold: f64) -> f64 {
    let scale = threshold.abs().max(f64::EPSILON);
    (threshold - value) / scale
}

fn trend(value: f64, up: f64, down: f64) -> TrendLabel {
    if value >= up {
        TrendLabel::Up
    } else if value <= down {
        TrendLabel::Down
    } else {
        TrendLabel::Flat
    }
}

fn band(value: f64, medium: f64, high: f64) -> BandLevel {
    if value >= high {
        BandLevel::High
    } else if value >= medium {
        BandLevel::Medium
    } else {
        BandLevel::Low
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use core_types::{RoomsBucket, ScopeKey, Window};
    use rust_decimal::Decimal;

    fn baseline(momentum: Option<f64>, dispersion: f64, volatility: f64) -> MarketBaseline {
        MarketBaseline {
            date: NaiveDate::from_ymd_opt(2025, 6, 30).unwrap(),
            scope: ScopeKey::new("Marina", None, None, RoomsBucket::Two),
            window: Window::W30,
            median_ppsqm: 1000.0,
            p25_ppsqm: 950.0,
            p75_ppsqm: 1050.0,
            mean_ppsqm: 1000.0,
            tx_count: 20,
            total_volume: Decimal::from(20_000_000),
            momentum,
            volume_momentum: Some(0.0),
            volatility,
            dispersion,
        }
    }

    fn classifier() -> RegimeClassifier {
        RegimeClassifier::new(RegimeThresholds::default())
    }

    #[test]
    fn strong_momentum_with_tight_dispersion_is_expansion() {
        let result = classifier().classify(&baseline(Some(0.08), 0.10, 0.08));
        assert_eq!(result.regime, Regime::Expansion);
        assert!(result.confidence > 0.0 && result.confidence <= 1.0);
        assert_eq!(result.price_trend, TrendLabel::Up);
    }

    #[test]
    fn falling_volatile_market_is_retournement() {
        let result = classifier().classify(&baseline(Some(-0.08), 0.10, 0.22));
        assert_eq!(result.regime, Regime::Retournement);
        assert_eq!(result.volatility_level, BandLevel::High);
    }

    #[test]
    fn falling_dispersed_market_is_distribution() {
        let result = classifier().classify(&baseline(Some(-0.08), 0.30, 0.12));
        assert_eq!(result.regime, Regime::Distribution);
    }

    #[test]
    fn quiet_flat_market_is_accumulation() {
        let result = classifier().classify(&baseline(Some(0.01), 0.05, 0.05));
        assert_eq!(result.regime, Regime::Accumulation);
        assert_eq!(result.price_trend, TrendLabel::Flat);
        assert_eq!(result.dispersion_level, BandLevel::Low);
    }

    #[test]
    fn anything_else_is_neutral_at_half_confidence() {
        // Positive momentum but dispersion too wide for expansion.
        let result = classifier().classify(&baseline(Some(0.08), 0.20, 0.12));
        assert_eq!(result.regime, Regime::Neutral);
        assert_eq!(result.confidence, 0.5);
    }

    #[test]
    fn missing_momentum_reads_as_flat() {
        let result = classifier().classify(&baseline(None, 0.05, 0.05));
        assert_eq!(result.regime, Regime::Accumulation);
    }

    #[test]
    fn confidence_is_clamped_to_unit_interval() {
        let result = classifier().classify(&baseline(Some(0.50), 0.01, 0.01));
        assert_eq!(result.regime, Regime::Expansion);
        assert!(result.confidence <= 1.0);
    }
}
