//! # Skyline KPI Computer
//!
//! Derives the eight cross-cutting indicators from baselines, regimes, rental
//! benchmarks and supply data. Every indicator is independently nullable: a
//! missing input or a non-positive denominator yields `None` for that KPI and
//! never fails the batch.
//!
//! ## The eight indicators
//!
//! - **TLS**: Transaction-to-Listing Spread
//! - **LAD**: Liquidity-Adjusted Discount
//! - **RSG**: Rental Stress Gap
//! - **SPI**: Supply Pressure Index (0-100)
//! - **GPI**: Geo-Premium Index
//! - **RCWM**: Regime-Confidence-Weighted Momentum
//! - **ORD**: Offplan Risk Delta
//! - **APS**: Anomaly Persistence Score

use chrono::NaiveDate;
use rust_decimal::prelude::ToPrimitive;

use configuration::KpiConfig;
use core_types::{KpiInputs, KpiSet, ScopeKey, Window};

// Declare the modules that constitute this crate.
pub mod error;

// Re-export the key components to create a clean, public-facing API.
pub use error::KpiError;

/// Stateless calculator for the eight indicators.
#[derive(Debug, Clone)]
pub struct KpiComputer {
    config: KpiConfig,
}

impl KpiComputer {
    pub fn new(config: KpiConfig) -> Self {
        Self { config }
    }

    /// Computes the full KPI row for one (scope, window, date). The inputs
    /// snapshot is stored alongside the values for auditability.
    pub fn compute(
        &self,
        date: NaiveDate,
        scope: ScopeKey,
        window: Window,
        inputs: KpiInputs,
    ) -> KpiSet {
        KpiSet {
            date,
            tls: transaction_listing_spread(&inputs),
            lad: liquidity_adjusted_discount(&inputs),
            rsg: rental_stress_gap(&inputs, self.config.target_yield),
            spi: supply_pressure_index(&inputs),
            gpi: geo_premium_index(&inputs),
            rcwm: confidence_weighted_momentum(&inputs),
            ord: offplan_risk_delta(&inputs),
            aps: anomaly_persistence(&inputs, window),
            scope,
            window,
            inputs,
        }
    }
}

/// (median_listing − median_tx) / median_tx.
fn transaction_listing_spread(inputs: &KpiInputs) -> Option<f64> {
    let tx = inputs.median_tx_ppsqm.filter(|v| *v > 0.0)?;
    let listing = inputs.median_listing_ppsqm?;
    Some((listing - tx) / tx)
}

/// discount × ln(1 + tx_count_30d). A discount in an illiquid scope is worth
/// far less than the same discount where exits are plentiful.
fn liquidity_adjusted_discount(inputs: &KpiInputs) -> Option<f64> {
    let discount = inputs.best_discount_pct?;
    Some(discount * (1.0 + inputs.tx_count_30d as f64).ln())
}

/// (median_rent − expected_rent) / expected_rent, with
/// expected_rent = ppsqm × area × target_yield.
fn rental_stress_gap(inputs: &KpiInputs, target_yield: f64) -> Option<f64> {
    let rent = inputs.median_annual_rent?.to_f64()?;
    let ppsqm = inputs.median_tx_ppsqm.filter(|v| *v > 0.0)?;
    let area = inputs.typical_area_sqm?.to_f64().filter(|v| *v > 0.0)?;

    let expected = ppsqm * area * target_yield;
    if expected <= 0.0 {
        return None;
    }
    Some((rent - expected) / expected)
}

/// min(100, planned_units / tx_count_12m × 50), neutral 50 when the scope had
/// no transactions over the trailing year.
fn supply_pressure_index(inputs: &KpiInputs) -> Option<f64> {
    if inputs.tx_count_12m == 0 {
        return Some(50.0);
    }
    let ratio = inputs.planned_units_12m as f64 / inputs.tx_count_12m as f64;
    Some((ratio * 50.0).min(100.0))
}

/// location_score × (1 + price_premium); the premium defaults to zero.
fn geo_premium_index(inputs: &KpiInputs) -> Option<f64> {
    let score = inputs.location_score?;
    Some(score * (1.0 + inputs.price_premium.unwrap_or(0.0)))
}

fn confidence_weighted_momentum(inputs: &KpiInputs) -> Option<f64> {
    Some(inputs.momentum? * inputs.regime_confidence?)
}

/// (median_offplan / median_ready) − 1.
fn offplan_risk_delta(inputs: &KpiInputs) -> Option<f64> {
    let ready = inputs.median_ready_ppsqm.filter(|v| *v > 0.0)?;
    let offplan = inputs.median_offplan_ppsqm?;
    Some(offplan / ready - 1.0)
}

/// days_anomaly_active / window_days.
fn anomaly_persistence(inputs: &KpiInputs, window: Window) -> Option<f64> {
    let days = window.days();
    if days == 0 {
        return None;
    }
    Some(inputs.days_anomaly_active as f64 / days as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_types::RoomsBucket;
    use rust_decimal::Decimal;

    fn compute(inputs: KpiInputs) -> KpiSet {
        KpiComputer::new(KpiConfig::default()).compute(
            NaiveDate::from_ymd_opt(2025, 6, 30).unwrap(),
            ScopeKey::new("Marina", None, None, RoomsBucket::Two),
            Window::W30,
            inputs,
        )
    }

    #[test]
    fn tls_matches_reference_value() {
        let kpis = compute(KpiInputs {
            median_tx_ppsqm: Some(1000.0),
            median_listing_ppsqm: Some(1200.0),
            ..Default::default()
        });
        assert!((kpis.tls.unwrap() - 0.20).abs() < 1e-9);
    }

    #[test]
    fn tls_is_null_on_zero_transaction_median() {
        let kpis = compute(KpiInputs {
            median_tx_ppsqm: Some(0.0),
            median_listing_ppsqm: Some(1200.0),
            ..Default::default()
        });
        assert_eq!(kpis.tls, None);
    }

    #[test]
    fn lad_matches_reference_value() {
        let kpis = compute(KpiInputs {
            best_discount_pct: Some(10.0),
            tx_count_30d: 20,
            ..Default::default()
        });
        // 10 × ln(21) ≈ 30.445
        assert!((kpis.lad.unwrap() - 30.445).abs() < 0.01);
    }

    #[test]
    fn rsg_compares_rent_against_expected_yield() {
        // Expected rent: 1000 × 100 × 0.06 = 6000; actual 6600 -> +10%.
        let kpis = compute(KpiInputs {
            median_tx_ppsqm: Some(1000.0),
            typical_area_sqm: Some(Decimal::from(100)),
            median_annual_rent: Some(Decimal::from(6600)),
            ..Default::default()
        });
        assert!((kpis.rsg.unwrap() - 0.10).abs() < 1e-9);
    }

    #[test]
    fn spi_defaults_to_neutral_without_transactions() {
        let kpis = compute(KpiInputs {
            planned_units_12m: 500,
            tx_count_12m: 0,
            ..Default::default()
        });
        assert_eq!(kpis.spi, Some(50.0));
    }

    #[test]
    fn spi_is_capped_at_one_hundred() {
        let kpis = compute(KpiInputs {
            planned_units_12m: 1000,
            tx_count_12m: 10,
            ..Default::default()
        });
        assert_eq!(kpis.spi, Some(100.0));

        let moderate = compute(KpiInputs {
            planned_units_12m: 10,
            tx_count_12m: 10,
            ..Default::default()
        });
        assert_eq!(moderate.spi, Some(50.0));
    }

    #[test]
    fn gpi_defaults_premium_to_zero() {
        let kpis = compute(KpiInputs {
            location_score: Some(80.0),
            ..Default::default()
        });
        assert_eq!(kpis.gpi, Some(80.0));

        let with_premium = compute(KpiInputs {
            location_score: Some(80.0),
            price_premium: Some(0.25),
            ..Default::default()
        });
        assert_eq!(with_premium.gpi, Some(100.0));
    }

    #[test]
    fn rcwm_needs_both_momentum_and_confidence() {
        let kpis = compute(KpiInputs {
            momentum: Some(0.08),
            regime_confidence: Some(0.5),
            ..Default::default()
        });
        assert!((kpis.rcwm.unwrap() - 0.04).abs() < 1e-9);

        let missing = compute(KpiInputs {
            momentum: Some(0.08),
            ..Default::default()
        });
        assert_eq!(missing.rcwm, None);
    }

    #[test]
    fn ord_guards_zero_ready_median() {
        let kpis = compute(KpiInputs {
            median_offplan_ppsqm: Some(1100.0),
            median_ready_ppsqm: Some(1000.0),
            ..Default::default()
        });
        assert!((kpis.ord.unwrap() - 0.10).abs() < 1e-9);

        let missing = compute(KpiInputs {
            median_offplan_ppsqm: Some(1100.0),
            median_ready_ppsqm: Some(0.0),
            ..Default::default()
        });
        assert_eq!(missing.ord, None);
    }

    #[test]
    fn aps_is_days_over_window() {
        let kpis = compute(KpiInputs {
            days_anomaly_active: 6,
            ..Default::default()
        });
        assert!((kpis.aps.unwrap() - 0.2).abs() < 1e-9);
    }
}
