//! # Skyline Baseline Calculator
//!
//! Aggregates normalized features into windowed market statistics, the
//! foundation every later stage builds on.
//!
//! ## Architectural Principles
//!
//! - **Layer 1 Logic:** a pure, stateless calculator. It receives features
//!   and a date; it knows nothing about storage or the pipeline.
//! - **Independent snapshots:** each window's statistics are computed from the
//!   features dated within that window, never derived from another window.
//! - **Transactions only:** listings inform KPIs downstream but never baseline
//!   statistics.
//!
//! ## Public API
//!
//! - `BaselineCalculator`: the stage implementation.
//! - `BaselineBatch`: computed baselines plus the scope/windows skipped for
//!   insufficient data.
//! - `stats`: shared descriptive statistics used across the workspace.

use chrono::{Duration, NaiveDate};
use rust_decimal::Decimal;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

use configuration::BaselineConfig;
use core_types::{Feature, MarketBaseline, ScopeKey, SourceKind, Window};

// Declare the modules that constitute this crate.
pub mod error;
pub mod stats;

// Re-export the key components to create a clean, public-facing API.
pub use error::BaselineError;

/// The output of one baseline stage pass.
#[derive(Debug, Clone, Default)]
pub struct BaselineBatch {
    pub baselines: Vec<MarketBaseline>,
    /// Scope/window pairs dropped with `insufficient_data`.
    pub skipped: Vec<(ScopeKey, Window)>,
}

/// Computes windowed market statistics per scope.
#[derive(Debug, Clone)]
pub struct BaselineCalculator {
    config: BaselineConfig,
}

impl BaselineCalculator {
    pub fn new(config: BaselineConfig) -> Self {
        Self { config }
    }

    /// Every distinct scope observed in transactions over the trailing
    /// lookback period ending at `date`.
    pub fn discover_scopes(&self, date: NaiveDate, features: &[Feature]) -> BTreeSet<ScopeKey> {
        let cutoff = date - Duration::days(self.config.scope_lookback_days);
        features
            .iter()
            .filter(|f| {
                f.source == SourceKind::Transaction
                    && f.record_date > cutoff
                    && f.record_date <= date
            })
            .map(|f| f.scope())
            .collect()
    }

    /// Computes all windows for all discovered scopes. `features` must cover
    /// at least twice the longest window before `date` so momentum has its
    /// preceding window available.
    pub fn compute(&self, date: NaiveDate, features: &[Feature]) -> BaselineBatch {
        let mut by_scope: BTreeMap<ScopeKey, Vec<&Feature>> = BTreeMap::new();
        for feature in features {
            if feature.source == SourceKind::Transaction {
                by_scope.entry(feature.scope()).or_default().push(feature);
            }
        }

        let scopes = self.discover_scopes(date, features);
        let mut batch = BaselineBatch::default();
        for scope in scopes {
            let scope_features = by_scope.get(&scope).map(Vec::as_slice).unwrap_or(&[]);
            for window in Window::ALL {
                match self.compute_scope_window(date, &scope, window, scope_features) {
                    Some(baseline) => batch.baselines.push(baseline),
                    None => {
                        debug!(%scope, %window, "insufficient_data");
                        batch.skipped.push((scope.clone(), window));
                    }
                }
            }
        }
        batch
    }

    /// One scope, one window. `None` when the window holds fewer than the
    /// minimum sample size.
    pub fn compute_scope_window(
        &self,
        date: NaiveDate,
        scope: &ScopeKey,
        window: Window,
        scope_features: &[&Feature],
    ) -> Option<MarketBaseline> {
        let window_start = date - Duration::days(window.days());
        let previous_start = window_start - Duration::days(window.days());

        let current: Vec<&Feature> = scope_features
            .iter()
            .copied()
            .filter(|f| f.record_date > window_start && f.record_date <= date)
            .collect();
        if current.len() < self.config.min_samples {
            return None;
        }

        let prices: Vec<f64> = current.iter().map(|f| f.price_per_sqm).collect();
        let median = stats::median(&prices)?;
        let p25 = stats::percentile(&prices, 0.25)?;
        let p75 = stats::percentile(&prices, 0.75)?;
        let mean = stats::mean(&prices)?;
        let total_volume: Decimal = current.iter().map(|f| f.price).sum();

        // The preceding equal-length window feeds momentum; any data at all is
        // enough, missing data yields null rather than zero.
        let previous: Vec<f64> = scope_features
            .iter()
            .filter(|f| f.record_date > previous_start && f.record_date <= window_start)
            .map(|f| f.price_per_sqm)
            .collect();
        let momentum = stats::median(&previous)
            .filter(|m| *m > 0.0)
            .map(|previous_median| (median - previous_median) / previous_median);
        let volume_momentum = if previous.is_empty() {
            None
        } else {
            Some((current.len() as f64 - previous.len() as f64) / previous.len() as f64)
        };

        let volatility = stats::coefficient_of_variation(&prices).unwrap_or(0.0);
        let dispersion = if median > 0.0 { (p75 - p25) / median } else { 0.0 };

        Some(MarketBaseline {
            date,
            scope: scope.clone(),
            window,
            median_ppsqm: median,
            p25_ppsqm: p25,
            p75_ppsqm: p75,
            mean_ppsqm: mean,
            tx_count: current.len() as u32,
            total_volume,
            momentum,
            volume_momentum,
            volatility,
            dispersion,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_types::RoomsBucket;
    use rust_decimal::Decimal;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 30).unwrap()
    }

    fn tx(id: u32, days_ago: i64, ppsqm: f64) -> Feature {
        Feature {
            source: SourceKind::Transaction,
            source_id: format!("tx-{id}"),
            record_date: date() - Duration::days(days_ago),
            community: "Marina".to_string(),
            project: None,
            building: None,
            rooms: RoomsBucket::Two,
            property_type: None,
            price: Decimal::from((ppsqm * 100.0) as i64),
            area_sqm: Decimal::from(100),
            price_per_sqm: ppsqm,
            offplan: false,
            days_on_market: None,
            price_change_count: 0,
            geo: None,
        }
    }

    fn calculator() -> BaselineCalculator {
        BaselineCalculator::new(BaselineConfig::default())
    }

    #[test]
    fn skips_scopes_below_minimum_samples() {
        let features = vec![tx(1, 1, 1000.0), tx(2, 2, 1100.0)];
        let batch = calculator().compute(date(), &features);
        assert!(batch.baselines.is_empty());
        assert_eq!(batch.skipped.len(), 3); // all three windows
    }

    #[test]
    fn computes_statistics_for_a_window() {
        let features = vec![
            tx(1, 1, 900.0),
            tx(2, 2, 1000.0),
            tx(3, 3, 1100.0),
            tx(4, 4, 1000.0),
            tx(5, 5, 1000.0),
        ];
        let batch = calculator().compute(date(), &features);
        let weekly = batch
            .baselines
            .iter()
            .find(|b| b.window == Window::W7)
            .unwrap();
        assert_eq!(weekly.tx_count, 5);
        assert_eq!(weekly.median_ppsqm, 1000.0);
        assert!(weekly.volatility > 0.0);
        assert!(weekly.dispersion >= 0.0);
        // No transactions in the preceding 7-day window.
        assert_eq!(weekly.momentum, None);
    }

    #[test]
    fn momentum_compares_against_preceding_window() {
        // Current 7-day window at 1100, preceding 7-day window at 1000.
        let mut features = vec![tx(1, 1, 1100.0), tx(2, 2, 1100.0), tx(3, 3, 1100.0)];
        features.extend([tx(4, 9, 1000.0), tx(5, 10, 1000.0), tx(6, 11, 1000.0)]);

        let batch = calculator().compute(date(), &features);
        let weekly = batch
            .baselines
            .iter()
            .find(|b| b.window == Window::W7)
            .unwrap();
        let momentum = weekly.momentum.unwrap();
        assert!((momentum - 0.10).abs() < 1e-9);
        assert_eq!(weekly.volume_momentum, Some(0.0));
    }

    #[test]
    fn windows_are_independent_snapshots() {
        let mut features: Vec<Feature> = (0..10).map(|i| tx(i, 1 + i as i64, 1000.0)).collect();
        // Older cluster at a different level, only visible to the 90-day window.
        features.extend((10..20).map(|i| tx(i, 40 + (i - 10) as i64, 2000.0)));

        let batch = calculator().compute(date(), &features);
        let monthly = batch
            .baselines
            .iter()
            .find(|b| b.window == Window::W30)
            .unwrap();
        let quarterly = batch
            .baselines
            .iter()
            .find(|b| b.window == Window::W90)
            .unwrap();
        assert_eq!(monthly.tx_count, 10);
        assert_eq!(quarterly.tx_count, 20);
        assert!(quarterly.median_ppsqm > monthly.median_ppsqm);
    }

    #[test]
    fn listings_never_enter_baselines() {
        let mut listing = tx(99, 1, 1000.0);
        listing.source = SourceKind::Listing;
        let features = vec![listing, tx(1, 1, 1000.0), tx(2, 2, 1000.0), tx(3, 3, 1000.0)];

        let batch = calculator().compute(date(), &features);
        let weekly = batch
            .baselines
            .iter()
            .find(|b| b.window == Window::W7)
            .unwrap();
        assert_eq!(weekly.tx_count, 3);
    }
}
