//! Price anomaly detection.
//!
//! Scans recent transactions against their scope's 30-day baseline and
//! surfaces the ones priced materially below the median. A hit is only a
//! candidate: the strategy scorer decides what, if anything, it is worth.

use std::collections::HashMap;

use chrono::NaiveDate;
use configuration::DetectorConfig;
use core_types::{Feature, MarketBaseline, ScopeKey};
use tracing::debug;

/// A transaction priced below its scope baseline by at least the
/// configured discount, in a scope liquid enough to trust the median.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub feature: Feature,
    pub baseline_median: f64,
    pub discount_pct: f64,
    pub tx_count_30d: u32,
}

/// Percentage discount of `price_per_sqm` against a baseline median.
///
/// A non-positive median yields zero rather than a nonsensical ratio.
pub fn discount_pct(price_per_sqm: f64, baseline_median: f64) -> f64 {
    if baseline_median <= 0.0 {
        return 0.0;
    }
    (baseline_median - price_per_sqm) / baseline_median * 100.0
}

pub struct AnomalyDetector {
    config: DetectorConfig,
}

impl AnomalyDetector {
    pub fn new(config: DetectorConfig) -> Self {
        Self { config }
    }

    /// Returns candidates among `features` transacted within the lookback
    /// window ending at `date`, judged against `baselines` (the 30-day
    /// baselines keyed by scope).
    pub fn detect(
        &self,
        date: NaiveDate,
        features: &[Feature],
        baselines: &HashMap<ScopeKey, MarketBaseline>,
    ) -> Vec<Candidate> {
        let lookback_start = date - chrono::Duration::days(self.config.lookback_days);
        let mut candidates = Vec::new();

        for feature in features {
            if feature.record_date <= lookback_start || feature.record_date > date {
                continue;
            }
            let Some(baseline) = baselines.get(&feature.scope()) else {
                continue;
            };
            if baseline.tx_count < self.config.min_liquidity {
                continue;
            }
            let discount = discount_pct(feature.price_per_sqm, baseline.median_ppsqm);
            if discount < self.config.min_discount_pct {
                continue;
            }
            debug!(
                source_id = %feature.source_id,
                scope = %feature.scope(),
                discount_pct = discount,
                "Detected price anomaly"
            );
            candidates.push(Candidate {
                feature: feature.clone(),
                baseline_median: baseline.median_ppsqm,
                discount_pct: discount,
                tx_count_30d: baseline.tx_count,
            });
        }

        candidates
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_types::{RoomsBucket, SourceKind, Window};
    use rust_decimal::Decimal;

    fn scope() -> ScopeKey {
        ScopeKey {
            community: "Zone A".to_string(),
            project: None,
            building: None,
            rooms: RoomsBucket::Two,
        }
    }

    fn feature(id: &str, date: NaiveDate, ppsqm: f64) -> Feature {
        Feature {
            source: SourceKind::Transaction,
            source_id: id.to_string(),
            record_date: date,
            community: "Zone A".to_string(),
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

    fn baseline(date: NaiveDate, median: f64, tx_count: u32) -> MarketBaseline {
        MarketBaseline {
            date,
            scope: scope(),
            window: Window::W30,
            median_ppsqm: median,
            p25_ppsqm: median * 0.9,
            p75_ppsqm: median * 1.1,
            mean_ppsqm: median,
            tx_count,
            total_volume: Decimal::ZERO,
            momentum: None,
            volume_momentum: None,
            volatility: 0.05,
            dispersion: 0.1,
        }
    }

    #[test]
    fn discount_against_nonpositive_median_is_zero() {
        assert_eq!(discount_pct(900.0, 0.0), 0.0);
        assert_eq!(discount_pct(900.0, -1.0), 0.0);
    }

    #[test]
    fn flags_deep_discount_in_liquid_scope() {
        let date = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        let mut baselines = HashMap::new();
        baselines.insert(scope(), baseline(date, 1000.0, 25));
        let features = vec![feature("T-1", date, 750.0), feature("T-2", date, 980.0)];

        let detector = AnomalyDetector::new(DetectorConfig::default());
        let candidates = detector.detect(date, &features, &baselines);

        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].feature.source_id, "T-1");
        assert!((candidates[0].discount_pct - 25.0).abs() < 1e-9);
    }

    #[test]
    fn skips_illiquid_scopes() {
        let date = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        let mut baselines = HashMap::new();
        baselines.insert(scope(), baseline(date, 1000.0, 3));
        let features = vec![feature("T-1", date, 700.0)];

        let detector = AnomalyDetector::new(DetectorConfig::default());
        assert!(detector.detect(date, &features, &baselines).is_empty());
    }

    #[test]
    fn ignores_features_outside_lookback() {
        let date = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        let stale = date - chrono::Duration::days(10);
        let mut baselines = HashMap::new();
        baselines.insert(scope(), baseline(date, 1000.0, 25));
        let features = vec![feature("T-old", stale, 700.0)];

        let detector = AnomalyDetector::new(DetectorConfig::default());
        assert!(detector.detect(date, &features, &baselines).is_empty());
    }
}
