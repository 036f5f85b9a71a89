//! # Engine Crate
//!
//! The orchestrator. Owns the end-to-end pipeline for one calculation date:
//! load features, compute windowed baselines per scope, classify regimes,
//! derive KPI rows, summarize risk, detect and score opportunities, and
//! persist every stage's output through the `MarketStore` boundary.
//!
//! ## Architectural Principles
//!
//! - **Stages stay pure, the engine does I/O:** The stage crates are
//!   synchronous functions over plain data. This crate is the only place
//!   where their inputs are fetched and their outputs written, so a full run
//!   reads as one linear function.
//! - **Per-scope fan-out:** Scopes are statistically independent, so the
//!   baseline stage spawns one task per scope and joins the set. A panicking
//!   scope is logged and dropped; it never takes the run down.
//! - **Idempotent by construction:** Every write is a keyed upsert and every
//!   stage recomputes from source data, so running the same date twice leaves
//!   the store byte-identical.
//!
//! ## Public API
//!
//! - [`PipelineRunner`]: `ingest` + `run`, the two entry points.
//! - [`RunReport`]: per-run accounting.
//! - [`EventFeed`] / [`DailyDigest`]: read-side views over persisted results.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Instant;

use chrono::{Duration, NaiveDate};
use configuration::Config;
use core_types::{
    Feature, KpiInputs, KpiSet, LocationKey, MarketBaseline, MarketRegime, Opportunity,
    RawMarketRecord, RentalIndexRecord, RiskSummary, RunStatus, ScopeKey, SourceKind, SupplyRecord,
    Window,
};
use datastore::MarketStore;
use futures::future::join_all;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use tracing::{info, warn};

use baselines::{BaselineBatch, BaselineCalculator};
use kpis::KpiComputer;
use normalizer::{FeatureNormalizer, GeoCache, GeoProvider, QualityAccumulator, QualityReport};
use opportunities::{AnomalyDetector, Candidate, MarketContext, StrategyScorer};
use regimes::RegimeClassifier;
use risk::RiskSummarizer;

// Declare the modules that constitute this crate.
pub mod digest;
pub mod error;
pub mod events;
pub mod report;

// Re-export the key components to create a clean, public-facing API.
pub use digest::DailyDigest;
pub use error::EngineError;
pub use events::{EventFeed, RegimeChangeEvent};
pub use report::RunReport;

/// How far back features are loaded for one run. Covers the 90-day window,
/// its momentum predecessor, and the trailing-year transaction counts.
const FEATURE_LOOKBACK_DAYS: i64 = 365;

/// How far back the anomaly-persistence streak is allowed to reach.
const STREAK_LOOKBACK_DAYS: i64 = 90;

/// Months-to-days horizon for the supply pressure lookahead.
const DAYS_PER_MONTH: i64 = 30;

/// Runs the analytics pipeline against a [`MarketStore`].
pub struct PipelineRunner {
    store: Arc<dyn MarketStore>,
    config: Config,
}

impl PipelineRunner {
    pub fn new(store: Arc<dyn MarketStore>, config: Config) -> Self {
        Self { store, config }
    }

    /// Normalizes a raw batch, enriches it with geo data, and upserts the
    /// accepted features. Returns the batch quality report.
    pub async fn ingest(
        &self,
        raws: &[RawMarketRecord],
        geo_provider: &dyn GeoProvider,
    ) -> Result<QualityReport, EngineError> {
        let normalizer = FeatureNormalizer::new(self.config.normalizer.clone());
        let mut geo = GeoCache::new(geo_provider, self.config.normalizer.geo_weights.clone());
        let mut quality = QualityAccumulator::new();

        let features = normalizer.normalize_batch(raws, &mut geo, &mut quality);
        self.store.upsert_features(&features).await?;

        let report = quality.report();
        info!(
            total = report.total,
            accepted = report.accepted,
            rejected = report.rejected,
            "ingest complete"
        );
        Ok(report)
    }

    pub async fn ingest_rental_index(
        &self,
        rows: &[RentalIndexRecord],
    ) -> Result<(), EngineError> {
        self.store.upsert_rental_index(rows).await?;
        Ok(())
    }

    pub async fn ingest_supply(&self, rows: &[SupplyRecord]) -> Result<(), EngineError> {
        self.store.upsert_supply(rows).await?;
        Ok(())
    }

    /// Executes every stage for one calculation date.
    pub async fn run(&self, date: NaiveDate) -> Result<RunReport, EngineError> {
        let started = Instant::now();
        let mut report = RunReport::new(date);
        info!(run_id = %report.run_id, %date, "pipeline run started");

        let load_start = date - Duration::days(FEATURE_LOOKBACK_DAYS);
        let features = self.store.features_in_range(load_start, date).await?;
        report.features_loaded = features.len();
        if features.is_empty() {
            warn!(%date, "no features in range; nothing to compute");
            report.status = RunStatus::Warning;
            report.elapsed_ms = started.elapsed().as_millis();
            return Ok(report);
        }

        // Stage: baselines.
        let batch = self.compute_baselines(date, &features).await;
        report.baselines_computed = batch.baselines.len();
        report.scopes_skipped = batch.skipped.len();
        self.store.upsert_baselines(&batch.baselines).await?;

        let baselines_30d: HashMap<ScopeKey, MarketBaseline> = batch
            .baselines
            .iter()
            .filter(|b| b.window == Window::W30)
            .map(|b| (b.scope.clone(), b.clone()))
            .collect();

        // Stage: regimes, one per location from its most liquid 30-day scope.
        let regimes = self.classify_regimes(date, &batch.baselines);
        report.regimes_classified = regimes.len();
        report.regime_changes = self.count_regime_changes(date, &regimes).await?;
        self.store.upsert_regimes(&regimes).await?;
        let regimes_by_location: HashMap<LocationKey, MarketRegime> = regimes
            .iter()
            .map(|r| (r.location.clone(), r.clone()))
            .collect();

        // Stage: anomaly detection. Runs before KPIs so the discount and
        // persistence indicators can see today's candidates.
        let detector = AnomalyDetector::new(self.config.detector.clone());
        let candidates = detector.detect(date, &features, &baselines_30d);
        report.candidates_detected = candidates.len();

        // Stage: KPIs.
        let rental_index = self.store.rental_index().await?;
        let supply = self.store.supply_records().await?;
        let kpi_rows = self
            .compute_kpis(
                date,
                &features,
                &batch.baselines,
                &baselines_30d,
                &regimes_by_location,
                &candidates,
                &rental_index,
                &supply,
            )
            .await?;
        report.kpi_rows = kpi_rows.len();
        self.store.upsert_kpis(&kpi_rows).await?;

        // Stage: risk.
        let summaries = self.summarize_risk(date, &batch.baselines, &kpi_rows);
        report.risk_rows = summaries.len();
        self.store.upsert_risk_summaries(&summaries).await?;
        let risk_by_location: HashMap<LocationKey, RiskSummary> = summaries
            .iter()
            .map(|s| (s.location.clone(), s.clone()))
            .collect();

        // Stage: scoring.
        let scored = self.score_candidates(
            &candidates,
            &baselines_30d,
            &regimes_by_location,
            &risk_by_location,
            &rental_index,
        );
        report.opportunities_scored = scored.len();
        self.store.upsert_opportunities(&scored).await?;
        report.opportunities_closed = self.close_stale(date).await?;

        report.elapsed_ms = started.elapsed().as_millis();
        if report.baselines_computed == 0 {
            report.status = RunStatus::Warning;
        }
        info!(
            run_id = %report.run_id,
            baselines = report.baselines_computed,
            regimes = report.regimes_classified,
            kpis = report.kpi_rows,
            opportunities = report.opportunities_scored,
            elapsed_ms = report.elapsed_ms,
            "pipeline run finished"
        );
        Ok(report)
    }

    /// One task per scope; a panicking scope is dropped, not fatal. Results
    /// are re-sorted so the write order is deterministic.
    async fn compute_baselines(&self, date: NaiveDate, features: &[Feature]) -> BaselineBatch {
        let calculator = BaselineCalculator::new(self.config.baselines.clone());
        let scopes = calculator.discover_scopes(date, features);

        let mut by_scope: BTreeMap<ScopeKey, Vec<Feature>> = BTreeMap::new();
        for feature in features {
            if feature.source == SourceKind::Transaction && scopes.contains(&feature.scope()) {
                by_scope
                    .entry(feature.scope())
                    .or_default()
                    .push(feature.clone());
            }
        }

        let mut handles = Vec::with_capacity(by_scope.len());
        for (scope, scope_features) in by_scope {
            let calc = calculator.clone();
            handles.push(tokio::spawn(async move {
                let refs: Vec<&Feature> = scope_features.iter().collect();
                let mut computed = Vec::new();
                let mut skipped = Vec::new();
                for window in Window::ALL {
                    match calc.compute_scope_window(date, &scope, window, &refs) {
                        Some(baseline) => computed.push(baseline),
                        None => skipped.push((scope.clone(), window)),
                    }
                }
                (computed, skipped)
            }));
        }

        let mut batch = BaselineBatch::default();
        for joined in join_all(handles).await {
            match joined {
                Ok((computed, skipped)) => {
                    batch.baselines.extend(computed);
                    batch.skipped.extend(skipped);
                }
                Err(err) => warn!(%err, "baseline task failed; scope dropped"),
            }
        }
        batch
            .baselines
            .sort_by(|a, b| (&a.scope, a.window.days()).cmp(&(&b.scope, b.window.days())));
        batch.skipped.sort();
        batch
    }

    /// Each location is classified from its highest-volume 30-day baseline,
    /// so thin sub-scopes cannot out-vote the building's real activity.
    fn classify_regimes(&self, date: NaiveDate, baselines: &[MarketBaseline]) -> Vec<MarketRegime> {
        let classifier = RegimeClassifier::new(self.config.regimes.clone());
        let mut best: BTreeMap<LocationKey, &MarketBaseline> = BTreeMap::new();
        for baseline in baselines.iter().filter(|b| b.window == Window::W30) {
            best.entry(baseline.scope.location())
                .and_modify(|current| {
                    if baseline.tx_count > current.tx_count {
                        *current = baseline;
                    }
                })
                .or_insert(baseline);
        }

        best.into_iter()
            .map(|(location, baseline)| {
                let c = classifier.classify(baseline);
                MarketRegime {
                    date,
                    location,
                    regime: c.regime,
                    confidence: c.confidence,
                    price_trend: c.price_trend,
                    volume_trend: c.volume_trend,
                    dispersion_level: c.dispersion_level,
                    volatility_level: c.volatility_level,
                }
            })
            .collect()
    }

    async fn count_regime_changes(
        &self,
        date: NaiveDate,
        regimes: &[MarketRegime],
    ) -> Result<usize, EngineError> {
        let floor = self.config.notifier.min_regime_confidence;
        let mut changes = 0;
        for regime in regimes {
            if regime.confidence < floor {
                continue;
            }
            let previous = self
                .store
                .latest_regime_before(&regime.location, date)
                .await?;
            if previous.map(|p| p.regime) != Some(regime.regime) {
                changes += 1;
            }
        }
        Ok(changes)
    }

    #[allow(clippy::too_many_arguments)]
    async fn compute_kpis(
        &self,
        date: NaiveDate,
        features: &[Feature],
        baselines: &[MarketBaseline],
        baselines_30d: &HashMap<ScopeKey, MarketBaseline>,
        regimes_by_location: &HashMap<LocationKey, MarketRegime>,
        candidates: &[Candidate],
        rental_index: &[RentalIndexRecord],
        supply: &[SupplyRecord],
    ) -> Result<Vec<KpiSet>, EngineError> {
        let computer = KpiComputer::new(self.config.kpis.clone());

        // Trailing-year transaction counts per community.
        let year_start = date - Duration::days(365);
        let mut tx_12m: HashMap<&str, u32> = HashMap::new();
        for feature in features {
            if feature.source == SourceKind::Transaction
                && feature.record_date > year_start
                && feature.record_date <= date
            {
                *tx_12m.entry(feature.community.as_str()).or_default() += 1;
            }
        }

        // Planned supply completing within the configured horizon.
        let horizon_end = date
            + Duration::days(i64::from(self.config.kpis.supply_horizon_months) * DAYS_PER_MONTH);
        let mut planned: HashMap<&str, u32> = HashMap::new();
        for record in supply {
            if record.expected_completion > date && record.expected_completion <= horizon_end {
                *planned.entry(record.community.as_str()).or_default() += record.planned_units;
            }
        }

        // Today's strongest discount per scope.
        let mut best_discount: HashMap<ScopeKey, f64> = HashMap::new();
        for candidate in candidates {
            let entry = best_discount
                .entry(candidate.feature.scope())
                .or_insert(f64::MIN);
            if candidate.discount_pct > *entry {
                *entry = candidate.discount_pct;
            }
        }

        // Consecutive-day anomaly streaks, only for scopes anomalous today.
        let mut streaks: HashMap<ScopeKey, u32> = HashMap::new();
        for scope in best_discount.keys() {
            let streak = self.anomaly_streak(scope, date).await?;
            streaks.insert(scope.clone(), streak);
        }

        let mut rows = Vec::with_capacity(baselines.len());
        for baseline in baselines {
            let scope = &baseline.scope;
            let window_start = date - Duration::days(baseline.window.days());
            let in_window = |f: &&Feature| {
                f.record_date > window_start && f.record_date <= date && f.scope() == *scope
            };

            let listing_prices: Vec<f64> = features
                .iter()
                .filter(in_window)
                .filter(|f| f.source == SourceKind::Listing)
                .map(|f| f.price_per_sqm)
                .collect();

            let window_tx: Vec<&Feature> = features
                .iter()
                .filter(in_window)
                .filter(|f| f.source == SourceKind::Transaction)
                .collect();
            let offplan_prices: Vec<f64> = window_tx
                .iter()
                .filter(|f| f.offplan)
                .map(|f| f.price_per_sqm)
                .collect();
            let ready_prices: Vec<f64> = window_tx
                .iter()
                .filter(|f| !f.offplan)
                .map(|f| f.price_per_sqm)
                .collect();
            let areas: Vec<f64> = window_tx
                .iter()
                .filter_map(|f| f.area_sqm.to_f64())
                .collect();

            // Pooled community median for the same window feeds the premium.
            let community_prices: Vec<f64> = features
                .iter()
                .filter(|f| {
                    f.source == SourceKind::Transaction
                        && f.community == scope.community
                        && f.record_date > window_start
                        && f.record_date <= date
                })
                .map(|f| f.price_per_sqm)
                .collect();
            let price_premium = baselines::stats::median(&community_prices)
                .filter(|m| *m > 0.0)
                .map(|community_median| baseline.median_ppsqm / community_median - 1.0);

            let location_score = features
                .iter()
                .filter(in_window)
                .find_map(|f| f.geo.as_ref())
                .map(|g| g.location_score);

            let inputs = KpiInputs {
                median_tx_ppsqm: Some(baseline.median_ppsqm),
                median_listing_ppsqm: baselines::stats::median(&listing_prices),
                tx_count_window: baseline.tx_count,
                tx_count_30d: baselines_30d.get(scope).map(|b| b.tx_count).unwrap_or(0),
                tx_count_12m: tx_12m.get(scope.community.as_str()).copied().unwrap_or(0),
                planned_units_12m: planned.get(scope.community.as_str()).copied().unwrap_or(0),
                median_annual_rent: lookup_rent(rental_index, scope),
                typical_area_sqm: baselines::stats::median(&areas)
                    .and_then(Decimal::from_f64_retain),
                location_score,
                price_premium,
                momentum: baseline.momentum,
                regime_confidence: regimes_by_location
                    .get(&scope.location())
                    .map(|r| r.confidence),
                median_offplan_ppsqm: baselines::stats::median(&offplan_prices),
                median_ready_ppsqm: baselines::stats::median(&ready_prices),
                best_discount_pct: best_discount.get(scope).copied(),
                days_anomaly_active: streaks.get(scope).copied().unwrap_or(0),
            };

            rows.push(computer.compute(date, scope.clone(), baseline.window, inputs));
        }
        Ok(rows)
    }

    /// Consecutive calendar days ending at `date` on which the scope had at
    /// least one detected opportunity. `date` itself counts via the current
    /// candidate set.
    async fn anomaly_streak(&self, scope: &ScopeKey, date: NaiveDate) -> Result<u32, EngineError> {
        let start = date - Duration::days(STREAK_LOOKBACK_DAYS);
        let prior: BTreeSet<NaiveDate> = self
            .store
            .opportunity_dates_for_scope(scope, start, date - Duration::days(1))
            .await?
            .into_iter()
            .collect();

        let mut streak = 1;
        let mut day = date - Duration::days(1);
        while prior.contains(&day) {
            streak += 1;
            day -= Duration::days(1);
        }
        Ok(streak)
    }

    /// One summary per location, fed by its most liquid 30-day scope.
    fn summarize_risk(
        &self,
        date: NaiveDate,
        baselines: &[MarketBaseline],
        kpi_rows: &[KpiSet],
    ) -> Vec<RiskSummary> {
        let summarizer = RiskSummarizer::new(self.config.risk.clone());

        let mut best: BTreeMap<LocationKey, &MarketBaseline> = BTreeMap::new();
        for baseline in baselines.iter().filter(|b| b.window == Window::W30) {
            best.entry(baseline.scope.location())
                .and_modify(|current| {
                    if baseline.tx_count > current.tx_count {
                        *current = baseline;
                    }
                })
                .or_insert(baseline);
        }

        let kpi_by_scope: HashMap<(&ScopeKey, Window), &KpiSet> = kpi_rows
            .iter()
            .map(|k| ((&k.scope, k.window), k))
            .collect();

        best.into_iter()
            .map(|(location, baseline)| {
                let kpi = kpi_by_scope.get(&(&baseline.scope, Window::W30));
                summarizer.summarize(
                    date,
                    location,
                    kpi.and_then(|k| k.spi),
                    Some(baseline.volatility),
                    kpi.and_then(|k| k.tls),
                )
            })
            .collect()
    }

    fn score_candidates(
        &self,
        candidates: &[Candidate],
        baselines_30d: &HashMap<ScopeKey, MarketBaseline>,
        regimes_by_location: &HashMap<LocationKey, MarketRegime>,
        risk_by_location: &HashMap<LocationKey, RiskSummary>,
        rental_index: &[RentalIndexRecord],
    ) -> Vec<Opportunity> {
        let scorer = StrategyScorer::new(self.config.scoring.clone());

        candidates
            .iter()
            .map(|candidate| {
                let scope = candidate.feature.scope();
                let location = scope.location();
                let baseline = baselines_30d.get(&scope);
                let regime = regimes_by_location.get(&location);

                let gross_yield = lookup_rent(rental_index, &scope).and_then(|rent| {
                    let price = candidate.feature.price.to_f64()?;
                    let rent = rent.to_f64()?;
                    (price > 0.0).then_some(rent / price)
                });

                let ctx = MarketContext {
                    regime: regime
                        .map(|r| r.regime)
                        .unwrap_or(core_types::Regime::Neutral),
                    regime_confidence: regime.map(|r| r.confidence).unwrap_or(0.5),
                    supply_risk: risk_by_location
                        .get(&location)
                        .map(|s| s.supply_risk)
                        .unwrap_or(core_types::RiskLevel::Unknown),
                    momentum: baseline.and_then(|b| b.momentum),
                    volatility: baseline.map(|b| b.volatility).unwrap_or(0.0),
                    gross_yield,
                };
                scorer.score(candidate, &ctx)
            })
            .collect()
    }

    /// Closes actives whose detection date has fallen out of the detector's
    /// lookback window. Re-detected deals get a fresh row instead.
    async fn close_stale(&self, date: NaiveDate) -> Result<u64, EngineError> {
        let cutoff = date - Duration::days(self.config.detector.lookback_days);
        let stale: Vec<(String, NaiveDate)> = self
            .store
            .active_opportunities()
            .await?
            .into_iter()
            .filter(|o| o.detected_on <= cutoff)
            .map(|o| (o.source_id, o.detected_on))
            .collect();
        if stale.is_empty() {
            return Ok(0);
        }
        let closed = self.store.close_opportunities(&stale).await?;
        Ok(closed)
    }
}

/// Rental benchmark lookup: exact (community, project, rooms) first, then the
/// community-wide row for the same rooms bucket.
fn lookup_rent(rental_index: &[RentalIndexRecord], scope: &ScopeKey) -> Option<Decimal> {
    let exact = rental_index.iter().find(|r| {
        r.community == scope.community && r.project == scope.project && r.rooms == scope.rooms
    });
    if let Some(row) = exact {
        return Some(row.median_annual_rent);
    }
    rental_index
        .iter()
        .find(|r| r.community == scope.community && r.project.is_none() && r.rooms == scope.rooms)
        .map(|r| r.median_annual_rent)
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_types::RoomsBucket;

    fn scope(project: Option<&str>, rooms: RoomsBucket) -> ScopeKey {
        ScopeKey {
            community: "Zone A".to_string(),
            project: project.map(str::to_string),
            building: None,
            rooms,
        }
    }

    fn rent_row(project: Option<&str>, rooms: RoomsBucket, rent: i64) -> RentalIndexRecord {
        RentalIndexRecord {
            community: "Zone A".to_string(),
            project: project.map(str::to_string),
            rooms,
            median_annual_rent: Decimal::from(rent),
            mean_annual_rent: None,
        }
    }

    #[test]
    fn rent_lookup_prefers_exact_project() {
        let index = vec![
            rent_row(None, RoomsBucket::Two, 50_000),
            rent_row(Some("Marina Heights"), RoomsBucket::Two, 70_000),
        ];
        let got = lookup_rent(&index, &scope(Some("Marina Heights"), RoomsBucket::Two));
        assert_eq!(got, Some(Decimal::from(70_000)));
    }

    #[test]
    fn rent_lookup_falls_back_to_community() {
        let index = vec![rent_row(None, RoomsBucket::Two, 50_000)];
        let got = lookup_rent(&index, &scope(Some("Unknown Tower"), RoomsBucket::Two));
        assert_eq!(got, Some(Decimal::from(50_000)));
    }

    #[test]
    fn rent_lookup_respects_rooms_bucket() {
        let index = vec![rent_row(None, RoomsBucket::Two, 50_000)];
        assert_eq!(lookup_rent(&index, &scope(None, RoomsBucket::Studio)), None);
    }
}
