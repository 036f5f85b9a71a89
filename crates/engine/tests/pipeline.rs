//! End-to-end pipeline runs against the in-memory store.

use std::sync::Arc;

use chrono::{Duration, NaiveDate};
use configuration::Config;
use core_types::{
    OpportunityStatus, RawMarketRecord, Recommendation, RunStatus, SourceKind, Window,
};
use datastore::{MarketStore, MemoryStore};
use engine::{DailyDigest, EventFeed, PipelineRunner};
use normalizer::StaticGeoProvider;
use rust_decimal::Decimal;

fn run_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 3, 15).unwrap()
}

fn transaction(id: &str, date: NaiveDate, price: i64, area: i64) -> RawMarketRecord {
    RawMarketRecord {
        source: SourceKind::Transaction,
        source_id: id.to_string(),
        recorded_at: date,
        community: Some("Zone A".to_string()),
        project: None,
        building: None,
        rooms: Some(2),
        property_type: Some("apartment".to_string()),
        price: Some(Decimal::from(price)),
        area_sqm: Some(Decimal::from(area)),
        price_per_sqm: None,
        offplan: Some(false),
        days_on_market: None,
        price_change_count: None,
    }
}

/// 24 transactions at 1,000/sqm across the trailing month, plus one priced
/// 25% below the pack on the run date.
fn seed_records(date: NaiveDate) -> Vec<RawMarketRecord> {
    let mut records = Vec::new();
    for i in 0..24 {
        let day = date - Duration::days((i % 28) as i64);
        records.push(transaction(&format!("T-{i:03}"), day, 100_000, 100));
    }
    records.push(transaction("T-DEAL", date, 75_000, 100));
    records
}

async fn runner_with_seed() -> (PipelineRunner, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let runner = PipelineRunner::new(store.clone(), Config::default());
    let report = runner
        .ingest(&seed_records(run_date()), &StaticGeoProvider::empty())
        .await
        .unwrap();
    assert_eq!(report.accepted, 25);
    assert_eq!(report.rejected, 0);
    (runner, store)
}

#[tokio::test]
async fn discounted_transaction_becomes_flip_opportunity() {
    let (runner, store) = runner_with_seed().await;

    let report = runner.run(run_date()).await.unwrap();
    assert_eq!(report.status, RunStatus::Success);
    assert_eq!(report.features_loaded, 25);
    assert_eq!(report.candidates_detected, 1);
    assert_eq!(report.opportunities_scored, 1);

    let opportunities = store.opportunities_for_date(run_date()).await.unwrap();
    assert_eq!(opportunities.len(), 1);
    let opp = &opportunities[0];
    assert_eq!(opp.source_id, "T-DEAL");
    assert!((opp.baseline_median - 1_000.0).abs() < 1e-9);
    assert!((opp.discount_pct - 25.0).abs() < 1e-9);
    assert!(opp.flip_score > opp.rent_score);
    assert!(opp.flip_score > opp.long_term_score);
    assert_eq!(opp.recommendation, Recommendation::Flip);
    assert!(opp.global_score >= 40.0);
    assert_eq!(opp.status, OpportunityStatus::Active);
}

#[tokio::test]
async fn stages_cover_every_window_and_location() {
    let (runner, store) = runner_with_seed().await;
    runner.run(run_date()).await.unwrap();

    let baselines = store.baselines_for_date(run_date()).await.unwrap();
    // One scope, all three windows (the 90-day window sees the same month
    // of data but still clears the sample floor).
    assert_eq!(baselines.len(), 3);
    for window in Window::ALL {
        assert!(baselines.iter().any(|b| b.window == window));
    }
    let b30 = baselines.iter().find(|b| b.window == Window::W30).unwrap();
    assert_eq!(b30.tx_count, 25);

    let regimes = store.regimes_for_date(run_date()).await.unwrap();
    assert_eq!(regimes.len(), 1);
    assert_eq!(regimes[0].location.community, "Zone A");

    let kpis = store.kpis_for_date(run_date()).await.unwrap();
    assert_eq!(kpis.len(), 3);
    let k30 = kpis.iter().find(|k| k.window == Window::W30).unwrap();
    // No supply records on file: pressure bottoms out at zero.
    assert_eq!(k30.spi, Some(0.0));
    assert!(k30.lad.is_some());

    let risks = store.risk_summaries_for_date(run_date()).await.unwrap();
    assert_eq!(risks.len(), 1);
}

#[tokio::test]
async fn reruns_are_idempotent() {
    let (runner, store) = runner_with_seed().await;

    runner.run(run_date()).await.unwrap();
    let baselines_first = store.baselines_for_date(run_date()).await.unwrap();
    let regimes_first = store.regimes_for_date(run_date()).await.unwrap();
    let kpis_first = store.kpis_for_date(run_date()).await.unwrap();
    let opportunities_first = store.opportunities_for_date(run_date()).await.unwrap();

    runner.run(run_date()).await.unwrap();
    assert_eq!(
        store.baselines_for_date(run_date()).await.unwrap(),
        baselines_first
    );
    assert_eq!(
        store.regimes_for_date(run_date()).await.unwrap(),
        regimes_first
    );
    assert_eq!(store.kpis_for_date(run_date()).await.unwrap(), kpis_first);
    assert_eq!(
        store.opportunities_for_date(run_date()).await.unwrap(),
        opportunities_first
    );
}

#[tokio::test]
async fn empty_store_warns_instead_of_failing() {
    let store = Arc::new(MemoryStore::new());
    let runner = PipelineRunner::new(store, Config::default());

    let report = runner.run(run_date()).await.unwrap();
    assert_eq!(report.status, RunStatus::Warning);
    assert_eq!(report.features_loaded, 0);
    assert_eq!(report.baselines_computed, 0);
}

#[tokio::test]
async fn stale_opportunities_close_on_later_runs() {
    let (runner, store) = runner_with_seed().await;
    runner.run(run_date()).await.unwrap();
    assert_eq!(store.active_opportunities().await.unwrap().len(), 1);

    // Ten days later the deal has aged out of the detector's window.
    let later = run_date() + Duration::days(10);
    let report = runner.run(later).await.unwrap();
    assert_eq!(report.opportunities_closed, 1);
    assert!(store.active_opportunities().await.unwrap().is_empty());
}

#[tokio::test]
async fn digest_and_feed_read_persisted_results() {
    let (runner, store) = runner_with_seed().await;
    runner.run(run_date()).await.unwrap();

    let digest = DailyDigest::build(store.as_ref(), run_date(), 5)
        .await
        .unwrap();
    assert_eq!(digest.top_opportunities.len(), 1);
    assert_eq!(digest.busiest_baselines.len(), 1);
    assert_eq!(digest.regimes.len(), 1);
    assert_eq!(digest.risk_summaries.len(), 1);

    // The top-N cap bounds every section of the digest.
    let capped = DailyDigest::build(store.as_ref(), run_date(), 0)
        .await
        .unwrap();
    assert!(capped.top_opportunities.is_empty());
    assert!(capped.busiest_baselines.is_empty());
    assert!(capped.regimes.is_empty());
    assert!(capped.risk_summaries.is_empty());

    let config = Config::default();
    let feed = EventFeed::collect(store.as_ref(), run_date(), &config.notifier)
        .await
        .unwrap();
    // The deal clears the discount floor for notification.
    assert_eq!(feed.opportunities.len(), 1);
    assert_eq!(feed.opportunities[0].source_id, "T-DEAL");
}
