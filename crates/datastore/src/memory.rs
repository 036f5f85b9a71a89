use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet};
use tokio::sync::RwLock;

use core_types::{
    Feature, KpiSet, LocationKey, MarketBaseline, MarketRegime, Opportunity, OpportunityStatus,
    RentalIndexRecord, RiskSummary, RoomsBucket, ScopeKey, SourceKind, SupplyRecord, Window,
};

use crate::error::StoreError;
use crate::MarketStore;

/// An in-memory `MarketStore` used by tests and dry runs.
///
/// Ordered maps keep iteration deterministic, so two identical runs produce
/// byte-identical outputs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    features: BTreeMap<(SourceKind, String), Feature>,
    rentals: BTreeMap<(String, Option<String>, RoomsBucket), RentalIndexRecord>,
    supply: BTreeMap<(String, NaiveDate), SupplyRecord>,
    baselines: BTreeMap<(NaiveDate, ScopeKey, Window), MarketBaseline>,
    regimes: BTreeMap<(NaiveDate, LocationKey), MarketRegime>,
    kpis: BTreeMap<(NaiveDate, ScopeKey, Window), KpiSet>,
    risk: BTreeMap<(NaiveDate, LocationKey), RiskSummary>,
    opportunities: BTreeMap<(String, NaiveDate), Opportunity>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MarketStore for MemoryStore {
    async fn upsert_features(&self, features: &[Feature]) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        for feature in features {
            inner.features.insert(
                (feature.source, feature.source_id.clone()),
                feature.clone(),
            );
        }
        Ok(())
    }

    async fn features_in_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Feature>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .features
            .values()
            .filter(|f| f.record_date >= start && f.record_date <= end)
            .cloned()
            .collect())
    }

    async fn upsert_rental_index(&self, rows: &[RentalIndexRecord]) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        for row in rows {
            inner.rentals.insert(
                (row.community.clone(), row.project.clone(), row.rooms),
                row.clone(),
            );
        }
        Ok(())
    }

    async fn rental_index(&self) -> Result<Vec<RentalIndexRecord>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner.rentals.values().cloned().collect())
    }

    async fn upsert_supply(&self, rows: &[SupplyRecord]) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        for row in rows {
            inner.supply.insert(
                (row.community.clone(), row.expected_completion),
                row.clone(),
            );
        }
        Ok(())
    }

    async fn supply_records(&self) -> Result<Vec<SupplyRecord>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner.supply.values().cloned().collect())
    }

    async fn upsert_baselines(&self, rows: &[MarketBaseline]) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        for row in rows {
            inner
                .baselines
                .insert((row.date, row.scope.clone(), row.window), row.clone());
        }
        Ok(())
    }

    async fn baselines_for_date(
        &self,
        date: NaiveDate,
    ) -> Result<Vec<MarketBaseline>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .baselines
            .values()
            .filter(|b| b.date == date)
            .cloned()
            .collect())
    }

    async fn upsert_regimes(&self, rows: &[MarketRegime]) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        for row in rows {
            inner
                .regimes
                .insert((row.date, row.location.clone()), row.clone());
        }
        Ok(())
    }

    async fn regimes_for_date(&self, date: NaiveDate) -> Result<Vec<MarketRegime>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .regimes
            .values()
            .filter(|r| r.date == date)
            .cloned()
            .collect())
    }

    async fn latest_regime_before(
        &self,
        location: &LocationKey,
        date: NaiveDate,
    ) -> Result<Option<MarketRegime>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .regimes
            .values()
            .filter(|r| &r.location == location && r.date < date)
            .max_by_key(|r| r.date)
            .cloned())
    }

    async fn upsert_kpis(&self, rows: &[KpiSet]) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        for row in rows {
            inner
                .kpis
                .insert((row.date, row.scope.clone(), row.window), row.clone());
        }
        Ok(())
    }

    async fn kpis_for_date(&self, date: NaiveDate) -> Result<Vec<KpiSet>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .kpis
            .values()
            .filter(|k| k.date == date)
            .cloned()
            .collect())
    }

    async fn upsert_risk_summaries(&self, rows: &[RiskSummary]) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        for row in rows {
            inner
                .risk
                .insert((row.date, row.location.clone()), row.clone());
        }
        Ok(())
    }

    async fn risk_summaries_for_date(
        &self,
        date: NaiveDate,
    ) -> Result<Vec<RiskSummary>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .risk
            .values()
            .filter(|r| r.date == date)
            .cloned()
            .collect())
    }

    async fn upsert_opportunities(&self, rows: &[Opportunity]) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        for row in rows {
            inner
                .opportunities
                .insert((row.source_id.clone(), row.detected_on), row.clone());
        }
        Ok(())
    }

    async fn opportunities_for_date(
        &self,
        date: NaiveDate,
    ) -> Result<Vec<Opportunity>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .opportunities
            .values()
            .filter(|o| o.detected_on == date)
            .cloned()
            .collect())
    }

    async fn active_opportunities(&self) -> Result<Vec<Opportunity>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .opportunities
            .values()
            .filter(|o| o.status == OpportunityStatus::Active)
            .cloned()
            .collect())
    }

    async fn close_opportunities(
        &self,
        keys: &[(String, NaiveDate)],
    ) -> Result<u64, StoreError> {
        let mut inner = self.inner.write().await;
        let mut closed = 0;
        for key in keys {
            if let Some(opportunity) = inner.opportunities.get_mut(key) {
                if opportunity.status == OpportunityStatus::Active {
                    opportunity.status = OpportunityStatus::Closed;
                    closed += 1;
                }
            }
        }
        Ok(closed)
    }

    async fn opportunity_dates_for_scope(
        &self,
        scope: &ScopeKey,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<NaiveDate>, StoreError> {
        let inner = self.inner.read().await;
        let dates: BTreeSet<NaiveDate> = inner
            .opportunities
            .values()
            .filter(|o| &o.scope == scope && o.detected_on >= start && o.detected_on <= end)
            .map(|o| o.detected_on)
            .collect();
        Ok(dates.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn feature(id: &str, date: NaiveDate, ppsqm: f64) -> Feature {
        Feature {
            source: SourceKind::Transaction,
            source_id: id.to_string(),
            record_date: date,
            community: "Marina".to_string(),
            project: None,
            building: None,
            rooms: RoomsBucket::Two,
            property_type: None,
            price: Decimal::from(1_000_000),
            area_sqm: Decimal::from(100),
            price_per_sqm: ppsqm,
            offplan: false,
            days_on_market: None,
            price_change_count: 0,
            geo: None,
        }
    }

    #[tokio::test]
    async fn feature_upsert_overwrites_by_source_key() {
        let store = MemoryStore::new();
        let date = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();

        store
            .upsert_features(&[feature("tx-1", date, 1000.0)])
            .await
            .unwrap();
        store
            .upsert_features(&[feature("tx-1", date, 1100.0)])
            .await
            .unwrap();

        let stored = store.features_in_range(date, date).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].price_per_sqm, 1100.0);
    }

    #[tokio::test]
    async fn range_query_is_inclusive() {
        let store = MemoryStore::new();
        let d1 = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        let d2 = NaiveDate::from_ymd_opt(2025, 6, 10).unwrap();
        let d3 = NaiveDate::from_ymd_opt(2025, 6, 20).unwrap();

        store
            .upsert_features(&[
                feature("a", d1, 1000.0),
                feature("b", d2, 1000.0),
                feature("c", d3, 1000.0),
            ])
            .await
            .unwrap();

        let stored = store.features_in_range(d1, d2).await.unwrap();
        assert_eq!(stored.len(), 2);
    }

    #[tokio::test]
    async fn closing_an_opportunity_is_idempotent() {
        let store = MemoryStore::new();
        let date = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        let opportunity = Opportunity {
            source_id: "tx-9".to_string(),
            detected_on: date,
            scope: feature("tx-9", date, 800.0).scope(),
            price_per_sqm: 800.0,
            baseline_median: 1000.0,
            discount_pct: 20.0,
            flip_score: 70.0,
            rent_score: 60.0,
            long_term_score: 65.0,
            global_score: 65.5,
            recommendation: core_types::Recommendation::Flip,
            regime: core_types::Regime::Expansion,
            liquidity_score: 75.0,
            supply_risk: core_types::RiskLevel::Low,
            status: OpportunityStatus::Active,
        };
        store.upsert_opportunities(&[opportunity]).await.unwrap();

        let keys = vec![("tx-9".to_string(), date)];
        assert_eq!(store.close_opportunities(&keys).await.unwrap(), 1);
        assert_eq!(store.close_opportunities(&keys).await.unwrap(), 0);
        assert!(store.active_opportunities().await.unwrap().is_empty());
    }
}
