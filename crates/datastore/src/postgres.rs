use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::postgres::PgPool;
use sqlx::{FromRow, Row};
use std::str::FromStr;

use core_types::{
    BandLevel, Feature, GeoEnrichment, KpiInputs, KpiSet, LocationKey, MarketBaseline,
    MarketRegime, Opportunity, OpportunityStatus, Recommendation, Regime, RentalIndexRecord,
    RiskLevel, RiskSummary, RoomsBucket, ScopeKey, SourceKind, SupplyRecord, TrendLabel, Window,
};

use crate::error::StoreError;
use crate::MarketStore;

/// The PostgreSQL-backed `MarketStore`. Encapsulates all SQL and the mapping
/// between database rows and core types.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Creates a new `PgStore` with a shared database connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

// Optional location parts are stored as '' so composite primary keys stay
// total; these two helpers keep the convention in one place.
fn to_db(part: &Option<String>) -> &str {
    part.as_deref().unwrap_or("")
}

fn from_db(part: String) -> Option<String> {
    if part.is_empty() { None } else { Some(part) }
}

fn parse<T: FromStr>(label: &str, value: &str) -> Result<T, StoreError>
where
    T::Err: std::fmt::Display,
{
    value
        .parse::<T>()
        .map_err(|e| StoreError::Corrupt(format!("{label}: {e}")))
}

/// Database row for the `features` table.
#[derive(Debug, FromRow)]
struct DbFeature {
    source: String,
    source_id: String,
    record_date: NaiveDate,
    community: String,
    project: String,
    building: String,
    rooms: String,
    property_type: Option<String>,
    price: Decimal,
    area_sqm: Decimal,
    price_per_sqm: f64,
    offplan: bool,
    days_on_market: Option<i32>,
    price_change_count: i32,
    geo: Option<serde_json::Value>,
}

impl TryFrom<DbFeature> for Feature {
    type Error = StoreError;

    fn try_from(row: DbFeature) -> Result<Self, Self::Error> {
        let geo: Option<GeoEnrichment> = match row.geo {
            Some(value) => Some(serde_json::from_value(value)?),
            None => None,
        };
        Ok(Feature {
            source: parse("source", &row.source)?,
            source_id: row.source_id,
            record_date: row.record_date,
            community: row.community,
            project: from_db(row.project),
            building: from_db(row.building),
            rooms: parse("rooms", &row.rooms)?,
            property_type: row.property_type,
            price: row.price,
            area_sqm: row.area_sqm,
            price_per_sqm: row.price_per_sqm,
            offplan: row.offplan,
            days_on_market: row.days_on_market,
            price_change_count: row.price_change_count,
            geo,
        })
    }
}

#[derive(Debug, FromRow)]
struct DbBaseline {
    date: NaiveDate,
    community: String,
    project: String,
    building: String,
    rooms: String,
    window_days: i32,
    median_ppsqm: f64,
    p25_ppsqm: f64,
    p75_ppsqm: f64,
    mean_ppsqm: f64,
    tx_count: i32,
    total_volume: Decimal,
    momentum: Option<f64>,
    volume_momentum: Option<f64>,
    volatility: f64,
    dispersion: f64,
}

impl TryFrom<DbBaseline> for MarketBaseline {
    type Error = StoreError;

    fn try_from(row: DbBaseline) -> Result<Self, Self::Error> {
        Ok(MarketBaseline {
            date: row.date,
            scope: ScopeKey {
                community: row.community,
                project: from_db(row.project),
                building: from_db(row.building),
                rooms: parse("rooms", &row.rooms)?,
            },
            window: Window::try_from(row.window_days)
                .map_err(|e| StoreError::Corrupt(e.to_string()))?,
            median_ppsqm: row.median_ppsqm,
            p25_ppsqm: row.p25_ppsqm,
            p75_ppsqm: row.p75_ppsqm,
            mean_ppsqm: row.mean_ppsqm,
            tx_count: row.tx_count as u32,
            total_volume: row.total_volume,
            momentum: row.momentum,
            volume_momentum: row.volume_momentum,
            volatility: row.volatility,
            dispersion: row.dispersion,
        })
    }
}

#[derive(Debug, FromRow)]
struct DbRegime {
    date: NaiveDate,
    community: String,
    project: String,
    building: String,
    regime: String,
    confidence: f64,
    price_trend: String,
    volume_trend: String,
    dispersion_level: String,
    volatility_level: String,
}

impl TryFrom<DbRegime> for MarketRegime {
    type Error = StoreError;

    fn try_from(row: DbRegime) -> Result<Self, Self::Error> {
        Ok(MarketRegime {
            date: row.date,
            location: LocationKey {
                community: row.community,
                project: from_db(row.project),
                building: from_db(row.building),
            },
            regime: parse::<Regime>("regime", &row.regime)?,
            confidence: row.confidence,
            price_trend: parse::<TrendLabel>("price_trend", &row.price_trend)?,
            volume_trend: parse::<TrendLabel>("volume_trend", &row.volume_trend)?,
            dispersion_level: parse::<BandLevel>("dispersion_level", &row.dispersion_level)?,
            volatility_level: parse::<BandLevel>("volatility_level", &row.volatility_level)?,
        })
    }
}

#[derive(Debug, FromRow)]
struct DbKpiSet {
    date: NaiveDate,
    community: String,
    project: String,
    building: String,
    rooms: String,
    window_days: i32,
    tls: Option<f64>,
    lad: Option<f64>,
    rsg: Option<f64>,
    spi: Option<f64>,
    gpi: Option<f64>,
    rcwm: Option<f64>,
    ord: Option<f64>,
    aps: Option<f64>,
    inputs: serde_json::Value,
}

impl TryFrom<DbKpiSet> for KpiSet {
    type Error = StoreError;

    fn try_from(row: DbKpiSet) -> Result<Self, Self::Error> {
        let inputs: KpiInputs = serde_json::from_value(row.inputs)?;
        Ok(KpiSet {
            date: row.date,
            scope: ScopeKey {
                community: row.community,
                project: from_db(row.project),
                building: from_db(row.building),
                rooms: parse("rooms", &row.rooms)?,
            },
            window: Window::try_from(row.window_days)
                .map_err(|e| StoreError::Corrupt(e.to_string()))?,
            tls: row.tls,
            lad: row.lad,
            rsg: row.rsg,
            spi: row.spi,
            gpi: row.gpi,
            rcwm: row.rcwm,
            ord: row.ord,
            aps: row.aps,
            inputs,
        })
    }
}

#[derive(Debug, FromRow)]
struct DbRiskSummary {
    date: NaiveDate,
    community: String,
    project: String,
    building: String,
    supply_risk: String,
    volatility_risk: String,
    divergence_risk: String,
    spi: Option<f64>,
    volatility: Option<f64>,
    tls_abs: Option<f64>,
    risk_score: f64,
    risk_factors: serde_json::Value,
}

impl TryFrom<DbRiskSummary> for RiskSummary {
    type Error = StoreError;

    fn try_from(row: DbRiskSummary) -> Result<Self, Self::Error> {
        let risk_factors: Vec<String> = serde_json::from_value(row.risk_factors)?;
        Ok(RiskSummary {
            date: row.date,
            location: LocationKey {
                community: row.community,
                project: from_db(row.project),
                building: from_db(row.building),
            },
            supply_risk: parse::<RiskLevel>("supply_risk", &row.supply_risk)?,
            volatility_risk: parse::<RiskLevel>("volatility_risk", &row.volatility_risk)?,
            divergence_risk: parse::<RiskLevel>("divergence_risk", &row.divergence_risk)?,
            spi: row.spi,
            volatility: row.volatility,
            tls_abs: row.tls_abs,
            risk_score: row.risk_score,
            risk_factors,
        })
    }
}

#[derive(Debug, FromRow)]
struct DbOpportunity {
    source_id: String,
    detected_on: NaiveDate,
    community: String,
    project: String,
    building: String,
    rooms: String,
    price_per_sqm: f64,
    baseline_median: f64,
    discount_pct: f64,
    flip_score: f64,
    rent_score: f64,
    long_term_score: f64,
    global_score: f64,
    recommendation: String,
    regime: String,
    liquidity_score: f64,
    supply_risk: String,
    status: String,
}

impl TryFrom<DbOpportunity> for Opportunity {
    type Error = StoreError;

    fn try_from(row: DbOpportunity) -> Result<Self, Self::Error> {
        Ok(Opportunity {
            source_id: row.source_id,
            detected_on: row.detected_on,
            scope: ScopeKey {
                community: row.community,
                project: from_db(row.project),
                building: from_db(row.building),
                rooms: parse("rooms", &row.rooms)?,
            },
            price_per_sqm: row.price_per_sqm,
            baseline_median: row.baseline_median,
            discount_pct: row.discount_pct,
            flip_score: row.flip_score,
            rent_score: row.rent_score,
            long_term_score: row.long_term_score,
            global_score: row.global_score,
            recommendation: parse::<Recommendation>("recommendation", &row.recommendation)?,
            regime: parse::<Regime>("regime", &row.regime)?,
            liquidity_score: row.liquidity_score,
            supply_risk: parse::<RiskLevel>("supply_risk", &row.supply_risk)?,
            status: parse::<OpportunityStatus>("status", &row.status)?,
        })
    }
}

#[async_trait]
impl MarketStore for PgStore {
    async fn upsert_features(&self, features: &[Feature]) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        for feature in features {
            let geo = match &feature.geo {
                Some(geo) => Some(serde_json::to_value(geo)?),
                None => None,
            };
            sqlx::query(
                r#"
                INSERT INTO features (
                    source, source_id, record_date, community, project, building,
                    rooms, property_type, price, area_sqm, price_per_sqm, offplan,
                    days_on_market, price_change_count, geo
                ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
                ON CONFLICT (source, source_id) DO UPDATE SET
                    record_date = EXCLUDED.record_date,
                    community = EXCLUDED.community,
                    project = EXCLUDED.project,
                    building = EXCLUDED.building,
                    rooms = EXCLUDED.rooms,
                    property_type = EXCLUDED.property_type,
                    price = EXCLUDED.price,
                    area_sqm = EXCLUDED.area_sqm,
                    price_per_sqm = EXCLUDED.price_per_sqm,
                    offplan = EXCLUDED.offplan,
                    days_on_market = EXCLUDED.days_on_market,
                    price_change_count = EXCLUDED.price_change_count,
                    geo = EXCLUDED.geo
                "#,
            )
            .bind(feature.source.as_str())
            .bind(&feature.source_id)
            .bind(feature.record_date)
            .bind(&feature.community)
            .bind(to_db(&feature.project))
            .bind(to_db(&feature.building))
            .bind(feature.rooms.as_str())
            .bind(&feature.property_type)
            .bind(feature.price)
            .bind(feature.area_sqm)
            .bind(feature.price_per_sqm)
            .bind(feature.offplan)
            .bind(feature.days_on_market)
            .bind(feature.price_change_count)
            .bind(geo)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn features_in_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Feature>, StoreError> {
        let rows = sqlx::query_as::<_, DbFeature>(
            "SELECT * FROM features WHERE record_date >= $1 AND record_date <= $2",
        )
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Feature::try_from).collect()
    }

    async fn upsert_rental_index(&self, rows: &[RentalIndexRecord]) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        for row in rows {
            sqlx::query(
                r#"
                INSERT INTO rental_index (community, project, rooms, median_annual_rent, mean_annual_rent)
                VALUES ($1, $2, $3, $4, $5)
                ON CONFLICT (community, project, rooms) DO UPDATE SET
                    median_annual_rent = EXCLUDED.median_annual_rent,
                    mean_annual_rent = EXCLUDED.mean_annual_rent
                "#,
            )
            .bind(&row.community)
            .bind(to_db(&row.project))
            .bind(row.rooms.as_str())
            .bind(row.median_annual_rent)
            .bind(row.mean_annual_rent)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn rental_index(&self) -> Result<Vec<RentalIndexRecord>, StoreError> {
        let rows = sqlx::query("SELECT * FROM rental_index")
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter()
            .map(|row| {
                Ok(RentalIndexRecord {
                    community: row.get("community"),
                    project: from_db(row.get("project")),
                    rooms: parse("rooms", row.get::<String, _>("rooms").as_str())?,
                    median_annual_rent: row.get("median_annual_rent"),
                    mean_annual_rent: row.get("mean_annual_rent"),
                })
            })
            .collect()
    }

    async fn upsert_supply(&self, rows: &[SupplyRecord]) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        for row in rows {
            sqlx::query(
                r#"
                INSERT INTO supply_pipeline (community, expected_completion, planned_units)
                VALUES ($1, $2, $3)
                ON CONFLICT (community, expected_completion) DO UPDATE SET
                    planned_units = EXCLUDED.planned_units
                "#,
            )
            .bind(&row.community)
            .bind(row.expected_completion)
            .bind(row.planned_units as i32)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn supply_records(&self) -> Result<Vec<SupplyRecord>, StoreError> {
        let rows = sqlx::query("SELECT * FROM supply_pipeline")
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .into_iter()
            .map(|row| SupplyRecord {
                community: row.get("community"),
                expected_completion: row.get("expected_completion"),
                planned_units: row.get::<i32, _>("planned_units") as u32,
            })
            .collect())
    }

    async fn upsert_baselines(&self, rows: &[MarketBaseline]) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        for row in rows {
            sqlx::query(
                r#"
                INSERT INTO market_baselines (
                    date, community, project, building, rooms, window_days,
                    median_ppsqm, p25_ppsqm, p75_ppsqm, mean_ppsqm, tx_count,
                    total_volume, momentum, volume_momentum, volatility, dispersion
                ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
                ON CONFLICT (date, community, project, building, rooms, window_days) DO UPDATE SET
                    median_ppsqm = EXCLUDED.median_ppsqm,
                    p25_ppsqm = EXCLUDED.p25_ppsqm,
                    p75_ppsqm = EXCLUDED.p75_ppsqm,
                    mean_ppsqm = EXCLUDED.mean_ppsqm,
                    tx_count = EXCLUDED.tx_count,
                    total_volume = EXCLUDED.total_volume,
                    momentum = EXCLUDED.momentum,
                    volume_momentum = EXCLUDED.volume_momentum,
                    volatility = EXCLUDED.volatility,
                    dispersion = EXCLUDED.dispersion
                "#,
            )
            .bind(row.date)
            .bind(&row.scope.community)
            .bind(to_db(&row.scope.project))
            .bind(to_db(&row.scope.building))
            .bind(row.scope.rooms.as_str())
            .bind(row.window.days() as i32)
            .bind(row.median_ppsqm)
            .bind(row.p25_ppsqm)
            .bind(row.p75_ppsqm)
            .bind(row.mean_ppsqm)
            .bind(row.tx_count as i32)
            .bind(row.total_volume)
            .bind(row.momentum)
            .bind(row.volume_momentum)
            .bind(row.volatility)
            .bind(row.dispersion)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn baselines_for_date(
        &self,
        date: NaiveDate,
    ) -> Result<Vec<MarketBaseline>, StoreError> {
        let rows = sqlx::query_as::<_, DbBaseline>(
            "SELECT * FROM market_baselines WHERE date = $1",
        )
        .bind(date)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(MarketBaseline::try_from).collect()
    }

    async fn upsert_regimes(&self, rows: &[MarketRegime]) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        for row in rows {
            sqlx::query(
                r#"
                INSERT INTO market_regimes (
                    date, community, project, building, regime, confidence,
                    price_trend, volume_trend, dispersion_level, volatility_level
                ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                ON CONFLICT (date, community, project, building) DO UPDATE SET
                    regime = EXCLUDED.regime,
                    confidence = EXCLUDED.confidence,
                    price_trend = EXCLUDED.price_trend,
                    volume_trend = EXCLUDED.volume_trend,
                    dispersion_level = EXCLUDED.dispersion_level,
                    volatility_level = EXCLUDED.volatility_level
                "#,
            )
            .bind(row.date)
            .bind(&row.location.community)
            .bind(to_db(&row.location.project))
            .bind(to_db(&row.location.building))
            .bind(row.regime.as_str())
            .bind(row.confidence)
            .bind(row.price_trend.as_str())
            .bind(row.volume_trend.as_str())
            .bind(row.dispersion_level.as_str())
            .bind(row.volatility_level.as_str())
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn regimes_for_date(&self, date: NaiveDate) -> Result<Vec<MarketRegime>, StoreError> {
        let rows = sqlx::query_as::<_, DbRegime>("SELECT * FROM market_regimes WHERE date = $1")
            .bind(date)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(MarketRegime::try_from).collect()
    }

    async fn latest_regime_before(
        &self,
        location: &LocationKey,
        date: NaiveDate,
    ) -> Result<Option<MarketRegime>, StoreError> {
        let row = sqlx::query_as::<_, DbRegime>(
            r#"
            SELECT * FROM market_regimes
            WHERE community = $1 AND project = $2 AND building = $3 AND date < $4
            ORDER BY date DESC
            LIMIT 1
            "#,
        )
        .bind(&location.community)
        .bind(to_db(&location.project))
        .bind(to_db(&location.building))
        .bind(date)
        .fetch_optional(&self.pool)
        .await?;

        row.map(MarketRegime::try_from).transpose()
    }

    async fn upsert_kpis(&self, rows: &[KpiSet]) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        for row in rows {
            let inputs = serde_json::to_value(&row.inputs)?;
            sqlx::query(
                r#"
                INSERT INTO kpis (
                    date, community, project, building, rooms, window_days,
                    tls, lad, rsg, spi, gpi, rcwm, ord, aps, inputs
                ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
                ON CONFLICT (date, community, project, building, rooms, window_days) DO UPDATE SET
                    tls = EXCLUDED.tls,
                    lad = EXCLUDED.lad,
                    rsg = EXCLUDED.rsg,
                    spi = EXCLUDED.spi,
                    gpi = EXCLUDED.gpi,
                    rcwm = EXCLUDED.rcwm,
                    ord = EXCLUDED.ord,
                    aps = EXCLUDED.aps,
                    inputs = EXCLUDED.inputs
                "#,
            )
            .bind(row.date)
            .bind(&row.scope.community)
            .bind(to_db(&row.scope.project))
            .bind(to_db(&row.scope.building))
            .bind(row.scope.rooms.as_str())
            .bind(row.window.days() as i32)
            .bind(row.tls)
            .bind(row.lad)
            .bind(row.rsg)
            .bind(row.spi)
            .bind(row.gpi)
            .bind(row.rcwm)
            .bind(row.ord)
            .bind(row.aps)
            .bind(inputs)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn kpis_for_date(&self, date: NaiveDate) -> Result<Vec<KpiSet>, StoreError> {
        let rows = sqlx::query_as::<_, DbKpiSet>("SELECT * FROM kpis WHERE date = $1")
            .bind(date)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(KpiSet::try_from).collect()
    }

    async fn upsert_risk_summaries(&self, rows: &[RiskSummary]) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        for row in rows {
            let factors = serde_json::to_value(&row.risk_factors)?;
            sqlx::query(
                r#"
                INSERT INTO risk_summaries (
                    date, community, project, building, supply_risk, volatility_risk,
                    divergence_risk, spi, volatility, tls_abs, risk_score, risk_factors
                ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
                ON CONFLICT (date, community, project, building) DO UPDATE SET
                    supply_risk = EXCLUDED.supply_risk,
                    volatility_risk = EXCLUDED.volatility_risk,
                    divergence_risk = EXCLUDED.divergence_risk,
                    spi = EXCLUDED.spi,
                    volatility = EXCLUDED.volatility,
                    tls_abs = EXCLUDED.tls_abs,
                    risk_score = EXCLUDED.risk_score,
                    risk_factors = EXCLUDED.risk_factors
                "#,
            )
            .bind(row.date)
            .bind(&row.location.community)
            .bind(to_db(&row.location.project))
            .bind(to_db(&row.location.building))
            .bind(row.supply_risk.as_str())
            .bind(row.volatility_risk.as_str())
            .bind(row.divergence_risk.as_str())
            .bind(row.spi)
            .bind(row.volatility)
            .bind(row.tls_abs)
            .bind(row.risk_score)
            .bind(factors)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn risk_summaries_for_date(
        &self,
        date: NaiveDate,
    ) -> Result<Vec<RiskSummary>, StoreError> {
        let rows = sqlx::query_as::<_, DbRiskSummary>(
            "SELECT * FROM risk_summaries WHERE date = $1",
        )
        .bind(date)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(RiskSummary::try_from).collect()
    }

    async fn upsert_opportunities(&self, rows: &[Opportunity]) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        for row in rows {
            sqlx::query(
                r#"
                INSERT INTO opportunities (
                    source_id, detected_on, community, project, building, rooms,
                    price_per_sqm, baseline_median, discount_pct, flip_score, rent_score,
                    long_term_score, global_score, recommendation, regime,
                    liquidity_score, supply_risk, status
                ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)
                ON CONFLICT (source_id, detected_on) DO UPDATE SET
                    community = EXCLUDED.community,
                    project = EXCLUDED.project,
                    building = EXCLUDED.building,
                    rooms = EXCLUDED.rooms,
                    price_per_sqm = EXCLUDED.price_per_sqm,
                    baseline_median = EXCLUDED.baseline_median,
                    discount_pct = EXCLUDED.discount_pct,
                    flip_score = EXCLUDED.flip_score,
                    rent_score = EXCLUDED.rent_score,
                    long_term_score = EXCLUDED.long_term_score,
                    global_score = EXCLUDED.global_score,
                    recommendation = EXCLUDED.recommendation,
                    regime = EXCLUDED.regime,
                    liquidity_score = EXCLUDED.liquidity_score,
                    supply_risk = EXCLUDED.supply_risk,
                    status = EXCLUDED.status
                "#,
            )
            .bind(&row.source_id)
            .bind(row.detected_on)
            .bind(&row.scope.community)
            .bind(to_db(&row.scope.project))
            .bind(to_db(&row.scope.building))
            .bind(row.scope.rooms.as_str())
            .bind(row.price_per_sqm)
            .bind(row.baseline_median)
            .bind(row.discount_pct)
            .bind(row.flip_score)
            .bind(row.rent_score)
            .bind(row.long_term_score)
            .bind(row.global_score)
            .bind(row.recommendation.as_str())
            .bind(row.regime.as_str())
            .bind(row.liquidity_score)
            .bind(row.supply_risk.as_str())
            .bind(row.status.as_str())
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn opportunities_for_date(
        &self,
        date: NaiveDate,
    ) -> Result<Vec<Opportunity>, StoreError> {
        let rows = sqlx::query_as::<_, DbOpportunity>(
            "SELECT * FROM opportunities WHERE detected_on = $1",
        )
        .bind(date)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Opportunity::try_from).collect()
    }

    async fn active_opportunities(&self) -> Result<Vec<Opportunity>, StoreError> {
        let rows = sqlx::query_as::<_, DbOpportunity>(
            "SELECT * FROM opportunities WHERE status = 'active'",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Opportunity::try_from).collect()
    }

    async fn close_opportunities(
        &self,
        keys: &[(String, NaiveDate)],
    ) -> Result<u64, StoreError> {
        let mut tx = self.pool.begin().await?;
        let mut closed = 0;
        for (source_id, detected_on) in keys {
            let result = sqlx::query(
                r#"
                UPDATE opportunities SET status = 'closed'
                WHERE source_id = $1 AND detected_on = $2 AND status = 'active'
                "#,
            )
            .bind(source_id)
            .bind(detected_on)
            .execute(&mut *tx)
            .await?;
            closed += result.rows_affected();
        }
        tx.commit().await?;
        Ok(closed)
    }

    async fn opportunity_dates_for_scope(
        &self,
        scope: &ScopeKey,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<NaiveDate>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT DISTINCT detected_on FROM opportunities
            WHERE community = $1 AND project = $2 AND building = $3 AND rooms = $4
              AND detected_on >= $5 AND detected_on <= $6
            ORDER BY detected_on ASC
            "#,
        )
        .bind(&scope.community)
        .bind(to_db(&scope.project))
        .bind(to_db(&scope.building))
        .bind(scope.rooms.as_str())
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| row.get::<NaiveDate, _>("detected_on"))
            .collect())
    }
}
