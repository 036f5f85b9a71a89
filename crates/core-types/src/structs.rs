use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::enums::{
    BandLevel, OpportunityStatus, Recommendation, Regime, RiskLevel, RoomsBucket, SourceKind,
    TrendLabel, Window,
};
use crate::scope::{LocationKey, ScopeKey};

/// A raw transaction or listing record as delivered by an upstream connector,
/// before any validation. Everything that can be missing is optional here; the
/// normalizer decides what is fatal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawMarketRecord {
    pub source: SourceKind,
    pub source_id: String,
    pub recorded_at: NaiveDate,
    pub community: Option<String>,
    pub project: Option<String>,
    pub building: Option<String>,
    pub rooms: Option<i32>,
    pub property_type: Option<String>,
    pub price: Option<Decimal>,
    pub area_sqm: Option<Decimal>,
    pub price_per_sqm: Option<f64>,
    #[serde(default)]
    pub offplan: Option<bool>,
    #[serde(default)]
    pub days_on_market: Option<i32>,
    #[serde(default)]
    pub price_change_count: Option<i32>,
}

/// Optional geo context attached to a `Feature` by the enrichment step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoEnrichment {
    pub latitude: f64,
    pub longitude: f64,
    pub metro_km: Option<f64>,
    pub beach_km: Option<f64>,
    pub mall_km: Option<f64>,
    /// Weighted proximity blend in [0, 100].
    pub location_score: f64,
}

/// One normalized observation: a sale or an active listing that passed
/// validation. Immutable once written; superseded via upsert on
/// `(source, source_id)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    pub source: SourceKind,
    pub source_id: String,
    pub record_date: NaiveDate,
    pub community: String,
    pub project: Option<String>,
    pub building: Option<String>,
    pub rooms: RoomsBucket,
    pub property_type: Option<String>,
    pub price: Decimal,
    pub area_sqm: Decimal,
    pub price_per_sqm: f64,
    pub offplan: bool,
    /// Listings only.
    pub days_on_market: Option<i32>,
    pub price_change_count: i32,
    pub geo: Option<GeoEnrichment>,
}

impl Feature {
    pub fn scope(&self) -> ScopeKey {
        ScopeKey {
            community: self.community.clone(),
            project: self.project.clone(),
            building: self.building.clone(),
            rooms: self.rooms,
        }
    }
}

/// Windowed transaction statistics for one scope on one calculation date.
///
/// Each window is an independent snapshot over features dated within
/// `[date - window, date]`, never a rolling delta of another window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketBaseline {
    pub date: NaiveDate,
    pub scope: ScopeKey,
    pub window: Window,
    pub median_ppsqm: f64,
    pub p25_ppsqm: f64,
    pub p75_ppsqm: f64,
    pub mean_ppsqm: f64,
    pub tx_count: u32,
    pub total_volume: Decimal,
    /// Fractional price change vs. the preceding equal-length window; `None`
    /// when the preceding window holds no data.
    pub momentum: Option<f64>,
    /// Fractional change in transaction count vs. the preceding window.
    pub volume_momentum: Option<f64>,
    /// Coefficient of variation of price-per-sqm.
    pub volatility: f64,
    /// (p75 - p25) / median.
    pub dispersion: f64,
}

/// Market-phase classification for a location scope on a date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketRegime {
    pub date: NaiveDate,
    pub location: LocationKey,
    pub regime: Regime,
    /// Normalized margin over the triggering threshold, in [0, 1].
    pub confidence: f64,
    pub price_trend: TrendLabel,
    pub volume_trend: TrendLabel,
    pub dispersion_level: BandLevel,
    pub volatility_level: BandLevel,
}

/// The raw inputs a KPI row was computed from, kept for auditability.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KpiInputs {
    pub median_tx_ppsqm: Option<f64>,
    pub median_listing_ppsqm: Option<f64>,
    pub tx_count_window: u32,
    pub tx_count_30d: u32,
    pub tx_count_12m: u32,
    pub planned_units_12m: u32,
    pub median_annual_rent: Option<Decimal>,
    pub typical_area_sqm: Option<Decimal>,
    pub location_score: Option<f64>,
    pub price_premium: Option<f64>,
    pub momentum: Option<f64>,
    pub regime_confidence: Option<f64>,
    pub median_offplan_ppsqm: Option<f64>,
    pub median_ready_ppsqm: Option<f64>,
    pub best_discount_pct: Option<f64>,
    pub days_anomaly_active: u32,
}

/// The eight derived indicators for one (scope, window, date). Each is
/// independently nullable depending on input availability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KpiSet {
    pub date: NaiveDate,
    pub scope: ScopeKey,
    pub window: Window,
    /// Transaction-to-Listing Spread.
    pub tls: Option<f64>,
    /// Liquidity-Adjusted Discount.
    pub lad: Option<f64>,
    /// Rental Stress Gap.
    pub rsg: Option<f64>,
    /// Supply Pressure Index, normalized 0-100.
    pub spi: Option<f64>,
    /// Geo-Premium Index.
    pub gpi: Option<f64>,
    /// Regime-Confidence-Weighted Momentum.
    pub rcwm: Option<f64>,
    /// Offplan Risk Delta.
    pub ord: Option<f64>,
    /// Anomaly Persistence Score.
    pub aps: Option<f64>,
    pub inputs: KpiInputs,
}

/// Per-location risk classification for one calculation date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskSummary {
    pub date: NaiveDate,
    pub location: LocationKey,
    pub supply_risk: RiskLevel,
    pub volatility_risk: RiskLevel,
    pub divergence_risk: RiskLevel,
    pub spi: Option<f64>,
    pub volatility: Option<f64>,
    pub tls_abs: Option<f64>,
    /// Weighted blend of the three dimensions, in [0, 100].
    pub risk_score: f64,
    pub risk_factors: Vec<String>,
}

/// A scored, strategy-tagged candidate deal. Keyed by the source transaction
/// id and the detection date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Opportunity {
    pub source_id: String,
    pub detected_on: NaiveDate,
    pub scope: ScopeKey,
    pub price_per_sqm: f64,
    pub baseline_median: f64,
    pub discount_pct: f64,
    pub flip_score: f64,
    pub rent_score: f64,
    pub long_term_score: f64,
    pub global_score: f64,
    pub recommendation: Recommendation,
    pub regime: Regime,
    pub liquidity_score: f64,
    pub supply_risk: RiskLevel,
    pub status: OpportunityStatus,
}

/// Median rental benchmark for a (community, project?, rooms) scope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RentalIndexRecord {
    pub community: String,
    pub project: Option<String>,
    pub rooms: RoomsBucket,
    pub median_annual_rent: Decimal,
    pub mean_annual_rent: Option<Decimal>,
}

/// Planned residential supply for a community.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupplyRecord {
    pub community: String,
    pub planned_units: u32,
    pub expected_completion: NaiveDate,
}
