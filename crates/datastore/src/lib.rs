//! # Skyline Datastore
//!
//! The persistence boundary of the analytics engine. The engine requires only
//! a store capable of keyed upsert and range/filter queries; that contract is
//! the `MarketStore` trait defined here.
//!
//! ## Architectural Principles
//!
//! - **Layer 3 Adapter:** Encapsulates all storage-specific logic behind a
//!   clean, abstract API. Nothing above this crate knows SQL.
//! - **Idempotent writes:** Every write is an upsert keyed by
//!   `(date, scope[, window])` or `(source, source_id)`, so re-runs and
//!   partial retries are safe.
//! - **Two backends:** `PgStore` (PostgreSQL via `sqlx`) for production and
//!   `MemoryStore` for tests and dry runs.
//!
//! ## Public API
//!
//! - `MarketStore`: the read/write contract the pipeline is written against.
//! - `connect` / `run_migrations`: PostgreSQL pool setup.
//! - `PgStore`, `MemoryStore`: the two implementations.
//! - `StoreError`: the specific error types this crate can return.

use async_trait::async_trait;
use chrono::NaiveDate;
use core_types::{
    Feature, KpiSet, MarketBaseline, MarketRegime, Opportunity, RentalIndexRecord, RiskSummary,
    ScopeKey, SupplyRecord,
};

// Declare the modules that constitute this crate.
pub mod connection;
pub mod error;
pub mod memory;
pub mod postgres;

// Re-export the key components to create a clean, public-facing API.
pub use connection::{connect, run_migrations};
pub use error::StoreError;
pub use memory::MemoryStore;
pub use postgres::PgStore;

use core_types::LocationKey;

/// The keyed-upsert / range-query contract the analytics engine needs.
///
/// One pipeline run produces a complete, self-consistent set of rows for its
/// calculation date, so no read-modify-write cycles are required; every write
/// overwrites whatever a previous run left behind for the same key.
#[async_trait]
pub trait MarketStore: Send + Sync {
    // --- Features and reference data ---

    /// Upserts normalized observations keyed by `(source, source_id)`.
    async fn upsert_features(&self, features: &[Feature]) -> Result<(), StoreError>;

    /// All features dated within `[start, end]` inclusive.
    async fn features_in_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Feature>, StoreError>;

    async fn upsert_rental_index(&self, rows: &[RentalIndexRecord]) -> Result<(), StoreError>;
    async fn rental_index(&self) -> Result<Vec<RentalIndexRecord>, StoreError>;

    async fn upsert_supply(&self, rows: &[SupplyRecord]) -> Result<(), StoreError>;
    async fn supply_records(&self) -> Result<Vec<SupplyRecord>, StoreError>;

    // --- Stage outputs, keyed by calculation date ---

    async fn upsert_baselines(&self, rows: &[MarketBaseline]) -> Result<(), StoreError>;
    async fn baselines_for_date(&self, date: NaiveDate) -> Result<Vec<MarketBaseline>, StoreError>;

    async fn upsert_regimes(&self, rows: &[MarketRegime]) -> Result<(), StoreError>;
    async fn regimes_for_date(&self, date: NaiveDate) -> Result<Vec<MarketRegime>, StoreError>;

    /// The most recent regime strictly before `date` for a location, if any.
    /// Feeds regime-change detection.
    async fn latest_regime_before(
        &self,
        location: &LocationKey,
        date: NaiveDate,
    ) -> Result<Option<MarketRegime>, StoreError>;

    async fn upsert_kpis(&self, rows: &[KpiSet]) -> Result<(), StoreError>;
    async fn kpis_for_date(&self, date: NaiveDate) -> Result<Vec<KpiSet>, StoreError>;

    async fn upsert_risk_summaries(&self, rows: &[RiskSummary]) -> Result<(), StoreError>;
    async fn risk_summaries_for_date(
        &self,
        date: NaiveDate,
    ) -> Result<Vec<RiskSummary>, StoreError>;

    // --- Opportunities ---

    async fn upsert_opportunities(&self, rows: &[Opportunity]) -> Result<(), StoreError>;
    async fn opportunities_for_date(
        &self,
        date: NaiveDate,
    ) -> Result<Vec<Opportunity>, StoreError>;
    async fn active_opportunities(&self) -> Result<Vec<Opportunity>, StoreError>;

    /// Marks the identified opportunities closed. Returns how many rows
    /// changed state.
    async fn close_opportunities(
        &self,
        keys: &[(String, NaiveDate)],
    ) -> Result<u64, StoreError>;

    /// Distinct detection dates within `[start, end]` on which a scope had at
    /// least one opportunity. Feeds the anomaly-persistence KPI.
    async fn opportunity_dates_for_scope(
        &self,
        scope: &ScopeKey,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<NaiveDate>, StoreError>;
}
