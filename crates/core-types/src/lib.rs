//! # Skyline Core Types
//!
//! The shared data model for the Skyline market analytics engine. Every other
//! crate in the workspace speaks in terms of these types.
//!
//! ## Architectural Principles
//!
//! - **Layer 0:** This crate has no knowledge of storage, configuration, or
//!   pipeline mechanics. It only defines the records that flow between stages.
//! - **Immutable observations:** A `Feature` is never mutated after it has been
//!   written; later runs supersede it via upsert on `(source, source_id)`.
//! - **Nullable by design:** Derived metrics whose inputs can be absent are
//!   `Option<f64>` rather than sentinel values.

pub mod enums;
pub mod error;
pub mod scope;
pub mod structs;

// Re-export the core types to provide a clean public API.
pub use enums::{
    BandLevel, OpportunityStatus, Recommendation, Regime, RejectReason, RiskLevel, RoomsBucket,
    RunStatus, SourceKind, Strategy, TrendLabel, Window,
};
pub use error::CoreError;
pub use scope::{LocationKey, ScopeKey};
pub use structs::{
    Feature, GeoEnrichment, KpiInputs, KpiSet, MarketBaseline, MarketRegime, Opportunity,
    RawMarketRecord, RentalIndexRecord, RiskSummary, SupplyRecord,
};
