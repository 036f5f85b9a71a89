//! # Skyline Feature Normalizer
//!
//! Turns raw transaction/listing records into canonical `Feature`s. This is
//! the leaf stage of the pipeline: it has no dependency on any other stage.
//!
//! ## Architectural Principles
//!
//! - **Reject, never clamp:** records outside the valid price-per-sqm band are
//!   dropped with a reason; no value is ever silently adjusted.
//! - **Observability as a value:** a `QualityAccumulator` is threaded through
//!   each batch and returned with the output, instead of a singleton metrics
//!   object.
//! - **Cached enrichment:** geo lookups are the only external I/O in the
//!   engine and are cached per distinct location key for the run.
//!
//! ## Public API
//!
//! - `FeatureNormalizer`: validates and converts one record at a time.
//! - `GeoProvider` / `GeoCache`: the enrichment seam and its per-run cache.
//! - `QualityAccumulator` / `QualityReport`: batch observability counters.

use rust_decimal::prelude::ToPrimitive;
use tracing::debug;

use configuration::NormalizerConfig;
use core_types::{Feature, RawMarketRecord, RejectReason, RoomsBucket, SourceKind};

// Declare the modules that constitute this crate.
pub mod error;
pub mod geo;
pub mod quality;

// Re-export the key components to create a clean, public-facing API.
pub use error::NormalizerError;
pub use geo::{GeoCache, GeoFix, GeoProvider, StaticGeoProvider};
pub use quality::{QualityAccumulator, QualityReport};

/// Validates raw records and produces canonical `Feature`s.
#[derive(Debug, Clone)]
pub struct FeatureNormalizer {
    config: NormalizerConfig,
}

impl FeatureNormalizer {
    pub fn new(config: NormalizerConfig) -> Self {
        Self { config }
    }

    /// Normalizes a single record. Returns the reject reason instead of a
    /// feature when the record cannot be used.
    pub fn normalize(&self, raw: &RawMarketRecord) -> Result<Feature, RejectReason> {
        let price = match raw.price {
            Some(price) if price > rust_decimal::Decimal::ZERO => price,
            _ => return Err(RejectReason::MissingPrice),
        };
        let area_sqm = match raw.area_sqm {
            Some(area) if area > rust_decimal::Decimal::ZERO => area,
            _ => return Err(RejectReason::MissingArea),
        };

        let price_per_sqm = match raw.price_per_sqm {
            Some(ppsqm) if ppsqm > 0.0 => ppsqm,
            _ => (price / area_sqm)
                .to_f64()
                .ok_or(RejectReason::InvalidData)?,
        };

        if price_per_sqm < self.config.min_price_per_sqm
            || price_per_sqm > self.config.max_price_per_sqm
        {
            return Err(RejectReason::Outlier);
        }

        let community = raw
            .community
            .as_deref()
            .map(clean_location)
            .filter(|c| !c.is_empty())
            .ok_or(RejectReason::InvalidData)?;
        let rooms = raw
            .rooms
            .map(RoomsBucket::from_count)
            .ok_or(RejectReason::InvalidData)?;

        Ok(Feature {
            source: raw.source,
            source_id: raw.source_id.clone(),
            record_date: raw.recorded_at,
            community,
            project: clean_optional(&raw.project),
            building: clean_optional(&raw.building),
            rooms,
            property_type: clean_optional(&raw.property_type),
            price,
            area_sqm,
            price_per_sqm,
            offplan: raw.offplan.unwrap_or(false),
            days_on_market: match raw.source {
                SourceKind::Listing => raw.days_on_market,
                SourceKind::Transaction => None,
            },
            price_change_count: raw.price_change_count.unwrap_or(0),
            geo: None,
        })
    }

    /// Normalizes a whole batch, enriching accepted features with geo data and
    /// recording accept/reject counts into `quality`.
    pub fn normalize_batch(
        &self,
        raws: &[RawMarketRecord],
        geo: &mut GeoCache<'_>,
        quality: &mut QualityAccumulator,
    ) -> Vec<Feature> {
        let mut features = Vec::with_capacity(raws.len());
        for raw in raws {
            match self.normalize(raw) {
                Ok(mut feature) => {
                    feature.geo = geo.enrich(&feature.scope().location());
                    quality.record_accept(&feature);
                    features.push(feature);
                }
                Err(reason) => {
                    debug!(source_id = %raw.source_id, %reason, "record rejected");
                    quality.record_reject(reason);
                }
            }
        }
        features
    }
}

/// Trims and collapses internal whitespace in a location string.
fn clean_location(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn clean_optional(raw: &Option<String>) -> Option<String> {
    raw.as_deref()
        .map(clean_location)
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    fn raw(price: Option<i64>, area: Option<i64>) -> RawMarketRecord {
        RawMarketRecord {
            source: SourceKind::Transaction,
            source_id: "tx-1".to_string(),
            recorded_at: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
            community: Some("  Dubai   Marina ".to_string()),
            project: Some("Marina  Gate".to_string()),
            building: None,
            rooms: Some(2),
            property_type: Some("apartment".to_string()),
            price: price.map(Decimal::from),
            area_sqm: area.map(Decimal::from),
            price_per_sqm: None,
            offplan: None,
            days_on_market: None,
            price_change_count: None,
        }
    }

    fn normalizer() -> FeatureNormalizer {
        FeatureNormalizer::new(NormalizerConfig::default())
    }

    #[test]
    fn accepts_a_valid_transaction() {
        let feature = normalizer().normalize(&raw(Some(800_000), Some(100))).unwrap();
        assert_eq!(feature.community, "Dubai Marina");
        assert_eq!(feature.project.as_deref(), Some("Marina Gate"));
        assert_eq!(feature.rooms, RoomsBucket::Two);
        assert_eq!(feature.price_per_sqm, 8_000.0);
    }

    #[test]
    fn rejects_missing_price_and_area() {
        assert_eq!(
            normalizer().normalize(&raw(None, Some(100))).unwrap_err(),
            RejectReason::MissingPrice
        );
        assert_eq!(
            normalizer().normalize(&raw(Some(1_000_000), None)).unwrap_err(),
            RejectReason::MissingArea
        );
        assert_eq!(
            normalizer().normalize(&raw(Some(-5), Some(100))).unwrap_err(),
            RejectReason::MissingPrice
        );
    }

    #[test]
    fn rejects_out_of_band_price_per_sqm_instead_of_clamping() {
        // 100,000 / 500 = 200 per sqm, below the 500 floor.
        assert_eq!(
            normalizer().normalize(&raw(Some(100_000), Some(500))).unwrap_err(),
            RejectReason::Outlier
        );
        // 5,000,000 / 100 = 50,000 per sqm, above the 10,000 ceiling.
        assert_eq!(
            normalizer()
                .normalize(&raw(Some(5_000_000), Some(100)))
                .unwrap_err(),
            RejectReason::Outlier
        );
        // Band edges are inclusive.
        assert!(normalizer().normalize(&raw(Some(50_000), Some(100))).is_ok());
        assert!(normalizer().normalize(&raw(Some(1_000_000), Some(100))).is_ok());
    }

    #[test]
    fn rooms_map_to_buckets() {
        assert_eq!(RoomsBucket::from_count(0), RoomsBucket::Studio);
        assert_eq!(RoomsBucket::from_count(1), RoomsBucket::One);
        assert_eq!(RoomsBucket::from_count(2), RoomsBucket::Two);
        assert_eq!(RoomsBucket::from_count(3), RoomsBucket::ThreePlus);
        assert_eq!(RoomsBucket::from_count(7), RoomsBucket::ThreePlus);
    }

    #[test]
    fn batch_accumulates_quality_counts() {
        let normalizer = normalizer();
        let provider = StaticGeoProvider::empty();
        let mut geo = GeoCache::new(&provider, configuration::GeoWeights::default());
        let mut quality = QualityAccumulator::new();

        let batch = vec![raw(Some(1_000_000), Some(100)), raw(None, Some(100))];
        let features = normalizer.normalize_batch(&batch, &mut geo, &mut quality);

        assert_eq!(features.len(), 1);
        assert_eq!(quality.total, 2);
        assert_eq!(quality.accepted, 1);
        assert_eq!(quality.rejected, 1);
        assert_eq!(quality.reject_reasons["missing_price"], 1);
    }
}
