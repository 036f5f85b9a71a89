use std::collections::HashMap;

use configuration::GeoWeights;
use core_types::{GeoEnrichment, LocationKey};

/// A resolved geo fix for a location, before scoring.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoFix {
    pub latitude: f64,
    pub longitude: f64,
    pub metro_km: Option<f64>,
    pub beach_km: Option<f64>,
    pub mall_km: Option<f64>,
}

/// Source of geo data for a location. Implementations may call external
/// services; the cache in front of them guarantees at most one lookup per
/// distinct location per run.
pub trait GeoProvider: Send + Sync {
    fn lookup(&self, key: &LocationKey) -> Option<GeoFix>;
}

/// A table-backed provider, keyed by community name. Useful as the default
/// provider and for tests.
#[derive(Debug, Default)]
pub struct StaticGeoProvider {
    entries: HashMap<String, GeoFix>,
}

impl StaticGeoProvider {
    pub fn new(entries: impl IntoIterator<Item = (String, GeoFix)>) -> Self {
        Self {
            entries: entries.into_iter().collect(),
        }
    }

    /// A provider that knows nothing; features pass through without geo data.
    pub fn empty() -> Self {
        Self::default()
    }
}

impl GeoProvider for StaticGeoProvider {
    fn lookup(&self, key: &LocationKey) -> Option<GeoFix> {
        self.entries.get(&key.community).copied()
    }
}

/// A per-run cache over a `GeoProvider`, keyed by the structured location
/// tuple. Lives for exactly one batch; nothing is persisted across runs.
pub struct GeoCache<'a> {
    provider: &'a dyn GeoProvider,
    weights: GeoWeights,
    cache: HashMap<LocationKey, Option<GeoEnrichment>>,
}

impl<'a> GeoCache<'a> {
    pub fn new(provider: &'a dyn GeoProvider, weights: GeoWeights) -> Self {
        Self {
            provider,
            weights,
            cache: HashMap::new(),
        }
    }

    /// Resolves and scores geo data for a location, consulting the provider
    /// at most once per distinct key.
    pub fn enrich(&mut self, key: &LocationKey) -> Option<GeoEnrichment> {
        if let Some(cached) = self.cache.get(key) {
            return cached.clone();
        }

        let enrichment = self.provider.lookup(key).map(|fix| GeoEnrichment {
            latitude: fix.latitude,
            longitude: fix.longitude,
            metro_km: fix.metro_km,
            beach_km: fix.beach_km,
            mall_km: fix.mall_km,
            location_score: location_score(&fix, &self.weights),
        });

        self.cache.insert(key.clone(), enrichment.clone());
        enrichment
    }
}

/// Weighted blend of the three proximity sub-scores, in [0, 100].
fn location_score(fix: &GeoFix, weights: &GeoWeights) -> f64 {
    let metro = proximity_band(fix.metro_km, &[0.5, 1.0, 2.0]);
    let beach = proximity_band(fix.beach_km, &[0.5, 1.5, 3.0]);
    let mall = proximity_band(fix.mall_km, &[1.0, 2.0, 4.0]);

    weights.metro * metro + weights.beach * beach + weights.mall * mall
}

/// Bands a distance into {100, 80, 60, 40}. An unknown distance scores as the
/// farthest band.
fn proximity_band(distance_km: Option<f64>, thresholds: &[f64; 3]) -> f64 {
    match distance_km {
        Some(d) if d <= thresholds[0] => 100.0,
        Some(d) if d <= thresholds[1] => 80.0,
        Some(d) if d <= thresholds[2] => 60.0,
        _ => 40.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingProvider {
        calls: AtomicUsize,
    }

    impl GeoProvider for CountingProvider {
        fn lookup(&self, _key: &LocationKey) -> Option<GeoFix> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Some(GeoFix {
                latitude: 25.08,
                longitude: 55.14,
                metro_km: Some(0.4),
                beach_km: Some(1.2),
                mall_km: Some(3.5),
            })
        }
    }

    #[test]
    fn cache_consults_provider_once_per_location() {
        let provider = CountingProvider {
            calls: AtomicUsize::new(0),
        };
        let mut cache = GeoCache::new(&provider, GeoWeights::default());
        let key = LocationKey::community_only("Marina");

        for _ in 0..5 {
            cache.enrich(&key);
        }
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);

        cache.enrich(&LocationKey::community_only("Downtown"));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn location_score_blends_banded_sub_scores() {
        // metro 0.4km -> 100, beach 1.2km -> 80, mall 3.5km -> 60.
        let fix = GeoFix {
            latitude: 0.0,
            longitude: 0.0,
            metro_km: Some(0.4),
            beach_km: Some(1.2),
            mall_km: Some(3.5),
        };
        let score = location_score(&fix, &GeoWeights::default());
        assert!((score - (0.40 * 100.0 + 0.30 * 80.0 + 0.30 * 60.0)).abs() < 1e-9);
    }

    #[test]
    fn missing_distances_fall_to_farthest_band() {
        let fix = GeoFix {
            latitude: 0.0,
            longitude: 0.0,
            metro_km: None,
            beach_km: None,
            mall_km: None,
        };
        assert_eq!(location_score(&fix, &GeoWeights::default()), 40.0);
    }
}
