use serde::Deserialize;

/// The root configuration structure for the analytics engine.
///
/// Every threshold the pipeline consults lives here as an immutable value
/// passed into the stage that needs it. Each section can be overridden
/// independently from `config.toml`; anything omitted keeps its default.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub normalizer: NormalizerConfig,
    pub baselines: BaselineConfig,
    pub regimes: RegimeThresholds,
    pub kpis: KpiConfig,
    pub risk: RiskThresholds,
    pub detector: DetectorConfig,
    pub scoring: ScoringConfig,
    pub notifier: NotifierConfig,
}

/// Validation bounds and geo-scoring weights for the feature normalizer.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NormalizerConfig {
    /// Records with price-per-sqm outside this band are rejected as outliers,
    /// never clamped.
    pub min_price_per_sqm: f64,
    pub max_price_per_sqm: f64,
    pub geo_weights: GeoWeights,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            min_price_per_sqm: 500.0,
            max_price_per_sqm: 10_000.0,
            geo_weights: GeoWeights::default(),
        }
    }
}

/// Weights of the proximity sub-scores in the location score blend.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GeoWeights {
    pub metro: f64,
    pub beach: f64,
    pub mall: f64,
}

impl Default for GeoWeights {
    fn default() -> Self {
        Self {
            metro: 0.40,
            beach: 0.30,
            mall: 0.30,
        }
    }
}

/// Parameters for the baseline calculator.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BaselineConfig {
    /// Scope/window pairs with fewer observations than this are skipped with
    /// `insufficient_data`.
    pub min_samples: usize,
    /// How far back to look when discovering active scopes.
    pub scope_lookback_days: i64,
}

impl Default for BaselineConfig {
    fn default() -> Self {
        Self {
            min_samples: 3,
            scope_lookback_days: 90,
        }
    }
}

/// Boundary thresholds for the regime classifier.
///
/// The exact boundary semantics are a calibration contract, not a bit-exact
/// one; keeping every threshold here lets historical label divergence be
/// tuned away without touching the classifier.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RegimeThresholds {
    pub momentum_up: f64,
    pub momentum_down: f64,
    pub dispersion_high: f64,
    pub dispersion_medium: f64,
    pub volatility_high: f64,
    pub volatility_medium: f64,
}

impl Default for RegimeThresholds {
    fn default() -> Self {
        Self {
            momentum_up: 0.05,
            momentum_down: -0.05,
            dispersion_high: 0.25,
            dispersion_medium: 0.15,
            volatility_high: 0.20,
            volatility_medium: 0.10,
        }
    }
}

/// Parameters for the KPI computer.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct KpiConfig {
    /// Gross rental yield assumed when deriving the expected rent for RSG.
    pub target_yield: f64,
    /// Horizon, in months after the calculation date, over which planned
    /// supply counts toward SPI.
    pub supply_horizon_months: u32,
}

impl Default for KpiConfig {
    fn default() -> Self {
        Self {
            target_yield: 0.06,
            supply_horizon_months: 12,
        }
    }
}

/// Banding thresholds for the risk summarizer.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RiskThresholds {
    pub supply_low: f64,
    pub supply_high: f64,
    pub volatility_low: f64,
    pub volatility_high: f64,
    pub divergence_low: f64,
    pub divergence_high: f64,
}

impl Default for RiskThresholds {
    fn default() -> Self {
        Self {
            supply_low: 30.0,
            supply_high: 70.0,
            volatility_low: 0.15,
            volatility_high: 0.25,
            divergence_low: 0.10,
            divergence_high: 0.20,
        }
    }
}

/// Parameters for the anomaly/opportunity detector.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Minimum discount vs. the baseline median for a transaction to qualify.
    pub min_discount_pct: f64,
    /// Minimum 30-day transaction count for a baseline to be eligible.
    pub min_liquidity: u32,
    /// Transactions dated within this many days of the detection date are
    /// considered.
    pub lookback_days: i64,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            min_discount_pct: 10.0,
            min_liquidity: 5,
            lookback_days: 7,
        }
    }
}

/// Parameters for the strategy scorer.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub flip_weight: f64,
    pub rent_weight: f64,
    pub long_term_weight: f64,
    /// Candidates whose global score falls below this are recommended IGNORE.
    pub ignore_below: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            flip_weight: 0.40,
            rent_weight: 0.30,
            long_term_weight: 0.30,
            ignore_below: 40.0,
        }
    }
}

/// Filters for the downstream notifier feed.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NotifierConfig {
    /// Regime changes below this confidence are not emitted as events.
    pub min_regime_confidence: f64,
    /// Active opportunities below this discount are not emitted.
    pub min_discount_pct: f64,
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            min_regime_confidence: 0.7,
            min_discount_pct: 10.0,
        }
    }
}
