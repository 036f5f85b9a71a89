//! # Skyline Configuration
//!
//! Strongly-typed, immutable configuration for every pipeline stage. The
//! reference thresholds ship as `Default` impls; a `config.toml` at the
//! working directory can override any subset of them.

use crate::error::ConfigError;

// Declare the modules that make up this crate.
pub mod error;
pub mod settings;

// Re-export the core types to provide a clean public API.
pub use settings::{
    BaselineConfig, Config, DetectorConfig, GeoWeights, KpiConfig, NormalizerConfig,
    NotifierConfig, RegimeThresholds, RiskThresholds, ScoringConfig,
};

/// Loads the engine configuration, layering an optional `config.toml` over
/// the built-in defaults.
pub fn load_config() -> Result<Config, ConfigError> {
    let builder = config::Config::builder()
        // The file is optional; every field has a serde default.
        .add_source(config::File::with_name("config.toml").required(false))
        .build()?;

    let config = builder.try_deserialize::<Config>()?;
    validate(&config)?;

    Ok(config)
}

/// Rejects configurations that would make the engine silently misbehave.
fn validate(config: &Config) -> Result<(), ConfigError> {
    if config.normalizer.min_price_per_sqm >= config.normalizer.max_price_per_sqm {
        return Err(ConfigError::Invalid(
            "normalizer price-per-sqm band is empty".to_string(),
        ));
    }
    if config.baselines.min_samples == 0 {
        return Err(ConfigError::Invalid(
            "baselines.min_samples must be at least 1".to_string(),
        ));
    }
    if config.regimes.momentum_down >= config.regimes.momentum_up {
        return Err(ConfigError::Invalid(
            "regime momentum thresholds are inverted".to_string(),
        ));
    }
    if config.kpis.target_yield <= 0.0 {
        return Err(ConfigError::Invalid(
            "kpis.target_yield must be positive".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_thresholds() {
        let config = Config::default();
        assert_eq!(config.normalizer.min_price_per_sqm, 500.0);
        assert_eq!(config.normalizer.max_price_per_sqm, 10_000.0);
        assert_eq!(config.baselines.min_samples, 3);
        assert_eq!(config.regimes.momentum_up, 0.05);
        assert_eq!(config.regimes.momentum_down, -0.05);
        assert_eq!(config.kpis.target_yield, 0.06);
        assert_eq!(config.detector.min_discount_pct, 10.0);
        assert_eq!(config.detector.min_liquidity, 5);
        assert_eq!(config.scoring.ignore_below, 40.0);
        assert_eq!(config.notifier.min_regime_confidence, 0.7);
    }

    #[test]
    fn default_config_passes_validation() {
        assert!(validate(&Config::default()).is_ok());
    }

    #[test]
    fn inverted_band_is_rejected() {
        let mut config = Config::default();
        config.normalizer.min_price_per_sqm = 20_000.0;
        assert!(validate(&config).is_err());
    }
}
