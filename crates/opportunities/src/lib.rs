//! # Opportunities Crate
//!
//! Turns underpriced transactions into ranked, actionable opportunities.
//! The detector surfaces candidates priced well below their scope's 30-day
//! baseline; the scorer then grades each candidate against three investment
//! strategies and recommends the best fit, or `IGNORE` when none clears the
//! quality bar.
//!
//! ## Architectural Principles
//!
//! - **Detection is cheap, judgment is separate:** The detector applies only
//!   mechanical filters (discount, liquidity, recency). All interpretation of
//!   market conditions lives in the strategy scorers, which read a
//!   `MarketContext` assembled by the caller.
//! - **Bounded, comparable scores:** Every strategy score and the global
//!   score are clamped to 0-100, so opportunities rank consistently across
//!   scopes and dates.
//! - **Pure functions:** Scoring has no I/O and no clock. The same candidate
//!   and context always produce the same `Opportunity`.
//!
//! ## Public API
//!
//! - [`AnomalyDetector`]: Finds below-baseline transactions worth scoring.
//! - [`StrategyScorer`]: Grades candidates and produces [`Opportunity`] rows.
//! - [`MarketContext`]: Regime, risk, and yield inputs for one candidate.

pub mod detector;
pub mod error;
pub mod flip;
pub mod long_term;
pub mod ramp;
pub mod rent;

// Re-export the key components to create a clean, public-facing API.
pub use detector::{discount_pct, AnomalyDetector, Candidate};
pub use error::OpportunityError;
pub use ramp::Ramp;

use configuration::ScoringConfig;
use core_types::{Opportunity, OpportunityStatus, Recommendation, Regime, RiskLevel, Strategy};
use tracing::debug;

/// Market conditions surrounding one candidate, assembled by the pipeline
/// from the regime, risk, and rental stages.
#[derive(Debug, Clone)]
pub struct MarketContext {
    pub regime: Regime,
    pub regime_confidence: f64,
    pub supply_risk: RiskLevel,
    /// 30-day baseline momentum for the candidate's scope.
    pub momentum: Option<f64>,
    /// 30-day coefficient of variation for the candidate's scope.
    pub volatility: f64,
    /// Gross annual rental yield at the candidate's price, when a rental
    /// comparable exists.
    pub gross_yield: Option<f64>,
}

impl Default for MarketContext {
    fn default() -> Self {
        Self {
            regime: Regime::Neutral,
            regime_confidence: 0.5,
            supply_risk: RiskLevel::Unknown,
            momentum: None,
            volatility: 0.0,
            gross_yield: None,
        }
    }
}

/// How favourable each regime is to each strategy, 0-100.
pub fn regime_score(regime: Regime, strategy: Strategy) -> f64 {
    match (regime, strategy) {
        (Regime::Expansion, Strategy::Flip) => 90.0,
        (Regime::Expansion, Strategy::Rent) => 60.0,
        (Regime::Expansion, Strategy::LongTerm) => 80.0,
        (Regime::Accumulation, Strategy::Flip) => 75.0,
        (Regime::Accumulation, Strategy::Rent) => 70.0,
        (Regime::Accumulation, Strategy::LongTerm) => 90.0,
        (Regime::Neutral, _) => 50.0,
        (Regime::Distribution, Strategy::Flip) => 40.0,
        (Regime::Distribution, Strategy::Rent) => 75.0,
        (Regime::Distribution, Strategy::LongTerm) => 35.0,
        (Regime::Retournement, Strategy::Flip) => 20.0,
        (Regime::Retournement, Strategy::Rent) => 40.0,
        (Regime::Retournement, Strategy::LongTerm) => 15.0,
    }
}

/// Regime contribution for a strategy, pulled toward a neutral 50 when the
/// classification confidence is low.
pub fn regime_leg(regime: Regime, confidence: f64, strategy: Strategy) -> f64 {
    let c = confidence.clamp(0.0, 1.0);
    50.0 + (regime_score(regime, strategy) - 50.0) * c
}

/// Grades candidates against the three strategies and picks a
/// recommendation.
pub struct StrategyScorer {
    config: ScoringConfig,
}

impl StrategyScorer {
    pub fn new(config: ScoringConfig) -> Self {
        Self { config }
    }

    /// Produces a fully scored [`Opportunity`] for one candidate.
    ///
    /// The recommendation is the highest-scoring strategy, unless the
    /// weighted global score falls below the ignore threshold.
    pub fn score(&self, candidate: &Candidate, ctx: &MarketContext) -> Opportunity {
        let flip_score = flip::score(candidate, ctx);
        let rent_score = rent::score(candidate, ctx);
        let long_term_score = long_term::score(candidate, ctx);

        let global_score = (self.config.flip_weight * flip_score
            + self.config.rent_weight * rent_score
            + self.config.long_term_weight * long_term_score)
            .clamp(0.0, 100.0);

        let best = [
            (Strategy::Flip, flip_score),
            (Strategy::Rent, rent_score),
            (Strategy::LongTerm, long_term_score),
        ]
        .into_iter()
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(strategy, _)| strategy)
        .unwrap_or(Strategy::LongTerm);

        let recommendation = if global_score < self.config.ignore_below {
            Recommendation::Ignore
        } else {
            Recommendation::from(best)
        };

        debug!(
            source_id = %candidate.feature.source_id,
            global_score,
            recommendation = recommendation.as_str(),
            "Scored opportunity"
        );

        Opportunity {
            source_id: candidate.feature.source_id.clone(),
            detected_on: candidate.feature.record_date,
            scope: candidate.feature.scope(),
            price_per_sqm: candidate.feature.price_per_sqm,
            baseline_median: candidate.baseline_median,
            discount_pct: candidate.discount_pct,
            flip_score,
            rent_score,
            long_term_score,
            global_score,
            recommendation,
            regime: ctx.regime,
            liquidity_score: ramp::LIQUIDITY_RAMP.score(candidate.tx_count_30d as f64),
            supply_risk: ctx.supply_risk,
            status: OpportunityStatus::Active,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use core_types::{Feature, RoomsBucket, SourceKind};
    use rust_decimal::Decimal;

    fn candidate(discount: f64, tx_count: u32) -> Candidate {
        let median = 1000.0;
        let ppsqm = median * (1.0 - discount / 100.0);
        Candidate {
            feature: Feature {
                source: SourceKind::Transaction,
                source_id: "T-1".to_string(),
                record_date: NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
                community: "Zone A".to_string(),
                project: None,
                building: None,
                rooms: RoomsBucket::Two,
                property_type: None,
                price: Decimal::from((ppsqm * 100.0) as i64),
                area_sqm: Decimal::from(100),
                price_per_sqm: ppsqm,
                offplan: false,
                days_on_market: None,
                price_change_count: 0,
                geo: None,
            },
            baseline_median: median,
            discount_pct: discount,
            tx_count_30d: tx_count,
        }
    }

    #[test]
    fn expansion_discount_favours_flip() {
        let ctx = MarketContext {
            regime: Regime::Expansion,
            regime_confidence: 0.9,
            supply_risk: RiskLevel::Low,
            momentum: Some(0.08),
            volatility: 0.05,
            gross_yield: None,
        };
        let scorer = StrategyScorer::new(ScoringConfig::default());
        let opp = scorer.score(&candidate(25.0, 25), &ctx);

        assert!(opp.flip_score > opp.rent_score);
        assert!(opp.flip_score > opp.long_term_score);
        assert_eq!(opp.recommendation, Recommendation::Flip);
        assert!(opp.global_score >= 40.0);
    }

    #[test]
    fn retournement_drags_everything_down() {
        let calm = MarketContext {
            regime: Regime::Expansion,
            supply_risk: RiskLevel::Low,
            volatility: 0.05,
            ..MarketContext::default()
        };
        let crash = MarketContext {
            regime: Regime::Retournement,
            supply_risk: RiskLevel::High,
            momentum: Some(-0.10),
            volatility: 0.28,
            ..MarketContext::default()
        };
        let scorer = StrategyScorer::new(ScoringConfig::default());
        let c = candidate(15.0, 10);

        let good = scorer.score(&c, &calm);
        let bad = scorer.score(&c, &crash);
        assert!(bad.global_score < good.global_score);
        assert!(bad.flip_score < good.flip_score);
    }

    #[test]
    fn weak_candidate_is_ignored() {
        let ctx = MarketContext {
            regime: Regime::Retournement,
            supply_risk: RiskLevel::High,
            momentum: Some(-0.10),
            volatility: 0.30,
            ..MarketContext::default()
        };
        let scorer = StrategyScorer::new(ScoringConfig::default());
        let opp = scorer.score(&candidate(10.0, 5), &ctx);

        assert!(opp.global_score < 40.0);
        assert_eq!(opp.recommendation, Recommendation::Ignore);
    }

    #[test]
    fn strong_yield_favours_rent() {
        let ctx = MarketContext {
            regime: Regime::Distribution,
            supply_risk: RiskLevel::Medium,
            momentum: Some(-0.02),
            volatility: 0.06,
            gross_yield: Some(0.085),
            ..MarketContext::default()
        };
        let scorer = StrategyScorer::new(ScoringConfig::default());
        let opp = scorer.score(&candidate(12.0, 8), &ctx);

        assert!(opp.rent_score > opp.flip_score);
        assert!(opp.rent_score > opp.long_term_score);
    }

    #[test]
    fn scores_stay_bounded() {
        let ctx = MarketContext {
            regime: Regime::Expansion,
            supply_risk: RiskLevel::Low,
            momentum: Some(0.5),
            volatility: 0.01,
            gross_yield: Some(0.20),
            ..MarketContext::default()
        };
        let scorer = StrategyScorer::new(ScoringConfig::default());
        let opp = scorer.score(&candidate(60.0, 100), &ctx);

        for s in [
            opp.flip_score,
            opp.rent_score,
            opp.long_term_score,
            opp.global_score,
        ] {
            assert!((0.0..=100.0).contains(&s));
        }
    }

    #[test]
    fn regime_table_matches_intuition() {
        assert!(
            regime_score(Regime::Expansion, Strategy::Flip)
                > regime_score(Regime::Distribution, Strategy::Flip)
        );
        assert!(
            regime_score(Regime::Accumulation, Strategy::LongTerm)
                > regime_score(Regime::Retournement, Strategy::LongTerm)
        );
        assert_eq!(regime_score(Regime::Neutral, Strategy::Rent), 50.0);
    }
}
