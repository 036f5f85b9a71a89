//! Long-term strategy: accumulate below baseline and hold through cycles.

use crate::detector::Candidate;
use crate::ramp::{DISCOUNT_RAMP, MOMENTUM_RAMP};
use crate::{regime_leg, MarketContext};
use core_types::{Regime, RiskLevel, Strategy};

const W_REGIME: f64 = 0.35;
const W_DISCOUNT: f64 = 0.30;
const W_MOMENTUM: f64 = 0.20;
const W_SUPPLY: f64 = 0.15;

const HIGH_VOLATILITY: f64 = 0.25;
const MEDIUM_VOLATILITY: f64 = 0.20;
const PENALTY_HIGH_VOLATILITY: f64 = 20.0;
const PENALTY_MEDIUM_VOLATILITY: f64 = 10.0;
const PENALTY_RETOURNEMENT: f64 = 25.0;
const PENALTY_SUPPLY_HIGH: f64 = 15.0;

fn supply_score(level: RiskLevel) -> f64 {
    match level {
        RiskLevel::Low => 90.0,
        RiskLevel::Medium => 55.0,
        RiskLevel::High => 25.0,
        RiskLevel::Unknown => 50.0,
    }
}

/// Scores a candidate as a multi-year hold, 0-100.
pub fn score(candidate: &Candidate, ctx: &MarketContext) -> f64 {
    let regime = regime_leg(ctx.regime, ctx.regime_confidence, Strategy::LongTerm);
    let discount = DISCOUNT_RAMP.score(candidate.discount_pct);
    let momentum = match ctx.momentum {
        Some(m) => MOMENTUM_RAMP.score(m),
        None => 50.0,
    };
    let supply = supply_score(ctx.supply_risk);

    let mut score =
        W_REGIME * regime + W_DISCOUNT * discount + W_MOMENTUM * momentum + W_SUPPLY * supply;

    if ctx.volatility > HIGH_VOLATILITY {
        score -= PENALTY_HIGH_VOLATILITY;
    } else if ctx.volatility > MEDIUM_VOLATILITY {
        score -= PENALTY_MEDIUM_VOLATILITY;
    }
    if ctx.regime == Regime::Retournement {
        score -= PENALTY_RETOURNEMENT;
    }
    if ctx.supply_risk == RiskLevel::High {
        score -= PENALTY_SUPPLY_HIGH;
    }

    score.clamp(0.0, 100.0)
}
