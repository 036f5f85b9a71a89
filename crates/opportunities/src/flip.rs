//! Flip strategy: buy the discount, resell into a liquid, rising market.

use crate::detector::Candidate;
use crate::ramp::{DISCOUNT_RAMP, LIQUIDITY_RAMP, MOMENTUM_RAMP};
use crate::{regime_leg, MarketContext};
use core_types::{Regime, RiskLevel, Strategy};

const W_DISCOUNT: f64 = 0.40;
const W_LIQUIDITY: f64 = 0.30;
const W_MOMENTUM: f64 = 0.15;
const W_REGIME: f64 = 0.15;

const PENALTY_SUPPLY_HIGH: f64 = 20.0;
const PENALTY_SUPPLY_MEDIUM: f64 = 10.0;
const PENALTY_RETOURNEMENT: f64 = 15.0;

/// Scores a candidate for a short-hold resale, 0-100.
pub fn score(candidate: &Candidate, ctx: &MarketContext) -> f64 {
    let discount = DISCOUNT_RAMP.score(candidate.discount_pct);
    let liquidity = LIQUIDITY_RAMP.score(candidate.tx_count_30d as f64);
    let momentum = match ctx.momentum {
        Some(m) => MOMENTUM_RAMP.score(m),
        None => 50.0,
    };
    let regime = regime_leg(ctx.regime, ctx.regime_confidence, Strategy::Flip);

    let mut score = W_DISCOUNT * discount
        + W_LIQUIDITY * liquidity
        + W_MOMENTUM * momentum
        + W_REGIME * regime;

    match ctx.supply_risk {
        RiskLevel::High => score -= PENALTY_SUPPLY_HIGH,
        RiskLevel::Medium => score -= PENALTY_SUPPLY_MEDIUM,
        RiskLevel::Low | RiskLevel::Unknown => {}
    }
    if ctx.regime == Regime::Retournement {
        score -= PENALTY_RETOURNEMENT;
    }

    score.clamp(0.0, 100.0)
}
