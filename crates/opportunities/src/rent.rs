//! Rent strategy: hold for income in a stable, rentable market.

use crate::detector::Candidate;
use crate::ramp::{LIQUIDITY_RAMP, STABILITY_RAMP, YIELD_RAMP};
use crate::{regime_leg, MarketContext};
use core_types::Strategy;

const W_YIELD: f64 = 0.35;
const W_STABILITY: f64 = 0.25;
const W_LIQUIDITY: f64 = 0.20;
const W_REGIME: f64 = 0.20;

const HIGH_VOLATILITY: f64 = 0.25;
const PENALTY_HIGH_VOLATILITY: f64 = 15.0;

/// Scores a candidate as a rental hold, 0-100.
///
/// With no rental comparable the yield leg is neutral at 50 rather than
/// zero, so unrentable-looking scopes are not punished for missing data.
pub fn score(candidate: &Candidate, ctx: &MarketContext) -> f64 {
    let yield_score = match ctx.gross_yield {
        Some(y) => YIELD_RAMP.score(y),
        None => 50.0,
    };
    let stability = STABILITY_RAMP.score(ctx.volatility);
    let liquidity = LIQUIDITY_RAMP.score(candidate.tx_count_30d as f64);
    let regime = regime_leg(ctx.regime, ctx.regime_confidence, Strategy::Rent);

    let mut score = W_YIELD * yield_score
        + W_STABILITY * stability
        + W_LIQUIDITY * liquidity
        + W_REGIME * regime;

    if ctx.volatility > HIGH_VOLATILITY {
        score -= PENALTY_HIGH_VOLATILITY;
    }

    score.clamp(0.0, 100.0)
}
