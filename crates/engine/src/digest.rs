//! Daily digest assembly for the `report` command.

use chrono::NaiveDate;
use core_types::{MarketBaseline, MarketRegime, Opportunity, RiskSummary, Window};
use datastore::MarketStore;
use serde::Serialize;

use crate::error::EngineError;

/// A read-only snapshot of one date's results, trimmed for presentation.
#[derive(Debug, Clone, Serialize)]
pub struct DailyDigest {
    pub date: NaiveDate,
    /// Top opportunities by global score.
    pub top_opportunities: Vec<Opportunity>,
    /// Regimes ordered by classification confidence.
    pub regimes: Vec<MarketRegime>,
    /// Most liquid 30-day baselines.
    pub busiest_baselines: Vec<MarketBaseline>,
    pub risk_summaries: Vec<RiskSummary>,
}

impl DailyDigest {
    pub async fn build(
        store: &dyn MarketStore,
        date: NaiveDate,
        top_n: usize,
    ) -> Result<Self, EngineError> {
        let mut top_opportunities = store.opportunities_for_date(date).await?;
        top_opportunities.sort_by(|a, b| b.global_score.total_cmp(&a.global_score));
        top_opportunities.truncate(top_n);

        let mut regimes = store.regimes_for_date(date).await?;
        regimes.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
        regimes.truncate(top_n);

        let mut busiest_baselines: Vec<MarketBaseline> = store
            .baselines_for_date(date)
            .await?
            .into_iter()
            .filter(|b| b.window == Window::W30)
            .collect();
        busiest_baselines.sort_by(|a, b| b.tx_count.cmp(&a.tx_count));
        busiest_baselines.truncate(top_n);

        let mut risk_summaries = store.risk_summaries_for_date(date).await?;
        risk_summaries.sort_by(|a, b| b.risk_score.total_cmp(&a.risk_score));
        risk_summaries.truncate(top_n);

        Ok(Self {
            date,
            top_opportunities,
            regimes,
            busiest_baselines,
            risk_summaries,
        })
    }
}
