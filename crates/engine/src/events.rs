//! The notification feed.
//!
//! Downstream consumers (a bot, a digest mail, the `events` CLI command)
//! want the handful of things worth a human's attention for a given date:
//! confident regime transitions and the strongest open opportunities.

use chrono::NaiveDate;
use configuration::NotifierConfig;
use core_types::{LocationKey, Opportunity, Regime};
use datastore::MarketStore;
use serde::Serialize;

use crate::error::EngineError;

/// A location moving from one market phase to another.
#[derive(Debug, Clone, Serialize)]
pub struct RegimeChangeEvent {
    pub date: NaiveDate,
    pub location: LocationKey,
    /// Absent when the location was classified for the first time.
    pub previous: Option<Regime>,
    pub current: Regime,
    pub confidence: f64,
}

impl RegimeChangeEvent {
    pub fn headline(&self) -> String {
        match self.previous {
            Some(prev) => format!(
                "{}: {} -> {} (confidence {:.2})",
                self.location,
                prev.as_str(),
                self.current.as_str(),
                self.confidence
            ),
            None => format!(
                "{}: entered {} (confidence {:.2})",
                self.location,
                self.current.as_str(),
                self.confidence
            ),
        }
    }
}

/// Everything noteworthy for one date.
#[derive(Debug, Clone, Serialize, Default)]
pub struct EventFeed {
    pub regime_changes: Vec<RegimeChangeEvent>,
    pub opportunities: Vec<Opportunity>,
}

impl EventFeed {
    /// Assembles the feed for `date` from persisted results: regime changes
    /// at or above the confidence floor, and active opportunities detected on
    /// `date` with a discount at or above the notification floor.
    pub async fn collect(
        store: &dyn MarketStore,
        date: NaiveDate,
        config: &NotifierConfig,
    ) -> Result<Self, EngineError> {
        let mut feed = EventFeed::default();

        for regime in store.regimes_for_date(date).await? {
            if regime.confidence < config.min_regime_confidence {
                continue;
            }
            let previous = store
                .latest_regime_before(&regime.location, date)
                .await?
                .map(|r| r.regime);
            if previous == Some(regime.regime) {
                continue;
            }
            feed.regime_changes.push(RegimeChangeEvent {
                date,
                location: regime.location,
                previous,
                current: regime.regime,
                confidence: regime.confidence,
            });
        }

        let mut opportunities: Vec<Opportunity> = store
            .opportunities_for_date(date)
            .await?
            .into_iter()
            .filter(|o| {
                o.status == core_types::OpportunityStatus::Active
                    && o.discount_pct >= config.min_discount_pct
                    && o.recommendation != core_types::Recommendation::Ignore
            })
            .collect();
        opportunities.sort_by(|a, b| b.global_score.total_cmp(&a.global_score));
        feed.opportunities = opportunities;

        Ok(feed)
    }
}
