use serde::{Deserialize, Serialize};
use std::fmt;

use crate::enums::RoomsBucket;

/// The aggregation scope for baselines and KPIs: a location plus a rooms
/// bucket. `project` and `building` are increasingly specific refinements of
/// the community and may be absent.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ScopeKey {
    pub community: String,
    pub project: Option<String>,
    pub building: Option<String>,
    pub rooms: RoomsBucket,
}

impl ScopeKey {
    pub fn new(
        community: impl Into<String>,
        project: Option<String>,
        building: Option<String>,
        rooms: RoomsBucket,
    ) -> Self {
        Self {
            community: community.into(),
            project,
            building,
            rooms,
        }
    }

    /// The location part of the scope, shared by regimes and risk summaries
    /// which aggregate across rooms buckets.
    pub fn location(&self) -> LocationKey {
        LocationKey {
            community: self.community.clone(),
            project: self.project.clone(),
            building: self.building.clone(),
        }
    }
}

impl fmt::Display for ScopeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.community)?;
        if let Some(project) = &self.project {
            write!(f, "/{project}")?;
        }
        if let Some(building) = &self.building {
            write!(f, "/{building}")?;
        }
        write!(f, " {}", self.rooms)
    }
}

/// A (community, project?, building?) tuple without the rooms dimension.
/// Keys regimes, risk summaries, and the geo-enrichment cache.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LocationKey {
    pub community: String,
    pub project: Option<String>,
    pub building: Option<String>,
}

impl LocationKey {
    pub fn community_only(community: impl Into<String>) -> Self {
        Self {
            community: community.into(),
            project: None,
            building: None,
        }
    }
}

impl fmt::Display for LocationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.community)?;
        if let Some(project) = &self.project {
            write!(f, "/{project}")?;
        }
        if let Some(building) = &self.building {
            write!(f, "/{building}")?;
        }
        Ok(())
    }
}
