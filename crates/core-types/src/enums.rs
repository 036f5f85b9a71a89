use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

/// Where an observation came from: a closed sale or an active listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Transaction,
    Listing,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Transaction => "transaction",
            SourceKind::Listing => "listing",
        }
    }
}

impl FromStr for SourceKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "transaction" => Ok(SourceKind::Transaction),
            "listing" => Ok(SourceKind::Listing),
            other => Err(CoreError::UnknownLabel("source kind", other.to_string())),
        }
    }
}

/// Bedroom-count bucket used for aggregation scopes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomsBucket {
    Studio,
    One,
    Two,
    ThreePlus,
}

impl RoomsBucket {
    /// Maps a raw bedroom count onto its bucket.
    pub fn from_count(rooms: i32) -> Self {
        match rooms {
            i32::MIN..=0 => RoomsBucket::Studio,
            1 => RoomsBucket::One,
            2 => RoomsBucket::Two,
            _ => RoomsBucket::ThreePlus,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RoomsBucket::Studio => "studio",
            RoomsBucket::One => "1BR",
            RoomsBucket::Two => "2BR",
            RoomsBucket::ThreePlus => "3BR+",
        }
    }
}

impl FromStr for RoomsBucket {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "studio" => Ok(RoomsBucket::Studio),
            "1BR" => Ok(RoomsBucket::One),
            "2BR" => Ok(RoomsBucket::Two),
            "3BR+" => Ok(RoomsBucket::ThreePlus),
            other => Err(CoreError::UnknownLabel("rooms bucket", other.to_string())),
        }
    }
}

impl fmt::Display for RoomsBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Trailing aggregation window for baseline statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Window {
    W7,
    W30,
    W90,
}

impl Window {
    pub const ALL: [Window; 3] = [Window::W7, Window::W30, Window::W90];

    pub fn days(&self) -> i64 {
        match self {
            Window::W7 => 7,
            Window::W30 => 30,
            Window::W90 => 90,
        }
    }
}

impl TryFrom<i32> for Window {
    type Error = CoreError;

    fn try_from(days: i32) -> Result<Self, Self::Error> {
        match days {
            7 => Ok(Window::W7),
            30 => Ok(Window::W30),
            90 => Ok(Window::W90),
            other => Err(CoreError::UnknownLabel("window", other.to_string())),
        }
    }
}

impl fmt::Display for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}d", self.days())
    }
}

/// Qualitative market-phase label for a location scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Regime {
    Accumulation,
    Expansion,
    Distribution,
    Retournement,
    Neutral,
}

impl Regime {
    pub fn as_str(&self) -> &'static str {
        match self {
            Regime::Accumulation => "ACCUMULATION",
            Regime::Expansion => "EXPANSION",
            Regime::Distribution => "DISTRIBUTION",
            Regime::Retournement => "RETOURNEMENT",
            Regime::Neutral => "NEUTRAL",
        }
    }
}

impl FromStr for Regime {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ACCUMULATION" => Ok(Regime::Accumulation),
            "EXPANSION" => Ok(Regime::Expansion),
            "DISTRIBUTION" => Ok(Regime::Distribution),
            "RETOURNEMENT" => Ok(Regime::Retournement),
            "NEUTRAL" => Ok(Regime::Neutral),
            other => Err(CoreError::UnknownLabel("regime", other.to_string())),
        }
    }
}

impl fmt::Display for Regime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Directional label contributing to a regime classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendLabel {
    Up,
    Down,
    Flat,
}

impl TrendLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrendLabel::Up => "up",
            TrendLabel::Down => "down",
            TrendLabel::Flat => "flat",
        }
    }
}

impl FromStr for TrendLabel {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "up" => Ok(TrendLabel::Up),
            "down" => Ok(TrendLabel::Down),
            "flat" => Ok(TrendLabel::Flat),
            other => Err(CoreError::UnknownLabel("trend", other.to_string())),
        }
    }
}

/// Low/medium/high banding for dispersion and volatility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BandLevel {
    Low,
    Medium,
    High,
}

impl BandLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            BandLevel::Low => "low",
            BandLevel::Medium => "medium",
            BandLevel::High => "high",
        }
    }
}

impl FromStr for BandLevel {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(BandLevel::Low),
            "medium" => Ok(BandLevel::Medium),
            "high" => Ok(BandLevel::High),
            other => Err(CoreError::UnknownLabel("band level", other.to_string())),
        }
    }
}

/// Risk classification for a single risk dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Unknown,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "LOW",
            RiskLevel::Medium => "MEDIUM",
            RiskLevel::High => "HIGH",
            RiskLevel::Unknown => "UNKNOWN",
        }
    }
}

impl FromStr for RiskLevel {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "LOW" => Ok(RiskLevel::Low),
            "MEDIUM" => Ok(RiskLevel::Medium),
            "HIGH" => Ok(RiskLevel::High),
            "UNKNOWN" => Ok(RiskLevel::Unknown),
            other => Err(CoreError::UnknownLabel("risk level", other.to_string())),
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An investment approach a candidate deal is scored under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Strategy {
    Flip,
    Rent,
    LongTerm,
}

/// The final recommendation attached to an `Opportunity`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Recommendation {
    Flip,
    Rent,
    Long,
    Ignore,
}

impl Recommendation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Recommendation::Flip => "FLIP",
            Recommendation::Rent => "RENT",
            Recommendation::Long => "LONG",
            Recommendation::Ignore => "IGNORE",
        }
    }
}

impl From<Strategy> for Recommendation {
    fn from(strategy: Strategy) -> Self {
        match strategy {
            Strategy::Flip => Recommendation::Flip,
            Strategy::Rent => Recommendation::Rent,
            Strategy::LongTerm => Recommendation::Long,
        }
    }
}

impl FromStr for Recommendation {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "FLIP" => Ok(Recommendation::Flip),
            "RENT" => Ok(Recommendation::Rent),
            "LONG" => Ok(Recommendation::Long),
            "IGNORE" => Ok(Recommendation::Ignore),
            other => Err(CoreError::UnknownLabel("recommendation", other.to_string())),
        }
    }
}

/// Lifecycle state of a persisted `Opportunity`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpportunityStatus {
    Active,
    Closed,
}

impl OpportunityStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OpportunityStatus::Active => "active",
            OpportunityStatus::Closed => "closed",
        }
    }
}

impl FromStr for OpportunityStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(OpportunityStatus::Active),
            "closed" => Ok(OpportunityStatus::Closed),
            other => Err(CoreError::UnknownLabel("status", other.to_string())),
        }
    }
}

/// Overall outcome of a pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Success,
    Warning,
    Error,
}

/// Why a record or a scope was dropped instead of processed.
///
/// These are the only reasons the engine is allowed to skip work; anything
/// else must surface as a real error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    MissingPrice,
    MissingArea,
    Outlier,
    InsufficientData,
    ComputationError,
    InvalidData,
}

impl RejectReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            RejectReason::MissingPrice => "missing_price",
            RejectReason::MissingArea => "missing_area",
            RejectReason::Outlier => "outlier",
            RejectReason::InsufficientData => "insufficient_data",
            RejectReason::ComputationError => "computation_error",
            RejectReason::InvalidData => "invalid_data",
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
