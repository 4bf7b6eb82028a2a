//! Shared types for the PROPEDGE engine.
//!
//! These types form the data model used across all modules. Every record
//! here is a read-only snapshot of a provider pull: a scrape cycle builds a
//! fresh generation and never mutates the previous one.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

// ---------------------------------------------------------------------------
// Sport
// ---------------------------------------------------------------------------

/// A league the engine processes. Each sport has its own data folder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sport {
    Mlb,
    Nhl,
    Wnba,
    Nba,
}

impl Sport {
    /// All known sports (useful for iteration).
    pub const ALL: &'static [Sport] = &[Sport::Mlb, Sport::Nhl, Sport::Wnba, Sport::Nba];

    /// Folder / map-key form: `"mlb"`.
    pub fn id(&self) -> &'static str {
        match self {
            Sport::Mlb => "mlb",
            Sport::Nhl => "nhl",
            Sport::Wnba => "wnba",
            Sport::Nba => "nba",
        }
    }

    /// Upper-case label used in parlay names: `"MLB"`.
    pub fn label(&self) -> &'static str {
        match self {
            Sport::Mlb => "MLB",
            Sport::Nhl => "NHL",
            Sport::Wnba => "WNBA",
            Sport::Nba => "NBA",
        }
    }
}

impl fmt::Display for Sport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id())
    }
}

/// Parse a sport id (case-insensitive).
impl std::str::FromStr for Sport {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "mlb" | "baseball" => Ok(Sport::Mlb),
            "nhl" | "hockey" => Ok(Sport::Nhl),
            "wnba" => Ok(Sport::Wnba),
            "nba" | "basketball" => Ok(Sport::Nba),
            other => Err(anyhow::anyhow!("Unknown sport: {other}")),
        }
    }
}

// ---------------------------------------------------------------------------
// Stat type
// ---------------------------------------------------------------------------

/// A prop category such as `points`, `shots_on_goal` or `SOs`.
///
/// Stat types differ per sport and come from file names, so this is an
/// open newtype rather than a closed enum. Comparison is exact.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatType(String);

impl StatType {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for StatType {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl fmt::Display for StatType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Provider records
// ---------------------------------------------------------------------------

/// A fantasy-pick site offer for one player and stat type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropOffer {
    pub player_name: String,
    pub stat_type: StatType,
    pub threshold: Decimal,
    /// False when the player is not selectable (not listed in the options
    /// pull). Locked players are excluded separately by the matcher.
    pub available: bool,
}

/// A sportsbook two-way line for one player and stat type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineRecord {
    pub player_name: String,
    pub stat_type: StatType,
    pub threshold: Decimal,
    /// American odds for the over side.
    pub over_odds: i32,
    /// American odds for the under side.
    pub under_odds: i32,
    pub game: String,
    pub start_time: DateTime<Utc>,
}

impl LineRecord {
    /// American odds quoted for one side of the market.
    pub fn odds_for(&self, side: Side) -> i32 {
        match side {
            Side::Over => self.over_odds,
            Side::Under => self.under_odds,
        }
    }
}

/// A fantasy offer joined with the sportsbook line for the same player and
/// stat type. Both thresholds are retained; they may legitimately differ.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchedProp {
    pub offer: PropOffer,
    pub line: LineRecord,
}

impl MatchedProp {
    pub fn player_name(&self) -> &str {
        &self.offer.player_name
    }

    pub fn stat_type(&self) -> &StatType {
        &self.offer.stat_type
    }

    /// Whether both providers quote the same line.
    pub fn thresholds_agree(&self) -> bool {
        self.offer.threshold == self.line.threshold
    }
}

impl fmt::Display for MatchedProp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} (pick {} | book {} o{} u{})",
            self.offer.player_name,
            self.offer.stat_type,
            self.offer.threshold,
            self.line.threshold,
            self.line.over_odds,
            self.line.under_odds,
        )
    }
}

// ---------------------------------------------------------------------------
// Side
// ---------------------------------------------------------------------------

/// Which side of a two-way prop a pick takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Over,
    Under,
}

impl Side {
    /// The opposite side.
    pub fn opposite(&self) -> Self {
        match self {
            Side::Over => Side::Under,
            Side::Under => Side::Over,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Over => write!(f, "Over"),
            Side::Under => write!(f, "Under"),
        }
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Domain-specific error types for the engine.
///
/// Only the odds-math variants are hard failures; the rest are recovered
/// at the sport boundary (see `engine`).
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Invalid American odds: {0}")]
    InvalidOdds(String),

    #[error("Probability out of range (0, 1): {0}")]
    InvalidProbability(f64),

    #[error("Parlay has no legs")]
    EmptyParlay,

    #[error("Malformed leg: {0:?}")]
    MalformedLeg(String),

    #[error("Missing input file: {}", .0.display())]
    MissingInput(PathBuf),

    #[error("Upstream sync failed ({target}): {message}")]
    UpstreamSync { target: String, message: String },
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
