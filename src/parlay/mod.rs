//! Parlay legs, candidates and the synthesizer.
//!
//! A `Leg` is a structured record for as long as the engine owns it; it is
//! rendered to the delimited `Player, Prop, Odds, Game, StartTime` text only
//! when written out. Candidates read back from `picks.json` carry that text,
//! and the synthesizer recovers the game field positionally from it.

pub mod builder;
pub mod picks;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use tracing::{debug, info};

use crate::types::{EngineError, Sport};

/// Field separator of a rendered leg.
pub const LEG_DELIMITER: char = ',';

/// Zero-based position of the game identifier in a rendered leg.
pub const LEG_GAME_FIELD: usize = 3;

// ---------------------------------------------------------------------------
// Leg
// ---------------------------------------------------------------------------

/// One selection within a parlay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Leg {
    pub player: String,
    /// Human-readable prop, e.g. `"Over 1.5 hits_runs_rbis"`.
    pub prop: String,
    /// American odds of the selected side.
    pub odds: i32,
    pub game: String,
    pub start_time: DateTime<Utc>,
}

impl Leg {
    /// Render to the fixed-order delimited form. Delimiters inside a field
    /// are replaced so positional parsing stays valid.
    pub fn render(&self) -> String {
        let start = self.start_time.format("%Y-%m-%d %H:%M UTC").to_string();
        let odds = format!("{:+}", self.odds);
        [
            self.player.as_str(),
            self.prop.as_str(),
            odds.as_str(),
            self.game.as_str(),
            start.as_str(),
        ]
        .iter()
        .map(|field| sanitize_field(field))
        .collect::<Vec<_>>()
        .join(", ")
    }
}

impl fmt::Display for Leg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

fn sanitize_field(field: &str) -> String {
    field
        .replace(LEG_DELIMITER, " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Game identifier of a rendered leg: the fourth delimited field, trimmed.
pub fn parse_leg_game(leg: &str) -> Result<String, EngineError> {
    match leg.split(LEG_DELIMITER).nth(LEG_GAME_FIELD).map(str::trim) {
        Some(game) if !game.is_empty() => Ok(game.to_string()),
        _ => Err(EngineError::MalformedLeg(leg.to_string())),
    }
}

// ---------------------------------------------------------------------------
// Candidates and parlays
// ---------------------------------------------------------------------------

/// A parlay as produced by the picks stage, before labelling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawParlayCandidate {
    #[serde(rename = "parlay", default)]
    pub legs: Vec<String>,
    #[serde(default)]
    pub parlay_odds: Option<f64>,
    #[serde(default)]
    pub implied_odds: Option<f64>,
    #[serde(default)]
    pub vig_odds: Option<f64>,
    #[serde(default)]
    pub edge: Option<f64>,
    #[serde(default)]
    pub vig_edge: Option<f64>,
}

/// Shape of a sport's `picks.json`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PicksFile {
    #[serde(default)]
    pub parlays: Vec<RawParlayCandidate>,
}

/// A labelled parlay as published in `generated_parlays.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parlay {
    pub parlay_name: String,
    pub legs: Vec<String>,
    #[serde(rename = "total_odds", alias = "parlay_odds")]
    pub parlay_odds: i64,
    pub implied_odds: Option<f64>,
    pub vig_odds: Option<f64>,
    pub edge: Option<f64>,
    pub vig_edge: Option<f64>,
    /// Present only for a game stack.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub game: Option<String>,
}

impl Parlay {
    /// Label a candidate. Zero-leg candidates are rejected.
    pub fn from_candidate(sport: Sport, candidate: &RawParlayCandidate) -> Result<Self, EngineError> {
        if candidate.legs.is_empty() {
            return Err(EngineError::EmptyParlay);
        }

        let game = stacked_game(&candidate.legs);
        let parlay_name = match &game {
            Some(_) => format!("{} Game Stack", sport.label()),
            None => format!("{} {}-Leg Parlay", sport.label(), candidate.legs.len()),
        };

        Ok(Self {
            parlay_name,
            legs: candidate.legs.clone(),
            parlay_odds: candidate.parlay_odds.unwrap_or(0.0).trunc() as i64,
            implied_odds: candidate.implied_odds,
            vig_odds: candidate.vig_odds,
            edge: candidate.edge,
            vig_edge: candidate.vig_edge,
            game,
        })
    }

    pub fn is_game_stack(&self) -> bool {
        self.game.is_some()
    }
}

/// The single game shared by every parseable leg, if there is exactly one.
/// Malformed legs contribute no game.
pub fn stacked_game(legs: &[String]) -> Option<String> {
    let mut games = BTreeSet::new();
    for leg in legs {
        match parse_leg_game(leg) {
            Ok(game) => {
                games.insert(game);
            }
            Err(e) => debug!(error = %e, "Leg has no game field"),
        }
    }
    if games.len() == 1 {
        games.into_iter().next()
    } else {
        None
    }
}

/// Label every candidate for one sport, preserving input order.
pub fn synthesize(sport: Sport, candidates: &[RawParlayCandidate]) -> Vec<Parlay> {
    let mut parlays = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        match Parlay::from_candidate(sport, candidate) {
            Ok(p) => parlays.push(p),
            Err(e) => debug!(sport = %sport, error = %e, "Skipping parlay candidate"),
        }
    }

    info!(
        sport = %sport,
        candidates = candidates.len(),
        parlays = parlays.len(),
        game_stacks = parlays.iter().filter(|p| p.is_game_stack()).count(),
        "Parlays synthesized"
    );

    parlays
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
