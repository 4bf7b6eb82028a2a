//! Picks generation.
//!
//! Turns matched props into ranked parlay candidates: each prop becomes a
//! leg on its more likely side (after removing the vig), the strongest legs
//! are combined into every parlay size the payout table covers, and each
//! combination is priced against the fantasy site's break-even probability.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, info, warn};

use super::{Leg, RawParlayCandidate};
use crate::matching::normalize::normalize;
use crate::odds::{self, EdgeMetrics, TwoWayMarket};
use crate::types::{EngineError, MatchedProp, Side};

// ---------------------------------------------------------------------------
// Configuration (defaults, overridden by config.toml at runtime)
// ---------------------------------------------------------------------------

/// Payout multiplier for an all-correct entry of `legs` picks.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Payout {
    pub legs: usize,
    pub multiplier: f64,
}

#[derive(Debug, Clone)]
pub struct PicksConfig {
    /// Parlay sizes to enumerate.
    pub leg_counts: Vec<usize>,
    /// Number of top legs considered for combination.
    pub max_pool: usize,
    /// Candidates kept per sport after ranking.
    pub max_parlays: usize,
    /// Minimum edge over the payout's break-even probability.
    pub min_edge: f64,
    /// Use props whose two providers quote different lines.
    pub allow_line_mismatch: bool,
    pub payouts: Vec<Payout>,
}

impl Default for PicksConfig {
    fn default() -> Self {
        Self {
            leg_counts: vec![2, 3],
            max_pool: 12,
            max_parlays: 25,
            min_edge: 0.0,
            allow_line_mismatch: false,
            payouts: vec![
                Payout { legs: 2, multiplier: 3.0 },
                Payout { legs: 3, multiplier: 6.0 },
                Payout { legs: 4, multiplier: 10.0 },
                Payout { legs: 5, multiplier: 20.0 },
            ],
        }
    }
}

impl PicksConfig {
    /// Probability an entry of `legs` picks must hit to break even.
    pub fn breakeven_probability(&self, legs: usize) -> Option<f64> {
        self.payouts
            .iter()
            .find(|p| p.legs == legs)
            .filter(|p| p.multiplier > 1.0)
            .map(|p| 1.0 / p.multiplier)
    }
}

// ---------------------------------------------------------------------------
// Picks
// ---------------------------------------------------------------------------

/// One prop resolved to a side, with both probability forms.
#[derive(Debug, Clone)]
pub struct Pick {
    pub leg: Leg,
    pub side: Side,
    pub fair_probability: f64,
    pub vig_probability: f64,
}

impl Pick {
    /// Choose the side the de-vigged market favours.
    pub fn from_matched(matched: &MatchedProp) -> Result<Self, EngineError> {
        let market = TwoWayMarket::from_american(matched.line.over_odds, matched.line.under_odds)?;
        let (side, fair_probability, vig_probability) = if market.fair_over >= market.fair_under {
            (Side::Over, market.fair_over, market.over_probability)
        } else {
            (Side::Under, market.fair_under, market.under_probability)
        };

        let leg = Leg {
            player: matched.offer.player_name.clone(),
            prop: format!("{side} {} {}", matched.offer.threshold, matched.offer.stat_type),
            odds: matched.line.odds_for(side),
            game: matched.line.game.clone(),
            start_time: matched.line.start_time,
        };

        Ok(Self {
            leg,
            side,
            fair_probability,
            vig_probability,
        })
    }
}

/// A priced combination of picks, still holding structured legs.
#[derive(Debug, Clone)]
pub struct ParlayCandidate {
    pub legs: Vec<Leg>,
    pub parlay_odds: i64,
    pub implied_odds: f64,
    pub vig_odds: f64,
    pub metrics: EdgeMetrics,
}

impl ParlayCandidate {
    /// Render for `picks.json`.
    pub fn to_raw(&self) -> RawParlayCandidate {
        RawParlayCandidate {
            legs: self.legs.iter().map(Leg::render).collect(),
            parlay_odds: Some(self.parlay_odds as f64),
            implied_odds: Some(self.implied_odds),
            vig_odds: Some(self.vig_odds),
            edge: Some(self.metrics.edge),
            vig_edge: Some(self.metrics.vig_edge),
        }
    }
}

// ---------------------------------------------------------------------------
// Generator
// ---------------------------------------------------------------------------

pub struct PickGenerator {
    config: PicksConfig,
}

impl PickGenerator {
    pub fn new(config: PicksConfig) -> Self {
        Self { config }
    }

    /// Access the picks configuration.
    pub fn config(&self) -> &PicksConfig {
        &self.config
    }

    /// Resolve matched props to picks, strongest first, capped at the pool size.
    pub fn select_picks(&self, matched: &[MatchedProp]) -> Vec<Pick> {
        let mut picks = Vec::with_capacity(matched.len());
        for m in matched {
            if !self.config.allow_line_mismatch && !m.thresholds_agree() {
                debug!(
                    player = %m.player_name(),
                    stat = %m.stat_type(),
                    pick_line = %m.offer.threshold,
                    book_line = %m.line.threshold,
                    "Lines differ, skipping prop"
                );
                continue;
            }
            match Pick::from_matched(m) {
                Ok(p) => picks.push(p),
                Err(e) => warn!(player = %m.player_name(), stat = %m.stat_type(), error = %e, "Unpriceable prop"),
            }
        }

        picks.sort_by(|a, b| {
            b.fair_probability
                .total_cmp(&a.fair_probability)
                .then_with(|| a.leg.player.cmp(&b.leg.player))
        });
        picks.truncate(self.config.max_pool);
        picks
    }

    /// Build ranked candidates from a sport's matched props.
    pub fn generate(&self, matched: &[MatchedProp]) -> Vec<ParlayCandidate> {
        let picks = self.select_picks(matched);
        let mut candidates = Vec::new();

        for &k in &self.config.leg_counts {
            let Some(breakeven) = self.config.breakeven_probability(k) else {
                warn!(legs = k, "No payout configured for parlay size, skipping");
                continue;
            };
            if k == 0 || k > picks.len() {
                continue;
            }
            for combo in Combinations::new(picks.len(), k) {
                let chosen: Vec<&Pick> = combo.iter().map(|&i| &picks[i]).collect();
                match price(&chosen, breakeven) {
                    Ok(Some(c)) if c.metrics.edge >= self.config.min_edge => candidates.push(c),
                    Ok(_) => {}
                    Err(e) => warn!(error = %e, "Failed to price combination"),
                }
            }
        }

        candidates.sort_by(|a, b| {
            b.metrics
                .edge
                .total_cmp(&a.metrics.edge)
                .then_with(|| a.legs.len().cmp(&b.legs.len()))
        });
        candidates.truncate(self.config.max_parlays);

        info!(
            matched = matched.len(),
            picks = picks.len(),
            candidates = candidates.len(),
            best_edge = ?candidates.first().map(|c| format!("{:.1}%", c.metrics.edge * 100.0)),
            "Parlay candidates generated"
        );

        candidates
    }
}

/// Price one combination. `None` when a player appears twice.
fn price(picks: &[&Pick], breakeven: f64) -> Result<Option<ParlayCandidate>, EngineError> {
    let mut players = HashSet::with_capacity(picks.len());
    if !picks.iter().all(|p| players.insert(normalize(&p.leg.player))) {
        return Ok(None);
    }

    let odds: Vec<i32> = picks.iter().map(|p| p.leg.odds).collect();
    let parlay_odds = odds::combine_parlay_odds(&odds)?;
    let implied_odds: f64 = picks.iter().map(|p| p.fair_probability).product();
    let vig_odds: f64 = picks.iter().map(|p| p.vig_probability).product();

    Ok(Some(ParlayCandidate {
        legs: picks.iter().map(|p| p.leg.clone()).collect(),
        parlay_odds,
        implied_odds,
        vig_odds,
        metrics: EdgeMetrics::against(implied_odds, vig_odds, breakeven),
    }))
}

// ---------------------------------------------------------------------------
// Combinations
// ---------------------------------------------------------------------------

/// Lexicographic k-combinations of `0..n`.
struct Combinations {
    n: usize,
    indices: Vec<usize>,
    done: bool,
}

impl Combinations {
    fn new(n: usize, k: usize) -> Self {
        Self {
            n,
            indices: (0..k).collect(),
            done: k == 0 || k > n,
        }
    }
}

impl Iterator for Combinations {
    type Item = Vec<usize>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let current = self.indices.clone();

        let k = self.indices.len();
        let mut i = k;
        loop {
            if i == 0 {
                self.done = true;
                break;
            }
            i -= 1;
            if self.indices[i] < self.n - k + i {
                self.indices[i] += 1;
                for j in (i + 1)..k {
                    self.indices[j] = self.indices[j - 1] + 1;
                }
                break;
            }
        }

        Some(current)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
