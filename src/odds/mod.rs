//! Odds and probability math.
//!
//! Converts American odds to implied probabilities, removes the
//! bookmaker's vig from two-way markets, combines parlay legs and measures
//! edge. Everything here is pure; invalid odds are the only hard failure.

use serde::{Deserialize, Serialize};

use crate::types::EngineError;

/// Fractions below this are float noise, not part of the quoted price.
const TRUNCATION_EPSILON: f64 = 1e-6;

// ---------------------------------------------------------------------------
// Conversions
// ---------------------------------------------------------------------------

/// Parse an American odds string such as `"+150"`, `"-120"` or `"−120"`
/// (the Unicode minus sign some feeds use).
pub fn parse_american(raw: &str) -> Result<i32, EngineError> {
    let cleaned = raw.trim().replace('\u{2212}', "-");
    let cleaned = cleaned.strip_prefix('+').unwrap_or(&cleaned);
    let odds: i32 = cleaned
        .parse()
        .map_err(|_| EngineError::InvalidOdds(raw.to_string()))?;
    if odds == 0 {
        return Err(EngineError::InvalidOdds(raw.to_string()));
    }
    Ok(odds)
}

/// Probability implied by American odds, vig included.
///
/// Positive odds: `100 / (odds + 100)`. Negative odds:
/// `-odds / (-odds + 100)`. Zero odds do not exist in any market.
pub fn implied_probability(american_odds: i32) -> Result<f64, EngineError> {
    if american_odds == 0 {
        return Err(EngineError::InvalidOdds(american_odds.to_string()));
    }
    let odds = american_odds as f64;
    if odds > 0.0 {
        Ok(100.0 / (odds + 100.0))
    } else {
        Ok(-odds / (-odds + 100.0))
    }
}

/// American odds to decimal (total return per unit staked).
pub fn american_to_decimal(american_odds: i32) -> Result<f64, EngineError> {
    if american_odds == 0 {
        return Err(EngineError::InvalidOdds(american_odds.to_string()));
    }
    let odds = american_odds as f64;
    if odds > 0.0 {
        Ok(1.0 + odds / 100.0)
    } else {
        Ok(1.0 + 100.0 / -odds)
    }
}

/// Decimal odds back to (fractional) American odds.
pub fn decimal_to_american(decimal_odds: f64) -> Result<f64, EngineError> {
    if !decimal_odds.is_finite() || decimal_odds <= 1.0 {
        return Err(EngineError::InvalidOdds(decimal_odds.to_string()));
    }
    if decimal_odds >= 2.0 {
        Ok((decimal_odds - 1.0) * 100.0)
    } else {
        Ok(-100.0 / (decimal_odds - 1.0))
    }
}

/// Truncate toward zero (not round) to whole American odds.
pub fn truncate_odds(american: f64) -> i64 {
    let nearest = american.round();
    if (american - nearest).abs() < TRUNCATION_EPSILON {
        nearest as i64
    } else {
        american.trunc() as i64
    }
}

// ---------------------------------------------------------------------------
// Vig removal
// ---------------------------------------------------------------------------

/// Normalize a two-outcome market so the probabilities sum to 1 while
/// keeping their ratio. Both inputs must lie in `(0, 1)`.
pub fn remove_vig(prob_a: f64, prob_b: f64) -> Result<(f64, f64), EngineError> {
    for p in [prob_a, prob_b] {
        if !(p > 0.0 && p < 1.0) {
            return Err(EngineError::InvalidProbability(p));
        }
    }
    let total = prob_a + prob_b;
    Ok((prob_a / total, prob_b / total))
}

/// A two-way market in both vig-inclusive and fair form.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TwoWayMarket {
    pub over_probability: f64,
    pub under_probability: f64,
    pub fair_over: f64,
    pub fair_under: f64,
}

impl TwoWayMarket {
    /// Build from the quoted over/under American odds.
    pub fn from_american(over_odds: i32, under_odds: i32) -> Result<Self, EngineError> {
        let over_probability = implied_probability(over_odds)?;
        let under_probability = implied_probability(under_odds)?;
        let (fair_over, fair_under) = remove_vig(over_probability, under_probability)?;
        Ok(Self {
            over_probability,
            under_probability,
            fair_over,
            fair_under,
        })
    }

    /// The bookmaker's margin: how far the quoted probabilities exceed 1.
    pub fn hold(&self) -> f64 {
        self.over_probability + self.under_probability - 1.0
    }
}

// ---------------------------------------------------------------------------
// Parlays
// ---------------------------------------------------------------------------

/// Combined American odds of a parlay, truncated toward zero.
///
/// Legs are converted to decimal odds, multiplied and converted back. The
/// product is taken in sorted order so any permutation of the legs gives
/// the same result.
pub fn combine_parlay_odds(leg_american_odds: &[i32]) -> Result<i64, EngineError> {
    if leg_american_odds.is_empty() {
        return Err(EngineError::EmptyParlay);
    }
    let mut decimals = leg_american_odds
        .iter()
        .map(|&o| american_to_decimal(o))
        .collect::<Result<Vec<_>, _>>()?;
    decimals.sort_by(f64::total_cmp);

    let product: f64 = decimals.iter().product();
    Ok(truncate_odds(decimal_to_american(product)?))
}

// ---------------------------------------------------------------------------
// Edge
// ---------------------------------------------------------------------------

/// `fair_probability - vig_probability`.
pub fn edge(fair_probability: f64, vig_probability: f64) -> f64 {
    fair_probability - vig_probability
}

/// The same measure taken from the vig-inclusive probability instead of
/// the fair one: "edge over quoted odds" rather than "edge over true odds".
pub fn vig_edge(vig_inclusive_probability: f64, baseline_probability: f64) -> f64 {
    vig_inclusive_probability - baseline_probability
}

/// Both edge measures against one break-even baseline.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EdgeMetrics {
    pub edge: f64,
    pub vig_edge: f64,
}

impl EdgeMetrics {
    pub fn against(fair_probability: f64, vig_probability: f64, baseline_probability: f64) -> Self {
        Self {
            edge: edge(fair_probability, baseline_probability),
            vig_edge: vig_edge(vig_probability, baseline_probability),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
