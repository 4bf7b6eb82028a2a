//! Identity matching between the fantasy-pick site and the sportsbook.
//!
//! Records are joined on `(normalized player name, stat type)`. Players
//! that are unavailable or locked on the fantasy side never produce a
//! match, and sportsbook lines without a fantasy counterpart are dropped
//! (most sportsbook lines have no active pick; that is the steady state).

pub mod locks;
pub mod normalize;

use std::collections::{HashMap, HashSet};
use tracing::{debug, info};

use crate::types::{LineRecord, MatchedProp, PropOffer, StatType};
use locks::LockedPlayerSet;
use normalize::normalize;

type MatchKey = (String, StatType);

fn key_of(player_name: &str, stat_type: &StatType) -> MatchKey {
    (normalize(player_name), stat_type.clone())
}

/// Join offers with lines, in sportsbook input order.
///
/// Duplicate sportsbook lines for one key keep the first record; the rest
/// are logged and ignored.
pub fn match_props(
    offers: &[PropOffer],
    lines: &[LineRecord],
    locked: &LockedPlayerSet,
) -> Vec<MatchedProp> {
    let mut by_key: HashMap<MatchKey, &PropOffer> = HashMap::with_capacity(offers.len());
    for offer in offers {
        by_key
            .entry(key_of(&offer.player_name, &offer.stat_type))
            .or_insert(offer);
    }

    let locked_names = locked.normalized();
    let mut seen: HashSet<MatchKey> = HashSet::with_capacity(lines.len());
    let mut matched = Vec::new();
    let mut duplicates = 0usize;
    let mut excluded = 0usize;

    for line in lines {
        let key = key_of(&line.player_name, &line.stat_type);
        if !seen.insert(key.clone()) {
            duplicates += 1;
            debug!(
                player = %line.player_name,
                stat = %line.stat_type,
                threshold = %line.threshold,
                "Ignoring duplicate sportsbook line"
            );
            continue;
        }

        let Some(offer) = by_key.get(&key) else {
            continue;
        };

        if !offer.available {
            excluded += 1;
            debug!(player = %offer.player_name, stat = %offer.stat_type, "Offer unavailable, skipping");
            continue;
        }

        if locked_names.contains(&key.0) {
            excluded += 1;
            debug!(player = %offer.player_name, stat = %offer.stat_type, "Player locked, skipping");
            continue;
        }

        matched.push(MatchedProp {
            offer: (*offer).clone(),
            line: line.clone(),
        });
    }

    info!(
        offers = offers.len(),
        lines = lines.len(),
        matched = matched.len(),
        duplicates,
        excluded,
        "Identity matching complete"
    );

    matched
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
