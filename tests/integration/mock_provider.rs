//! Mock sportsbook for integration testing.
//!
//! Serves canned `sportscontent` payloads from memory and records every
//! request, so tests can drive the full cycle without network access.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use propedge::providers::LineProvider;
use propedge::types::{Sport, StatType};

/// One player prop: `(player, line, over odds, under odds)`.
pub type Prop<'a> = (&'a str, f64, &'a str, &'a str);

/// Build a category payload for a single game.
pub fn category_payload(game: &str, start: &str, props: &[Prop<'_>]) -> Value {
    let mut markets = Vec::new();
    let mut selections = Vec::new();
    for (i, (player, line, over, under)) in props.iter().enumerate() {
        let market_id = format!("m{i}");
        markets.push(json!({ "id": market_id, "eventId": "e1", "name": format!("{player} O/U") }));
        for (label, odds) in [("Over", over), ("Under", under)] {
            selections.push(json!({
                "id": format!("{market_id}-{label}"),
                "marketId": market_id,
                "label": label,
                "displayOdds": { "american": odds },
                "points": line,
                "participants": [{ "name": player, "type": "Player" }]
            }));
        }
    }
    json!({
        "events": [{ "id": "e1", "name": game, "startEventDate": start }],
        "markets": markets,
        "selections": selections
    })
}

/// A deterministic in-memory line provider.
#[derive(Clone, Default)]
pub struct MockProvider {
    payloads: BTreeMap<(Sport, StatType), Value>,
    /// Stats that fail with an HTTP-style error.
    failing: Vec<StatType>,
    requests: Arc<Mutex<Vec<(Sport, StatType)>>>,
}

impl MockProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_category(mut self, sport: Sport, stat: &str, payload: Value) -> Self {
        self.payloads.insert((sport, StatType::from(stat)), payload);
        self
    }

    pub fn failing(mut self, sport: Sport, stat: &str) -> Self {
        self.payloads.insert((sport, StatType::from(stat)), Value::Null);
        self.failing.push(StatType::from(stat));
        self
    }

    /// Every request served so far, in arrival order.
    pub fn requests(&self) -> Vec<(Sport, StatType)> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl LineProvider for MockProvider {
    async fn fetch_category(&self, sport: Sport, stat: &StatType) -> Result<Value> {
        self.requests.lock().unwrap().push((sport, stat.clone()));
        if self.failing.contains(stat) {
            return Err(anyhow!("mock sportsbook error 503 for {sport}/{stat}"));
        }
        self.payloads
            .get(&(sport, stat.clone()))
            .cloned()
            .ok_or_else(|| anyhow!("no mock payload for {sport}/{stat}"))
    }

    fn categories(&self, sport: Sport) -> Vec<StatType> {
        self.payloads
            .keys()
            .filter(|(s, _)| *s == sport)
            .map(|(_, stat)| stat.clone())
            .collect()
    }

    fn name(&self) -> &str {
        "mock"
    }
}
