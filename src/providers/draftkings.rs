//! DraftKings sportsbook integration.
//!
//! Each stat category is one `sportscontent` subcategory URL returning
//! `events`, `markets` and `selections`. A player prop is a market with
//! one Over and one Under selection per line; both sides carry the same
//! participant and `points`.
//!
//! Auth: none. The endpoint rejects obvious bots, so requests carry a
//! browser user agent and accept headers.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE};
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;
use tracing::{debug, info};

use super::LineProvider;
use crate::config::ScrapeConfig;
use crate::odds;
use crate::types::{LineRecord, Side, Sport, StatType};

const PROVIDER_NAME: &str = "draftkings";

/// Body prefix included in HTTP error messages.
const ERROR_BODY_PREFIX: usize = 100;

// ---------------------------------------------------------------------------
// API response types (DraftKings JSON → Rust)
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DkCategory {
    #[serde(default)]
    events: Vec<DkEvent>,
    #[serde(default)]
    markets: Vec<DkMarket>,
    #[serde(default)]
    selections: Vec<DkSelection>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DkEvent {
    id: String,
    /// "NYY @ BOS"
    #[serde(default)]
    name: String,
    /// RFC 3339, sometimes with 7 fractional digits.
    #[serde(default)]
    start_event_date: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DkMarket {
    id: String,
    event_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DkSelection {
    market_id: String,
    /// "Over" / "Under" (occasionally "O" / "U").
    #[serde(default)]
    label: String,
    #[serde(default)]
    display_odds: Option<DkDisplayOdds>,
    #[serde(default)]
    points: Option<Decimal>,
    #[serde(default)]
    participants: Vec<DkParticipant>,
}

#[derive(Debug, Deserialize)]
struct DkDisplayOdds {
    /// "+150", "-120" or "−120" (U+2212).
    #[serde(default)]
    american: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DkParticipant {
    name: String,
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// One Over/Under pair being assembled.
#[derive(Debug, Default)]
struct PendingLine {
    over: Option<i32>,
    under: Option<i32>,
}

/// Turn a raw category payload into line records.
///
/// Selections are grouped by market, participant and line; groups missing
/// a side, an unknown event, or odds that fail to parse are skipped.
/// Output follows first appearance of each group in `selections`.
pub fn parse_lines(stat: &StatType, payload: &Value) -> Vec<LineRecord> {
    let category = match DkCategory::deserialize(payload) {
        Ok(c) => c,
        Err(e) => {
            debug!(stat = %stat, error = %e, "Payload is not a sportscontent category");
            return Vec::new();
        }
    };

    let events: HashMap<&str, &DkEvent> =
        category.events.iter().map(|e| (e.id.as_str(), e)).collect();
    let market_events: HashMap<&str, &str> = category
        .markets
        .iter()
        .map(|m| (m.id.as_str(), m.event_id.as_str()))
        .collect();

    let mut order: Vec<(&str, &str, Decimal)> = Vec::new();
    let mut pending: HashMap<(&str, &str, Decimal), PendingLine> = HashMap::new();

    for sel in &category.selections {
        let (Some(participant), Some(points)) = (sel.participants.first(), sel.points) else {
            continue;
        };
        let Some(side) = parse_side(&sel.label) else {
            debug!(stat = %stat, label = %sel.label, "Skipping non Over/Under selection");
            continue;
        };
        let Some(raw) = sel.display_odds.as_ref().and_then(|d| d.american.as_deref()) else {
            continue;
        };
        let american = match odds::parse_american(raw) {
            Ok(o) => o,
            Err(e) => {
                debug!(stat = %stat, player = %participant.name, error = %e, "Skipping unparseable odds");
                continue;
            }
        };

        let key = (sel.market_id.as_str(), participant.name.trim(), points);
        let slot = pending.entry(key).or_insert_with(|| {
            order.push(key);
            PendingLine::default()
        });
        match side {
            Side::Over => slot.over = Some(american),
            Side::Under => slot.under = Some(american),
        }
    }

    let mut records = Vec::with_capacity(order.len());
    for key @ (market_id, player, points) in order {
        let Some(PendingLine { over: Some(over_odds), under: Some(under_odds) }) = pending.remove(&key)
        else {
            debug!(stat = %stat, player, "Skipping line without both sides");
            continue;
        };
        let Some(event) = market_events.get(market_id).and_then(|id| events.get(id)) else {
            debug!(stat = %stat, player, market = market_id, "Skipping line with unknown event");
            continue;
        };
        let Some(start_time) = event.start_event_date.as_deref().and_then(parse_start) else {
            debug!(stat = %stat, player, event = %event.name, "Skipping line without start time");
            continue;
        };

        records.push(LineRecord {
            player_name: player.to_string(),
            stat_type: stat.clone(),
            threshold: points,
            over_odds,
            under_odds,
            game: event.name.trim().to_string(),
            start_time,
        });
    }

    records
}

fn parse_side(label: &str) -> Option<Side> {
    match label.trim().to_ascii_lowercase().as_str() {
        "over" | "o" => Some(Side::Over),
        "under" | "u" => Some(Side::Under),
        _ => None,
    }
}

fn parse_start(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// DraftKings category client.
pub struct DraftKingsClient {
    http: Client,
    /// Sport -> stat type -> category URL.
    urls: BTreeMap<Sport, BTreeMap<StatType, String>>,
}

impl DraftKingsClient {
    pub fn new(
        scrape: &ScrapeConfig,
        urls: BTreeMap<Sport, BTreeMap<StatType, String>>,
    ) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json, text/plain, */*"));
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.5"));

        let http = Client::builder()
            .timeout(Duration::from_secs(scrape.timeout_secs))
            .user_agent(scrape.user_agent.clone())
            .default_headers(headers)
            .build()
            .context("Failed to build HTTP client for DraftKings")?;

        let categories: usize = urls.values().map(BTreeMap::len).sum();
        info!(sports = urls.len(), categories, "DraftKings client ready");

        Ok(Self { http, urls })
    }

    fn url_for(&self, sport: Sport, stat: &StatType) -> Option<&str> {
        self.urls.get(&sport)?.get(stat).map(String::as_str)
    }
}

#[async_trait]
impl LineProvider for DraftKingsClient {
    async fn fetch_category(&self, sport: Sport, stat: &StatType) -> Result<Value> {
        let url = self
            .url_for(sport, stat)
            .with_context(|| format!("No DraftKings URL configured for {sport}/{stat}"))?;

        debug!(sport = %sport, stat = %stat, url, "Fetching DraftKings category");

        let resp = self
            .http
            .get(url)
            .send()
            .await
            .with_context(|| format!("DraftKings request failed for {sport}/{stat}"))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            let prefix: String = body.chars().take(ERROR_BODY_PREFIX).collect();
            anyhow::bail!("DraftKings API error {status} for {sport}/{stat}: {prefix}");
        }

        resp.json()
            .await
            .with_context(|| format!("Failed to parse DraftKings response for {sport}/{stat}"))
    }

    fn categories(&self, sport: Sport) -> Vec<StatType> {
        self.urls
            .get(&sport)
            .map(|m| m.keys().cloned().collect())
            .unwrap_or_default()
    }

    fn name(&self) -> &str {
        PROVIDER_NAME
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
