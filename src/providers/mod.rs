//! Line providers.
//!
//! Defines the `LineProvider` trait and the sportsbook implementation:
//! - DraftKings: per-category player-prop payloads (JSON)
//!
//! The fantasy-pick site needs a real browser to scrape and runs outside
//! this crate; its per-stat files are picked up by `storage`.

pub mod draftkings;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

use crate::types::{Sport, StatType};

/// Abstraction over a sportsbook line source.
///
/// Implementors return the raw category payload; parsing into
/// `LineRecord`s happens after the payload is persisted.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LineProvider: Send + Sync {
    /// Fetch the raw payload for one stat category of one sport.
    async fn fetch_category(&self, sport: Sport, stat: &StatType) -> Result<Value>;

    /// Stat categories this provider can serve for `sport`.
    fn categories(&self, sport: Sport) -> Vec<StatType>;

    /// Provider name for logging.
    fn name(&self) -> &str;
}
