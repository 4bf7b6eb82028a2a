//! Scrape stage.
//!
//! One task per sport, started `stagger` apart so the sportsbook does not
//! see a burst, then a barrier: `scrape_all` returns only after every
//! sport task has finished. Raw payloads land in `data/{stat}.json`.

use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::providers::LineProvider;
use crate::storage::{self, SportPaths};
use crate::types::{Sport, StatType};

/// Stat categories to fetch for one sport.
#[derive(Debug, Clone)]
pub struct ScrapeJob {
    pub paths: SportPaths,
    pub stats: Vec<StatType>,
}

/// Result of one sport's scrape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SportScrape {
    pub sport: Sport,
    pub fetched: usize,
    pub failed: usize,
}

/// Totals across all sports.
#[derive(Debug, Clone, Default)]
pub struct ScrapeReport {
    pub sports: Vec<SportScrape>,
    /// Sport tasks that panicked or were cancelled.
    pub aborted: usize,
}

impl ScrapeReport {
    pub fn fetched(&self) -> usize {
        self.sports.iter().map(|s| s.fetched).sum()
    }

    pub fn failed(&self) -> usize {
        self.sports.iter().map(|s| s.failed).sum()
    }
}

/// Scrape every job concurrently and wait for all of them.
pub async fn scrape_all(
    provider: Arc<dyn LineProvider>,
    jobs: Vec<ScrapeJob>,
    stagger: Duration,
) -> ScrapeReport {
    info!(sports = jobs.len(), stagger_secs = stagger.as_secs(), "Starting scrape");

    let mut handles = Vec::with_capacity(jobs.len());
    for (i, job) in jobs.into_iter().enumerate() {
        if i > 0 && !stagger.is_zero() {
            tokio::time::sleep(stagger).await;
        }
        let provider = Arc::clone(&provider);
        handles.push(tokio::spawn(scrape_sport(provider, job)));
    }

    let mut report = ScrapeReport::default();
    for result in futures::future::join_all(handles).await {
        match result {
            Ok(sport) => report.sports.push(sport),
            Err(e) => {
                warn!(error = %e, "Scrape task aborted");
                report.aborted += 1;
            }
        }
    }

    info!(
        fetched = report.fetched(),
        failed = report.failed(),
        aborted = report.aborted,
        "Scrape complete"
    );
    report
}

async fn scrape_sport(provider: Arc<dyn LineProvider>, job: ScrapeJob) -> SportScrape {
    let sport = job.paths.sport;
    let mut fetched = 0;
    let mut failed = 0;

    for stat in &job.stats {
        let saved = match provider.fetch_category(sport, stat).await {
            Ok(payload) => storage::save_raw(&job.paths, stat, &payload),
            Err(e) => Err(e),
        };
        match saved {
            Ok(()) => fetched += 1,
            Err(e) => {
                warn!(sport = %sport, stat = %stat, error = %e, "Category scrape failed");
                failed += 1;
            }
        }
    }

    info!(sport = %sport, fetched, failed, "Sport scraped");
    SportScrape { sport, fetched, failed }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
