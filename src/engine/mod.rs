//! Core engine: the scrape → match → picks → publish cycle.
//!
//! A cycle runs in strict stages with a barrier after the scrape: no
//! sport is matched until every sport has been fetched. Each sport is
//! isolated; a failure in one never stops the others.

pub mod scraper;

use anyhow::{Context, Result};
use chrono::Utc;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::config::{AppConfig, SportConfig};
use crate::matching::locks::LockedPlayerSet;
use crate::matching::match_props;
use crate::parlay::builder::{build_index, ParlayBuilderEntry};
use crate::parlay::picks::{ParlayCandidate, PickGenerator, PicksConfig};
use crate::parlay::{synthesize, Parlay, PicksFile};
use crate::providers::LineProvider;
use crate::storage::{self, SportPaths};
use crate::sync::{ArtifactSync, SyncTargets};
use crate::types::{EngineError, Sport, StatType};
use scraper::{scrape_all, ScrapeJob};

/// Published parlays artifact.
pub const PARLAYS_FILE: &str = "generated_parlays.json";
/// Published builder index artifact.
pub const BUILDER_FILE: &str = "parlay_builder_data.json";

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

/// Per-sport result of the matching and picks stage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SportOutcome {
    pub locked: usize,
    pub matched: usize,
    pub picks: usize,
    /// Stats skipped for a missing or unreadable input file.
    pub skipped_stats: usize,
}

/// Summary of one full cycle.
#[derive(Debug, Clone)]
pub struct CycleReport {
    pub run_id: Uuid,
    pub categories_fetched: usize,
    pub categories_failed: usize,
    pub sports: BTreeMap<Sport, SportOutcome>,
    pub sports_failed: usize,
    pub parlays: usize,
    pub game_stacks: usize,
    pub builder_players: usize,
    pub uploads_ok: usize,
    pub uploads_failed: usize,
    pub duration: Duration,
    pub timestamp: chrono::DateTime<Utc>,
}

impl CycleReport {
    fn new(run_id: Uuid) -> Self {
        Self {
            run_id,
            categories_fetched: 0,
            categories_failed: 0,
            sports: BTreeMap::new(),
            sports_failed: 0,
            parlays: 0,
            game_stacks: 0,
            builder_players: 0,
            uploads_ok: 0,
            uploads_failed: 0,
            duration: Duration::ZERO,
            timestamp: Utc::now(),
        }
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

pub struct Engine {
    config: AppConfig,
    sports: Vec<(Sport, SportConfig)>,
    generator: PickGenerator,
    provider: Option<Arc<dyn LineProvider>>,
    sync: Option<(Arc<dyn ArtifactSync>, SyncTargets)>,
}

impl Engine {
    /// Build an engine with no provider and no sync attached.
    pub fn new(config: AppConfig) -> Result<Self> {
        let sports = config.enabled_sports()?;
        let generator = PickGenerator::new(PicksConfig::from(&config.picks));
        Ok(Self {
            config,
            sports,
            generator,
            provider: None,
            sync: None,
        })
    }

    /// Scrape through `provider` at the start of each cycle.
    pub fn with_provider(mut self, provider: Arc<dyn LineProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Upload both artifacts through `sync` at the end of each cycle.
    pub fn with_sync(mut self, sync: Arc<dyn ArtifactSync>, targets: SyncTargets) -> Self {
        self.sync = Some((sync, targets));
        self
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    fn paths(&self, sport: Sport) -> SportPaths {
        SportPaths::new(&self.config.engine.data_dir, sport)
    }

    fn progress(&self, value: u8, message: &str) {
        if let Err(e) = storage::write_progress(&self.config.engine.data_dir, value, message) {
            warn!(error = %e, "Failed to write progress");
        }
    }

    /// Run one full cycle. Only artifact write failures are returned as
    /// errors; everything upstream of them is isolated per sport.
    pub async fn run_cycle(&self) -> Result<CycleReport> {
        let run_id = Uuid::new_v4();
        let span = info_span!("cycle", run_id = %run_id);
        self.run_cycle_inner(run_id).instrument(span).await
    }

    async fn run_cycle_inner(&self, run_id: Uuid) -> Result<CycleReport> {
        let started = Instant::now();
        let mut report = CycleReport::new(run_id);
        info!(sports = self.sports.len(), "Starting cycle");

        // 1. Scrape (barrier)
        self.progress(0, "Starting scrape");
        if let Some(provider) = &self.provider {
            let jobs = self.scrape_jobs(provider.as_ref());
            let stagger = Duration::from_secs(self.config.scrape.stagger_secs);
            let scraped = scrape_all(Arc::clone(provider), jobs, stagger).await;
            report.categories_fetched = scraped.fetched();
            report.categories_failed = scraped.failed();
        }

        // 2. Match and generate picks per sport
        self.progress(40, "Matching props");
        let mut failed = BTreeSet::new();
        for (sport, cfg) in &self.sports {
            match self.process_sport(*sport, cfg) {
                Ok(outcome) => {
                    report.sports.insert(*sport, outcome);
                }
                Err(e) => {
                    error!(sport = %sport, error = %e, "Sport failed, continuing with others");
                    self.discard_picks(*sport);
                    failed.insert(*sport);
                }
            }
        }
        report.sports_failed = failed.len();

        // 3-4. Synthesize parlays and the builder index
        self.progress(70, "Generating parlays");
        let parlays = self.synthesize_all(&failed);
        report.parlays = parlays.values().map(Vec::len).sum();
        report.game_stacks = parlays.values().flatten().filter(|p| p.is_game_stack()).count();

        let builder = self.build_builder_data();
        report.builder_players = builder.values().map(BTreeMap::len).sum();

        // 5. Write artifacts
        let out = &self.config.engine.output_dir;
        let parlays_json = storage::write_artifact(&out.join(PARLAYS_FILE), &parlays)?;
        let builder_json = storage::write_artifact(&out.join(BUILDER_FILE), &builder)?;

        // 6. Upload
        if let Some((sync, targets)) = &self.sync {
            self.progress(90, "Uploading artifacts");
            for (remote, content) in [(&targets.parlays, &parlays_json), (&targets.builder, &builder_json)] {
                match sync.upload(remote, content).await {
                    Ok(()) => report.uploads_ok += 1,
                    Err(e) => {
                        warn!(error = %e, "Upload failed; local artifacts remain authoritative");
                        report.uploads_failed += 1;
                    }
                }
            }
        }

        self.progress(100, "Done!");
        report.duration = started.elapsed();
        report.timestamp = Utc::now();
        Ok(report)
    }

    /// Stats to fetch per sport: the configured stats the provider serves,
    /// or everything it serves when none are configured.
    fn scrape_jobs(&self, provider: &dyn LineProvider) -> Vec<ScrapeJob> {
        self.sports
            .iter()
            .filter_map(|(sport, cfg)| {
                let available = provider.categories(*sport);
                let stats: Vec<StatType> = if cfg.stats.is_empty() {
                    available
                } else {
                    cfg.stats.iter().filter(|s| available.contains(s)).cloned().collect()
                };
                (!stats.is_empty()).then(|| ScrapeJob { paths: self.paths(*sport), stats })
            })
            .collect()
    }

    /// Lock snapshot, matching and picks for one sport. Writes the
    /// sport's `locked.json`, `picks.json` and `time.json`.
    pub fn process_sport(&self, sport: Sport, cfg: &SportConfig) -> Result<SportOutcome> {
        let paths = self.paths(sport);

        let snapshot_in = if self.config.locks.clear_each_cycle {
            LockedPlayerSet::cleared()
        } else {
            storage::load_locked(&paths)?
        };
        // An unreadable lock file fails the sport: matching against a
        // partial locked set would publish locked players.
        let mut observed = Vec::new();
        for stat in &cfg.stats {
            let names = storage::load_lock_observations(&paths, stat)
                .with_context(|| format!("Unreadable lock observations for {stat}"))?;
            observed.extend(names);
        }
        let locked = snapshot_in.union(observed);
        storage::save_locked(&paths, &locked)?;

        let mut outcome = SportOutcome { locked: locked.len(), ..SportOutcome::default() };
        let mut matched = Vec::new();
        for stat in &cfg.stats {
            let inputs = storage::load_offers(&paths, stat)
                .and_then(|offers| Ok((offers, storage::load_lines(&paths, stat)?)));
            match inputs {
                Ok((Some(offers), Some(lines))) => matched.extend(match_props(&offers, &lines, &locked)),
                Ok((offers, _)) => {
                    let missing = if offers.is_none() { paths.lines(stat) } else { paths.raw_data(stat) };
                    debug!(sport = %sport, error = %EngineError::MissingInput(missing), "Skipping stat");
                    outcome.skipped_stats += 1;
                }
                Err(e) => {
                    warn!(sport = %sport, stat = %stat, error = %e, "Skipping stat with unreadable input");
                    outcome.skipped_stats += 1;
                }
            }
        }
        outcome.matched = matched.len();

        let candidates = self.generator.generate(&matched);
        let picks = PicksFile { parlays: candidates.iter().map(ParlayCandidate::to_raw).collect() };
        outcome.picks = picks.parlays.len();
        storage::save_picks(&paths, &picks)?;
        storage::write_execution_time(&paths)?;

        info!(
            sport = %sport,
            locked = outcome.locked,
            matched = outcome.matched,
            picks = outcome.picks,
            skipped_stats = outcome.skipped_stats,
            "Sport processed"
        );
        Ok(outcome)
    }

    /// Overwrite a failed sport's `picks.json` so the previous generation
    /// cannot be read back.
    fn discard_picks(&self, sport: Sport) {
        if let Err(e) = storage::save_picks(&self.paths(sport), &PicksFile::default()) {
            warn!(sport = %sport, error = %e, "Failed to clear stale picks");
        }
    }

    /// Label every sport's picks. Sports in `failed`, and a missing or
    /// unreadable `picks.json`, yield an empty list for that sport.
    pub fn synthesize_all(&self, failed: &BTreeSet<Sport>) -> BTreeMap<Sport, Vec<Parlay>> {
        self.sports
            .iter()
            .map(|(sport, _)| {
                if failed.contains(sport) {
                    debug!(sport = %sport, "Sport failed this cycle, publishing none");
                    return (*sport, Vec::new());
                }
                let paths = self.paths(*sport);
                let parlays = match storage::load_picks(&paths) {
                    Ok(Some(picks)) => synthesize(*sport, &picks.parlays),
                    Ok(None) => {
                        debug!(sport = %sport, error = %EngineError::MissingInput(paths.picks()), "No picks");
                        Vec::new()
                    }
                    Err(e) => {
                        warn!(sport = %sport, error = %e, "Unreadable picks, publishing none");
                        Vec::new()
                    }
                };
                (*sport, parlays)
            })
            .collect()
    }

    /// Builder index for every sport from its `lines/*_lines.json`.
    pub fn build_builder_data(&self) -> BTreeMap<Sport, ParlayBuilderEntry> {
        self.sports
            .iter()
            .map(|(sport, _)| {
                let files = storage::load_line_files(&self.paths(*sport)).unwrap_or_else(|e| {
                    warn!(sport = %sport, error = %e, "Could not list line files");
                    Vec::new()
                });
                (*sport, build_index(*sport, files))
            })
            .collect()
    }
}

/// Log a human-readable cycle summary.
pub fn log_cycle_report(report: &CycleReport) {
    info!(
        run_id = %report.run_id,
        fetched = report.categories_fetched,
        fetch_failed = report.categories_failed,
        sports = report.sports.len(),
        sports_failed = report.sports_failed,
        matched = report.sports.values().map(|s| s.matched).sum::<usize>(),
        parlays = report.parlays,
        game_stacks = report.game_stacks,
        builder_players = report.builder_players,
        uploads_ok = report.uploads_ok,
        uploads_failed = report.uploads_failed,
        duration_ms = report.duration.as_millis() as u64,
        "Cycle complete"
    );
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
