//! Configuration loading from TOML with environment variable resolution.
//!
//! Reads `config.toml` and deserializes into strongly-typed structs.
//! Secrets (GitHub token, repo coordinates) are referenced by env-var name
//! in the config and resolved at runtime via `std::env::var`.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use crate::parlay::picks::{Payout, PicksConfig};
use crate::types::{Sport, StatType};

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub engine: EngineSection,
    #[serde(default)]
    pub scrape: ScrapeConfig,
    #[serde(default)]
    pub sports: BTreeMap<String, SportConfig>,
    #[serde(default)]
    pub picks: PicksSection,
    #[serde(default)]
    pub locks: LocksConfig,
    #[serde(default)]
    pub sync: SyncConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EngineSection {
    /// Root of the per-sport data folders.
    #[serde(default = "default_dir")]
    pub data_dir: PathBuf,
    /// Where `generated_parlays.json` and `parlay_builder_data.json` go.
    #[serde(default = "default_dir")]
    pub output_dir: PathBuf,
    /// Enabled sports, in processing order.
    pub sports: Vec<String>,
    /// Loop interval. Absent means run one cycle and exit.
    #[serde(default)]
    pub interval_secs: Option<u64>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ScrapeConfig {
    pub enabled: bool,
    /// Delay between starting consecutive sport scrapes.
    pub stagger_secs: u64,
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            stagger_secs: 2,
            timeout_secs: 15,
            user_agent: "Mozilla/5.0 (X11; Linux aarch64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct SportConfig {
    /// Stat types processed for this sport.
    #[serde(default)]
    pub stats: Vec<StatType>,
    /// Stat type -> sportsbook category URL.
    #[serde(default)]
    pub draftkings: BTreeMap<StatType, String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PicksSection {
    pub leg_counts: Vec<usize>,
    pub max_pool: usize,
    pub max_parlays: usize,
    pub min_edge: f64,
    #[serde(default)]
    pub allow_line_mismatch: bool,
    pub payouts: Vec<Payout>,
}

impl Default for PicksSection {
    fn default() -> Self {
        let d = PicksConfig::default();
        Self {
            leg_counts: d.leg_counts,
            max_pool: d.max_pool,
            max_parlays: d.max_parlays,
            min_edge: d.min_edge,
            allow_line_mismatch: d.allow_line_mismatch,
            payouts: d.payouts,
        }
    }
}

impl From<&PicksSection> for PicksConfig {
    fn from(s: &PicksSection) -> Self {
        PicksConfig {
            leg_counts: s.leg_counts.clone(),
            max_pool: s.max_pool,
            max_parlays: s.max_parlays,
            min_edge: s.min_edge,
            allow_line_mismatch: s.allow_line_mismatch,
            payouts: s.payouts.clone(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct LocksConfig {
    /// Start every cycle from an empty locked set.
    pub clear_each_cycle: bool,
}

impl Default for LocksConfig {
    fn default() -> Self {
        Self { clear_each_cycle: true }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct SyncConfig {
    pub enabled: bool,
    pub branch: String,
    pub token_env: String,
    pub owner_env: String,
    pub repo_env: String,
    pub parlays_path_env: String,
    pub builder_path_env: String,
    /// Used when `builder_path_env` is unset.
    pub builder_path_default: String,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            branch: "main".to_string(),
            token_env: "GITHUB_TOKEN".to_string(),
            owner_env: "GITHUB_OWNER".to_string(),
            repo_env: "GITHUB_REPO".to_string(),
            parlays_path_env: "GITHUB_FILE_PATH".to_string(),
            builder_path_env: "GITHUB_PARLAY_BUILDER_FILE_PATH".to_string(),
            builder_path_default: "parlay_builder_data.json".to_string(),
        }
    }
}

fn default_dir() -> PathBuf {
    PathBuf::from(".")
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        Self::parse(&contents).with_context(|| format!("Failed to parse config file: {path}"))
    }

    /// Parse and validate configuration text.
    pub fn parse(contents: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the engine cannot run with.
    pub fn validate(&self) -> Result<()> {
        self.enabled_sports()?;
        if self.picks.leg_counts.iter().any(|&k| k == 0) {
            bail!("picks.leg_counts must be >= 1");
        }
        for &k in &self.picks.leg_counts {
            match self.picks.payouts.iter().find(|p| p.legs == k) {
                None => bail!("No payout configured for {k}-leg parlays"),
                Some(p) if p.multiplier <= 1.0 => {
                    bail!("Payout multiplier for {k} legs must be > 1, got {}", p.multiplier)
                }
                Some(_) => {}
            }
        }
        Ok(())
    }

    /// Enabled sports in order, each with its (possibly empty) settings.
    pub fn enabled_sports(&self) -> Result<Vec<(Sport, SportConfig)>> {
        self.engine
            .sports
            .iter()
            .map(|id| {
                let sport: Sport = id.parse()?;
                let cfg = self.sports.get(sport.id()).cloned().unwrap_or_default();
                Ok((sport, cfg))
            })
            .collect()
    }

    /// Sportsbook category URLs of the enabled sports.
    pub fn draftkings_urls(&self) -> Result<BTreeMap<Sport, BTreeMap<StatType, String>>> {
        Ok(self
            .enabled_sports()?
            .into_iter()
            .filter(|(_, cfg)| !cfg.draftkings.is_empty())
            .map(|(sport, cfg)| (sport, cfg.draftkings))
            .collect())
    }

    /// Resolve an environment variable name to its value.
    /// Useful for loading secrets referenced in the config.
    pub fn resolve_env(env_name: &str) -> Result<String> {
        std::env::var(env_name)
            .with_context(|| format!("Environment variable not set: {env_name}"))
    }
}
