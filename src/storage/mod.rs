//! Persistence layer.
//!
//! Per-sport JSON files under `data_dir/{sport}/`:
//!
//! | path | writer | contents |
//! |---|---|---|
//! | `data/{stat}.json` | scrape stage | raw sportsbook payload |
//! | `lines/{stat}_lines.json` | fantasy scraper | offers (`name`, `line`, ...) |
//! | `options/{stat}_options.json` | fantasy scraper | selectable player names |
//! | `locks/{stat}_locked.json` | fantasy scraper | names seen locked this scrape |
//! | `locked.json` | engine | accumulated locked set |
//! | `picks.json` | engine | `{"parlays": [...]}` |
//! | `time.json` | engine | `{"execution_time": ...}` |
//!
//! Missing inputs load as `None` (or empty); malformed JSON is an error.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use chrono_tz::US::Eastern;
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::matching::locks::LockedPlayerSet;
use crate::parlay::PicksFile;
use crate::providers::draftkings;
use crate::types::{LineRecord, PropOffer, Sport, StatType};

/// Progress side-channel file, relative to the data dir.
pub const PROGRESS_FILE: &str = "progress.json";

const LINES_SUFFIX: &str = "_lines";

/// `time.json` timestamp format.
const EXECUTION_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

// ---------------------------------------------------------------------------
// Layout
// ---------------------------------------------------------------------------

/// Resolves the file layout of one sport.
#[derive(Debug, Clone)]
pub struct SportPaths {
    pub sport: Sport,
    root: PathBuf,
}

impl SportPaths {
    pub fn new(data_dir: &Path, sport: Sport) -> Self {
        Self { sport, root: data_dir.join(sport.id()) }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn raw_data(&self, stat: &StatType) -> PathBuf {
        self.root.join("data").join(format!("{stat}.json"))
    }

    pub fn lines_dir(&self) -> PathBuf {
        self.root.join("lines")
    }

    pub fn lines(&self, stat: &StatType) -> PathBuf {
        self.lines_dir().join(format!("{stat}{LINES_SUFFIX}.json"))
    }

    pub fn options(&self, stat: &StatType) -> PathBuf {
        self.root.join("options").join(format!("{stat}_options.json"))
    }

    pub fn lock_observations(&self, stat: &StatType) -> PathBuf {
        self.root.join("locks").join(format!("{stat}_locked.json"))
    }

    pub fn locked(&self) -> PathBuf {
        self.root.join("locked.json")
    }

    pub fn picks(&self) -> PathBuf {
        self.root.join("picks.json")
    }

    pub fn execution_time(&self) -> PathBuf {
        self.root.join("time.json")
    }
}

// ---------------------------------------------------------------------------
// Generic JSON helpers
// ---------------------------------------------------------------------------

/// Read and parse a JSON file. Returns None if the file doesn't exist.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    if !path.exists() {
        debug!(path = %path.display(), "Input file not found");
        return Ok(None);
    }

    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let value = serde_json::from_str(&json)
        .with_context(|| format!("Failed to parse {}", path.display()))?;

    Ok(Some(value))
}

/// Serialise `value` as pretty JSON, creating parent directories.
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)
        .with_context(|| format!("Failed to serialise {}", path.display()))?;
    write_text(path, &json)
}

/// Write an artifact and return the exact text written (for upload).
pub fn write_artifact<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<String> {
    let json = serde_json::to_string_pretty(value)
        .with_context(|| format!("Failed to serialise {}", path.display()))?;
    write_text(path, &json)?;
    info!(path = %path.display(), bytes = json.len(), "Artifact written");
    Ok(json)
}

fn write_text(path: &Path, text: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    std::fs::write(path, text).with_context(|| format!("Failed to write {}", path.display()))?;
    debug!(path = %path.display(), "File written");
    Ok(())
}

// ---------------------------------------------------------------------------
// Sportsbook lines
// ---------------------------------------------------------------------------

/// Persist a raw category payload as `data/{stat}.json`.
pub fn save_raw(paths: &SportPaths, stat: &StatType, payload: &Value) -> Result<()> {
    write_json(&paths.raw_data(stat), payload)
}

/// Sportsbook lines for one stat, parsed from the saved raw payload.
pub fn load_lines(paths: &SportPaths, stat: &StatType) -> Result<Option<Vec<LineRecord>>> {
    let Some(payload) = read_json::<Value>(&paths.raw_data(stat))? else {
        return Ok(None);
    };
    Ok(Some(draftkings::parse_lines(stat, &payload)))
}

// ---------------------------------------------------------------------------
// Fantasy offers
// ---------------------------------------------------------------------------

/// Fantasy offers for one stat.
///
/// An offer is available when the options file lists the player; with no
/// options file every offer is available. Records without a name or a
/// numeric line are skipped.
pub fn load_offers(paths: &SportPaths, stat: &StatType) -> Result<Option<Vec<PropOffer>>> {
    let Some(records) = read_json::<Vec<Value>>(&paths.lines(stat))? else {
        return Ok(None);
    };
    let options: Option<HashSet<String>> = read_json::<Vec<Value>>(&paths.options(stat))?
        .map(|names| names.iter().filter_map(record_name).collect());

    let mut offers = Vec::with_capacity(records.len());
    for record in &records {
        let (Some(player_name), Some(threshold)) =
            (record_name(record), record.get("line").and_then(decimal_value))
        else {
            debug!(sport = %paths.sport, stat = %stat, record = %record, "Skipping unusable offer record");
            continue;
        };
        let available = options.as_ref().map_or(true, |o| o.contains(&player_name));
        offers.push(PropOffer {
            player_name,
            stat_type: stat.clone(),
            threshold,
            available,
        });
    }

    Ok(Some(offers))
}

/// A player name from either a bare string or an object's `name` field.
fn record_name(record: &Value) -> Option<String> {
    let name = match record {
        Value::String(s) => s.as_str(),
        Value::Object(o) => o.get("name").and_then(Value::as_str)?,
        _ => return None,
    };
    let name = name.trim();
    (!name.is_empty()).then(|| name.to_string())
}

fn decimal_value(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(n) => n.as_f64().and_then(|f| Decimal::try_from(f).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Every `lines/*_lines.json` of a sport, as `(stat, records)` sorted by
/// file name. A missing directory yields nothing; unreadable or non-array
/// files are skipped with a warning.
pub fn load_line_files(paths: &SportPaths) -> Result<Vec<(StatType, Vec<Value>)>> {
    let dir = paths.lines_dir();
    if !dir.exists() {
        debug!(sport = %paths.sport, "No lines directory");
        return Ok(Vec::new());
    }

    let mut files: Vec<(StatType, PathBuf)> = std::fs::read_dir(&dir)
        .with_context(|| format!("Failed to list {}", dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
        .filter_map(|p| {
            let stem = p.file_stem()?.to_str()?;
            let stat = stem.strip_suffix(LINES_SUFFIX)?;
            Some((StatType::from(stat), p.clone()))
        })
        .collect();
    files.sort_by(|a, b| a.1.cmp(&b.1));

    let mut out = Vec::with_capacity(files.len());
    for (stat, path) in files {
        match read_json::<Vec<Value>>(&path) {
            Ok(Some(records)) => out.push((stat, records)),
            Ok(None) => {}
            Err(e) => warn!(sport = %paths.sport, error = %e, "Could not process lines file"),
        }
    }
    Ok(out)
}

// ---------------------------------------------------------------------------
// Locked players
// ---------------------------------------------------------------------------

/// The accumulated locked set. Missing file means empty.
pub fn load_locked(paths: &SportPaths) -> Result<LockedPlayerSet> {
    Ok(read_json(&paths.locked())?.unwrap_or_default())
}

pub fn save_locked(paths: &SportPaths, locked: &LockedPlayerSet) -> Result<()> {
    write_json(&paths.locked(), locked)?;
    debug!(sport = %paths.sport, count = locked.len(), "Locked set saved");
    Ok(())
}

/// Names observed locked in the latest scrape of one stat.
pub fn load_lock_observations(paths: &SportPaths, stat: &StatType) -> Result<Vec<String>> {
    let records = read_json::<Vec<Value>>(&paths.lock_observations(stat))?.unwrap_or_default();
    Ok(records.iter().filter_map(record_name).collect())
}

// ---------------------------------------------------------------------------
// Picks
// ---------------------------------------------------------------------------

pub fn load_picks(paths: &SportPaths) -> Result<Option<PicksFile>> {
    read_json(&paths.picks())
}

pub fn save_picks(paths: &SportPaths, picks: &PicksFile) -> Result<()> {
    write_json(&paths.picks(), picks)?;
    info!(sport = %paths.sport, parlays = picks.parlays.len(), "Picks saved");
    Ok(())
}

// ---------------------------------------------------------------------------
// Side channels
// ---------------------------------------------------------------------------

/// Write `{progress, message}` for UI polling.
pub fn write_progress(data_dir: &Path, progress: u8, message: &str) -> Result<()> {
    let progress = progress.min(100);
    write_json(
        &data_dir.join(PROGRESS_FILE),
        &json!({ "progress": progress, "message": message }),
    )?;
    debug!(progress, msg = message, "Progress updated");
    Ok(())
}

/// Stamp the sport's `time.json` with the current US/Eastern wall time.
pub fn write_execution_time(paths: &SportPaths) -> Result<()> {
    let now = execution_stamp(Utc::now());
    write_json(&paths.execution_time(), &json!({ "execution_time": now }))
}

/// `at` rendered on US/Eastern wall time, DST included.
pub fn execution_stamp(at: DateTime<Utc>) -> String {
    at.with_timezone(&Eastern).format(EXECUTION_TIME_FORMAT).to_string()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
