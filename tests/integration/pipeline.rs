//! Full-cycle tests: scrape through a mock sportsbook, match against
//! fantasy files on disk, generate picks, publish both artifacts.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use propedge::config::AppConfig;
use propedge::engine::{Engine, BUILDER_FILE, PARLAYS_FILE};
use propedge::matching::locks::LockedPlayerSet;
use propedge::parlay::{Parlay, PicksFile};
use propedge::storage::{self, SportPaths};
use propedge::sync::{ArtifactSync, SyncTargets};
use propedge::types::{EngineError, Sport, StatType};

use crate::mock_provider::{category_payload, MockProvider};

const NYY_BOS: &str = "NYY @ BOS";
const LAD_SF: &str = "LAD @ SF";

fn temp_dir() -> PathBuf {
    let mut p = std::env::temp_dir();
    p.push(format!("propedge_it_{}", uuid::Uuid::new_v4()));
    p
}

fn config(dir: &Path) -> AppConfig {
    let text = format!(
        r#"
        [engine]
        data_dir = "{dir}"
        output_dir = "{dir}/out"
        sports = ["mlb", "nhl"]

        [scrape]
        enabled = true
        stagger_secs = 0
        timeout_secs = 5
        user_agent = "propedge-test"

        [sports.mlb]
        stats = ["tbs", "singles"]

        [sports.nhl]
        stats = ["points"]

        [picks]
        leg_counts = [2, 3]
        max_pool = 10
        max_parlays = 10
        min_edge = 0.0
        payouts = [{{ legs = 2, multiplier = 3.0 }}, {{ legs = 3, multiplier = 6.0 }}]
        "#,
        dir = dir.display()
    );
    AppConfig::parse(&text).unwrap()
}

/// Fantasy-site files for MLB: four tbs offers (one locked, one on a
/// different line than the book) and one singles offer.
fn write_fantasy_files(dir: &Path) {
    let mlb = SportPaths::new(dir, Sport::Mlb);
    storage::write_json(
        &mlb.lines(&StatType::from("tbs")),
        &json!([
            {"name": "Aaron Judge", "line": 1.5, "odds_type": "standard"},
            {"name": "Gleyber Torres", "line": 1.5},
            {"name": "Giancarlo Stanton", "line": 1.5},
            {"name": "Anthony Volpe", "line": 2.5}
        ]),
    )
    .unwrap();
    storage::write_json(
        &mlb.lines(&StatType::from("singles")),
        &json!([{"name": "Mookie Betts", "line": 0.5}]),
    )
    .unwrap();
    storage::write_json(
        &mlb.lock_observations(&StatType::from("tbs")),
        &json!(["Giancarlo Stanton"]),
    )
    .unwrap();
}

fn sportsbook() -> MockProvider {
    MockProvider::new()
        .with_category(
            Sport::Mlb,
            "tbs",
            category_payload(
                NYY_BOS,
                "2025-06-01T23:05:00.0000000Z",
                &[
                    ("Aaron Judge", 1.5, "\u{2212}160", "+130"),
                    ("Gleyber Torres", 1.5, "-150", "+125"),
                    ("Giancarlo Stanton", 1.5, "-170", "+140"),
                    ("Anthony Volpe", 1.5, "-140", "+115"),
                    ("Rafael Devers", 1.5, "-120", "+100"),
                ],
            ),
        )
        .with_category(
            Sport::Mlb,
            "singles",
            category_payload(LAD_SF, "2025-06-02T02:10:00Z", &[("Mookie Betts", 0.5, "-155", "+125")]),
        )
}

fn read(path: &Path) -> Value {
    storage::read_json(path).unwrap().unwrap()
}

#[tokio::test]
async fn test_full_cycle_publishes_ranked_parlays() {
    let dir = temp_dir();
    write_fantasy_files(&dir);
    let provider = sportsbook();
    let engine = Engine::new(config(&dir)).unwrap().with_provider(Arc::new(provider.clone()));

    let report = engine.run_cycle().await.unwrap();

    // Scrape: only the categories the book serves, all saved.
    assert_eq!(report.categories_fetched, 2);
    assert_eq!(report.categories_failed, 0);
    assert_eq!(provider.requests().len(), 2);

    // Judge+Torres, Judge+Betts, Judge+Torres+Betts clear break-even;
    // Torres+Betts does not; Stanton is locked; Volpe's lines differ.
    let mlb = &report.sports[&Sport::Mlb];
    assert_eq!(mlb.locked, 1);
    assert_eq!(mlb.matched, 4);
    assert_eq!(mlb.picks, 3);
    assert_eq!(report.parlays, 3);
    assert_eq!(report.game_stacks, 1);

    let published: BTreeMap<String, Vec<Parlay>> =
        serde_json::from_value(read(&dir.join("out").join(PARLAYS_FILE))).unwrap();
    let parlays = &published["mlb"];
    assert!(published["nhl"].is_empty());

    let names: Vec<&str> = parlays.iter().map(|p| p.parlay_name.as_str()).collect();
    assert_eq!(names, vec!["MLB 3-Leg Parlay", "MLB 2-Leg Parlay", "MLB Game Stack"]);

    let stack = &parlays[2];
    assert_eq!(stack.game.as_deref(), Some(NYY_BOS));
    assert_eq!(
        stack.legs,
        vec![
            "Aaron Judge, Over 1.5 tbs, -160, NYY @ BOS, 2025-06-01 23:05 UTC".to_string(),
            "Gleyber Torres, Over 1.5 tbs, -150, NYY @ BOS, 2025-06-01 23:05 UTC".to_string(),
        ]
    );

    for parlay in parlays {
        assert!(!parlay.legs.is_empty());
        assert!(parlay.edge.unwrap() >= 0.0);
        assert!(parlay.parlay_odds > 100);
        assert!(parlay.legs.iter().all(|l| !l.contains("Stanton") && !l.contains("Volpe")));
        assert!(parlay.legs.iter().all(|l| !l.contains("Devers")));
    }
    assert!(parlays[0].game.is_none());
    assert!(parlays[1].game.is_none());

    let _ = std::fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn test_full_cycle_writes_sport_files_and_builder_index() {
    let dir = temp_dir();
    write_fantasy_files(&dir);
    let engine = Engine::new(config(&dir)).unwrap().with_provider(Arc::new(sportsbook()));

    engine.run_cycle().await.unwrap();

    let mlb = SportPaths::new(&dir, Sport::Mlb);
    assert!(mlb.raw_data(&StatType::from("tbs")).exists());
    assert!(mlb.execution_time().exists());

    let picks: PicksFile = storage::load_picks(&mlb).unwrap().unwrap();
    assert_eq!(picks.parlays.len(), 3);

    let locked: LockedPlayerSet = storage::load_locked(&mlb).unwrap();
    assert!(locked.contains("G. Stanton"));

    let builder = read(&dir.join("out").join(BUILDER_FILE));
    assert_eq!(builder["mlb"].as_object().unwrap().len(), 5);
    assert_eq!(builder["mlb"]["Aaron Judge"]["tbs"], json!({"line": 1.5, "odds_type": "standard"}));
    assert_eq!(builder["mlb"]["Mookie Betts"]["singles"]["line"], json!(0.5));
    assert_eq!(builder["nhl"], json!({}));

    let progress = read(&dir.join(storage::PROGRESS_FILE));
    assert_eq!(progress, json!({"progress": 100, "message": "Done!"}));

    let _ = std::fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn test_failed_category_only_drops_its_stat() {
    let dir = temp_dir();
    write_fantasy_files(&dir);
    let provider = sportsbook().failing(Sport::Mlb, "singles");
    let engine = Engine::new(config(&dir)).unwrap().with_provider(Arc::new(provider));

    let report = engine.run_cycle().await.unwrap();
    assert_eq!(report.categories_fetched, 1);
    assert_eq!(report.categories_failed, 1);

    let mlb = &report.sports[&Sport::Mlb];
    assert_eq!(mlb.skipped_stats, 1);
    assert_eq!(mlb.picks, 1);
    assert_eq!(report.game_stacks, 1);

    let _ = std::fs::remove_dir_all(&dir);
}

// ---------------------------------------------------------------------------
// Upload
// ---------------------------------------------------------------------------

#[derive(Default)]
struct RecordingSync {
    uploads: Mutex<Vec<(String, String)>>,
    fail: bool,
}

#[async_trait]
impl ArtifactSync for RecordingSync {
    async fn upload(&self, remote_path: &str, content: &str) -> Result<(), EngineError> {
        self.uploads.lock().unwrap().push((remote_path.to_string(), content.to_string()));
        if self.fail {
            return Err(EngineError::UpstreamSync {
                target: remote_path.to_string(),
                message: "401 Bad credentials".into(),
            });
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "recording"
    }
}

fn targets() -> SyncTargets {
    SyncTargets {
        parlays: "public/generated_parlays.json".into(),
        builder: "public/parlay_builder_data.json".into(),
    }
}

#[tokio::test]
async fn test_uploads_match_local_artifacts() {
    let dir = temp_dir();
    write_fantasy_files(&dir);
    let sync = Arc::new(RecordingSync::default());
    let engine = Engine::new(config(&dir))
        .unwrap()
        .with_provider(Arc::new(sportsbook()))
        .with_sync(sync.clone(), targets());

    let report = engine.run_cycle().await.unwrap();
    assert_eq!(report.uploads_ok, 2);

    let uploads = sync.uploads.lock().unwrap().clone();
    assert_eq!(uploads.len(), 2);
    assert_eq!(uploads[0].0, "public/generated_parlays.json");
    assert_eq!(uploads[0].1, std::fs::read_to_string(dir.join("out").join(PARLAYS_FILE)).unwrap());
    assert_eq!(uploads[1].1, std::fs::read_to_string(dir.join("out").join(BUILDER_FILE)).unwrap());

    let _ = std::fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn test_upload_failure_keeps_local_artifacts() {
    let dir = temp_dir();
    write_fantasy_files(&dir);
    let sync = Arc::new(RecordingSync { fail: true, ..RecordingSync::default() });
    let engine = Engine::new(config(&dir))
        .unwrap()
        .with_provider(Arc::new(sportsbook()))
        .with_sync(sync.clone(), targets());

    let report = engine.run_cycle().await.unwrap();
    assert_eq!(report.uploads_failed, 2);
    assert_eq!(report.parlays, 3);

    let published = read(&dir.join("out").join(PARLAYS_FILE));
    assert_eq!(published["mlb"].as_array().unwrap().len(), 3);

    let _ = std::fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn test_second_cycle_replaces_previous_generation() {
    let dir = temp_dir();
    write_fantasy_files(&dir);
    let engine = Engine::new(config(&dir)).unwrap().with_provider(Arc::new(sportsbook()));
    engine.run_cycle().await.unwrap();

    // Judge gets locked between scrapes: every parlay used him.
    let mlb = SportPaths::new(&dir, Sport::Mlb);
    storage::write_json(
        &mlb.lock_observations(&StatType::from("tbs")),
        &json!(["Giancarlo Stanton", "Aaron Judge"]),
    )
    .unwrap();

    let report = engine.run_cycle().await.unwrap();
    assert_eq!(report.sports[&Sport::Mlb].locked, 2);
    assert_eq!(report.parlays, 0);

    let published = read(&dir.join("out").join(PARLAYS_FILE));
    assert_eq!(published, json!({"mlb": [], "nhl": []}));

    let _ = std::fs::remove_dir_all(&dir);
}

// ---------------------------------------------------------------------------
// Sport failure
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_failed_sport_does_not_republish_previous_generation() {
    let dir = temp_dir();
    write_fantasy_files(&dir);
    let mut cfg = config(&dir);
    cfg.locks.clear_each_cycle = false;
    let engine = Engine::new(cfg).unwrap().with_provider(Arc::new(sportsbook()));

    let first = engine.run_cycle().await.unwrap();
    assert_eq!(first.parlays, 3);

    // Judge gets locked, but the carried-over snapshot is unreadable.
    let mlb = SportPaths::new(&dir, Sport::Mlb);
    storage::write_json(
        &mlb.lock_observations(&StatType::from("tbs")),
        &json!(["Giancarlo Stanton", "Aaron Judge"]),
    )
    .unwrap();
    std::fs::write(mlb.locked(), "{ truncated").unwrap();

    let second = engine.run_cycle().await.unwrap();
    assert_eq!(second.sports_failed, 1);
    assert!(!second.sports.contains_key(&Sport::Mlb));
    assert_eq!(second.parlays, 0);

    let published = read(&dir.join("out").join(PARLAYS_FILE));
    assert_eq!(published, json!({"mlb": [], "nhl": []}));
    let picks: PicksFile = storage::load_picks(&mlb).unwrap().unwrap();
    assert!(picks.parlays.is_empty());

    let _ = std::fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn test_malformed_lock_file_publishes_nothing_for_sport() {
    let dir = temp_dir();
    write_fantasy_files(&dir);
    let mlb = SportPaths::new(&dir, Sport::Mlb);
    std::fs::write(mlb.lock_observations(&StatType::from("tbs")), r#"["Giancarlo Stanton","#).unwrap();
    let engine = Engine::new(config(&dir)).unwrap().with_provider(Arc::new(sportsbook()));

    let report = engine.run_cycle().await.unwrap();
    assert_eq!(report.sports_failed, 1);
    assert_eq!(report.parlays, 0);

    let published = read(&dir.join("out").join(PARLAYS_FILE));
    assert_eq!(published["mlb"], json!([]));
    assert!(!published.to_string().contains("Stanton"));

    // The builder index still reflects the sportsbook's offers.
    let builder = read(&dir.join("out").join(BUILDER_FILE));
    assert_eq!(builder["mlb"].as_object().unwrap().len(), 5);

    let _ = std::fs::remove_dir_all(&dir);
}
