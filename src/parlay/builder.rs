//! Parlay builder index.
//!
//! Per sport, maps every player to the props they are offered on so a
//! client can assemble its own parlays. Built from the per-stat line
//! files: files merge per player, a repeated `(player, stat)` record
//! overwrites the earlier one.

use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tracing::{debug, info};

use crate::types::{Sport, StatType};

/// A line record's payload without its player-name field.
pub type PropDetails = Map<String, Value>;

/// `player name -> stat type -> prop details` for one sport.
pub type ParlayBuilderEntry = BTreeMap<String, BTreeMap<StatType, PropDetails>>;

/// Record fields accepted as the player key, in lookup order.
const NAME_FIELDS: &[&str] = &["name", "player_name"];

/// Index every record of every stat file. Records that are not objects or
/// carry no player name are skipped.
pub fn build_index<I>(sport: Sport, per_stat_line_files: I) -> ParlayBuilderEntry
where
    I: IntoIterator<Item = (StatType, Vec<Value>)>,
{
    let mut index = ParlayBuilderEntry::new();
    let mut files = 0usize;
    let mut skipped = 0usize;

    for (stat_type, records) in per_stat_line_files {
        files += 1;
        for record in records {
            let Value::Object(mut details) = record else {
                skipped += 1;
                continue;
            };
            let Some(player) = player_name(&details) else {
                skipped += 1;
                continue;
            };
            for field in NAME_FIELDS {
                details.remove(*field);
            }

            let props = index.entry(player.clone()).or_default();
            if props.insert(stat_type.clone(), details).is_some() {
                debug!(sport = %sport, player = %player, stat = %stat_type, "Overwrote earlier prop record");
            }
        }
    }

    info!(
        sport = %sport,
        files,
        players = index.len(),
        skipped,
        "Parlay builder index built"
    );

    index
}

fn player_name(details: &PropDetails) -> Option<String> {
    NAME_FIELDS.iter().find_map(|&field| {
        details
            .get(field)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string)
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::LineRecord;
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[test]
    fn test_strips_name_field() {
        let index = build_index(
            Sport::Mlb,
            vec![(StatType::from("singles"), vec![json!({"name": "Aaron Judge", "line": 0.5})])],
        );
        let details = &index["Aaron Judge"][&StatType::from("singles")];
        assert!(details.get("name").is_none());
        assert_eq!(details["line"], json!(0.5));
    }

    #[test]
    fn test_strips_every_name_field() {
        let index = build_index(
            Sport::Mlb,
            vec![(
                StatType::from("singles"),
                vec![json!({"name": "Aaron Judge", "player_name": "Aaron Judge", "line": 0.5})],
            )],
        );
        let details = &index["Aaron Judge"][&StatType::from("singles")];
        assert!(details.get("name").is_none());
        assert!(details.get("player_name").is_none());
        assert_eq!(details.len(), 1);
    }

    #[test]
    fn test_disjoint_stats_merge() {
        let index = build_index(
            Sport::Mlb,
            vec![
                (StatType::from("singles"), vec![json!({"name": "Aaron Judge", "line": 0.5})]),
                (StatType::from("walks"), vec![json!({"name": "Aaron Judge", "line": 0.5})]),
            ],
        );
        let props = &index["Aaron Judge"];
        assert_eq!(props.len(), 2);
        assert!(props.contains_key(&StatType::from("singles")));
        assert!(props.contains_key(&StatType::from("walks")));
    }

    #[test]
    fn test_same_stat_last_write_wins() {
        let index = build_index(
            Sport::Nhl,
            vec![
                (StatType::from("points"), vec![json!({"name": "Connor McDavid", "line": 1.5})]),
                (StatType::from("points"), vec![json!({"name": "Connor McDavid", "line": 2.5})]),
            ],
        );
        assert_eq!(index["Connor McDavid"][&StatType::from("points")]["line"], json!(2.5));
    }

    #[test]
    fn test_skips_records_without_name() {
        let index = build_index(
            Sport::Wnba,
            vec![(
                StatType::from("points"),
                vec![json!({"line": 20.5}), json!({"name": "  "}), json!("A'ja Wilson"), json!({"name": "A'ja Wilson"})],
            )],
        );
        assert_eq!(index.len(), 1);
        assert!(index["A'ja Wilson"][&StatType::from("points")].is_empty());
    }

    #[test]
    fn test_no_files_is_empty() {
        let index = build_index(Sport::Nba, Vec::new());
        assert!(index.is_empty());
        assert_eq!(serde_json::to_string(&index).unwrap(), "{}");
    }

    #[test]
    fn test_accepts_serialized_line_records() {
        let record = LineRecord {
            player_name: "Connor McDavid".into(),
            stat_type: "points".into(),
            threshold: dec!(1.5),
            over_odds: -130,
            under_odds: 105,
            game: "EDM @ VAN".into(),
            start_time: Utc::now(),
        };
        let value = serde_json::to_value(&record).unwrap();
        let index = build_index(Sport::Nhl, vec![(StatType::from("points"), vec![value])]);
        let details = &index["Connor McDavid"][&StatType::from("points")];
        assert!(details.get("player_name").is_none());
        assert_eq!(details["over_odds"], json!(-130));
    }

    #[test]
    fn test_index_serializes_as_nested_maps() {
        let index = build_index(
            Sport::Mlb,
            vec![(StatType::from("tbs"), vec![json!({"name": "Juan Soto", "line": 1.5})])],
        );
        let json = serde_json::to_value(&index).unwrap();
        assert_eq!(json, json!({"Juan Soto": {"tbs": {"line": 1.5}}}));
    }
}
