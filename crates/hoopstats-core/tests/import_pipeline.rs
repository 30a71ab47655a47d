// Integration tests for the import pipeline.
//
// Each test copies the yearly exports from tests/fixtures into a scratch
// directory, points a config at it, and runs the library end-to-end:
// discovery, mapping, both storage layouts, queries and the report.

use std::fs;
use std::path::{Path, PathBuf};

use hoopstats_core::config::{Config, DatabaseConfig, ImportConfig, ReportConfig};
use hoopstats_core::db::Database;
use hoopstats_core::mapper::NumericPolicy;
use hoopstats_core::normalize::CellValue;
use hoopstats_core::pipeline;
use hoopstats_core::record::Column;
use hoopstats_core::schema::SchemaMode;

// ===========================================================================
// Test helpers
// ===========================================================================

/// Fixture directory path (relative to the package root, which is the cwd
/// for `cargo test`).
const FIXTURES: &str = "tests/fixtures";

const HEADER: &str = "Rk,Player,Age,Team,Pos,G,GS,MP,FG,FGA,FG%,3P,3PA,3P%,2P,2PA,2P%,eFG%,FT,FTA,FT%,ORB,DRB,TRB,AST,STL,BLK,TOV,PF,PTS,Awards";

/// Rows across both yearly fixtures (7 in 2023, 5 in 2024).
const FIXTURE_ROWS: usize = 12;

struct Workspace {
    dir: tempfile::TempDir,
}

impl Workspace {
    fn empty() -> Self {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("data")).unwrap();
        Self { dir }
    }

    fn with_fixtures() -> Self {
        let ws = Self::empty();
        for entry in fs::read_dir(FIXTURES).unwrap() {
            let path = entry.unwrap().path();
            fs::copy(&path, ws.data_dir().join(path.file_name().unwrap())).unwrap();
        }
        ws
    }

    fn data_dir(&self) -> PathBuf {
        self.dir.path().join("data")
    }

    fn db_path(&self) -> PathBuf {
        self.dir.path().join("store").join("nba_stats.db")
    }

    fn write(&self, name: &str, contents: &str) {
        fs::write(self.data_dir().join(name), contents).unwrap();
    }

    fn config(&self, mode: SchemaMode, reset: bool, policy: NumericPolicy) -> Config {
        Config {
            database: DatabaseConfig {
                path: path_string(&self.db_path()),
            },
            import: ImportConfig {
                data_dir: path_string(&self.data_dir()),
                schema_mode: mode,
                reset,
                numeric_policy: policy,
            },
            report: ReportConfig {
                recent_since_year: Some(2023),
                sample_limit: 5,
            },
        }
    }

    fn open(&self) -> Database {
        Database::open(&path_string(&self.db_path())).unwrap()
    }
}

fn path_string(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

// ===========================================================================
// Normalized layout
// ===========================================================================

#[test]
fn normalized_reimport_is_idempotent() {
    let ws = Workspace::with_fixtures();
    let config = ws.config(SchemaMode::Normalized, false, NumericPolicy::Lenient);

    let first = pipeline::run(&config).unwrap();
    assert_eq!(first.import.total_rows(), FIXTURE_ROWS);
    let years: Vec<i32> = first.import.files.iter().map(|f| f.year).collect();
    assert_eq!(years, vec![2023, 2024]);

    pipeline::run(&config).unwrap();
    let db = ws.open();
    assert_eq!(db.record_count(SchemaMode::Normalized).unwrap(), FIXTURE_ROWS);
}

#[test]
fn normalized_reimport_applies_corrections() {
    let ws = Workspace::with_fixtures();
    let config = ws.config(SchemaMode::Normalized, false, NumericPolicy::Lenient);
    pipeline::run(&config).unwrap();

    ws.write(
        "NBA_2024_per_game_stats.csv",
        &format!(
            "{HEADER}\n1,Joel Embiid,29,PHI,C,39,39,33.6,11.8,22.1,.529,1.4,3.6,.388,10.4,18.5,.564,.561,9.0,10.6,.883,2.4,8.6,11.0,5.6,1.2,1.7,3.8,2.9,35.0,AS\n"
        ),
    );
    pipeline::run(&config).unwrap();

    let db = ws.open();
    let history = db.player_history(SchemaMode::Normalized, "Joel Embiid").unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[1].year, 2024);
    assert_eq!(history[1].get(Column::Points), &CellValue::Float(35.0));
    assert_eq!(history[1].get(Column::Awards), &CellValue::Text("AS".into()));
    assert_eq!(db.record_count(SchemaMode::Normalized).unwrap(), FIXTURE_ROWS);
}

// ===========================================================================
// Unified layout
// ===========================================================================

#[test]
fn unified_accumulates_until_reset() {
    let ws = Workspace::with_fixtures();

    pipeline::run(&ws.config(SchemaMode::Unified, false, NumericPolicy::Lenient)).unwrap();
    pipeline::run(&ws.config(SchemaMode::Unified, false, NumericPolicy::Lenient)).unwrap();
    assert_eq!(ws.open().record_count(SchemaMode::Unified).unwrap(), 2 * FIXTURE_ROWS);

    let outcome =
        pipeline::run(&ws.config(SchemaMode::Unified, true, NumericPolicy::Lenient)).unwrap();
    assert_eq!(outcome.report.unwrap().summary.records, FIXTURE_ROWS);
}

// ===========================================================================
// Mapping through the whole pipeline
// ===========================================================================

#[test]
fn sparse_export_keeps_absent_columns_null() {
    let ws = Workspace::empty();
    ws.write(
        "NBA_2024_per_game_stats.csv",
        "Player,Age,Team,Pos,PTS,G\nLeBron James,39,LAL,SF,25.7,71\n",
    );
    pipeline::run(&ws.config(SchemaMode::Normalized, false, NumericPolicy::Lenient)).unwrap();

    let db = ws.open();
    let history = db.player_history(SchemaMode::Normalized, "LeBron James").unwrap();
    assert_eq!(history.len(), 1);
    let line = &history[0];
    assert_eq!(line.year, 2024);
    assert_eq!(line.get(Column::Age), &CellValue::Int(39));
    assert_eq!(line.get(Column::GamesPlayed), &CellValue::Int(71));
    assert_eq!(line.get(Column::Points), &CellValue::Float(25.7));
    assert_eq!(line.team(), &CellValue::Text("LAL".into()));
    assert_eq!(line.get(Column::Position), &CellValue::Text("SF".into()));
    for column in [Column::GamesStarted, Column::Assists, Column::FreeThrowPercentage, Column::Awards] {
        assert!(line.get(column).is_null(), "{column:?} should be null");
    }
}

#[test]
fn short_rows_import_with_trailing_nulls() {
    let ws = Workspace::empty();
    ws.write(
        "NBA_2024_per_game_stats.csv",
        "Player,Age,Team,PTS,Awards\nA,20,LAL,10.5,AS\nB,21,BOS\n",
    );
    let outcome =
        pipeline::run(&ws.config(SchemaMode::Normalized, false, NumericPolicy::Strict)).unwrap();
    assert_eq!(outcome.import.total_rows(), 2);

    let history = ws.open().player_history(SchemaMode::Normalized, "B").unwrap();
    assert_eq!(history[0].team(), &CellValue::Text("BOS".into()));
    assert!(history[0].get(Column::Points).is_null());
    assert!(history[0].get(Column::Awards).is_null());
}

#[test]
fn data_dir_with_glob_characters_is_searched() {
    let ws = Workspace::empty();
    let data_dir = ws.dir.path().join("data [2024]");
    fs::create_dir_all(&data_dir).unwrap();
    fs::copy(
        Path::new(FIXTURES).join("NBA_2024_per_game_stats.csv"),
        data_dir.join("NBA_2024_per_game_stats.csv"),
    )
    .unwrap();

    let mut config = ws.config(SchemaMode::Unified, false, NumericPolicy::Lenient);
    config.import.data_dir = path_string(&data_dir);
    let outcome = pipeline::run(&config).unwrap();
    assert_eq!(outcome.import.files.len(), 1);
    assert_eq!(outcome.import.total_rows(), 5);
}

#[test]
fn file_without_year_is_skipped() {
    let ws = Workspace::with_fixtures();
    let outcome =
        pipeline::run(&ws.config(SchemaMode::Unified, false, NumericPolicy::Lenient)).unwrap();
    assert_eq!(outcome.import.skipped, vec![ws.data_dir().join("NBA_notes.csv")]);
    assert_eq!(outcome.import.files.len(), 2);
}

#[test]
fn strict_failure_keeps_earlier_files() {
    let ws = Workspace::empty();
    fs::copy(
        Path::new(FIXTURES).join("NBA_2023_per_game_stats.csv"),
        ws.data_dir().join("NBA_2023_per_game_stats.csv"),
    )
    .unwrap();
    ws.write(
        "NBA_2024_per_game_stats.csv",
        "Player,Team,PTS\nGood Row,BOS,20.1\nBad Row,BOS,abc\n",
    );

    let err = pipeline::run(&ws.config(SchemaMode::Normalized, false, NumericPolicy::Strict))
        .unwrap_err();
    assert!(format!("{err:#}").contains("NBA_2024_per_game_stats.csv"));

    let db = ws.open();
    assert_eq!(db.record_count(SchemaMode::Normalized).unwrap(), 7);
    assert!(db.player_history(SchemaMode::Normalized, "Good Row").unwrap().is_empty());
}

#[test]
fn lenient_run_keeps_malformed_text() {
    let ws = Workspace::empty();
    ws.write("NBA_2024_per_game_stats.csv", "Player,Team,PTS\nBad Row,BOS,abc\n");

    pipeline::run(&ws.config(SchemaMode::Unified, false, NumericPolicy::Lenient)).unwrap();
    let history = ws.open().player_history(SchemaMode::Unified, "Bad Row").unwrap();
    assert_eq!(history[0].get(Column::Points), &CellValue::Text("abc".into()));
}

// ===========================================================================
// Queries and report over imported data
// ===========================================================================

#[test]
fn queries_over_imported_fixtures() {
    let ws = Workspace::with_fixtures();
    pipeline::run(&ws.config(SchemaMode::Normalized, false, NumericPolicy::Lenient)).unwrap();
    let db = ws.open();
    let mode = SchemaMode::Normalized;

    let leaders = db.season_leaders(mode, 2023, Some(10), true).unwrap();
    let players: Vec<&str> = leaders.iter().map(|r| r.player.as_str()).collect();
    assert_eq!(players, vec!["Joel Embiid", "Luka Dončić", "Kevin Durant"]);
    assert_eq!(leaders[2].team(), &CellValue::Text("BRK".into()));

    assert_eq!(db.player_history(mode, "Kevin Durant").unwrap().len(), 4);
    assert_eq!(db.player_career(mode, "Kevin Durant").unwrap().len(), 3);

    assert_eq!(db.search_players(mode, "durant").unwrap(), vec!["Kevin Durant"]);
    assert_eq!(
        db.distinct_teams(mode).unwrap(),
        vec!["2TM", "BRK", "DAL", "LAL", "PHI", "PHO"]
    );
    assert_eq!(
        db.distinct_awards(mode).unwrap(),
        vec!["AS", "MVP-1", "MVP-3", "MVP-8", "NBA1", "NBA2", "NBA3"]
    );

    let phi = db.team_season(mode, "PHI", 2023).unwrap();
    let players: Vec<&str> = phi.iter().map(|r| r.player.as_str()).collect();
    assert_eq!(players, vec!["Joel Embiid", "Mac McClung"]);
}

#[test]
fn report_summarizes_both_seasons() {
    for mode in [SchemaMode::Normalized, SchemaMode::Unified] {
        let ws = Workspace::with_fixtures();
        let outcome = pipeline::run(&ws.config(mode, false, NumericPolicy::Lenient)).unwrap();
        let report = outcome.report.expect("report should be built");

        assert_eq!(report.summary.records, FIXTURE_ROWS, "{mode:?}");
        assert_eq!(report.summary.players, 6, "{mode:?}");
        assert_eq!(report.summary.teams, 6, "{mode:?}");
        assert_eq!(report.high_scorers.len(), 5);
        assert_eq!(report.high_scorers[0].player, "Joel Embiid");
        assert_eq!(report.high_scorers[0].year, 2024);

        let text = report.to_string();
        assert!(text.contains("Seasons: 2 (2023 - 2024)"), "{text}");
        assert!(text.contains("Player Statistics Records: 12"), "{text}");
    }
}
