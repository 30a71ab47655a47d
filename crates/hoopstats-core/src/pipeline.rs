// End-to-end run: open store, prepare schema, import, report.

use anyhow::{Context, Result};
use thiserror::Error;
use tracing::{error, info};

use crate::config::{Config, ReportConfig};
use crate::db::Database;
use crate::importer::{ImportSummary, Importer};
use crate::report::{build_report, DatabaseReport};
use crate::schema::SchemaMode;

/// Stages a run moves through, in order. `Failed` is terminal and replaces
/// whatever phase would have come next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Started,
    SchemaReady,
    Importing,
    Imported,
    Reported,
    Failed,
}

/// Attached to the error of an aborted run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("run failed after phase {last:?}")]
pub struct RunFailed {
    /// Last phase reached before the run moved to `Phase::Failed`.
    pub last: Phase,
}

#[derive(Debug)]
pub struct RunOutcome {
    pub import: ImportSummary,
    /// `None` when the reporting queries failed after a successful import.
    pub report: Option<DatabaseReport>,
}

fn enter(phase: Phase) {
    info!("Phase: {phase:?}");
}

fn fail(last: Phase, stage: &str, err: anyhow::Error) -> anyhow::Error {
    error!("{stage} failed: {err:#}");
    enter(Phase::Failed);
    err.context(RunFailed { last })
}

/// Run the whole import against the database named in `config`.
///
/// Store, schema and import failures abort the run with a `RunFailed`
/// context. A reporting failure is logged and leaves `report` empty.
pub fn run(config: &Config) -> Result<RunOutcome> {
    enter(Phase::Started);
    let db = Database::open(&config.database.path)
        .with_context(|| format!("cannot open database {}", config.database.path))
        .map_err(|e| fail(Phase::Started, "Database setup", e))?;
    info!("Connected to {}", config.database.path);
    run_with(&db, config)
}

/// Same as `run`, against an already open database.
pub fn run_with(db: &Database, config: &Config) -> Result<RunOutcome> {
    let mode = config.import.schema_mode;

    db.ensure_schema(mode, config.import.reset)
        .map_err(|e| fail(Phase::Started, "Schema setup", e))?;
    enter(Phase::SchemaReady);

    enter(Phase::Importing);
    let import = Importer::new(db, &config.import)
        .run()
        .map_err(|e| fail(Phase::Importing, "Import", e))?;
    enter(Phase::Imported);

    let report = report_phase(db, mode, &config.report);
    enter(Phase::Reported);

    Ok(RunOutcome { import, report })
}

fn report_phase(db: &Database, mode: SchemaMode, config: &ReportConfig) -> Option<DatabaseReport> {
    match build_report(db, mode, config) {
        Ok(report) => Some(report),
        Err(e) => {
            error!("Reporting failed: {e:#}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DatabaseConfig, ImportConfig};
    use crate::mapper::NumericPolicy;
    use std::fs;
    use std::path::Path;

    const CSV: &str = "\
Rk,Player,Age,Team,Pos,G,GS,MP,FG,FGA,FG%,3P,3PA,3P%,2P,2PA,2P%,eFG%,FT,FTA,FT%,ORB,DRB,TRB,AST,STL,BLK,TOV,PF,PTS,Awards
1,Joel Embiid,29,PHI,C,39,39,33.6,11.8,22.1,.529,1.4,3.6,.388,10.4,18.5,.564,.561,9.0,10.6,.883,2.4,8.6,11.0,5.6,1.2,1.7,3.8,2.9,34.7,
2,Luka Dončić,24,DAL,PG,70,70,37.5,11.5,23.6,.487,4.1,10.6,.382,7.4,13.0,.573,.573,6.1,7.8,.786,0.8,8.4,9.2,9.8,1.4,0.5,4.0,2.1,33.9,\"MVP-3,AS,NBA1\"
";

    fn config(dir: &Path, mode: SchemaMode, reset: bool) -> Config {
        Config {
            database: DatabaseConfig {
                path: dir.join("db").join("stats.db").to_string_lossy().into_owned(),
            },
            import: ImportConfig {
                data_dir: dir.join("data").to_string_lossy().into_owned(),
                schema_mode: mode,
                reset,
                numeric_policy: NumericPolicy::Lenient,
            },
            report: ReportConfig {
                recent_since_year: Some(2020),
                sample_limit: 10,
            },
        }
    }

    fn with_data() -> tempfile::TempDir {
        let tmp = tempfile::tempdir().unwrap();
        fs::create_dir_all(tmp.path().join("data")).unwrap();
        fs::write(tmp.path().join("data").join("NBA_2024_per_game_stats.csv"), CSV).unwrap();
        tmp
    }

    #[test]
    fn full_run_creates_database_and_reports() {
        let tmp = with_data();
        let outcome = run(&config(tmp.path(), SchemaMode::Normalized, false)).unwrap();

        assert!(tmp.path().join("db").join("stats.db").exists());
        assert_eq!(outcome.import.total_rows(), 2);
        let report = outcome.report.expect("report should be built");
        assert_eq!(report.summary.records, 2);
        assert_eq!(report.high_scorers[0].player, "Joel Embiid");
    }

    #[test]
    fn rerun_without_reset_in_unified_mode_accumulates() {
        let tmp = with_data();
        let cfg = config(tmp.path(), SchemaMode::Unified, false);
        run(&cfg).unwrap();
        let second = run(&cfg).unwrap();
        assert_eq!(second.report.unwrap().summary.records, 4);

        let reset = run(&config(tmp.path(), SchemaMode::Unified, true)).unwrap();
        assert_eq!(reset.report.unwrap().summary.records, 2);
    }

    #[test]
    fn missing_data_dir_aborts() {
        let tmp = tempfile::tempdir().unwrap();
        let err = run(&config(tmp.path(), SchemaMode::Normalized, false)).unwrap_err();
        assert!(format!("{err:#}").contains("data directory not found"));
        assert_eq!(
            err.downcast_ref::<RunFailed>(),
            Some(&RunFailed { last: Phase::Importing })
        );
    }

    #[test]
    fn schema_failure_fails_before_schema_ready() {
        let tmp = with_data();
        let db = Database::open(":memory:").unwrap();
        db.conn()
            .execute_batch("CREATE TABLE player_stats_unified (id INTEGER PRIMARY KEY)")
            .unwrap();

        let err = run_with(&db, &config(tmp.path(), SchemaMode::Unified, false)).unwrap_err();
        assert_eq!(
            err.downcast_ref::<RunFailed>(),
            Some(&RunFailed { last: Phase::Started })
        );
    }

    #[test]
    fn unopenable_database_fails_at_start() {
        let tmp = with_data();
        fs::write(tmp.path().join("db"), "not a directory").unwrap();

        let err = run(&config(tmp.path(), SchemaMode::Normalized, false)).unwrap_err();
        assert!(format!("{err:#}").contains("cannot open database"));
        assert_eq!(
            err.downcast_ref::<RunFailed>(),
            Some(&RunFailed { last: Phase::Started })
        );
    }

    #[test]
    fn report_failure_is_not_fatal() {
        let db = Database::open(":memory:").unwrap();
        assert!(report_phase(&db, SchemaMode::Unified, &ReportConfig::default()).is_none());
    }
}
