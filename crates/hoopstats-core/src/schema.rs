// Schema management for the two storage layouts.
//
// Normalized: players / teams / seasons dimensions plus a player_stats fact
// table keyed on (player, team, season), created only if absent. A read view
// flattens it to the unified column shape.
//
// Unified: a single denormalized table with no uniqueness constraint. Rows
// accumulate across runs unless the table is reset.

use anyhow::{Context, Result};
use rusqlite::Connection;
use serde::Deserialize;
use tracing::info;

use crate::record::{column_list, Column};

pub const UNIFIED_TABLE: &str = "player_stats_unified";
pub const FLAT_VIEW: &str = "player_stats_flat";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaMode {
    #[default]
    Normalized,
    Unified,
}

impl SchemaMode {
    /// Table or view with one row per stat line in the unified column shape
    /// (`year`, `player`, then every catalogued column).
    pub fn records_relation(self) -> &'static str {
        match self {
            SchemaMode::Normalized => FLAT_VIEW,
            SchemaMode::Unified => UNIFIED_TABLE,
        }
    }
}

/// Ensure the schema for `mode` exists, dropping the previous one first when
/// `reset` is set. Statements run one at a time: a failure partway through
/// leaves whatever was already created.
pub fn ensure_schema(conn: &Connection, mode: SchemaMode, reset: bool) -> Result<()> {
    match mode {
        SchemaMode::Normalized => {
            if reset {
                drop_normalized(conn)?;
            }
            create_normalized(conn)?;
        }
        SchemaMode::Unified => {
            if reset {
                conn.execute_batch(&format!("DROP TABLE IF EXISTS {UNIFIED_TABLE};"))
                    .context("failed to drop unified table")?;
                info!("Dropped {UNIFIED_TABLE}");
            }
            create_unified(conn)?;
        }
    }
    info!("Schema ready ({mode:?}, reset={reset})");
    Ok(())
}

fn column_definitions(skip: &[Column]) -> String {
    Column::ALL
        .into_iter()
        .filter(|c| !skip.contains(c))
        .map(|c| format!("{} {}", c.name(), c.kind().sql_type()))
        .collect::<Vec<_>>()
        .join(",\n                ")
}

fn drop_normalized(conn: &Connection) -> Result<()> {
    conn.execute_batch(&format!(
        "DROP VIEW IF EXISTS {FLAT_VIEW};
         DROP TABLE IF EXISTS player_stats;
         DROP TABLE IF EXISTS players;
         DROP TABLE IF EXISTS teams;
         DROP TABLE IF EXISTS seasons;"
    ))
    .context("failed to drop normalized schema")?;
    info!("Dropped normalized schema");
    Ok(())
}

fn create_normalized(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS players (
            id         INTEGER PRIMARY KEY AUTOINCREMENT,
            name       TEXT NOT NULL UNIQUE,
            created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
        );

        CREATE TABLE IF NOT EXISTS teams (
            id           INTEGER PRIMARY KEY AUTOINCREMENT,
            abbreviation TEXT NOT NULL UNIQUE,
            name         TEXT,
            created_at   TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
        );

        CREATE TABLE IF NOT EXISTS seasons (
            id         INTEGER PRIMARY KEY AUTOINCREMENT,
            year       INTEGER NOT NULL UNIQUE,
            created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
        );
        ",
    )
    .context("failed to create dimension tables")?;

    conn.execute_batch(&format!(
        "
        CREATE TABLE IF NOT EXISTS player_stats (
            id        INTEGER PRIMARY KEY AUTOINCREMENT,
            player_id INTEGER NOT NULL REFERENCES players(id),
            team_id   INTEGER REFERENCES teams(id),
            season_id INTEGER NOT NULL REFERENCES seasons(id),
            {columns},
            created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
            UNIQUE(player_id, team_id, season_id)
        );
        ",
        columns = column_definitions(&[Column::Team]),
    ))
    .context("failed to create player_stats table")?;

    conn.execute_batch(
        "
        CREATE INDEX IF NOT EXISTS idx_player_stats_player_id ON player_stats(player_id);
        CREATE INDEX IF NOT EXISTS idx_player_stats_season_id ON player_stats(season_id);
        CREATE INDEX IF NOT EXISTS idx_player_stats_team_id ON player_stats(team_id);
        CREATE INDEX IF NOT EXISTS idx_player_stats_position ON player_stats(position);
        ",
    )
    .context("failed to create player_stats indexes")?;

    let flattened = Column::ALL
        .into_iter()
        .map(|c| match c {
            Column::Team => "t.abbreviation AS team".to_string(),
            other => format!("ps.{0} AS {0}", other.name()),
        })
        .collect::<Vec<_>>()
        .join(", ");

    conn.execute_batch(&format!(
        "
        CREATE VIEW IF NOT EXISTS {FLAT_VIEW} AS
        SELECT ps.id AS id, s.year AS year, p.name AS player, {flattened}
        FROM player_stats ps
        JOIN players p ON p.id = ps.player_id
        JOIN seasons s ON s.id = ps.season_id
        LEFT JOIN teams t ON t.id = ps.team_id;
        "
    ))
    .context("failed to create flattened stats view")?;

    Ok(())
}

fn create_unified(conn: &Connection) -> Result<()> {
    conn.execute_batch(&format!(
        "
        CREATE TABLE IF NOT EXISTS {UNIFIED_TABLE} (
            id     INTEGER PRIMARY KEY AUTOINCREMENT,
            year   INTEGER NOT NULL,
            player TEXT NOT NULL,
            {columns},
            created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
        );

        CREATE INDEX IF NOT EXISTS idx_unified_year ON {UNIFIED_TABLE}(year);
        CREATE INDEX IF NOT EXISTS idx_unified_player ON {UNIFIED_TABLE}(player);
        CREATE INDEX IF NOT EXISTS idx_unified_team ON {UNIFIED_TABLE}(team);
        CREATE INDEX IF NOT EXISTS idx_unified_year_points ON {UNIFIED_TABLE}(year, points);
        ",
        columns = column_definitions(&[]),
    ))
    .context("failed to create unified table")?;
    Ok(())
}

/// Column names written to the fact table in normalized mode, in catalogue order.
pub(crate) fn normalized_fact_columns() -> String {
    column_list(&[Column::Team])
}
