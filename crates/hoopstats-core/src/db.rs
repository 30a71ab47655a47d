// SQLite store for imported per-game stat lines.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use anyhow::{Context, Result};
use rusqlite::{params, params_from_iter, Connection, Transaction};

use crate::normalize::CellValue;
use crate::record::{column_list, Column, StatRecord};
use crate::schema::{self, SchemaMode, UNIFIED_TABLE};

/// SQLite-backed store. Holds the single connection used for the whole run.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open (or create) the database at `path`. Creates the parent directory
    /// when it is missing. Pass `":memory:"` for an ephemeral database.
    pub fn open(path: &str) -> Result<Self> {
        if path != ":memory:" {
            if let Some(parent) = Path::new(path).parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("failed to create database directory {}", parent.display())
                })?;
            }
        }

        let conn = Connection::open(path)
            .with_context(|| format!("failed to open database at {path}"))?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA busy_timeout = 5000;
             PRAGMA foreign_keys = ON;",
        )
        .context("failed to set database pragmas")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Acquire the database connection.
    ///
    /// Panics if the mutex is poisoned, which only happens if a previous
    /// holder panicked.
    pub(crate) fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().expect("database mutex poisoned")
    }

    /// Create the schema for `mode`, dropping the previous one when `reset` is set.
    pub fn ensure_schema(&self, mode: SchemaMode, reset: bool) -> Result<()> {
        let conn = self.conn();
        schema::ensure_schema(&conn, mode, reset)
    }

    /// Persist one file's worth of records in a single transaction. Returns
    /// the number of rows written. Nothing from `records` is visible unless
    /// every row succeeds.
    pub fn write_records(&self, mode: SchemaMode, records: &[StatRecord]) -> Result<usize> {
        let mut conn = self.conn();
        let tx = conn.transaction().context("failed to begin import transaction")?;

        for record in records {
            match mode {
                SchemaMode::Normalized => upsert_normalized(&tx, record)?,
                SchemaMode::Unified => insert_unified(&tx, record)?,
            }
        }

        tx.commit().context("failed to commit import")?;
        Ok(records.len())
    }

    /// Number of stored stat lines for `mode`.
    pub fn record_count(&self, mode: SchemaMode) -> Result<usize> {
        let conn = self.conn();
        let count: i64 = conn
            .query_row(
                &format!("SELECT COUNT(*) FROM {}", mode.records_relation()),
                [],
                |row| row.get(0),
            )
            .context("failed to count stat records")?;
        Ok(count as usize)
    }
}

/// Comma-separated `?N` placeholders starting at `first`.
fn placeholders(first: usize, count: usize) -> String {
    (first..first + count)
        .map(|i| format!("?{i}"))
        .collect::<Vec<_>>()
        .join(", ")
}

fn insert_unified(tx: &Transaction<'_>, record: &StatRecord) -> Result<()> {
    let sql = format!(
        "INSERT INTO {UNIFIED_TABLE} (year, player, {columns}) VALUES (?1, ?2, {values})",
        columns = column_list(&[]),
        values = placeholders(3, Column::COUNT),
    );

    let mut stmt = tx
        .prepare_cached(&sql)
        .context("failed to prepare unified insert")?;
    let year = CellValue::Int(i64::from(record.year));
    let player = CellValue::Text(record.player.clone());
    let params = [&year, &player].into_iter().chain(record.values());
    stmt.execute(params_from_iter(params))
        .with_context(|| format!("failed to insert {} ({})", record.player, record.year))?;
    Ok(())
}

/// Look up or insert a dimension row keyed on a unique column, returning its id.
fn dimension_id(tx: &Transaction<'_>, table: &str, key_column: &str, key: &dyn rusqlite::ToSql) -> Result<i64> {
    let id = tx
        .query_row(
            &format!(
                "INSERT INTO {table} ({key_column}) VALUES (?1)
                 ON CONFLICT({key_column}) DO UPDATE SET {key_column} = excluded.{key_column}
                 RETURNING id"
            ),
            params![key],
            |row| row.get(0),
        )
        .with_context(|| format!("failed to upsert {table} row"))?;
    Ok(id)
}

/// Overwrite the fact row for (player, team, season), inserting it if absent.
/// A null team is matched with `IS` so team-less rows are also updated in place.
fn upsert_normalized(tx: &Transaction<'_>, record: &StatRecord) -> Result<()> {
    let season_id = dimension_id(tx, "seasons", "year", &record.year)?;
    let player_id = dimension_id(tx, "players", "name", &record.player)?;
    let team_id = match record.team() {
        CellValue::Null => None,
        team => Some(dimension_id(tx, "teams", "abbreviation", team)?),
    };

    let fact_values: Vec<&CellValue> = Column::ALL
        .into_iter()
        .filter(|c| *c != Column::Team)
        .map(|c| record.get(c))
        .collect();

    let assignments = Column::ALL
        .into_iter()
        .filter(|c| *c != Column::Team)
        .enumerate()
        .map(|(i, c)| format!("{} = ?{}", c.name(), i + 4))
        .collect::<Vec<_>>()
        .join(", ");

    let update_sql = format!(
        "UPDATE player_stats SET {assignments}
         WHERE player_id = ?1 AND team_id IS ?2 AND season_id = ?3"
    );
    let insert_sql = format!(
        "INSERT INTO player_stats (player_id, team_id, season_id, {columns}) VALUES (?1, ?2, ?3, {values})",
        columns = schema::normalized_fact_columns(),
        values = placeholders(4, fact_values.len()),
    );

    let keys: [&dyn rusqlite::ToSql; 3] = [&player_id, &team_id, &season_id];
    let bind = keys
        .into_iter()
        .chain(fact_values.iter().map(|v| *v as &dyn rusqlite::ToSql));

    let updated = tx
        .prepare_cached(&update_sql)
        .context("failed to prepare player_stats update")?
        .execute(params_from_iter(bind.clone()))
        .with_context(|| format!("failed to update {} ({})", record.player, record.year))?;

    if updated == 0 {
        tx.prepare_cached(&insert_sql)
            .context("failed to prepare player_stats insert")?
            .execute(params_from_iter(bind))
            .with_context(|| format!("failed to insert {} ({})", record.player, record.year))?;
    }

    Ok(())
}
