// Read-only lookups over imported stat lines. Every query runs against the
// mode's records relation, so both layouts answer the same way.

use std::collections::BTreeSet;

use anyhow::{Context, Result};
use rusqlite::{params, Params, Row};

use crate::db::Database;
use crate::record::{column_list, Column, StatRecord};
use crate::schema::SchemaMode;

/// Rows whose team is a multi-team season aggregate (`2TM`, `3TM`, `TOT`).
const SINGLE_TEAM_ONLY: &str = "(team IS NULL OR (team NOT LIKE '%TM' AND team <> 'TOT'))";

fn record_from_row(row: &Row<'_>) -> rusqlite::Result<StatRecord> {
    let mut record = StatRecord::new(row.get(0)?, row.get::<_, String>(1)?);
    for (offset, column) in Column::ALL.into_iter().enumerate() {
        record.set(column, row.get(offset + 2)?);
    }
    Ok(record)
}

impl Database {
    /// `SELECT` every record column from the mode's relation, followed by
    /// `tail` (WHERE / ORDER BY clauses).
    fn query_records<P: Params>(&self, mode: SchemaMode, tail: &str, params: P) -> Result<Vec<StatRecord>> {
        let conn = self.conn();
        let sql = format!(
            "SELECT year, player, {columns} FROM {relation} {tail}",
            columns = column_list(&[]),
            relation = mode.records_relation(),
        );
        let mut stmt = conn
            .prepare(&sql)
            .with_context(|| format!("failed to prepare query: {tail}"))?;
        let records = stmt
            .query_map(params, record_from_row)
            .context("failed to run stat line query")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to map stat line rows")?;
        Ok(records)
    }

    fn query_strings<P: Params>(&self, sql: &str, params: P) -> Result<Vec<String>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare(sql)
            .with_context(|| format!("failed to prepare query: {sql}"))?;
        let values = stmt
            .query_map(params, |row| row.get(0))
            .context("failed to run lookup query")?
            .collect::<std::result::Result<Vec<String>, _>>()
            .context("failed to map lookup rows")?;
        Ok(values)
    }

    /// Every line for a player, oldest season first.
    pub fn player_history(&self, mode: SchemaMode, name: &str) -> Result<Vec<StatRecord>> {
        self.query_records(mode, "WHERE player = ?1 ORDER BY year, team", params![name])
    }

    /// Like `player_history`, without the multi-team aggregate lines.
    pub fn player_career(&self, mode: SchemaMode, name: &str) -> Result<Vec<StatRecord>> {
        self.query_records(
            mode,
            &format!("WHERE player = ?1 AND {SINGLE_TEAM_ONLY} ORDER BY year, team"),
            params![name],
        )
    }

    /// Lines for `year`, best scorers first.
    pub fn season_leaders(
        &self,
        mode: SchemaMode,
        year: i32,
        min_games: Option<i64>,
        exclude_multi_team: bool,
    ) -> Result<Vec<StatRecord>> {
        let team_filter = if exclude_multi_team {
            format!("AND {SINGLE_TEAM_ONLY}")
        } else {
            String::new()
        };
        self.query_records(
            mode,
            &format!(
                "WHERE year = ?1 AND (?2 IS NULL OR games_played >= ?2) {team_filter}
                 ORDER BY points DESC NULLS LAST, player"
            ),
            params![year, min_games],
        )
    }

    pub fn team_season(&self, mode: SchemaMode, team: &str, year: i32) -> Result<Vec<StatRecord>> {
        self.query_records(
            mode,
            "WHERE team = ?1 AND year = ?2 ORDER BY points DESC NULLS LAST, player",
            params![team, year],
        )
    }

    /// Distinct player names containing `fragment`, ignoring ASCII case.
    pub fn search_players(&self, mode: SchemaMode, fragment: &str) -> Result<Vec<String>> {
        self.query_strings(
            &format!(
                "SELECT DISTINCT player FROM {}
                 WHERE instr(LOWER(player), LOWER(?1)) > 0
                 ORDER BY player",
                mode.records_relation()
            ),
            params![fragment],
        )
    }

    pub fn distinct_teams(&self, mode: SchemaMode) -> Result<Vec<String>> {
        self.query_strings(
            &format!(
                "SELECT DISTINCT team FROM {} WHERE team IS NOT NULL ORDER BY team",
                mode.records_relation()
            ),
            [],
        )
    }

    /// Individual award tokens (`MVP-1`, `AS`, `NBA1`, ...) across all lines.
    pub fn distinct_awards(&self, mode: SchemaMode) -> Result<Vec<String>> {
        let raw = self.query_strings(
            &format!(
                "SELECT DISTINCT CAST(awards AS TEXT) FROM {} WHERE awards IS NOT NULL",
                mode.records_relation()
            ),
            [],
        )?;
        let tokens: BTreeSet<String> = raw
            .iter()
            .flat_map(|list| list.split(','))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .map(str::to_string)
            .collect();
        Ok(tokens.into_iter().collect())
    }
}
