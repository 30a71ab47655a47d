// Post-import summary: aggregate counts and a recent high scorers sample.

use std::fmt;

use anyhow::{Context, Result};
use rusqlite::params;

use crate::config::ReportConfig;
use crate::db::Database;
use crate::normalize::CellValue;
use crate::schema::SchemaMode;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseSummary {
    pub records: usize,
    pub players: usize,
    pub teams: usize,
    pub seasons: usize,
    pub first_year: Option<i32>,
    pub last_year: Option<i32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScorerLine {
    pub year: i32,
    pub player: String,
    pub team: CellValue,
    pub points: CellValue,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DatabaseReport {
    pub mode: SchemaMode,
    pub summary: DatabaseSummary,
    pub since_year: i32,
    pub high_scorers: Vec<ScorerLine>,
}

impl Database {
    /// Row count, distinct players / teams / seasons and the year range.
    pub fn summary(&self, mode: SchemaMode) -> Result<DatabaseSummary> {
        let conn = self.conn();
        let relation = mode.records_relation();
        conn.query_row(
            &format!(
                "SELECT COUNT(*), COUNT(DISTINCT player), COUNT(DISTINCT team),
                        COUNT(DISTINCT year), MIN(year), MAX(year)
                 FROM {relation}"
            ),
            [],
            |row| {
                Ok(DatabaseSummary {
                    records: row.get::<_, i64>(0)? as usize,
                    players: row.get::<_, i64>(1)? as usize,
                    teams: row.get::<_, i64>(2)? as usize,
                    seasons: row.get::<_, i64>(3)? as usize,
                    first_year: row.get(4)?,
                    last_year: row.get(5)?,
                })
            },
        )
        .context("failed to compute database summary")
    }

    /// Lines from `since_year` onwards, newest season first and highest
    /// scorer first within a season.
    pub fn recent_high_scorers(
        &self,
        mode: SchemaMode,
        since_year: i32,
        limit: usize,
    ) -> Result<Vec<ScorerLine>> {
        let conn = self.conn();
        let relation = mode.records_relation();
        let mut stmt = conn
            .prepare(&format!(
                "SELECT year, player, team, points FROM {relation}
                 WHERE year >= ?1
                 ORDER BY year DESC, points DESC NULLS LAST, player
                 LIMIT ?2"
            ))
            .context("failed to prepare high scorers query")?;

        let lines = stmt
            .query_map(params![since_year, limit as i64], |row| {
                Ok(ScorerLine {
                    year: row.get(0)?,
                    player: row.get(1)?,
                    team: row.get(2)?,
                    points: row.get(3)?,
                })
            })
            .context("failed to query high scorers")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to map high scorer rows")?;
        Ok(lines)
    }
}

/// Run every reporting query for `mode`.
pub fn build_report(db: &Database, mode: SchemaMode, config: &ReportConfig) -> Result<DatabaseReport> {
    let since_year = config.since_year();
    Ok(DatabaseReport {
        mode,
        summary: db.summary(mode)?,
        since_year,
        high_scorers: db.recent_high_scorers(mode, since_year, config.sample_limit)?,
    })
}

impl fmt::Display for DatabaseReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = &self.summary;
        writeln!(f, "=== Database Statistics ({:?}) ===", self.mode)?;
        writeln!(f, "Players: {}", s.players)?;
        writeln!(f, "Teams: {}", s.teams)?;
        match (s.first_year, s.last_year) {
            (Some(first), Some(last)) => writeln!(f, "Seasons: {} ({first} - {last})", s.seasons)?,
            _ => writeln!(f, "Seasons: {}", s.seasons)?,
        }
        writeln!(f, "Player Statistics Records: {}", s.records)?;

        writeln!(f)?;
        writeln!(f, "=== Recent High Scorers (since {}) ===", self.since_year)?;
        if self.high_scorers.is_empty() {
            writeln!(f, "(none)")?;
        }
        for line in &self.high_scorers {
            let points = match line.points.as_f64() {
                Some(p) => format!("{p:.1}"),
                None => line.points.to_string(),
            };
            writeln!(
                f,
                "{}  {:<28} {:<4} {:>5}",
                line.year,
                line.player,
                line.team.to_string(),
                points
            )?;
        }
        Ok(())
    }
}
