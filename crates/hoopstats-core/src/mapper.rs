// Row mapping: one CSV row + file year -> StatRecord.

use csv::StringRecord;
use serde::Deserialize;
use thiserror::Error;
use tracing::warn;

use crate::normalize::{clean_value, CellValue};
use crate::record::{Column, StatRecord};

/// Source header carrying the player's name.
pub const PLAYER_HEADER: &str = "Player";

/// What to do when a numeric column holds a cell that does not parse as a number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NumericPolicy {
    /// Keep the trimmed text and log a warning.
    #[default]
    Lenient,
    /// Reject the row.
    Strict,
}

#[derive(Debug, Error, PartialEq)]
pub enum MapError {
    #[error("row has no `Player` value")]
    MissingPlayer,

    #[error("malformed number {value:?} in column `{column}` for {player}")]
    MalformedNumber {
        column: &'static str,
        value: String,
        player: String,
    },
}

/// Positions of the player and catalogued columns in one file's header row,
/// resolved once per file. The first occurrence of a repeated header wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderIndex {
    player: Option<usize>,
    columns: [Option<usize>; Column::COUNT],
}

impl HeaderIndex {
    pub fn new(headers: &StringRecord) -> Self {
        let mut index = Self {
            player: None,
            columns: [None; Column::COUNT],
        };
        for (pos, header) in headers.iter().enumerate() {
            let header = header.trim();
            if header == PLAYER_HEADER {
                index.player.get_or_insert(pos);
                continue;
            }
            if let Some(column) = Column::ALL.into_iter().find(|c| c.source() == header) {
                index.columns[column.index()].get_or_insert(pos);
            }
        }
        index
    }

    /// Header position of `column`, or `None` when the file lacks it.
    pub fn position(&self, column: Column) -> Option<usize> {
        self.columns[column.index()]
    }
}

/// One CSV record read through its file's `HeaderIndex`.
#[derive(Debug, Clone, Copy)]
pub struct SourceRow<'a> {
    index: &'a HeaderIndex,
    record: &'a StringRecord,
}

impl<'a> SourceRow<'a> {
    pub fn new(index: &'a HeaderIndex, record: &'a StringRecord) -> Self {
        Self { index, record }
    }

    pub fn player(&self) -> Option<&'a str> {
        self.record.get(self.index.player?)
    }

    /// Raw cell for `column`, or `None` when the file has no such column
    /// (or the row is short).
    pub fn cell(&self, column: Column) -> Option<&'a str> {
        self.record.get(self.index.position(column)?)
    }
}

/// Map a source row to a record for `year`.
///
/// Every catalogued column is normalized from its source cell; a column the
/// file lacks maps to null. The player name is taken verbatim.
pub fn map_row(row: &SourceRow<'_>, year: i32, policy: NumericPolicy) -> Result<StatRecord, MapError> {
    let player = match row.player() {
        Some(name) if !name.trim().is_empty() => name,
        _ => return Err(MapError::MissingPlayer),
    };

    let mut record = StatRecord::new(year, player);
    for column in Column::ALL {
        let value = row.cell(column).map(clean_value).unwrap_or_default();

        if let CellValue::Text(text) = &value {
            if column.kind().is_numeric() {
                match policy {
                    NumericPolicy::Strict => {
                        return Err(MapError::MalformedNumber {
                            column: column.name(),
                            value: text.clone(),
                            player: player.to_string(),
                        });
                    }
                    NumericPolicy::Lenient => {
                        warn!(
                            "keeping unparsed {} value {:?} for {} ({})",
                            column.name(),
                            text,
                            player,
                            year
                        );
                    }
                }
            }
        }

        record.set(column, value);
    }

    Ok(record)
}
