// StatRecord and the fixed source-header -> destination-column catalogue.

use crate::normalize::CellValue;

/// Storage class of a destination column. Drives SQL column types and the
/// malformed-number check in the row mapper.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Integer,
    Real,
    Text,
}

impl ColumnKind {
    pub fn sql_type(self) -> &'static str {
        match self {
            ColumnKind::Integer => "INTEGER",
            ColumnKind::Real => "REAL",
            ColumnKind::Text => "TEXT",
        }
    }

    pub fn is_numeric(self) -> bool {
        !matches!(self, ColumnKind::Text)
    }
}

/// Every mapped field of a per-game stat line except the key fields
/// (year, player).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    Age,
    Team,
    Position,
    GamesPlayed,
    GamesStarted,
    MinutesPerGame,
    FieldGoalsMade,
    FieldGoalsAttempted,
    FieldGoalPercentage,
    ThreePointersMade,
    ThreePointersAttempted,
    ThreePointPercentage,
    TwoPointersMade,
    TwoPointersAttempted,
    TwoPointPercentage,
    EffectiveFieldGoalPercentage,
    FreeThrowsMade,
    FreeThrowsAttempted,
    FreeThrowPercentage,
    OffensiveRebounds,
    DefensiveRebounds,
    TotalRebounds,
    Assists,
    Steals,
    Blocks,
    Turnovers,
    PersonalFouls,
    Points,
    Awards,
}

impl Column {
    pub const COUNT: usize = 29;

    /// Catalogue order. Also the order of the value slots in `StatRecord`
    /// and of the columns in every generated SQL statement.
    pub const ALL: [Column; Column::COUNT] = [
        Column::Age,
        Column::Team,
        Column::Position,
        Column::GamesPlayed,
        Column::GamesStarted,
        Column::MinutesPerGame,
        Column::FieldGoalsMade,
        Column::FieldGoalsAttempted,
        Column::FieldGoalPercentage,
        Column::ThreePointersMade,
        Column::ThreePointersAttempted,
        Column::ThreePointPercentage,
        Column::TwoPointersMade,
        Column::TwoPointersAttempted,
        Column::TwoPointPercentage,
        Column::EffectiveFieldGoalPercentage,
        Column::FreeThrowsMade,
        Column::FreeThrowsAttempted,
        Column::FreeThrowPercentage,
        Column::OffensiveRebounds,
        Column::DefensiveRebounds,
        Column::TotalRebounds,
        Column::Assists,
        Column::Steals,
        Column::Blocks,
        Column::Turnovers,
        Column::PersonalFouls,
        Column::Points,
        Column::Awards,
    ];

    /// Header name in the yearly CSV export.
    pub fn source(self) -> &'static str {
        match self {
            Column::Age => "Age",
            Column::Team => "Team",
            Column::Position => "Pos",
            Column::GamesPlayed => "G",
            Column::GamesStarted => "GS",
            Column::MinutesPerGame => "MP",
            Column::FieldGoalsMade => "FG",
            Column::FieldGoalsAttempted => "FGA",
            Column::FieldGoalPercentage => "FG%",
            Column::ThreePointersMade => "3P",
            Column::ThreePointersAttempted => "3PA",
            Column::ThreePointPercentage => "3P%",
            Column::TwoPointersMade => "2P",
            Column::TwoPointersAttempted => "2PA",
            Column::TwoPointPercentage => "2P%",
            Column::EffectiveFieldGoalPercentage => "eFG%",
            Column::FreeThrowsMade => "FT",
            Column::FreeThrowsAttempted => "FTA",
            Column::FreeThrowPercentage => "FT%",
            Column::OffensiveRebounds => "ORB",
            Column::DefensiveRebounds => "DRB",
            Column::TotalRebounds => "TRB",
            Column::Assists => "AST",
            Column::Steals => "STL",
            Column::Blocks => "BLK",
            Column::Turnovers => "TOV",
            Column::PersonalFouls => "PF",
            Column::Points => "PTS",
            Column::Awards => "Awards",
        }
    }

    /// Destination column name.
    pub fn name(self) -> &'static str {
        match self {
            Column::Age => "age",
            Column::Team => "team",
            Column::Position => "position",
            Column::GamesPlayed => "games_played",
            Column::GamesStarted => "games_started",
            Column::MinutesPerGame => "minutes_per_game",
            Column::FieldGoalsMade => "field_goals_made",
            Column::FieldGoalsAttempted => "field_goals_attempted",
            Column::FieldGoalPercentage => "field_goal_percentage",
            Column::ThreePointersMade => "three_pointers_made",
            Column::ThreePointersAttempted => "three_pointers_attempted",
            Column::ThreePointPercentage => "three_point_percentage",
            Column::TwoPointersMade => "two_pointers_made",
            Column::TwoPointersAttempted => "two_pointers_attempted",
            Column::TwoPointPercentage => "two_point_percentage",
            Column::EffectiveFieldGoalPercentage => "effective_field_goal_percentage",
            Column::FreeThrowsMade => "free_throws_made",
            Column::FreeThrowsAttempted => "free_throws_attempted",
            Column::FreeThrowPercentage => "free_throw_percentage",
            Column::OffensiveRebounds => "offensive_rebounds",
            Column::DefensiveRebounds => "defensive_rebounds",
            Column::TotalRebounds => "total_rebounds",
            Column::Assists => "assists",
            Column::Steals => "steals",
            Column::Blocks => "blocks",
            Column::Turnovers => "turnovers",
            Column::PersonalFouls => "personal_fouls",
            Column::Points => "points",
            Column::Awards => "awards",
        }
    }

    pub fn kind(self) -> ColumnKind {
        match self {
            Column::Team | Column::Position | Column::Awards => ColumnKind::Text,
            Column::Age | Column::GamesPlayed | Column::GamesStarted => ColumnKind::Integer,
            _ => ColumnKind::Real,
        }
    }

    pub(crate) fn index(self) -> usize {
        self as usize
    }
}

/// One player's per-game line for one season, as observed in one file row.
#[derive(Debug, Clone, PartialEq)]
pub struct StatRecord {
    pub year: i32,
    pub player: String,
    values: [CellValue; Column::COUNT],
}

impl StatRecord {
    /// A record with every mapped field null.
    pub fn new(year: i32, player: impl Into<String>) -> Self {
        Self {
            year,
            player: player.into(),
            values: std::array::from_fn(|_| CellValue::Null),
        }
    }

    pub fn get(&self, column: Column) -> &CellValue {
        &self.values[column.index()]
    }

    pub fn set(&mut self, column: Column, value: CellValue) {
        self.values[column.index()] = value;
    }

    /// Builder-style `set`, handy in tests and fixtures.
    pub fn with(mut self, column: Column, value: impl Into<CellValue>) -> Self {
        self.set(column, value.into());
        self
    }

    pub fn team(&self) -> &CellValue {
        self.get(Column::Team)
    }

    pub fn points(&self) -> Option<f64> {
        self.get(Column::Points).as_f64()
    }

    /// Values in `Column::ALL` order.
    pub fn values(&self) -> &[CellValue] {
        &self.values
    }
}

/// Comma-separated destination column names, optionally skipping some.
pub(crate) fn column_list(skip: &[Column]) -> String {
    Column::ALL
        .into_iter()
        .filter(|c| !skip.contains(c))
        .map(|c| c.name())
        .collect::<Vec<_>>()
        .join(", ")
}
