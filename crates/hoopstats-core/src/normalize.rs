// Cell value normalization: infers null / integer / float / text from raw CSV cells.

use std::fmt;

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, Value, ValueRef};

/// Tokens treated as a missing value, in addition to the empty string.
/// Matches the set the stat exports were historically read with.
const MISSING_MARKERS: &[&str] = &[
    "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// A normalized cell. Numeric columns hold `Int`/`Float`/`Null`; `Text` in a
/// numeric column means the raw cell could not be parsed.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum CellValue {
    #[default]
    Null,
    Int(i64),
    Float(f64),
    Text(String),
}

impl CellValue {
    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    /// Integer view. Floats with no fractional part convert losslessly.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            CellValue::Int(i) => Some(*i),
            CellValue::Float(f) if f.fract() == 0.0 && f.is_finite() => Some(*f as i64),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Int(i) => Some(*i as f64),
            CellValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        if value.is_nan() {
            CellValue::Null
        } else {
            CellValue::Float(value)
        }
    }
}

impl From<i64> for CellValue {
    fn from(value: i64) -> Self {
        CellValue::Int(value)
    }
}

impl From<i32> for CellValue {
    fn from(value: i32) -> Self {
        CellValue::Int(i64::from(value))
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_string())
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Null => f.pad("-"),
            CellValue::Int(i) => write!(f, "{i}"),
            CellValue::Float(v) => write!(f, "{v}"),
            CellValue::Text(s) => f.pad(s),
        }
    }
}

impl ToSql for CellValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            CellValue::Null => ToSqlOutput::Owned(Value::Null),
            CellValue::Int(i) => ToSqlOutput::Owned(Value::Integer(*i)),
            CellValue::Float(f) => ToSqlOutput::Owned(Value::Real(*f)),
            CellValue::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
        })
    }
}

impl FromSql for CellValue {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value {
            ValueRef::Null => Ok(CellValue::Null),
            ValueRef::Integer(i) => Ok(CellValue::Int(i)),
            ValueRef::Real(f) => Ok(CellValue::Float(f)),
            ValueRef::Text(bytes) => Ok(CellValue::Text(String::from_utf8_lossy(bytes).into_owned())),
            ValueRef::Blob(_) => Err(FromSqlError::InvalidType),
        }
    }
}

/// Normalize one raw cell.
///
/// - empty or a missing marker: `Null`
/// - contains `.` anywhere (including `.487`-style percentages): `Float`
/// - whole number: `Int`
/// - anything else, or a value that fails to parse: the trimmed text
///
/// Never fails. The decimal separator is always `.`.
pub fn clean_value(raw: &str) -> CellValue {
    let value = raw.trim();
    if value.is_empty() || MISSING_MARKERS.contains(&value) {
        return CellValue::Null;
    }

    if value.contains('.') {
        return match value.parse::<f64>() {
            Ok(f) if f.is_finite() => CellValue::Float(f),
            _ => CellValue::Text(value.to_string()),
        };
    }

    match value.parse::<i64>() {
        Ok(i) => CellValue::Int(i),
        Err(_) => CellValue::Text(value.to_string()),
    }
}
