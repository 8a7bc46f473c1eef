//! Scalar values returned by [`Database::fetch`](crate::Database::fetch).

use chrono::NaiveDate;
use std::fmt;

/// One column of one fetched row.
///
/// Only the shapes the orchestrator reads are modelled: booleans, integers,
/// floats, text and dates. Backends reject anything else with
/// [`DbError::UnsupportedType`](crate::DbError::UnsupportedType).
#[derive(Debug, Clone, PartialEq)]
pub enum ScalarValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Date(NaiveDate),
}

/// Rows as ordered sequences of ordered column values.
pub type Rows = Vec<Vec<ScalarValue>>;

impl ScalarValue {
    /// `true` for SQL NULL
    pub fn is_null(&self) -> bool {
        matches!(self, ScalarValue::Null)
    }

    /// Boolean view
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ScalarValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Integer view
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ScalarValue::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Date view; accepts `YYYY-MM-DD` text since dates are often cast to
    /// varchar on the way out.
    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            ScalarValue::Date(d) => Some(*d),
            ScalarValue::Text(s) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok(),
            _ => None,
        }
    }
}

impl fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalarValue::Null => f.write_str("null"),
            ScalarValue::Bool(b) => write!(f, "{b}"),
            ScalarValue::Int(n) => write!(f, "{n}"),
            ScalarValue::Float(x) => write!(f, "{x}"),
            ScalarValue::Text(s) => f.write_str(s),
            ScalarValue::Date(d) => write!(f, "{d}"),
        }
    }
}

/// Return the single value of a one-row, one-column result.
///
/// Anything else (no rows, several rows, several columns) yields `None`.
pub fn single_value(rows: &Rows) -> Option<&ScalarValue> {
    match rows.as_slice() {
        [row] if row.len() == 1 => row.first(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_as_date_from_text_and_date() {
        let d = NaiveDate::from_ymd_opt(2023, 1, 15).unwrap();
        assert_eq!(ScalarValue::Date(d).as_date(), Some(d));
        assert_eq!(ScalarValue::Text("2023-01-15".into()).as_date(), Some(d));
        assert_eq!(ScalarValue::Text("not a date".into()).as_date(), None);
        assert_eq!(ScalarValue::Null.as_date(), None);
    }

    #[test]
    fn test_single_value_shapes() {
        let one: Rows = vec![vec![ScalarValue::Int(7)]];
        assert_eq!(single_value(&one), Some(&ScalarValue::Int(7)));

        let empty: Rows = vec![];
        assert_eq!(single_value(&empty), None);

        let wide: Rows = vec![vec![ScalarValue::Int(1), ScalarValue::Int(2)]];
        assert_eq!(single_value(&wide), None);

        let tall: Rows = vec![vec![ScalarValue::Int(1)], vec![ScalarValue::Int(2)]];
        assert_eq!(single_value(&tall), None);
    }

    #[test]
    fn test_typed_views() {
        assert_eq!(ScalarValue::Bool(true).as_bool(), Some(true));
        assert_eq!(ScalarValue::Int(100).as_i64(), Some(100));
        assert_eq!(ScalarValue::Text("100".into()).as_i64(), None);
        assert!(ScalarValue::Null.is_null());
    }
}
