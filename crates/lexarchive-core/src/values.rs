//! Permissive typed casting of raw TAP cells.
//!
//! The archive serves every cell as text. Before insertion each cell is
//! cast through a fixed ladder of parse attempts:
//!
//! 1. empty string → `Null`
//! 2. plain decimal literal (digits with one `.`) → `Real`
//! 3. parses as i64 → `Int`
//! 4. anything else → `Text`
//!
//! The real branch deliberately accepts only dotted digit runs, so
//! scientific-notation strings like `"1.5e3"` fall through both numeric
//! branches and stay text, queryable exactly as the archive served them.

use rusqlite::types::{ToSqlOutput, Value};
use rusqlite::ToSql;

/// A cell value after the permissive cast.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Null,
    Int(i64),
    Real(f64),
    Text(String),
}

/// A plain decimal literal: optional sign, digits, exactly one dot,
/// at least one digit overall. Rejects exponents and anything else f64
/// would otherwise accept ("inf", "1.5e3", "nan").
fn parse_plain_decimal(raw: &str) -> Option<f64> {
    let body = raw.strip_prefix(['+', '-']).unwrap_or(raw);
    let mut dots = 0usize;
    let mut digits = 0usize;
    for c in body.chars() {
        match c {
            '.' => dots += 1,
            '0'..='9' => digits += 1,
            _ => return None,
        }
    }
    if dots != 1 || digits == 0 {
        return None;
    }
    raw.parse::<f64>().ok()
}

impl CellValue {
    /// Cast a raw text cell through the parse ladder.
    pub fn parse(raw: &str) -> Self {
        if raw.is_empty() {
            return CellValue::Null;
        }
        if raw.contains('.') {
            if let Some(f) = parse_plain_decimal(raw) {
                return CellValue::Real(f);
            }
        }
        if let Ok(i) = raw.parse::<i64>() {
            return CellValue::Int(i);
        }
        CellValue::Text(raw.to_string())
    }
}

impl ToSql for CellValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            CellValue::Null => ToSqlOutput::Owned(Value::Null),
            CellValue::Int(i) => ToSqlOutput::Owned(Value::Integer(*i)),
            CellValue::Real(f) => ToSqlOutput::Owned(Value::Real(*f)),
            CellValue::Text(s) => ToSqlOutput::Owned(Value::Text(s.clone())),
        })
    }
}
