//! Driver-neutral row representation.

use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use famledger_core::{StoreError, StoreResult, clock, money};

/// A single column value as read back from SQLite or PostgreSQL.
#[derive(Debug, Clone, PartialEq)]
pub enum DbValue {
    Null,
    Int(i64),
    Float(f64),
    Text(String),
    Bool(bool),
}

/// One result row. Columns are shared by every row of a result set.
#[derive(Debug, Clone)]
pub struct Record {
    columns: Arc<[String]>,
    values: Vec<DbValue>,
}

fn decode(column: &str, detail: impl std::fmt::Display) -> StoreError {
    StoreError::Backend(format!("decoding column {column}: {detail}"))
}

impl Record {
    pub fn new(columns: Arc<[String]>, values: Vec<DbValue>) -> Self {
        Self { columns, values }
    }

    fn value(&self, column: &str) -> StoreResult<&DbValue> {
        self.columns
            .iter()
            .position(|c| c == column)
            .and_then(|i| self.values.get(i))
            .ok_or_else(|| decode(column, "no such column"))
    }

    pub fn opt_text(&self, column: &str) -> StoreResult<Option<String>> {
        match self.value(column)? {
            DbValue::Null => Ok(None),
            DbValue::Text(s) => Ok(Some(s.clone())),
            other => Err(decode(column, format!("expected text, got {other:?}"))),
        }
    }

    pub fn text(&self, column: &str) -> StoreResult<String> {
        self.opt_text(column)?
            .ok_or_else(|| decode(column, "unexpected NULL"))
    }

    pub fn int(&self, column: &str) -> StoreResult<i64> {
        match self.value(column)? {
            DbValue::Int(i) => Ok(*i),
            // SQLite hands back REAL for some aggregates.
            DbValue::Float(f) if f.fract() == 0.0 => Ok(*f as i64),
            other => Err(decode(column, format!("expected integer, got {other:?}"))),
        }
    }

    /// Non-negative counter.
    pub fn count(&self, column: &str) -> StoreResult<u64> {
        let n = self.int(column)?;
        u64::try_from(n).map_err(|_| decode(column, format!("negative count {n}")))
    }

    /// SQLite stores booleans as 0/1.
    pub fn boolean(&self, column: &str) -> StoreResult<bool> {
        match self.value(column)? {
            DbValue::Bool(b) => Ok(*b),
            DbValue::Int(i) => Ok(*i != 0),
            other => Err(decode(column, format!("expected boolean, got {other:?}"))),
        }
    }

    pub fn uuid(&self, column: &str) -> StoreResult<Uuid> {
        let s = self.text(column)?;
        Uuid::parse_str(&s).map_err(|e| decode(column, e))
    }

    pub fn opt_uuid(&self, column: &str) -> StoreResult<Option<Uuid>> {
        self.opt_text(column)?
            .map(|s| Uuid::parse_str(&s).map_err(|e| decode(column, e)))
            .transpose()
    }

    pub fn timestamp(&self, column: &str) -> StoreResult<DateTime<Utc>> {
        let s = self.text(column)?;
        clock::parse_timestamp(&s).map_err(|e| decode(column, e))
    }

    pub fn opt_timestamp(&self, column: &str) -> StoreResult<Option<DateTime<Utc>>> {
        self.opt_text(column)?
            .map(|s| clock::parse_timestamp(&s).map_err(|e| decode(column, e)))
            .transpose()
    }

    pub fn date(&self, column: &str) -> StoreResult<NaiveDate> {
        let s = self.text(column)?;
        clock::parse_date(&s).map_err(|e| decode(column, e))
    }

    /// Integer cents as a two-place decimal.
    pub fn cents(&self, column: &str) -> StoreResult<Decimal> {
        Ok(money::from_cents(self.int(column)?))
    }

    /// Text column holding one of the string enums.
    pub fn parse<T>(&self, column: &str) -> StoreResult<T>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        let s = self.text(column)?;
        s.parse().map_err(|e| decode(column, e))
    }

    /// Text column holding JSON.
    pub fn json<T: serde::de::DeserializeOwned>(&self, column: &str) -> StoreResult<T> {
        let s = self.text(column)?;
        serde_json::from_str(&s).map_err(|e| decode(column, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use famledger_core::Role;

    fn record(pairs: &[(&str, DbValue)]) -> Record {
        let columns: Arc<[String]> = pairs.iter().map(|(c, _)| c.to_string()).collect();
        Record::new(columns, pairs.iter().map(|(_, v)| v.clone()).collect())
    }

    #[test]
    fn typed_getters() {
        let id = Uuid::new_v4();
        let r = record(&[
            ("id", DbValue::Text(id.to_string())),
            ("is_active", DbValue::Int(1)),
            ("amount_cents", DbValue::Int(10050)),
            ("role", DbValue::Text("child".into())),
            ("last_login", DbValue::Null),
            ("date", DbValue::Text("2024-01-15".into())),
        ]);
        assert_eq!(r.uuid("id").unwrap(), id);
        assert!(r.boolean("is_active").unwrap());
        assert_eq!(r.cents("amount_cents").unwrap().to_string(), "100.50");
        assert_eq!(r.parse::<Role>("role").unwrap(), Role::Child);
        assert_eq!(r.opt_timestamp("last_login").unwrap(), None);
        assert_eq!(r.date("date").unwrap().to_string(), "2024-01-15");
    }

    #[test]
    fn decode_failures_are_backend_errors() {
        let r = record(&[("id", DbValue::Text("nope".into())), ("n", DbValue::Int(-1))]);
        assert!(matches!(r.uuid("id"), Err(StoreError::Backend(_))));
        assert!(matches!(r.count("n"), Err(StoreError::Backend(_))));
        assert!(matches!(r.text("missing"), Err(StoreError::Backend(_))));
    }
}
