//! Shared database schema, migrations, and query builders.
//!
//! Every builder takes a [`Dialect`] and returns the SQL text plus its bound
//! values, so the SQLite and PostgreSQL stores run the same statements.
//! Ids are stored as UUID text, timestamps as fixed-width RFC 3339 text,
//! dates as ISO text and amounts as integer cents.

pub mod budgets;
pub mod categories;
pub mod families;
pub mod invites;
pub mod migrations;
pub mod reports;
pub mod tables;
pub mod transactions;
pub mod users;

use chrono::{DateTime, NaiveDate, Utc};
use sea_query::{Expr, PostgresQueryBuilder, QueryBuilder, SimpleExpr, SqliteQueryBuilder};
use uuid::Uuid;

use famledger_core::clock;

// Re-export tables for convenience
pub use tables::*;

pub type Built = (String, sea_query::Values);

/// SQL flavour a statement is rendered for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Sqlite,
    Postgres,
}

impl Dialect {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sqlite => "sqlite",
            Self::Postgres => "postgres",
        }
    }

    pub(crate) fn builder(self) -> &'static dyn QueryBuilder {
        match self {
            Self::Sqlite => &SqliteQueryBuilder,
            Self::Postgres => &PostgresQueryBuilder,
        }
    }
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Value encoders ─────────────────────────────────────────────────────────

pub(crate) fn id(v: Uuid) -> sea_query::Value {
    v.to_string().into()
}

pub(crate) fn opt_id(v: Option<Uuid>) -> sea_query::Value {
    v.map(|u| u.to_string()).into()
}

pub(crate) fn ts(v: &DateTime<Utc>) -> sea_query::Value {
    clock::format_timestamp(v).into()
}

pub(crate) fn opt_ts(v: Option<&DateTime<Utc>>) -> sea_query::Value {
    v.map(clock::format_timestamp).into()
}

pub(crate) fn date(v: &NaiveDate) -> sea_query::Value {
    clock::format_date(v).into()
}

/// `CAST(COALESCE(SUM("amount_cents"), 0) AS BIGINT)`. The cast keeps the
/// result an integer on PostgreSQL, where `SUM(bigint)` is `numeric`.
pub(crate) fn sum_cents() -> SimpleExpr {
    Expr::cust("CAST(COALESCE(SUM(\"amount_cents\"), 0) AS BIGINT)")
}

/// `COUNT(*)`, always `BIGINT`.
pub(crate) fn count_all() -> SimpleExpr {
    Expr::cust("COUNT(*)")
}

#[cfg(test)]
mod tests {
    use super::*;
    use famledger_core::testing;

    #[test]
    fn placeholders_follow_dialect() {
        let family = testing::family();
        let (sqlite, values) = families::get_by_id(Dialect::Sqlite, family.id);
        assert!(sqlite.contains("\"id\" = ?"), "{sqlite}");
        assert_eq!(values.0.len(), 1);

        let (pg, _) = families::get_by_id(Dialect::Postgres, family.id);
        assert!(pg.contains("\"id\" = $1"), "{pg}");
    }

    #[test]
    fn insert_binds_every_column() {
        let family = testing::family();
        let (sql, values) = families::insert(Dialect::Postgres, &family);
        assert!(sql.starts_with("INSERT INTO \"families\""), "{sql}");
        assert_eq!(values.0.len(), 5);
    }
}
