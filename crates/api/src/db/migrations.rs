//! Canonical migration definitions for the relational stores.
//!
//! `SQLITE_MIGRATIONS` and `POSTGRES_MIGRATIONS` describe the same schema in
//! each dialect. Applied names are tracked in `_migrations`.

use sea_query::{Alias, Order, Query};

use super::{Built, Dialect};

/// A named migration: `(name, sql)`.
pub type Migration = (&'static str, &'static str);

pub const SQLITE_MIGRATIONS: &[Migration] = &[(
    "0001_schema",
    include_str!("../../migrations/sqlite/0001_schema.sql"),
)];

pub const POSTGRES_MIGRATIONS: &[Migration] = &[(
    "0001_schema",
    include_str!("../../migrations/postgres/0001_schema.sql"),
)];

pub fn for_dialect(d: Dialect) -> &'static [Migration] {
    match d {
        Dialect::Sqlite => SQLITE_MIGRATIONS,
        Dialect::Postgres => POSTGRES_MIGRATIONS,
    }
}

/// DDL for the bookkeeping table itself.
pub fn bootstrap_sql(d: Dialect) -> &'static str {
    match d {
        Dialect::Sqlite => {
            "CREATE TABLE IF NOT EXISTS _migrations (\
             id INTEGER PRIMARY KEY AUTOINCREMENT, \
             name TEXT NOT NULL UNIQUE, \
             applied_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')))"
        }
        Dialect::Postgres => {
            "CREATE TABLE IF NOT EXISTS _migrations (\
             id BIGSERIAL PRIMARY KEY, \
             name TEXT NOT NULL UNIQUE, \
             applied_at TIMESTAMPTZ NOT NULL DEFAULT now())"
        }
    }
}

pub fn applied_names(d: Dialect) -> Built {
    Query::select()
        .column(Alias::new("name"))
        .from(Alias::new("_migrations"))
        .order_by(Alias::new("id"), Order::Asc)
        .build_any(d.builder())
}

pub fn record(d: Dialect, name: &str) -> Built {
    Query::insert()
        .into_table(Alias::new("_migrations"))
        .columns([Alias::new("name")])
        .values_panic([name.into()])
        .build_any(d.builder())
}

/// Entries of `migrations` not yet in `applied`, in declaration order.
pub fn pending<'a>(migrations: &'a [Migration], applied: &[String]) -> Vec<&'a Migration> {
    migrations
        .iter()
        .filter(|(name, _)| !applied.iter().any(|a| a == name))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dialects_share_migration_names() {
        let sqlite: Vec<_> = SQLITE_MIGRATIONS.iter().map(|(n, _)| *n).collect();
        let postgres: Vec<_> = POSTGRES_MIGRATIONS.iter().map(|(n, _)| *n).collect();
        assert_eq!(sqlite, postgres);
    }

    #[test]
    fn pending_skips_applied() {
        let applied = vec!["0001_schema".to_string()];
        assert!(pending(SQLITE_MIGRATIONS, &applied).is_empty());
        assert_eq!(pending(POSTGRES_MIGRATIONS, &[]).len(), POSTGRES_MIGRATIONS.len());
    }

    #[test]
    fn schemas_define_every_table() {
        for (_, sql) in SQLITE_MIGRATIONS.iter().chain(POSTGRES_MIGRATIONS) {
            for table in [
                "families",
                "users",
                "invites",
                "categories",
                "transactions",
                "budgets",
                "reports",
            ] {
                assert!(
                    sql.contains(&format!("CREATE TABLE IF NOT EXISTS {table} (")),
                    "missing {table}"
                );
            }
        }
    }
}
