//! SQLite store (rusqlite).

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use anyhow::{Context, Result};
use async_trait::async_trait;
use rusqlite::types::{Value, ValueRef};
use rusqlite::{Connection, ErrorCode, ffi, params_from_iter};

use famledger_api::db::{Built, Dialect};

use crate::relational::{self, DbValue, ExecError, Param, Record, SqlExecutor};

/// One shared connection, serialized behind a mutex.
#[derive(Clone)]
pub struct SqliteExecutor {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteExecutor {
    /// Open (creating if needed) the database file and its parent directory.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        let conn = Connection::open(path).context("opening SQLite database")?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("opening in-memory SQLite database")?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        conn.busy_timeout(std::time::Duration::from_secs(5))?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn classify(e: rusqlite::Error) -> ExecError {
    if let rusqlite::Error::SqliteFailure(err, msg) = &e {
        if err.code == ErrorCode::ConstraintViolation {
            let detail = msg.clone().unwrap_or_else(|| e.to_string());
            return match err.extended_code {
                ffi::SQLITE_CONSTRAINT_UNIQUE | ffi::SQLITE_CONSTRAINT_PRIMARYKEY => {
                    ExecError::Unique(detail)
                }
                ffi::SQLITE_CONSTRAINT_FOREIGNKEY => ExecError::ForeignKey(detail),
                _ => ExecError::Other(detail),
            };
        }
    }
    ExecError::Other(e.to_string())
}

fn bind(values: &sea_query::Values) -> Result<Vec<Value>, ExecError> {
    Ok(relational::params(values)?
        .into_iter()
        .map(|p| match p {
            Param::Null => Value::Null,
            Param::Int(i) => Value::Integer(i),
            Param::Float(f) => Value::Real(f),
            Param::Text(s) => Value::Text(s),
            Param::Bool(b) => Value::Integer(i64::from(b)),
        })
        .collect())
}

fn read(value: ValueRef<'_>) -> DbValue {
    match value {
        ValueRef::Null => DbValue::Null,
        ValueRef::Integer(i) => DbValue::Int(i),
        ValueRef::Real(f) => DbValue::Float(f),
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
            DbValue::Text(String::from_utf8_lossy(bytes).into_owned())
        }
    }
}

#[async_trait]
impl SqlExecutor for SqliteExecutor {
    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    async fn fetch_all(&self, (sql, values): Built) -> Result<Vec<Record>, ExecError> {
        let params = bind(&values)?;
        let conn = self.conn();
        let mut stmt = conn.prepare_cached(&sql).map_err(classify)?;
        let columns: Arc<[String]> = stmt.column_names().into_iter().map(String::from).collect();
        let mut rows = stmt.query(params_from_iter(params.iter())).map_err(classify)?;

        let mut out = Vec::new();
        while let Some(row) = rows.next().map_err(classify)? {
            let values = (0..columns.len())
                .map(|i| row.get_ref(i).map(read).map_err(classify))
                .collect::<Result<Vec<_>, _>>()?;
            out.push(Record::new(columns.clone(), values));
        }
        Ok(out)
    }

    async fn execute(&self, (sql, values): Built) -> Result<u64, ExecError> {
        let params = bind(&values)?;
        let conn = self.conn();
        let changed = conn
            .execute(&sql, params_from_iter(params.iter()))
            .map_err(classify)?;
        Ok(changed as u64)
    }

    async fn execute_batch(&self, sql: &str) -> Result<(), ExecError> {
        self.conn().execute_batch(sql).map_err(classify)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use famledger_api::db::families;
    use famledger_core::testing;

    #[tokio::test]
    async fn migrations_are_idempotent() {
        let exec = SqliteExecutor::open_in_memory().unwrap();
        relational::migrate(&exec).await.unwrap();
        relational::migrate(&exec).await.unwrap();

        let rows = exec
            .fetch_all(famledger_api::db::migrations::applied_names(Dialect::Sqlite))
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].text("name").unwrap(), "0001_schema");
    }

    #[tokio::test]
    async fn duplicate_primary_key_is_unique_violation() {
        let exec = SqliteExecutor::open_in_memory().unwrap();
        relational::migrate(&exec).await.unwrap();

        let family = testing::family();
        exec.execute(families::insert(Dialect::Sqlite, &family)).await.unwrap();
        let err = exec
            .execute(families::insert(Dialect::Sqlite, &family))
            .await
            .unwrap_err();
        assert!(matches!(err, ExecError::Unique(_)), "{err:?}");
    }

    #[tokio::test]
    async fn open_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("famledger.db");
        let exec = SqliteExecutor::open(&path).unwrap();
        relational::migrate(&exec).await.unwrap();
        assert!(path.exists());
    }
}
