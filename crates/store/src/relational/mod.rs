//! Shared SQL backend.
//!
//! The SQLite and PostgreSQL stores differ only in how they bind parameters,
//! read rows and classify driver errors. That is the [`SqlExecutor`] seam;
//! statements come from `famledger_api::db` and every repository lives once
//! in [`repos`].

mod record;
mod repos;

pub use record::{DbValue, Record};
pub use repos::repositories;

use async_trait::async_trait;
use famledger_api::db::{self, Built, Dialect};
use famledger_core::StoreError;

/// Driver error, classified just enough for the repositories.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecError {
    Unique(String),
    ForeignKey(String),
    Other(String),
}

impl std::fmt::Display for ExecError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unique(m) => write!(f, "unique violation: {m}"),
            Self::ForeignKey(m) => write!(f, "foreign key violation: {m}"),
            Self::Other(m) => f.write_str(m),
        }
    }
}

impl std::error::Error for ExecError {}

impl From<ExecError> for StoreError {
    fn from(e: ExecError) -> Self {
        StoreError::Backend(e.to_string())
    }
}

/// Runs rendered statements against one database.
#[async_trait]
pub trait SqlExecutor: Send + Sync + 'static {
    fn dialect(&self) -> Dialect;
    async fn fetch_all(&self, stmt: Built) -> Result<Vec<Record>, ExecError>;
    /// Returns the number of affected rows.
    async fn execute(&self, stmt: Built) -> Result<u64, ExecError>;
    /// Runs a multi-statement script without parameters.
    async fn execute_batch(&self, sql: &str) -> Result<(), ExecError>;
}

/// A bind parameter after flattening `sea_query::Value`.
#[derive(Debug, Clone, PartialEq)]
pub enum Param {
    Null,
    Int(i64),
    Float(f64),
    Text(String),
    Bool(bool),
}

/// Convert bound values for a driver. Only the shapes the builders in
/// `famledger_api::db` produce are supported.
pub fn params(values: &sea_query::Values) -> Result<Vec<Param>, ExecError> {
    use sea_query::Value;

    values
        .0
        .iter()
        .map(|v| {
            Ok(match v {
                Value::Bool(b) => b.map_or(Param::Null, Param::Bool),
                Value::TinyInt(i) => i.map_or(Param::Null, |i| Param::Int(i.into())),
                Value::SmallInt(i) => i.map_or(Param::Null, |i| Param::Int(i.into())),
                Value::Int(i) => i.map_or(Param::Null, |i| Param::Int(i.into())),
                Value::BigInt(i) => i.map_or(Param::Null, Param::Int),
                Value::TinyUnsigned(i) => i.map_or(Param::Null, |i| Param::Int(i.into())),
                Value::SmallUnsigned(i) => i.map_or(Param::Null, |i| Param::Int(i.into())),
                Value::Unsigned(i) => i.map_or(Param::Null, |i| Param::Int(i.into())),
                Value::BigUnsigned(i) => match i {
                    None => Param::Null,
                    Some(u) => Param::Int(i64::try_from(*u).map_err(|_| {
                        ExecError::Other(format!("parameter {u} out of range"))
                    })?),
                },
                Value::Float(f) => f.map_or(Param::Null, |f| Param::Float(f.into())),
                Value::Double(f) => f.map_or(Param::Null, Param::Float),
                Value::String(s) => s
                    .as_ref()
                    .map_or(Param::Null, |s| Param::Text(s.as_str().to_string())),
                Value::Char(c) => c.map_or(Param::Null, |c| Param::Text(c.to_string())),
                other => {
                    return Err(ExecError::Other(format!(
                        "unsupported parameter type: {other:?}"
                    )));
                }
            })
        })
        .collect()
}

/// Apply pending migrations, recording each one in `_migrations`.
pub async fn migrate<E: SqlExecutor + ?Sized>(exec: &E) -> anyhow::Result<()> {
    let d = exec.dialect();
    exec.execute_batch(db::migrations::bootstrap_sql(d)).await?;

    let applied = exec
        .fetch_all(db::migrations::applied_names(d))
        .await?
        .iter()
        .map(|r| r.text("name"))
        .collect::<Result<Vec<_>, _>>()?;

    for (name, sql) in db::migrations::pending(db::migrations::for_dialect(d), &applied) {
        exec.execute_batch(sql)
            .await
            .map_err(|e| anyhow::anyhow!("running migration {name}: {e}"))?;
        exec.execute(db::migrations::record(d, name)).await?;
        tracing::info!("Applied migration: {name} ({d})");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_query::{Value, Values};

    #[test]
    fn params_flatten_values() {
        let values = Values(vec![
            Value::String(Some(Box::new("x".into()))),
            Value::BigInt(Some(1001)),
            Value::BigUnsigned(Some(50)),
            Value::Bool(Some(true)),
            Value::String(None),
        ]);
        assert_eq!(
            params(&values).unwrap(),
            vec![
                Param::Text("x".into()),
                Param::Int(1001),
                Param::Int(50),
                Param::Bool(true),
                Param::Null,
            ]
        );
    }

    #[test]
    fn oversized_unsigned_is_rejected() {
        let values = Values(vec![Value::BigUnsigned(Some(u64::MAX))]);
        assert!(params(&values).is_err());
    }
}
