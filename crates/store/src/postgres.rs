//! PostgreSQL store (sqlx).

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::postgres::{PgArguments, PgPool, PgPoolOptions, PgRow};
use sqlx::query::Query;
use sqlx::{Column, Postgres, Row, TypeInfo, ValueRef};

use famledger_api::db::{Built, Dialect};

use crate::deadline::{OP_TIMEOUT, within};
use crate::relational::{self, DbValue, ExecError, Param, Record, SqlExecutor};

#[derive(Clone)]
pub struct PgExecutor {
    pool: PgPool,
}

impl PgExecutor {
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections.max(1))
            .acquire_timeout(OP_TIMEOUT)
            .connect(url)
            .await
            .context("connecting to PostgreSQL")?;
        Ok(Self { pool })
    }
}

fn classify(e: sqlx::Error) -> ExecError {
    if let Some(db) = e.as_database_error() {
        if db.is_unique_violation() {
            return ExecError::Unique(db.message().to_string());
        }
        if db.is_foreign_key_violation() {
            return ExecError::ForeignKey(db.message().to_string());
        }
    }
    ExecError::Other(e.to_string())
}

fn timed_out(e: crate::deadline::TimedOut) -> ExecError {
    ExecError::Other(e.to_string())
}

fn bind<'q>(sql: &'q str, params: Vec<Param>) -> Query<'q, Postgres, PgArguments> {
    params.into_iter().fold(sqlx::query(sql), |q, p| match p {
        Param::Null => q.bind(None::<String>),
        Param::Int(i) => q.bind(i),
        Param::Float(f) => q.bind(f),
        Param::Text(s) => q.bind(s),
        Param::Bool(b) => q.bind(b),
    })
}

fn read(row: &PgRow, index: usize) -> Result<DbValue, ExecError> {
    let raw = row.try_get_raw(index).map_err(classify)?;
    if raw.is_null() {
        return Ok(DbValue::Null);
    }
    let type_name = raw.type_info().name().to_string();
    let value = match type_name.as_str() {
        "BOOL" => DbValue::Bool(row.try_get(index).map_err(classify)?),
        "INT2" => DbValue::Int(row.try_get::<i16, _>(index).map_err(classify)?.into()),
        "INT4" => DbValue::Int(row.try_get::<i32, _>(index).map_err(classify)?.into()),
        "INT8" => DbValue::Int(row.try_get(index).map_err(classify)?),
        "FLOAT4" => DbValue::Float(row.try_get::<f32, _>(index).map_err(classify)?.into()),
        "FLOAT8" => DbValue::Float(row.try_get(index).map_err(classify)?),
        "TEXT" | "VARCHAR" | "BPCHAR" | "NAME" => DbValue::Text(row.try_get(index).map_err(classify)?),
        other => {
            return Err(ExecError::Other(format!(
                "unsupported column type {other} at index {index}"
            )));
        }
    };
    Ok(value)
}

#[async_trait]
impl SqlExecutor for PgExecutor {
    fn dialect(&self) -> Dialect {
        Dialect::Postgres
    }

    async fn fetch_all(&self, (sql, values): Built) -> Result<Vec<Record>, ExecError> {
        let params = relational::params(&values)?;
        let rows = within(bind(&sql, params).fetch_all(&self.pool))
            .await
            .map_err(timed_out)?
            .map_err(classify)?;

        let Some(first) = rows.first() else {
            return Ok(Vec::new());
        };
        let columns: Arc<[String]> = first
            .columns()
            .iter()
            .map(|c| c.name().to_string())
            .collect();
        rows.iter()
            .map(|row| {
                let values = (0..columns.len())
                    .map(|i| read(row, i))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Record::new(columns.clone(), values))
            })
            .collect()
    }

    async fn execute(&self, (sql, values): Built) -> Result<u64, ExecError> {
        let params = relational::params(&values)?;
        let done = within(bind(&sql, params).execute(&self.pool))
            .await
            .map_err(timed_out)?
            .map_err(classify)?;
        Ok(done.rows_affected())
    }

    async fn execute_batch(&self, sql: &str) -> Result<(), ExecError> {
        within(sqlx::raw_sql(sql).execute(&self.pool))
            .await
            .map_err(timed_out)?
            .map_err(classify)?;
        Ok(())
    }
}
