//! Storage backends for famledger.
//!
//! [`connect`] turns the `[storage]` config section into a set of
//! [`Repositories`]. SQLite and PostgreSQL share one SQL implementation
//! (see [`relational`]); MongoDB has its own in [`mongo`].

pub mod deadline;
pub mod mongo;
pub mod postgres;
pub mod relational;
pub mod sqlite;

use std::sync::Arc;

use anyhow::{Result, bail};

use famledger_core::Repositories;
use famledger_runtime_config::{StorageBackend, StorageSettings};

use crate::mongo::MongoStore;
use crate::postgres::PgExecutor;
use crate::sqlite::SqliteExecutor;

/// Connected repositories plus the backend they run on.
#[derive(Clone)]
pub struct Store {
    pub repos: Repositories,
    pub backend: StorageBackend,
}

/// Connect to the configured backend, migrating first when
/// `auto_migrate` is set.
pub async fn connect(cfg: &StorageSettings) -> Result<Store> {
    let repos = match cfg.backend {
        StorageBackend::Sqlite => {
            let exec = Arc::new(SqliteExecutor::open(&cfg.sqlite_path)?);
            if cfg.auto_migrate {
                relational::migrate(&*exec).await?;
            }
            relational::repositories(exec)
        }
        StorageBackend::Postgres => {
            let exec = Arc::new(connect_postgres(cfg).await?);
            if cfg.auto_migrate {
                relational::migrate(&*exec).await?;
            }
            relational::repositories(exec)
        }
        StorageBackend::Mongo => {
            let store = MongoStore::connect(&cfg.mongo_uri, &cfg.mongo_database).await?;
            if cfg.auto_migrate {
                store.ensure_indexes().await?;
            }
            store.repositories()
        }
    };
    tracing::info!(backend = %cfg.backend, "Store ready");
    Ok(Store {
        repos,
        backend: cfg.backend,
    })
}

/// Apply schema migrations (or create indexes) and return.
pub async fn migrate(cfg: &StorageSettings) -> Result<()> {
    match cfg.backend {
        StorageBackend::Sqlite => relational::migrate(&SqliteExecutor::open(&cfg.sqlite_path)?).await,
        StorageBackend::Postgres => relational::migrate(&connect_postgres(cfg).await?).await,
        StorageBackend::Mongo => {
            MongoStore::connect(&cfg.mongo_uri, &cfg.mongo_database)
                .await?
                .ensure_indexes()
                .await
        }
    }
}

/// Fresh, migrated in-memory SQLite store.
pub async fn in_memory() -> Result<Store> {
    let exec = Arc::new(SqliteExecutor::open_in_memory()?);
    relational::migrate(&*exec).await?;
    Ok(Store {
        repos: relational::repositories(exec),
        backend: StorageBackend::Sqlite,
    })
}

async fn connect_postgres(cfg: &StorageSettings) -> Result<PgExecutor> {
    if cfg.postgres_url.trim().is_empty() {
        bail!("storage.postgres_url (or DATABASE_URL) must be set for the postgres backend");
    }
    PgExecutor::connect(&cfg.postgres_url, cfg.postgres_max_connections).await
}
