//! MongoDB store.
//!
//! One collection per entity. Uniqueness comes from indexes created by
//! [`MongoStore::ensure_indexes`]; there are no foreign keys, so deleting a
//! family removes its documents collection by collection.

mod docs;
mod repos;

use std::sync::Arc;

use anyhow::{Context, Result};
use mongodb::bson::{Document, doc};
use mongodb::error::{ErrorKind, WriteFailure};
use mongodb::options::IndexOptions;
use mongodb::{Client, Collection, Database, IndexModel};

use famledger_core::{Repositories, StoreError, StoreResult};

use crate::deadline::within;

use docs::{BudgetDoc, CategoryDoc, FamilyDoc, InviteDoc, ReportDoc, TransactionDoc, UserDoc};

const DUPLICATE_KEY: i32 = 11000;

pub(crate) struct Collections {
    families: Collection<FamilyDoc>,
    users: Collection<UserDoc>,
    invites: Collection<InviteDoc>,
    categories: Collection<CategoryDoc>,
    transactions: Collection<TransactionDoc>,
    budgets: Collection<BudgetDoc>,
    reports: Collection<ReportDoc>,
}

impl Collections {
    fn new(db: &Database) -> Self {
        Self {
            families: db.collection("families"),
            users: db.collection("users"),
            invites: db.collection("invites"),
            categories: db.collection("categories"),
            transactions: db.collection("transactions"),
            budgets: db.collection("budgets"),
            reports: db.collection("reports"),
        }
    }
}

#[derive(Clone)]
pub struct MongoStore {
    db: Database,
    collections: Arc<Collections>,
}

impl MongoStore {
    pub async fn connect(uri: &str, database: &str) -> Result<Self> {
        let client = within(Client::with_uri_str(uri))
            .await
            .context("connecting to MongoDB")?
            .context("connecting to MongoDB")?;
        let db = client.database(database);
        within(db.run_command(doc! { "ping": 1 }))
            .await
            .context("pinging MongoDB")?
            .context("pinging MongoDB")?;
        Ok(Self {
            collections: Arc::new(Collections::new(&db)),
            db,
        })
    }

    pub fn repositories(&self) -> Repositories {
        repos::repositories(self.collections.clone())
    }

    /// Create the indexes every query and uniqueness rule depends on.
    pub async fn ensure_indexes(&self) -> Result<()> {
        let c = &self.collections;
        create_indexes(
            &c.users,
            vec![
                unique_where(doc! { "email": 1 }, doc! { "is_active": true }),
                plain(doc! { "family_id": 1, "created_at": 1 }),
            ],
        )
        .await?;
        create_indexes(
            &c.invites,
            vec![
                unique(doc! { "token": 1 }),
                plain(doc! { "family_id": 1, "created_at": -1 }),
                plain(doc! { "email": 1, "status": 1 }),
                plain(doc! { "status": 1, "expires_at": 1 }),
            ],
        )
        .await?;
        create_indexes(
            &c.categories,
            vec![
                unique_where(
                    doc! { "family_id": 1, "category_type": 1, "name": 1 },
                    doc! { "is_active": true },
                ),
            ],
        )
        .await?;
        create_indexes(
            &c.transactions,
            vec![
                plain(doc! { "family_id": 1, "date": -1, "created_at": -1 }),
                plain(doc! { "family_id": 1, "category_id": 1 }),
                plain(doc! { "family_id": 1, "user_id": 1 }),
            ],
        )
        .await?;
        create_indexes(
            &c.budgets,
            vec![plain(doc! { "family_id": 1, "start_date": -1 })],
        )
        .await?;
        create_indexes(
            &c.reports,
            vec![plain(doc! { "family_id": 1, "generated_at": -1 })],
        )
        .await?;
        create_indexes(&c.families, vec![plain(doc! { "created_at": 1 })]).await?;
        tracing::info!("MongoDB indexes ensured on {}", self.db.name());
        Ok(())
    }
}

fn plain(keys: Document) -> IndexModel {
    IndexModel::builder().keys(keys).build()
}

fn unique(keys: Document) -> IndexModel {
    let options = IndexOptions::builder().unique(true).build();
    IndexModel::builder().keys(keys).options(options).build()
}

fn unique_where(keys: Document, filter: Document) -> IndexModel {
    let options = IndexOptions::builder()
        .unique(true)
        .partial_filter_expression(filter)
        .build();
    IndexModel::builder().keys(keys).options(options).build()
}

async fn create_indexes<T: Send + Sync>(coll: &Collection<T>, models: Vec<IndexModel>) -> Result<()> {
    within(coll.create_indexes(models))
        .await
        .with_context(|| format!("indexing {}", coll.name()))?
        .with_context(|| format!("indexing {}", coll.name()))?;
    Ok(())
}

// ── Error mapping ──────────────────────────────────────────────────────────

pub(crate) fn is_duplicate_key(e: &mongodb::error::Error) -> bool {
    match e.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(we)) => we.code == DUPLICATE_KEY,
        ErrorKind::Command(ce) => ce.code == DUPLICATE_KEY,
        _ => false,
    }
}

pub(crate) fn backend(context: &'static str) -> impl FnOnce(mongodb::error::Error) -> StoreError {
    StoreError::backend(context)
}

/// Await a driver call under the store deadline.
pub(crate) async fn run<F, T>(context: &'static str, fut: F) -> StoreResult<T>
where
    F: std::future::IntoFuture<Output = mongodb::error::Result<T>>,
{
    within(fut).await?.map_err(backend(context))
}

/// Like [`run`], but a duplicate key becomes `Conflict(conflict)`.
pub(crate) async fn run_write<F, T>(context: &'static str, conflict: &str, fut: F) -> StoreResult<T>
where
    F: std::future::IntoFuture<Output = mongodb::error::Result<T>>,
{
    match within(fut).await? {
        Ok(v) => Ok(v),
        Err(e) if is_duplicate_key(&e) => Err(StoreError::conflict(conflict)),
        Err(e) => Err(backend(context)(e)),
    }
}
