//! Storage-agnostic repository contracts.
//!
//! One trait per entity. Implementations validate ids and enum inputs,
//! sanitize free text, stamp `created_at`/`updated_at` on writes, run a
//! parameterized query and translate "no rows" / "duplicate key" into
//! [`crate::StoreError::NotFound`] / [`crate::StoreError::Conflict`].

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::model::{
    AmountQuery, Budget, Category, CategoryTotal, CategoryType, Family, FamilyStatistics, Invite,
    Report, Transaction, TransactionFilter, User,
};
use crate::StoreResult;

#[async_trait]
pub trait FamilyRepository: Send + Sync {
    async fn create(&self, family: &mut Family) -> StoreResult<()>;
    async fn get_by_id(&self, id: Uuid) -> StoreResult<Family>;
    /// The earliest-created family, used when running with a single family.
    async fn get_primary(&self) -> StoreResult<Option<Family>>;
    async fn update(&self, family: &mut Family) -> StoreResult<()>;
    /// Removes the family and everything it owns.
    async fn delete(&self, id: Uuid) -> StoreResult<()>;
    async fn get_statistics(&self, id: Uuid) -> StoreResult<FamilyStatistics>;
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create(&self, user: &mut User) -> StoreResult<()>;
    /// Returns the user whether or not it is still active.
    async fn get_by_id(&self, id: Uuid) -> StoreResult<User>;
    /// Active users only. The email is normalized before lookup.
    async fn get_by_email(&self, email: &str) -> StoreResult<User>;
    async fn get_by_family(&self, family_id: Uuid) -> StoreResult<Vec<User>>;
    async fn update(&self, user: &mut User) -> StoreResult<()>;
    /// Soft delete: the row stays, `is_active` becomes false.
    async fn delete(&self, id: Uuid) -> StoreResult<()>;
    async fn update_last_login(&self, id: Uuid, at: DateTime<Utc>) -> StoreResult<()>;
}

#[async_trait]
pub trait InviteRepository: Send + Sync {
    async fn create(&self, invite: &mut Invite) -> StoreResult<()>;
    async fn get_by_id(&self, id: Uuid) -> StoreResult<Invite>;
    async fn get_by_token(&self, token: &str) -> StoreResult<Invite>;
    async fn get_by_family(&self, family_id: Uuid) -> StoreResult<Vec<Invite>>;
    async fn get_pending_by_email(&self, email: &str) -> StoreResult<Vec<Invite>>;
    /// `pending → accepted`. A terminal invite yields `Conflict`.
    async fn accept(&self, id: Uuid, user_id: Uuid, at: DateTime<Utc>) -> StoreResult<()>;
    /// `pending → revoked`. A terminal invite yields `Conflict`.
    async fn revoke(&self, id: Uuid, at: DateTime<Utc>) -> StoreResult<()>;
    /// `pending → expired` for every invite whose `expires_at` is before `now`.
    async fn mark_expired_bulk(&self, now: DateTime<Utc>) -> StoreResult<u64>;
    async fn delete(&self, id: Uuid) -> StoreResult<()>;
    /// Drops terminal invites last touched before `before`.
    async fn purge_terminal(&self, before: DateTime<Utc>) -> StoreResult<u64>;
}

#[async_trait]
pub trait CategoryRepository: Send + Sync {
    async fn create(&self, category: &mut Category) -> StoreResult<()>;
    async fn get_by_id(&self, id: Uuid) -> StoreResult<Category>;
    /// Active categories, optionally of one type, ordered by name.
    async fn get_by_family(
        &self,
        family_id: Uuid,
        category_type: Option<CategoryType>,
    ) -> StoreResult<Vec<Category>>;
    async fn update(&self, category: &mut Category) -> StoreResult<()>;
    /// Soft delete.
    async fn delete(&self, id: Uuid) -> StoreResult<()>;
}

#[async_trait]
pub trait TransactionRepository: Send + Sync {
    async fn create(&self, transaction: &mut Transaction) -> StoreResult<()>;
    async fn get_by_id(&self, id: Uuid) -> StoreResult<Transaction>;
    /// Newest first (`date`, then `created_at`).
    async fn list(&self, family_id: Uuid, filter: &TransactionFilter) -> StoreResult<Vec<Transaction>>;
    async fn update(&self, transaction: &mut Transaction) -> StoreResult<()>;
    async fn delete(&self, id: Uuid) -> StoreResult<()>;
    async fn sum(&self, family_id: Uuid, query: &AmountQuery) -> StoreResult<Decimal>;
    /// Per-category totals, largest first.
    async fn totals_by_category(
        &self,
        family_id: Uuid,
        query: &AmountQuery,
    ) -> StoreResult<Vec<CategoryTotal>>;
}

#[async_trait]
pub trait BudgetRepository: Send + Sync {
    async fn create(&self, budget: &mut Budget) -> StoreResult<()>;
    async fn get_by_id(&self, id: Uuid) -> StoreResult<Budget>;
    async fn get_by_family(&self, family_id: Uuid) -> StoreResult<Vec<Budget>>;
    /// Active budgets whose date range contains `on`.
    async fn get_active(&self, family_id: Uuid, on: NaiveDate) -> StoreResult<Vec<Budget>>;
    async fn update(&self, budget: &mut Budget) -> StoreResult<()>;
    async fn delete(&self, id: Uuid) -> StoreResult<()>;
}

#[async_trait]
pub trait ReportRepository: Send + Sync {
    async fn create(&self, report: &mut Report) -> StoreResult<()>;
    async fn get_by_id(&self, id: Uuid) -> StoreResult<Report>;
    /// Newest first.
    async fn get_by_family(&self, family_id: Uuid) -> StoreResult<Vec<Report>>;
    async fn delete(&self, id: Uuid) -> StoreResult<()>;
}

/// One handle per repository, all backed by the same store.
#[derive(Clone)]
pub struct Repositories {
    pub families: Arc<dyn FamilyRepository>,
    pub users: Arc<dyn UserRepository>,
    pub invites: Arc<dyn InviteRepository>,
    pub categories: Arc<dyn CategoryRepository>,
    pub transactions: Arc<dyn TransactionRepository>,
    pub budgets: Arc<dyn BudgetRepository>,
    pub reports: Arc<dyn ReportRepository>,
}
