//! Repository implementations over MongoDB collections.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use futures::TryStreamExt;
use mongodb::bson::{Bson, Document, doc};
use rust_decimal::Decimal;
use uuid::Uuid;

use famledger_core::validate::{validate_email, validate_id};
use famledger_core::{
    AmountQuery, Budget, BudgetRepository, Category, CategoryRepository, CategoryTotal,
    CategoryType, Family, FamilyRepository, FamilyStatistics, Invite, InviteRepository,
    InviteStatus, Report, ReportRepository, Repositories, StoreError, StoreResult, Transaction,
    TransactionFilter, TransactionRepository, TransactionType, User, UserRepository,
    ValidationError, clock, money,
};

use super::docs::{
    BudgetDoc, CategoryDoc, FamilyDoc, InviteDoc, ReportDoc, TransactionDoc, UserDoc, day, ts,
};
use super::{Collections, run, run_write};

pub(crate) fn repositories(c: Arc<Collections>) -> Repositories {
    Repositories {
        families: Arc::new(MongoFamilies(c.clone())),
        users: Arc::new(MongoUsers(c.clone())),
        invites: Arc::new(MongoInvites(c.clone())),
        categories: Arc::new(MongoCategories(c.clone())),
        transactions: Arc::new(MongoTransactions(c.clone())),
        budgets: Arc::new(MongoBudgets(c.clone())),
        reports: Arc::new(MongoReports(c)),
    }
}

fn by_id(id: Uuid) -> Document {
    doc! { "_id": id.to_string() }
}

fn of_family(family_id: Uuid) -> Document {
    doc! { "family_id": family_id.to_string() }
}

/// Integer aggregate output; `$sum` yields Int32, Int64 or Double.
fn read_i64(doc: &Document, key: &str) -> StoreResult<i64> {
    match doc.get(key) {
        None | Some(Bson::Null) => Ok(0),
        Some(Bson::Int32(v)) => Ok(i64::from(*v)),
        Some(Bson::Int64(v)) => Ok(*v),
        Some(Bson::Double(v)) if v.fract() == 0.0 => Ok(*v as i64),
        Some(other) => Err(StoreError::Backend(format!(
            "unexpected {key} in aggregate: {other}"
        ))),
    }
}

/// `{ "$gte": lo, "$lte": hi }` with absent bounds left out.
fn range<T: Into<Bson>>(lo: Option<T>, hi: Option<T>) -> Option<Document> {
    let mut r = Document::new();
    if let Some(lo) = lo {
        r.insert("$gte", lo);
    }
    if let Some(hi) = hi {
        r.insert("$lte", hi);
    }
    (!r.is_empty()).then_some(r)
}

fn amount_filter(family_id: Uuid, q: &AmountQuery) -> Document {
    let mut filter = of_family(family_id);
    filter.insert("transaction_type", q.transaction_type.as_str());
    if let Some(category_id) = q.category_id {
        filter.insert("category_id", category_id.to_string());
    }
    if let Some(dates) = range(
        q.start_date.as_ref().map(day),
        q.end_date.as_ref().map(day),
    ) {
        filter.insert("date", dates);
    }
    filter
}

// ── Families ───────────────────────────────────────────────────────────────

struct MongoFamilies(Arc<Collections>);

impl MongoFamilies {
    async fn sum(&self, family_id: Uuid, t: TransactionType) -> StoreResult<Decimal> {
        sum_amount(&self.0, amount_filter(family_id, &AmountQuery::of(t))).await
    }
}

async fn sum_amount(c: &Collections, filter: Document) -> StoreResult<Decimal> {
    let pipeline = vec![
        doc! { "$match": filter },
        doc! { "$group": { "_id": Bson::Null, "total": { "$sum": "$amount_cents" } } },
    ];
    let cursor = run("summing transactions", c.transactions.aggregate(pipeline)).await?;
    let rows: Vec<Document> = run("summing transactions", cursor.try_collect()).await?;
    let cents = match rows.first() {
        Some(row) => read_i64(row, "total")?,
        None => 0,
    };
    Ok(money::from_cents(cents))
}

#[async_trait]
impl FamilyRepository for MongoFamilies {
    async fn create(&self, family: &mut Family) -> StoreResult<()> {
        family.sanitize()?;
        let now = clock::now();
        family.created_at = now;
        family.updated_at = now;
        let doc = FamilyDoc::from_entity(family);
        run_write("inserting family", "family already exists", self.0.families.insert_one(doc))
            .await?;
        Ok(())
    }

    async fn get_by_id(&self, id: Uuid) -> StoreResult<Family> {
        validate_id("family id", id)?;
        run("loading family", self.0.families.find_one(by_id(id)))
            .await?
            .ok_or(StoreError::NotFound("family"))?
            .into_entity()
    }

    async fn get_primary(&self) -> StoreResult<Option<Family>> {
        let find = self
            .0
            .families
            .find(doc! {})
            .sort(doc! { "created_at": 1, "_id": 1 })
            .limit(1);
        let cursor = run("loading primary family", find).await?;
        let docs: Vec<FamilyDoc> = run("loading primary family", cursor.try_collect()).await?;
        docs.into_iter().next().map(FamilyDoc::into_entity).transpose()
    }

    async fn update(&self, family: &mut Family) -> StoreResult<()> {
        family.sanitize()?;
        family.updated_at = clock::now();
        let update = doc! { "$set": {
            "name": &family.name,
            "currency": &family.currency,
            "updated_at": ts(&family.updated_at),
        } };
        let result = run("updating family", self.0.families.update_one(by_id(family.id), update))
            .await?;
        if result.matched_count == 0 {
            return Err(StoreError::NotFound("family"));
        }
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> StoreResult<()> {
        validate_id("family id", id)?;
        let c = &self.0;
        if run("finding family", c.families.count_documents(by_id(id))).await? == 0 {
            return Err(StoreError::NotFound("family"));
        }
        // Children first: the family document stays until they are gone, so
        // an interrupted delete can be retried.
        let owned = of_family(id);
        run("deleting reports", c.reports.delete_many(owned.clone())).await?;
        run("deleting budgets", c.budgets.delete_many(owned.clone())).await?;
        run("deleting transactions", c.transactions.delete_many(owned.clone())).await?;
        run("deleting categories", c.categories.delete_many(owned.clone())).await?;
        run("deleting invites", c.invites.delete_many(owned.clone())).await?;
        run("deleting users", c.users.delete_many(owned)).await?;
        let result = run("deleting family", c.families.delete_one(by_id(id))).await?;
        if result.deleted_count == 0 {
            return Err(StoreError::NotFound("family"));
        }
        tracing::debug!(family_id = %id, "family documents removed");
        Ok(())
    }

    async fn get_statistics(&self, id: Uuid) -> StoreResult<FamilyStatistics> {
        self.get_by_id(id).await?;
        let c = &self.0;
        let mut active = of_family(id);
        active.insert("is_active", true);

        let user_count = run("counting users", c.users.count_documents(active.clone())).await?;
        let category_count = run("counting categories", c.categories.count_documents(active)).await?;
        let transaction_count =
            run("counting transactions", c.transactions.count_documents(of_family(id))).await?;
        let budget_count = run("counting budgets", c.budgets.count_documents(of_family(id))).await?;
        let total_income = self.sum(id, TransactionType::Income).await?;
        let total_expenses = self.sum(id, TransactionType::Expense).await?;

        Ok(FamilyStatistics {
            user_count,
            category_count,
            transaction_count,
            budget_count,
            total_income,
            total_expenses,
            balance: total_income - total_expenses,
        })
    }
}

// ── Users ──────────────────────────────────────────────────────────────────

struct MongoUsers(Arc<Collections>);

#[async_trait]
impl UserRepository for MongoUsers {
    async fn create(&self, user: &mut User) -> StoreResult<()> {
        user.sanitize()?;
        let now = clock::now();
        user.created_at = now;
        user.updated_at = now;
        let doc = UserDoc::from_entity(user);
        run_write("inserting user", "email already in use", self.0.users.insert_one(doc)).await?;
        Ok(())
    }

    async fn get_by_id(&self, id: Uuid) -> StoreResult<User> {
        validate_id("user id", id)?;
        run("loading user", self.0.users.find_one(by_id(id)))
            .await?
            .ok_or(StoreError::NotFound("user"))?
            .into_entity()
    }

    async fn get_by_email(&self, email: &str) -> StoreResult<User> {
        let email = validate_email(email)?;
        let filter = doc! { "email": email, "is_active": true };
        run("loading user", self.0.users.find_one(filter))
            .await?
            .ok_or(StoreError::NotFound("user"))?
            .into_entity()
    }

    async fn get_by_family(&self, family_id: Uuid) -> StoreResult<Vec<User>> {
        validate_id("family id", family_id)?;
        let mut filter = of_family(family_id);
        filter.insert("is_active", true);
        let find = self.0.users.find(filter).sort(doc! { "created_at": 1, "_id": 1 });
        let cursor = run("listing users", find).await?;
        let docs: Vec<UserDoc> = run("listing users", cursor.try_collect()).await?;
        docs.into_iter().map(UserDoc::into_entity).collect()
    }

    async fn update(&self, user: &mut User) -> StoreResult<()> {
        user.sanitize()?;
        user.updated_at = clock::now();
        let update = doc! { "$set": {
            "email": &user.email,
            "password_hash": &user.password_hash,
            "first_name": &user.first_name,
            "last_name": &user.last_name,
            "role": user.role.as_str(),
            "is_active": user.is_active,
            "updated_at": ts(&user.updated_at),
        } };
        let result = run_write(
            "updating user",
            "email already in use",
            self.0.users.update_one(by_id(user.id), update),
        )
        .await?;
        if result.matched_count == 0 {
            return Err(StoreError::NotFound("user"));
        }
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> StoreResult<()> {
        validate_id("user id", id)?;
        let filter = doc! { "_id": id.to_string(), "is_active": true };
        let update = doc! { "$set": { "is_active": false, "updated_at": ts(&clock::now()) } };
        let result = run("deactivating user", self.0.users.update_one(filter, update)).await?;
        if result.matched_count == 0 {
            return Err(StoreError::NotFound("user"));
        }
        Ok(())
    }

    async fn update_last_login(&self, id: Uuid, at: DateTime<Utc>) -> StoreResult<()> {
        validate_id("user id", id)?;
        let update = doc! { "$set": { "last_login": ts(&clock::normalize(at)) } };
        let result = run("recording login", self.0.users.update_one(by_id(id), update)).await?;
        if result.matched_count == 0 {
            return Err(StoreError::NotFound("user"));
        }
        Ok(())
    }
}

// ── Invites ────────────────────────────────────────────────────────────────

struct MongoInvites(Arc<Collections>);

impl MongoInvites {
    async fn list(&self, filter: Document) -> StoreResult<Vec<Invite>> {
        let find = self.0.invites.find(filter).sort(doc! { "created_at": -1, "_id": 1 });
        let cursor = run("listing invites", find).await?;
        let docs: Vec<InviteDoc> = run("listing invites", cursor.try_collect()).await?;
        docs.into_iter().map(InviteDoc::into_entity).collect()
    }

    /// Move a pending invite. Zero matches means unknown or already terminal.
    async fn transition(&self, id: Uuid, set: Document) -> StoreResult<()> {
        let filter = doc! { "_id": id.to_string(), "status": InviteStatus::Pending.as_str() };
        let result = run("updating invite", self.0.invites.update_one(filter, doc! { "$set": set }))
            .await?;
        if result.matched_count > 0 {
            return Ok(());
        }
        let invite = self.get_by_id(id).await?;
        Err(StoreError::conflict(format!("invite is already {}", invite.status)))
    }
}

#[async_trait]
impl InviteRepository for MongoInvites {
    async fn create(&self, invite: &mut Invite) -> StoreResult<()> {
        invite.sanitize()?;
        let now = clock::now();
        invite.status = InviteStatus::Pending;
        invite.created_at = now;
        invite.updated_at = now;
        let doc = InviteDoc::from_entity(invite);
        run_write(
            "inserting invite",
            "invite token already exists",
            self.0.invites.insert_one(doc),
        )
        .await?;
        Ok(())
    }

    async fn get_by_id(&self, id: Uuid) -> StoreResult<Invite> {
        validate_id("invite id", id)?;
        run("loading invite", self.0.invites.find_one(by_id(id)))
            .await?
            .ok_or(StoreError::NotFound("invite"))?
            .into_entity()
    }

    async fn get_by_token(&self, token: &str) -> StoreResult<Invite> {
        let token = token.trim();
        if token.is_empty() {
            return Err(ValidationError::Empty { field: "token" }.into());
        }
        run("loading invite", self.0.invites.find_one(doc! { "token": token }))
            .await?
            .ok_or(StoreError::NotFound("invite"))?
            .into_entity()
    }

    async fn get_by_family(&self, family_id: Uuid) -> StoreResult<Vec<Invite>> {
        validate_id("family id", family_id)?;
        self.list(of_family(family_id)).await
    }

    async fn get_pending_by_email(&self, email: &str) -> StoreResult<Vec<Invite>> {
        let email = validate_email(email)?;
        self.list(doc! { "email": email, "status": InviteStatus::Pending.as_str() })
            .await
    }

    async fn accept(&self, id: Uuid, user_id: Uuid, at: DateTime<Utc>) -> StoreResult<()> {
        validate_id("invite id", id)?;
        validate_id("user id", user_id)?;
        let at = ts(&clock::normalize(at));
        self.transition(
            id,
            doc! {
                "status": InviteStatus::Accepted.as_str(),
                "accepted_by": user_id.to_string(),
                "accepted_at": &at,
                "updated_at": &at,
            },
        )
        .await
    }

    async fn revoke(&self, id: Uuid, at: DateTime<Utc>) -> StoreResult<()> {
        validate_id("invite id", id)?;
        let at = ts(&clock::normalize(at));
        self.transition(
            id,
            doc! { "status": InviteStatus::Revoked.as_str(), "updated_at": at },
        )
        .await
    }

    async fn mark_expired_bulk(&self, now: DateTime<Utc>) -> StoreResult<u64> {
        let now = ts(&clock::normalize(now));
        let filter = doc! {
            "status": InviteStatus::Pending.as_str(),
            "expires_at": { "$lt": &now },
        };
        let update = doc! { "$set": {
            "status": InviteStatus::Expired.as_str(),
            "updated_at": &now,
        } };
        let result = run("expiring invites", self.0.invites.update_many(filter, update)).await?;
        Ok(result.modified_count)
    }

    async fn delete(&self, id: Uuid) -> StoreResult<()> {
        validate_id("invite id", id)?;
        let result = run("deleting invite", self.0.invites.delete_one(by_id(id))).await?;
        if result.deleted_count == 0 {
            return Err(StoreError::NotFound("invite"));
        }
        Ok(())
    }

    async fn purge_terminal(&self, before: DateTime<Utc>) -> StoreResult<u64> {
        let filter = doc! {
            "status": { "$ne": InviteStatus::Pending.as_str() },
            "updated_at": { "$lt": ts(&clock::normalize(before)) },
        };
        let result = run("purging invites", self.0.invites.delete_many(filter)).await?;
        Ok(result.deleted_count)
    }
}

// ── Categories ─────────────────────────────────────────────────────────────

struct MongoCategories(Arc<Collections>);

#[async_trait]
impl CategoryRepository for MongoCategories {
    async fn create(&self, category: &mut Category) -> StoreResult<()> {
        category.sanitize()?;
        let now = clock::now();
        category.created_at = now;
        category.updated_at = now;
        let doc = CategoryDoc::from_entity(category);
        run_write(
            "inserting category",
            "category already exists",
            self.0.categories.insert_one(doc),
        )
        .await?;
        Ok(())
    }

    async fn get_by_id(&self, id: Uuid) -> StoreResult<Category> {
        validate_id("category id", id)?;
        run("loading category", self.0.categories.find_one(by_id(id)))
            .await?
            .ok_or(StoreError::NotFound("category"))?
            .into_entity()
    }

    async fn get_by_family(
        &self,
        family_id: Uuid,
        category_type: Option<CategoryType>,
    ) -> StoreResult<Vec<Category>> {
        validate_id("family id", family_id)?;
        let mut filter = of_family(family_id);
        filter.insert("is_active", true);
        if let Some(t) = category_type {
            filter.insert("category_type", t.as_str());
        }
        let find = self.0.categories.find(filter).sort(doc! { "name": 1, "_id": 1 });
        let cursor = run("listing categories", find).await?;
        let docs: Vec<CategoryDoc> = run("listing categories", cursor.try_collect()).await?;
        docs.into_iter().map(CategoryDoc::into_entity).collect()
    }

    async fn update(&self, category: &mut Category) -> StoreResult<()> {
        category.sanitize()?;
        category.updated_at = clock::now();
        let update = doc! { "$set": {
            "name": &category.name,
            "category_type": category.category_type.as_str(),
            "color": &category.color,
            "icon": &category.icon,
            "parent_id": category.parent_id.map(|p| p.to_string()),
            "is_active": category.is_active,
            "updated_at": ts(&category.updated_at),
        } };
        let result = run_write(
            "updating category",
            "category already exists",
            self.0.categories.update_one(by_id(category.id), update),
        )
        .await?;
        if result.matched_count == 0 {
            return Err(StoreError::NotFound("category"));
        }
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> StoreResult<()> {
        validate_id("category id", id)?;
        let filter = doc! { "_id": id.to_string(), "is_active": true };
        let update = doc! { "$set": { "is_active": false, "updated_at": ts(&clock::now()) } };
        let result = run("deactivating category", self.0.categories.update_one(filter, update))
            .await?;
        if result.matched_count == 0 {
            return Err(StoreError::NotFound("category"));
        }
        Ok(())
    }
}

// ── Transactions ───────────────────────────────────────────────────────────

struct MongoTransactions(Arc<Collections>);

fn transaction_filter(family_id: Uuid, f: &TransactionFilter) -> StoreResult<Document> {
    let mut filter = of_family(family_id);
    if let Some(user_id) = f.user_id {
        filter.insert("user_id", user_id.to_string());
    }
    if let Some(category_id) = f.category_id {
        filter.insert("category_id", category_id.to_string());
    }
    if let Some(t) = f.transaction_type {
        filter.insert("transaction_type", t.as_str());
    }
    if let Some(dates) = range(f.start_date.as_ref().map(day), f.end_date.as_ref().map(day)) {
        filter.insert("date", dates);
    }
    let min = f.min_amount.map(money::to_cents).transpose()?;
    let max = f.max_amount.map(money::to_cents).transpose()?;
    if let Some(amounts) = range(min, max) {
        filter.insert("amount_cents", amounts);
    }
    Ok(filter)
}

#[async_trait]
impl TransactionRepository for MongoTransactions {
    async fn create(&self, transaction: &mut Transaction) -> StoreResult<()> {
        transaction.sanitize()?;
        let now = clock::now();
        transaction.created_at = now;
        transaction.updated_at = now;
        let doc = TransactionDoc::from_entity(transaction)?;
        run_write(
            "inserting transaction",
            "transaction already exists",
            self.0.transactions.insert_one(doc),
        )
        .await?;
        Ok(())
    }

    async fn get_by_id(&self, id: Uuid) -> StoreResult<Transaction> {
        validate_id("transaction id", id)?;
        run("loading transaction", self.0.transactions.find_one(by_id(id)))
            .await?
            .ok_or(StoreError::NotFound("transaction"))?
            .into_entity()
    }

    async fn list(
        &self,
        family_id: Uuid,
        filter: &TransactionFilter,
    ) -> StoreResult<Vec<Transaction>> {
        validate_id("family id", family_id)?;
        filter.validate()?;
        let find = self
            .0
            .transactions
            .find(transaction_filter(family_id, filter)?)
            .sort(doc! { "date": -1, "created_at": -1, "_id": 1 })
            .skip(u64::from(filter.effective_offset()))
            .limit(i64::from(filter.effective_limit()));
        let cursor = run("listing transactions", find).await?;
        let docs: Vec<TransactionDoc> = run("listing transactions", cursor.try_collect()).await?;
        docs.into_iter().map(TransactionDoc::into_entity).collect()
    }

    async fn update(&self, transaction: &mut Transaction) -> StoreResult<()> {
        transaction.sanitize()?;
        transaction.updated_at = clock::now();
        let doc = TransactionDoc::from_entity(transaction)?;
        let update = doc! { "$set": {
            "user_id": &doc.user_id,
            "category_id": &doc.category_id,
            "amount_cents": doc.amount_cents,
            "transaction_type": &doc.transaction_type,
            "description": &doc.description,
            "date": &doc.date,
            "tags": &doc.tags,
            "updated_at": &doc.updated_at,
        } };
        let result = run(
            "updating transaction",
            self.0.transactions.update_one(by_id(transaction.id), update),
        )
        .await?;
        if result.matched_count == 0 {
            return Err(StoreError::NotFound("transaction"));
        }
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> StoreResult<()> {
        validate_id("transaction id", id)?;
        let result = run("deleting transaction", self.0.transactions.delete_one(by_id(id))).await?;
        if result.deleted_count == 0 {
            return Err(StoreError::NotFound("transaction"));
        }
        Ok(())
    }

    async fn sum(&self, family_id: Uuid, query: &AmountQuery) -> StoreResult<Decimal> {
        validate_id("family id", family_id)?;
        sum_amount(&self.0, amount_filter(family_id, query)).await
    }

    async fn totals_by_category(
        &self,
        family_id: Uuid,
        query: &AmountQuery,
    ) -> StoreResult<Vec<CategoryTotal>> {
        validate_id("family id", family_id)?;
        let pipeline = vec![
            doc! { "$match": amount_filter(family_id, query) },
            doc! { "$group": {
                "_id": "$category_id",
                "total": { "$sum": "$amount_cents" },
                "count": { "$sum": 1 },
            } },
            doc! { "$sort": { "total": -1, "_id": 1 } },
        ];
        let cursor = run("totalling categories", self.0.transactions.aggregate(pipeline)).await?;
        let rows: Vec<Document> = run("totalling categories", cursor.try_collect()).await?;
        rows.iter()
            .map(|row| {
                let id = row
                    .get_str("_id")
                    .map_err(|e| StoreError::Backend(format!("category total id: {e}")))?;
                let count = read_i64(row, "count")?;
                Ok(CategoryTotal {
                    category_id: Uuid::parse_str(id)
                        .map_err(|e| StoreError::Backend(format!("category total id: {e}")))?,
                    total: money::from_cents(read_i64(row, "total")?),
                    count: u64::try_from(count).unwrap_or_default(),
                })
            })
            .collect()
    }
}

// ── Budgets ────────────────────────────────────────────────────────────────

struct MongoBudgets(Arc<Collections>);

impl MongoBudgets {
    async fn list(&self, filter: Document, sort: Document) -> StoreResult<Vec<Budget>> {
        let cursor = run("listing budgets", self.0.budgets.find(filter).sort(sort)).await?;
        let docs: Vec<BudgetDoc> = run("listing budgets", cursor.try_collect()).await?;
        docs.into_iter().map(BudgetDoc::into_entity).collect()
    }
}

#[async_trait]
impl BudgetRepository for MongoBudgets {
    async fn create(&self, budget: &mut Budget) -> StoreResult<()> {
        budget.sanitize()?;
        let now = clock::now();
        budget.created_at = now;
        budget.updated_at = now;
        let doc = BudgetDoc::from_entity(budget)?;
        run_write("inserting budget", "budget already exists", self.0.budgets.insert_one(doc))
            .await?;
        Ok(())
    }

    async fn get_by_id(&self, id: Uuid) -> StoreResult<Budget> {
        validate_id("budget id", id)?;
        run("loading budget", self.0.budgets.find_one(by_id(id)))
            .await?
            .ok_or(StoreError::NotFound("budget"))?
            .into_entity()
    }

    async fn get_by_family(&self, family_id: Uuid) -> StoreResult<Vec<Budget>> {
        validate_id("family id", family_id)?;
        self.list(
            of_family(family_id),
            doc! { "start_date": -1, "name": 1, "_id": 1 },
        )
        .await
    }

    async fn get_active(&self, family_id: Uuid, on: NaiveDate) -> StoreResult<Vec<Budget>> {
        validate_id("family id", family_id)?;
        let on = day(&on);
        let mut filter = of_family(family_id);
        filter.insert("is_active", true);
        filter.insert("start_date", doc! { "$lte": &on });
        filter.insert("end_date", doc! { "$gte": &on });
        self.list(filter, doc! { "name": 1, "_id": 1 }).await
    }

    async fn update(&self, budget: &mut Budget) -> StoreResult<()> {
        budget.sanitize()?;
        budget.updated_at = clock::now();
        let doc = BudgetDoc::from_entity(budget)?;
        let update = doc! { "$set": {
            "category_id": &doc.category_id,
            "name": &doc.name,
            "amount_cents": doc.amount_cents,
            "period": &doc.period,
            "start_date": &doc.start_date,
            "end_date": &doc.end_date,
            "is_active": doc.is_active,
            "updated_at": &doc.updated_at,
        } };
        let result = run("updating budget", self.0.budgets.update_one(by_id(budget.id), update))
            .await?;
        if result.matched_count == 0 {
            return Err(StoreError::NotFound("budget"));
        }
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> StoreResult<()> {
        validate_id("budget id", id)?;
        let result = run("deleting budget", self.0.budgets.delete_one(by_id(id))).await?;
        if result.deleted_count == 0 {
            return Err(StoreError::NotFound("budget"));
        }
        Ok(())
    }
}

// ── Reports ────────────────────────────────────────────────────────────────

struct MongoReports(Arc<Collections>);

#[async_trait]
impl ReportRepository for MongoReports {
    async fn create(&self, report: &mut Report) -> StoreResult<()> {
        report.sanitize()?;
        report.generated_at = clock::now();
        let doc = ReportDoc::from_entity(report)?;
        run_write("inserting report", "report already exists", self.0.reports.insert_one(doc))
            .await?;
        Ok(())
    }

    async fn get_by_id(&self, id: Uuid) -> StoreResult<Report> {
        validate_id("report id", id)?;
        run("loading report", self.0.reports.find_one(by_id(id)))
            .await?
            .ok_or(StoreError::NotFound("report"))?
            .into_entity()
    }

    async fn get_by_family(&self, family_id: Uuid) -> StoreResult<Vec<Report>> {
        validate_id("family id", family_id)?;
        let find = self
            .0
            .reports
            .find(of_family(family_id))
            .sort(doc! { "generated_at": -1, "_id": 1 });
        let cursor = run("listing reports", find).await?;
        let docs: Vec<ReportDoc> = run("listing reports", cursor.try_collect()).await?;
        docs.into_iter().map(ReportDoc::into_entity).collect()
    }

    async fn delete(&self, id: Uuid) -> StoreResult<()> {
        validate_id("report id", id)?;
        let result = run("deleting report", self.0.reports.delete_one(by_id(id))).await?;
        if result.deleted_count == 0 {
            return Err(StoreError::NotFound("report"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use famledger_core::testing::{date, dec};

    #[test]
    fn amount_filter_bounds_dates() {
        let family = Uuid::new_v4();
        let q = AmountQuery::of(TransactionType::Expense).between(date(2024, 1, 1), date(2024, 1, 31));
        let filter = amount_filter(family, &q);
        assert_eq!(filter.get_str("transaction_type").unwrap(), "expense");
        let dates = filter.get_document("date").unwrap();
        assert_eq!(dates.get_str("$gte").unwrap(), "2024-01-01");
        assert_eq!(dates.get_str("$lte").unwrap(), "2024-01-31");
        assert!(filter.get("category_id").is_none());
    }

    #[test]
    fn transaction_filter_uses_cents() {
        let f = TransactionFilter {
            min_amount: Some(dec("10.01")),
            ..Default::default()
        };
        let filter = transaction_filter(Uuid::new_v4(), &f).unwrap();
        let amounts = filter.get_document("amount_cents").unwrap();
        assert_eq!(amounts.get_i64("$gte").unwrap(), 1001);
        assert!(amounts.get("$lte").is_none());
    }

    #[test]
    fn aggregate_numbers_widen() {
        let row = doc! { "a": 5_i32, "b": 7_i64, "c": 3.0_f64 };
        assert_eq!(read_i64(&row, "a").unwrap(), 5);
        assert_eq!(read_i64(&row, "b").unwrap(), 7);
        assert_eq!(read_i64(&row, "c").unwrap(), 3);
        assert_eq!(read_i64(&row, "missing").unwrap(), 0);
        assert!(read_i64(&doc! { "x": "nope" }, "x").is_err());
    }
}
