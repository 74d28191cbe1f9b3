//! Repository implementations over any [`SqlExecutor`].

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use famledger_api::db::{self, Built};
use famledger_core::validate::{validate_email, validate_id};
use famledger_core::{
    AmountQuery, Budget, BudgetRepository, Category, CategoryRepository, CategoryTotal,
    CategoryType, Family, FamilyRepository, FamilyStatistics, Invite, InviteRepository,
    InviteStatus, Report, ReportRepository, Repositories, StoreError, StoreResult, Transaction,
    TransactionFilter, TransactionRepository, TransactionType, User, UserRepository,
    ValidationError, clock,
};

use super::{ExecError, Record, SqlExecutor};

/// Build every repository on top of one executor.
pub fn repositories<E: SqlExecutor>(exec: Arc<E>) -> Repositories {
    Repositories {
        families: Arc::new(SqlFamilies(exec.clone())),
        users: Arc::new(SqlUsers(exec.clone())),
        invites: Arc::new(SqlInvites(exec.clone())),
        categories: Arc::new(SqlCategories(exec.clone())),
        transactions: Arc::new(SqlTransactions(exec.clone())),
        budgets: Arc::new(SqlBudgets(exec.clone())),
        reports: Arc::new(SqlReports(exec)),
    }
}

// ── Shared plumbing ────────────────────────────────────────────────────────

/// Translate a failed write. `conflict` is the message for a duplicate key,
/// `reference` names the field whose foreign key failed.
fn write_error(e: ExecError, conflict: &str, reference: &'static str) -> StoreError {
    match e {
        ExecError::Unique(_) => StoreError::conflict(conflict),
        ExecError::ForeignKey(_) => StoreError::Validation(ValidationError::malformed(
            reference,
            "references a missing record",
        )),
        ExecError::Other(msg) => StoreError::Backend(msg),
    }
}

async fn fetch<E: SqlExecutor>(exec: &E, stmt: Built) -> StoreResult<Vec<Record>> {
    Ok(exec.fetch_all(stmt).await?)
}

async fn fetch_one<E, T>(
    exec: &E,
    stmt: Built,
    what: &'static str,
    map: fn(&Record) -> StoreResult<T>,
) -> StoreResult<T>
where
    E: SqlExecutor,
{
    match fetch(exec, stmt).await?.first() {
        Some(row) => map(row),
        None => Err(StoreError::NotFound(what)),
    }
}

async fn fetch_many<E, T>(
    exec: &E,
    stmt: Built,
    map: fn(&Record) -> StoreResult<T>,
) -> StoreResult<Vec<T>>
where
    E: SqlExecutor,
{
    fetch(exec, stmt).await?.iter().map(map).collect()
}

/// Single-row `count` / `total` aggregate.
async fn scalar<E: SqlExecutor>(exec: &E, stmt: Built, column: &str) -> StoreResult<i64> {
    match fetch(exec, stmt).await?.first() {
        Some(row) => row.int(column),
        None => Ok(0),
    }
}

/// Run a statement that must touch exactly the addressed row.
async fn touch<E: SqlExecutor>(exec: &E, stmt: Built, what: &'static str) -> StoreResult<()> {
    match exec.execute(stmt).await? {
        0 => Err(StoreError::NotFound(what)),
        _ => Ok(()),
    }
}

// ── Row mapping ────────────────────────────────────────────────────────────

fn family_from(r: &Record) -> StoreResult<Family> {
    Ok(Family {
        id: r.uuid("id")?,
        name: r.text("name")?,
        currency: r.text("currency")?,
        created_at: r.timestamp("created_at")?,
        updated_at: r.timestamp("updated_at")?,
    })
}

fn user_from(r: &Record) -> StoreResult<User> {
    Ok(User {
        id: r.uuid("id")?,
        email: r.text("email")?,
        password_hash: r.text("password_hash")?,
        first_name: r.text("first_name")?,
        last_name: r.text("last_name")?,
        role: r.parse("role")?,
        family_id: r.uuid("family_id")?,
        is_active: r.boolean("is_active")?,
        last_login: r.opt_timestamp("last_login")?,
        created_at: r.timestamp("created_at")?,
        updated_at: r.timestamp("updated_at")?,
    })
}

fn invite_from(r: &Record) -> StoreResult<Invite> {
    Ok(Invite {
        id: r.uuid("id")?,
        family_id: r.uuid("family_id")?,
        created_by: r.uuid("created_by")?,
        email: r.text("email")?,
        role: r.parse("role")?,
        token: r.text("token")?,
        status: r.parse("status")?,
        expires_at: r.timestamp("expires_at")?,
        accepted_at: r.opt_timestamp("accepted_at")?,
        accepted_by: r.opt_uuid("accepted_by")?,
        created_at: r.timestamp("created_at")?,
        updated_at: r.timestamp("updated_at")?,
    })
}

fn category_from(r: &Record) -> StoreResult<Category> {
    Ok(Category {
        id: r.uuid("id")?,
        family_id: r.uuid("family_id")?,
        name: r.text("name")?,
        category_type: r.parse("category_type")?,
        color: r.text("color")?,
        icon: r.text("icon")?,
        parent_id: r.opt_uuid("parent_id")?,
        is_active: r.boolean("is_active")?,
        created_at: r.timestamp("created_at")?,
        updated_at: r.timestamp("updated_at")?,
    })
}

fn transaction_from(r: &Record) -> StoreResult<Transaction> {
    Ok(Transaction {
        id: r.uuid("id")?,
        family_id: r.uuid("family_id")?,
        user_id: r.uuid("user_id")?,
        category_id: r.uuid("category_id")?,
        amount: r.cents("amount_cents")?,
        transaction_type: r.parse("transaction_type")?,
        description: r.text("description")?,
        date: r.date("date")?,
        tags: r.json("tags")?,
        created_at: r.timestamp("created_at")?,
        updated_at: r.timestamp("updated_at")?,
    })
}

fn budget_from(r: &Record) -> StoreResult<Budget> {
    Ok(Budget {
        id: r.uuid("id")?,
        family_id: r.uuid("family_id")?,
        category_id: r.opt_uuid("category_id")?,
        name: r.text("name")?,
        amount: r.cents("amount_cents")?,
        period: r.parse("period")?,
        start_date: r.date("start_date")?,
        end_date: r.date("end_date")?,
        is_active: r.boolean("is_active")?,
        created_at: r.timestamp("created_at")?,
        updated_at: r.timestamp("updated_at")?,
    })
}

fn report_from(r: &Record) -> StoreResult<Report> {
    Ok(Report {
        id: r.uuid("id")?,
        family_id: r.uuid("family_id")?,
        user_id: r.uuid("user_id")?,
        name: r.text("name")?,
        report_type: r.parse("report_type")?,
        period: r.parse("period")?,
        start_date: r.date("start_date")?,
        end_date: r.date("end_date")?,
        data: r.json("data")?,
        generated_at: r.timestamp("generated_at")?,
    })
}

fn total_from(r: &Record) -> StoreResult<CategoryTotal> {
    Ok(CategoryTotal {
        category_id: r.uuid("category_id")?,
        total: r.cents("total")?,
        count: r.count("count")?,
    })
}

// ── Families ───────────────────────────────────────────────────────────────

struct SqlFamilies<E>(Arc<E>);

#[async_trait]
impl<E: SqlExecutor> FamilyRepository for SqlFamilies<E> {
    async fn create(&self, family: &mut Family) -> StoreResult<()> {
        family.sanitize()?;
        let now = clock::now();
        family.created_at = now;
        family.updated_at = now;
        let d = self.0.dialect();
        self.0
            .execute(db::families::insert(d, family))
            .await
            .map_err(|e| write_error(e, "family already exists", "family id"))?;
        Ok(())
    }

    async fn get_by_id(&self, id: Uuid) -> StoreResult<Family> {
        validate_id("family id", id)?;
        let d = self.0.dialect();
        fetch_one(&*self.0, db::families::get_by_id(d, id), "family", family_from).await
    }

    async fn get_primary(&self) -> StoreResult<Option<Family>> {
        let d = self.0.dialect();
        let rows = fetch(&*self.0, db::families::get_primary(d)).await?;
        rows.first().map(family_from).transpose()
    }

    async fn update(&self, family: &mut Family) -> StoreResult<()> {
        family.sanitize()?;
        family.updated_at = clock::now();
        let d = self.0.dialect();
        match self.0.execute(db::families::update(d, family)).await {
            Ok(0) => Err(StoreError::NotFound("family")),
            Ok(_) => Ok(()),
            Err(e) => Err(write_error(e, "family already exists", "family id")),
        }
    }

    async fn delete(&self, id: Uuid) -> StoreResult<()> {
        validate_id("family id", id)?;
        let d = self.0.dialect();
        touch(&*self.0, db::families::delete(d, id), "family").await
    }

    async fn get_statistics(&self, id: Uuid) -> StoreResult<FamilyStatistics> {
        self.get_by_id(id).await?;
        let exec = &*self.0;
        let d = exec.dialect();

        let user_count = scalar(exec, db::users::count_active(d, id), "count").await?;
        let category_count = scalar(exec, db::categories::count_active(d, id), "count").await?;
        let transaction_count = scalar(exec, db::transactions::count(d, id), "count").await?;
        let budget_count = scalar(exec, db::budgets::count(d, id), "count").await?;
        let income = AmountQuery::of(TransactionType::Income);
        let expenses = AmountQuery::of(TransactionType::Expense);
        let total_income = scalar(exec, db::transactions::sum(d, id, &income), "total").await?;
        let total_expenses = scalar(exec, db::transactions::sum(d, id, &expenses), "total").await?;

        let total_income = famledger_core::money::from_cents(total_income);
        let total_expenses = famledger_core::money::from_cents(total_expenses);
        Ok(FamilyStatistics {
            user_count: user_count.max(0) as u64,
            category_count: category_count.max(0) as u64,
            transaction_count: transaction_count.max(0) as u64,
            budget_count: budget_count.max(0) as u64,
            total_income,
            total_expenses,
            balance: total_income - total_expenses,
        })
    }
}

// ── Users ──────────────────────────────────────────────────────────────────

struct SqlUsers<E>(Arc<E>);

#[async_trait]
impl<E: SqlExecutor> UserRepository for SqlUsers<E> {
    async fn create(&self, user: &mut User) -> StoreResult<()> {
        user.sanitize()?;
        let now = clock::now();
        user.created_at = now;
        user.updated_at = now;
        let d = self.0.dialect();
        self.0
            .execute(db::users::insert(d, user))
            .await
            .map_err(|e| write_error(e, "email already in use", "family id"))?;
        Ok(())
    }

    async fn get_by_id(&self, id: Uuid) -> StoreResult<User> {
        validate_id("user id", id)?;
        let d = self.0.dialect();
        fetch_one(&*self.0, db::users::get_by_id(d, id), "user", user_from).await
    }

    async fn get_by_email(&self, email: &str) -> StoreResult<User> {
        let email = validate_email(email)?;
        let d = self.0.dialect();
        fetch_one(&*self.0, db::users::get_active_by_email(d, &email), "user", user_from).await
    }

    async fn get_by_family(&self, family_id: Uuid) -> StoreResult<Vec<User>> {
        validate_id("family id", family_id)?;
        let d = self.0.dialect();
        fetch_many(&*self.0, db::users::list_active_by_family(d, family_id), user_from).await
    }

    async fn update(&self, user: &mut User) -> StoreResult<()> {
        user.sanitize()?;
        user.updated_at = clock::now();
        let d = self.0.dialect();
        match self.0.execute(db::users::update(d, user)).await {
            Ok(0) => Err(StoreError::NotFound("user")),
            Ok(_) => Ok(()),
            Err(e) => Err(write_error(e, "email already in use", "family id")),
        }
    }

    async fn delete(&self, id: Uuid) -> StoreResult<()> {
        validate_id("user id", id)?;
        let d = self.0.dialect();
        touch(&*self.0, db::users::deactivate(d, id, &clock::now()), "user").await
    }

    async fn update_last_login(&self, id: Uuid, at: DateTime<Utc>) -> StoreResult<()> {
        validate_id("user id", id)?;
        let d = self.0.dialect();
        let at = clock::normalize(at);
        touch(&*self.0, db::users::touch_last_login(d, id, &at), "user").await
    }
}

// ── Invites ────────────────────────────────────────────────────────────────

struct SqlInvites<E>(Arc<E>);

impl<E: SqlExecutor> SqlInvites<E> {
    /// A guarded transition touched nothing: tell "unknown" from "terminal".
    async fn transition_failed(&self, id: Uuid) -> StoreError {
        match self.get_by_id(id).await {
            Ok(invite) => StoreError::conflict(format!("invite is already {}", invite.status)),
            Err(e) => e,
        }
    }
}

#[async_trait]
impl<E: SqlExecutor> InviteRepository for SqlInvites<E> {
    async fn create(&self, invite: &mut Invite) -> StoreResult<()> {
        invite.sanitize()?;
        let now = clock::now();
        invite.status = InviteStatus::Pending;
        invite.created_at = now;
        invite.updated_at = now;
        let d = self.0.dialect();
        self.0
            .execute(db::invites::insert(d, invite))
            .await
            .map_err(|e| write_error(e, "invite token already exists", "family id"))?;
        Ok(())
    }

    async fn get_by_id(&self, id: Uuid) -> StoreResult<Invite> {
        validate_id("invite id", id)?;
        let d = self.0.dialect();
        fetch_one(&*self.0, db::invites::get_by_id(d, id), "invite", invite_from).await
    }

    async fn get_by_token(&self, token: &str) -> StoreResult<Invite> {
        let token = token.trim();
        if token.is_empty() {
            return Err(ValidationError::Empty { field: "token" }.into());
        }
        let d = self.0.dialect();
        fetch_one(&*self.0, db::invites::get_by_token(d, token), "invite", invite_from).await
    }

    async fn get_by_family(&self, family_id: Uuid) -> StoreResult<Vec<Invite>> {
        validate_id("family id", family_id)?;
        let d = self.0.dialect();
        fetch_many(&*self.0, db::invites::list_by_family(d, family_id), invite_from).await
    }

    async fn get_pending_by_email(&self, email: &str) -> StoreResult<Vec<Invite>> {
        let email = validate_email(email)?;
        let d = self.0.dialect();
        fetch_many(&*self.0, db::invites::list_pending_by_email(d, &email), invite_from).await
    }

    async fn accept(&self, id: Uuid, user_id: Uuid, at: DateTime<Utc>) -> StoreResult<()> {
        validate_id("invite id", id)?;
        validate_id("user id", user_id)?;
        let d = self.0.dialect();
        let at = clock::normalize(at);
        let stmt = db::invites::accept(d, id, user_id, &at);
        match self.0.execute(stmt).await {
            Ok(0) => Err(self.transition_failed(id).await),
            Ok(_) => Ok(()),
            Err(e) => Err(write_error(e, "invite already accepted", "user id")),
        }
    }

    async fn revoke(&self, id: Uuid, at: DateTime<Utc>) -> StoreResult<()> {
        validate_id("invite id", id)?;
        let d = self.0.dialect();
        let at = clock::normalize(at);
        match self.0.execute(db::invites::revoke(d, id, &at)).await? {
            0 => Err(self.transition_failed(id).await),
            _ => Ok(()),
        }
    }

    async fn mark_expired_bulk(&self, now: DateTime<Utc>) -> StoreResult<u64> {
        let d = self.0.dialect();
        let now = clock::normalize(now);
        Ok(self.0.execute(db::invites::mark_expired(d, &now)).await?)
    }

    async fn delete(&self, id: Uuid) -> StoreResult<()> {
        validate_id("invite id", id)?;
        let d = self.0.dialect();
        touch(&*self.0, db::invites::delete(d, id), "invite").await
    }

    async fn purge_terminal(&self, before: DateTime<Utc>) -> StoreResult<u64> {
        let d = self.0.dialect();
        let before = clock::normalize(before);
        Ok(self.0.execute(db::invites::purge_terminal(d, &before)).await?)
    }
}

// ── Categories ─────────────────────────────────────────────────────────────

struct SqlCategories<E>(Arc<E>);

#[async_trait]
impl<E: SqlExecutor> CategoryRepository for SqlCategories<E> {
    async fn create(&self, category: &mut Category) -> StoreResult<()> {
        category.sanitize()?;
        let now = clock::now();
        category.created_at = now;
        category.updated_at = now;
        let d = self.0.dialect();
        self.0
            .execute(db::categories::insert(d, category))
            .await
            .map_err(|e| write_error(e, "category already exists", "parent id"))?;
        Ok(())
    }

    async fn get_by_id(&self, id: Uuid) -> StoreResult<Category> {
        validate_id("category id", id)?;
        let d = self.0.dialect();
        fetch_one(&*self.0, db::categories::get_by_id(d, id), "category", category_from).await
    }

    async fn get_by_family(
        &self,
        family_id: Uuid,
        category_type: Option<CategoryType>,
    ) -> StoreResult<Vec<Category>> {
        validate_id("family id", family_id)?;
        let d = self.0.dialect();
        let stmt = db::categories::list_active_by_family(d, family_id, category_type);
        fetch_many(&*self.0, stmt, category_from).await
    }

    async fn update(&self, category: &mut Category) -> StoreResult<()> {
        category.sanitize()?;
        category.updated_at = clock::now();
        let d = self.0.dialect();
        match self.0.execute(db::categories::update(d, category)).await {
            Ok(0) => Err(StoreError::NotFound("category")),
            Ok(_) => Ok(()),
            Err(e) => Err(write_error(e, "category already exists", "parent id")),
        }
    }

    async fn delete(&self, id: Uuid) -> StoreResult<()> {
        validate_id("category id", id)?;
        let d = self.0.dialect();
        let stmt = db::categories::deactivate(d, id, &clock::now());
        touch(&*self.0, stmt, "category").await
    }
}

// ── Transactions ───────────────────────────────────────────────────────────

struct SqlTransactions<E>(Arc<E>);

#[async_trait]
impl<E: SqlExecutor> TransactionRepository for SqlTransactions<E> {
    async fn create(&self, transaction: &mut Transaction) -> StoreResult<()> {
        transaction.sanitize()?;
        let now = clock::now();
        transaction.created_at = now;
        transaction.updated_at = now;
        let d = self.0.dialect();
        self.0
            .execute(db::transactions::insert(d, transaction)?)
            .await
            .map_err(|e| write_error(e, "transaction already exists", "category id"))?;
        Ok(())
    }

    async fn get_by_id(&self, id: Uuid) -> StoreResult<Transaction> {
        validate_id("transaction id", id)?;
        let d = self.0.dialect();
        let stmt = db::transactions::get_by_id(d, id);
        fetch_one(&*self.0, stmt, "transaction", transaction_from).await
    }

    async fn list(
        &self,
        family_id: Uuid,
        filter: &TransactionFilter,
    ) -> StoreResult<Vec<Transaction>> {
        validate_id("family id", family_id)?;
        filter.validate()?;
        let d = self.0.dialect();
        let stmt = db::transactions::list(d, family_id, filter)?;
        fetch_many(&*self.0, stmt, transaction_from).await
    }

    async fn update(&self, transaction: &mut Transaction) -> StoreResult<()> {
        transaction.sanitize()?;
        transaction.updated_at = clock::now();
        let d = self.0.dialect();
        match self.0.execute(db::transactions::update(d, transaction)?).await {
            Ok(0) => Err(StoreError::NotFound("transaction")),
            Ok(_) => Ok(()),
            Err(e) => Err(write_error(e, "transaction already exists", "category id")),
        }
    }

    async fn delete(&self, id: Uuid) -> StoreResult<()> {
        validate_id("transaction id", id)?;
        let d = self.0.dialect();
        touch(&*self.0, db::transactions::delete(d, id), "transaction").await
    }

    async fn sum(&self, family_id: Uuid, query: &AmountQuery) -> StoreResult<Decimal> {
        validate_id("family id", family_id)?;
        let d = self.0.dialect();
        let cents = scalar(&*self.0, db::transactions::sum(d, family_id, query), "total").await?;
        Ok(famledger_core::money::from_cents(cents))
    }

    async fn totals_by_category(
        &self,
        family_id: Uuid,
        query: &AmountQuery,
    ) -> StoreResult<Vec<CategoryTotal>> {
        validate_id("family id", family_id)?;
        let d = self.0.dialect();
        let stmt = db::transactions::totals_by_category(d, family_id, query);
        fetch_many(&*self.0, stmt, total_from).await
    }
}

// ── Budgets ────────────────────────────────────────────────────────────────

struct SqlBudgets<E>(Arc<E>);

#[async_trait]
impl<E: SqlExecutor> BudgetRepository for SqlBudgets<E> {
    async fn create(&self, budget: &mut Budget) -> StoreResult<()> {
        budget.sanitize()?;
        let now = clock::now();
        budget.created_at = now;
        budget.updated_at = now;
        let d = self.0.dialect();
        self.0
            .execute(db::budgets::insert(d, budget)?)
            .await
            .map_err(|e| write_error(e, "budget already exists", "category id"))?;
        Ok(())
    }

    async fn get_by_id(&self, id: Uuid) -> StoreResult<Budget> {
        validate_id("budget id", id)?;
        let d = self.0.dialect();
        fetch_one(&*self.0, db::budgets::get_by_id(d, id), "budget", budget_from).await
    }

    async fn get_by_family(&self, family_id: Uuid) -> StoreResult<Vec<Budget>> {
        validate_id("family id", family_id)?;
        let d = self.0.dialect();
        fetch_many(&*self.0, db::budgets::list_by_family(d, family_id), budget_from).await
    }

    async fn get_active(&self, family_id: Uuid, on: NaiveDate) -> StoreResult<Vec<Budget>> {
        validate_id("family id", family_id)?;
        let d = self.0.dialect();
        let stmt = db::budgets::list_active_on(d, family_id, &on);
        fetch_many(&*self.0, stmt, budget_from).await
    }

    async fn update(&self, budget: &mut Budget) -> StoreResult<()> {
        budget.sanitize()?;
        budget.updated_at = clock::now();
        let d = self.0.dialect();
        match self.0.execute(db::budgets::update(d, budget)?).await {
            Ok(0) => Err(StoreError::NotFound("budget")),
            Ok(_) => Ok(()),
            Err(e) => Err(write_error(e, "budget already exists", "category id")),
        }
    }

    async fn delete(&self, id: Uuid) -> StoreResult<()> {
        validate_id("budget id", id)?;
        let d = self.0.dialect();
        touch(&*self.0, db::budgets::delete(d, id), "budget").await
    }
}

// ── Reports ────────────────────────────────────────────────────────────────

struct SqlReports<E>(Arc<E>);

#[async_trait]
impl<E: SqlExecutor> ReportRepository for SqlReports<E> {
    async fn create(&self, report: &mut Report) -> StoreResult<()> {
        report.sanitize()?;
        report.generated_at = clock::now();
        let data = serde_json::to_string(&report.data)
            .map_err(StoreError::backend("encoding report data"))?;
        let d = self.0.dialect();
        self.0
            .execute(db::reports::insert(d, report, &data))
            .await
            .map_err(|e| write_error(e, "report already exists", "user id"))?;
        Ok(())
    }

    async fn get_by_id(&self, id: Uuid) -> StoreResult<Report> {
        validate_id("report id", id)?;
        let d = self.0.dialect();
        fetch_one(&*self.0, db::reports::get_by_id(d, id), "report", report_from).await
    }

    async fn get_by_family(&self, family_id: Uuid) -> StoreResult<Vec<Report>> {
        validate_id("family id", family_id)?;
        let d = self.0.dialect();
        fetch_many(&*self.0, db::reports::list_by_family(d, family_id), report_from).await
    }

    async fn delete(&self, id: Uuid) -> StoreResult<()> {
        validate_id("report id", id)?;
        let d = self.0.dialect();
        touch(&*self.0, db::reports::delete(d, id), "report").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_errors_are_classified() {
        let err = write_error(ExecError::Unique("idx".into()), "email already in use", "family id");
        assert!(matches!(err, StoreError::Conflict(m) if m == "email already in use"));

        let err = write_error(ExecError::ForeignKey("fk".into()), "x", "category id");
        assert!(matches!(
            err,
            StoreError::Validation(ValidationError::Malformed { field: "category id", .. })
        ));

        let err = write_error(ExecError::Other("disk full".into()), "x", "y");
        assert!(matches!(err, StoreError::Backend(m) if m == "disk full"));
    }
}
