//! Transaction query builders, including the amount aggregates.

use sea_query::{Alias, Cond, Expr, Order, Query, SelectStatement};
use uuid::Uuid;

use famledger_core::{AmountQuery, Transaction, TransactionFilter, ValidationError, money};

use super::tables::Transactions;
use super::{Built, Dialect, count_all, date, id, sum_cents, ts};

pub const COLUMNS: [Transactions; 11] = [
    Transactions::Id,
    Transactions::FamilyId,
    Transactions::UserId,
    Transactions::CategoryId,
    Transactions::AmountCents,
    Transactions::TransactionType,
    Transactions::Description,
    Transactions::Date,
    Transactions::Tags,
    Transactions::CreatedAt,
    Transactions::UpdatedAt,
];

fn select() -> SelectStatement {
    Query::select()
        .columns(COLUMNS)
        .from(Transactions::Table)
        .to_owned()
}

/// Tags are persisted as a JSON text array.
pub fn encode_tags(tags: &[String]) -> String {
    serde_json::Value::from(tags.to_vec()).to_string()
}

fn amount_cond(family_id: Uuid, query: &AmountQuery) -> Cond {
    let mut cond = Cond::all()
        .add(Expr::col(Transactions::FamilyId).eq(id(family_id)))
        .add(Expr::col(Transactions::TransactionType).eq(query.transaction_type.as_str()));
    if let Some(category_id) = query.category_id {
        cond = cond.add(Expr::col(Transactions::CategoryId).eq(id(category_id)));
    }
    if let Some(start) = query.start_date {
        cond = cond.add(Expr::col(Transactions::Date).gte(date(&start)));
    }
    if let Some(end) = query.end_date {
        cond = cond.add(Expr::col(Transactions::Date).lte(date(&end)));
    }
    cond
}

// ── CRUD ───────────────────────────────────────────────────────────────────

pub fn insert(d: Dialect, t: &Transaction) -> Result<Built, ValidationError> {
    let cents = money::to_cents(t.amount)?;
    Ok(Query::insert()
        .into_table(Transactions::Table)
        .columns(COLUMNS)
        .values_panic([
            id(t.id).into(),
            id(t.family_id).into(),
            id(t.user_id).into(),
            id(t.category_id).into(),
            cents.into(),
            t.transaction_type.as_str().into(),
            t.description.as_str().into(),
            date(&t.date).into(),
            encode_tags(&t.tags).into(),
            ts(&t.created_at).into(),
            ts(&t.updated_at).into(),
        ])
        .build_any(d.builder()))
}

pub fn get_by_id(d: Dialect, transaction_id: Uuid) -> Built {
    select()
        .and_where(Expr::col(Transactions::Id).eq(id(transaction_id)))
        .build_any(d.builder())
}

/// Filtered page of a family's transactions, newest first.
pub fn list(
    d: Dialect,
    family_id: Uuid,
    filter: &TransactionFilter,
) -> Result<Built, ValidationError> {
    let mut q = select();
    q.and_where(Expr::col(Transactions::FamilyId).eq(id(family_id)));
    if let Some(user_id) = filter.user_id {
        q.and_where(Expr::col(Transactions::UserId).eq(id(user_id)));
    }
    if let Some(category_id) = filter.category_id {
        q.and_where(Expr::col(Transactions::CategoryId).eq(id(category_id)));
    }
    if let Some(t) = filter.transaction_type {
        q.and_where(Expr::col(Transactions::TransactionType).eq(t.as_str()));
    }
    if let Some(start) = filter.start_date {
        q.and_where(Expr::col(Transactions::Date).gte(date(&start)));
    }
    if let Some(end) = filter.end_date {
        q.and_where(Expr::col(Transactions::Date).lte(date(&end)));
    }
    if let Some(min) = filter.min_amount {
        q.and_where(Expr::col(Transactions::AmountCents).gte(money::to_cents(min)?));
    }
    if let Some(max) = filter.max_amount {
        q.and_where(Expr::col(Transactions::AmountCents).lte(money::to_cents(max)?));
    }
    Ok(q
        .order_by(Transactions::Date, Order::Desc)
        .order_by(Transactions::CreatedAt, Order::Desc)
        .order_by(Transactions::Id, Order::Asc)
        .limit(u64::from(filter.effective_limit()))
        .offset(u64::from(filter.effective_offset()))
        .build_any(d.builder()))
}

pub fn update(d: Dialect, t: &Transaction) -> Result<Built, ValidationError> {
    let cents = money::to_cents(t.amount)?;
    Ok(Query::update()
        .table(Transactions::Table)
        .value(Transactions::UserId, id(t.user_id))
        .value(Transactions::CategoryId, id(t.category_id))
        .value(Transactions::AmountCents, cents)
        .value(Transactions::TransactionType, t.transaction_type.as_str())
        .value(Transactions::Description, t.description.as_str())
        .value(Transactions::Date, date(&t.date))
        .value(Transactions::Tags, encode_tags(&t.tags))
        .value(Transactions::UpdatedAt, ts(&t.updated_at))
        .and_where(Expr::col(Transactions::Id).eq(id(t.id)))
        .build_any(d.builder()))
}

pub fn delete(d: Dialect, transaction_id: Uuid) -> Built {
    Query::delete()
        .from_table(Transactions::Table)
        .and_where(Expr::col(Transactions::Id).eq(id(transaction_id)))
        .build_any(d.builder())
}

pub fn count(d: Dialect, family_id: Uuid) -> Built {
    Query::select()
        .expr_as(count_all(), Alias::new("count"))
        .from(Transactions::Table)
        .and_where(Expr::col(Transactions::FamilyId).eq(id(family_id)))
        .build_any(d.builder())
}

// ── Aggregates ─────────────────────────────────────────────────────────────

/// `total` in cents; zero when nothing matches.
pub fn sum(d: Dialect, family_id: Uuid, query: &AmountQuery) -> Built {
    Query::select()
        .expr_as(sum_cents(), Alias::new("total"))
        .from(Transactions::Table)
        .cond_where(amount_cond(family_id, query))
        .build_any(d.builder())
}

/// `(category_id, total, count)` rows, largest total first.
pub fn totals_by_category(d: Dialect, family_id: Uuid, query: &AmountQuery) -> Built {
    Query::select()
        .column(Transactions::CategoryId)
        .expr_as(sum_cents(), Alias::new("total"))
        .expr_as(count_all(), Alias::new("count"))
        .from(Transactions::Table)
        .cond_where(amount_cond(family_id, query))
        .group_by_col(Transactions::CategoryId)
        .order_by_expr(Expr::cust("total"), Order::Desc)
        .order_by(Transactions::CategoryId, Order::Asc)
        .build_any(d.builder())
}
