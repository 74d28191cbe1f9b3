//! Budget query builders.

use chrono::NaiveDate;
use sea_query::{Alias, Expr, Order, Query, SelectStatement};
use uuid::Uuid;

use famledger_core::{Budget, ValidationError, money};

use super::tables::Budgets;
use super::{Built, Dialect, count_all, date, id, opt_id, ts};

pub const COLUMNS: [Budgets; 11] = [
    Budgets::Id,
    Budgets::FamilyId,
    Budgets::CategoryId,
    Budgets::Name,
    Budgets::AmountCents,
    Budgets::Period,
    Budgets::StartDate,
    Budgets::EndDate,
    Budgets::IsActive,
    Budgets::CreatedAt,
    Budgets::UpdatedAt,
];

fn select() -> SelectStatement {
    Query::select().columns(COLUMNS).from(Budgets::Table).to_owned()
}

pub fn insert(d: Dialect, b: &Budget) -> Result<Built, ValidationError> {
    let cents = money::to_cents(b.amount)?;
    Ok(Query::insert()
        .into_table(Budgets::Table)
        .columns(COLUMNS)
        .values_panic([
            id(b.id).into(),
            id(b.family_id).into(),
            opt_id(b.category_id).into(),
            b.name.as_str().into(),
            cents.into(),
            b.period.as_str().into(),
            date(&b.start_date).into(),
            date(&b.end_date).into(),
            b.is_active.into(),
            ts(&b.created_at).into(),
            ts(&b.updated_at).into(),
        ])
        .build_any(d.builder()))
}

pub fn get_by_id(d: Dialect, budget_id: Uuid) -> Built {
    select()
        .and_where(Expr::col(Budgets::Id).eq(id(budget_id)))
        .build_any(d.builder())
}

/// All budgets of a family, most recent period first.
pub fn list_by_family(d: Dialect, family_id: Uuid) -> Built {
    select()
        .and_where(Expr::col(Budgets::FamilyId).eq(id(family_id)))
        .order_by(Budgets::StartDate, Order::Desc)
        .order_by(Budgets::Name, Order::Asc)
        .order_by(Budgets::Id, Order::Asc)
        .build_any(d.builder())
}

/// Active budgets whose `[start_date, end_date]` contains `on`.
pub fn list_active_on(d: Dialect, family_id: Uuid, on: &NaiveDate) -> Built {
    select()
        .and_where(Expr::col(Budgets::FamilyId).eq(id(family_id)))
        .and_where(Expr::col(Budgets::IsActive).eq(true))
        .and_where(Expr::col(Budgets::StartDate).lte(date(on)))
        .and_where(Expr::col(Budgets::EndDate).gte(date(on)))
        .order_by(Budgets::Name, Order::Asc)
        .order_by(Budgets::Id, Order::Asc)
        .build_any(d.builder())
}

pub fn count(d: Dialect, family_id: Uuid) -> Built {
    Query::select()
        .expr_as(count_all(), Alias::new("count"))
        .from(Budgets::Table)
        .and_where(Expr::col(Budgets::FamilyId).eq(id(family_id)))
        .build_any(d.builder())
}

pub fn update(d: Dialect, b: &Budget) -> Result<Built, ValidationError> {
    let cents = money::to_cents(b.amount)?;
    Ok(Query::update()
        .table(Budgets::Table)
        .value(Budgets::CategoryId, opt_id(b.category_id))
        .value(Budgets::Name, b.name.as_str())
        .value(Budgets::AmountCents, cents)
        .value(Budgets::Period, b.period.as_str())
        .value(Budgets::StartDate, date(&b.start_date))
        .value(Budgets::EndDate, date(&b.end_date))
        .value(Budgets::IsActive, b.is_active)
        .value(Budgets::UpdatedAt, ts(&b.updated_at))
        .and_where(Expr::col(Budgets::Id).eq(id(b.id)))
        .build_any(d.builder()))
}

pub fn delete(d: Dialect, budget_id: Uuid) -> Built {
    Query::delete()
        .from_table(Budgets::Table)
        .and_where(Expr::col(Budgets::Id).eq(id(budget_id)))
        .build_any(d.builder())
}
