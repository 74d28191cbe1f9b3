//! Family query builders.

use sea_query::{Expr, Order, Query, SelectStatement};
use uuid::Uuid;

use famledger_core::Family;

use super::tables::Families;
use super::{Built, Dialect, id, ts};

pub const COLUMNS: [Families; 5] = [
    Families::Id,
    Families::Name,
    Families::Currency,
    Families::CreatedAt,
    Families::UpdatedAt,
];

fn select() -> SelectStatement {
    Query::select().columns(COLUMNS).from(Families::Table).to_owned()
}

pub fn insert(d: Dialect, f: &Family) -> Built {
    Query::insert()
        .into_table(Families::Table)
        .columns(COLUMNS)
        .values_panic([
            id(f.id).into(),
            f.name.as_str().into(),
            f.currency.as_str().into(),
            ts(&f.created_at).into(),
            ts(&f.updated_at).into(),
        ])
        .build_any(d.builder())
}

pub fn get_by_id(d: Dialect, family_id: Uuid) -> Built {
    select()
        .and_where(Expr::col(Families::Id).eq(id(family_id)))
        .build_any(d.builder())
}

/// The oldest family; ties broken by id so every backend agrees.
pub fn get_primary(d: Dialect) -> Built {
    select()
        .order_by(Families::CreatedAt, Order::Asc)
        .order_by(Families::Id, Order::Asc)
        .limit(1)
        .build_any(d.builder())
}

pub fn update(d: Dialect, f: &Family) -> Built {
    Query::update()
        .table(Families::Table)
        .value(Families::Name, f.name.as_str())
        .value(Families::Currency, f.currency.as_str())
        .value(Families::UpdatedAt, ts(&f.updated_at))
        .and_where(Expr::col(Families::Id).eq(id(f.id)))
        .build_any(d.builder())
}

/// Hard delete. Everything the family owns goes with it (`ON DELETE CASCADE`).
pub fn delete(d: Dialect, family_id: Uuid) -> Built {
    Query::delete()
        .from_table(Families::Table)
        .and_where(Expr::col(Families::Id).eq(id(family_id)))
        .build_any(d.builder())
}
