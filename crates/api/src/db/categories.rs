//! Category query builders.

use chrono::{DateTime, Utc};
use sea_query::{Alias, Expr, Order, Query, SelectStatement};
use uuid::Uuid;

use famledger_core::{Category, CategoryType};

use super::tables::Categories;
use super::{Built, Dialect, count_all, id, opt_id, ts};

pub const COLUMNS: [Categories; 10] = [
    Categories::Id,
    Categories::FamilyId,
    Categories::Name,
    Categories::CategoryType,
    Categories::Color,
    Categories::Icon,
    Categories::ParentId,
    Categories::IsActive,
    Categories::CreatedAt,
    Categories::UpdatedAt,
];

fn select() -> SelectStatement {
    Query::select()
        .columns(COLUMNS)
        .from(Categories::Table)
        .to_owned()
}

pub fn insert(d: Dialect, c: &Category) -> Built {
    Query::insert()
        .into_table(Categories::Table)
        .columns(COLUMNS)
        .values_panic([
            id(c.id).into(),
            id(c.family_id).into(),
            c.name.as_str().into(),
            c.category_type.as_str().into(),
            c.color.as_str().into(),
            c.icon.as_str().into(),
            opt_id(c.parent_id).into(),
            c.is_active.into(),
            ts(&c.created_at).into(),
            ts(&c.updated_at).into(),
        ])
        .build_any(d.builder())
}

pub fn get_by_id(d: Dialect, category_id: Uuid) -> Built {
    select()
        .and_where(Expr::col(Categories::Id).eq(id(category_id)))
        .build_any(d.builder())
}

/// Active categories of a family, optionally of one type, by name.
pub fn list_active_by_family(
    d: Dialect,
    family_id: Uuid,
    category_type: Option<CategoryType>,
) -> Built {
    let mut q = select();
    q.and_where(Expr::col(Categories::FamilyId).eq(id(family_id)))
        .and_where(Expr::col(Categories::IsActive).eq(true));
    if let Some(t) = category_type {
        q.and_where(Expr::col(Categories::CategoryType).eq(t.as_str()));
    }
    q.order_by(Categories::Name, Order::Asc)
        .order_by(Categories::Id, Order::Asc)
        .build_any(d.builder())
}

pub fn count_active(d: Dialect, family_id: Uuid) -> Built {
    Query::select()
        .expr_as(count_all(), Alias::new("count"))
        .from(Categories::Table)
        .and_where(Expr::col(Categories::FamilyId).eq(id(family_id)))
        .and_where(Expr::col(Categories::IsActive).eq(true))
        .build_any(d.builder())
}

pub fn update(d: Dialect, c: &Category) -> Built {
    Query::update()
        .table(Categories::Table)
        .value(Categories::Name, c.name.as_str())
        .value(Categories::CategoryType, c.category_type.as_str())
        .value(Categories::Color, c.color.as_str())
        .value(Categories::Icon, c.icon.as_str())
        .value(Categories::ParentId, opt_id(c.parent_id))
        .value(Categories::IsActive, c.is_active)
        .value(Categories::UpdatedAt, ts(&c.updated_at))
        .and_where(Expr::col(Categories::Id).eq(id(c.id)))
        .build_any(d.builder())
}

/// Soft delete.
pub fn deactivate(d: Dialect, category_id: Uuid, at: &DateTime<Utc>) -> Built {
    Query::update()
        .table(Categories::Table)
        .value(Categories::IsActive, false)
        .value(Categories::UpdatedAt, ts(at))
        .and_where(Expr::col(Categories::Id).eq(id(category_id)))
        .and_where(Expr::col(Categories::IsActive).eq(true))
        .build_any(d.builder())
}
