//! User query builders.

use chrono::{DateTime, Utc};
use sea_query::{Alias, Expr, Order, Query, SelectStatement};
use uuid::Uuid;

use famledger_core::User;

use super::tables::Users;
use super::{Built, Dialect, count_all, id, opt_ts, ts};

pub const COLUMNS: [Users; 11] = [
    Users::Id,
    Users::Email,
    Users::PasswordHash,
    Users::FirstName,
    Users::LastName,
    Users::Role,
    Users::FamilyId,
    Users::IsActive,
    Users::LastLogin,
    Users::CreatedAt,
    Users::UpdatedAt,
];

fn select() -> SelectStatement {
    Query::select().columns(COLUMNS).from(Users::Table).to_owned()
}

// ── Lookups ────────────────────────────────────────────────────────────────

pub fn insert(d: Dialect, u: &User) -> Built {
    Query::insert()
        .into_table(Users::Table)
        .columns(COLUMNS)
        .values_panic([
            id(u.id).into(),
            u.email.as_str().into(),
            u.password_hash.as_str().into(),
            u.first_name.as_str().into(),
            u.last_name.as_str().into(),
            u.role.as_str().into(),
            id(u.family_id).into(),
            u.is_active.into(),
            opt_ts(u.last_login.as_ref()).into(),
            ts(&u.created_at).into(),
            ts(&u.updated_at).into(),
        ])
        .build_any(d.builder())
}

/// Find a user by id, active or not.
pub fn get_by_id(d: Dialect, user_id: Uuid) -> Built {
    select()
        .and_where(Expr::col(Users::Id).eq(id(user_id)))
        .build_any(d.builder())
}

/// Find the active user holding `email` (already case-folded).
pub fn get_active_by_email(d: Dialect, email: &str) -> Built {
    select()
        .and_where(Expr::col(Users::Email).eq(email))
        .and_where(Expr::col(Users::IsActive).eq(true))
        .build_any(d.builder())
}

/// Active members of a family, oldest first.
pub fn list_active_by_family(d: Dialect, family_id: Uuid) -> Built {
    select()
        .and_where(Expr::col(Users::FamilyId).eq(id(family_id)))
        .and_where(Expr::col(Users::IsActive).eq(true))
        .order_by(Users::CreatedAt, Order::Asc)
        .order_by(Users::Id, Order::Asc)
        .build_any(d.builder())
}

pub fn count_active(d: Dialect, family_id: Uuid) -> Built {
    Query::select()
        .expr_as(count_all(), Alias::new("count"))
        .from(Users::Table)
        .and_where(Expr::col(Users::FamilyId).eq(id(family_id)))
        .and_where(Expr::col(Users::IsActive).eq(true))
        .build_any(d.builder())
}

// ── Updates ────────────────────────────────────────────────────────────────

/// Rewrite every mutable column. `family_id`, `created_at` and `last_login`
/// are left alone.
pub fn update(d: Dialect, u: &User) -> Built {
    Query::update()
        .table(Users::Table)
        .value(Users::Email, u.email.as_str())
        .value(Users::PasswordHash, u.password_hash.as_str())
        .value(Users::FirstName, u.first_name.as_str())
        .value(Users::LastName, u.last_name.as_str())
        .value(Users::Role, u.role.as_str())
        .value(Users::IsActive, u.is_active)
        .value(Users::UpdatedAt, ts(&u.updated_at))
        .and_where(Expr::col(Users::Id).eq(id(u.id)))
        .build_any(d.builder())
}

/// Soft delete.
pub fn deactivate(d: Dialect, user_id: Uuid, at: &DateTime<Utc>) -> Built {
    Query::update()
        .table(Users::Table)
        .value(Users::IsActive, false)
        .value(Users::UpdatedAt, ts(at))
        .and_where(Expr::col(Users::Id).eq(id(user_id)))
        .and_where(Expr::col(Users::IsActive).eq(true))
        .build_any(d.builder())
}

pub fn touch_last_login(d: Dialect, user_id: Uuid, at: &DateTime<Utc>) -> Built {
    Query::update()
        .table(Users::Table)
        .value(Users::LastLogin, ts(at))
        .and_where(Expr::col(Users::Id).eq(id(user_id)))
        .build_any(d.builder())
}
