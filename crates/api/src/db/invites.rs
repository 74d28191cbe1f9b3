//! Invite query builders.
//!
//! State transitions are conditional single-row updates guarded by
//! `status = 'pending'`; a zero row count means the invite is unknown or
//! already terminal.

use chrono::{DateTime, Utc};
use sea_query::{Expr, Order, Query, SelectStatement};
use uuid::Uuid;

use famledger_core::{Invite, InviteStatus};

use super::tables::Invites;
use super::{Built, Dialect, id, opt_id, opt_ts, ts};

pub const COLUMNS: [Invites; 12] = [
    Invites::Id,
    Invites::FamilyId,
    Invites::CreatedBy,
    Invites::Email,
    Invites::Role,
    Invites::Token,
    Invites::Status,
    Invites::ExpiresAt,
    Invites::AcceptedAt,
    Invites::AcceptedBy,
    Invites::CreatedAt,
    Invites::UpdatedAt,
];

fn select() -> SelectStatement {
    Query::select().columns(COLUMNS).from(Invites::Table).to_owned()
}

fn pending() -> sea_query::SimpleExpr {
    Expr::col(Invites::Status).eq(InviteStatus::Pending.as_str())
}

// ── Reads ──────────────────────────────────────────────────────────────────

pub fn insert(d: Dialect, i: &Invite) -> Built {
    Query::insert()
        .into_table(Invites::Table)
        .columns(COLUMNS)
        .values_panic([
            id(i.id).into(),
            id(i.family_id).into(),
            id(i.created_by).into(),
            i.email.as_str().into(),
            i.role.as_str().into(),
            i.token.as_str().into(),
            i.status.as_str().into(),
            ts(&i.expires_at).into(),
            opt_ts(i.accepted_at.as_ref()).into(),
            opt_id(i.accepted_by).into(),
            ts(&i.created_at).into(),
            ts(&i.updated_at).into(),
        ])
        .build_any(d.builder())
}

pub fn get_by_id(d: Dialect, invite_id: Uuid) -> Built {
    select()
        .and_where(Expr::col(Invites::Id).eq(id(invite_id)))
        .build_any(d.builder())
}

pub fn get_by_token(d: Dialect, token: &str) -> Built {
    select()
        .and_where(Expr::col(Invites::Token).eq(token))
        .build_any(d.builder())
}

/// Every invite of a family, newest first.
pub fn list_by_family(d: Dialect, family_id: Uuid) -> Built {
    select()
        .and_where(Expr::col(Invites::FamilyId).eq(id(family_id)))
        .order_by(Invites::CreatedAt, Order::Desc)
        .order_by(Invites::Id, Order::Asc)
        .build_any(d.builder())
}

pub fn list_pending_by_email(d: Dialect, email: &str) -> Built {
    select()
        .and_where(Expr::col(Invites::Email).eq(email))
        .and_where(pending())
        .order_by(Invites::CreatedAt, Order::Desc)
        .build_any(d.builder())
}

// ── Transitions ────────────────────────────────────────────────────────────

/// `pending → accepted`, stamping who and when.
pub fn accept(d: Dialect, invite_id: Uuid, user_id: Uuid, at: &DateTime<Utc>) -> Built {
    Query::update()
        .table(Invites::Table)
        .value(Invites::Status, InviteStatus::Accepted.as_str())
        .value(Invites::AcceptedBy, id(user_id))
        .value(Invites::AcceptedAt, ts(at))
        .value(Invites::UpdatedAt, ts(at))
        .and_where(Expr::col(Invites::Id).eq(id(invite_id)))
        .and_where(pending())
        .build_any(d.builder())
}

/// `pending → revoked`.
pub fn revoke(d: Dialect, invite_id: Uuid, at: &DateTime<Utc>) -> Built {
    Query::update()
        .table(Invites::Table)
        .value(Invites::Status, InviteStatus::Revoked.as_str())
        .value(Invites::UpdatedAt, ts(at))
        .and_where(Expr::col(Invites::Id).eq(id(invite_id)))
        .and_where(pending())
        .build_any(d.builder())
}

/// `pending → expired` for everything past `expires_at`, in one statement.
pub fn mark_expired(d: Dialect, now: &DateTime<Utc>) -> Built {
    Query::update()
        .table(Invites::Table)
        .value(Invites::Status, InviteStatus::Expired.as_str())
        .value(Invites::UpdatedAt, ts(now))
        .and_where(pending())
        .and_where(Expr::col(Invites::ExpiresAt).lt(ts(now)))
        .build_any(d.builder())
}

// ── Deletes ────────────────────────────────────────────────────────────────

pub fn delete(d: Dialect, invite_id: Uuid) -> Built {
    Query::delete()
        .from_table(Invites::Table)
        .and_where(Expr::col(Invites::Id).eq(id(invite_id)))
        .build_any(d.builder())
}

/// Terminal invites whose last transition happened before `before`.
pub fn purge_terminal(d: Dialect, before: &DateTime<Utc>) -> Built {
    Query::delete()
        .from_table(Invites::Table)
        .and_where(Expr::col(Invites::Status).ne(InviteStatus::Pending.as_str()))
        .and_where(Expr::col(Invites::UpdatedAt).lt(ts(before)))
        .build_any(d.builder())
}
