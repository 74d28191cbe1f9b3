//! Report query builders. `data` is stored as JSON text.

use sea_query::{Expr, Order, Query, SelectStatement};
use uuid::Uuid;

use famledger_core::Report;

use super::tables::Reports;
use super::{Built, Dialect, date, id, ts};

pub const COLUMNS: [Reports; 10] = [
    Reports::Id,
    Reports::FamilyId,
    Reports::UserId,
    Reports::Name,
    Reports::ReportType,
    Reports::Period,
    Reports::StartDate,
    Reports::EndDate,
    Reports::Data,
    Reports::GeneratedAt,
];

fn select() -> SelectStatement {
    Query::select().columns(COLUMNS).from(Reports::Table).to_owned()
}

/// `data_json` is the serialized `report.data`.
pub fn insert(d: Dialect, r: &Report, data_json: &str) -> Built {
    Query::insert()
        .into_table(Reports::Table)
        .columns(COLUMNS)
        .values_panic([
            id(r.id).into(),
            id(r.family_id).into(),
            id(r.user_id).into(),
            r.name.as_str().into(),
            r.report_type.as_str().into(),
            r.period.as_str().into(),
            date(&r.start_date).into(),
            date(&r.end_date).into(),
            data_json.into(),
            ts(&r.generated_at).into(),
        ])
        .build_any(d.builder())
}

pub fn get_by_id(d: Dialect, report_id: Uuid) -> Built {
    select()
        .and_where(Expr::col(Reports::Id).eq(id(report_id)))
        .build_any(d.builder())
}

/// Newest first.
pub fn list_by_family(d: Dialect, family_id: Uuid) -> Built {
    select()
        .and_where(Expr::col(Reports::FamilyId).eq(id(family_id)))
        .order_by(Reports::GeneratedAt, Order::Desc)
        .order_by(Reports::Id, Order::Asc)
        .build_any(d.builder())
}

pub fn delete(d: Dialect, report_id: Uuid) -> Built {
    Query::delete()
        .from_table(Reports::Table)
        .and_where(Expr::col(Reports::Id).eq(id(report_id)))
        .build_any(d.builder())
}
