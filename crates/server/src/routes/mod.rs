pub mod auth;
pub mod budgets;
pub mod categories;
pub mod family;
pub mod health;
pub mod invites;
pub mod reports;
pub mod transactions;
pub mod users;

use axum::{Json, http::StatusCode};

use famledger_api::OkResponse;

pub(crate) fn created<T>(body: T) -> (StatusCode, Json<T>) {
    (StatusCode::CREATED, Json(body))
}

pub(crate) fn ok() -> Json<OkResponse> {
    Json(OkResponse { ok: true })
}
