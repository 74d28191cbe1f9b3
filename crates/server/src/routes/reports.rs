use axum::{Json, extract::State, http::StatusCode};
use uuid::Uuid;

use famledger_api::service::{Repositories, reports};
use famledger_api::{GenerateReportRequest, ListReportsResponse, OkResponse, Report};

use crate::error::ApiErr;
use crate::extract::{ApiJson, ApiPath, AuthUser};
use crate::routes::{created, ok};

pub async fn list_reports(
    State(repos): State<Repositories>,
    AuthUser(caller): AuthUser,
) -> Result<Json<ListReportsResponse>, ApiErr> {
    let reports = reports::list_reports(&repos, &caller).await?;
    Ok(Json(ListReportsResponse { reports }))
}

/// POST /api/reports — aggregate the range now and store the result.
pub async fn generate_report(
    State(repos): State<Repositories>,
    AuthUser(caller): AuthUser,
    ApiJson(req): ApiJson<GenerateReportRequest>,
) -> Result<(StatusCode, Json<Report>), ApiErr> {
    Ok(created(reports::generate_report(&repos, &caller, req).await?))
}

pub async fn get_report(
    State(repos): State<Repositories>,
    AuthUser(caller): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<Report>, ApiErr> {
    Ok(Json(reports::get_report(&repos, &caller, id).await?))
}

pub async fn delete_report(
    State(repos): State<Repositories>,
    AuthUser(caller): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<OkResponse>, ApiErr> {
    reports::delete_report(&repos, &caller, id).await?;
    Ok(ok())
}
