use axum::{Json, extract::State};

use famledger_api::service::{Repositories, family};
use famledger_api::{Family, FamilyStatistics, OkResponse, UpdateFamilyRequest};

use crate::error::ApiErr;
use crate::extract::{ApiJson, AuthUser};
use crate::routes::ok;

pub async fn get_family(
    State(repos): State<Repositories>,
    AuthUser(caller): AuthUser,
) -> Result<Json<Family>, ApiErr> {
    Ok(Json(family::get_family(&repos, &caller).await?))
}

pub async fn update_family(
    State(repos): State<Repositories>,
    AuthUser(caller): AuthUser,
    ApiJson(req): ApiJson<UpdateFamilyRequest>,
) -> Result<Json<Family>, ApiErr> {
    Ok(Json(family::update_family(&repos, &caller, req).await?))
}

/// DELETE /api/family — removes the family and all of its data.
pub async fn delete_family(
    State(repos): State<Repositories>,
    AuthUser(caller): AuthUser,
) -> Result<Json<OkResponse>, ApiErr> {
    family::delete_family(&repos, &caller).await?;
    Ok(ok())
}

pub async fn stats(
    State(repos): State<Repositories>,
    AuthUser(caller): AuthUser,
) -> Result<Json<FamilyStatistics>, ApiErr> {
    Ok(Json(family::statistics(&repos, &caller).await?))
}
