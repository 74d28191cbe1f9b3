use std::sync::Arc;

use axum::{Json, extract::State, http::StatusCode};

use famledger_api::service::{Repositories, ServiceConfig, auth};
use famledger_api::{
    AuthTokenResponse, LoginRequest, MeResponse, RegisterFamilyRequest, RegisterFamilyResponse,
};

use crate::error::ApiErr;
use crate::extract::{ApiJson, AuthUser};
use crate::routes::created;

/// POST /api/families — create a family and its first admin.
pub async fn register_family(
    State(repos): State<Repositories>,
    State(config): State<Arc<ServiceConfig>>,
    ApiJson(req): ApiJson<RegisterFamilyRequest>,
) -> Result<(StatusCode, Json<RegisterFamilyResponse>), ApiErr> {
    Ok(created(auth::register_family(&repos, &config, req).await?))
}

/// POST /api/auth/login
pub async fn login(
    State(repos): State<Repositories>,
    State(config): State<Arc<ServiceConfig>>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> Result<Json<AuthTokenResponse>, ApiErr> {
    Ok(Json(auth::login(&repos, &config, req).await?))
}

/// GET /api/auth/me
pub async fn me(
    State(repos): State<Repositories>,
    AuthUser(caller): AuthUser,
) -> Result<Json<MeResponse>, ApiErr> {
    Ok(Json(auth::me(&repos, &caller).await?))
}
