use std::sync::Arc;

use axum::{Json, extract::State, http::StatusCode};
use uuid::Uuid;

use famledger_api::service::{Repositories, ServiceConfig, users};
use famledger_api::{CreateUserRequest, ListUsersResponse, OkResponse, UpdateUserRequest, User};

use crate::error::ApiErr;
use crate::extract::{ApiJson, ApiPath, AuthUser};
use crate::routes::{created, ok};

pub async fn list_users(
    State(repos): State<Repositories>,
    AuthUser(caller): AuthUser,
) -> Result<Json<ListUsersResponse>, ApiErr> {
    let users = users::list_users(&repos, &caller).await?;
    Ok(Json(ListUsersResponse { users }))
}

pub async fn create_user(
    State(repos): State<Repositories>,
    State(config): State<Arc<ServiceConfig>>,
    AuthUser(caller): AuthUser,
    ApiJson(req): ApiJson<CreateUserRequest>,
) -> Result<(StatusCode, Json<User>), ApiErr> {
    Ok(created(users::create_user(&repos, &config, &caller, req).await?))
}

pub async fn get_user(
    State(repos): State<Repositories>,
    AuthUser(caller): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<User>, ApiErr> {
    Ok(Json(users::get_user(&repos, &caller, id).await?))
}

pub async fn update_user(
    State(repos): State<Repositories>,
    State(config): State<Arc<ServiceConfig>>,
    AuthUser(caller): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<UpdateUserRequest>,
) -> Result<Json<User>, ApiErr> {
    Ok(Json(users::update_user(&repos, &config, &caller, id, req).await?))
}

/// DELETE /api/users/{id} — deactivates the user.
pub async fn delete_user(
    State(repos): State<Repositories>,
    AuthUser(caller): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<OkResponse>, ApiErr> {
    users::delete_user(&repos, &caller, id).await?;
    Ok(ok())
}
