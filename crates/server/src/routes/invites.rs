use std::sync::Arc;

use axum::{Json, extract::State, http::StatusCode};
use uuid::Uuid;

use famledger_api::service::{Repositories, ServiceConfig, invites};
use famledger_api::{
    AcceptInviteRequest, AcceptInviteResponse, CreateInviteRequest, Invite, InvitePreview,
    ListInvitesResponse, SweepResponse,
};

use crate::error::ApiErr;
use crate::extract::{ApiJson, ApiPath, AuthUser};
use crate::routes::created;

pub async fn list_invites(
    State(repos): State<Repositories>,
    AuthUser(caller): AuthUser,
) -> Result<Json<ListInvitesResponse>, ApiErr> {
    let invites = invites::list_invites(&repos, &caller).await?;
    Ok(Json(ListInvitesResponse { invites }))
}

pub async fn create_invite(
    State(repos): State<Repositories>,
    State(config): State<Arc<ServiceConfig>>,
    AuthUser(caller): AuthUser,
    ApiJson(req): ApiJson<CreateInviteRequest>,
) -> Result<(StatusCode, Json<Invite>), ApiErr> {
    Ok(created(invites::create_invite(&repos, &config, &caller, req).await?))
}

/// DELETE /api/invites/{id} — revoke a pending invite.
pub async fn revoke_invite(
    State(repos): State<Repositories>,
    AuthUser(caller): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<Invite>, ApiErr> {
    Ok(Json(invites::revoke_invite(&repos, &caller, id).await?))
}

/// POST /api/invites/sweep — expire overdue invites now (admin).
pub async fn sweep(
    State(repos): State<Repositories>,
    AuthUser(caller): AuthUser,
) -> Result<Json<SweepResponse>, ApiErr> {
    caller.require_admin()?;
    let expired = invites::sweep_invites(&repos).await?;
    Ok(Json(SweepResponse { expired }))
}

/// GET /api/invites/token/{token} — public.
pub async fn preview_invite(
    State(repos): State<Repositories>,
    ApiPath(token): ApiPath<String>,
) -> Result<Json<InvitePreview>, ApiErr> {
    Ok(Json(invites::preview_invite(&repos, &token).await?))
}

/// POST /api/invites/token/{token}/accept — public; creates the account.
pub async fn accept_invite(
    State(repos): State<Repositories>,
    State(config): State<Arc<ServiceConfig>>,
    ApiPath(token): ApiPath<String>,
    ApiJson(req): ApiJson<AcceptInviteRequest>,
) -> Result<(StatusCode, Json<AcceptInviteResponse>), ApiErr> {
    Ok(created(invites::accept_invite(&repos, &config, &token, req).await?))
}
