//! Invite lifecycle: issue, list, revoke, preview, accept, sweep.

use chrono::Duration;
use uuid::Uuid;

use famledger_core::{Invite, InviteStatus, Role, User, clock, validate};

use super::{Caller, Repositories, ServiceConfig, auth, owned, parse_enum};
use crate::{
    AcceptInviteRequest, AcceptInviteResponse, CreateInviteRequest, InvitePreview, ServiceError,
    crypto,
};

/// Upper bound for a caller-chosen invite lifetime (30 days).
pub const MAX_INVITE_TTL_HOURS: u32 = 720;

pub async fn list_invites(repos: &Repositories, caller: &Caller) -> Result<Vec<Invite>, ServiceError> {
    caller.require_admin()?;
    Ok(repos.invites.get_by_family(caller.family_id).await?)
}

/// Issue an invite. Rejects addresses that already belong to an active user
/// and addresses with a live pending invite into the same family.
pub async fn create_invite(
    repos: &Repositories,
    cfg: &ServiceConfig,
    caller: &Caller,
    req: CreateInviteRequest,
) -> Result<Invite, ServiceError> {
    caller.require_admin()?;
    let email = validate::validate_email(&req.email)?;
    let role: Role = parse_enum(&req.role)?;
    let hours = req.expires_in_hours.unwrap_or(cfg.invite_ttl_hours);
    if hours == 0 || hours > MAX_INVITE_TTL_HOURS {
        return Err(ServiceError::BadRequest(format!(
            "expires_in_hours must be between 1 and {MAX_INVITE_TTL_HOURS}"
        )));
    }

    match repos.users.get_by_email(&email).await {
        Ok(_) => {
            return Err(ServiceError::Conflict(
                "a user with this email already exists".into(),
            ));
        }
        Err(e) if e.is_not_found() => {}
        Err(e) => return Err(e.into()),
    }

    let now = clock::now();
    let pending = repos.invites.get_pending_by_email(&email).await?;
    if pending
        .iter()
        .any(|i| i.family_id == caller.family_id && !i.is_expired_at(now))
    {
        return Err(ServiceError::Conflict(
            "an invite is already pending for this email".into(),
        ));
    }

    let mut invite = Invite::new(
        caller.family_id,
        caller.user_id,
        email,
        role,
        crypto::generate_token()?,
        now + Duration::hours(i64::from(hours)),
    );
    repos.invites.create(&mut invite).await?;
    tracing::info!(invite_id = %invite.id, family_id = %invite.family_id, "invite created");
    Ok(invite)
}

pub async fn revoke_invite(
    repos: &Repositories,
    caller: &Caller,
    id: Uuid,
) -> Result<Invite, ServiceError> {
    caller.require_admin()?;
    let invite = repos.invites.get_by_id(id).await?;
    owned(caller, invite.family_id, (), "invite")?;
    repos.invites.revoke(id, clock::now()).await?;
    Ok(repos.invites.get_by_id(id).await?)
}

/// Public lookup by token, shown before the invitee signs up.
pub async fn preview_invite(repos: &Repositories, token: &str) -> Result<InvitePreview, ServiceError> {
    let invite = repos.invites.get_by_token(token).await?;
    let family = repos.families.get_by_id(invite.family_id).await?;
    let invited_by = match repos.users.get_by_id(invite.created_by).await {
        Ok(user) => user.full_name(),
        Err(e) if e.is_not_found() => String::new(),
        Err(e) => return Err(e.into()),
    };
    Ok(InvitePreview {
        family_name: family.name,
        invited_by,
        email: invite.email,
        role: invite.role.to_string(),
        status: invite.status.to_string(),
        expires_at: invite.expires_at,
    })
}

/// Accept a pending invite: create the user in the invite's family with the
/// invite's role, then transition the invite.
pub async fn accept_invite(
    repos: &Repositories,
    cfg: &ServiceConfig,
    token: &str,
    req: AcceptInviteRequest,
) -> Result<AcceptInviteResponse, ServiceError> {
    let invite = repos.invites.get_by_token(token).await?;
    let now = clock::now();
    match invite.status {
        InviteStatus::Pending if invite.is_expired_at(now) => {
            return Err(ServiceError::Gone("invite has expired".into()));
        }
        InviteStatus::Pending => {}
        InviteStatus::Expired => return Err(ServiceError::Gone("invite has expired".into())),
        status => {
            return Err(ServiceError::Conflict(format!("invite is already {status}")));
        }
    }
    validate::validate_password(&req.password)?;

    let mut user = User::new(
        invite.family_id,
        invite.email.clone(),
        crypto::hash_password(&req.password, cfg.password_iterations)?,
        req.first_name,
        req.last_name,
        invite.role,
    );
    repos.users.create(&mut user).await?;

    if let Err(e) = repos.invites.accept(invite.id, user.id, now).await {
        // Lost a race with revoke/sweep/another accept.
        if let Err(cleanup) = repos.users.delete(user.id).await {
            tracing::warn!(user_id = %user.id, "failed to roll back invited user: {cleanup}");
        }
        return Err(e.into());
    }

    tracing::info!(invite_id = %invite.id, user_id = %user.id, "invite accepted");
    let auth = auth::issue_token(cfg, &user, now);
    Ok(AcceptInviteResponse { user, auth })
}

/// Expire every overdue pending invite. Returns how many were transitioned.
pub async fn sweep_invites(repos: &Repositories) -> Result<u64, ServiceError> {
    let expired = repos.invites.mark_expired_bulk(clock::now()).await?;
    if expired > 0 {
        tracing::info!(expired, "expired overdue invites");
    }
    Ok(expired)
}

/// Delete accepted, expired and revoked invites untouched for `retention`.
pub async fn purge_invites(repos: &Repositories, retention: Duration) -> Result<u64, ServiceError> {
    let purged = repos.invites.purge_terminal(clock::now() - retention).await?;
    if purged > 0 {
        tracing::info!(purged, "purged settled invites");
    }
    Ok(purged)
}
