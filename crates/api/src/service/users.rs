//! Family member management.

use uuid::Uuid;

use famledger_core::{User, validate};

use super::{Caller, Repositories, ServiceConfig, owned, parse_enum};
use crate::{CreateUserRequest, ServiceError, UpdateUserRequest, crypto};

pub async fn list_users(repos: &Repositories, caller: &Caller) -> Result<Vec<User>, ServiceError> {
    Ok(repos.users.get_by_family(caller.family_id).await?)
}

pub async fn get_user(repos: &Repositories, caller: &Caller, id: Uuid) -> Result<User, ServiceError> {
    let user = repos.users.get_by_id(id).await?;
    if !user.is_active {
        return Err(ServiceError::NotFound("user not found".into()));
    }
    owned(caller, user.family_id, user, "user")
}

/// Admins add members directly, without an invite.
pub async fn create_user(
    repos: &Repositories,
    cfg: &ServiceConfig,
    caller: &Caller,
    req: CreateUserRequest,
) -> Result<User, ServiceError> {
    caller.require_admin()?;
    validate::validate_password(&req.password)?;
    let role = parse_enum(&req.role)?;
    let mut user = User::new(
        caller.family_id,
        req.email,
        crypto::hash_password(&req.password, cfg.password_iterations)?,
        req.first_name,
        req.last_name,
        role,
    );
    repos.users.create(&mut user).await?;
    tracing::info!(user_id = %user.id, family_id = %user.family_id, "user created");
    Ok(user)
}

/// Users edit their own profile; admins edit anyone in the family. Only
/// admins change roles, and never their own.
pub async fn update_user(
    repos: &Repositories,
    cfg: &ServiceConfig,
    caller: &Caller,
    id: Uuid,
    req: UpdateUserRequest,
) -> Result<User, ServiceError> {
    if id != caller.user_id {
        caller.require_admin()?;
    }
    let mut user = get_user(repos, caller, id).await?;

    if let Some(role) = req.role {
        let role = parse_enum(&role)?;
        if role != user.role {
            caller.require_admin()?;
            if id == caller.user_id {
                return Err(ServiceError::BadRequest("cannot change your own role".into()));
            }
            user.role = role;
        }
    }
    if let Some(email) = req.email {
        user.email = email;
    }
    if let Some(first_name) = req.first_name {
        user.first_name = first_name;
    }
    if let Some(last_name) = req.last_name {
        user.last_name = last_name;
    }
    if let Some(password) = req.password {
        validate::validate_password(&password)?;
        user.password_hash = crypto::hash_password(&password, cfg.password_iterations)?;
    }
    repos.users.update(&mut user).await?;
    Ok(user)
}

/// Soft delete. Admins cannot remove themselves.
pub async fn delete_user(repos: &Repositories, caller: &Caller, id: Uuid) -> Result<(), ServiceError> {
    caller.require_admin()?;
    if id == caller.user_id {
        return Err(ServiceError::BadRequest("cannot delete yourself".into()));
    }
    let user = get_user(repos, caller, id).await?;
    repos.users.delete(user.id).await?;
    tracing::info!(user_id = %id, by = %caller.user_id, "user deactivated");
    Ok(())
}
