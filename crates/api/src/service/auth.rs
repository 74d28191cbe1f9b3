//! Registration, login and bearer-token resolution.

use chrono::{DateTime, Utc};

use famledger_core::{Family, Role, User, clock, validate};

use super::{Caller, Repositories, ServiceConfig, unix_secs};
use crate::{
    AuthTokenResponse, LoginRequest, MeResponse, RegisterFamilyRequest, RegisterFamilyResponse,
    ServiceError, crypto,
};

const BAD_CREDENTIALS: &str = "invalid email or password";

/// Sign an access token for `user`.
pub fn issue_token(cfg: &ServiceConfig, user: &User, now: DateTime<Utc>) -> AuthTokenResponse {
    AuthTokenResponse {
        access_token: crypto::sign_jwt(user.id, &cfg.jwt_secret, unix_secs(now), cfg.jwt_ttl_secs),
        token_type: "Bearer".to_string(),
        expires_in: cfg.jwt_ttl_secs,
        user_id: user.id,
        family_id: user.family_id,
        role: user.role.to_string(),
    }
}

/// Create a family together with its first admin.
pub async fn register_family(
    repos: &Repositories,
    cfg: &ServiceConfig,
    req: RegisterFamilyRequest,
) -> Result<RegisterFamilyResponse, ServiceError> {
    validate::validate_password(&req.password)?;
    if cfg.single_family && repos.families.get_primary().await?.is_some() {
        return Err(ServiceError::Conflict(
            "a family is already registered on this server".into(),
        ));
    }

    let mut family = Family::new(req.family_name, req.currency);
    family.sanitize()?;
    let mut user = User::new(
        family.id,
        req.email,
        crypto::hash_password(&req.password, cfg.password_iterations)?,
        req.first_name,
        req.last_name,
        Role::Admin,
    );
    user.sanitize()?;

    repos.families.create(&mut family).await?;
    if let Err(e) = repos.users.create(&mut user).await {
        // The family has no admin; drop it again.
        if let Err(cleanup) = repos.families.delete(family.id).await {
            tracing::warn!(family_id = %family.id, "failed to roll back family: {cleanup}");
        }
        return Err(e.into());
    }

    tracing::info!(family_id = %family.id, user_id = %user.id, "family registered");
    let auth = issue_token(cfg, &user, clock::now());
    Ok(RegisterFamilyResponse { family, user, auth })
}

/// Check credentials, stamp `last_login` and issue a token.
pub async fn login(
    repos: &Repositories,
    cfg: &ServiceConfig,
    req: LoginRequest,
) -> Result<AuthTokenResponse, ServiceError> {
    let email = validate::validate_email(&req.email)
        .map_err(|_| ServiceError::Unauthorized(BAD_CREDENTIALS.into()))?;
    let mut user = match repos.users.get_by_email(&email).await {
        Ok(user) => user,
        Err(e) if e.is_not_found() => {
            return Err(ServiceError::Unauthorized(BAD_CREDENTIALS.into()));
        }
        Err(e) => return Err(e.into()),
    };
    if !crypto::verify_password(&req.password, &user.password_hash) {
        return Err(ServiceError::Unauthorized(BAD_CREDENTIALS.into()));
    }

    let now = clock::now();
    repos.users.update_last_login(user.id, now).await?;
    user.last_login = Some(now);
    tracing::debug!(user_id = %user.id, "login");
    Ok(issue_token(cfg, &user, now))
}

/// Resolve a bearer token to the active user it was issued for.
pub async fn authenticate(
    repos: &Repositories,
    cfg: &ServiceConfig,
    token: &str,
) -> Result<Caller, ServiceError> {
    if cfg.jwt_secret.is_empty() {
        return Err(ServiceError::Unauthorized(
            "JWT authentication not configured".into(),
        ));
    }
    let user_id = crypto::verify_jwt(token, &cfg.jwt_secret, unix_secs(clock::now()))?;
    let user = match repos.users.get_by_id(user_id).await {
        Ok(user) => user,
        Err(e) if e.is_not_found() => {
            return Err(ServiceError::Unauthorized("unknown user".into()));
        }
        Err(e) => return Err(e.into()),
    };
    if !user.is_active {
        return Err(ServiceError::Unauthorized("account is deactivated".into()));
    }
    Ok(Caller::of(&user))
}

pub async fn me(repos: &Repositories, caller: &Caller) -> Result<MeResponse, ServiceError> {
    let user = repos.users.get_by_id(caller.user_id).await?;
    let family = repos.families.get_by_id(caller.family_id).await?;
    Ok(MeResponse { user, family })
}

#[cfg(test)]
mod tests {
    use super::*;
    use famledger_core::testing;

    #[test]
    fn issued_tokens_verify() {
        let cfg = ServiceConfig {
            jwt_secret: "test-secret".into(),
            ..Default::default()
        };
        let family = testing::family();
        let user = testing::user(&family, "ann", Role::Member);
        let now = clock::now();
        let auth = issue_token(&cfg, &user, now);
        assert_eq!(auth.token_type, "Bearer");
        assert_eq!(auth.role, "member");
        assert_eq!(auth.family_id, family.id);
        let sub = crypto::verify_jwt(&auth.access_token, "test-secret", unix_secs(now)).unwrap();
        assert_eq!(sub, user.id);
    }
}
