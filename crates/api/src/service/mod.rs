//! Shared business logic: framework-agnostic async functions over
//! [`Repositories`].
//!
//! Handlers stay thin adapters: they authenticate, hand the [`Caller`] and
//! the request body to one of these functions and serialize the result.
//! Every function scopes reads and writes to the caller's family; an entity
//! of another family is reported as not found.

pub mod auth;
pub mod budgets;
pub mod categories;
pub mod family;
pub mod invites;
pub mod reports;
pub mod transactions;
pub mod users;

use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use famledger_core::{Role, User, clock, validate};

use crate::ServiceError;

pub use famledger_core::Repositories;

/// Knobs the services need from the server configuration.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub jwt_secret: String,
    pub jwt_ttl_secs: u64,
    pub password_iterations: u32,
    pub invite_ttl_hours: u32,
    /// Refuse to register a second family.
    pub single_family: bool,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            jwt_ttl_secs: 3600,
            password_iterations: crate::crypto::PBKDF2_ITERATIONS,
            invite_ttl_hours: 72,
            single_family: false,
        }
    }
}

/// The authenticated user a request acts for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller {
    pub user_id: Uuid,
    pub family_id: Uuid,
    pub role: Role,
}

impl Caller {
    pub fn of(user: &User) -> Self {
        Self {
            user_id: user.id,
            family_id: user.family_id,
            role: user.role,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn require_admin(&self) -> Result<(), ServiceError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(ServiceError::Forbidden("admin role required".into()))
        }
    }

    /// Admins and members manage categories, budgets and reports.
    pub fn require_manager(&self) -> Result<(), ServiceError> {
        match self.role {
            Role::Admin | Role::Member => Ok(()),
            Role::Child => Err(ServiceError::Forbidden(
                "admin or member role required".into(),
            )),
        }
    }
}

// ── Helpers ─────────────────────────────────────────────────────────────────

/// Hide entities of other families behind a not-found error.
pub(crate) fn owned<T>(
    caller: &Caller,
    family_id: Uuid,
    entity: T,
    what: &str,
) -> Result<T, ServiceError> {
    if family_id == caller.family_id {
        Ok(entity)
    } else {
        Err(ServiceError::NotFound(format!("{what} not found")))
    }
}

pub(crate) fn parse_id(field: &'static str, raw: &str) -> Result<Uuid, ServiceError> {
    Ok(validate::validate_uuid(field, raw)?)
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, ServiceError> {
    Ok(clock::parse_date(raw)?)
}

pub(crate) fn parse_enum<T>(raw: &str) -> Result<T, ServiceError>
where
    T: std::str::FromStr<Err = famledger_core::ValidationError>,
{
    Ok(raw.parse::<T>()?)
}

pub(crate) fn unix_secs(at: DateTime<Utc>) -> u64 {
    u64::try_from(at.timestamp()).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_gates() {
        let mut caller = Caller {
            user_id: Uuid::new_v4(),
            family_id: Uuid::new_v4(),
            role: Role::Admin,
        };
        assert!(caller.require_admin().is_ok());
        assert!(caller.require_manager().is_ok());

        caller.role = Role::Member;
        assert_eq!(caller.require_admin().unwrap_err().status_code(), 403);
        assert!(caller.require_manager().is_ok());

        caller.role = Role::Child;
        assert_eq!(caller.require_manager().unwrap_err().status_code(), 403);
    }

    #[test]
    fn other_families_look_missing() {
        let caller = Caller {
            user_id: Uuid::new_v4(),
            family_id: Uuid::new_v4(),
            role: Role::Admin,
        };
        assert_eq!(owned(&caller, caller.family_id, 1, "budget").unwrap(), 1);
        let err = owned(&caller, Uuid::new_v4(), 1, "budget").unwrap_err();
        assert_eq!(err.status_code(), 404);
        assert_eq!(err.message(), "budget not found");
    }

    #[test]
    fn inputs_parse_to_bad_request() {
        assert_eq!(parse_id("category id", "nope").unwrap_err().status_code(), 400);
        assert_eq!(parse_date("2024-13-01").unwrap_err().status_code(), 400);
        assert_eq!(parse_enum::<Role>("owner").unwrap_err().status_code(), 400);
        assert_eq!(parse_enum::<Role>(" Member ").unwrap(), Role::Member);
    }
}
