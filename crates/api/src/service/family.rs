//! The caller's own family.

use famledger_core::{Family, FamilyStatistics};

use super::{Caller, Repositories};
use crate::{ServiceError, UpdateFamilyRequest};

pub async fn get_family(repos: &Repositories, caller: &Caller) -> Result<Family, ServiceError> {
    Ok(repos.families.get_by_id(caller.family_id).await?)
}

pub async fn update_family(
    repos: &Repositories,
    caller: &Caller,
    req: UpdateFamilyRequest,
) -> Result<Family, ServiceError> {
    caller.require_admin()?;
    let mut family = repos.families.get_by_id(caller.family_id).await?;
    if let Some(name) = req.name {
        family.name = name;
    }
    if let Some(currency) = req.currency {
        family.currency = currency;
    }
    repos.families.update(&mut family).await?;
    Ok(family)
}

/// Remove the family and everything it owns, the caller included.
pub async fn delete_family(repos: &Repositories, caller: &Caller) -> Result<(), ServiceError> {
    caller.require_admin()?;
    repos.families.delete(caller.family_id).await?;
    tracing::info!(family_id = %caller.family_id, by = %caller.user_id, "family deleted");
    Ok(())
}

pub async fn statistics(
    repos: &Repositories,
    caller: &Caller,
) -> Result<FamilyStatistics, ServiceError> {
    Ok(repos.families.get_statistics(caller.family_id).await?)
}
