//! Income and expense categories.

use uuid::Uuid;

use famledger_core::{Category, CategoryType};

use super::{Caller, Repositories, owned, parse_enum, parse_id};
use crate::{CreateCategoryRequest, ServiceError, UpdateCategoryRequest};

pub async fn list_categories(
    repos: &Repositories,
    caller: &Caller,
    category_type: Option<&str>,
) -> Result<Vec<Category>, ServiceError> {
    let category_type = category_type
        .filter(|t| !t.trim().is_empty())
        .map(parse_enum::<CategoryType>)
        .transpose()?;
    Ok(repos
        .categories
        .get_by_family(caller.family_id, category_type)
        .await?)
}

/// A category of the caller's family, active or not.
pub async fn get_category(
    repos: &Repositories,
    caller: &Caller,
    id: Uuid,
) -> Result<Category, ServiceError> {
    let category = repos.categories.get_by_id(id).await?;
    owned(caller, category.family_id, category, "category")
}

/// Parents must be active categories of the same family and type.
async fn check_parent(
    repos: &Repositories,
    caller: &Caller,
    parent_id: Uuid,
    category_type: CategoryType,
) -> Result<(), ServiceError> {
    let parent = get_category(repos, caller, parent_id)
        .await
        .map_err(|_| ServiceError::BadRequest("unknown parent category".into()))?;
    if !parent.is_active {
        return Err(ServiceError::BadRequest("parent category is inactive".into()));
    }
    if parent.category_type != category_type {
        return Err(ServiceError::BadRequest(
            "parent category has a different type".into(),
        ));
    }
    Ok(())
}

pub async fn create_category(
    repos: &Repositories,
    caller: &Caller,
    req: CreateCategoryRequest,
) -> Result<Category, ServiceError> {
    caller.require_manager()?;
    let category_type = parse_enum(&req.category_type)?;
    let mut category = Category::new(caller.family_id, req.name, category_type);
    if let Some(color) = req.color {
        category.color = color;
    }
    if let Some(icon) = req.icon {
        category.icon = icon;
    }
    if let Some(parent) = req.parent_id.as_deref() {
        let parent_id = parse_id("parent id", parent)?;
        check_parent(repos, caller, parent_id, category_type).await?;
        category.parent_id = Some(parent_id);
    }
    repos.categories.create(&mut category).await?;
    Ok(category)
}

pub async fn update_category(
    repos: &Repositories,
    caller: &Caller,
    id: Uuid,
    req: UpdateCategoryRequest,
) -> Result<Category, ServiceError> {
    caller.require_manager()?;
    let mut category = get_category(repos, caller, id).await?;
    if !category.is_active {
        return Err(ServiceError::NotFound("category not found".into()));
    }
    if let Some(name) = req.name {
        category.name = name;
    }
    if let Some(color) = req.color {
        category.color = color;
    }
    if let Some(icon) = req.icon {
        category.icon = icon;
    }
    match req.parent_id.as_deref().map(str::trim) {
        None => {}
        Some("") => category.parent_id = None,
        Some(parent) => {
            let parent_id = parse_id("parent id", parent)?;
            if parent_id != category.id {
                check_parent(repos, caller, parent_id, category.category_type).await?;
            }
            category.parent_id = Some(parent_id);
        }
    }
    repos.categories.update(&mut category).await?;
    Ok(category)
}

/// Soft delete; existing transactions keep pointing at the category.
pub async fn delete_category(
    repos: &Repositories,
    caller: &Caller,
    id: Uuid,
) -> Result<(), ServiceError> {
    caller.require_manager()?;
    let category = get_category(repos, caller, id).await?;
    if !category.is_active {
        return Err(ServiceError::NotFound("category not found".into()));
    }
    repos.categories.delete(id).await?;
    Ok(())
}
