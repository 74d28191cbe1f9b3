use axum::{Json, extract::State, http::StatusCode};
use uuid::Uuid;

use famledger_api::service::{Repositories, categories};
use famledger_api::{
    Category, CategoryListQuery, CreateCategoryRequest, ListCategoriesResponse, OkResponse,
    UpdateCategoryRequest,
};

use crate::error::ApiErr;
use crate::extract::{ApiJson, ApiPath, ApiQuery, AuthUser};
use crate::routes::{created, ok};

/// GET /api/categories?type=income|expense — active categories only.
pub async fn list_categories(
    State(repos): State<Repositories>,
    AuthUser(caller): AuthUser,
    ApiQuery(query): ApiQuery<CategoryListQuery>,
) -> Result<Json<ListCategoriesResponse>, ApiErr> {
    let categories =
        categories::list_categories(&repos, &caller, query.category_type.as_deref()).await?;
    Ok(Json(ListCategoriesResponse { categories }))
}

pub async fn create_category(
    State(repos): State<Repositories>,
    AuthUser(caller): AuthUser,
    ApiJson(req): ApiJson<CreateCategoryRequest>,
) -> Result<(StatusCode, Json<Category>), ApiErr> {
    Ok(created(categories::create_category(&repos, &caller, req).await?))
}

pub async fn get_category(
    State(repos): State<Repositories>,
    AuthUser(caller): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<Category>, ApiErr> {
    Ok(Json(categories::get_category(&repos, &caller, id).await?))
}

pub async fn update_category(
    State(repos): State<Repositories>,
    AuthUser(caller): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<UpdateCategoryRequest>,
) -> Result<Json<Category>, ApiErr> {
    Ok(Json(categories::update_category(&repos, &caller, id, req).await?))
}

pub async fn delete_category(
    State(repos): State<Repositories>,
    AuthUser(caller): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<OkResponse>, ApiErr> {
    categories::delete_category(&repos, &caller, id).await?;
    Ok(ok())
}
