use axum::{Json, extract::State, http::StatusCode};
use uuid::Uuid;

use famledger_api::service::{Repositories, budgets};
use famledger_api::{
    Budget, BudgetListQuery, BudgetSummary, CreateBudgetRequest, ListBudgetsResponse, OkResponse,
    UpdateBudgetRequest,
};

use crate::error::ApiErr;
use crate::extract::{ApiJson, ApiPath, ApiQuery, AuthUser};
use crate::routes::{created, ok};

/// GET /api/budgets?active_on=YYYY-MM-DD
pub async fn list_budgets(
    State(repos): State<Repositories>,
    AuthUser(caller): AuthUser,
    ApiQuery(query): ApiQuery<BudgetListQuery>,
) -> Result<Json<ListBudgetsResponse>, ApiErr> {
    let budgets = budgets::list_budgets(&repos, &caller, query.active_on.as_deref()).await?;
    Ok(Json(ListBudgetsResponse { budgets }))
}

pub async fn create_budget(
    State(repos): State<Repositories>,
    AuthUser(caller): AuthUser,
    ApiJson(req): ApiJson<CreateBudgetRequest>,
) -> Result<(StatusCode, Json<Budget>), ApiErr> {
    Ok(created(budgets::create_budget(&repos, &caller, req).await?))
}

pub async fn get_budget(
    State(repos): State<Repositories>,
    AuthUser(caller): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<Budget>, ApiErr> {
    Ok(Json(budgets::get_budget(&repos, &caller, id).await?))
}

pub async fn update_budget(
    State(repos): State<Repositories>,
    AuthUser(caller): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<UpdateBudgetRequest>,
) -> Result<Json<Budget>, ApiErr> {
    Ok(Json(budgets::update_budget(&repos, &caller, id, req).await?))
}

pub async fn delete_budget(
    State(repos): State<Repositories>,
    AuthUser(caller): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<OkResponse>, ApiErr> {
    budgets::delete_budget(&repos, &caller, id).await?;
    Ok(ok())
}

/// GET /api/budgets/{id}/summary — spending against the budget.
pub async fn budget_summary(
    State(repos): State<Repositories>,
    AuthUser(caller): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<BudgetSummary>, ApiErr> {
    Ok(Json(budgets::budget_summary(&repos, &caller, id).await?))
}
