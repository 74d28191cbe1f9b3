use axum::{Json, extract::State, http::StatusCode};
use uuid::Uuid;

use famledger_api::service::{Repositories, transactions};
use famledger_api::{
    CreateTransactionRequest, ListTransactionsResponse, OkResponse, Transaction,
    TransactionListQuery, UpdateTransactionRequest,
};

use crate::error::ApiErr;
use crate::extract::{ApiJson, ApiPath, ApiQuery, AuthUser};
use crate::routes::{created, ok};

/// GET /api/transactions — newest first, narrowed by the query string.
pub async fn list_transactions(
    State(repos): State<Repositories>,
    AuthUser(caller): AuthUser,
    ApiQuery(query): ApiQuery<TransactionListQuery>,
) -> Result<Json<ListTransactionsResponse>, ApiErr> {
    Ok(Json(transactions::list_transactions(&repos, &caller, query).await?))
}

pub async fn create_transaction(
    State(repos): State<Repositories>,
    AuthUser(caller): AuthUser,
    ApiJson(req): ApiJson<CreateTransactionRequest>,
) -> Result<(StatusCode, Json<Transaction>), ApiErr> {
    Ok(created(transactions::create_transaction(&repos, &caller, req).await?))
}

pub async fn get_transaction(
    State(repos): State<Repositories>,
    AuthUser(caller): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<Transaction>, ApiErr> {
    Ok(Json(transactions::get_transaction(&repos, &caller, id).await?))
}

pub async fn update_transaction(
    State(repos): State<Repositories>,
    AuthUser(caller): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<UpdateTransactionRequest>,
) -> Result<Json<Transaction>, ApiErr> {
    Ok(Json(transactions::update_transaction(&repos, &caller, id, req).await?))
}

pub async fn delete_transaction(
    State(repos): State<Repositories>,
    AuthUser(caller): AuthUser,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<OkResponse>, ApiErr> {
    transactions::delete_transaction(&repos, &caller, id).await?;
    Ok(ok())
}
