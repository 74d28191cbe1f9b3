//! Request/response types, service errors, crypto, business services and
//! SQL builders for famledger.
//!
//! The plain types are always available so HTTP clients (the E2E suite) can
//! share them. Everything that touches storage or secrets sits behind the
//! `backend` feature.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use famledger_core::{StoreError, ValidationError};

#[cfg(feature = "backend")]
pub mod crypto;
#[cfg(feature = "backend")]
pub mod db;
#[cfg(feature = "backend")]
pub mod service;

// Re-export the entity types for convenience
pub use famledger_core::{
    Budget, Category, Family, FamilyStatistics, Invite, Report, ReportData, Transaction, User,
};

// ─── Auth ────────────────────────────────────────────────────────────────────

/// Body of `POST /api/families`: a new family and its first admin.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterFamilyRequest {
    pub family_name: String,
    #[serde(default = "default_currency")]
    pub currency: String,
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
}

fn default_currency() -> String {
    "USD".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterFamilyResponse {
    pub family: Family,
    pub user: User,
    pub auth: AuthTokenResponse,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Returned by login, registration and invite acceptance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthTokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: u64,
    pub user_id: Uuid,
    pub family_id: Uuid,
    pub role: String,
}

/// Returned by `GET /api/auth/me`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeResponse {
    pub user: User,
    pub family: Family,
}

// ─── Family ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateFamilyRequest {
    pub name: Option<String>,
    pub currency: Option<String>,
}

// ─── Users ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUserRequest {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub role: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateUserRequest {
    pub email: Option<String>,
    pub password: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub role: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListUsersResponse {
    pub users: Vec<User>,
}

// ─── Invites ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateInviteRequest {
    pub email: String,
    pub role: String,
    /// Defaults to the server's configured invite lifetime.
    pub expires_in_hours: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListInvitesResponse {
    pub invites: Vec<Invite>,
}

/// Public view of an invite, looked up by its token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvitePreview {
    pub family_name: String,
    pub invited_by: String,
    pub email: String,
    pub role: String,
    pub status: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcceptInviteRequest {
    pub password: String,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcceptInviteResponse {
    pub user: User,
    pub auth: AuthTokenResponse,
}

/// Returned by `POST /api/invites/sweep`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepResponse {
    pub expired: u64,
}

// ─── Categories ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCategoryRequest {
    pub name: String,
    pub category_type: String,
    pub color: Option<String>,
    pub icon: Option<String>,
    pub parent_id: Option<String>,
}

/// The category type is fixed at creation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateCategoryRequest {
    pub name: Option<String>,
    pub color: Option<String>,
    pub icon: Option<String>,
    pub parent_id: Option<String>,
}

/// Query for `GET /api/categories`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CategoryListQuery {
    #[serde(rename = "type")]
    pub category_type: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListCategoriesResponse {
    pub categories: Vec<Category>,
}

// ─── Transactions ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTransactionRequest {
    pub category_id: String,
    /// Defaults to the caller. Only admins may record for someone else.
    pub user_id: Option<String>,
    pub amount: Decimal,
    pub transaction_type: String,
    #[serde(default)]
    pub description: String,
    /// `YYYY-MM-DD`
    pub date: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateTransactionRequest {
    pub category_id: Option<String>,
    pub amount: Option<Decimal>,
    pub transaction_type: Option<String>,
    pub description: Option<String>,
    pub date: Option<String>,
    pub tags: Option<Vec<String>>,
}

/// Query for `GET /api/transactions`. Every field narrows the listing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransactionListQuery {
    pub user_id: Option<String>,
    pub category_id: Option<String>,
    #[serde(rename = "type")]
    pub transaction_type: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub min_amount: Option<Decimal>,
    pub max_amount: Option<Decimal>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListTransactionsResponse {
    pub transactions: Vec<Transaction>,
    pub limit: u32,
    pub offset: u32,
}

// ─── Budgets ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateBudgetRequest {
    pub name: String,
    /// Omit to cover every expense category.
    pub category_id: Option<String>,
    pub amount: Decimal,
    pub period: String,
    pub start_date: String,
    pub end_date: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateBudgetRequest {
    pub name: Option<String>,
    pub category_id: Option<String>,
    pub amount: Option<Decimal>,
    pub period: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub is_active: Option<bool>,
}

/// Query for `GET /api/budgets`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BudgetListQuery {
    /// `YYYY-MM-DD`: only active budgets covering this date.
    pub active_on: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListBudgetsResponse {
    pub budgets: Vec<Budget>,
}

/// Returned by `GET /api/budgets/{id}/summary`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetSummary {
    pub budget: Budget,
    pub spent: Decimal,
    pub remaining: Decimal,
    pub percent_used: Decimal,
    pub is_over_budget: bool,
}

// ─── Reports ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateReportRequest {
    pub name: String,
    pub report_type: String,
    pub period: String,
    pub start_date: String,
    pub end_date: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListReportsResponse {
    pub reports: Vec<Report>,
}

// ─── Misc ────────────────────────────────────────────────────────────────────

/// Returned by `GET /api/health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub backend: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OkResponse {
    pub ok: bool,
}

// ─── Service Error ───────────────────────────────────────────────────────────

/// Framework-agnostic service error.
///
/// Each variant maps to an HTTP status code; the server turns it into a
/// `{"error": ...}` response.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum ServiceError {
    BadRequest(String),
    Unauthorized(String),
    Forbidden(String),
    NotFound(String),
    Conflict(String),
    Gone(String),
    Internal(String),
}

impl ServiceError {
    /// HTTP status code as a `u16`.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::BadRequest(_) => 400,
            Self::Unauthorized(_) => 401,
            Self::Forbidden(_) => 403,
            Self::NotFound(_) => 404,
            Self::Conflict(_) => 409,
            Self::Gone(_) => 410,
            Self::Internal(_) => 500,
        }
    }

    /// The error message.
    pub fn message(&self) -> &str {
        match self {
            Self::BadRequest(m)
            | Self::Unauthorized(m)
            | Self::Forbidden(m)
            | Self::NotFound(m)
            | Self::Conflict(m)
            | Self::Gone(m)
            | Self::Internal(m) => m,
        }
    }

    /// Build a closure that wraps an unexpected error as `Internal`.
    pub fn internal<E: std::fmt::Display>(context: &str) -> impl FnOnce(E) -> Self + '_ {
        move |e| Self::Internal(format!("{context}: {e}"))
    }
}

impl std::fmt::Display for ServiceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ServiceError {}

impl From<ValidationError> for ServiceError {
    fn from(e: ValidationError) -> Self {
        Self::BadRequest(e.to_string())
    }
}

impl From<StoreError> for ServiceError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Validation(v) => Self::BadRequest(v.to_string()),
            StoreError::NotFound(what) => Self::NotFound(format!("{what} not found")),
            StoreError::Conflict(m) => Self::Conflict(m),
            StoreError::Backend(m) => Self::Internal(m),
        }
    }
}

// ─── Error (JSON shape) ──────────────────────────────────────────────────────

/// JSON error shape `{ "error": "..." }` returned by all error responses.
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub error: String,
}

impl From<&ServiceError> for ApiError {
    fn from(e: &ServiceError) -> Self {
        Self {
            error: e.message().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_errors_map_to_statuses() {
        let cases = [
            (StoreError::from(ValidationError::Empty { field: "name" }), 400),
            (StoreError::NotFound("user"), 404),
            (StoreError::conflict("email already in use"), 409),
            (StoreError::Backend("connection reset".into()), 500),
        ];
        for (err, status) in cases {
            assert_eq!(ServiceError::from(err).status_code(), status);
        }
        assert_eq!(
            ServiceError::from(StoreError::NotFound("invite")).message(),
            "invite not found"
        );
    }

    #[test]
    fn gone_is_410() {
        let err = ServiceError::Gone("invite has expired".into());
        assert_eq!(err.status_code(), 410);
        assert_eq!(ApiError::from(&err).error, "invite has expired");
    }

    #[test]
    fn register_request_defaults_currency() {
        let req: RegisterFamilyRequest = serde_json::from_str(
            r#"{"family_name":"Smith","email":"a@b.com","password":"password1",
                "first_name":"Ann","last_name":"Smith"}"#,
        )
        .unwrap();
        assert_eq!(req.currency, "USD");
    }

    #[test]
    fn transaction_request_accepts_numeric_amount() {
        let req: CreateTransactionRequest = serde_json::from_str(
            r#"{"category_id":"c","amount":100.50,"transaction_type":"expense","date":"2024-01-15"}"#,
        )
        .unwrap();
        assert_eq!(req.amount, Decimal::new(10050, 2));
        assert!(req.tags.is_empty());
    }
}
