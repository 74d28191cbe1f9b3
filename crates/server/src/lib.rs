//! famledger HTTP server: axum routes over the business services.
//!
//! The binary in `main.rs` loads configuration, connects the store and
//! serves [`app`]. Tests build the same router over an in-memory store.

pub mod error;
pub mod extract;
pub mod routes;
pub mod sweeper;

use std::sync::Arc;

use axum::{
    Router,
    extract::FromRef,
    http::HeaderValue,
    routing::{delete, get, post},
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use famledger_api::service::{Repositories, ServiceConfig};
use famledger_runtime_config::{FamledgerConfig, StorageBackend};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub repos: Repositories,
    pub config: Arc<ServiceConfig>,
    pub backend: StorageBackend,
}

impl AppState {
    pub fn new(repos: Repositories, config: ServiceConfig, backend: StorageBackend) -> Self {
        Self {
            repos,
            config: Arc::new(config),
            backend,
        }
    }
}

impl FromRef<AppState> for Repositories {
    fn from_ref(state: &AppState) -> Self {
        state.repos.clone()
    }
}

impl FromRef<AppState> for Arc<ServiceConfig> {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}

/// Service knobs derived from the loaded configuration.
pub fn service_config(cfg: &FamledgerConfig) -> ServiceConfig {
    ServiceConfig {
        jwt_secret: cfg.auth.jwt_secret.clone(),
        jwt_ttl_secs: cfg.auth.jwt_ttl_secs,
        password_iterations: cfg.auth.password_iterations,
        invite_ttl_hours: cfg.invites.ttl_hours,
        single_family: cfg.server.single_family,
    }
}

/// The `/api` routes without middleware.
pub fn api_routes() -> Router<AppState> {
    use routes::{auth, budgets, categories, family, health, invites, reports, transactions, users};

    Router::new()
        // Health
        .route("/health", get(health::health))
        // Auth
        .route("/families", post(auth::register_family))
        .route("/auth/login", post(auth::login))
        .route("/auth/me", get(auth::me))
        // Family
        .route(
            "/family",
            get(family::get_family)
                .put(family::update_family)
                .delete(family::delete_family),
        )
        .route("/family/stats", get(family::stats))
        // Users
        .route("/users", get(users::list_users).post(users::create_user))
        .route(
            "/users/{id}",
            get(users::get_user)
                .put(users::update_user)
                .delete(users::delete_user),
        )
        // Invites
        .route(
            "/invites",
            get(invites::list_invites).post(invites::create_invite),
        )
        .route("/invites/sweep", post(invites::sweep))
        .route("/invites/{id}", delete(invites::revoke_invite))
        .route("/invites/token/{token}", get(invites::preview_invite))
        .route(
            "/invites/token/{token}/accept",
            post(invites::accept_invite),
        )
        // Categories
        .route(
            "/categories",
            get(categories::list_categories).post(categories::create_category),
        )
        .route(
            "/categories/{id}",
            get(categories::get_category)
                .put(categories::update_category)
                .delete(categories::delete_category),
        )
        // Transactions
        .route(
            "/transactions",
            get(transactions::list_transactions).post(transactions::create_transaction),
        )
        .route(
            "/transactions/{id}",
            get(transactions::get_transaction)
                .put(transactions::update_transaction)
                .delete(transactions::delete_transaction),
        )
        // Budgets
        .route(
            "/budgets",
            get(budgets::list_budgets).post(budgets::create_budget),
        )
        .route(
            "/budgets/{id}",
            get(budgets::get_budget)
                .put(budgets::update_budget)
                .delete(budgets::delete_budget),
        )
        .route("/budgets/{id}/summary", get(budgets::budget_summary))
        // Reports
        .route(
            "/reports",
            get(reports::list_reports).post(reports::generate_report),
        )
        .route(
            "/reports/{id}",
            get(reports::get_report).delete(reports::delete_report),
        )
}

fn cors(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.is_empty() {
        return layer.allow_origin(Any);
    }
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!("ignoring invalid CORS origin {o:?}");
                None
            }
        })
        .collect();
    layer.allow_origin(allowed)
}

/// The complete application: `/api` routes, request tracing and CORS.
pub fn app(state: AppState, cors_origins: &[String]) -> Router {
    Router::new()
        .nest("/api", api_routes())
        .layer(TraceLayer::new_for_http())
        .layer(cors(cors_origins))
        .with_state(state)
}
