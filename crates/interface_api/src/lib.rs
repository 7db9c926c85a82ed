//! HTTP API Layer
//!
//! REST surface of the warranty dashboard using Axum.
//!
//! - **Handlers**: dashboard reads, claim and supplier mutations, health
//! - **Middleware**: JWT authentication and audit logging
//! - **DTOs**: request validation and response shapes
//! - **Error Handling**: `PortError` categories mapped to HTTP statuses
//!
//! ```rust,ignore
//! use interface_api::create_router;
//!
//! let app = create_router(service, config);
//! axum::serve(listener, app).await?;
//! ```

pub mod config;
pub mod error;
pub mod middleware;
pub mod handlers;
pub mod dto;
pub mod auth;

use axum::{
    middleware as axum_middleware,
    routing::{delete, get, post, put},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use domain_dashboard::DashboardService;

use crate::config::ApiConfig;
use crate::handlers::{claims, dashboard, health, suppliers};
use crate::middleware::{audit_middleware, auth_middleware};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub service: DashboardService,
    pub config: ApiConfig,
}

/// Builds the router with public health routes and the authenticated `/api/v1` tree
pub fn create_router(service: DashboardService, config: ApiConfig) -> Router {
    let state = AppState { service, config };

    let public_routes = Router::new()
        .route("/health", get(health::health_check))
        .route("/health/ready", get(health::readiness_check));

    let dashboard_routes = Router::new()
        .route("/", get(dashboard::get_dashboard))
        .route("/top-accounts", get(dashboard::top_accounts))
        .route("/suppliers", get(dashboard::supplier_distribution))
        .route("/root-causes", get(dashboard::root_causes))
        .route("/net-cost", get(dashboard::net_cost))
        .route("/statuses", get(dashboard::status_breakdown));

    let claims_routes = Router::new()
        .route("/", post(claims::create_claim))
        .route("/:id", delete(claims::delete_claim))
        .route("/:id/status", put(claims::update_status))
        .route("/:id/cost-lines", post(claims::add_cost_line))
        .route("/:id/credit-notes", post(claims::add_credit_note));

    let supplier_routes = Router::new()
        .route("/", get(suppliers::list_suppliers).post(suppliers::create_supplier));

    let api_routes = Router::new()
        .nest("/dashboard", dashboard_routes)
        .nest("/claims", claims_routes)
        .nest("/suppliers", supplier_routes)
        .layer(axum_middleware::from_fn(audit_middleware))
        .layer(axum_middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(public_routes)
        .nest("/api/v1", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
