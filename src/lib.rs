//! buildflow: donation tracking for a church building-fund campaign.
//!
//! Public surface: donors submit proof-of-deposit donations and anyone can
//! read the aggregate dashboard. Admin surface: PIN login issues a session
//! cookie that gates the review queue, the approval/rejection workflow,
//! manual entries, the materials registry, and the audit log.

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    middleware::{from_fn, Next},
    response::IntoResponse,
    routing::{get, post},
    Router,
};

pub mod audit;
pub mod auth;
pub mod db;
pub mod rate_limit;
pub mod routes;
pub mod validation;

use db::DbPool;
use rate_limit::RateLimiter;

#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    pub rate_limiter: Arc<dyn RateLimiter>,
}

/// Build the application router. Global layers (CORS, tracing, the coarse
/// request governor) are applied by the binary around this.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/dashboard", get(routes::dashboard::dashboard_snapshot))
        .route(
            "/api/donations",
            get(routes::donations::list_donations).post(routes::donations::submit_donation),
        )
        .route("/api/admin/login", post(routes::admin::login))
        .route("/api/admin/logout", post(routes::admin::logout))
        .route("/api/admin/pending", get(routes::admin::list_pending))
        .route("/api/admin/donations", post(routes::admin::create_manual_donation))
        .route(
            "/api/admin/donations/{id}/approve",
            post(routes::admin::approve_donation),
        )
        .route(
            "/api/admin/donations/{id}/reject",
            post(routes::admin::reject_donation),
        )
        .route(
            "/api/admin/materials",
            get(routes::materials::list_materials).post(routes::materials::create_material),
        )
        .route(
            "/api/admin/materials/{id}",
            axum::routing::patch(routes::materials::update_material)
                .delete(routes::materials::delete_material),
        )
        .route("/api/admin/audit", get(routes::audit::list_audit_logs))
        .layer(from_fn(require_admin))
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}

/// Guard the admin API. Login is the only unauthenticated admin route;
/// absence, expiry, and malformation of the credential are treated the same.
async fn require_admin(req: Request<Body>, next: Next) -> impl IntoResponse {
    let path = req.uri().path();
    if !path.starts_with("/api/admin/") || path == "/api/admin/login" {
        return next.run(req).await;
    }

    if let Some(token) = auth::extract_token_from_headers(req.headers()) {
        if auth::validate_token_str(&token).is_ok() {
            return next.run(req).await;
        }
    }

    (StatusCode::UNAUTHORIZED, "No autorizado. Inicie sesión.").into_response()
}
