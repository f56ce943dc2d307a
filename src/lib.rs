// src/lib.rs

pub mod common;
pub mod config;
pub mod db;
pub mod docs;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;

#[cfg(any(test, feature = "test-utils"))]
pub mod mocks;

use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub use config::AppState;

use crate::{
    docs::ApiDoc,
    middleware::{api_key::api_key_guard, rate_limit::rate_limit, security_headers::security_headers},
};

pub fn create_router(app_state: AppState) -> Router {
    // Rotas que exigem X-API-KEY
    let protected_routes = Router::new()
        .route("/api/", get(handlers::health::api_root))
        .route(
            "/api/race-registrations/",
            post(handlers::registrations::create_registration).get(handlers::registrations::list_registrations),
        )
        .route("/api/race-registrations/{id}/", get(handlers::registrations::get_registration))
        .route(
            "/api/payment/create-session/",
            post(handlers::payments::create_session_post).get(handlers::payments::create_session_get),
        )
        .route("/api/payment/verify-status/", get(handlers::payments::verify_status))
        .route("/api/payment/validate-coupon/", post(handlers::payments::validate_coupon))
        .route("/api/payment/prices/", get(handlers::payments::race_prices))
        .route("/api/payment/pix/create/", post(handlers::pix::create_pix))
        .route("/api/payment/pix/simulate/", post(handlers::pix::simulate_pix))
        .route("/api/payment/pix/check-status/", get(handlers::pix::check_pix_status))
        .route("/api/race-statistics/", get(handlers::statistics::race_statistics))
        .route("/api/admin/paid-registrations/", get(handlers::admin::list_paid_registrations))
        .route("/api/admin/resend-email/", post(handlers::admin::resend_confirmation_email))
        .route_layer(axum_middleware::from_fn_with_state(app_state.clone(), api_key_guard));

    // Health e webhooks (estes autenticados por assinatura)
    let public_routes = Router::new()
        .route("/api/health/", get(handlers::health::health_check))
        .route("/api/payment/stripe-webhook/", post(handlers::webhooks::stripe_webhook))
        .route("/api/payment-webhook/", post(handlers::webhooks::payment_webhook));

    Router::new()
        .merge(protected_routes)
        .merge(public_routes)
        .merge(SwaggerUi::new("/api/docs").url("/api/docs/openapi.json", ApiDoc::openapi()))
        .layer(axum_middleware::from_fn_with_state(app_state.clone(), rate_limit))
        .layer(axum_middleware::from_fn(security_headers))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}
