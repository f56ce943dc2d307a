// src/handlers/health.rs

use std::collections::BTreeMap;

use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

const API_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    #[schema(example = "healthy")]
    pub status: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub version: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ApiRootResponse {
    pub message: String,
    pub version: String,
    pub endpoints: BTreeMap<String, String>,
}

#[utoipa::path(
    get,
    path = "/api/health/",
    tag = "Sistema",
    responses((status = 200, description = "API no ar", body = HealthResponse))
)]
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        message: "API funcionando corretamente".to_string(),
        timestamp: Utc::now(),
        version: API_VERSION.to_string(),
    })
}

#[utoipa::path(
    get,
    path = "/api/",
    tag = "Sistema",
    responses((status = 200, description = "Boas-vindas e mapa de endpoints", body = ApiRootResponse)),
    security(("api_key" = []))
)]
pub async fn api_root() -> Json<ApiRootResponse> {
    let endpoints = [
        ("health", "/api/health/"),
        ("docs", "/api/docs"),
        ("race_registrations", "/api/race-registrations/"),
        ("race_statistics", "/api/race-statistics/"),
        ("create_session", "/api/payment/create-session/"),
        ("verify_status", "/api/payment/verify-status/"),
        ("pix_create", "/api/payment/pix/create/"),
        ("pix_check_status", "/api/payment/pix/check-status/"),
        ("validate_coupon", "/api/payment/validate-coupon/"),
        ("prices", "/api/payment/prices/"),
    ]
    .into_iter()
    .map(|(name, path)| (name.to_string(), path.to_string()))
    .collect();

    Json(ApiRootResponse {
        message: "Bem-vindo à API de inscrições da corrida!".to_string(),
        version: API_VERSION.to_string(),
        endpoints,
    })
}
