// src/handlers/pix.rs
//
// PIX direto (AbacatePay).

use axum::{
    extract::{Query, State},
    Json,
};

use crate::{
    common::error::AppError,
    config::AppState,
    models::payment::{CreatePixPayload, PixChargeResponse, PixStatusQuery, PixStatusResponse, SimulatePixPayload},
};

#[utoipa::path(
    post,
    path = "/api/payment/pix/create/",
    tag = "PIX",
    request_body = CreatePixPayload,
    responses(
        (status = 200, description = "QR Code PIX gerado", body = PixChargeResponse),
        (status = 400, description = "registration_id ausente ou inscrição já paga"),
        (status = 404, description = "Inscrição não encontrada"),
        (status = 502, description = "Falha no provedor PIX")
    ),
    security(("api_key" = []))
)]
pub async fn create_pix(
    State(app_state): State<AppState>,
    Json(payload): Json<CreatePixPayload>,
) -> Result<Json<PixChargeResponse>, AppError> {
    let registration_id = payload
        .registration_id
        .ok_or_else(|| AppError::BadRequest("registration_id é obrigatório".to_string()))?;

    let registration = app_state
        .store
        .find_by_id(registration_id)
        .await?
        .ok_or(AppError::RegistrationNotFound(registration_id))?;

    let charge = app_state
        .pix_gateway
        .create_pix(&registration, payload.coupon_code.as_deref())
        .await?;

    Ok(Json(PixChargeResponse { success: true, charge }))
}

#[utoipa::path(
    post,
    path = "/api/payment/pix/simulate/",
    tag = "PIX",
    request_body = SimulatePixPayload,
    responses(
        (status = 200, description = "Pagamento simulado no ambiente de testes", body = PixStatusResponse),
        (status = 400, description = "pix_id ausente"),
        (status = 403, description = "Indisponível em produção"),
        (status = 502, description = "Falha no provedor PIX")
    ),
    security(("api_key" = []))
)]
pub async fn simulate_pix(
    State(app_state): State<AppState>,
    Json(payload): Json<SimulatePixPayload>,
) -> Result<Json<PixStatusResponse>, AppError> {
    let pix_id = payload
        .pix_id
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| AppError::BadRequest("pix_id é obrigatório".to_string()))?;

    let report = app_state.pix_gateway.simulate_payment(&pix_id).await?;
    let registration = app_state.pix_gateway.find_registration(&pix_id).await?;

    tracing::info!(pix_id = %pix_id, "🧪 Pagamento PIX simulado");

    Ok(Json(PixStatusResponse {
        success: true,
        status: report.status.as_str().to_string(),
        expires_at: report.expires_at,
        registration_id: registration.map(|r| r.id),
        // A confirmação local acontece no check-status, no webhook ou na varredura.
        settled: false,
    }))
}

#[utoipa::path(
    get,
    path = "/api/payment/pix/check-status/",
    tag = "PIX",
    params(("pix_id" = String, Query, description = "ID do QR Code PIX")),
    responses(
        (status = 200, description = "Status do PIX; confirma a inscrição se estiver pago", body = PixStatusResponse),
        (status = 400, description = "pix_id ausente"),
        (status = 502, description = "Falha no provedor PIX")
    ),
    security(("api_key" = []))
)]
pub async fn check_pix_status(
    State(app_state): State<AppState>,
    Query(query): Query<PixStatusQuery>,
) -> Result<Json<PixStatusResponse>, AppError> {
    let pix_id = query
        .pix_id
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| AppError::BadRequest("pix_id é obrigatório".to_string()))?;

    let (remote, settled) = app_state
        .pix
        .reconcile(&pix_id, &app_state.settlement_service)
        .await?;

    Ok(Json(PixStatusResponse {
        success: true,
        status: remote.status,
        expires_at: remote.expires_at,
        registration_id: remote.registration_id,
        settled,
    }))
}
