// src/handlers/admin.rs

use axum::{extract::State, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    common::error::AppError,
    config::AppState,
    models::{
        payment::{ResendEmailPayload, ResendEmailResponse},
        registration::PaidRegistrationSummary,
    },
};

#[derive(Debug, Serialize, ToSchema)]
pub struct PaidRegistrationsResponse {
    pub success: bool,
    pub count: usize,
    pub registrations: Vec<PaidRegistrationSummary>,
}

#[utoipa::path(
    get,
    path = "/api/admin/paid-registrations/",
    tag = "Administração",
    responses(
        (status = 200, description = "Inscrições pagas", body = PaidRegistrationsResponse),
        (status = 401, description = "Chave de API ausente ou inválida")
    ),
    security(("api_key" = []))
)]
pub async fn list_paid_registrations(
    State(app_state): State<AppState>,
) -> Result<Json<PaidRegistrationsResponse>, AppError> {
    let registrations: Vec<PaidRegistrationSummary> = app_state
        .store
        .list_paid()
        .await?
        .into_iter()
        .map(PaidRegistrationSummary::from)
        .collect();

    Ok(Json(PaidRegistrationsResponse {
        success: true,
        count: registrations.len(),
        registrations,
    }))
}

#[utoipa::path(
    post,
    path = "/api/admin/resend-email/",
    tag = "Administração",
    request_body = ResendEmailPayload,
    responses(
        (status = 200, description = "E-mail de confirmação reenviado", body = ResendEmailResponse),
        (status = 400, description = "Inscrição ainda não paga"),
        (status = 404, description = "Inscrição não encontrada"),
        (status = 500, description = "Falha no envio")
    ),
    security(("api_key" = []))
)]
pub async fn resend_confirmation_email(
    State(app_state): State<AppState>,
    Json(payload): Json<ResendEmailPayload>,
) -> Result<Json<ResendEmailResponse>, AppError> {
    let registration_id = payload
        .registration_id
        .ok_or_else(|| AppError::BadRequest("registration_id é obrigatório".to_string()))?;

    let registration = app_state
        .store
        .find_by_id(registration_id)
        .await?
        .ok_or(AppError::RegistrationNotFound(registration_id))?;

    if !registration.is_paid() {
        return Err(AppError::BadRequest(
            "Só é possível reenviar a confirmação de inscrições pagas.".to_string(),
        ));
    }

    if !app_state
        .notification_service
        .send_payment_confirmation(&registration)
        .await
    {
        return Err(AppError::EmailError(format!(
            "não foi possível reenviar o e-mail da inscrição {registration_id}"
        )));
    }

    Ok(Json(ResendEmailResponse {
        success: true,
        registration_id,
        email: registration.email,
    }))
}
