// src/handlers/registrations.rs

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};

use crate::{
    common::error::AppError,
    config::AppState,
    handlers::caller_origin,
    models::registration::{CreateRegistrationPayload, RegistrationCreated, RegistrationList, RegistrationView},
};

#[utoipa::path(
    post,
    path = "/api/race-registrations/",
    tag = "Inscrições",
    request_body = CreateRegistrationPayload,
    responses(
        (status = 201, description = "Inscrição criada como PENDING; resultado da cobrança em `payment`", body = RegistrationCreated),
        (status = 400, description = "Dados inválidos (detalhes por campo)"),
        (status = 401, description = "Chave de API ausente ou inválida"),
        (status = 429, description = "Limite de requisições excedido")
    ),
    security(("api_key" = []))
)]
pub async fn create_registration(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<CreateRegistrationPayload>,
) -> Result<impl IntoResponse, AppError> {
    let origin = caller_origin(&headers);
    let created = app_state
        .registration_service
        .create(payload, origin.as_deref())
        .await?;

    Ok((StatusCode::CREATED, Json(created)))
}

#[utoipa::path(
    get,
    path = "/api/race-registrations/",
    tag = "Inscrições",
    responses(
        (status = 200, description = "Inscrições, mais recentes primeiro", body = RegistrationList),
        (status = 401, description = "Chave de API ausente ou inválida")
    ),
    security(("api_key" = []))
)]
pub async fn list_registrations(State(app_state): State<AppState>) -> Result<Json<RegistrationList>, AppError> {
    let list = app_state.registration_service.list().await?;
    Ok(Json(list))
}

#[utoipa::path(
    get,
    path = "/api/race-registrations/{id}/",
    tag = "Inscrições",
    params(("id" = i64, Path, description = "ID da inscrição")),
    responses(
        (status = 200, description = "Inscrição encontrada", body = RegistrationView),
        (status = 404, description = "Inscrição não encontrada")
    ),
    security(("api_key" = []))
)]
pub async fn get_registration(
    State(app_state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<RegistrationView>, AppError> {
    let registration = app_state.registration_service.get(id).await?;
    Ok(Json(registration))
}
