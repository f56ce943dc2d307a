// src/handlers/payments.rs
//
// Checkout hospedado (Stripe), cupons e tabela de preços.

use axum::{
    extract::{Query, State},
    http::HeaderMap,
    Json,
};
use rust_decimal::Decimal;

use crate::{
    common::error::AppError,
    config::AppState,
    handlers::caller_origin,
    models::{
        payment::{
            CheckoutSessionResponse, CouponValidationResponse, CreateCheckoutSessionPayload, PriceInfo, RacePrices,
            ValidateCouponPayload, VerifyStatusQuery, VerifyStatusResponse,
        },
        registration::Modality,
    },
};

async fn create_session(
    app_state: AppState,
    headers: &HeaderMap,
    payload: CreateCheckoutSessionPayload,
) -> Result<Json<CheckoutSessionResponse>, AppError> {
    let registration_id = payload
        .registration_id
        .ok_or_else(|| AppError::BadRequest("registration_id é obrigatório".to_string()))?;

    let registration = app_state
        .store
        .find_by_id(registration_id)
        .await?
        .ok_or(AppError::RegistrationNotFound(registration_id))?;

    let origin = caller_origin(headers);
    let session = app_state
        .checkout_gateway
        .create_session(&registration, origin.as_deref(), payload.coupon_code.as_deref())
        .await?;

    Ok(Json(CheckoutSessionResponse { success: true, session }))
}

#[utoipa::path(
    post,
    path = "/api/payment/create-session/",
    tag = "Pagamentos",
    request_body = CreateCheckoutSessionPayload,
    responses(
        (status = 200, description = "Sessão de checkout criada", body = CheckoutSessionResponse),
        (status = 400, description = "registration_id ausente ou inscrição já paga"),
        (status = 404, description = "Inscrição não encontrada"),
        (status = 502, description = "Falha no gateway de pagamento")
    ),
    security(("api_key" = []))
)]
pub async fn create_session_post(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<CreateCheckoutSessionPayload>,
) -> Result<Json<CheckoutSessionResponse>, AppError> {
    create_session(app_state, &headers, payload).await
}

#[utoipa::path(
    get,
    path = "/api/payment/create-session/",
    tag = "Pagamentos",
    params(
        ("registration_id" = i64, Query, description = "ID da inscrição"),
        ("coupon_code" = Option<String>, Query, description = "Cupom de desconto")
    ),
    responses(
        (status = 200, description = "Sessão de checkout criada", body = CheckoutSessionResponse),
        (status = 400, description = "registration_id ausente ou inscrição já paga"),
        (status = 404, description = "Inscrição não encontrada"),
        (status = 502, description = "Falha no gateway de pagamento")
    ),
    security(("api_key" = []))
)]
pub async fn create_session_get(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    Query(payload): Query<CreateCheckoutSessionPayload>,
) -> Result<Json<CheckoutSessionResponse>, AppError> {
    create_session(app_state, &headers, payload).await
}

#[utoipa::path(
    get,
    path = "/api/payment/verify-status/",
    tag = "Pagamentos",
    params(("session_id" = String, Query, description = "ID da sessão de checkout")),
    responses(
        (status = 200, description = "Status da sessão; confirma a inscrição se estiver paga", body = VerifyStatusResponse),
        (status = 400, description = "session_id ausente"),
        (status = 502, description = "Falha no gateway de pagamento")
    ),
    security(("api_key" = []))
)]
pub async fn verify_status(
    State(app_state): State<AppState>,
    Query(query): Query<VerifyStatusQuery>,
) -> Result<Json<VerifyStatusResponse>, AppError> {
    let session_id = query
        .session_id
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| AppError::BadRequest("session_id é obrigatório".to_string()))?;

    let (remote, settled) = app_state
        .checkout
        .reconcile(&session_id, &app_state.settlement_service)
        .await?;

    Ok(Json(VerifyStatusResponse {
        success: true,
        payment_status: remote.status,
        amount_total: remote.amount_total,
        customer_email: remote.customer_email,
        metadata: remote.metadata,
        settled,
    }))
}

#[utoipa::path(
    post,
    path = "/api/payment/validate-coupon/",
    tag = "Pagamentos",
    request_body = ValidateCouponPayload,
    responses(
        (status = 200, description = "Resultado da validação (válido ou não)", body = CouponValidationResponse),
        (status = 400, description = "coupon_code ausente")
    ),
    security(("api_key" = []))
)]
pub async fn validate_coupon(
    State(app_state): State<AppState>,
    Json(payload): Json<ValidateCouponPayload>,
) -> Result<Json<CouponValidationResponse>, AppError> {
    let code = payload
        .coupon_code
        .filter(|c| !c.trim().is_empty())
        .ok_or_else(|| AppError::BadRequest("Código do cupom é obrigatório".to_string()))?;

    let validation = app_state.coupons.validate(&code, payload.modality);

    let response = if validation.valid {
        CouponValidationResponse {
            valid: true,
            discount_amount: validation.discount_amount,
            description: Some(validation.message),
            error: None,
        }
    } else {
        CouponValidationResponse {
            valid: false,
            discount_amount: Decimal::ZERO,
            description: None,
            error: Some(validation.message),
        }
    };
    Ok(Json(response))
}

#[utoipa::path(
    get,
    path = "/api/payment/prices/",
    tag = "Pagamentos",
    responses((status = 200, description = "Preço de cada categoria", body = RacePrices)),
    security(("api_key" = []))
)]
pub async fn race_prices(State(app_state): State<AppState>) -> Json<RacePrices> {
    let prices = &app_state.config.prices;
    Json(RacePrices {
        adulto: PriceInfo {
            amount: prices.price_for(Modality::Adulto),
            description: format!("Inscrição {}", Modality::Adulto.label()),
        },
        infantil: PriceInfo {
            amount: prices.price_for(Modality::Infantil),
            description: format!("Inscrição {}", Modality::Infantil.label()),
        },
    })
}
