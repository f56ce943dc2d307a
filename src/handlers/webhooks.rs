// src/handlers/webhooks.rs
//
// Webhooks autenticados por assinatura (sem chave de API).

use axum::{body::Bytes, extract::State, http::HeaderMap, Json};
use chrono::Utc;
use serde::Deserialize;

use crate::{
    common::{
        error::AppError,
        signature::{verify_hex, verify_stripe_signature, STRIPE_TOLERANCE_SECS},
    },
    config::AppState,
    models::payment::{PaymentWebhookPayload, PaymentWebhookResponse, WebhookAck},
    services::checkout_gateway::{CheckoutGateway, StripeCheckoutSession},
};

pub const STRIPE_SIGNATURE_HEADER: &str = "Stripe-Signature";
pub const WEBHOOK_SIGNATURE_HEADER: &str = "X-Webhook-Signature";

#[derive(Debug, Deserialize)]
struct StripeEvent {
    #[serde(rename = "type")]
    event_type: String,
    data: StripeEventData,
}

#[derive(Debug, Deserialize)]
struct StripeEventData {
    object: serde_json::Value,
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

#[utoipa::path(
    post,
    path = "/api/payment/stripe-webhook/",
    tag = "Webhooks",
    request_body(content = String, content_type = "application/json"),
    params(("Stripe-Signature" = String, Header, description = "t=<unix>,v1=<hmac hex>")),
    responses(
        (status = 200, description = "Evento recebido", body = WebhookAck),
        (status = 400, description = "Assinatura ou corpo inválido")
    )
)]
pub async fn stripe_webhook(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookAck>, AppError> {
    let secret = app_state.checkout_gateway.webhook_secret();
    let signature = header_str(&headers, STRIPE_SIGNATURE_HEADER).ok_or(AppError::InvalidSignature)?;

    if secret.is_empty() {
        tracing::error!("STRIPE_WEBHOOK_SECRET não configurado; webhook recusado");
        return Err(AppError::InvalidSignature);
    }
    if let Err(e) = verify_stripe_signature(signature, &body, secret, Utc::now().timestamp(), STRIPE_TOLERANCE_SECS) {
        tracing::warn!("Webhook Stripe com assinatura inválida: {}", e);
        return Err(AppError::InvalidSignature);
    }

    let event: StripeEvent =
        serde_json::from_slice(&body).map_err(|e| AppError::BadRequest(format!("Evento inválido: {e}")))?;
    tracing::info!(event_type = %event.event_type, "🔔 Webhook Stripe recebido");

    let settled = match event.event_type.as_str() {
        "checkout.session.completed" | "checkout.session.async_payment_succeeded" => {
            let session: StripeCheckoutSession = serde_json::from_value(event.data.object)
                .map_err(|e| AppError::BadRequest(format!("Sessão inválida: {e}")))?;
            Some(settle_session(&app_state, &event.event_type, &session).await?)
        }
        "payment_intent.payment_failed" => {
            let intent_id = event.data.object.get("id").and_then(|v| v.as_str()).unwrap_or("?");
            tracing::warn!(payment_intent = intent_id, "Pagamento recusado pelo gateway; inscrição segue PENDING");
            None
        }
        other => {
            tracing::debug!("Evento {} ignorado", other);
            None
        }
    };

    Ok(Json(WebhookAck {
        received: true,
        event_type: event.event_type,
        settled,
    }))
}

async fn settle_session(
    app_state: &AppState,
    event_type: &str,
    session: &StripeCheckoutSession,
) -> Result<bool, AppError> {
    // PIX/boleto dentro do checkout: a sessão completa antes do pagamento.
    if event_type == "checkout.session.completed" && !session.is_paid() {
        tracing::info!(session_id = %session.id, "Sessão completa, aguardando pagamento assíncrono");
        return Ok(false);
    }

    let Some(registration_id) = session.registration_id() else {
        tracing::warn!(session_id = %session.id, "Sessão sem registration_id nos metadados");
        return Ok(false);
    };

    app_state
        .settlement_service
        .mark_paid(
            registration_id,
            CheckoutGateway::amount_from_cents(session.amount_total),
            session.payment_intent.clone(),
        )
        .await
}

#[utoipa::path(
    post,
    path = "/api/payment-webhook/",
    tag = "Webhooks",
    request_body = PaymentWebhookPayload,
    params(("X-Webhook-Signature" = String, Header, description = "HMAC-SHA256 (hex) do corpo")),
    responses(
        (status = 200, description = "Status aplicado", body = PaymentWebhookResponse),
        (status = 400, description = "Campos ausentes ou status inválido"),
        (status = 403, description = "Assinatura ausente ou inválida"),
        (status = 404, description = "Inscrição não encontrada")
    )
)]
pub async fn payment_webhook(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<PaymentWebhookResponse>, AppError> {
    let secret = app_state
        .config
        .payment_webhook_secret
        .as_ref()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::Forbidden("Webhook não configurado.".to_string()))?;

    let signature = header_str(&headers, WEBHOOK_SIGNATURE_HEADER)
        .ok_or_else(|| AppError::Forbidden("Assinatura ausente.".to_string()))?;
    verify_hex(secret.reveal().as_bytes(), &body, signature)
        .map_err(|_| AppError::Forbidden("Assinatura inválida.".to_string()))?;

    let payload: PaymentWebhookPayload =
        serde_json::from_slice(&body).map_err(|e| AppError::BadRequest(format!("Corpo inválido: {e}")))?;

    let (Some(registration_id), Some(status)) = (payload.registration_id, payload.payment_status) else {
        return Err(AppError::BadRequest(
            "registration_id e payment_status são obrigatórios".to_string(),
        ));
    };

    let registration = app_state
        .store
        .find_by_id(registration_id)
        .await?
        .ok_or(AppError::RegistrationNotFound(registration_id))?;

    let (payment_status, changed) = match status.trim().to_uppercase().as_str() {
        "PAID" => {
            let changed = app_state
                .settlement_service
                .mark_paid(registration_id, payload.amount, payload.payment_intent_id)
                .await?;
            ("PAID".to_string(), changed)
        }
        "PENDING" => {
            let current = if registration.is_paid() { "PAID" } else { "PENDING" };
            (current.to_string(), false)
        }
        other => {
            return Err(AppError::BadRequest(format!("payment_status inválido: {other}")));
        }
    };

    tracing::info!(registration_id, changed, "Webhook de pagamento processado");

    Ok(Json(PaymentWebhookResponse {
        status: "success".to_string(),
        registration_id,
        payment_status,
        changed,
    }))
}
