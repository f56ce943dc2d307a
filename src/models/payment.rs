// src/models/payment.rs

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::registration::Modality;

// --- Checkout (Stripe) ---

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateCheckoutSessionPayload {
    #[schema(example = 42)]
    pub registration_id: Option<i64>,
    #[schema(example = "AD10")]
    pub coupon_code: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CheckoutSession {
    #[schema(example = "https://checkout.stripe.com/c/pay/cs_test_123")]
    pub checkout_url: String,
    #[schema(example = "cs_test_123")]
    pub session_id: String,
    #[schema(value_type = String, example = "45.00")]
    pub amount: Decimal,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CheckoutSessionResponse {
    pub success: bool,
    #[serde(flatten)]
    pub session: CheckoutSession,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct VerifyStatusQuery {
    pub session_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct VerifyStatusResponse {
    pub success: bool,
    #[schema(example = "paid")]
    pub payment_status: String,
    /// Valor em centavos, como reportado pelo gateway.
    #[schema(example = 5000)]
    pub amount_total: Option<i64>,
    pub customer_email: Option<String>,
    pub metadata: HashMap<String, String>,
    /// `true` quando esta chamada aplicou a confirmação local.
    pub settled: bool,
}

// --- PIX (AbacatePay) ---

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreatePixPayload {
    pub registration_id: Option<i64>,
    pub coupon_code: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PixCharge {
    #[schema(example = "pix_char_123")]
    pub pix_id: String,
    /// Código copia-e-cola.
    pub pix_code: String,
    /// QR Code em base64 (data URI).
    pub qr_code_base64: Option<String>,
    #[schema(value_type = String, example = "50.00")]
    pub amount: Decimal,
    #[schema(example = "PENDING")]
    pub status: String,
    pub expires_at: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PixChargeResponse {
    pub success: bool,
    #[serde(flatten)]
    pub charge: PixCharge,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct SimulatePixPayload {
    pub pix_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct PixStatusQuery {
    pub pix_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PixStatusResponse {
    pub success: bool,
    #[schema(example = "PAID")]
    pub status: String,
    pub expires_at: Option<String>,
    pub registration_id: Option<i64>,
    pub settled: bool,
}

// --- Cobrança embutida na criação da inscrição ---

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "method", rename_all = "lowercase")]
pub enum PaymentCharge {
    Card(CheckoutSession),
    Pix(PixCharge),
}

#[derive(Debug, Clone, Serialize)]
pub struct EmbeddedPayment {
    pub success: bool,
    #[serde(flatten)]
    pub charge: Option<PaymentCharge>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

// --- Cupons e preços ---

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ValidateCouponPayload {
    #[schema(example = "ad10")]
    pub coupon_code: Option<String>,
    pub modality: Option<Modality>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CouponValidationResponse {
    pub valid: bool,
    #[schema(value_type = String, example = "5.00")]
    pub discount_amount: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(example = "Desconto de R$ 5,00")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PriceInfo {
    #[schema(value_type = String, example = "50.00")]
    pub amount: Decimal,
    #[schema(example = "Inscrição Adulto")]
    pub description: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RacePrices {
    pub adulto: PriceInfo,
    pub infantil: PriceInfo,
}

// --- Webhooks ---

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct PaymentWebhookPayload {
    pub registration_id: Option<i64>,
    #[schema(example = "PAID")]
    pub payment_status: Option<String>,
    #[schema(value_type = Option<String>, example = "50.00")]
    pub amount: Option<Decimal>,
    pub payment_intent_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PaymentWebhookResponse {
    #[schema(example = "success")]
    pub status: String,
    pub registration_id: i64,
    #[schema(example = "PAID")]
    pub payment_status: String,
    pub changed: bool,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct WebhookAck {
    pub received: bool,
    #[schema(example = "checkout.session.completed")]
    pub event_type: String,
    pub settled: Option<bool>,
}

// --- Administração ---

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ResendEmailPayload {
    pub registration_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ResendEmailResponse {
    pub success: bool,
    pub registration_id: i64,
    pub email: String,
}
