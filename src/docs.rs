// src/docs.rs

use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
use utoipa::OpenApi;

use crate::handlers;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    info(title = "Race Registration API", description = "Inscrições e pagamentos da corrida"),
    paths(
        // --- Sistema ---
        handlers::health::health_check,
        handlers::health::api_root,

        // --- Inscrições ---
        handlers::registrations::create_registration,
        handlers::registrations::list_registrations,
        handlers::registrations::get_registration,

        // --- Pagamentos ---
        handlers::payments::create_session_post,
        handlers::payments::create_session_get,
        handlers::payments::verify_status,
        handlers::payments::validate_coupon,
        handlers::payments::race_prices,

        // --- PIX ---
        handlers::pix::create_pix,
        handlers::pix::simulate_pix,
        handlers::pix::check_pix_status,

        // --- Webhooks ---
        handlers::webhooks::stripe_webhook,
        handlers::webhooks::payment_webhook,

        // --- Estatísticas / Administração ---
        handlers::statistics::race_statistics,
        handlers::admin::list_paid_registrations,
        handlers::admin::resend_confirmation_email,
    ),
    components(
        schemas(
            // --- Inscrições ---
            models::registration::Gender,
            models::registration::Modality,
            models::registration::Course,
            models::registration::PaymentStatus,
            models::registration::PaymentMethod,
            models::registration::Registration,
            models::registration::CreateRegistrationPayload,
            models::registration::RegistrationView,
            models::registration::RegistrationCreated,
            models::registration::RegistrationList,
            models::registration::PaidRegistrationSummary,

            // --- Pagamentos ---
            models::payment::CreateCheckoutSessionPayload,
            models::payment::CheckoutSession,
            models::payment::CheckoutSessionResponse,
            models::payment::VerifyStatusResponse,
            models::payment::CreatePixPayload,
            models::payment::PixCharge,
            models::payment::PixChargeResponse,
            models::payment::SimulatePixPayload,
            models::payment::PixStatusResponse,
            models::payment::ValidateCouponPayload,
            models::payment::CouponValidationResponse,
            models::payment::PriceInfo,
            models::payment::RacePrices,
            models::payment::PaymentWebhookPayload,
            models::payment::PaymentWebhookResponse,
            models::payment::WebhookAck,
            models::payment::ResendEmailPayload,
            models::payment::ResendEmailResponse,

            // --- Estatísticas ---
            models::statistics::ModalityStats,
            models::statistics::CourseStats,
            models::statistics::PaymentStats,
            models::statistics::RaceStatistics,

            // --- Respostas dos handlers ---
            handlers::admin::PaidRegistrationsResponse,
            handlers::health::HealthResponse,
            handlers::health::ApiRootResponse,
        )
    ),
    tags(
        (name = "Sistema", description = "Saúde e raiz da API"),
        (name = "Inscrições", description = "Cadastro e consulta de inscrições"),
        (name = "Pagamentos", description = "Checkout, cupons e preços"),
        (name = "PIX", description = "PIX direto (QR Code dedicado)"),
        (name = "Webhooks", description = "Notificações dos gateways, autenticadas por assinatura"),
        (name = "Estatísticas", description = "Indicadores da prova"),
        (name = "Administração", description = "Inscrições pagas e reenvio de e-mail")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "api_key",
            SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new("X-API-KEY"))),
        );
    }
}
