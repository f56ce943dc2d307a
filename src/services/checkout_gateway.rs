// src/services/checkout_gateway.rs
//
// Adaptador de checkout hospedado (Stripe Checkout Sessions, cartão e PIX).

use std::{collections::HashMap, sync::Arc, time::Duration};

use reqwest::{Client, Url};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    common::error::{AppError, GatewayError},
    config::settings::{ReturnUrlConfig, StripeConfig},
    db::RegistrationStore,
    models::{payment::CheckoutSession, registration::Registration},
    services::pricing::{from_cents, to_cents, ChargeQuoter},
};

const LOCAL_HOSTS: [&str; 4] = ["localhost", "127.0.0.1", "0.0.0.0", "[::1]"];

#[derive(Debug, Clone, Deserialize)]
pub struct CustomerDetails {
    pub email: Option<String>,
}

/// Subconjunto do objeto `checkout.session` que nos interessa.
#[derive(Debug, Clone, Deserialize)]
pub struct StripeCheckoutSession {
    pub id: String,
    pub url: Option<String>,
    pub amount_total: Option<i64>,
    #[serde(default)]
    pub payment_status: String,
    pub payment_intent: Option<String>,
    pub customer_email: Option<String>,
    pub customer_details: Option<CustomerDetails>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl StripeCheckoutSession {
    pub fn email(&self) -> Option<String> {
        self.customer_details
            .as_ref()
            .and_then(|d| d.email.clone())
            .or_else(|| self.customer_email.clone())
    }

    pub fn registration_id(&self) -> Option<i64> {
        self.metadata.get("registration_id").and_then(|v| v.parse().ok())
    }

    pub fn is_paid(&self) -> bool {
        matches!(self.payment_status.as_str(), "paid" | "no_payment_required")
    }
}

#[derive(Debug, Deserialize)]
struct StripeErrorBody {
    error: StripeErrorDetail,
}

#[derive(Debug, Deserialize)]
struct StripeErrorDetail {
    message: Option<String>,
}

/// Origem do chamador só é aceita quando é um host de desenvolvimento local.
pub fn is_local_origin(origin: &str) -> bool {
    let Ok(url) = Url::parse(origin) else {
        return false;
    };
    match url.host_str() {
        Some(host) => LOCAL_HOSTS.contains(&host) || host == "::1" || host.ends_with(".localhost"),
        None => false,
    }
}

/// Ids de sessão do Stripe (`cs_test_a1B2...`): apenas letras, dígitos e `_`.
pub fn is_valid_session_id(session_id: &str) -> bool {
    !session_id.is_empty() && session_id.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Prioridade: override configurado > origem local do chamador > origem de produção.
pub fn resolve_return_base(config: &ReturnUrlConfig, caller_origin: Option<&str>) -> String {
    let base = match (&config.override_base, caller_origin) {
        (Some(explicit), _) => explicit.as_str(),
        (None, Some(origin)) if is_local_origin(origin) => origin,
        _ => config.production_base.as_str(),
    };
    base.trim_end_matches('/').to_string()
}

#[derive(Clone)]
pub struct CheckoutGateway {
    http: Client,
    config: Arc<StripeConfig>,
    return_urls: Arc<ReturnUrlConfig>,
    race_name: Arc<str>,
    store: Arc<dyn RegistrationStore>,
    quoter: ChargeQuoter,
}

impl CheckoutGateway {
    pub fn new(
        config: StripeConfig,
        return_urls: ReturnUrlConfig,
        race_name: &str,
        timeout: Duration,
        store: Arc<dyn RegistrationStore>,
        quoter: ChargeQuoter,
    ) -> anyhow::Result<Self> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            config: Arc::new(config),
            return_urls: Arc::new(return_urls),
            race_name: Arc::from(race_name),
            store,
            quoter,
        })
    }

    fn ensure_configured(&self) -> Result<(), GatewayError> {
        if self.config.secret_key.is_empty() {
            return Err(GatewayError::NotConfigured);
        }
        Ok(())
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/v1/{}", self.config.api_base.trim_end_matches('/'), path)
    }

    /// Cria uma sessão de checkout. Em qualquer falha do gateway a inscrição continua
    /// PENDING; só o rastro do cupom (se houver) permanece gravado.
    pub async fn create_session(
        &self,
        registration: &Registration,
        caller_origin: Option<&str>,
        coupon_code: Option<&str>,
    ) -> Result<CheckoutSession, AppError> {
        if registration.is_paid() {
            return Err(AppError::AlreadyPaid(registration.id));
        }
        self.ensure_configured()?;

        let quote = self.quoter.quote(registration, coupon_code).await?;
        let base = resolve_return_base(&self.return_urls, caller_origin);

        let mut form: Vec<(String, String)> = vec![
            ("mode".into(), "payment".into()),
            ("payment_method_types[0]".into(), "card".into()),
            ("line_items[0][quantity]".into(), "1".into()),
            ("line_items[0][price_data][currency]".into(), "brl".into()),
            ("line_items[0][price_data][unit_amount]".into(), to_cents(quote.amount).to_string()),
            (
                "line_items[0][price_data][product_data][name]".into(),
                format!("Inscrição {} - {}", self.race_name, registration.course.label()),
            ),
            ("customer_email".into(), registration.email.clone()),
            ("client_reference_id".into(), registration.id.to_string()),
            ("metadata[registration_id]".into(), registration.id.to_string()),
            (
                "success_url".into(),
                format!("{base}/pagamento/sucesso?session_id={{CHECKOUT_SESSION_ID}}"),
            ),
            (
                "cancel_url".into(),
                format!("{base}/pagamento/cancelado?registration_id={}", registration.id),
            ),
        ];
        if self.config.enable_pix {
            form.push(("payment_method_types[1]".into(), "pix".into()));
        }
        if let Some(code) = &quote.coupon_code {
            form.push(("metadata[coupon_code]".into(), code.clone()));
        }

        let response = self
            .http
            .post(self.endpoint("checkout/sessions"))
            .bearer_auth(self.config.secret_key.reveal())
            .header("Idempotency-Key", Uuid::new_v4().to_string())
            .form(&form)
            .send()
            .await
            .map_err(GatewayError::from)?;

        let session: StripeCheckoutSession = parse_response(response).await?;
        let checkout_url = session
            .url
            .clone()
            .ok_or_else(|| GatewayError::InvalidResponse("sessão sem URL de checkout".into()))?;

        self.store
            .record_checkout_session(registration.id, &session.id, quote.amount)
            .await?;

        tracing::info!(
            registration_id = registration.id,
            session_id = %session.id,
            "💳 Sessão de checkout criada ({})",
            quote.amount
        );

        Ok(CheckoutSession {
            checkout_url,
            session_id: session.id,
            amount: quote.amount,
        })
    }

    /// Consulta a sessão no gateway. Não altera nada localmente.
    pub async fn verify_session(&self, session_id: &str) -> Result<StripeCheckoutSession, AppError> {
        if !is_valid_session_id(session_id) {
            return Err(AppError::BadRequest("session_id inválido".to_string()));
        }
        self.ensure_configured()?;

        let response = self
            .http
            .get(self.endpoint(&format!("checkout/sessions/{session_id}")))
            .bearer_auth(self.config.secret_key.reveal())
            .send()
            .await
            .map_err(GatewayError::from)?;

        Ok(parse_response(response).await?)
    }

    pub fn webhook_secret(&self) -> &str {
        self.config.webhook_secret.reveal()
    }

    pub fn amount_from_cents(cents: Option<i64>) -> Option<rust_decimal::Decimal> {
        cents.map(from_cents)
    }
}

async fn parse_response<T: serde::de::DeserializeOwned>(response: reqwest::Response) -> Result<T, GatewayError> {
    let status = response.status();
    if status.is_success() {
        return response.json::<T>().await.map_err(GatewayError::from);
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<StripeErrorBody>(&body)
        .ok()
        .and_then(|b| b.error.message)
        .unwrap_or(body);
    Err(GatewayError::Rejected {
        status: status.as_u16(),
        message,
    })
}
