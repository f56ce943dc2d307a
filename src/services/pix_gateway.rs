// src/services/pix_gateway.rs
//
// Adaptador de PIX direto (AbacatePay): QR Code dedicado por inscrição.

use std::{sync::Arc, time::Duration};

use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::{
    common::{
        documents::digits_only,
        error::{AppError, GatewayError},
    },
    config::settings::{AbacatePayConfig, AppEnvironment},
    db::RegistrationStore,
    models::{payment::PixCharge, registration::Registration},
    services::pricing::{from_cents, to_cents, ChargeQuoter},
};

/// Limite de caracteres da descrição aceita pelo provedor.
const MAX_DESCRIPTION_LEN: usize = 37;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PixStatus {
    Pending,
    Paid,
    Expired,
    Cancelled,
    Refunded,
    #[serde(other)]
    Unknown,
}

impl PixStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PixStatus::Pending => "PENDING",
            PixStatus::Paid => "PAID",
            PixStatus::Expired => "EXPIRED",
            PixStatus::Cancelled => "CANCELLED",
            PixStatus::Refunded => "REFUNDED",
            PixStatus::Unknown => "UNKNOWN",
        }
    }
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: Option<T>,
    error: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PixQrCodeData {
    id: String,
    amount: i64,
    status: PixStatus,
    br_code: String,
    br_code_base64: Option<String>,
    expires_at: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PixStatusReport {
    pub status: PixStatus,
    pub expires_at: Option<String>,
}

#[derive(Clone)]
pub struct PixGateway {
    http: Client,
    config: Arc<AbacatePayConfig>,
    environment: AppEnvironment,
    race_name: Arc<str>,
    store: Arc<dyn RegistrationStore>,
    quoter: ChargeQuoter,
}

impl PixGateway {
    pub fn new(
        config: AbacatePayConfig,
        environment: AppEnvironment,
        race_name: &str,
        timeout: Duration,
        store: Arc<dyn RegistrationStore>,
        quoter: ChargeQuoter,
    ) -> anyhow::Result<Self> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            config: Arc::new(config),
            environment,
            race_name: Arc::from(race_name),
            store,
            quoter,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/v1/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    fn ensure_configured(&self) -> Result<(), GatewayError> {
        if self.config.api_key.is_empty() {
            return Err(GatewayError::NotConfigured);
        }
        Ok(())
    }

    fn description(&self, registration: &Registration) -> String {
        format!("Inscrição #{} {}", registration.id, self.race_name)
            .chars()
            .take(MAX_DESCRIPTION_LEN)
            .collect()
    }

    pub async fn create_pix(
        &self,
        registration: &Registration,
        coupon_code: Option<&str>,
    ) -> Result<PixCharge, AppError> {
        if registration.is_paid() {
            return Err(AppError::AlreadyPaid(registration.id));
        }
        self.ensure_configured()?;

        let quote = self.quoter.quote(registration, coupon_code).await?;

        let mut body = json!({
            "amount": to_cents(quote.amount),
            "expiresIn": self.config.expires_in_secs,
            "description": self.description(registration),
            "metadata": { "externalId": registration.id.to_string() },
        });
        // O provedor exige os quatro campos do cliente juntos.
        if let Some(tax_id) = registration.payer_cpf() {
            body["customer"] = json!({
                "name": registration.payer_name(),
                "cellphone": digits_only(registration.payer_phone()),
                "email": registration.responsible_email.as_deref().unwrap_or(&registration.email),
                "taxId": tax_id,
            });
        }

        let response = self
            .http
            .post(self.endpoint("pixQrCode/create"))
            .bearer_auth(self.config.api_key.reveal())
            .json(&body)
            .send()
            .await
            .map_err(GatewayError::from)?;

        let data: PixQrCodeData = unwrap_envelope(response).await?;
        let amount = from_cents(data.amount);

        // Persistido assim que o provedor devolve o id, antes de responder ao cliente.
        self.store.record_pix_charge(registration.id, &data.id, amount).await?;

        tracing::info!(
            registration_id = registration.id,
            pix_id = %data.id,
            "🟢 QR Code PIX criado ({})",
            amount
        );

        Ok(PixCharge {
            pix_id: data.id,
            pix_code: data.br_code,
            qr_code_base64: data.br_code_base64,
            amount,
            status: data.status.as_str().to_string(),
            expires_at: data.expires_at,
        })
    }

    pub async fn check_status(&self, pix_id: &str) -> Result<PixStatusReport, AppError> {
        self.ensure_configured()?;

        let response = self
            .http
            .get(self.endpoint("pixQrCode/check"))
            .query(&[("id", pix_id)])
            .bearer_auth(self.config.api_key.reveal())
            .send()
            .await
            .map_err(GatewayError::from)?;

        Ok(unwrap_envelope(response).await?)
    }

    pub async fn find_registration(&self, pix_id: &str) -> Result<Option<Registration>, AppError> {
        self.store.find_by_pix_id(pix_id).await
    }

    /// Simula o pagamento no ambiente de testes do provedor. Recusado em produção.
    pub async fn simulate_payment(&self, pix_id: &str) -> Result<PixStatusReport, AppError> {
        if self.environment.is_production() {
            return Err(AppError::Forbidden(
                "Simulação de pagamento indisponível em produção.".to_string(),
            ));
        }
        self.ensure_configured()?;

        let response = self
            .http
            .post(self.endpoint("pixQrCode/simulate-payment"))
            .query(&[("id", pix_id)])
            .bearer_auth(self.config.api_key.reveal())
            .json(&json!({ "metadata": {} }))
            .send()
            .await
            .map_err(GatewayError::from)?;

        Ok(unwrap_envelope(response).await?)
    }
}

async fn unwrap_envelope<T: serde::de::DeserializeOwned>(response: reqwest::Response) -> Result<T, GatewayError> {
    let status = response.status();
    let text = response.text().await.map_err(GatewayError::from)?;

    let envelope: Envelope<T> = serde_json::from_str(&text).map_err(|e| {
        if status.is_success() {
            GatewayError::InvalidResponse(e.to_string())
        } else {
            GatewayError::Rejected { status: status.as_u16(), message: text.clone() }
        }
    })?;

    if let Some(error) = envelope.error.filter(|e| !e.is_null()) {
        let message = error.as_str().map(str::to_string).unwrap_or_else(|| error.to_string());
        return Err(GatewayError::Rejected { status: status.as_u16(), message });
    }
    if !status.is_success() {
        return Err(GatewayError::Rejected {
            status: status.as_u16(),
            message: format!("HTTP {status}"),
        });
    }

    envelope
        .data
        .ok_or_else(|| GatewayError::InvalidResponse("resposta sem campo data".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_statuses_do_not_break_parsing() {
        let report: PixStatusReport =
            serde_json::from_str(r#"{"status":"UNDER_DISPUTE","expiresAt":null}"#).unwrap();
        assert_eq!(report.status, PixStatus::Unknown);

        let report: PixStatusReport = serde_json::from_str(r#"{"status":"PAID"}"#).unwrap();
        assert_eq!(report.status, PixStatus::Paid);
    }
}
