// src/services/payment_gateway.rs

use std::collections::HashMap;

use rust_decimal::Decimal;

use crate::{
    common::error::AppError,
    models::{
        payment::{EmbeddedPayment, PaymentCharge},
        registration::Registration,
    },
    services::{
        checkout_gateway::CheckoutGateway,
        pix_gateway::{PixGateway, PixStatus},
        settlement_service::SettlementService,
    },
};

/// Os dois caminhos de cobrança. Ambos confirmam via `SettlementService`.
#[derive(Clone)]
pub enum PaymentGateway {
    Checkout(CheckoutGateway),
    Pix(PixGateway),
}

/// Estado de uma cobrança como reportado pelo provedor.
#[derive(Debug, Clone, Default)]
pub struct RemotePayment {
    pub paid: bool,
    pub status: String,
    pub registration_id: Option<i64>,
    pub amount: Option<Decimal>,
    /// Centavos, quando o provedor informa.
    pub amount_total: Option<i64>,
    pub payment_intent_id: Option<String>,
    pub customer_email: Option<String>,
    pub metadata: HashMap<String, String>,
    pub expires_at: Option<String>,
}

impl PaymentGateway {
    pub fn name(&self) -> &'static str {
        match self {
            PaymentGateway::Checkout(_) => "checkout",
            PaymentGateway::Pix(_) => "pix",
        }
    }

    pub async fn create(
        &self,
        registration: &Registration,
        coupon_code: Option<&str>,
        caller_origin: Option<&str>,
    ) -> Result<PaymentCharge, AppError> {
        match self {
            PaymentGateway::Checkout(gateway) => gateway
                .create_session(registration, caller_origin, coupon_code)
                .await
                .map(PaymentCharge::Card),
            PaymentGateway::Pix(gateway) => gateway.create_pix(registration, coupon_code).await.map(PaymentCharge::Pix),
        }
    }

    /// Versão de `create` que nunca falha: o erro vai embutido na resposta.
    pub async fn create_embedded(
        &self,
        registration: &Registration,
        coupon_code: Option<&str>,
        caller_origin: Option<&str>,
    ) -> EmbeddedPayment {
        match self.create(registration, coupon_code, caller_origin).await {
            Ok(charge) => EmbeddedPayment {
                success: true,
                charge: Some(charge),
                error: None,
            },
            Err(e) => {
                tracing::warn!(
                    registration_id = registration.id,
                    gateway = self.name(),
                    "⚠️ Inscrição criada, mas a cobrança falhou: {}",
                    e
                );
                EmbeddedPayment {
                    success: false,
                    charge: None,
                    error: Some(e.to_string()),
                }
            }
        }
    }

    /// Consulta o provedor pela sessão de checkout ou pelo id do PIX. Somente leitura.
    pub async fn verify_or_check(&self, reference: &str) -> Result<RemotePayment, AppError> {
        match self {
            PaymentGateway::Checkout(gateway) => {
                let session = gateway.verify_session(reference).await?;
                Ok(RemotePayment {
                    paid: session.is_paid(),
                    registration_id: session.registration_id(),
                    amount: CheckoutGateway::amount_from_cents(session.amount_total),
                    amount_total: session.amount_total,
                    customer_email: session.email(),
                    payment_intent_id: session.payment_intent.clone(),
                    status: session.payment_status,
                    metadata: session.metadata,
                    expires_at: None,
                })
            }
            PaymentGateway::Pix(gateway) => {
                let report = gateway.check_status(reference).await?;
                let registration = gateway.find_registration(reference).await?;
                Ok(RemotePayment {
                    paid: report.status == PixStatus::Paid,
                    status: report.status.as_str().to_string(),
                    registration_id: registration.as_ref().map(|r| r.id),
                    // O valor já foi gravado na criação do QR Code.
                    amount: None,
                    amount_total: None,
                    payment_intent_id: None,
                    customer_email: registration.map(|r| r.email),
                    metadata: HashMap::new(),
                    expires_at: report.expires_at,
                })
            }
        }
    }

    /// Consulta o provedor e, se a cobrança estiver paga, confirma localmente.
    /// Retorna o estado remoto e se esta chamada aplicou a transição.
    pub async fn reconcile(
        &self,
        reference: &str,
        settlement: &SettlementService,
    ) -> Result<(RemotePayment, bool), AppError> {
        let remote = self.verify_or_check(reference).await?;

        let settled = match (remote.paid, remote.registration_id) {
            (true, Some(registration_id)) => {
                settlement
                    .mark_paid(registration_id, remote.amount, remote.payment_intent_id.clone())
                    .await?
            }
            (true, None) => {
                tracing::warn!(
                    gateway = self.name(),
                    reference,
                    "Pagamento confirmado no provedor, mas sem inscrição associada"
                );
                false
            }
            _ => false,
        };

        Ok((remote, settled))
    }
}
