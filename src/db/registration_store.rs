// src/db/registration_store.rs

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;

use crate::{
    common::error::AppError,
    models::{
        registration::{NewRegistration, Registration},
        statistics::RaceStatistics,
    },
    services::registration_number::RegistrationNumberGenerator,
};

/// Dados aplicados na confirmação de pagamento.
#[derive(Debug, Clone)]
pub struct SettlementInput {
    pub amount: Option<Decimal>,
    pub payment_intent_id: Option<String>,
    pub paid_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub enum SettleOutcome {
    /// PENDING -> PAID aplicado por esta chamada.
    Settled(Registration),
    /// Já estava PAID; nada foi alterado.
    AlreadyPaid(Registration),
}

#[async_trait]
pub trait RegistrationStore: Send + Sync {
    async fn insert(&self, new: &NewRegistration) -> Result<Registration, AppError>;

    async fn find_by_id(&self, id: i64) -> Result<Option<Registration>, AppError>;

    async fn find_by_pix_id(&self, pix_id: &str) -> Result<Option<Registration>, AppError>;

    /// Mais recentes primeiro.
    async fn list(&self) -> Result<Vec<Registration>, AppError>;

    async fn list_paid(&self) -> Result<Vec<Registration>, AppError>;

    /// PENDING com identificador PIX não vazio.
    async fn list_pending_pix(&self) -> Result<Vec<Registration>, AppError>;

    async fn cpf_has_paid_registration(&self, cpf: &str) -> Result<bool, AppError>;

    /// Grava o cupom apenas se a inscrição ainda não tiver um. Retorna `true` se gravou.
    async fn record_coupon(&self, id: i64, code: &str, discount: Decimal) -> Result<bool, AppError>;

    async fn record_checkout_session(&self, id: i64, session_id: &str, amount: Decimal) -> Result<(), AppError>;

    async fn record_pix_charge(&self, id: i64, pix_id: &str, amount: Decimal) -> Result<(), AppError>;

    async fn mark_email_sent(&self, id: i64) -> Result<(), AppError>;

    /// Única transição PENDING -> PAID, com a linha travada durante toda a operação.
    async fn settle(
        &self,
        id: i64,
        input: SettlementInput,
        numbers: &RegistrationNumberGenerator,
    ) -> Result<SettleOutcome, AppError>;

    async fn statistics(&self, today: NaiveDate) -> Result<RaceStatistics, AppError>;
}
