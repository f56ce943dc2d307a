// src/db/memory_repo.rs
//
// Store em memória com a mesma semântica do Postgres. O mutex único faz o papel do
// `SELECT ... FOR UPDATE`: a confirmação inteira acontece com o lock segurado.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use tokio::sync::Mutex;

use crate::{
    common::error::AppError,
    db::registration_store::{RegistrationStore, SettleOutcome, SettlementInput},
    models::{
        registration::{NewRegistration, PaymentStatus, Registration},
        statistics::RaceStatistics,
    },
    services::registration_number::RegistrationNumberGenerator,
};

#[derive(Default)]
struct State {
    rows: BTreeMap<i64, Registration>,
    last_id: i64,
}

#[derive(Default)]
pub struct InMemoryRegistrationStore {
    state: Mutex<State>,
}

impl InMemoryRegistrationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insere uma linha pronta (ex.: uma inscrição já paga) para montar cenários de teste.
    pub async fn put(&self, registration: Registration) {
        let mut state = self.state.lock().await;
        state.last_id = state.last_id.max(registration.id);
        state.rows.insert(registration.id, registration);
    }

    fn newest_first(rows: impl Iterator<Item = Registration>) -> Vec<Registration> {
        let mut rows: Vec<Registration> = rows.collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        rows
    }

    async fn update<F>(&self, id: i64, change: F) -> Result<(), AppError>
    where
        F: FnOnce(&mut Registration) + Send,
    {
        let mut state = self.state.lock().await;
        if let Some(row) = state.rows.get_mut(&id) {
            change(row);
            row.updated_at = Utc::now();
        }
        Ok(())
    }
}

#[async_trait]
impl RegistrationStore for InMemoryRegistrationStore {
    async fn insert(&self, new: &NewRegistration) -> Result<Registration, AppError> {
        let mut state = self.state.lock().await;
        state.last_id += 1;
        let now = Utc::now();

        let registration = Registration {
            id: state.last_id,
            full_name: new.full_name.clone(),
            cpf: new.cpf.clone(),
            email: new.email.clone(),
            phone: new.phone.clone(),
            birth_date: new.birth_date,
            gender: new.gender,
            modality: new.modality,
            course: new.course,
            shirt_size: new.shirt_size.clone(),
            responsible_full_name: new.responsible_full_name.clone(),
            responsible_cpf: new.responsible_cpf.clone(),
            responsible_email: new.responsible_email.clone(),
            responsible_phone: new.responsible_phone.clone(),
            athlete_declaration: new.athlete_declaration,
            payment_status: PaymentStatus::Pending,
            checkout_session_id: None,
            payment_intent_id: None,
            pix_id: None,
            payment_amount: None,
            payment_date: None,
            registration_number: None,
            payment_email_sent: false,
            coupon_code: None,
            coupon_discount: None,
            created_at: now,
            updated_at: now,
        };

        state.rows.insert(registration.id, registration.clone());
        Ok(registration)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Registration>, AppError> {
        Ok(self.state.lock().await.rows.get(&id).cloned())
    }

    async fn find_by_pix_id(&self, pix_id: &str) -> Result<Option<Registration>, AppError> {
        let state = self.state.lock().await;
        Ok(state
            .rows
            .values()
            .rev()
            .find(|r| r.pix_id.as_deref() == Some(pix_id))
            .cloned())
    }

    async fn list(&self) -> Result<Vec<Registration>, AppError> {
        let state = self.state.lock().await;
        Ok(Self::newest_first(state.rows.values().cloned()))
    }

    async fn list_paid(&self) -> Result<Vec<Registration>, AppError> {
        let state = self.state.lock().await;
        Ok(Self::newest_first(state.rows.values().filter(|r| r.is_paid()).cloned()))
    }

    async fn list_pending_pix(&self) -> Result<Vec<Registration>, AppError> {
        let state = self.state.lock().await;
        Ok(Self::newest_first(
            state
                .rows
                .values()
                .filter(|r| !r.is_paid() && r.pix_id.as_deref().is_some_and(|p| !p.is_empty()))
                .cloned(),
        ))
    }

    async fn cpf_has_paid_registration(&self, cpf: &str) -> Result<bool, AppError> {
        let state = self.state.lock().await;
        Ok(state
            .rows
            .values()
            .any(|r| r.is_paid() && r.cpf.as_deref() == Some(cpf)))
    }

    async fn record_coupon(&self, id: i64, code: &str, discount: Decimal) -> Result<bool, AppError> {
        let mut state = self.state.lock().await;
        match state.rows.get_mut(&id) {
            Some(row) if row.coupon_code.is_none() => {
                row.coupon_code = Some(code.to_string());
                row.coupon_discount = Some(discount);
                row.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn record_checkout_session(&self, id: i64, session_id: &str, amount: Decimal) -> Result<(), AppError> {
        let session_id = session_id.to_string();
        self.update(id, move |row| {
            row.checkout_session_id = Some(session_id);
            row.payment_amount = Some(amount);
        })
        .await
    }

    async fn record_pix_charge(&self, id: i64, pix_id: &str, amount: Decimal) -> Result<(), AppError> {
        let pix_id = pix_id.to_string();
        self.update(id, move |row| {
            row.pix_id = Some(pix_id);
            row.payment_amount = Some(amount);
        })
        .await
    }

    async fn mark_email_sent(&self, id: i64) -> Result<(), AppError> {
        self.update(id, |row| row.payment_email_sent = true).await
    }

    async fn settle(
        &self,
        id: i64,
        input: SettlementInput,
        numbers: &RegistrationNumberGenerator,
    ) -> Result<SettleOutcome, AppError> {
        let mut state = self.state.lock().await;

        let current = state.rows.get(&id).cloned().ok_or(AppError::RegistrationNotFound(id))?;
        if current.is_paid() {
            return Ok(SettleOutcome::AlreadyPaid(current));
        }

        let number = match current.registration_number {
            Some(existing) => existing,
            None => {
                let taken = |candidate: &str| {
                    state
                        .rows
                        .values()
                        .any(|r| r.registration_number.as_deref() == Some(candidate))
                };
                let mut candidates = numbers.candidates();
                candidates
                    .find(|candidate| !taken(candidate.as_str()))
                    .unwrap_or_else(|| numbers.fallback())
            }
        };

        let row = state.rows.get_mut(&id).ok_or(AppError::RegistrationNotFound(id))?;
        row.payment_status = PaymentStatus::Paid;
        row.payment_date = Some(input.paid_at);
        if let Some(amount) = input.amount {
            row.payment_amount = Some(amount);
        }
        if let Some(intent) = input.payment_intent_id {
            row.payment_intent_id = Some(intent);
        }
        row.registration_number = Some(number);
        row.updated_at = Utc::now();

        Ok(SettleOutcome::Settled(row.clone()))
    }

    async fn statistics(&self, today: NaiveDate) -> Result<RaceStatistics, AppError> {
        let rows = self.list().await?;
        Ok(RaceStatistics::from_registrations(&rows, today, Utc::now()))
    }
}
