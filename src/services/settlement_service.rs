// src/services/settlement_service.rs

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;

use crate::{
    common::error::AppError,
    db::{RegistrationStore, SettleOutcome, SettlementInput},
    services::{notification_service::NotificationService, registration_number::RegistrationNumberGenerator},
};

/// Único caminho que leva uma inscrição a PAID.
///
/// Webhooks, consultas de status e a varredura de PIX chamam `mark_paid`; chamadas
/// repetidas ou concorrentes para o mesmo id resultam em uma única transição e um
/// único e-mail.
#[derive(Clone)]
pub struct SettlementService {
    store: Arc<dyn RegistrationStore>,
    numbers: RegistrationNumberGenerator,
    notifications: NotificationService,
}

impl SettlementService {
    pub fn new(
        store: Arc<dyn RegistrationStore>,
        numbers: RegistrationNumberGenerator,
        notifications: NotificationService,
    ) -> Self {
        Self { store, numbers, notifications }
    }

    /// Retorna `true` se esta chamada aplicou PENDING -> PAID, `false` se já estava pago.
    pub async fn mark_paid(
        &self,
        registration_id: i64,
        amount: Option<Decimal>,
        payment_intent_id: Option<String>,
    ) -> Result<bool, AppError> {
        let input = SettlementInput {
            amount,
            payment_intent_id,
            paid_at: Utc::now(),
        };

        match self.store.settle(registration_id, input, &self.numbers).await? {
            SettleOutcome::AlreadyPaid(_) => {
                tracing::info!(registration_id, "Inscrição já estava paga; nada a fazer");
                Ok(false)
            }
            SettleOutcome::Settled(registration) => {
                tracing::info!(
                    registration_id,
                    registration_number = registration.registration_number.as_deref().unwrap_or_default(),
                    "✅ Pagamento confirmado"
                );
                // Falha no e-mail não desfaz a confirmação.
                self.notifications.send_payment_confirmation(&registration).await;
                Ok(true)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::settings::RaceInfo,
        db::InMemoryRegistrationStore,
        mocks::{fixtures, RecordingMailer},
        models::registration::PaymentStatus,
        services::registration_number::is_valid_number,
    };
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn service_with(
        store: Arc<InMemoryRegistrationStore>,
        mailer: RecordingMailer,
        numbers: RegistrationNumberGenerator,
    ) -> SettlementService {
        let notifications = NotificationService::new(store.clone(), Arc::new(mailer), Arc::new(RaceInfo::default()));
        SettlementService::new(store, numbers, notifications)
    }

    #[tokio::test]
    async fn first_call_settles_second_is_noop() {
        let store = Arc::new(InMemoryRegistrationStore::new());
        let registration = store.insert(&fixtures::adult_registration()).await.unwrap();
        let mailer = RecordingMailer::new();
        let service = service_with(store.clone(), mailer.clone(), RegistrationNumberGenerator::default());

        assert!(service.mark_paid(registration.id, Some(Decimal::new(5000, 2)), None).await.unwrap());
        let paid = store.find_by_id(registration.id).await.unwrap().unwrap();

        assert!(!service.mark_paid(registration.id, Some(Decimal::new(1, 2)), None).await.unwrap());
        let again = store.find_by_id(registration.id).await.unwrap().unwrap();

        assert_eq!(paid.payment_status, PaymentStatus::Paid);
        assert!(is_valid_number(paid.registration_number.as_deref().unwrap()));
        assert_eq!(again.registration_number, paid.registration_number);
        assert_eq!(again.payment_amount, Some(Decimal::new(5000, 2)));
        assert_eq!(again.payment_date, paid.payment_date);
        assert!(again.payment_email_sent);
        assert_eq!(mailer.sent_count(), 1);
    }

    #[tokio::test]
    async fn unknown_id_is_not_found() {
        let store = Arc::new(InMemoryRegistrationStore::new());
        let service = service_with(store, RecordingMailer::new(), RegistrationNumberGenerator::default());

        let err = service.mark_paid(999, None, None).await.unwrap_err();
        assert!(matches!(err, AppError::RegistrationNotFound(999)));
    }

    #[tokio::test]
    async fn email_failure_still_settles() {
        let store = Arc::new(InMemoryRegistrationStore::new());
        let registration = store.insert(&fixtures::adult_registration()).await.unwrap();
        let service = service_with(store.clone(), RecordingMailer::failing(), RegistrationNumberGenerator::default());

        assert!(service.mark_paid(registration.id, None, None).await.unwrap());
        let row = store.find_by_id(registration.id).await.unwrap().unwrap();
        assert!(row.is_paid());
        assert!(!row.payment_email_sent);
    }

    #[tokio::test]
    async fn collisions_are_retried() {
        let store = Arc::new(InMemoryRegistrationStore::new());
        let first = store.insert(&fixtures::adult_registration()).await.unwrap();
        let second = store.insert(&fixtures::adult_registration()).await.unwrap();

        // 11111, 11111, 22222, ...
        let calls = Arc::new(AtomicUsize::new(0));
        let c = calls.clone();
        let numbers = RegistrationNumberGenerator::from_fn(move || match c.fetch_add(1, Ordering::SeqCst) {
            0 | 1 => 11_111,
            _ => 22_222,
        });
        let service = service_with(store.clone(), RecordingMailer::new(), numbers);

        service.mark_paid(first.id, None, None).await.unwrap();
        service.mark_paid(second.id, None, None).await.unwrap();

        let first = store.find_by_id(first.id).await.unwrap().unwrap();
        let second = store.find_by_id(second.id).await.unwrap().unwrap();
        assert_eq!(first.registration_number.as_deref(), Some("11111"));
        assert_eq!(second.registration_number.as_deref(), Some("22222"));
    }

    #[tokio::test]
    async fn concurrent_settlement_transitions_once() {
        let store = Arc::new(InMemoryRegistrationStore::new());
        let registration = store.insert(&fixtures::adult_registration()).await.unwrap();
        let mailer = RecordingMailer::new();
        let service = service_with(store.clone(), mailer.clone(), RegistrationNumberGenerator::default());

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let service = service.clone();
                tokio::spawn(async move { service.mark_paid(registration.id, None, None).await })
            })
            .collect();

        let mut transitions = 0;
        for handle in handles {
            if handle.await.unwrap().unwrap() {
                transitions += 1;
            }
        }

        assert_eq!(transitions, 1);
        assert_eq!(mailer.sent_count(), 1);
    }
}
