//! Implementações de teste (feature `test-utils`).

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex,
};

use async_trait::async_trait;

use crate::{
    common::error::AppError,
    services::mailer::{Mailer, OutgoingEmail},
};

/// Guarda os e-mails "enviados"; pode ser configurado para falhar.
#[derive(Clone, Default)]
pub struct RecordingMailer {
    sent: Arc<Mutex<Vec<OutgoingEmail>>>,
    fail: Arc<AtomicBool>,
}

impl RecordingMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        let mailer = Self::default();
        mailer.set_failing(true);
        mailer
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<OutgoingEmail> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }

    pub fn sent_count(&self) -> usize {
        self.sent().len()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), AppError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(AppError::EmailError("SMTP indisponível".to_string()));
        }
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(email.clone());
        }
        Ok(())
    }
}

/// Inscrições prontas para montar cenários.
pub mod fixtures {
    use chrono::NaiveDate;

    use crate::models::registration::{Course, Gender, Modality, NewRegistration};

    pub fn adult_registration() -> NewRegistration {
        NewRegistration {
            full_name: "Maria da Silva".to_string(),
            cpf: Some("52998224725".to_string()),
            email: "maria@example.com".to_string(),
            phone: "11999998888".to_string(),
            birth_date: NaiveDate::from_ymd_opt(1990, 5, 20).unwrap_or_default(),
            gender: Gender::Female,
            modality: Modality::Adulto,
            course: Course::Run5k,
            shirt_size: "M".to_string(),
            responsible_full_name: None,
            responsible_cpf: None,
            responsible_email: None,
            responsible_phone: None,
            athlete_declaration: true,
        }
    }

    pub fn child_registration() -> NewRegistration {
        NewRegistration {
            full_name: "Pedro da Silva".to_string(),
            cpf: None,
            email: "maria@example.com".to_string(),
            phone: "11999998888".to_string(),
            birth_date: NaiveDate::from_ymd_opt(2017, 3, 10).unwrap_or_default(),
            gender: Gender::Male,
            modality: Modality::Infantil,
            course: Course::Kids,
            shirt_size: "8".to_string(),
            responsible_full_name: Some("Maria da Silva".to_string()),
            responsible_cpf: Some("52998224725".to_string()),
            responsible_email: Some("maria@example.com".to_string()),
            responsible_phone: Some("11999998888".to_string()),
            athlete_declaration: true,
        }
    }
}
