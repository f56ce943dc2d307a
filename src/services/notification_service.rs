// src/services/notification_service.rs

use std::sync::Arc;

use chrono::Utc;

use crate::{
    config::settings::RaceInfo,
    db::RegistrationStore,
    models::registration::{Modality, Registration},
    services::mailer::{Mailer, OutgoingEmail},
};

#[derive(Clone)]
pub struct NotificationService {
    store: Arc<dyn RegistrationStore>,
    mailer: Arc<dyn Mailer>,
    race: Arc<RaceInfo>,
}

impl NotificationService {
    pub fn new(store: Arc<dyn RegistrationStore>, mailer: Arc<dyn Mailer>, race: Arc<RaceInfo>) -> Self {
        Self { store, mailer, race }
    }

    /// Envia a confirmação de pagamento. Nunca propaga erro: falhas são logadas e
    /// retornam `false`, sem marcar `payment_email_sent`.
    pub async fn send_payment_confirmation(&self, registration: &Registration) -> bool {
        let email = render_payment_confirmation(registration, &self.race);

        if let Err(e) = self.mailer.send(&email).await {
            tracing::error!(
                registration_id = registration.id,
                "❌ Falha ao enviar e-mail de confirmação para {}: {}",
                email.to,
                e
            );
            return false;
        }

        if let Err(e) = self.store.mark_email_sent(registration.id).await {
            tracing::error!(
                registration_id = registration.id,
                "E-mail enviado, mas não foi possível registrar o envio: {}",
                e
            );
            return false;
        }

        tracing::info!(registration_id = registration.id, "📧 E-mail de confirmação enviado para {}", email.to);
        true
    }

    /// Avisa que a inscrição foi recebida e aguarda pagamento. Não altera a linha.
    pub async fn send_registration_confirmation(&self, registration: &Registration) -> bool {
        let email = render_registration_confirmation(registration, &self.race);

        match self.mailer.send(&email).await {
            Ok(()) => {
                tracing::info!(registration_id = registration.id, "📧 E-mail de inscrição enviado para {}", email.to);
                true
            }
            Err(e) => {
                tracing::warn!(
                    registration_id = registration.id,
                    "⚠️ Falha ao enviar e-mail de inscrição para {}: {}",
                    email.to,
                    e
                );
                false
            }
        }
    }
}

fn or_placeholder(value: &str) -> &str {
    if value.trim().is_empty() { "-" } else { value }
}

fn guardian_lines(registration: &Registration) -> (String, String) {
    match (registration.modality, &registration.responsible_full_name) {
        (Modality::Infantil, Some(responsible)) => (
            format!("Responsável: {responsible}\n"),
            format!("<li><strong>Responsável:</strong> {responsible}</li>"),
        ),
        _ => (String::new(), String::new()),
    }
}

pub fn render_registration_confirmation(registration: &Registration, race: &RaceInfo) -> OutgoingEmail {
    let today = Utc::now().date_naive();
    let name = &registration.full_name;
    let course = registration.course.label();
    let modality = registration.modality.label();
    let shirt = registration.shirt_size_label();
    let age = registration.age_on(today);
    let id = registration.id;
    let kit = &race.kit_pickup;
    let whatsapp = or_placeholder(&race.contact_whatsapp);
    let (guardian_text, guardian_html) = guardian_lines(registration);

    let subject = format!("Confirmação de inscrição - {}", race.name);

    let text_body = format!(
        "Olá, {name}!\n\n\
         Recebemos sua inscrição na {race_name}. Ela será confirmada após o pagamento.\n\n\
         Inscrição: #{id}\n\
         Percurso: {course} ({modality})\n\
         Idade: {age} anos\n\
         Camiseta: {shirt}\n\
         {guardian_text}\n\
         Data: {date}\n\
         Local: {location}\n\
         Largada: {start}\n\n\
         Retirada do kit\n\
         Data: {kit_date}\n\
         Horário: {kit_time}\n\
         Local: {kit_location}\n\
         Documentos: {kit_docs}\n\n\
         Dúvidas: {contact_email} | WhatsApp: {whatsapp}\n",
        race_name = race.name,
        date = race.date,
        location = race.location,
        start = race.start_time,
        kit_date = kit.date,
        kit_time = kit.time,
        kit_location = kit.location,
        kit_docs = kit.required_documents,
        contact_email = race.contact_email,
    );

    let html_body = format!(
        r#"
<!DOCTYPE html>
<html>
<head>
    <meta charset="UTF-8">
    <title>{subject}</title>
</head>
<body style="font-family: Arial, sans-serif; line-height: 1.6; color: #333;">
    <div style="max-width: 600px; margin: 0 auto; padding: 20px;">
        <h2 style="color: #2563eb;">Inscrição recebida!</h2>
        <p>Olá, <strong>{name}</strong>! Recebemos sua inscrição na <strong>{race_name}</strong>.</p>
        <p>Ela será confirmada assim que o pagamento for aprovado.</p>
        <ul>
            <li><strong>Inscrição:</strong> #{id}</li>
            <li><strong>Percurso:</strong> {course} ({modality})</li>
            <li><strong>Idade:</strong> {age} anos</li>
            <li><strong>Camiseta:</strong> {shirt}</li>
            {guardian_html}
        </ul>
        <h3>Evento</h3>
        <p>{date} &middot; {location} &middot; Largada às {start}</p>
        <h3>Retirada do kit</h3>
        <p>{kit_date}, {kit_time}<br>{kit_location}<br>Leve: {kit_docs}</p>
        <p style="color: #666; font-size: 14px; margin-top: 40px;">
            Dúvidas: {contact_email} &middot; WhatsApp: {whatsapp}
        </p>
    </div>
</body>
</html>
"#,
        race_name = race.name,
        date = race.date,
        location = race.location,
        start = race.start_time,
        kit_date = kit.date,
        kit_time = kit.time,
        kit_location = kit.location,
        kit_docs = kit.required_documents,
        contact_email = race.contact_email,
    );

    OutgoingEmail {
        to: registration.email.clone(),
        subject,
        text_body,
        html_body,
    }
}

pub fn render_payment_confirmation(registration: &Registration, race: &RaceInfo) -> OutgoingEmail {
    let number = registration.registration_number.as_deref().unwrap_or("-");
    let today = Utc::now().date_naive();
    let name = &registration.full_name;
    let course = registration.course.label();
    let modality = registration.modality.label();
    let shirt = registration.shirt_size_label();
    let age = registration.age_on(today);
    let amount = registration
        .payment_amount
        .map(|a| format!("R$ {:.2}", a).replace('.', ","))
        .unwrap_or_else(|| "-".to_string());
    let kit = &race.kit_pickup;
    let whatsapp = or_placeholder(&race.contact_whatsapp);

    let (guardian_text, guardian_html) = guardian_lines(registration);

    let subject = format!("Pagamento confirmado - {}", race.name);

    let text_body = format!(
        "Olá, {name}!\n\n\
         Seu pagamento foi confirmado e sua inscrição na {race_name} está garantida.\n\n\
         Número de inscrição: {number}\n\
         Percurso: {course} ({modality})\n\
         Idade: {age} anos\n\
         Camiseta: {shirt}\n\
         Valor pago: {amount}\n\
         {guardian_text}\n\
         Data: {date}\n\
         Local: {location}\n\
         Largada: {start}\n\n\
         Retirada do kit\n\
         Data: {kit_date}\n\
         Horário: {kit_time}\n\
         Local: {kit_location}\n\
         Documentos: {kit_docs}\n\n\
         Dúvidas: {contact_email} | WhatsApp: {whatsapp}\n",
        race_name = race.name,
        date = race.date,
        location = race.location,
        start = race.start_time,
        kit_date = kit.date,
        kit_time = kit.time,
        kit_location = kit.location,
        kit_docs = kit.required_documents,
        contact_email = race.contact_email,
    );

    let html_body = format!(
        r#"
<!DOCTYPE html>
<html>
<head>
    <meta charset="UTF-8">
    <title>{subject}</title>
</head>
<body style="font-family: Arial, sans-serif; line-height: 1.6; color: #333;">
    <div style="max-width: 600px; margin: 0 auto; padding: 20px;">
        <h2 style="color: #16a34a;">Pagamento confirmado!</h2>
        <p>Olá, <strong>{name}</strong>! Sua inscrição na <strong>{race_name}</strong> está garantida.</p>
        <p style="font-size: 22px; margin: 24px 0;">
            Número de inscrição: <strong>{number}</strong>
        </p>
        <ul>
            <li><strong>Percurso:</strong> {course} ({modality})</li>
            <li><strong>Idade:</strong> {age} anos</li>
            <li><strong>Camiseta:</strong> {shirt}</li>
            <li><strong>Valor pago:</strong> {amount}</li>
            {guardian_html}
        </ul>
        <h3>Evento</h3>
        <p>{date} &middot; {location} &middot; Largada às {start}</p>
        <h3>Retirada do kit</h3>
        <p>{kit_date}, {kit_time}<br>{kit_location}<br>Leve: {kit_docs}</p>
        <p style="color: #666; font-size: 14px; margin-top: 40px;">
            Dúvidas: {contact_email} &middot; WhatsApp: {whatsapp}
        </p>
    </div>
</body>
</html>
"#,
        race_name = race.name,
        date = race.date,
        location = race.location,
        start = race.start_time,
        kit_date = kit.date,
        kit_time = kit.time,
        kit_location = kit.location,
        kit_docs = kit.required_documents,
        contact_email = race.contact_email,
    );

    OutgoingEmail {
        to: registration.email.clone(),
        subject,
        text_body,
        html_body,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        db::{InMemoryRegistrationStore, RegistrationStore},
        mocks::{fixtures, RecordingMailer},
    };

    fn race() -> RaceInfo {
        RaceInfo {
            name: "Corrida Teste 2025".to_string(),
            ..RaceInfo::default()
        }
    }

    #[tokio::test]
    async fn renders_name_race_and_number() {
        let store = InMemoryRegistrationStore::new();
        let mut registration = store.insert(&fixtures::adult_registration()).await.unwrap();
        registration.registration_number = Some("48213".to_string());

        let email = render_payment_confirmation(&registration, &race());

        assert_eq!(email.to, "maria@example.com");
        assert!(email.subject.contains("Pagamento confirmado"));
        for body in [&email.text_body, &email.html_body] {
            assert!(body.contains("Maria da Silva"));
            assert!(body.contains("Corrida Teste 2025"));
            assert!(body.contains("48213"));
        }
    }

    #[tokio::test]
    async fn success_marks_flag() {
        let store = Arc::new(InMemoryRegistrationStore::new());
        let registration = store.insert(&fixtures::adult_registration()).await.unwrap();
        let mailer = RecordingMailer::new();
        let service = NotificationService::new(store.clone(), Arc::new(mailer.clone()), Arc::new(race()));

        assert!(service.send_payment_confirmation(&registration).await);
        assert_eq!(mailer.sent_count(), 1);
        assert!(store.find_by_id(registration.id).await.unwrap().unwrap().payment_email_sent);
    }

    #[tokio::test]
    async fn registration_email_leaves_payment_flag_alone() {
        let store = Arc::new(InMemoryRegistrationStore::new());
        let registration = store.insert(&fixtures::child_registration()).await.unwrap();
        let mailer = RecordingMailer::new();
        let service = NotificationService::new(store.clone(), Arc::new(mailer.clone()), Arc::new(race()));

        assert!(service.send_registration_confirmation(&registration).await);

        let sent = mailer.sent();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].subject.contains("Confirmação de inscrição"));
        assert!(sent[0].text_body.contains("Responsável: Maria da Silva"));
        assert!(sent[0].html_body.contains("Corrida Teste 2025"));
        assert!(!store.find_by_id(registration.id).await.unwrap().unwrap().payment_email_sent);

        mailer.set_failing(true);
        assert!(!service.send_registration_confirmation(&registration).await);
    }

    #[tokio::test]
    async fn failure_is_swallowed_and_flag_stays_false() {
        let store = Arc::new(InMemoryRegistrationStore::new());
        let registration = store.insert(&fixtures::adult_registration()).await.unwrap();
        let service = NotificationService::new(
            store.clone(),
            Arc::new(RecordingMailer::failing()),
            Arc::new(race()),
        );

        assert!(!service.send_payment_confirmation(&registration).await);
        assert!(!store.find_by_id(registration.id).await.unwrap().unwrap().payment_email_sent);
    }
}
