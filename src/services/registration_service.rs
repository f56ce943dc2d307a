// src/services/registration_service.rs

use std::{borrow::Cow, sync::Arc};

use chrono::{NaiveDate, Utc};
use validator::{Validate, ValidationError, ValidationErrors};

use crate::{
    common::{
        documents::{digits_only, is_valid_cpf, is_valid_phone},
        error::AppError,
    },
    db::RegistrationStore,
    models::{
        registration::{
            age_on, Course, CreateRegistrationPayload, Modality, NewRegistration, PaymentMethod,
            RegistrationCreated, RegistrationList, RegistrationView, MINIMUM_ADULT_COURSE_AGE,
        },
        statistics::RaceStatistics,
    },
    services::{notification_service::NotificationService, payment_gateway::PaymentGateway},
};

#[derive(Clone)]
pub struct RegistrationService {
    store: Arc<dyn RegistrationStore>,
    checkout: PaymentGateway,
    pix: PaymentGateway,
    notifications: NotificationService,
}

impl RegistrationService {
    pub fn new(
        store: Arc<dyn RegistrationStore>,
        checkout: PaymentGateway,
        pix: PaymentGateway,
        notifications: NotificationService,
    ) -> Self {
        Self {
            store,
            checkout,
            pix,
            notifications,
        }
    }

    // =========================================================================
    //  1. CADASTRO
    // =========================================================================

    /// Normaliza, valida, grava como PENDING e cria a cobrança pelo método escolhido.
    /// Falha do gateway não desfaz a inscrição: o erro vai em `payment`.
    pub async fn create(
        &self,
        payload: CreateRegistrationPayload,
        caller_origin: Option<&str>,
    ) -> Result<RegistrationCreated, AppError> {
        let today = Utc::now().date_naive();
        let payload = normalize(payload);
        let new = validate(&payload, today, self.store.as_ref()).await?;

        let registration = self.store.insert(&new).await?;
        tracing::info!(
            registration_id = registration.id,
            course = registration.course.label(),
            "📝 Nova inscrição criada"
        );

        // Falha no e-mail não impede o cadastro.
        self.notifications.send_registration_confirmation(&registration).await;

        let gateway = match payload.payment_method {
            PaymentMethod::Card => &self.checkout,
            PaymentMethod::Pix => &self.pix,
        };
        let payment = gateway
            .create_embedded(&registration, payload.coupon_code.as_deref(), caller_origin)
            .await;

        Ok(RegistrationCreated {
            registration: RegistrationView::new(registration, today),
            payment,
        })
    }

    // =========================================================================
    //  2. CONSULTAS
    // =========================================================================

    pub async fn list(&self) -> Result<RegistrationList, AppError> {
        let today = Utc::now().date_naive();
        let results: Vec<RegistrationView> = self
            .store
            .list()
            .await?
            .into_iter()
            .map(|r| RegistrationView::new(r, today))
            .collect();
        Ok(RegistrationList {
            count: results.len(),
            results,
        })
    }

    pub async fn get(&self, id: i64) -> Result<RegistrationView, AppError> {
        let registration = self
            .store
            .find_by_id(id)
            .await?
            .ok_or(AppError::RegistrationNotFound(id))?;
        Ok(RegistrationView::new(registration, Utc::now().date_naive()))
    }

    pub async fn statistics(&self) -> Result<RaceStatistics, AppError> {
        self.store.statistics(Utc::now().date_naive()).await
    }
}

// =============================================================================
//  NORMALIZAÇÃO
// =============================================================================

fn trimmed(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn digits(value: Option<String>) -> Option<String> {
    value.map(|v| digits_only(&v)).filter(|v| !v.is_empty())
}

/// Aplicada antes da validação. Percurso ausente vira KIDS (categoria infantil)
/// ou RUN_5K; categoria ausente é derivada do percurso. Uma categoria informada
/// nunca é sobrescrita, para que a validação acuse o conflito.
pub fn normalize(mut payload: CreateRegistrationPayload) -> CreateRegistrationPayload {
    payload.full_name = payload.full_name.trim().to_string();
    payload.email = payload.email.trim().to_lowercase();
    payload.phone = digits_only(&payload.phone);
    payload.cpf = digits(payload.cpf);
    payload.shirt_size = payload.shirt_size.trim().to_uppercase();

    payload.responsible_full_name = trimmed(payload.responsible_full_name);
    payload.responsible_cpf = digits(payload.responsible_cpf);
    payload.responsible_email = trimmed(payload.responsible_email).map(|e| e.to_lowercase());
    payload.responsible_phone = digits(payload.responsible_phone);
    payload.coupon_code = trimmed(payload.coupon_code);

    let course = payload.course.unwrap_or(match payload.modality {
        Some(Modality::Infantil) => Course::Kids,
        _ => Course::Run5k,
    });
    payload.course = Some(course);
    payload.modality = Some(payload.modality.unwrap_or(course.modality()));
    payload
}

// =============================================================================
//  VALIDAÇÃO
// =============================================================================

fn add_error(errors: &mut ValidationErrors, field: &'static str, code: &'static str, message: impl Into<String>) {
    let mut error = ValidationError::new(code);
    error.message = Some(Cow::from(message.into()));
    errors.add(field, error);
}

/// Valida um payload já normalizado. Nada é gravado quando há erro.
pub async fn validate(
    payload: &CreateRegistrationPayload,
    today: NaiveDate,
    store: &dyn RegistrationStore,
) -> Result<NewRegistration, AppError> {
    let mut errors = match payload.validate() {
        Ok(()) => ValidationErrors::new(),
        Err(e) => e,
    };

    // normalize() sempre preenche os dois
    let course = payload.course.unwrap_or(Course::Run5k);
    let modality = payload.modality.unwrap_or(course.modality());

    if modality != course.modality() {
        add_error(
            &mut errors,
            "modality",
            "modality_mismatch",
            format!(
                "A modalidade {} não corresponde ao percurso {}.",
                modality.label(),
                course.label()
            ),
        );
    }

    if !payload.athlete_declaration {
        add_error(
            &mut errors,
            "athlete_declaration",
            "required",
            "Você deve marcar 'Ciente' para se inscrever.",
        );
    }

    match payload.birth_date {
        None => add_error(&mut errors, "birth_date", "required", "Informe a data de nascimento."),
        Some(birth) if birth > today => add_error(
            &mut errors,
            "birth_date",
            "future_date",
            "A data de nascimento não pode ser no futuro.",
        ),
        Some(birth) if course.requires_minimum_age() && age_on(birth, today) < MINIMUM_ADULT_COURSE_AGE => {
            add_error(
                &mut errors,
                "birth_date",
                "minimum_age",
                format!(
                    "O atleta deve ter pelo menos {} anos para se inscrever neste percurso.",
                    MINIMUM_ADULT_COURSE_AGE
                ),
            )
        }
        Some(_) => {}
    }

    if payload.gender.is_none() {
        add_error(&mut errors, "gender", "required", "Informe o sexo.");
    }

    if !is_valid_phone(&payload.phone) {
        add_error(&mut errors, "phone", "invalid_phone", "Telefone deve ter 10 ou 11 dígitos.");
    }

    match (&payload.cpf, course) {
        (None, Course::Kids) => {}
        (None, _) => add_error(&mut errors, "cpf", "required", "Informe o CPF."),
        (Some(cpf), _) if !is_valid_cpf(cpf) => add_error(&mut errors, "cpf", "invalid_cpf", "CPF inválido."),
        _ => {}
    }

    let sizes = modality.shirt_sizes();
    if !sizes.contains(&payload.shirt_size.as_str()) {
        add_error(
            &mut errors,
            "shirt_size",
            "invalid_size",
            format!(
                "Para modalidade {}, o tamanho deve ser: {}",
                modality.label().to_lowercase(),
                sizes.join(", ")
            ),
        );
    }

    if modality == Modality::Infantil {
        validate_guardian(payload, &mut errors);
    }

    // Consulta ao banco só quando o restante do CPF já passou.
    if course != Course::Kids && !errors.field_errors().contains_key("cpf") {
        if let Some(cpf) = &payload.cpf {
            if store.cpf_has_paid_registration(cpf).await? {
                add_error(
                    &mut errors,
                    "cpf",
                    "duplicate_cpf",
                    "Já existe uma inscrição paga com este CPF.",
                );
            }
        }
    }

    if !errors.is_empty() {
        return Err(AppError::ValidationError(errors));
    }

    let (Some(birth_date), Some(gender)) = (payload.birth_date, payload.gender) else {
        return Err(AppError::BadRequest("Dados incompletos.".to_string()));
    };

    Ok(NewRegistration {
        full_name: payload.full_name.clone(),
        cpf: payload.cpf.clone(),
        email: payload.email.clone(),
        phone: payload.phone.clone(),
        birth_date,
        gender,
        modality,
        course,
        shirt_size: payload.shirt_size.clone(),
        responsible_full_name: payload.responsible_full_name.clone(),
        responsible_cpf: payload.responsible_cpf.clone(),
        responsible_email: payload.responsible_email.clone(),
        responsible_phone: payload.responsible_phone.clone(),
        athlete_declaration: payload.athlete_declaration,
    })
}

fn validate_guardian(payload: &CreateRegistrationPayload, errors: &mut ValidationErrors) {
    match payload.responsible_full_name.as_deref() {
        Some(name) if name.chars().count() >= 3 => {}
        _ => add_error(
            errors,
            "responsible_full_name",
            "required",
            "Informe o nome completo do responsável.",
        ),
    }

    match payload.responsible_cpf.as_deref() {
        Some(cpf) if is_valid_cpf(cpf) => {}
        Some(_) => add_error(errors, "responsible_cpf", "invalid_cpf", "CPF do responsável inválido."),
        None => add_error(errors, "responsible_cpf", "required", "Informe o CPF do responsável."),
    }

    // O formato é conferido pelo derive; aqui só a presença.
    if payload.responsible_email.is_none() {
        add_error(
            errors,
            "responsible_email",
            "required",
            "Informe o e-mail do responsável.",
        );
    }

    match payload.responsible_phone.as_deref() {
        Some(phone) if is_valid_phone(phone) => {}
        _ => add_error(
            errors,
            "responsible_phone",
            "invalid_phone",
            "Telefone do responsável deve ter 10 ou 11 dígitos.",
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        db::InMemoryRegistrationStore,
        mocks::fixtures,
        models::registration::{Gender, PaymentStatus},
    };

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 15).unwrap()
    }

    fn adult_payload() -> CreateRegistrationPayload {
        CreateRegistrationPayload {
            full_name: "  Maria da Silva ".to_string(),
            cpf: Some("529.982.247-25".to_string()),
            email: "Maria@Example.com".to_string(),
            phone: "(11) 99999-8888".to_string(),
            birth_date: NaiveDate::from_ymd_opt(1990, 5, 20),
            gender: Some(Gender::Female),
            course: Some(Course::Run5k),
            shirt_size: "m".to_string(),
            athlete_declaration: true,
            ..CreateRegistrationPayload::default()
        }
    }

    fn kids_payload() -> CreateRegistrationPayload {
        CreateRegistrationPayload {
            full_name: "Pedro da Silva".to_string(),
            email: "maria@example.com".to_string(),
            phone: "11999998888".to_string(),
            birth_date: NaiveDate::from_ymd_opt(2014, 1, 1),
            gender: Some(Gender::Male),
            modality: Some(Modality::Infantil),
            shirt_size: "10".to_string(),
            responsible_full_name: Some("Maria da Silva".to_string()),
            responsible_cpf: Some("52998224725".to_string()),
            responsible_email: Some("maria@example.com".to_string()),
            responsible_phone: Some("11999998888".to_string()),
            athlete_declaration: true,
            ..CreateRegistrationPayload::default()
        }
    }

    async fn check(payload: CreateRegistrationPayload) -> Result<NewRegistration, AppError> {
        let store = InMemoryRegistrationStore::new();
        validate(&normalize(payload), today(), &store).await
    }

    fn failed_fields(err: AppError) -> Vec<String> {
        match err {
            AppError::ValidationError(errors) => {
                let mut fields: Vec<String> = errors.field_errors().keys().map(|k| k.to_string()).collect();
                fields.sort();
                fields
            }
            other => panic!("esperava erro de validação, veio {other:?}"),
        }
    }

    #[test]
    fn normalization_derives_course_and_modality() {
        let payload = normalize(CreateRegistrationPayload {
            modality: Some(Modality::Infantil),
            ..CreateRegistrationPayload::default()
        });
        assert_eq!(payload.course, Some(Course::Kids));

        let payload = normalize(CreateRegistrationPayload::default());
        assert_eq!(payload.course, Some(Course::Run5k));
        assert_eq!(payload.modality, Some(Modality::Adulto));

        let payload = normalize(adult_payload());
        assert_eq!(payload.cpf.as_deref(), Some("52998224725"));
        assert_eq!(payload.phone, "11999998888");
        assert_eq!(payload.shirt_size, "M");
        assert_eq!(payload.full_name, "Maria da Silva");
    }

    #[tokio::test]
    async fn valid_adult_passes() {
        let new = check(adult_payload()).await.unwrap();
        assert_eq!(new.modality, Modality::Adulto);
        assert_eq!(new.email, "maria@example.com");
    }

    #[tokio::test]
    async fn declaration_must_be_accepted() {
        let err = check(CreateRegistrationPayload {
            athlete_declaration: false,
            ..adult_payload()
        })
        .await
        .unwrap_err();
        assert_eq!(failed_fields(err), vec!["athlete_declaration"]);
    }

    #[tokio::test]
    async fn adult_course_requires_twelve_years() {
        // 11 anos em 2025-06-15
        let eleven = NaiveDate::from_ymd_opt(2013, 6, 16);
        let err = check(CreateRegistrationPayload {
            birth_date: eleven,
            ..adult_payload()
        })
        .await
        .unwrap_err();
        assert_eq!(failed_fields(err), vec!["birth_date"]);

        let kids = check(CreateRegistrationPayload {
            birth_date: eleven,
            ..kids_payload()
        })
        .await;
        assert!(kids.is_ok());

        let twelve = check(CreateRegistrationPayload {
            birth_date: NaiveDate::from_ymd_opt(2013, 6, 15),
            ..adult_payload()
        })
        .await;
        assert!(twelve.is_ok());
    }

    #[tokio::test]
    async fn future_birth_date_is_rejected() {
        let err = check(CreateRegistrationPayload {
            birth_date: NaiveDate::from_ymd_opt(2030, 1, 1),
            ..kids_payload()
        })
        .await
        .unwrap_err();
        assert_eq!(failed_fields(err), vec!["birth_date"]);
    }

    #[tokio::test]
    async fn adult_cpf_is_required_and_checked() {
        let err = check(CreateRegistrationPayload {
            cpf: None,
            ..adult_payload()
        })
        .await
        .unwrap_err();
        assert_eq!(failed_fields(err), vec!["cpf"]);

        let err = check(CreateRegistrationPayload {
            cpf: Some("111.111.111-11".to_string()),
            ..adult_payload()
        })
        .await
        .unwrap_err();
        assert_eq!(failed_fields(err), vec!["cpf"]);
    }

    #[tokio::test]
    async fn conflicting_modality_is_rejected() {
        let err = check(CreateRegistrationPayload {
            modality: Some(Modality::Infantil),
            ..adult_payload()
        })
        .await
        .unwrap_err();
        assert!(failed_fields(err).contains(&"modality".to_string()));
    }

    #[tokio::test]
    async fn shirt_size_must_match_modality() {
        let err = check(CreateRegistrationPayload {
            shirt_size: "8".to_string(),
            ..adult_payload()
        })
        .await
        .unwrap_err();
        assert_eq!(failed_fields(err), vec!["shirt_size"]);
    }

    #[tokio::test]
    async fn kids_need_a_complete_guardian() {
        let err = check(CreateRegistrationPayload {
            responsible_full_name: None,
            responsible_cpf: Some("123".to_string()),
            responsible_email: None,
            responsible_phone: Some("123".to_string()),
            ..kids_payload()
        })
        .await
        .unwrap_err();
        assert_eq!(
            failed_fields(err),
            vec![
                "responsible_cpf",
                "responsible_email",
                "responsible_full_name",
                "responsible_phone"
            ]
        );
    }

    #[tokio::test]
    async fn paid_cpf_blocks_new_adult_registration() {
        let store = InMemoryRegistrationStore::new();
        let mut paid = store.insert(&fixtures::adult_registration()).await.unwrap();
        paid.payment_status = PaymentStatus::Paid;
        store.put(paid).await;

        let err = validate(&normalize(adult_payload()), today(), &store).await.unwrap_err();
        assert_eq!(failed_fields(err), vec!["cpf"]);
    }

    #[tokio::test]
    async fn pending_cpf_does_not_block() {
        let store = InMemoryRegistrationStore::new();
        store.insert(&fixtures::adult_registration()).await.unwrap();

        assert!(validate(&normalize(adult_payload()), today(), &store).await.is_ok());
    }
}
