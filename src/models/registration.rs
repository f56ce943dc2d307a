// src/models/registration.rs

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use crate::models::payment::EmbeddedPayment;

// --- Enums ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "gender")]
pub enum Gender {
    #[serde(rename = "F")]
    #[sqlx(rename = "F")]
    Female,
    #[serde(rename = "M")]
    #[sqlx(rename = "M")]
    Male,
}

impl Gender {
    pub fn label(self) -> &'static str {
        match self {
            Gender::Female => "Feminino",
            Gender::Male => "Masculino",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "modality", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Modality {
    Infantil,
    Adulto,
}

impl Modality {
    pub fn label(self) -> &'static str {
        match self {
            Modality::Infantil => "Infantil",
            Modality::Adulto => "Adulto",
        }
    }

    /// Tamanhos de camiseta aceitos para a categoria.
    pub fn shirt_sizes(self) -> &'static [&'static str] {
        match self {
            Modality::Infantil => &CHILD_SHIRT_SIZES,
            Modality::Adulto => &ADULT_SHIRT_SIZES,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "course")]
pub enum Course {
    #[serde(rename = "KIDS")]
    #[sqlx(rename = "KIDS")]
    Kids,
    #[serde(rename = "RUN_5K")]
    #[sqlx(rename = "RUN_5K")]
    Run5k,
    #[serde(rename = "WALK_3K")]
    #[sqlx(rename = "WALK_3K")]
    Walk3k,
}

impl Course {
    pub fn label(self) -> &'static str {
        match self {
            Course::Kids => "Kids",
            Course::Run5k => "Corrida 5KM",
            Course::Walk3k => "Caminhada 3KM",
        }
    }

    /// Percurso infantil implica categoria INFANTIL; os demais, ADULTO.
    pub fn modality(self) -> Modality {
        match self {
            Course::Kids => Modality::Infantil,
            Course::Run5k | Course::Walk3k => Modality::Adulto,
        }
    }

    pub fn requires_minimum_age(self) -> bool {
        !matches!(self, Course::Kids)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "payment_status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Pending,
    Paid,
}

pub const ADULT_SHIRT_SIZES: [&str; 7] = ["PP", "P", "M", "G", "GG", "XG", "XXG"];
pub const CHILD_SHIRT_SIZES: [&str; 8] = ["2", "4", "6", "8", "10", "12", "14", "16"];

/// Idade mínima para os percursos adultos.
pub const MINIMUM_ADULT_COURSE_AGE: i32 = 12;

pub fn age_on(birth_date: NaiveDate, today: NaiveDate) -> i32 {
    let mut age = today.year() - birth_date.year();
    if (today.month(), today.day()) < (birth_date.month(), birth_date.day()) {
        age -= 1;
    }
    age
}

// --- Registro persistido ---

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Registration {
    #[schema(example = 42)]
    pub id: i64,
    #[schema(example = "Maria da Silva")]
    pub full_name: String,
    #[schema(example = "52998224725")]
    pub cpf: Option<String>,
    #[schema(example = "maria@example.com")]
    pub email: String,
    #[schema(example = "11999998888")]
    pub phone: String,
    pub birth_date: NaiveDate,
    pub gender: Gender,
    pub modality: Modality,
    pub course: Course,
    #[schema(example = "M")]
    pub shirt_size: String,

    pub responsible_full_name: Option<String>,
    pub responsible_cpf: Option<String>,
    pub responsible_email: Option<String>,
    pub responsible_phone: Option<String>,

    pub athlete_declaration: bool,

    pub payment_status: PaymentStatus,
    pub checkout_session_id: Option<String>,
    pub payment_intent_id: Option<String>,
    pub pix_id: Option<String>,
    #[schema(value_type = Option<String>, example = "50.00")]
    pub payment_amount: Option<Decimal>,
    pub payment_date: Option<DateTime<Utc>>,
    #[schema(example = "48213")]
    pub registration_number: Option<String>,
    pub payment_email_sent: bool,

    #[schema(example = "AD10")]
    pub coupon_code: Option<String>,
    #[schema(value_type = Option<String>, example = "5.00")]
    pub coupon_discount: Option<Decimal>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Registration {
    pub fn is_paid(&self) -> bool {
        self.payment_status == PaymentStatus::Paid
    }

    pub fn age_on(&self, today: NaiveDate) -> i32 {
        age_on(self.birth_date, today)
    }

    pub fn shirt_size_label(&self) -> String {
        match self.modality {
            Modality::Infantil => format!("{} anos", self.shirt_size),
            Modality::Adulto if self.gender == Gender::Female => format!("{} (Babylook)", self.shirt_size),
            Modality::Adulto => self.shirt_size.clone(),
        }
    }

    /// Nome e documento de quem paga: o responsável, para inscrições infantis.
    pub fn payer_name(&self) -> &str {
        match (&self.modality, &self.responsible_full_name) {
            (Modality::Infantil, Some(name)) => name,
            _ => &self.full_name,
        }
    }

    pub fn payer_cpf(&self) -> Option<&str> {
        match self.modality {
            Modality::Infantil => self.responsible_cpf.as_deref().or(self.cpf.as_deref()),
            Modality::Adulto => self.cpf.as_deref(),
        }
    }

    pub fn payer_phone(&self) -> &str {
        match (&self.modality, &self.responsible_phone) {
            (Modality::Infantil, Some(phone)) => phone,
            _ => &self.phone,
        }
    }
}

/// Dados já normalizados e validados, prontos para inserção (status PENDING).
#[derive(Debug, Clone)]
pub struct NewRegistration {
    pub full_name: String,
    pub cpf: Option<String>,
    pub email: String,
    pub phone: String,
    pub birth_date: NaiveDate,
    pub gender: Gender,
    pub modality: Modality,
    pub course: Course,
    pub shirt_size: String,
    pub responsible_full_name: Option<String>,
    pub responsible_cpf: Option<String>,
    pub responsible_email: Option<String>,
    pub responsible_phone: Option<String>,
    pub athlete_declaration: bool,
}

// --- Payloads / respostas ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    #[default]
    Card,
    Pix,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
#[serde(default)]
pub struct CreateRegistrationPayload {
    #[validate(length(min = 3, max = 200, message = "O nome deve ter entre 3 e 200 caracteres."))]
    #[schema(example = "Maria da Silva")]
    pub full_name: String,

    #[schema(example = "529.982.247-25")]
    pub cpf: Option<String>,

    #[validate(email(message = "Informe um e-mail válido."))]
    #[schema(example = "maria@example.com")]
    pub email: String,

    #[schema(example = "(11) 99999-8888")]
    pub phone: String,

    #[schema(value_type = Option<String>, example = "1990-05-20")]
    pub birth_date: Option<NaiveDate>,

    pub gender: Option<Gender>,
    pub modality: Option<Modality>,
    pub course: Option<Course>,

    #[schema(example = "M")]
    pub shirt_size: String,

    pub responsible_full_name: Option<String>,
    pub responsible_cpf: Option<String>,
    #[validate(email(message = "Informe um e-mail válido para o responsável."))]
    pub responsible_email: Option<String>,
    pub responsible_phone: Option<String>,

    pub athlete_declaration: bool,

    /// Cupom aplicado ao criar a cobrança.
    #[schema(example = "AD10")]
    pub coupon_code: Option<String>,

    pub payment_method: PaymentMethod,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RegistrationView {
    #[serde(flatten)]
    pub registration: Registration,
    pub age: i32,
    #[schema(value_type = String, example = "Feminino")]
    pub gender_display: &'static str,
    #[schema(value_type = String, example = "Adulto")]
    pub modality_display: &'static str,
    #[schema(value_type = String, example = "Corrida 5KM")]
    pub course_display: &'static str,
    pub shirt_size_display: String,
}

impl RegistrationView {
    pub fn new(registration: Registration, today: NaiveDate) -> Self {
        Self {
            age: registration.age_on(today),
            gender_display: registration.gender.label(),
            modality_display: registration.modality.label(),
            course_display: registration.course.label(),
            shirt_size_display: registration.shirt_size_label(),
            registration,
        }
    }
}

/// Resposta do cadastro: a inscrição criada e o resultado da cobrança.
#[derive(Debug, Serialize, ToSchema)]
pub struct RegistrationCreated {
    #[serde(flatten)]
    pub registration: RegistrationView,
    #[schema(value_type = Object)]
    pub payment: EmbeddedPayment,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RegistrationList {
    pub count: usize,
    pub results: Vec<RegistrationView>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PaidRegistrationSummary {
    pub id: i64,
    pub full_name: String,
    pub cpf: Option<String>,
    pub email: String,
    pub phone: String,
    #[schema(value_type = String)]
    pub course_display: &'static str,
    pub registration_number: Option<String>,
    pub payment_date: Option<DateTime<Utc>>,
    pub payment_email_sent: bool,
    pub created_at: DateTime<Utc>,
}

impl From<Registration> for PaidRegistrationSummary {
    fn from(r: Registration) -> Self {
        Self {
            id: r.id,
            course_display: r.course.label(),
            full_name: r.full_name,
            cpf: r.cpf,
            email: r.email,
            phone: r.phone,
            registration_number: r.registration_number,
            payment_date: r.payment_date,
            payment_email_sent: r.payment_email_sent,
            created_at: r.created_at,
        }
    }
}
